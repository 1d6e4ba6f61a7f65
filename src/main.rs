use lib::run_program;

fn main() {
    if let Err(message) = run_program() {
        eprintln!("{message}");
        std::process::exit(1);
    }
}
