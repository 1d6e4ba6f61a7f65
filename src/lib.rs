use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use itertools::Itertools;

use crate::eval::params::CombinedParams;
use crate::eval::EvalTable;
use crate::play::run_match::{format_stats, run_game, run_tournament, GameId, MatchSettings};
use crate::play::{build_agent, build_strategy, AnyAgent};
use crate::search::run_bench;

pub mod eval;

pub mod games;

pub mod general;

pub mod play;

pub mod search;

/// An engine for three-player chess: one shared board of three segments,
/// three seats moving in rotation, decided by a family of search strategies
/// under a per-turn time budget.
#[derive(Parser, Debug)]
#[command(name = "Trichess", version, about, long_about = None)]
pub struct CommandLineArgs {
    #[arg(value_enum, default_value_t = Mode::Play)]
    mode: Mode,
    /// Engines seated as white, black and red; cycled when fewer are given.
    #[arg(value_enum, long, short, num_args = 1.., default_values_t = vec![Engine::Quiescence, Engine::Maximax, Engine::Pvs])]
    engines: Vec<Engine>,
    /// Clock per seat and game, in milliseconds.
    #[arg(long, default_value_t = 60_000)]
    clock_millis: u64,
    #[arg(long, short, default_value_t = 24)]
    games: u64,
    #[arg(long, short, default_value_t = 4)]
    threads: usize,
    #[arg(long, short, default_value_t = 0)]
    seed: u64,
    /// TOML file holding the start and end evaluation parameters.
    #[arg(long, short)]
    params: Option<PathBuf>,
    #[arg(long, default_value_t = 4)]
    bench_depth: usize,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, ValueEnum, Default, Debug)]
pub enum Mode {
    /// Play a single rendered game on the console.
    #[default]
    Play,
    /// Run many games over worker threads and report per-seat statistics.
    Tournament,
    /// Run and report fixed-depth node counts, then exit.
    Bench,
}

/// An enum of all playable engine names.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, ValueEnum, Default, Debug)]
pub enum Engine {
    Random,
    Greedy,
    Minimax,
    #[default]
    Maximax,
    Quiescence,
    RestrictedQuiescence,
    Pvs,
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Play => write!(f, "play"),
            Mode::Tournament => write!(f, "tournament"),
            Mode::Bench => write!(f, "bench"),
        }
    }
}

impl Display for Engine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Engine::Random => write!(f, "random"),
            Engine::Greedy => write!(f, "greedy"),
            Engine::Minimax => write!(f, "minimax"),
            Engine::Maximax => write!(f, "maximax"),
            Engine::Quiescence => write!(f, "quiescence"),
            Engine::RestrictedQuiescence => write!(f, "restricted-quiescence"),
            Engine::Pvs => write!(f, "pvs"),
        }
    }
}

fn seat_agents(args: &CommandLineArgs, params: &CombinedParams) -> Result<[AnyAgent; 3], String> {
    let mut agents = Vec::new();
    for seat in 0..3 {
        let engine = args.engines[seat % args.engines.len()];
        agents.push(build_agent(engine, params, args.seed + seat as u64)?);
    }
    agents
        .try_into()
        .map_err(|_| "internal error: not three seats".to_string())
}

pub fn run_program() -> Result<(), String> {
    let args = CommandLineArgs::parse();
    let params = match &args.params {
        Some(path) => CombinedParams::load(path)?,
        None => CombinedParams::default(),
    };
    match args.mode {
        Mode::Play => {
            let mut agents = seat_agents(&args, &params)?;
            let settings = MatchSettings {
                clock_millis: args.clock_millis,
                verbose: true,
                ..Default::default()
            };
            let outcome = run_game(GameId(0), &mut agents, &settings);
            println!("{outcome}");
        }
        Mode::Tournament => {
            let agents = seat_agents(&args, &params)?;
            let settings = MatchSettings {
                clock_millis: args.clock_millis,
                ..Default::default()
            };
            let stats = run_tournament(&agents, args.games, args.threads, settings);
            println!("{0}", format_stats(&agents, &stats));
        }
        Mode::Bench => {
            let table = EvalTable::new(&params)?;
            for engine in args.engines.iter().unique() {
                let mut strategy = build_strategy(*engine, args.seed);
                println!("{0}", run_bench(strategy.as_mut(), &table, args.bench_depth));
            }
        }
    }
    Ok(())
}
