use std::fmt::Display;
use std::str::{FromStr, SplitWhitespace};

use num::PrimInt;

pub fn parse_int_from_str<T: PrimInt + FromStr>(as_str: &str, name: &str) -> Result<T, String> {
    // for some weird Rust reason, parse::<T>() returns a completely unbounded Err on failure,
    // so we just write the error message ourselves
    as_str
        .parse::<T>()
        .map_err(|_err| format!("couldn't parse {name}"))
}

pub fn parse_int<T: PrimInt + FromStr + Display>(
    words: &mut SplitWhitespace,
    name: &str,
) -> Result<T, String> {
    parse_int_from_str(words.next().ok_or_else(|| format!("missing {name}"))?, name)
}

#[cfg(test)]
mod tests {
    use crate::general::common::parse_int_from_str;

    #[test]
    fn parse_int_test() {
        assert_eq!(parse_int_from_str::<usize>("42", "answer"), Ok(42));
        assert_eq!(parse_int_from_str::<i32>("-7", "offset"), Ok(-7));
        assert!(parse_int_from_str::<u8>("256", "byte").is_err());
        assert!(parse_int_from_str::<usize>("x", "index")
            .unwrap_err()
            .contains("index"));
    }
}
