//! Command-line options shared by `run` and `listing`.

use clap::builder::RangedU64ValueParser;
use clap::{Args, ValueEnum};
use clearcache_jit::demo::{DEFAULT_CAPACITY_WORDS, MAX_CAPACITY_WORDS, MIN_CAPACITY_WORDS};
use clearcache_jit::{DemoConfig, Invocation, LoadStrategy};

/// How the trampoline materializes the target address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum LoadArg {
    /// MOVW + MOVT (ARMv7)
    MovwMovt,
    /// MOV + 3x ORR (ARMv5 compatible)
    ByteChain,
}

impl From<LoadArg> for LoadStrategy {
    fn from(arg: LoadArg) -> Self {
        match arg {
            LoadArg::MovwMovt => LoadStrategy::MovwMovt,
            LoadArg::ByteChain => LoadStrategy::ByteChain,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub(crate) struct RunArgs {
    /// Load sequence [default: byte-chain with the armv5-compatible feature, else movw-movt]
    #[arg(long, value_enum, value_name = "STRATEGY")]
    pub load: Option<LoadArg>,

    /// Size of the code mapping in instruction words (rounded up to a page)
    #[arg(
        long,
        value_name = "WORDS",
        default_value_t = DEFAULT_CAPACITY_WORDS,
        value_parser = capacity_parser()
    )]
    pub capacity: usize,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            load: None,
            capacity: DEFAULT_CAPACITY_WORDS,
        }
    }
}

fn capacity_parser() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::new().range(MIN_CAPACITY_WORDS as u64..=MAX_CAPACITY_WORDS as u64)
}

impl RunArgs {
    /// Resolve the strategy once, at startup; it stays fixed for the run.
    pub(crate) fn demo_config(&self, invocation: Invocation) -> DemoConfig {
        DemoConfig {
            strategy: self.load.map(LoadStrategy::from).unwrap_or_default(),
            capacity_words: self.capacity,
            invocation,
        }
    }
}

/// Parse `0x`-prefixed hex or plain decimal into a 32-bit address.
pub(crate) fn parse_address(s: &str) -> Result<u32, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid 32-bit address '{s}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: RunArgs,
    }

    fn parse(argv: &[&str]) -> Result<RunArgs, clap::Error> {
        Harness::try_parse_from(std::iter::once("clearcache").chain(argv.iter().copied())).map(|h| h.args)
    }

    #[test]
    fn capacity_below_longest_trampoline_is_rejected() {
        assert!(parse(&["--capacity", "4"]).is_err());
        assert_eq!(parse(&["--capacity", "7"]).unwrap().capacity, MIN_CAPACITY_WORDS);
    }

    #[test]
    fn capacity_past_upper_bound_is_rejected() {
        assert!(parse(&["--capacity", "4611686018427387904"]).is_err());
        assert!(parse(&["--capacity", &(MAX_CAPACITY_WORDS + 1).to_string()]).is_err());
        assert_eq!(parse(&["--capacity", &MAX_CAPACITY_WORDS.to_string()]).unwrap().capacity, MAX_CAPACITY_WORDS);
    }

    #[test]
    fn capacity_defaults_when_omitted() {
        assert_eq!(parse(&[]).unwrap().capacity, DEFAULT_CAPACITY_WORDS);
    }

    #[test]
    fn parse_address_accepts_hex_and_decimal() {
        assert_eq!(parse_address("0x0001_0400"), Ok(0x0001_0400));
        assert_eq!(parse_address("0XFFFFFFFF"), Ok(u32::MAX));
        assert_eq!(parse_address("66560"), Ok(0x1_0400));
    }

    #[test]
    fn parse_address_rejects_wide_values() {
        assert!(parse_address("0x1_0000_0000").is_err());
        assert!(parse_address("main").is_err());
    }

    #[test]
    fn explicit_load_overrides_build_default() {
        let args = RunArgs {
            load: Some(LoadArg::ByteChain),
            capacity: 32,
        };
        let config = args.demo_config(Invocation::Skip);
        assert_eq!(config.strategy, LoadStrategy::ByteChain);
        assert_eq!(config.capacity_words, 32);
        assert_eq!(config.invocation, Invocation::Skip);
    }

    #[test]
    fn omitted_options_fall_back_to_defaults() {
        let config = RunArgs::default().demo_config(Invocation::Call);
        assert_eq!(config.strategy, LoadStrategy::default());
        assert_eq!(config.capacity_words, DEFAULT_CAPACITY_WORDS);
    }
}
