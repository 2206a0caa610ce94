//! Command-line argument parsing for the offline renderer.
//!
//! This module handles parsing and validation of CLI arguments including:
//! - Output, score, configuration and state file paths
//! - Sample rate, block size and duration
//! - Help text generation

use std::env;
use std::path::PathBuf;

/// Parsed command-line arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    /// WAV file to write
    pub out: PathBuf,
    /// JSON score to play (built-in demo when absent)
    pub score: Option<PathBuf>,
    /// JSON driver configuration
    pub config: Option<PathBuf>,
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Samples per rendered block
    pub block: usize,
    /// Length of the render (default: score length plus a tail)
    pub seconds: Option<f64>,
    /// Persisted state to load before playback
    pub state_in: Option<PathBuf>,
    /// Where to save the persisted state after playback
    pub state_out: Option<PathBuf>,
    /// Log control-path details
    pub verbose: bool,
    /// Whether help was requested
    pub show_help: bool,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            out: PathBuf::from("out.wav"),
            score: None,
            config: None,
            sample_rate: 44_100,
            block: 512,
            seconds: None,
            state_in: None,
            state_out: None,
            verbose: false,
            show_help: false,
        }
    }
}

impl CliArgs {
    /// Parse arguments from command line.
    pub fn parse() -> Self {
        Self::parse_from(env::args().skip(1))
    }

    /// Parse arguments from an iterator (program name already skipped).
    pub fn parse_from<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut args = Self::default();
        let mut iter = iter.into_iter();

        while let Some(arg) = iter.next() {
            // Accept both "--flag value" and "--flag=value"
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => {
                    (flag.to_string(), Some(value.to_string()))
                }
                _ => (arg.clone(), None),
            };

            match flag.as_str() {
                "--help" | "-h" => args.show_help = true,
                "--verbose" | "-v" => args.verbose = true,
                "--out" | "--score" | "--config" | "--sample-rate" | "--block" | "--seconds"
                | "--state-in" | "--state-out" => {
                    let Some(value) = inline.or_else(|| iter.next()) else {
                        eprintln!("{flag} requires an argument");
                        args.show_help = true;
                        continue;
                    };
                    if let Err(message) = args.apply(&flag, &value) {
                        eprintln!("{message}");
                        args.show_help = true;
                    }
                }
                _ => {
                    eprintln!("Unknown argument: {}", arg);
                    args.show_help = true;
                }
            }
        }

        args
    }

    fn apply(&mut self, flag: &str, value: &str) -> Result<(), String> {
        match flag {
            "--out" => self.out = PathBuf::from(value),
            "--score" => self.score = Some(PathBuf::from(value)),
            "--config" => self.config = Some(PathBuf::from(value)),
            "--state-in" => self.state_in = Some(PathBuf::from(value)),
            "--state-out" => self.state_out = Some(PathBuf::from(value)),
            "--sample-rate" => {
                self.sample_rate = value
                    .parse()
                    .ok()
                    .filter(|&rate: &u32| rate > 0)
                    .ok_or_else(|| format!("Invalid sample rate: {value}"))?;
            }
            "--block" => {
                self.block = value
                    .parse()
                    .ok()
                    .filter(|&block: &usize| block > 0)
                    .ok_or_else(|| format!("Invalid block size: {value}"))?;
            }
            "--seconds" => {
                let seconds: f64 = value
                    .parse()
                    .ok()
                    .filter(|s: &f64| s.is_finite() && *s >= 0.0)
                    .ok_or_else(|| format!("Invalid duration: {value}"))?;
                self.seconds = Some(seconds);
            }
            _ => return Err(format!("Unknown argument: {flag}")),
        }
        Ok(())
    }

    /// Print help text to stderr.
    pub fn print_help() {
        eprintln!(
            "Usage:\n  ym2149-voice-driver [options]\n\n\
             Options:\n\
             \x20 --out <file.wav>      Output WAV file (default out.wav)\n\
             \x20 --score <file.json>   Score to play: [{{\"at\": seconds, \"midi\": [bytes]}}, ...]\n\
             \x20                       (built-in demo phrase when omitted)\n\
             \x20 --config <file.json>  Driver configuration\n\
             \x20 --sample-rate <hz>    Output sample rate (default 44100)\n\
             \x20 --block <samples>     Render block size (default 512)\n\
             \x20 --seconds <s>         Render length (default: score end + 1s)\n\
             \x20 --state-in <file>     Load persisted state before playback\n\
             \x20 --state-out <file>    Save persisted state after playback\n\
             \x20 -v, --verbose         Log configuration details\n\
             \x20 -h, --help            Show this help\n\n\
             Examples:\n\
             \x20 ym2149-voice-driver --out demo.wav\n\
             \x20 ym2149-voice-driver --score tune.json --config ay.json --out tune.wav\n"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::parse_from(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args, CliArgs::default());
        assert!(!args.show_help);
    }

    #[test]
    fn test_separate_and_inline_values() {
        let args = parse(&[
            "--out",
            "a.wav",
            "--sample-rate=48000",
            "--block",
            "64",
            "--seconds=2.5",
            "--state-out",
            "s.bin",
        ]);
        assert_eq!(args.out, PathBuf::from("a.wav"));
        assert_eq!(args.sample_rate, 48_000);
        assert_eq!(args.block, 64);
        assert_eq!(args.seconds, Some(2.5));
        assert_eq!(args.state_out, Some(PathBuf::from("s.bin")));
        assert!(!args.show_help);
    }

    #[test]
    fn test_invalid_values_request_help() {
        assert!(parse(&["--sample-rate", "zero"]).show_help);
        assert!(parse(&["--block", "0"]).show_help);
        assert!(parse(&["--seconds", "-1"]).show_help);
        assert!(parse(&["--score"]).show_help);
        assert!(parse(&["--bogus"]).show_help);
    }
}
