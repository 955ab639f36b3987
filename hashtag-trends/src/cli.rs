use std::time::Duration;

use clap::Parser;

/// Count the hashtags trending on a live feed of tweets.
///
/// Reads one JSON tweet per payload and prints, once per report interval, how many
/// hashtags made it into the ranking. Everything else is configured through the
/// environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "hashtag-trends", version)]
pub struct Args {
    /// How many of the most frequent hashtags to rank
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub n_top_hashtags: u32,

    /// How long to consume the feed for, in seconds
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub seconds_to_run: u64,
}

impl Args {
    pub fn run_for(&self) -> Duration {
        Duration::from_secs(self.seconds_to_run)
    }

    pub fn n_top(&self) -> usize {
        self.n_top_hashtags as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn parses_positional_arguments() {
        let args = Args::try_parse_from(["hashtag-trends", "10", "60"]).unwrap();
        assert_eq!(args.n_top(), 10);
        assert_eq!(args.run_for(), Duration::from_secs(60));
    }

    #[test]
    fn rejects_non_numeric_values() {
        let err = Args::try_parse_from(["hashtag-trends", "ten", "60"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);

        let err = Args::try_parse_from(["hashtag-trends", "10", "1.5"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn rejects_zero_and_negative_values() {
        assert!(Args::try_parse_from(["hashtag-trends", "0", "60"]).is_err());
        assert!(Args::try_parse_from(["hashtag-trends", "10", "0"]).is_err());
        assert!(Args::try_parse_from(["hashtag-trends", "10", "-5"]).is_err());
    }

    #[test]
    fn rejects_wrong_arity() {
        let err = Args::try_parse_from(["hashtag-trends", "10"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = Args::try_parse_from(["hashtag-trends", "10", "60", "extra"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn usage_errors_exit_non_zero() {
        let err = Args::try_parse_from(["hashtag-trends"]).unwrap_err();
        assert_ne!(err.exit_code(), 0);
    }
}
