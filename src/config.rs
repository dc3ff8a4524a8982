use clap::Parser;
use std::path::PathBuf;

use crate::odds::batch::DEFAULT_MAX_BATCH_SIZE;
use crate::odds::uncertainty::DEFAULT_HALF_WIDTH;

/// Tennis match odds service
#[derive(Parser, Debug, Clone)]
#[command(name = "tennis-odds", version, about)]
pub struct Config {
    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "tennis_odds.db")]
    pub database_path: String,

    /// HTTP API listen address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8080")]
    pub api_addr: String,

    /// Maximum number of matches accepted per calculate-odds request
    #[arg(long, env = "MAX_BATCH_SIZE", default_value_t = DEFAULT_MAX_BATCH_SIZE)]
    pub max_batch_size: usize,

    /// Half-width of the uniform uncertainty band added to each probability (0 disables it)
    #[arg(long, env = "NOISE_HALF_WIDTH", default_value_t = DEFAULT_HALF_WIDTH)]
    pub noise_half_width: f64,

    /// Seed for reproducible uncertainty noise
    #[arg(long, env = "NOISE_SEED")]
    pub noise_seed: Option<u64>,

    /// JSON file of players, tournaments and matches to import at startup
    #[arg(long, env = "SEED_FILE")]
    pub seed_file: Option<PathBuf>,

    /// Recompute odds for all scheduled matches every N seconds (0 disables)
    #[arg(long, env = "REFRESH_INTERVAL_SECS", default_value = "0")]
    pub refresh_interval_secs: u64,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=100).contains(&self.max_batch_size) {
            anyhow::bail!("max_batch_size must be between 1 and 100");
        }
        if !(0.0..=0.1).contains(&self.noise_half_width) {
            anyhow::bail!("noise_half_width must be between 0.0 and 0.1");
        }
        if self.noise_seed.is_some() && self.noise_half_width == 0.0 {
            anyhow::bail!("noise_seed has no effect when noise_half_width is 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["tennis-odds"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = parse(&[]);
        assert_eq!(cfg.max_batch_size, 10);
        assert_eq!(cfg.noise_half_width, 0.025);
        assert_eq!(cfg.refresh_interval_secs, 0);
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(parse(&["--max-batch-size", "0"]).validate().is_err());
        assert!(parse(&["--noise-half-width", "0.5"]).validate().is_err());
        assert!(parse(&["--noise-half-width", "0", "--noise-seed", "7"])
            .validate()
            .is_err());
        parse(&["--noise-half-width", "0", "--max-batch-size", "25"])
            .validate()
            .unwrap();
    }
}
