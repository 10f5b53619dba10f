use std::{path::PathBuf, time::Duration};

use clap::Parser;
use skillbridge_deploy::{
    ArtifactFile, ClientSettings, DEFAULT_ARTIFACTS_DIR, DEFAULT_CONTRACT_NAME,
    client::{DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_GAS_MARGIN_PERCENT, DEFAULT_POLL_INTERVAL},
    rpc::DEFAULT_REQUEST_TIMEOUT,
};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "skillbridge")]
#[command(
    author,
    version,
    about = "Deploy the SkillBridge contract to Hedera's EVM",
    long_about = "Deploy a compiled contract to Hedera's EVM.\n\n\
        HEDERA_RPC_URL and HEDERA_PRIVATE_KEY are read from the environment \
        (or a .env file). HEDERA_CHAIN_NAME and HEDERA_CHAIN_ID optionally \
        select another network."
)]
pub struct Cli {
    /// The verbosity level. Logs go to stderr.
    #[arg(short, long, env = "SKILLBRIDGE_VERBOSITY", default_value_t = LevelFilter::WARN)]
    pub verbosity: LevelFilter,

    /// Name of the contract to deploy.
    #[arg(short, long, env = "SKILLBRIDGE_CONTRACT", default_value = DEFAULT_CONTRACT_NAME)]
    pub contract: String,

    /// Hardhat build output directory.
    ///
    /// The artifact is read from <dir>/<contract>.sol/<contract>.json.
    #[arg(long, env = "SKILLBRIDGE_ARTIFACTS_DIR", default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: PathBuf,

    /// Explicit path to the artifact JSON file. Takes precedence over --artifacts-dir.
    #[arg(long, env = "SKILLBRIDGE_ARTIFACT")]
    pub artifact: Option<PathBuf>,

    /// Dotenv file to load before reading the configuration.
    ///
    /// Defaults to `.env` in the working directory, if present. Variables
    /// already set in the environment take precedence.
    #[arg(long, env = "SKILLBRIDGE_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Timeout of each JSON-RPC request, in seconds.
    #[arg(
        long,
        env = "SKILLBRIDGE_REQUEST_TIMEOUT",
        default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub request_timeout: u64,

    /// How long to wait for the deployment to be mined, in seconds.
    #[arg(long, env = "SKILLBRIDGE_CONFIRMATION_TIMEOUT", default_value_t = DEFAULT_CONFIRMATION_TIMEOUT.as_secs())]
    pub confirmation_timeout: u64,

    /// Delay between receipt polls, in seconds.
    #[arg(
        long,
        env = "SKILLBRIDGE_POLL_INTERVAL",
        default_value_t = DEFAULT_POLL_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval: u64,

    /// Fixed gas limit for the deployment. Estimated when not provided.
    #[arg(long, env = "SKILLBRIDGE_GAS_LIMIT")]
    pub gas_limit: Option<u64>,

    /// Percentage applied to the gas estimate. At least 100.
    #[arg(
        long,
        env = "SKILLBRIDGE_GAS_MARGIN",
        default_value_t = DEFAULT_GAS_MARGIN_PERCENT,
        value_parser = clap::value_parser!(u64).range(100..)
    )]
    pub gas_margin: u64,
}

impl Cli {
    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            request_timeout: Duration::from_secs(self.request_timeout),
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout),
            poll_interval: Duration::from_secs(self.poll_interval),
            gas_limit: self.gas_limit,
            gas_margin_percent: self.gas_margin,
        }
    }

    pub fn artifact_file(&self) -> ArtifactFile {
        match &self.artifact {
            Some(path) => ArtifactFile::new(path),
            None => ArtifactFile::for_contract(&self.artifacts_dir, &self.contract),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["skillbridge"]).unwrap();

        assert_eq!(cli.verbosity, LevelFilter::WARN);
        assert_eq!(cli.client_settings(), ClientSettings::default());
        assert_eq!(
            cli.artifact_file().path(),
            Path::new("artifacts/contracts/SkillBridge.sol/SkillBridge.json")
        );
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "skillbridge",
            "--contract",
            "Escrow",
            "--artifacts-dir",
            "out",
            "--gas-limit",
            "3000000",
            "--confirmation-timeout",
            "30",
            "-v",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.verbosity, LevelFilter::DEBUG);
        assert_eq!(cli.artifact_file().path(), Path::new("out/Escrow.sol/Escrow.json"));

        let settings = cli.client_settings();
        assert_eq!(settings.gas_limit, Some(3_000_000));
        assert_eq!(settings.confirmation_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_explicit_artifact_wins() {
        let cli = Cli::try_parse_from(["skillbridge", "--artifact", "build/Custom.json"]).unwrap();
        assert_eq!(cli.artifact_file().path(), Path::new("build/Custom.json"));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        for args in [
            ["skillbridge", "--poll-interval", "0"],
            ["skillbridge", "--request-timeout", "0"],
            ["skillbridge", "--gas-margin", "99"],
            ["skillbridge", "--gas-margin", "0"],
        ] {
            assert!(Cli::try_parse_from(args).is_err(), "{args:?} should be rejected");
        }

        let cli = Cli::try_parse_from(["skillbridge", "--gas-margin", "100", "--poll-interval", "1"])
            .unwrap();
        assert_eq!(cli.client_settings().gas_margin_percent, 100);
        assert_eq!(cli.client_settings().poll_interval, Duration::from_secs(1));
    }
}
