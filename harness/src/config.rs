use clap::{Parser, Subcommand, ValueEnum};
use orbit_common::{
    config::{
        DEFAULT_INCLUSION_TIMEOUT_MS, DEFAULT_POLL_INTERVAL_MS, DEMO_BATCH_MINT_URIS,
        DEMO_SINGLE_MINT_URI, EXPECTED_CHAIN_NAME, EXPECTED_CONTRACT_NAME,
        EXPECTED_CONTRACT_SYMBOL, EXPECTED_CONTRACT_VERSION, EXPECTED_L3_CHAIN_ID,
    },
    network::Network,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{report::ExitPolicy, VERSION};

// Functions Helpers
fn default_expected_chain_id() -> u64 {
    EXPECTED_L3_CHAIN_ID
}

fn default_expected_name() -> String {
    EXPECTED_CONTRACT_NAME.to_owned()
}

fn default_expected_symbol() -> String {
    EXPECTED_CONTRACT_SYMBOL.to_owned()
}

fn default_expected_version() -> String {
    EXPECTED_CONTRACT_VERSION.to_owned()
}

fn default_expected_chain_name() -> String {
    EXPECTED_CHAIN_NAME.to_owned()
}

fn default_inclusion_timeout_ms() -> u64 {
    DEFAULT_INCLUSION_TIMEOUT_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_single_mint_uri() -> String {
    DEMO_SINGLE_MINT_URI.to_owned()
}

fn default_batch_mint_uris() -> Vec<String> {
    DEMO_BATCH_MINT_URIS.iter().map(|uri| uri.to_string()).collect()
}

/// What the deployed contract and its chain must report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectations {
    pub chain_id: u64,
    pub name: String,
    pub symbol: String,
    pub version: String,
    pub chain_name: String,
    pub min_gas_limit: Option<u64>,
}

impl Default for Expectations {
    fn default() -> Self {
        ExpectationConfig::default().to_expectations()
    }
}

/// Literals used by the demonstration mints of the test workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoMints {
    pub single_uri: String,
    pub batch_uris: Vec<String>,
}

impl Default for DemoMints {
    fn default() -> Self {
        Self {
            single_uri: default_single_mint_uri(),
            batch_uris: default_batch_mint_uris(),
        }
    }
}

#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct ExpectationConfig {
    /// Chain id the target chain must report before any mint or transfer
    #[clap(long, default_value_t = EXPECTED_L3_CHAIN_ID)]
    #[serde(default = "default_expected_chain_id")]
    pub expected_chain_id: u64,
    /// Expected contract name
    #[clap(long, default_value_t = default_expected_name())]
    #[serde(default = "default_expected_name")]
    pub expected_name: String,
    /// Expected contract symbol
    #[clap(long, default_value_t = default_expected_symbol())]
    #[serde(default = "default_expected_symbol")]
    pub expected_symbol: String,
    /// Expected contract version
    #[clap(long, default_value_t = default_expected_version())]
    #[serde(default = "default_expected_version")]
    pub expected_version: String,
    /// Expected chain name reported by the contract
    #[clap(long, default_value_t = default_expected_chain_name())]
    #[serde(default = "default_expected_chain_name")]
    pub expected_chain_name: String,
    /// Minimum block gas limit, reported as a mismatch when not met
    #[clap(long)]
    #[serde(default)]
    pub min_gas_limit: Option<u64>,
}

impl Default for ExpectationConfig {
    fn default() -> Self {
        Self {
            expected_chain_id: EXPECTED_L3_CHAIN_ID,
            expected_name: default_expected_name(),
            expected_symbol: default_expected_symbol(),
            expected_version: default_expected_version(),
            expected_chain_name: default_expected_chain_name(),
            min_gas_limit: None,
        }
    }
}

impl ExpectationConfig {
    pub fn to_expectations(&self) -> Expectations {
        Expectations {
            chain_id: self.expected_chain_id,
            name: self.expected_name.clone(),
            symbol: self.expected_symbol.clone(),
            version: self.expected_version.clone(),
            chain_name: self.expected_chain_name.clone(),
            min_gas_limit: self.min_gas_limit,
        }
    }
}

#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// JSON-RPC endpoint, defaults to the selected network's endpoint
    #[clap(long)]
    pub rpc_url: Option<String>,
    /// Network profile
    #[clap(long, value_enum, default_value_t)]
    #[serde(default)]
    pub network: Network,
    /// Run against the in-process simulated L3 instead of a node
    #[clap(long)]
    #[serde(default)]
    pub simulate: bool,
    /// Chain id of the simulated chain (defaults to the expected chain id)
    #[clap(long)]
    #[serde(default)]
    pub simulated_chain_id: Option<u64>,
    /// Compiled contract: Hardhat/Foundry JSON artifact or raw hex bytecode
    #[clap(long)]
    pub artifact: Option<String>,
    /// Write the run report as JSON to this path
    #[clap(long)]
    pub report: Option<String>,
    #[clap(flatten)]
    #[serde(default)]
    pub expectations: ExpectationConfig,
    /// How long to wait for a transaction to be included
    #[clap(long, default_value_t = DEFAULT_INCLUSION_TIMEOUT_MS)]
    #[serde(default = "default_inclusion_timeout_ms")]
    pub inclusion_timeout_ms: u64,
    /// Receipt polling interval
    #[clap(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Token URI of the single demonstration mint
    #[clap(long, default_value_t = default_single_mint_uri())]
    #[serde(default = "default_single_mint_uri")]
    pub single_mint_uri: String,
    /// Token URIs of the batch demonstration mint, comma separated
    #[clap(long, value_delimiter = ',', default_values_t = default_batch_mint_uris())]
    #[serde(default = "default_batch_mint_uris")]
    pub batch_mint_uris: Vec<String>,
    /// Whether non-fatal mismatches also produce a non-zero exit code
    #[clap(long, value_enum, default_value_t)]
    #[serde(default)]
    pub exit_policy: ExitPolicy,
}

impl HarnessConfig {
    pub fn rpc_url(&self) -> String {
        self.rpc_url
            .clone()
            .unwrap_or_else(|| self.network.profile().rpc_url.to_owned())
    }

    pub fn inclusion_timeout(&self) -> Duration {
        Duration::from_millis(self.inclusion_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn demo_mints(&self) -> DemoMints {
        DemoMints {
            single_uri: self.single_mint_uri.clone(),
            batch_uris: self.batch_mint_uris.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => Self::Off,
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct LogConfig {
    /// Set log level
    #[clap(long, value_enum, default_value_t)]
    #[serde(default)]
    pub log_level: LogLevel,
    /// Shortcut for --log-level debug
    #[clap(short, long)]
    #[serde(default)]
    pub verbose: bool,
}

impl LogConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug.max(self.log_level.into())
        } else {
            self.log_level.into()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Subcommand)]
pub enum Command {
    /// Deploy the contract, verify the L3 chain and validate its metadata
    Deploy,
    /// Full workflow: deploy, verify, mint, transfer and validate
    #[default]
    Test,
    /// Print the Bunkerverse L3 proof-of-concept profile
    ValidatePoc {
        /// Print the profile as JSON
        #[clap(long)]
        json: bool,
    },
}

#[derive(Debug, Parser, Serialize, Deserialize)]
#[clap(version = VERSION, about = "Bunkerverse Orbit L3 NFT deployment and validation harness")]
#[command(name = "orbit-harness")]
pub struct Config {
    #[command(subcommand)]
    #[serde(skip)]
    pub command: Command,
    #[clap(flatten)]
    pub harness: HarnessConfig,
    #[clap(flatten)]
    pub log: LogConfig,
    /// JSON file to load the configuration from
    #[clap(long)]
    #[serde(skip)]
    pub config_file: Option<String>,
    /// Write the current configuration to --config-file and exit
    #[clap(long)]
    #[serde(skip)]
    pub generate_config_template: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let config = Config::parse_from(["orbit-harness", "test"]);
        assert_eq!(config.command, Command::Test);
        assert_eq!(config.harness.network, Network::BunkerverseL3);
        assert_eq!(config.harness.rpc_url(), "http://localhost:8549");
        assert_eq!(config.harness.expectations.expected_chain_id, 33701);
        assert_eq!(config.harness.batch_mint_uris.len(), 3);
        assert_eq!(config.harness.exit_policy, ExitPolicy::FatalOnly);
        assert_eq!(config.log.level_filter(), log::LevelFilter::Info);
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::parse_from([
            "orbit-harness",
            "--network",
            "arbitrum-l2",
            "--batch-mint-uris",
            "ipfs://a,ipfs://b",
            "--exit-policy",
            "strict",
            "--verbose",
            "deploy",
        ]);
        assert_eq!(config.command, Command::Deploy);
        assert_eq!(config.harness.rpc_url(), "http://localhost:8547");
        assert_eq!(config.harness.batch_mint_uris, vec!["ipfs://a", "ipfs://b"]);
        assert_eq!(config.harness.exit_policy, ExitPolicy::Strict);
        assert_eq!(config.log.level_filter(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_config_file_defaults() {
        // Missing fields fall back to the same defaults as the CLI
        let config: HarnessConfig = serde_json::from_str(
            r#"{ "rpc_url": "http://127.0.0.1:8549", "simulate": true }"#,
        )
        .unwrap();
        assert!(config.simulate);
        assert_eq!(config.inclusion_timeout(), Duration::from_secs(60));
        assert_eq!(config.expectations.to_expectations(), Expectations::default());
        assert_eq!(config.demo_mints(), DemoMints::default());
    }
}
