use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};
use orbit_common::{
    client::{ChainClient, RpcChainClient},
    contract::{ContractArtifact, CONTRACT_NAME},
};
use orbit_harness::{
    config::{Command, Config, HarnessConfig},
    orchestrator::Orchestrator,
    poc::PocProfile,
    report::RunReport,
    simulator::{SimulatedL3, SimulatorConfig, DEMO_BYTECODE},
    VERSION,
};
use std::{
    fs::File,
    io::Write,
    path::Path,
    process::ExitCode,
    sync::Arc,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let mut config: Config = Config::parse();
    if let Some(path) = config.config_file.as_ref() {
        if config.generate_config_template {
            if Path::new(path).exists() {
                eprintln!("Config file already exists at {}", path);
                return Ok(ExitCode::SUCCESS);
            }

            let mut file = File::create(path).context("Error while creating config file")?;
            let json = serde_json::to_string_pretty(&config)
                .context("Error while serializing config file")?;
            file.write_all(json.as_bytes())
                .context("Error while writing config file")?;
            println!("Config file template generated at {}", path);
            return Ok(ExitCode::SUCCESS);
        }

        // The subcommand always comes from the command line
        let command = config.command;
        let file = File::open(path).context("Error while opening config file")?;
        config = serde_json::from_reader(file).context("Error while reading config file")?;
        config.command = command;
    } else if config.generate_config_template {
        eprintln!(
            "Provided config file path is required to generate the template with --config-file"
        );
        return Ok(ExitCode::SUCCESS);
    }

    env_logger::Builder::from_default_env()
        .filter_level(config.log.level_filter())
        .format_timestamp_millis()
        .init();

    let harness = &config.harness;
    let report = match config.command {
        Command::ValidatePoc { json } => {
            let profile = PocProfile::bunkerverse();
            if json {
                println!("{}", profile.to_json().context("Error while serializing PoC profile")?);
            } else {
                println!("{}", profile);
            }
            return Ok(ExitCode::SUCCESS);
        }
        Command::Deploy => {
            let (orchestrator, artifact) = prepare(harness)?;
            orchestrator.run_deploy(&artifact).await
        }
        Command::Test => {
            let (orchestrator, artifact) = prepare(harness)?;
            orchestrator.run_full(&artifact).await
        }
    };

    finish(harness, report).await
}

// Build the chain client and load the contract to deploy
fn prepare(harness: &HarnessConfig) -> Result<(Orchestrator, ContractArtifact)> {
    info!("Orbit harness v{}", VERSION);
    info!("Network profile:    {}", harness.network);
    info!(
        "Expected chain id:  {}",
        harness.expectations.expected_chain_id
    );

    let client: Arc<dyn ChainClient> = if harness.simulate {
        let mut sim_config = SimulatorConfig::default();
        if let Some(chain_id) = harness.simulated_chain_id {
            sim_config = sim_config.with_chain_id(chain_id);
        }
        info!("Using simulated L3 (chain id {})", sim_config.chain_id);
        Arc::new(SimulatedL3::new(sim_config))
    } else {
        let url = harness.rpc_url();
        info!("RPC endpoint:       {}", url);
        let client = RpcChainClient::new(&url)
            .context("Error while creating RPC client")?
            .with_inclusion_wait(harness.inclusion_timeout(), harness.poll_interval());
        Arc::new(client)
    };

    let artifact = match (&harness.artifact, harness.simulate) {
        (Some(path), _) => ContractArtifact::load(Path::new(path))
            .with_context(|| format!("Error while loading artifact {}", path))?,
        (None, true) => ContractArtifact {
            contract_name: CONTRACT_NAME.to_owned(),
            bytecode: DEMO_BYTECODE.to_vec(),
        },
        (None, false) => bail!("--artifact is required when running against a node"),
    };

    let orchestrator = Orchestrator::new(client)
        .with_expectations(harness.expectations.to_expectations())
        .with_demo_mints(harness.demo_mints());
    Ok((orchestrator, artifact))
}

async fn finish(harness: &HarnessConfig, report: RunReport) -> Result<ExitCode> {
    report.log_summary();

    if let Some(path) = harness.report.as_ref() {
        report
            .save(path)
            .await
            .with_context(|| format!("Error while saving report to {}", path))?;
        info!("Report written to {}", path);
    }

    if report.passes(harness.exit_policy) {
        Ok(ExitCode::SUCCESS)
    } else {
        error!(
            "Run {} failed ({:?} exit policy)",
            report.run_id, harness.exit_policy
        );
        Ok(ExitCode::FAILURE)
    }
}
