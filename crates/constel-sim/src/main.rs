//! constel-sim: replays a transaction script against the accounting core.
//!
//! Usage:
//!   constel-sim <script.json> [--config <constel.toml>]
//!
//! Steps run serially against one in-memory protocol. The final snapshot,
//! the committed event log and the actor directory are printed as JSON on
//! stdout; logs go to stderr.

mod actors;
mod runner;
mod script;

use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::info;

use constel_protocol::config::ProtocolConfig;

use crate::runner::Simulation;
use crate::script::Script;

const DEFAULT_CONFIG_PATH: &str = "constel.toml";

struct Args {
    script: PathBuf,
    config: PathBuf,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut script = None;
    let mut config = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config = args.next().map(PathBuf::from).context("--config needs a path")?;
            }
            _ if script.is_none() => script = Some(PathBuf::from(arg)),
            other => bail!("unexpected argument: {other}"),
        }
    }
    let Some(script) = script else {
        bail!("usage: constel-sim <script.json> [--config <constel.toml>]");
    };
    Ok(Args { script, config })
}

fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    // 1. Load config
    let config = ProtocolConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("constel={}", config.logging.level).parse()?),
        )
        .init();

    info!(
        script = %args.script.display(),
        chain_id = config.network.chain_id,
        "constel-sim starting"
    );

    // 2. Read the script
    let content = std::fs::read_to_string(&args.script)
        .with_context(|| format!("reading {}", args.script.display()))?;
    let script: Script = serde_json::from_str(&content).context("parsing script")?;

    // 3. Replay
    let mut sim = Simulation::new(&config, &script.admin)?;
    sim.run(&script)?;

    // 4. Report
    let report = sim.report()?;
    info!(
        accepted = report.accepted,
        rejected = report.rejected,
        events = report.events.len(),
        "replay finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
