use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tabled::{Table, Tabled};
use tokio::sync::mpsc;
use tracing::warn;

use deauthmon::alert::{AlertEngine, LogSignaler};
use deauthmon::config::Config;
use deauthmon::detect::discovery::{AddressNameCache, ChannelPlanner};
use deauthmon::eventlog::CsvEventLog;
use deauthmon::monitor::Sentinel;
use deauthmon::report::SystemUplink;
use deauthmon::wireless::capture::{CaptureConfig, PcapRadio};

#[derive(Parser)]
#[command(name = "deauthmon")]
#[command(author, version, about = "802.11 deauthentication intrusion sensor")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover channels and monitor for deauthentication attacks
    Run,

    /// One-shot channel discovery: show where the monitored networks live
    Discover,

    /// Validate the configuration file and print the effective settings
    CheckConfig,
}

pub async fn run_command(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default()?,
    };

    match cli.command {
        Commands::Run => cmd_run(config).await,
        Commands::Discover => cmd_discover(config),
        Commands::CheckConfig => cmd_check_config(config),
    }
}

fn build_radio(config: &Config) -> Result<PcapRadio> {
    if config.capture.interface.is_empty() {
        bail!("no capture interface configured; set [capture] interface");
    }

    let mut capture_config = CaptureConfig::for_interface(&config.capture.interface);
    capture_config.buffer_size = config.capture.buffer_size;

    PcapRadio::new(capture_config)
        .with_context(|| format!("failed to open interface {}", config.capture.interface))
}

async fn cmd_run(config: Config) -> Result<()> {
    if config.detection.monitored_ssids.is_empty() && !config.detection.scan_all_when_none {
        warn!("no monitored SSIDs configured and scan_all_when_none is off");
    }

    let radio = build_radio(&config)?;
    let sink = CsvEventLog::create(&config.log.session_dir)
        .with_context(|| format!("failed to create session log in {}", config.log.session_dir))?;
    let alert = AlertEngine::new(config.alert.timing(), Box::new(LogSignaler));

    let mut sentinel = Sentinel::new(
        config,
        radio,
        Box::new(sink),
        alert,
        Box::new(SystemUplink),
    )?;

    sentinel.discover();

    // Ctrl-C ends monitoring cleanly
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    sentinel.run(shutdown_rx).await
}

#[derive(Tabled)]
struct DiscoveredRow {
    #[tabled(rename = "SSID")]
    ssid: String,
    #[tabled(rename = "Channel")]
    channel: String,
}

fn cmd_discover(config: Config) -> Result<()> {
    if config.detection.monitored_ssids.is_empty() {
        bail!("no monitored SSIDs configured; set [detection] monitored_ssids");
    }

    let mut radio = build_radio(&config)?;
    let planner = ChannelPlanner::new(
        config.detection.monitored_ssids.clone(),
        config.detection.channel_dwell(),
        config.detection.scan_all_when_none,
    );
    let mut cache = AddressNameCache::new();
    let plan = planner.discover(&mut radio, &mut cache);

    let rows: Vec<DiscoveredRow> = config
        .detection
        .monitored_ssids
        .iter()
        .map(|ssid| DiscoveredRow {
            ssid: ssid.clone(),
            channel: plan
                .channel_map
                .channel_for(ssid)
                .map(|c| c.to_string())
                .unwrap_or_else(|| "not found".dimmed().to_string()),
        })
        .collect();

    println!("{}", Table::new(rows));
    println!(
        "\n{} {:?}",
        "Working channel set:".bold(),
        plan.working_set
    );
    println!("{} {}", "Access points seen:".bold(), cache.len());

    Ok(())
}

fn cmd_check_config(config: Config) -> Result<()> {
    println!("{}", "Configuration OK".green().bold());
    println!("  interface:          {}", config.capture.interface);
    println!(
        "  monitored SSIDs:    {}",
        config.detection.monitored_ssids.join(", ")
    );
    println!("  packet threshold:   {}", config.detection.packet_threshold);
    println!("  hop interval:       {} ms", config.detection.channel_hop_interval_ms);
    println!("  channel dwell:      {} ms", config.detection.channel_dwell_ms);
    println!(
        "  reporting interval: {} s",
        config.detection.reporting_interval_secs
    );
    println!(
        "  scan all fallback:  {}",
        config.detection.scan_all_when_none
    );
    println!(
        "  API endpoint:       {}",
        if config.api.endpoint_url.is_empty() {
            "(disabled)".to_string()
        } else {
            config.api.endpoint_url.clone()
        }
    );
    println!("  session logs:       {}", config.log.session_dir);
    Ok(())
}
