use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use chrono::NaiveTime;
use colored::Colorize;
use outbound_monitor::clock::{resolve_time_zone, ZonedClock};
use outbound_monitor::config::{self, AppConfig};
use outbound_monitor::notify::transport;
use outbound_monitor::shutdown::ShutdownGate;
use outbound_monitor::{exit_code, run_monitoring, EXIT_FATAL, EXIT_OK};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

#[derive(Parser)]
#[command(name = "outbound-monitor")]
#[command(about = "Watches outbound drop folders for daily file arrivals and SLA risk")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor today's windows until they all close, then write the reports
    Run {
        /// Config file (defaults to the user config directory)
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Default log filter when RUST_LOG is not set
        #[arg(long, value_name = "LEVEL", default_value = "info")]
        log_level: String,
    },

    /// Validate a config file and print today's resolved windows
    CheckConfig {
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with_target(false)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<(PathBuf, AppConfig)> {
    let path = path.unwrap_or_else(config::default_config_path);
    let config = config::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    Ok((path, config))
}

fn run(config_path: Option<PathBuf>) -> Result<i32> {
    let (_, config) = load_config(config_path)?;
    config
        .ensure_folders()
        .context("Failed to create monitored folders")?;

    let transport: Arc<dyn transport::MailTransport> =
        Arc::from(transport::from_config(&config.email));
    let gate = Arc::new(ShutdownGate::new());

    let handler_gate = Arc::clone(&gate);
    ctrlc::set_handler(move || {
        handler_gate.request();
    })
    .context("Failed to install termination handler")?;

    let result = run_monitoring(config, transport, gate);
    if let Err(e) = &result {
        error!("Monitoring run ended early: {e}");
    }
    Ok(exit_code(&result))
}

fn check_config(config_path: Option<PathBuf>) -> Result<()> {
    let (path, config) = load_config(config_path)?;
    let clock = ZonedClock::new(resolve_time_zone(&config.runtime.time_zone));
    let m = &config.monitoring;
    let fmt = |t: NaiveTime| clock.today_at(t).format("%Y-%m-%d %H:%M:%S %Z").to_string();

    println!("{} {}", "✓".green().bold(), path.display());
    println!("  {} {}", "Time zone:".bold(), clock.tz().name());
    println!(
        "  {} {} → {}",
        "Vendor window:".bold(),
        fmt(m.vendor_window_start),
        fmt(m.vendor_window_end)
    );
    println!(
        "  {} {} → {}",
        "HOLD window:".bold(),
        fmt(m.vendor_window_start),
        fmt(m.hold_window_end)
    );
    println!(
        "  {} {} → {}",
        "DROP window:".bold(),
        fmt(m.vendor_window_start),
        fmt(m.drop_cutoff)
    );
    println!("  {} {}", "SLA deadline:".bold(), fmt(config.sla.deadline));
    println!(
        "  {} {}",
        "Expected files:".bold(),
        m.expected_files.join(", ").cyan()
    );
    if config.email.smtp_host.trim().is_empty() {
        println!(
            "  {} no smtp_host set, notifications will only be logged",
            "!".yellow().bold()
        );
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Run { config, log_level } => {
            init_logging(&log_level);
            run(config).unwrap_or_else(|e| {
                error!("{e:#}");
                EXIT_FATAL
            })
        }
        Commands::CheckConfig { config } => match check_config(config) {
            Ok(()) => EXIT_OK,
            Err(e) => {
                eprintln!("{} {e:#}", "✗".red().bold());
                EXIT_FATAL
            }
        },
    };

    std::process::exit(code);
}
