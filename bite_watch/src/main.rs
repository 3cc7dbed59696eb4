//! bite-watch: interactive entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use bite_machine::BiteLimit;
use bite_watch::app::{run, RunOptions};
use bite_watch::replay::run_replay;
use bite_watch::WatchConfig;

// ── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "bite-watch",
    version,
    about = "Counts hand-to-mouth bites and sounds an alarm at the limit",
    long_about = None
)]
struct Cli {
    /// TOML config file; every field is optional
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Bite limit (1–99); overrides the config file
    #[arg(short, long, global = true)]
    limit: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the monitor window with the simulated camera (default).
    Watch {
        /// Extra inference cost per frame, in milliseconds
        #[arg(long)]
        latency_ms: Option<u64>,

        /// Write every inference result to this file as JSON lines
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Run a recorded session headless and print the bites.
    Replay {
        /// Recording to replay
        file: PathBuf,

        /// Tried in order when the recording cannot be read
        #[arg(long)]
        fallback: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Respect RUST_LOG; default to info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = WatchConfig::load_or_default(cli.config.as_deref())
        .context("loading configuration")?;
    if let Some(text) = &cli.limit {
        config.bite_limit = BiteLimit::from_user_input(text).limit();
    }

    match cli.command.unwrap_or(Commands::Watch { latency_ms: None, record: None }) {
        Commands::Watch { latency_ms, record } => {
            if let Some(ms) = latency_ms {
                config.sim.latency_ms = ms;
            }

            println!();
            println!("╔══════════════════════════════════════════════════════════════╗");
            println!("║             Bite Watch: hands off, that's enough             ║");
            println!("╚══════════════════════════════════════════════════════════════╝");
            println!();
            println!("  Bite limit: {}", config.bite_limit);
            println!("  Mouse = hand   F/H = face/hands   ↑/↓ = closer/farther");
            println!();

            info!(limit = %config.bite_limit, "opening monitor window");
            run(config, RunOptions { record }).context("monitor window")?;
        }

        Commands::Replay { file, fallback } => {
            let limit = config.bite_limit;
            let mut paths = vec![file];
            paths.extend(fallback);

            let report = run_replay(&paths, &config, limit).context("replay")?;
            println!("  Replayed {} ({} frames, {} processed)", report.source, report.frames, report.processed);
            for (at, count) in &report.bites {
                println!("  {:>8.2}s  bite {}/{}", at.as_secs_f64(), count, limit);
            }
            match report.limit_reached {
                Some(n) => println!("  Limit reached: you hit {n} bites!"),
                None    => println!("  {} bites, limit not reached", report.bites.len()),
            }
        }
    }

    Ok(())
}
