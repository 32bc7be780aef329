//! Scripted demo: install the terminal surface and drive one bar through a
//! full lifecycle. `--leave-open` skips the close so the exit sweep has
//! something to reclaim.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hudbar_core::{install_surface, BarConfig, ProgressBar, Style};
use hudbar_term::TermSurface;

#[derive(Parser)]
#[command(name = "hudbar-demo")]
#[command(about = "Drive a demo progress bar on the terminal surface")]
#[command(version)]
struct Cli {
    /// Title shown next to the bar
    #[arg(long, default_value = "Progress")]
    title: String,

    /// Presentation style (default, hud, utility)
    #[arg(long, default_value = "default")]
    style: Style,

    /// Milliseconds between progress ticks
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,

    /// Skip the final close and let the exit sweep reclaim the bar
    #[arg(long)]
    leave_open: bool,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(err) = install_surface(Arc::new(TermSurface::new())) {
        error!(error = %err, "failed to install terminal surface");
        std::process::exit(1);
    }

    if let Err(err) = run(&cli) {
        error!(error = %err, "demo failed");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> hudbar_core::Result<()> {
    let bar = ProgressBar::create(BarConfig {
        title: cli.title.clone(),
        message: "Starting".to_string(),
        style: cli.style,
        on_close: Some(Box::new(|closing| {
            info!(title = %closing.title(), "progress bar closed");
        })),
        ..BarConfig::default()
    })?;

    for progress in (0..=100u8).step_by(5) {
        bar.set_progress(progress)?;
        if progress == 50 {
            bar.set_message("Halfway there")?;
        }
        thread::sleep(Duration::from_millis(cli.tick_ms));
    }
    bar.set_message("Done")?;

    if cli.leave_open {
        info!("leaving the bar open; the exit sweep closes it");
        return Ok(());
    }
    bar.close()
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
