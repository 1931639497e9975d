use anyhow::Context;
use clap::Parser;
use smol_macros::{main, Executor};
use tracing::{info, warn};

mod config;
mod display;
mod error;
mod frame;
mod logging;
mod pipeline;
mod quit;
mod sens;

use config::Config;
use display::{Headless, TerminalDisplay};
use pipeline::{ProducerExit, Shutdown};
use quit::{CtrlC, Keyboard, QuitSignal};

main! {
    async fn main(ex: &Executor<'_>) -> anyhow::Result<()> {
        let config = Config::parse();
        let _log_guard = logging::init(&config.log_dir, config.headless)?;
        info!(?config, "starting");

        // Set a handler that sends a message through a channel.
        let (ctrl_c_sender, ctrl_c_receiver) = async_broadcast::broadcast(1);
        let handle = move || {
            ctrl_c_sender.try_broadcast(()).ok();
        };
        ctrlc::set_handler(handle).context("Failed to install the Ctrl+C handler")?;
        let ctrl_c = CtrlC::new(ctrl_c_receiver);

        let shutdown = if config.headless {
            pipeline::run(ex, &config, Headless::default(), ctrl_c).await?
        } else {
            let display = TerminalDisplay::open().context("Failed to open the terminal display")?;
            pipeline::run(ex, &config, display, ctrl_c.or(Keyboard::default())).await?
        };

        summarize(&shutdown);
        shutdown.outcome.map_err(Into::into)
    }
}

fn summarize(shutdown: &Shutdown) {
    info!(
        ticks = shutdown.ticks,
        render_faults = shutdown.render_faults,
        "pipeline stopped"
    );
    for producer in &shutdown.producers {
        match producer.exit {
            ProducerExit::Cancelled => info!(
                source = %producer.name,
                polls = producer.polls,
                failures = producer.failures,
                dropped = producer.dropped,
                "producer cancelled"
            ),
            ProducerExit::Crashed => warn!(
                source = %producer.name,
                polls = producer.polls,
                failures = producer.failures,
                "producer crashed before shutdown"
            ),
        }
    }
}
