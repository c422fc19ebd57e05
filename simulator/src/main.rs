use anyhow::Context;
use clap::Parser;
use generator::profile::DeviceGenerator;
use gui_bridge::bridge::GuiBridge;
use log::info;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::SimulatorConfig;
use workflow::runner::Runner;

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Synthetic positioning backend for the live map")]
struct Args {
    /// Print a snapshot after a few simulated ticks and exit
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a simulator config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "127.0.0.1:9000")]
    bind: SocketAddr,
    #[arg(long, default_value_t = 4)]
    anchors: usize,
    #[arg(long, default_value_t = 2)]
    tags: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Start the device loop without waiting for a start signal
    #[arg(long, default_value_t = false)]
    autostart: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = args.config {
        SimulatorConfig::load(path)?
    } else {
        SimulatorConfig::from_args(args.bind, args.anchors, args.tags, args.seed)
    };
    config.autostart |= args.autostart;

    if args.offline {
        let mut generator = DeviceGenerator::new(config.generator.clone());
        let dt = config.interval().as_secs_f64();
        let mut snapshot = generator.initial();
        for _ in 0..100 {
            snapshot = generator.step(dt);
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).context("serializing snapshot")?
        );
        return Ok(());
    }

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating runtime")?;
    runtime.block_on(async move {
        let runner = Arc::new(Runner::new(config.clone()));
        if config.autostart {
            runner.start();
        }
        let bridge = GuiBridge::new(runner);

        tokio::select! {
            _ = bridge.serve(config.bind) => {}
            result = signal::ctrl_c() => {
                result.context("awaiting Ctrl+C to exit")?;
                info!("shutting down");
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}
