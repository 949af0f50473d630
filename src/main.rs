use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::time::{interval, Duration};

use collision_tracker_rs::config::EngineConfig;
use collision_tracker_rs::engine::Engine;
use collision_tracker_rs::server;

#[derive(Parser, Debug)]
#[command(name = "collision_tracker")]
#[command(about = "V2V collision-risk service over WebSocket telemetry", long_about = None)]
struct Args {
    /// Listen address
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Listen port
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Seconds between expiry sweeps over the stores
    #[arg(long, default_value = "5")]
    sweep_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = EngineConfig::from_env();
    log::info!(
        "starting: radius {:.0} m, lookahead {} s, stale cutoff {} ms",
        config.nearby_radius_m,
        config.lookahead_s,
        config.stale_ms
    );

    let engine = Arc::new(Engine::new(config));

    // Background sweep keeps the working set bounded; reads are already
    // TTL-checked, so a lazy cadence is fine.
    let sweeper = engine.clone();
    let sweep_secs = args.sweep_interval_secs.max(1);
    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(sweep_secs));
        loop {
            tick.tick().await;
            let (geo, telemetry, history) = sweeper.purge_expired().await;
            if geo + telemetry + history > 0 {
                log::debug!(
                    "sweep removed {} geo / {} telemetry / {} history entries",
                    geo,
                    telemetry,
                    history
                );
            }
        }
    });

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = TcpListener::bind(&addr).await?;
    log::info!("listening on {}", addr);
    axum::serve(listener, server::router(engine)).await?;
    Ok(())
}
