// Drives a PerformanceSampler from a ~60 Hz timer and logs what it reports.
//
//   RUST_LOG=info cargo run --features cli -- [config.json]

use std::time::Duration;

use frame_telemetry::{
    LifecycleEvent, MonotonicClock, PerformanceReport, PerformanceSampler, SamplerConfig,
};
use log::{error, info, warn};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const FRAME_PERIOD: Duration = Duration::from_micros(16_667);

fn load_config() -> SamplerConfig {
    match std::env::args().nth(1) {
        Some(path) => match SamplerConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(err) => {
                warn!("{}; falling back to environment/defaults", err);
                SamplerConfig::from_env()
            }
        },
        None => SamplerConfig::from_env(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config();
    info!(
        "sampling with {:.2}s warm-up and {:.2}s fps window",
        config.warm_up_secs, config.window_secs
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<PerformanceReport>();
    let mut sampler = PerformanceSampler::with_config(config, move |report: PerformanceReport| {
        // Receiver gone means we are shutting down.
        let _ = tx.send(report);
    });

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {}", err);
        }
        ctrl_c_cancel.cancel();
    });

    let consumer = tokio::spawn(async move {
        let mut received = 0u64;
        while let Some(report) = rx.recv().await {
            received += 1;
            // one line per second at 60 Hz
            if received % 60 == 1 {
                info!("{}", report);
            }
        }
        received
    });

    sampler.handle_lifecycle(LifecycleEvent::Foreground);

    let mut frames = interval(FRAME_PERIOD);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        select! {
            _ = cancel.cancelled() => {
                break;
            }
            _ = frames.tick() => {
                sampler.on_tick(MonotonicClock::timestamp());
            }
        }
    }

    sampler.handle_lifecycle(LifecycleEvent::Background);
    drop(sampler);

    match consumer.await {
        Ok(received) => info!("stopped after {} reports", received),
        Err(err) => error!("report consumer failed: {}", err),
    }
}
