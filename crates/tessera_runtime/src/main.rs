//! Tessera Runtime
//!
//! Headless particle run over the registry. Pass a JSON settings file as
//! the first argument to override defaults; `RUST_LOG` controls logging.

mod settings;
mod sim;

use anyhow::Result;
use settings::RuntimeSettings;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tessera_core::ecs::Registry;
use tessera_metrics::{ListenerProfiler, TickTimer};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Tessera v{}", tessera_core::VERSION);

    let path = std::env::args().nth(1).map(PathBuf::from);
    let settings = RuntimeSettings::load(path.as_deref())?;
    tracing::info!(?settings, "Settings loaded");

    let mut registry = Registry::with_config(settings.registry.clone());
    let destroyed = Arc::new(AtomicUsize::new(0));
    {
        let destroyed = Arc::clone(&destroyed);
        registry.on_destroy().connect(move |_, _| {
            destroyed.fetch_add(1, Ordering::Relaxed);
        });
    }

    let phases = sim::build_phases(&settings)?;
    tracing::info!(order = ?phases.names(), "Phases ordered");

    let mut profiler = ListenerProfiler::new();
    let mut timer = TickTimer::new(120);

    for frame in 0..settings.frames {
        timer.start();
        phases.invoke_profiled(&mut profiler, &mut registry, settings.dt);
        timer.stop();

        if settings.report_every > 0 && frame % settings.report_every == 0 {
            let (min_ms, max_ms) = timer.range_ms();
            tracing::info!(
                frame,
                entities = registry.len(),
                tps = format!("{:.1}", timer.ticks_per_second()),
                min_ms = format!("{min_ms:.3}"),
                max_ms = format!("{max_ms:.3}"),
                "Tick"
            );
        }
    }

    for (name, timing) in profiler.report() {
        tracing::info!(
            phase = name,
            calls = timing.calls,
            total_ms = timing.total.as_secs_f64() * 1000.0,
            mean_us = timing.mean().as_secs_f64() * 1_000_000.0,
            "Phase timing"
        );
    }
    for (name, value) in registry.counters().iter() {
        tracing::info!(counter = name, value, "Registry counter");
    }
    tracing::info!(
        live = registry.len(),
        destroyed = destroyed.load(Ordering::Relaxed),
        "Run complete"
    );

    Ok(())
}
