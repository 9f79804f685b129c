//! Main application entry point (CLI binary).
//!
//! A thin wrapper around the `flood_guard` library that:
//! - loads `.env` and parses options (flags fall back to environment variables)
//! - initializes the logger and the admission gate
//! - optionally pushes no-op calls through the gate to exercise the limits
//! - prints the resulting statistics as JSON
//!
//! All limiter logic lives in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;
use tokio_util::sync::CancellationToken;

use flood_guard::initialization::{init_gate, init_logger_with};
use flood_guard::{AdmissionGate, CallError, Config, GateError, Opt};

#[tokio::main]
async fn main() -> Result<()> {
    if dotenvy::dotenv().is_err() {
        // Fall back to a .env next to the executable
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(env_path) = exe_path.parent().map(|dir| dir.join(".env")) {
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let opt = Opt::parse();
    let config = Config::from(&opt);

    init_logger_with(config.log_level.clone().into(), config.log_format.clone())
        .context("Failed to initialize logger")?;

    let gate = match init_gate(&config) {
        Ok(gate) => gate,
        Err(e) => {
            eprintln!("flood_guard error: {:#}", e);
            process::exit(2);
        }
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, stopping after the current call");
            ctrl_c.cancel();
        }
    });

    let completed = simulate(&gate, &opt, &cancel).await;

    let stats = gate.get_stats().await;
    let json = serde_json::to_string_pretty(&stats).context("Failed to serialize statistics")?;
    println!("{}", json);
    if opt.simulate_items > 0 {
        println!(
            "Admitted {}/{} simulated {} call{} ({} flood wait{}, {} quota rejection{})",
            completed,
            opt.simulate_items,
            opt.simulate_category,
            if opt.simulate_items == 1 { "" } else { "s" },
            stats.flood_waits,
            if stats.flood_waits == 1 { "" } else { "s" },
            stats.quota_rejections,
            if stats.quota_rejections == 1 { "" } else { "s" },
        );
    }
    Ok(())
}

/// Sends `opt.simulate_items` no-op calls through `gate`; returns how many ran.
async fn simulate(gate: &AdmissionGate, opt: &Opt, cancel: &CancellationToken) -> u64 {
    let mut completed = 0;
    for item in 1..=opt.simulate_items {
        let result = gate
            .safe_call_cancellable(cancel, opt.simulate_category, 1, || async {
                Ok::<_, CallError>(())
            })
            .await;
        match result {
            Ok(()) => completed += 1,
            Err(GateError::Cancelled) => break,
            Err(e @ GateError::QuotaExceeded { .. }) => {
                log::warn!("Stopping simulation: {}", e);
                break;
            }
            Err(e) => log::warn!("Simulated call {} failed: {}", item, e),
        }
        if cancel.is_cancelled() {
            break;
        }
        gate.smart_pause(&opt.pace_label, item).await;
    }
    completed
}
