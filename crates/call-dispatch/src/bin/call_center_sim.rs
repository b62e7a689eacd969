//! Call Center Simulation
//!
//! Builds a roster of operators, supervisors and directors, dispatches a
//! batch of random-length calls at a steady pace, and waits until every call
//! has been handled.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use call_dispatch::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "call-center-sim", about = "Simulate routing calls to a pool of agents")]
struct Args {
    /// TOML configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    operators: Option<usize>,

    #[arg(long)]
    supervisors: Option<usize>,

    #[arg(long)]
    directors: Option<usize>,

    /// Number of calls to dispatch
    #[arg(long)]
    calls: Option<usize>,

    /// Shortest call, in time units
    #[arg(long)]
    min_duration: Option<i64>,

    /// Longest call, in time units
    #[arg(long)]
    max_duration: Option<i64>,

    /// Length of one time unit in milliseconds
    #[arg(long)]
    time_unit_ms: Option<u64>,

    /// Pause between consecutive calls in milliseconds
    #[arg(long)]
    arrival_interval_ms: Option<u64>,

    /// Give up a failing handoff after this many attempts (default: retry forever)
    #[arg(long)]
    max_assignment_attempts: Option<u32>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SimulationConfig::default(),
        };

        if let Some(v) = self.operators { config.roster.operators = v; }
        if let Some(v) = self.supervisors { config.roster.supervisors = v; }
        if let Some(v) = self.directors { config.roster.directors = v; }
        if let Some(v) = self.calls { config.traffic.calls = v; }
        if let Some(v) = self.min_duration { config.traffic.min_duration = v; }
        if let Some(v) = self.max_duration { config.traffic.max_duration = v; }
        if let Some(v) = self.arrival_interval_ms { config.traffic.arrival_interval_ms = v; }
        if let Some(v) = self.time_unit_ms { config.dispatch.time_unit_ms = v; }
        if self.max_assignment_attempts.is_some() {
            config.dispatch.max_assignment_attempts = self.max_assignment_attempts;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "call_dispatch=info,call_center_sim=info".into()),
        )
        .init();

    let config = Args::parse().into_config()?;

    info!("🏢 Starting call center simulation");
    info!("⚙️  Configuration:");
    info!("   Roster: {} operators, {} supervisors, {} directors",
          config.roster.operators, config.roster.supervisors, config.roster.directors);
    info!("   Traffic: {} calls of {}-{} units, one every {}ms",
          config.traffic.calls, config.traffic.min_duration, config.traffic.max_duration,
          config.traffic.arrival_interval_ms);
    info!("   Time unit: {}ms", config.dispatch.time_unit_ms);

    let dispatcher = Arc::new(
        Dispatcher::builder()
            .with_roster(Agent::roster(&config.roster))
            .with_config(config.dispatch.clone())
            .build()?,
    );
    dispatcher.start()?;

    let arrival = Duration::from_millis(config.traffic.arrival_interval_ms);
    for _ in 0..config.traffic.calls {
        let call = Call::random_between(config.traffic.min_duration, config.traffic.max_duration)?;
        dispatcher.dispatch_call(call);
        tokio::time::sleep(arrival).await;
    }

    // Worst case every call is served back to back by a single agent.
    let longest = config.dispatch.time_unit()
        * u32::try_from(config.traffic.max_duration).unwrap_or(u32::MAX);
    let budget = longest.saturating_mul(u32::try_from(config.traffic.calls).unwrap_or(u32::MAX))
        + Duration::from_secs(5);

    let expected = config.traffic.calls;
    tokio::select! {
        result = dispatcher.wait_for_completions(expected, budget) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
    }

    let stats = dispatcher.stats();
    dispatcher.shutdown().await;

    info!("📊 === Simulation Summary ===");
    info!("  📥 Dispatched: {}", stats.dispatched_calls);
    info!("  ✅ Completed: {}", stats.completed_calls);
    info!("  📋 Still pending: {}", stats.pending_calls);
    info!("  🅿️ Parked: {}", stats.parked_calls);
    info!("  ⚠️ Assignment failures: {}", stats.assignment_failures);
    for role in AgentRole::escalation_order() {
        let handled: usize = dispatcher
            .roster()
            .iter()
            .filter(|agent| agent.role() == role)
            .map(|agent| agent.completed_count())
            .sum();
        info!("  👤 {}: {} calls", role, handled);
    }

    Ok(())
}
