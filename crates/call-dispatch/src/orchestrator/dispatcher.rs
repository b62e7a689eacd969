//! Dispatcher: roster, pending queue and the routing loop

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::pending::{PendingCall, PendingQueue};
use crate::agent::{Agent, AgentStatus, ProcessingContext};
use crate::call::Call;
use crate::config::DispatchConfig;
use crate::error::{CallCenterError, Result};
use crate::routing::{self, RoutingOutcome};

/// Tasks launched by `start`, owned until `stop`/`shutdown`
#[derive(Debug)]
pub(super) struct RunningTasks {
    pub(super) cancel: CancellationToken,
    pub(super) handles: Vec<JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct RoutingCounters {
    dispatched: AtomicU64,
    assigned: AtomicU64,
    failures: AtomicU64,
}

/// Snapshot of dispatcher activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherStats {
    pub pending_calls: usize,
    pub parked_calls: usize,
    pub dispatched_calls: u64,
    pub assigned_calls: u64,
    pub assignment_failures: u64,
    pub completed_calls: usize,
    pub available_agents: usize,
    pub busy_agents: usize,
    pub longest_wait_ms: u64,
}

/// Routing authority of the call center
///
/// Holds a fixed, non-empty roster and a queue of calls waiting for an
/// agent. The routing loop hands each pending call to the least escalated
/// agent that is free, and waits on a notification whenever there is nothing
/// to do: a new call or an agent freeing up wakes it.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use call_dispatch::{Agent, Call, Dispatcher, DispatchConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let roster = vec![Arc::new(Agent::operator()), Arc::new(Agent::supervisor())];
/// let config = DispatchConfig { time_unit_ms: 10, ..Default::default() };
/// let dispatcher = Arc::new(Dispatcher::with_config(roster, config)?);
///
/// dispatcher.dispatch_call(Call::new(3)?);
/// dispatcher.start()?;
/// dispatcher.wait_for_completions(1, std::time::Duration::from_secs(5)).await?;
/// dispatcher.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Dispatcher {
    roster: Vec<Arc<Agent>>,
    pending: PendingQueue,
    parked: Mutex<Vec<PendingCall>>,
    /// Woken by new calls and by agents returning to `Available`
    routing_signal: Arc<Notify>,
    /// Woken whenever any agent logs a completed call
    completion_signal: Arc<Notify>,
    pub(super) active: AtomicBool,
    pub(super) config: DispatchConfig,
    pub(super) running: Mutex<Option<RunningTasks>>,
    pub(super) retired: Mutex<Vec<JoinHandle<()>>>,
    counters: RoutingCounters,
}

impl Dispatcher {
    /// Create a dispatcher with the default configuration
    ///
    /// Fails with `InvalidArgument` if `roster` is empty.
    pub fn new(roster: Vec<Arc<Agent>>) -> Result<Self> {
        Self::with_config(roster, DispatchConfig::default())
    }

    pub fn with_config(roster: Vec<Arc<Agent>>, config: DispatchConfig) -> Result<Self> {
        if roster.is_empty() {
            return Err(CallCenterError::invalid_argument("agent roster must not be empty"));
        }
        config.validate()?;

        info!(agents = roster.len(), time_unit_ms = config.time_unit_ms, "🚀 Creating dispatcher");

        Ok(Self {
            roster,
            pending: PendingQueue::new(),
            parked: Mutex::new(Vec::new()),
            routing_signal: Arc::new(Notify::new()),
            completion_signal: Arc::new(Notify::new()),
            active: AtomicBool::new(false),
            config,
            running: Mutex::new(None),
            retired: Mutex::new(Vec::new()),
            counters: RoutingCounters::default(),
        })
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn roster(&self) -> &[Arc<Agent>] {
        &self.roster
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Context for an agent loop driven by this dispatcher
    ///
    /// Wires the agent's "available" and "completed" signals to the routing
    /// loop and to `wait_for_completions`.
    pub fn processing_context(&self, cancel: CancellationToken) -> ProcessingContext {
        ProcessingContext {
            time_unit: self.config.time_unit(),
            cancel,
            on_available: Arc::clone(&self.routing_signal),
            on_completed: Arc::clone(&self.completion_signal),
        }
    }

    /// Queue a call for routing
    ///
    /// Never blocks. Calls dispatched before `start` wait in the queue.
    pub fn dispatch_call(&self, call: Call) {
        info!(call_id = %call.id(), duration = call.duration_units(), "📥 New call queued");
        let depth = self.pending.push_back(call);
        self.counters.dispatched.fetch_add(1, Ordering::Relaxed);
        debug!(pending = depth, "Pending queue size");
        self.routing_signal.notify_one();
    }

    /// Least escalated agent that is accepting work, if any
    pub fn select_available_agent(&self) -> Option<Arc<Agent>> {
        routing::select_available_agent(&self.roster)
    }

    /// Run one routing step
    ///
    /// Hands the head of the pending queue to the selected agent. A failed
    /// handoff puts the call back at the head, or parks it when a maximum
    /// number of attempts is configured and has been reached.
    pub fn route_next(&self) -> RoutingOutcome {
        if self.pending.is_empty() {
            return RoutingOutcome::Idle;
        }

        let Some(agent) = self.select_available_agent() else {
            return RoutingOutcome::NoAgentAvailable;
        };

        let Some(pending) = self.pending.pop_front() else {
            return RoutingOutcome::Idle;
        };

        self.hand_off(&agent, pending)
    }

    fn hand_off(&self, agent: &Agent, mut pending: PendingCall) -> RoutingOutcome {
        let call_id = pending.call.id();

        match agent.claim(pending.call.clone()) {
            Ok(()) => {
                self.counters.assigned.fetch_add(1, Ordering::Relaxed);
                RoutingOutcome::Assigned {
                    call_id,
                    agent_id: agent.id().clone(),
                }
            }
            Err(e) => {
                pending.attempts += 1;
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(call_id = %call_id, agent_id = %agent.id(), attempts = pending.attempts, "⚠️ {}", e);

                let attempts = pending.attempts;
                match self.config.max_assignment_attempts {
                    Some(max) if attempts >= max => {
                        warn!(call_id = %call_id, attempts, "🅿️ Call parked after exhausting assignment attempts");
                        self.parked.lock().push(pending);
                        RoutingOutcome::Parked { call_id, attempts }
                    }
                    _ => {
                        self.pending.push_front(pending);
                        RoutingOutcome::Requeued { call_id, attempts }
                    }
                }
            }
        }
    }

    /// Routing loop
    ///
    /// Runs until `cancel` fires. `start` spawns it; a driver that wants to
    /// own the routing task can call it directly instead.
    pub async fn run_routing_loop(&self, cancel: CancellationToken) {
        info!("🔄 Starting routing loop");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let outcome = self.route_next();
            if outcome.made_progress() {
                debug!("{}", outcome);
                continue;
            }

            if !self.pause_routing(&outcome, &cancel).await {
                break;
            }
        }

        info!("Routing loop stopped");
    }

    /// Wait before the next routing step; `false` once `cancel` fires
    ///
    /// A failed handoff backs off for `retry_delay`. Anything else sleeps
    /// until a call is dispatched or an agent frees up.
    async fn pause_routing(&self, outcome: &RoutingOutcome, cancel: &CancellationToken) -> bool {
        match outcome {
            RoutingOutcome::Requeued { call_id, attempts } => {
                debug!(call_id = %call_id, attempts, "Retrying handoff after back-off");
                tokio::select! {
                    _ = tokio::time::sleep(self.config.retry_delay()) => true,
                    _ = cancel.cancelled() => false,
                }
            }
            _ => {
                tokio::select! {
                    _ = self.routing_signal.notified() => true,
                    _ = cancel.cancelled() => false,
                }
            }
        }
    }

    /// Copy of the calls still waiting for an agent, head first
    pub fn pending_calls(&self) -> Vec<Call> {
        self.pending.snapshot()
    }

    /// Calls that exhausted `max_assignment_attempts`
    pub fn parked_calls(&self) -> Vec<Call> {
        self.parked.lock().iter().map(|pending| pending.call.clone()).collect()
    }

    /// Total number of calls in all completed logs
    pub fn completed_count(&self) -> usize {
        self.roster.iter().map(|agent| agent.completed_count()).sum()
    }

    pub fn stats(&self) -> DispatcherStats {
        let busy_agents = self
            .roster
            .iter()
            .filter(|agent| agent.status() == AgentStatus::Busy)
            .count();
        let available_agents = self
            .roster
            .iter()
            .filter(|agent| agent.is_accepting_work())
            .count();

        DispatcherStats {
            pending_calls: self.pending.len(),
            parked_calls: self.parked.lock().len(),
            dispatched_calls: self.counters.dispatched.load(Ordering::Relaxed),
            assigned_calls: self.counters.assigned.load(Ordering::Relaxed),
            assignment_failures: self.counters.failures.load(Ordering::Relaxed),
            completed_calls: self.completed_count(),
            available_agents,
            busy_agents,
            longest_wait_ms: self.pending.longest_wait_ms(),
        }
    }

    /// Wait until the completed logs hold at least `expected` calls
    ///
    /// Fails with `Lifecycle` if `timeout` elapses first.
    pub async fn wait_for_completions(&self, expected: usize, timeout: Duration) -> Result<()> {
        let wait = async {
            loop {
                let notified = self.completion_signal.notified();
                tokio::pin!(notified);
                // Registered before the count is read, so no completion is missed.
                notified.as_mut().enable();

                if self.completed_count() >= expected {
                    break;
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout, wait).await.map_err(|_| {
            CallCenterError::lifecycle(format!(
                "only {} of {} calls completed within {:?}",
                self.completed_count(),
                expected,
                timeout
            ))
        })
    }
}

/// Builder for `Dispatcher`
///
/// Unlike `Dispatcher::new`, the builder can be asked to build without a
/// roster at all, which fails with `InvalidArgument`.
#[derive(Default)]
pub struct DispatcherBuilder {
    roster: Option<Vec<Arc<Agent>>>,
    config: DispatchConfig,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roster(mut self, roster: Vec<Arc<Agent>>) -> Self {
        self.roster = Some(roster);
        self
    }

    pub fn with_agent(mut self, agent: Arc<Agent>) -> Self {
        self.roster.get_or_insert_with(Vec::new).push(agent);
        self
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Dispatcher> {
        let roster = self
            .roster
            .ok_or_else(|| CallCenterError::invalid_argument("agent roster not provided"))?;
        Dispatcher::with_config(roster, self.config)
    }
}
