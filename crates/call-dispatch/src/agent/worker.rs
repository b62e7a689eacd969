//! Agent state machine and processing loop

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{AgentId, AgentRole, AgentStatus};
use crate::call::Call;
use crate::config::RosterConfig;
use crate::error::{CallCenterError, Result};

/// Everything a running agent needs from its host
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    /// Wall-clock length of one unit of call duration
    pub time_unit: Duration,
    /// Stops the processing loop and interrupts in-flight handling
    pub cancel: CancellationToken,
    /// Signalled every time the agent returns to `Available`
    pub on_available: Arc<Notify>,
    /// Wakes every waiter once a call lands in the completed log
    pub on_completed: Arc<Notify>,
}

impl ProcessingContext {
    pub fn new(time_unit: Duration, cancel: CancellationToken) -> Self {
        Self {
            time_unit,
            cancel,
            on_available: Arc::new(Notify::new()),
            on_completed: Arc::new(Notify::new()),
        }
    }
}

/// Status and inbound queue share one lock so that dequeuing a call and
/// turning `Busy` is a single step as seen by the dispatcher.
#[derive(Debug)]
struct WorkState {
    status: AgentStatus,
    inbound: VecDeque<Call>,
    closed: bool,
}

/// A call center agent
///
/// The agent is a passive holder of its queues; work is driven by
/// [`Agent::run`], normally spawned by the dispatcher. The dispatcher writes
/// the inbound queue, the agent alone drains it.
#[derive(Debug)]
pub struct Agent {
    id: AgentId,
    role: AgentRole,
    state: Mutex<WorkState>,
    completed: Mutex<Vec<Call>>,
    work_ready: Notify,
    running: AtomicBool,
    interrupted: AtomicU64,
}

impl Agent {
    /// Create a new agent with a generated id
    pub fn new(role: AgentRole) -> Self {
        Self::with_id(AgentId::generate(role), role)
    }

    pub fn with_id(id: impl Into<AgentId>, role: AgentRole) -> Self {
        let id = id.into();
        debug!(agent_id = %id, role = %role, "Creating new agent");

        Self {
            id,
            role,
            state: Mutex::new(WorkState {
                status: AgentStatus::Available,
                inbound: VecDeque::new(),
                closed: false,
            }),
            completed: Mutex::new(Vec::new()),
            work_ready: Notify::new(),
            running: AtomicBool::new(false),
            interrupted: AtomicU64::new(0),
        }
    }

    pub fn operator() -> Self {
        Self::new(AgentRole::Operator)
    }

    pub fn supervisor() -> Self {
        Self::new(AgentRole::Supervisor)
    }

    pub fn director() -> Self {
        Self::new(AgentRole::Director)
    }

    /// Build a shared roster, operators first, then supervisors, then directors
    pub fn roster(config: &RosterConfig) -> Vec<Arc<Agent>> {
        let tiers = [
            (AgentRole::Operator, config.operators),
            (AgentRole::Supervisor, config.supervisors),
            (AgentRole::Director, config.directors),
        ];

        tiers
            .into_iter()
            .flat_map(|(role, count)| (0..count).map(move |_| Arc::new(Agent::new(role))))
            .collect()
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn priority(&self) -> u8 {
        self.role.priority()
    }

    pub fn status(&self) -> AgentStatus {
        self.state.lock().status
    }

    /// Available, nothing queued, and the processing loop has not shut down
    pub fn is_accepting_work(&self) -> bool {
        let state = self.state.lock();
        !state.closed && state.status == AgentStatus::Available && state.inbound.is_empty()
    }

    /// Whether a processing loop is currently driving this agent
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of calls whose handling was cut short by cancellation
    pub fn interrupted_calls(&self) -> u64 {
        self.interrupted.load(Ordering::Relaxed)
    }

    /// Append a call to the inbound queue
    ///
    /// Never blocks and does not touch the agent status. Calls queued while
    /// the agent is busy are handled in arrival order once it frees up.
    pub fn assign(&self, call: Call) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(CallCenterError::assignment(format!(
                "agent {} has shut down",
                self.id
            )));
        }

        info!(agent_id = %self.id, call_id = %call.id(), duration = call.duration_units(), "📞 Call assigned to agent");
        state.inbound.push_back(call);
        drop(state);

        self.work_ready.notify_one();
        Ok(())
    }

    /// Hand a call over only if the agent is accepting work right now
    ///
    /// The idle check and the enqueue happen under the agent's state lock,
    /// so two routing decisions can never both land on the same agent.
    pub fn claim(&self, call: Call) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(CallCenterError::assignment(format!(
                "agent {} has shut down",
                self.id
            )));
        }
        if state.status != AgentStatus::Available || !state.inbound.is_empty() {
            return Err(CallCenterError::assignment(format!(
                "agent {} is no longer available ({}, {} queued)",
                self.id,
                state.status,
                state.inbound.len()
            )));
        }

        info!(agent_id = %self.id, role = %self.role, call_id = %call.id(), "📞 Call claimed by agent");
        state.inbound.push_back(call);
        drop(state);

        self.work_ready.notify_one();
        Ok(())
    }

    /// Copy of the calls waiting in the inbound queue
    pub fn snapshot_inbound(&self) -> Vec<Call> {
        self.state.lock().inbound.iter().cloned().collect()
    }

    /// Copy of the calls this agent has finished handling
    pub fn snapshot_completed(&self) -> Vec<Call> {
        self.completed.lock().clone()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.lock().len()
    }

    /// Processing loop
    ///
    /// Pulls calls off the inbound queue one at a time and holds the agent
    /// `Busy` for each call's duration. Sleeps on a notification while the
    /// queue is empty. Returns once `ctx.cancel` fires; a call in progress at
    /// that point is cut short, but the agent still goes back to `Available`.
    ///
    /// Fails with `Lifecycle` if another loop is already driving this agent.
    pub async fn run(self: Arc<Self>, ctx: ProcessingContext) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(CallCenterError::lifecycle(format!(
                "agent {} is already running",
                self.id
            )));
        }
        let _running = RunGuard::open(&self);

        info!(agent_id = %self.id, role = %self.role, "Agent processing loop started");
        ctx.on_available.notify_one();

        loop {
            if ctx.cancel.is_cancelled() {
                break;
            }

            let call = match self.begin_next_call() {
                Some(call) => call,
                None => {
                    tokio::select! {
                        _ = self.work_ready.notified() => {}
                        _ = ctx.cancel.cancelled() => break,
                    }
                    continue;
                }
            };

            let call_id = call.id();
            let units = call.duration_units();
            if let Err(e) = self.handle(call, &ctx).await {
                self.interrupted.fetch_add(1, Ordering::Relaxed);
                warn!(agent_id = %self.id, call_id = %call_id, "⚠️ {}", e);
            } else {
                info!(agent_id = %self.id, call_id = %call_id, duration = units, "✅ Call finished");
            }
        }

        info!(agent_id = %self.id, "Agent processing loop stopped");
        Ok(())
    }

    /// Pop the oldest inbound call and turn `Busy` in the same critical section
    fn begin_next_call(&self) -> Option<Call> {
        let mut state = self.state.lock();
        let call = state.inbound.pop_front()?;
        state.status = AgentStatus::Busy;
        debug!(agent_id = %self.id, status = %state.status, "Agent status changed");
        Some(call)
    }

    /// Hold the agent `Busy` for the call's duration
    ///
    /// The call is owned by the guard from here on, so it reaches the
    /// completed log however handling ends.
    async fn handle(&self, call: Call, ctx: &ProcessingContext) -> Result<()> {
        let handling_time = call.handling_time(ctx.time_unit);
        let summary = call.to_string();
        debug!(agent_id = %self.id, call_id = %call.id(), duration = call.duration_units(), "Handling call");

        let _busy = BusyGuard {
            agent: self,
            call: Some(call),
            on_available: &ctx.on_available,
            on_completed: &ctx.on_completed,
        };

        tokio::select! {
            _ = tokio::time::sleep(handling_time) => Ok(()),
            _ = ctx.cancel.cancelled() => Err(CallCenterError::interrupted(format!(
                "agent {} did not finish {}",
                self.id, summary
            ))),
        }
    }

    fn mark_available(&self) {
        let mut state = self.state.lock();
        state.status = AgentStatus::Available;
        debug!(agent_id = %self.id, status = %state.status, "Agent status changed");
    }
}

/// Returns the agent to `Available` and then logs the call as completed on
/// every exit from handling, including the surrounding task being aborted
/// mid-sleep.
struct BusyGuard<'a> {
    agent: &'a Agent,
    call: Option<Call>,
    on_available: &'a Notify,
    on_completed: &'a Notify,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.agent.mark_available();
        if let Some(call) = self.call.take() {
            self.agent.completed.lock().push(call);
        }
        self.on_available.notify_one();
        self.on_completed.notify_waiters();
    }
}

/// Keeps the `closed`/`running` flags in step with the processing loop.
struct RunGuard<'a> {
    agent: &'a Agent,
}

impl<'a> RunGuard<'a> {
    fn open(agent: &'a Agent) -> Self {
        agent.state.lock().closed = false;
        Self { agent }
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.agent.state.lock().closed = true;
        self.agent.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;
    use tokio_test::{assert_err, assert_ok};

    const UNIT: Duration = Duration::from_millis(10);

    fn spawn_agent(agent: &Arc<Agent>) -> (CancellationToken, tokio::task::JoinHandle<Result<()>>) {
        let cancel = CancellationToken::new();
        let ctx = ProcessingContext::new(UNIT, cancel.clone());
        let handle = tokio::spawn(agent.clone().run(ctx));
        (cancel, handle)
    }

    async fn wait_for_completed(agent: &Agent, count: usize) {
        for _ in 0..200 {
            if agent.completed_count() >= count {
                return;
            }
            sleep(UNIT).await;
        }
        panic!("agent {} completed {} of {} calls", agent.id(), agent.completed_count(), count);
    }

    #[test]
    fn test_new_agent_is_available_and_empty() {
        let agent = Agent::operator();
        assert_eq!(agent.role(), AgentRole::Operator);
        assert_eq!(agent.priority(), 1);
        assert_eq!(agent.status(), AgentStatus::Available);
        assert!(agent.snapshot_inbound().is_empty());
        assert!(agent.snapshot_completed().is_empty());
        assert!(agent.is_accepting_work());
        assert!(!agent.is_running());
    }

    #[test]
    fn test_factories_set_role_priority() {
        assert_eq!(Agent::supervisor().priority(), 2);
        assert_eq!(Agent::director().priority(), 3);
    }

    #[test]
    fn test_roster_orders_tiers() {
        let roster = Agent::roster(&RosterConfig::default());
        let roles: Vec<_> = roster.iter().map(|a| a.role()).collect();
        assert_eq!(roles.len(), 10);
        assert!(roles[..6].iter().all(|r| *r == AgentRole::Operator));
        assert!(roles[6..9].iter().all(|r| *r == AgentRole::Supervisor));
        assert_eq!(roles[9], AgentRole::Director);
    }

    #[test]
    fn test_assign_queues_without_changing_status() {
        let agent = Agent::operator();
        let first = Call::new(1).unwrap();
        let second = Call::new(2).unwrap();

        assert_ok!(agent.assign(first.clone()));
        assert_ok!(agent.assign(second.clone()));

        assert_eq!(agent.status(), AgentStatus::Available);
        assert_eq!(agent.snapshot_inbound(), vec![first, second]);
        assert!(!agent.is_accepting_work());
    }

    #[test]
    fn test_claim_refuses_agent_with_queued_work() {
        let agent = Agent::operator();
        assert_ok!(agent.claim(Call::new(1).unwrap()));

        let err = assert_err!(agent.claim(Call::new(1).unwrap()));
        assert!(err.is_transient());
        assert_eq!(agent.snapshot_inbound().len(), 1);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let agent = Agent::operator();
        agent.assign(Call::new(1).unwrap()).unwrap();

        let mut snapshot = agent.snapshot_inbound();
        snapshot.clear();
        assert_eq!(agent.snapshot_inbound().len(), 1);
    }

    #[tokio::test]
    async fn test_agent_handles_one_call() {
        let agent = Arc::new(Agent::operator());
        let (cancel, handle) = spawn_agent(&agent);

        let call = Call::random_between(0, 1).unwrap();
        agent.assign(call.clone()).unwrap();

        wait_for_completed(&agent, 1).await;
        assert_eq!(agent.status(), AgentStatus::Available);
        assert_eq!(agent.snapshot_completed(), vec![call]);
        assert!(agent.snapshot_inbound().is_empty());

        cancel.cancel();
        assert_ok!(handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_second_call_waits_while_busy() {
        let agent = Arc::new(Agent::operator());
        let (cancel, handle) = spawn_agent(&agent);

        let long = Call::new(20).unwrap();
        let short = Call::new(1).unwrap();
        agent.assign(long.clone()).unwrap();
        agent.assign(short.clone()).unwrap();

        sleep(UNIT * 5).await;
        assert_eq!(agent.status(), AgentStatus::Busy);
        assert_eq!(agent.snapshot_inbound(), vec![short.clone()]);
        assert!(agent.snapshot_completed().is_empty());

        wait_for_completed(&agent, 2).await;
        assert_eq!(agent.snapshot_completed(), vec![long, short]);
        assert_eq!(agent.status(), AgentStatus::Available);

        cancel.cancel();
        assert_ok!(handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_mid_call_resets_to_available() {
        let agent = Arc::new(Agent::operator());
        let (cancel, handle) = spawn_agent(&agent);

        agent.assign(Call::new(1_000).unwrap()).unwrap();
        sleep(UNIT * 3).await;
        assert_eq!(agent.status(), AgentStatus::Busy);

        cancel.cancel();
        assert_ok!(handle.await.unwrap());

        assert_eq!(agent.status(), AgentStatus::Available);
        assert_eq!(agent.interrupted_calls(), 1);
        assert_eq!(agent.completed_count(), 1);
        assert!(!agent.is_running());
    }

    #[tokio::test]
    async fn test_abort_mid_call_resets_to_available() {
        let agent = Arc::new(Agent::operator());
        let (_cancel, handle) = spawn_agent(&agent);

        agent.assign(Call::new(1_000).unwrap()).unwrap();
        sleep(UNIT * 3).await;
        assert_eq!(agent.status(), AgentStatus::Busy);

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        assert_eq!(agent.status(), AgentStatus::Available);
        assert!(!agent.is_running());
        // The aborted call is still accounted for.
        assert_eq!(agent.completed_count(), 1);
        assert!(agent.snapshot_inbound().is_empty());
    }

    #[tokio::test]
    async fn test_available_signal_fires_after_each_call() {
        let agent = Arc::new(Agent::operator());
        let cancel = CancellationToken::new();
        let ctx = ProcessingContext::new(UNIT, cancel.clone());
        let on_available = ctx.on_available.clone();
        let handle = tokio::spawn(agent.clone().run(ctx));

        tokio::time::timeout(Duration::from_secs(2), on_available.notified())
            .await
            .expect("agent should signal when its loop starts");

        agent.assign(Call::new(1).unwrap()).unwrap();
        tokio::time::timeout(Duration::from_secs(2), on_available.notified())
            .await
            .expect("agent should signal availability");
        assert_eq!(agent.status(), AgentStatus::Available);

        cancel.cancel();
        assert_ok!(handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_stopped_agent_rejects_work() {
        let agent = Arc::new(Agent::operator());
        let (cancel, handle) = spawn_agent(&agent);
        sleep(UNIT).await;

        cancel.cancel();
        assert_ok!(handle.await.unwrap());

        assert!(!agent.is_accepting_work());
        let err = assert_err!(agent.assign(Call::new(1).unwrap()));
        assert!(matches!(err, CallCenterError::AssignmentFailure(_)));
        assert_err!(agent.claim(Call::new(1).unwrap()));
    }

    #[tokio::test]
    async fn test_second_loop_is_rejected() {
        let agent = Arc::new(Agent::operator());
        let (cancel, handle) = spawn_agent(&agent);
        sleep(UNIT).await;

        let ctx = ProcessingContext::new(UNIT, CancellationToken::new());
        let err = assert_err!(agent.clone().run(ctx).await);
        assert!(matches!(err, CallCenterError::Lifecycle(_)));

        cancel.cancel();
        assert_ok!(handle.await.unwrap());
    }
}
