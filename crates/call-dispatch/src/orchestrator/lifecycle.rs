//! Dispatcher lifecycle: launching and cancelling the agent and routing tasks

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::dispatcher::{Dispatcher, RunningTasks};
use crate::error::{CallCenterError, Result};

impl Dispatcher {
    /// Launch every agent's processing loop and the routing loop
    ///
    /// All tasks share one cancellation token, so [`Dispatcher::stop`] ends
    /// them together. Must be called from within a tokio runtime.
    ///
    /// Fails with `Lifecycle` if the dispatcher is already running, or if
    /// tasks from a previous run have not finished yet (await
    /// [`Dispatcher::shutdown`] before restarting).
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(CallCenterError::lifecycle("dispatcher is already started"));
        }

        {
            let mut retired = self.retired.lock();
            retired.retain(|handle| !handle.is_finished());
            if !retired.is_empty() {
                return Err(CallCenterError::lifecycle(format!(
                    "{} tasks from the previous run are still shutting down",
                    retired.len()
                )));
            }
        }

        let cancel = CancellationToken::new();
        let mut handles = Vec::with_capacity(self.roster().len() + 1);

        for agent in self.roster() {
            let ctx = self.processing_context(cancel.child_token());
            let agent = Arc::clone(agent);
            handles.push(tokio::spawn(async move {
                let agent_id = agent.id().clone();
                if let Err(e) = agent.run(ctx).await {
                    error!(agent_id = %agent_id, "❌ Agent processing loop failed: {}", e);
                }
            }));
        }

        let dispatcher = Arc::clone(self);
        let routing_cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            dispatcher.run_routing_loop(routing_cancel).await;
        }));

        self.active.store(true, Ordering::SeqCst);
        *running = Some(RunningTasks { cancel, handles });

        info!(agents = self.roster().len(), "✅ Dispatcher started");
        Ok(())
    }

    /// Request every launched task to stop
    ///
    /// Returns immediately. Calls already being handled are interrupted,
    /// their agents still return to `Available`. Pending calls stay queued.
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);

        let Some(tasks) = self.running.lock().take() else {
            warn!("Dispatcher stop requested but it is not running");
            return;
        };

        info!("🛑 Stopping dispatcher...");
        tasks.cancel.cancel();
        self.retired.lock().extend(tasks.handles);
    }

    /// Stop and wait for every launched task to finish
    pub async fn shutdown(&self) {
        self.stop();

        let handles: Vec<_> = self.retired.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!("Dispatcher task ended abnormally: {}", e);
            }
        }

        info!("✅ Dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, AgentStatus};
    use crate::call::Call;
    use crate::config::DispatchConfig;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn dispatcher(agents: usize) -> Arc<Dispatcher> {
        let roster = (0..agents).map(|_| Arc::new(Agent::operator())).collect();
        let config = DispatchConfig {
            time_unit_ms: 10,
            retry_delay_ms: 5,
            max_assignment_attempts: None,
        };
        Arc::new(Dispatcher::with_config(roster, config).unwrap())
    }

    #[tokio::test]
    async fn test_start_twice_rejected() {
        let dispatcher = dispatcher(1);
        assert_ok!(dispatcher.start());
        assert!(dispatcher.is_active());

        let err = assert_err!(dispatcher.start());
        assert!(matches!(err, CallCenterError::Lifecycle(_)));

        dispatcher.shutdown().await;
        assert!(!dispatcher.is_active());
    }

    #[tokio::test]
    async fn test_stop_halts_agent_loops() {
        let dispatcher = dispatcher(2);
        dispatcher.start().unwrap();
        dispatcher.dispatch_call(Call::new(1_000).unwrap());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(dispatcher.stats().busy_agents, 1);

        dispatcher.shutdown().await;

        for agent in dispatcher.roster() {
            assert!(!agent.is_running());
            assert_eq!(agent.status(), AgentStatus::Available);
        }
        assert_eq!(dispatcher.roster().iter().map(|a| a.interrupted_calls()).sum::<u64>(), 1);
    }

    #[tokio::test]
    async fn test_calls_wait_while_stopped_and_resume_after_restart() {
        let dispatcher = dispatcher(1);
        dispatcher.start().unwrap();
        dispatcher.shutdown().await;

        dispatcher.dispatch_call(Call::new(1).unwrap());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(dispatcher.pending_calls().len(), 1);

        dispatcher.start().unwrap();
        assert_ok!(dispatcher.wait_for_completions(1, Duration::from_secs(5)).await);
        assert!(dispatcher.pending_calls().is_empty());

        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_without_start_is_harmless() {
        let dispatcher = dispatcher(1);
        dispatcher.stop();
        dispatcher.shutdown().await;
        assert!(!dispatcher.is_active());
    }

    #[tokio::test]
    async fn test_driver_owned_routing_loop() {
        let dispatcher = dispatcher(1);
        let agent = dispatcher.roster()[0].clone();
        let cancel = CancellationToken::new();

        let ctx = dispatcher.processing_context(cancel.child_token());
        let agent_task = tokio::spawn(agent.clone().run(ctx));
        let routing = {
            let dispatcher = dispatcher.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { dispatcher.run_routing_loop(cancel).await })
        };

        dispatcher.dispatch_call(Call::new(1).unwrap());
        dispatcher.dispatch_call(Call::new(1).unwrap());
        assert_ok!(dispatcher.wait_for_completions(2, Duration::from_secs(5)).await);

        cancel.cancel();
        routing.await.unwrap();
        assert_ok!(agent_task.await.unwrap());
        assert_eq!(agent.completed_count(), 2);
    }
}
