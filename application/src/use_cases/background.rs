//! Background processes
//!
//! Six periodic loops keep the swarm moving between caller requests:
//!
//! | loop               | work per tick                                   |
//! |--------------------|-------------------------------------------------|
//! | task distributor   | place queued assignments on idle agents         |
//! | progress monitor   | persist `completed / total` of running tasks    |
//! | load balancer      | apply reassignment suggestions when saturated   |
//! | proposal monitor   | re-evaluate open proposals                      |
//! | timeout checker    | force proposals whose deadline has passed       |
//! | metrics collector  | persist consensus metrics                       |
//!
//! Each loop awaits its tick body before taking the next tick, so ticks of
//! one loop never overlap. All loops stop on one shared token.

use crate::config::BackgroundIntervals;
use crate::use_cases::agent_assignment::{AgentRegistry, AssignmentQueue};
use crate::use_cases::consensus_engine::ConsensusEngine;
use crate::use_cases::rebalance::Rebalancer;
use crate::use_cases::supervise_task::TaskSupervisor;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Components the loops drive
#[derive(Clone)]
pub struct BackgroundComponents {
    pub registry: Arc<AgentRegistry>,
    pub queue: Arc<AssignmentQueue>,
    pub supervisor: Arc<TaskSupervisor>,
    pub rebalancer: Arc<Rebalancer>,
    pub consensus: Arc<ConsensusEngine>,
}

/// Handles of the running loops
pub struct BackgroundProcesses {
    token: CancellationToken,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl BackgroundProcesses {
    pub fn start(components: BackgroundComponents, intervals: &BackgroundIntervals) -> Self {
        let token = CancellationToken::new();
        let mut handles = Vec::with_capacity(6);

        let BackgroundComponents {
            registry,
            queue,
            supervisor,
            rebalancer,
            consensus,
        } = components;

        handles.push((
            "task-distributor",
            spawn_loop("task-distributor", intervals.task_distributor, token.clone(), {
                move || {
                    let registry = Arc::clone(&registry);
                    let queue = Arc::clone(&queue);
                    async move {
                        if queue.is_empty() {
                            return;
                        }
                        if let Err(e) = registry.distribute(&queue).await {
                            warn!("Task distribution failed: {}", e);
                        }
                    }
                }
            }),
        ));

        handles.push((
            "progress-monitor",
            spawn_loop("progress-monitor", intervals.progress_monitor, token.clone(), {
                let supervisor = Arc::clone(&supervisor);
                move || {
                    let supervisor = Arc::clone(&supervisor);
                    async move {
                        match supervisor.persist_progress().await {
                            Ok(0) => {}
                            Ok(updated) => debug!(updated, "Task progress persisted"),
                            Err(e) => warn!("Progress update failed: {}", e),
                        }
                    }
                }
            }),
        ));

        handles.push((
            "load-balancer",
            spawn_loop("load-balancer", intervals.load_balancer, token.clone(), {
                move || {
                    let rebalancer = Arc::clone(&rebalancer);
                    async move {
                        if let Err(e) = rebalancer.rebalance().await {
                            warn!("Rebalance failed: {}", e);
                        }
                    }
                }
            }),
        ));

        handles.push((
            "proposal-monitor",
            spawn_loop("proposal-monitor", intervals.proposal_monitor, token.clone(), {
                let consensus = Arc::clone(&consensus);
                move || {
                    let consensus = Arc::clone(&consensus);
                    async move {
                        match consensus.monitor_open_proposals().await {
                            Ok(0) => {}
                            Ok(resolved) => debug!(resolved, "Open proposals resolved"),
                            Err(e) => warn!("Proposal monitoring failed: {}", e),
                        }
                    }
                }
            }),
        ));

        handles.push((
            "timeout-checker",
            spawn_loop("timeout-checker", intervals.timeout_checker, token.clone(), {
                let consensus = Arc::clone(&consensus);
                move || {
                    let consensus = Arc::clone(&consensus);
                    async move {
                        if let Err(e) = consensus.check_deadlines().await {
                            warn!("Deadline check failed: {}", e);
                        }
                    }
                }
            }),
        ));

        handles.push((
            "metrics-collector",
            spawn_loop("metrics-collector", intervals.metrics_collector, token.clone(), {
                move || {
                    let consensus = Arc::clone(&consensus);
                    async move {
                        if let Err(e) = consensus.persist_metrics().await {
                            warn!("Metrics collection failed: {}", e);
                        }
                    }
                }
            }),
        ));

        info!(loops = handles.len(), "Background processes started");
        Self { token, handles }
    }

    /// Token observed by every loop
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancel all loops and wait for them to finish their current tick.
    pub async fn shutdown(self) {
        self.token.cancel();
        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                warn!(process = name, "Background process ended abnormally: {}", e);
            }
        }
        info!("Background processes stopped");
    }
}

/// Run `body` every `period` until `token` is cancelled.
///
/// The first tick fires one period after start.
pub fn spawn_loop<F, Fut>(
    name: &'static str,
    period: Duration,
    token: CancellationToken,
    mut body: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut tick = interval_at(Instant::now() + period, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(process = name, period_ms = period.as_millis() as u64, "Background process started");

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(process = name, "Shutdown signal received");
                    break;
                }
                _ = tick.tick() => {
                    body().await;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_loop_ticks_until_cancelled() {
        let count = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let handle = spawn_loop("counter", Duration::from_secs(1), token.clone(), {
            let count = Arc::clone(&count);
            move || {
                let count = Arc::clone(&count);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        token.cancel();
        handle.await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_body_never_overlaps() {
        let count = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let handle = spawn_loop("slow", Duration::from_secs(1), token.clone(), {
            let count = Arc::clone(&count);
            move || {
                let count = Arc::clone(&count);
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2500)).await;
                }
            }
        });

        tokio::time::sleep(Duration::from_millis(5200)).await;
        token.cancel();
        handle.await.unwrap();
        // first body runs 1s..3.5s, the late tick fires once at 3.5s
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
