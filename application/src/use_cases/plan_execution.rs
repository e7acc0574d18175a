//! Plan Execution use case
//!
//! Turns a submitted task into an [`ExecutionPlan`]: strategy lookup,
//! complexity estimate, per-phase assignments and checkpoints.

use crate::config::OrchestrationParams;
use crate::ports::analysis::AnalysisService;
use std::sync::Arc;
use swarm_domain::{
    Checkpoint, ComplexityEstimate, DomainError, ExecutionPlan, PlannedPhase, StrategyDescriptor,
    Task, TaskAnalysisRequest, TaskAssignment,
};
use tracing::{debug, info, warn};

/// Builds execution plans. Never mutates the task it plans for.
pub struct ExecutionPlanner {
    analysis: Arc<dyn AnalysisService>,
    params: OrchestrationParams,
}

impl ExecutionPlanner {
    pub fn new(analysis: Arc<dyn AnalysisService>, params: OrchestrationParams) -> Self {
        Self { analysis, params }
    }

    pub async fn plan(&self, task: &Task) -> Result<ExecutionPlan, DomainError> {
        let (descriptor, fell_back) = StrategyDescriptor::resolve(&task.strategy);
        if fell_back {
            warn!(
                task_id = %task.id,
                strategy = %task.strategy,
                "Unknown task strategy, falling back to adaptive"
            );
        }

        let estimate = self.estimate(task).await;
        let kinds = descriptor.phases(task, estimate.complexity);
        let agent_cap = task.max_agents.min(estimate.resources.max_agents).max(1);
        let phase_count = kinds.len();

        let mut phases = Vec::with_capacity(phase_count);
        for (index, kind) in kinds.into_iter().enumerate() {
            let template = TaskAssignment::for_phase(
                kind,
                &task.required_capabilities,
                self.params.assignment_timeout,
            );
            let assignments = vec![template; kind.assignment_count(agent_cap)];
            let checkpoint = Checkpoint::new(
                index,
                phase_count,
                kind.criteria(),
                self.params.failure_threshold,
            )?;
            phases.push(PlannedPhase {
                kind,
                assignments,
                checkpoint,
            });
        }

        let plan = ExecutionPlan::new(
            task.id.clone(),
            descriptor.kind,
            phases,
            descriptor.is_parallelizable(estimate.complexity),
            descriptor.max_concurrency(task, &estimate.resources),
            estimate,
        );

        info!(
            task_id = %task.id,
            strategy = %plan.strategy(),
            complexity = %plan.estimate().complexity,
            phases = ?plan.phase_names(),
            parallelizable = plan.is_parallelizable(),
            "Execution plan created"
        );
        Ok(plan)
    }

    /// Ask the analysis service, degrading to defaults on failure or timeout.
    async fn estimate(&self, task: &Task) -> ComplexityEstimate {
        let request = TaskAnalysisRequest::from(task);
        match tokio::time::timeout(self.params.analysis_timeout, self.analysis.analyze(&request))
            .await
        {
            Ok(Ok(estimate)) => {
                debug!(task_id = %task.id, complexity = %estimate.complexity, "Analysis complete");
                estimate
            }
            Ok(Err(e)) => {
                warn!(task_id = %task.id, "Analysis failed, planning with defaults: {}", e);
                ComplexityEstimate::fallback()
            }
            Err(_) => {
                warn!(
                    task_id = %task.id,
                    timeout_ms = self.params.analysis_timeout.as_millis() as u64,
                    "Analysis timed out, planning with defaults"
                );
                ComplexityEstimate::fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::analysis::AnalysisError;
    use async_trait::async_trait;
    use std::time::Duration;
    use swarm_domain::{
        AgentRole, Complexity, ConsensusProposal, LoadDistribution, PhaseKind, ProposalAssessment,
        RebalanceSuggestion, ResourceRequirements, StrategyKind,
    };

    // ==================== Test Mocks ====================

    enum Behavior {
        Estimate(Complexity, usize),
        Fail,
        Hang,
    }

    struct FakeAnalysis {
        behavior: Behavior,
    }

    #[async_trait]
    impl AnalysisService for FakeAnalysis {
        async fn analyze(
            &self,
            _request: &TaskAnalysisRequest,
        ) -> Result<ComplexityEstimate, AnalysisError> {
            match self.behavior {
                Behavior::Estimate(complexity, max_agents) => Ok(ComplexityEstimate {
                    complexity,
                    estimated_duration_ms: 1_000,
                    resources: ResourceRequirements {
                        min_agents: 1,
                        max_agents,
                    },
                    degraded: false,
                }),
                Behavior::Fail => Err(AnalysisError::Unavailable("offline".to_string())),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(AnalysisError::Timeout)
                }
            }
        }

        async fn assess_proposal(
            &self,
            _proposal: &ConsensusProposal,
            _agent_type: &str,
        ) -> Result<ProposalAssessment, AnalysisError> {
            Ok(ProposalAssessment::default())
        }

        async fn suggest_rebalance(
            &self,
            _distribution: &LoadDistribution,
        ) -> Result<Vec<RebalanceSuggestion>, AnalysisError> {
            Ok(vec![])
        }
    }

    fn planner(behavior: Behavior) -> ExecutionPlanner {
        ExecutionPlanner::new(
            Arc::new(FakeAnalysis { behavior }),
            OrchestrationParams::default().with_analysis_timeout(Duration::from_millis(50)),
        )
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn test_sequential_plan_layout() {
        let task = Task::new("t1", "s", "Write a parser").with_strategy("sequential");
        let plan = planner(Behavior::Estimate(Complexity::Low, 3))
            .plan(&task)
            .await
            .unwrap();

        assert_eq!(
            plan.phase_names(),
            vec!["analysis", "planning", "execution", "validation"]
        );
        assert!(!plan.is_parallelizable());
        assert_eq!(plan.max_concurrency(), 1);

        let progress: Vec<f64> = plan
            .phases()
            .iter()
            .map(|p| p.checkpoint.required_progress)
            .collect();
        assert_eq!(progress, vec![25.0, 50.0, 75.0, 100.0]);
        assert_eq!(plan.phases()[0].assignments[0].role, AgentRole::Analyst);
        assert_eq!(plan.phases()[1].assignments[0].role, AgentRole::Architect);
    }

    #[tokio::test]
    async fn test_executor_count_capped_by_resources_and_task() {
        let task = Task::new("t", "s", "d")
            .with_strategy("sequential")
            .with_max_agents(5);
        let plan = planner(Behavior::Estimate(Complexity::Medium, 2))
            .plan(&task)
            .await
            .unwrap();
        let execution = plan.phase(2).unwrap();
        assert_eq!(execution.kind, PhaseKind::Execution);
        assert_eq!(execution.assignments.len(), 2);

        let task = Task::new("t", "s", "d")
            .with_strategy("sequential")
            .with_max_agents(1);
        let plan = planner(Behavior::Estimate(Complexity::Medium, 3))
            .plan(&task)
            .await
            .unwrap();
        assert_eq!(plan.phase(2).unwrap().assignments.len(), 1);
    }

    #[tokio::test]
    async fn test_assignments_carry_task_and_role_capabilities() {
        let task = Task::new("t", "s", "d")
            .with_strategy("sequential")
            .with_capability("rust");
        let plan = planner(Behavior::Estimate(Complexity::Low, 3))
            .plan(&task)
            .await
            .unwrap();
        let validation = &plan.phase(3).unwrap().assignments[0];
        assert!(validation.required_capabilities.contains("rust"));
        assert!(validation.required_capabilities.contains("validation"));
        assert_eq!(validation.timeout(), OrchestrationParams::default().assignment_timeout);
    }

    #[tokio::test]
    async fn test_unknown_strategy_falls_back_to_adaptive() {
        let task = Task::new("t", "s", "d").with_strategy("round-robin");
        let plan = planner(Behavior::Estimate(Complexity::Low, 3))
            .plan(&task)
            .await
            .unwrap();
        assert_eq!(plan.strategy(), StrategyKind::Adaptive);
        assert_eq!(plan.phase_names(), vec!["execution", "validation"]);
    }

    #[tokio::test]
    async fn test_high_complexity_adaptive_is_parallelizable() {
        let task = Task::new("t", "s", "d");
        let plan = planner(Behavior::Estimate(Complexity::High, 3))
            .plan(&task)
            .await
            .unwrap();
        assert!(plan.is_parallelizable());
        assert_eq!(plan.phase_count(), 5);
        assert_eq!(plan.max_concurrency(), 3);
    }

    #[tokio::test]
    async fn test_analysis_failure_degrades_to_medium() {
        let task = Task::new("t", "s", "d");
        let plan = planner(Behavior::Fail).plan(&task).await.unwrap();
        assert!(plan.estimate().degraded);
        assert_eq!(plan.estimate().complexity, Complexity::Medium);
        assert_eq!(plan.phase_names(), vec!["analysis", "execution", "validation"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analysis_timeout_degrades() {
        let task = Task::new("t", "s", "d").with_strategy("parallel");
        let plan = planner(Behavior::Hang).plan(&task).await.unwrap();
        assert!(plan.estimate().degraded);
        assert_eq!(
            plan.estimate().estimated_duration_ms,
            ComplexityEstimate::DEFAULT_DURATION_MS
        );
        assert!(plan.is_parallelizable());
    }
}
