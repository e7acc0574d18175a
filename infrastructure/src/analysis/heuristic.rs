//! Heuristic analysis service.
//!
//! Stands in for a remote analysis backend. Complexity comes from the size
//! of the description plus the dependency and capability counts; proposal
//! assessments from the decision's action and any expertise it names;
//! rebalance suggestions from capability coverage.

use async_trait::async_trait;
use std::collections::HashSet;
use swarm_application::{AnalysisError, AnalysisService};
use swarm_domain::{
    AgentId, Complexity, ComplexityEstimate, ConsensusProposal, DecisionAction, LoadDistribution,
    ProposalAssessment, RebalanceSuggestion, ResourceRequirements, TaskAnalysisRequest,
};
use tracing::debug;

/// Complexity scores below this are low
const LOW_CEILING: usize = 3;
/// Complexity scores below this are medium
const MEDIUM_CEILING: usize = 8;
/// Alignment of a proposal that names no expertise
const NEUTRAL_ALIGNMENT: f64 = 0.8;

#[derive(Debug, Clone, Default)]
pub struct HeuristicAnalysis;

impl HeuristicAnalysis {
    pub fn new() -> Self {
        Self
    }

    fn score(request: &TaskAnalysisRequest) -> usize {
        let words = request.description.split_whitespace().count();
        words / 10 + request.dependency_count + request.required_capabilities.len()
    }

    fn classify(score: usize) -> Complexity {
        if score < LOW_CEILING {
            Complexity::Low
        } else if score < MEDIUM_CEILING {
            Complexity::Medium
        } else {
            Complexity::High
        }
    }
}

#[async_trait]
impl AnalysisService for HeuristicAnalysis {
    async fn analyze(
        &self,
        request: &TaskAnalysisRequest,
    ) -> Result<ComplexityEstimate, AnalysisError> {
        if request.description.trim().is_empty() {
            return Err(AnalysisError::InvalidResponse(
                "empty task description".to_string(),
            ));
        }

        let score = Self::score(request);
        let complexity = Self::classify(score);
        let (min_agents, max_agents, estimated_duration_ms) = match complexity {
            Complexity::Low => (1, 1, 60_000),
            Complexity::Medium => (1, 3, ComplexityEstimate::DEFAULT_DURATION_MS),
            Complexity::High => (2, 5, 900_000),
        };
        let max_agents = max_agents.min(request.max_agents.max(min_agents));
        debug!(task_id = %request.task_id, score, complexity = %complexity, "Task analysed");

        Ok(ComplexityEstimate {
            complexity,
            estimated_duration_ms,
            resources: ResourceRequirements {
                min_agents,
                max_agents,
            },
            degraded: false,
        })
    }

    async fn assess_proposal(
        &self,
        proposal: &ConsensusProposal,
        agent_type: &str,
    ) -> Result<ProposalAssessment, AnalysisError> {
        let recommendation = !matches!(proposal.action(), Some(DecisionAction::CancelTask));

        let expertise: Vec<&str> = proposal
            .decision
            .get("expertise")
            .and_then(|v| v.as_array())
            .map(|values| values.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        let expertise_alignment = if expertise.is_empty() {
            NEUTRAL_ALIGNMENT
        } else if expertise.iter().any(|e| e.eq_ignore_ascii_case(agent_type)) {
            1.0
        } else {
            0.2
        };

        Ok(ProposalAssessment {
            recommendation,
            strong_recommendation: recommendation && expertise_alignment >= 0.8,
            perfect_alignment: recommendation && expertise_alignment >= 1.0,
            expertise_alignment,
        })
    }

    /// Free a busy agent that could take waiting work no idle agent can
    /// run, by handing its current task to an idle agent of the same type.
    async fn suggest_rebalance(
        &self,
        distribution: &LoadDistribution,
    ) -> Result<Vec<RebalanceSuggestion>, AnalysisError> {
        let mut suggestions = Vec::new();
        let mut used: HashSet<&AgentId> = HashSet::new();

        let mut waiting: Vec<_> = distribution.unassigned_tasks.iter().collect();
        waiting.sort_by(|a, b| b.priority.cmp(&a.priority));

        for task in waiting {
            let idle_can_run = distribution
                .idle_agents
                .iter()
                .any(|idle| !used.contains(&idle.id) && idle.can_fulfil(&task.required_capabilities));
            if idle_can_run {
                continue;
            }

            let pair = distribution
                .busy_agents
                .iter()
                .filter(|busy| !used.contains(&busy.id) && busy.can_fulfil(&task.required_capabilities))
                .find_map(|busy| {
                    let current = busy.current_task()?;
                    let taker = distribution.idle_agents.iter().find(|idle| {
                        !used.contains(&idle.id) && idle.agent_type == busy.agent_type
                    })?;
                    Some((busy, current, taker))
                });
            let Some((donor, current, taker)) = pair else {
                continue;
            };

            used.insert(&donor.id);
            used.insert(&taker.id);
            suggestions.push(RebalanceSuggestion {
                task_id: current.clone(),
                from_agent: donor.id.clone(),
                to_agent: taker.id.clone(),
            });
        }

        Ok(suggestions)
    }
}
