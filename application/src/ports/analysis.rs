//! Analysis service port
//!
//! Advisory data only: complexity estimates for planning, proposal
//! assessments for voting advice, and reassignment suggestions for the
//! rebalancer. Callers must survive every failure of this port.

use async_trait::async_trait;
use swarm_domain::{
    ComplexityEstimate, ConsensusProposal, LoadDistribution, ProposalAssessment,
    RebalanceSuggestion, TaskAnalysisRequest,
};
use thiserror::Error;

/// Errors that can occur during analysis calls
#[derive(Error, Debug, Clone)]
pub enum AnalysisError {
    #[error("Analysis service unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid analysis response: {0}")]
    InvalidResponse(String),

    #[error("Analysis timed out")]
    Timeout,
}

#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, request: &TaskAnalysisRequest)
    -> Result<ComplexityEstimate, AnalysisError>;

    async fn assess_proposal(
        &self,
        proposal: &ConsensusProposal,
        agent_type: &str,
    ) -> Result<ProposalAssessment, AnalysisError>;

    async fn suggest_rebalance(
        &self,
        distribution: &LoadDistribution,
    ) -> Result<Vec<RebalanceSuggestion>, AnalysisError>;
}
