//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use swarm_domain::{OutputFormat, TaskPriority, TaskStrategy};

/// Output format for reports and proposal snapshots
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    /// Coloured summary
    Text,
    /// JSON output
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Execution strategy for `run`
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Parallel,
    Sequential,
    Adaptive,
    Consensus,
}

impl From<StrategyArg> for TaskStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Parallel => TaskStrategy::Parallel,
            StrategyArg::Sequential => TaskStrategy::Sequential,
            StrategyArg::Adaptive => TaskStrategy::Adaptive,
            StrategyArg::Consensus => TaskStrategy::Consensus,
        }
    }
}

/// CLI arguments for swarm-orchestrator
#[derive(Parser, Debug)]
#[command(name = "swarm-orchestrator")]
#[command(author, version, about = "Supervised multi-phase task execution over a swarm of agents")]
#[command(long_about = r#"
Swarm Orchestrator plans a task into phases, hands each phase to capable
agents, scores every phase at a checkpoint and lets the swarm vote on
decisions.

The agents driven by this binary are simulated in-process.

Configuration files are loaded from (in priority order):
1. SWARM_* environment variables (SWARM_ORCHESTRATION__RETRY_BUDGET=2)
2. --config <path>     Explicit config file
3. ./swarm.toml        Project-level config
4. ~/.config/swarm-orchestrator/config.toml   Global config

Example:
  swarm-orchestrator demo
  swarm-orchestrator run "Refactor the parser" --strategy sequential --agents 3
  swarm-orchestrator propose adopt_style_guide --voters 3 --approve 2 --threshold 0.66
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output format (overrides the config file)
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<FormatArg>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the built-in scenarios (default)
    Demo,
    /// Submit one task to a pool of simulated agents
    Run(RunArgs),
    /// Open a proposal and cast simulated votes
    Propose(ProposeArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// What the task is about
    pub description: String,

    #[arg(short, long, value_enum, default_value = "adaptive")]
    pub strategy: StrategyArg,

    /// low, medium, high or critical
    #[arg(short, long, default_value = "medium", value_parser = parse_priority)]
    pub priority: TaskPriority,

    /// Extra capability every assignment requires (repeatable)
    #[arg(short = 'c', long = "capability", value_name = "NAME")]
    pub capabilities: Vec<String>,

    /// Upper bound on agents working the task
    #[arg(long, default_value_t = 3)]
    pub max_agents: usize,

    /// Gate the task on a swarm vote first
    #[arg(long)]
    pub consensus: bool,

    /// Simulated agents that succeed
    #[arg(long, default_value_t = 3)]
    pub agents: usize,

    /// Simulated agents that report failures
    #[arg(long, default_value_t = 0)]
    pub failing: usize,

    /// Simulated agents that never answer
    #[arg(long, default_value_t = 0)]
    pub hanging: usize,

    /// Give up waiting after this many seconds
    #[arg(long, default_value_t = 60)]
    pub wait_secs: u64,
}

#[derive(Args, Debug)]
pub struct ProposeArgs {
    /// Decision action, e.g. adopt_style_guide
    pub action: String,

    /// Fraction of positive votes required, in (0, 1]
    #[arg(short, long, default_value_t = 0.66)]
    pub threshold: f64,

    /// Number of voting agents
    #[arg(long, default_value_t = 3)]
    pub voters: usize,

    /// How many of the voters approve; the rest reject
    #[arg(long, default_value_t = 2)]
    pub approve: usize,

    /// Only this many voters vote; the deadline decides the rest
    #[arg(long)]
    pub turnout: Option<usize>,

    /// Deadline in milliseconds from now
    #[arg(long)]
    pub deadline_ms: Option<u64>,
}

fn parse_priority(s: &str) -> Result<TaskPriority, String> {
    s.parse().map_err(|e: swarm_domain::DomainError| e.to_string())
}
