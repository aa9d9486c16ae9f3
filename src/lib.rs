//! Tabular n-step SARSA and Monte-Carlo control on a noisy gridworld.

pub mod environment;
pub mod error;
pub mod gridworlds;
pub mod policy;
pub mod render;
pub mod report;
pub mod rl;

pub use environment::{Cell, Env, GridConfig, Movement, Pos, StepResult};
pub use error::{Error, Result};
pub use policy::{ActionValueTable, EpsilonGreedy, ExplorationStrategy, GreedyPolicy};
pub use report::{EpisodeStats, TrainingReport};
pub use rl::{AgentConfig, EpsilonSchedule, Horizon, NStepSarsa, Trajectory};
