use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::environment::{Env, Movement, Pos, StepResult};
use crate::error::{Error, Result};
use crate::policy::{ActionValueTable, EpsilonGreedy, ExplorationStrategy, GreedyPolicy};
use crate::report::{EpisodeStats, TrainingReport};

/// How far the agent looks ahead before bootstrapping off the value table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Horizon {
    /// n-step SARSA.
    Fixed(usize),
    /// Monte-Carlo control: every backup waits for the end of the episode.
    FullReturn,
}

impl Horizon {
    fn steps(self) -> Option<usize> {
        match self {
            Horizon::Fixed(n) => Some(n),
            Horizon::FullReturn => None,
        }
    }

    /// Whether the backup for step `u` can be made once `t` steps are known.
    fn ready(self, u: usize, t: usize) -> bool {
        match self {
            Horizon::Fixed(n) => u.saturating_add(n) <= t,
            Horizon::FullReturn => false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum EpsilonSchedule {
    Constant,
    /// After every episode, `epsilon -= epsilon / episodes`.
    Decreasing { episodes: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub horizon: Horizon,
    /// Exploration rate of the epsilon-greedy policy.
    pub epsilon: f64,
    pub schedule: EpsilonSchedule,
    /// Discount for future rewards.
    pub gamma: f64,
    /// Step size.
    pub alpha: f64,
    /// First-visit check per state-action pair: a step is not backed up when
    /// the same (state, action) pair already occurred earlier in the episode.
    pub first_visit: bool,
    /// Standard deviation of the initial value noise.
    pub init_noise: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            horizon: Horizon::Fixed(10),
            epsilon: 0.5,
            schedule: EpsilonSchedule::Constant,
            gamma: 0.99,
            alpha: 0.3,
            first_visit: false,
            init_noise: 0.2,
        }
    }
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::config(format!("{} must lie in [0, 1], got {}", name, value)))
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.horizon == Horizon::Fixed(0) {
            return Err(Error::config("n-step horizon must be at least 1"));
        }
        if self.schedule == (EpsilonSchedule::Decreasing { episodes: 0 }) {
            return Err(Error::config("epsilon decay needs a positive episode count"));
        }
        check_unit("epsilon", self.epsilon)?;
        check_unit("gamma", self.gamma)?;
        check_unit("alpha", self.alpha)?;
        if !self.init_noise.is_finite() || self.init_noise < 0.0 {
            return Err(Error::config(format!(
                "initial noise must be finite and non-negative, got {}",
                self.init_noise
            )));
        }
        Ok(())
    }
}

/// States, actions and rewards of one episode.
///
/// `states[t]` and `actions[t]` are the state at step `t` and the action chosen
/// there; `rewards[t]` is the reward received for taking `actions[t]`. The
/// action for the newest state is chosen before the next step is taken, so
/// `actions` is always as long as `states` and one longer than `rewards`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    states: Vec<Pos>,
    actions: Vec<Movement>,
    rewards: Vec<f64>,
}

impl Trajectory {
    pub fn new(start: Pos, action: Movement) -> Self {
        Self {
            states: vec![start],
            actions: vec![action],
            rewards: Vec::new(),
        }
    }

    pub fn push(&mut self, reward: f64, state: Pos, action: Movement) {
        self.rewards.push(reward);
        self.states.push(state);
        self.actions.push(action);
    }

    /// Number of steps taken so far.
    pub fn steps(&self) -> usize {
        self.rewards.len()
    }

    pub fn states(&self) -> &[Pos] {
        &self.states
    }

    pub fn actions(&self) -> &[Movement] {
        &self.actions
    }

    pub fn rewards(&self) -> &[f64] {
        &self.rewards
    }

    pub fn frontier_action(&self) -> Movement {
        self.actions[self.actions.len() - 1]
    }

    pub fn total_return(&self) -> f64 {
        self.rewards.iter().sum()
    }
}

/// Tabular n-step SARSA agent; Monte-Carlo control when the horizon is unbounded.
///
/// Owns the action-value table for the whole training run. Not meant to be
/// shared between threads without external synchronisation.
pub struct NStepSarsa<R = StdRng> {
    table: ActionValueTable,
    explorer: EpsilonGreedy<R>,
    config: AgentConfig,
    episodes_run: usize,
}

impl NStepSarsa<StdRng> {
    pub fn new<E>(env: &Env<E>, config: AgentConfig) -> Result<Self> {
        NStepSarsa::with_rng(env, config, StdRng::from_entropy())
    }

    pub fn seeded<E>(env: &Env<E>, config: AgentConfig, seed: u64) -> Result<Self> {
        NStepSarsa::with_rng(env, config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> NStepSarsa<R> {
    /// Draws the initial table from `rng`, then keeps it as the exploration source.
    pub fn with_rng<E>(env: &Env<E>, config: AgentConfig, mut rng: R) -> Result<Self> {
        config.validate()?;
        let table = ActionValueTable::random(
            env.height(),
            env.width(),
            env.terminal(),
            config.init_noise,
            &mut rng,
        )?;
        Ok(Self::assemble(table, config, rng))
    }

    /// Starts from a prepared value table instead of random noise.
    pub fn with_table(table: ActionValueTable, config: AgentConfig, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(table, config, rng))
    }

    fn assemble(table: ActionValueTable, config: AgentConfig, rng: R) -> Self {
        Self {
            table,
            explorer: EpsilonGreedy::new(config.epsilon, rng),
            config,
            episodes_run: 0,
        }
    }

    pub fn policy(&mut self, state: Pos) -> Movement {
        self.explorer.next_action(state, &self.table)
    }

    /// Discounted return used as the backup target for step `u`.
    ///
    /// Sums the rewards from `u` up to the horizon or the terminal step
    /// `big_t`, whichever comes first. If the horizon ends before the
    /// terminal, the discounted value of the state-action pair reached there
    /// is added.
    pub fn n_step_return(&self, trajectory: &Trajectory, u: usize, big_t: Option<usize>) -> f64 {
        let gamma = self.config.gamma;
        let known = trajectory.steps();
        let end = match (self.config.horizon.steps(), big_t) {
            (Some(n), Some(big_t)) => u.saturating_add(n).min(big_t),
            (Some(n), None) => u.saturating_add(n),
            (None, Some(big_t)) => big_t,
            (None, None) => known,
        }
        .min(known);

        let mut discount = 1.0;
        let mut estimate = 0.0;
        for reward in &trajectory.rewards()[u..end] {
            estimate += discount * reward;
            discount *= gamma;
        }

        if let Some(n) = self.config.horizon.steps() {
            let bootstrap = big_t.map_or(true, |big_t| u.saturating_add(n) < big_t);
            if bootstrap {
                let state = trajectory.states()[u + n];
                let action = trajectory.actions()[u + n];
                estimate += gamma.powi(n as i32) * self.table.get(action, state);
            }
        }
        estimate
    }

    /// Runs one episode, learning as it goes.
    pub fn episode<E: Rng>(&mut self, env: &mut Env<E>) -> EpisodeStats {
        let terminal = env.terminal();
        let start = env.reset();
        self.table.zero_state(terminal);
        let first_action = self.policy(start);
        let mut trajectory = Trajectory::new(start, first_action);

        let mut t = 0;
        let mut u = 0;
        let mut big_t: Option<usize> = None;
        let mut visited_pairs: HashSet<(Pos, Movement)> = HashSet::new();

        while big_t.is_none() {
            let StepResult {
                state,
                reward,
                terminal: at_terminal,
            } = env.step(trajectory.frontier_action());
            let next_action = self.policy(state);
            trajectory.push(reward, state, next_action);
            t += 1;
            if at_terminal {
                big_t = Some(t);
            }

            while big_t.is_some() || self.config.horizon.ready(u, t) {
                let state = trajectory.states()[u];
                // terminal states are never backed up
                if state == terminal {
                    break;
                }
                let action = trajectory.actions()[u];
                if !self.config.first_visit || visited_pairs.insert((state, action)) {
                    let estimate = self.n_step_return(&trajectory, u, big_t);
                    self.table.update(action, state, estimate, self.config.alpha);
                }
                u += 1;
            }
            self.table.zero_state(terminal);
        }

        env.reset();
        self.table.zero_state(terminal);
        self.episodes_run += 1;

        let stats = EpisodeStats::new(self.episodes_run, t, trajectory.total_return());
        debug!(
            episode = stats.episode,
            steps = stats.steps,
            total_return = stats.total_return,
            epsilon = self.explorer.epsilon(),
            "episode finished"
        );

        if let EpsilonSchedule::Decreasing { episodes } = self.config.schedule {
            let epsilon = self.explorer.epsilon();
            self.explorer.set_epsilon(epsilon - epsilon / episodes as f64);
        }
        stats
    }

    /// Runs `episodes` episodes and collects their statistics.
    pub fn start<E: Rng>(&mut self, env: &mut Env<E>, episodes: usize) -> TrainingReport {
        info!(episodes, horizon = ?self.config.horizon, "training started");
        let mut report = TrainingReport::with_capacity(episodes);
        for _ in 0..episodes {
            report.push(self.episode(env));
        }
        info!(
            mean_steps = report.mean_steps(),
            mean_return = report.mean_return(),
            "training finished"
        );
        report
    }

    pub fn greedy_policy<E>(&self, env: &Env<E>) -> GreedyPolicy {
        GreedyPolicy::from_table(env, &self.table)
    }

    pub fn table(&self) -> &ActionValueTable {
        &self.table
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn epsilon(&self) -> f64 {
        self.explorer.epsilon()
    }

    pub fn episodes_run(&self) -> usize {
        self.episodes_run
    }
}
