use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gridworld_sarsa::{
    gridworlds, render, AgentConfig, Env, EpsilonSchedule, GridConfig, Horizon, NStepSarsa,
};

#[derive(Parser)]
#[command(name = "gridworld-sarsa")]
#[command(version, about = "n-step SARSA and Monte-Carlo control on a gridworld")]
struct Cli {
    /// Preset gridworld to train on
    #[arg(long, default_value_t = 0)]
    gridworld: usize,

    /// JSON grid description, used instead of the preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON agent hyperparameters; the flags below override single values
    #[arg(long)]
    agent_config: Option<PathBuf>,

    #[arg(long, default_value_t = 50)]
    episodes: usize,

    /// Look-ahead horizon of n-step SARSA
    #[arg(long, conflicts_with = "monte_carlo")]
    n: Option<usize>,

    /// Back up full returns only (unbounded n)
    #[arg(long)]
    monte_carlo: bool,

    #[arg(long)]
    epsilon: Option<f64>,

    #[arg(long)]
    gamma: Option<f64>,

    #[arg(long)]
    alpha: Option<f64>,

    /// Back up only the first visit of a state-action pair per episode
    #[arg(long)]
    first_visit: bool,

    /// Shrink epsilon after every episode
    #[arg(long)]
    decreasing_epsilon: bool,

    #[arg(long)]
    seed: Option<u64>,

    /// Write per-episode statistics to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Print the grid, the learned greedy policy and the value table
    #[arg(long)]
    render: bool,
}

impl Cli {
    fn grid_config(&self) -> Result<GridConfig> {
        match &self.config {
            Some(path) => GridConfig::from_json_file(path)
                .with_context(|| format!("loading grid from {}", path.display())),
            None => match gridworlds::preset(self.gridworld) {
                Some(config) => Ok(config),
                None => bail!(
                    "no preset gridworld {} (choose 0 to {})",
                    self.gridworld,
                    gridworlds::PRESET_COUNT - 1
                ),
            },
        }
    }

    fn agent_config(&self) -> Result<AgentConfig> {
        let mut config = match &self.agent_config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing agent config {}", path.display()))?
            }
            None => AgentConfig::default(),
        };
        if let Some(n) = self.n {
            config.horizon = Horizon::Fixed(n);
        }
        if self.monte_carlo {
            config.horizon = Horizon::FullReturn;
        }
        if let Some(epsilon) = self.epsilon {
            config.epsilon = epsilon;
        }
        if let Some(gamma) = self.gamma {
            config.gamma = gamma;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if self.first_visit {
            config.first_visit = true;
        }
        if self.decreasing_epsilon {
            config.schedule = EpsilonSchedule::Decreasing {
                episodes: self.episodes.max(1),
            };
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let grid = cli.grid_config()?;
    let agent_config = cli.agent_config()?;

    let (mut env, mut agent) = match cli.seed {
        Some(seed) => {
            let env = Env::seeded(&grid, seed)?;
            let agent = NStepSarsa::seeded(&env, agent_config, seed.wrapping_add(1))?;
            (env, agent)
        }
        None => {
            let env = Env::new(&grid)?;
            let agent = NStepSarsa::new(&env, agent_config)?;
            (env, agent)
        }
    };

    if cli.render {
        println!("{}", render::grid(&env));
    }

    let report = agent.start(&mut env, cli.episodes);
    print!("{}", report);
    println!(
        "Mean steps: {:.2} ; Mean return: {:.3}",
        report.mean_steps(),
        report.mean_return()
    );
    if let Some(best) = report.best_return() {
        println!("Best return {:.2} in episode {}", best.total_return, best.episode);
    }

    if cli.render {
        println!("{}", render::policy(&env, &agent.greedy_policy(&env)));
        println!("{}", render::values(&env, agent.table()));
    }

    if let Some(path) = &cli.csv {
        report
            .write_csv(path)
            .with_context(|| format!("writing statistics to {}", path.display()))?;
    }

    Ok(())
}
