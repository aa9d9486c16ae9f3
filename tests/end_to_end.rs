use gridworld_sarsa::{
    gridworlds, ActionValueTable, AgentConfig, Env, GridConfig, Horizon, Movement, NStepSarsa,
    Pos,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn monte_carlo(first_visit: bool) -> AgentConfig {
    AgentConfig {
        horizon: Horizon::FullReturn,
        epsilon: 1.0,
        gamma: 1.0,
        alpha: 1.0,
        first_visit,
        ..AgentConfig::default()
    }
}

fn walled_3x3() -> GridConfig {
    // gridworld1 without transition noise
    gridworlds::gridworld1().with_epsilon(0.0)
}

#[test]
fn monte_carlo_episode_backs_up_terminal_approach() {
    let config = walled_3x3();
    let mut env = Env::seeded(&config, 17).unwrap();
    let mut agent = NStepSarsa::seeded(&env, monte_carlo(false), 17).unwrap();

    let stats = agent.episode(&mut env);
    assert!(stats.steps >= 6);
    assert!(stats.total_return < 10.0);

    // the terminal at (2, 2) can only be entered from (1, 2) going down
    let approach = Pos::new(1, 2);
    assert!((agent.table().get(Movement::Down, approach) - 10.0).abs() < 1e-9);
    for action in Movement::ALL {
        assert_eq!(agent.table().get(action, config.terminal), 0.0);
    }
}

#[test]
fn first_visit_start_value_equals_episode_return() {
    let config = walled_3x3();
    let mut env = Env::seeded(&config, 5).unwrap();
    let table = ActionValueTable::zeros(3, 3);
    let mut agent =
        NStepSarsa::with_table(table, monte_carlo(true), StdRng::seed_from_u64(5)).unwrap();

    let stats = agent.episode(&mut env);
    let values = agent.table().state_values(config.start);
    // the first action taken from the start was backed up with the whole return
    assert!(values.iter().any(|v| (v - stats.total_return).abs() < 1e-9));
    assert!(stats.total_return > 10.0 - 0.5 * stats.steps as f64 - 1e-9);
}

#[test]
fn greedy_agent_walks_corridor_in_manhattan_distance() {
    let layouts = [
        (GridConfig::new(6, 1, Pos::new(0, 1), Pos::new(0, 5)), Movement::Right),
        (GridConfig::new(1, 5, Pos::new(0, 0), Pos::new(4, 0)), Movement::Down),
    ];
    for (config, towards) in layouts {
        let (height, width) = (config.height, config.width);
        let mut table = ActionValueTable::zeros(height, width);
        for row in 0..height {
            for col in 0..width {
                table.set(towards, Pos::new(row, col), 1.0);
            }
        }
        let mut agent = NStepSarsa::with_table(
            table,
            AgentConfig {
                horizon: Horizon::Fixed(2),
                epsilon: 0.0,
                alpha: 0.0,
                ..AgentConfig::default()
            },
            StdRng::seed_from_u64(0),
        )
        .unwrap();
        let mut env = Env::seeded(&config, 0).unwrap();

        let stats = agent.episode(&mut env);
        let distance = config.terminal.row.abs_diff(config.start.row)
            + config.terminal.col.abs_diff(config.start.col);
        assert_eq!(stats.steps, distance);
    }
}

#[test]
fn training_keeps_terminal_values_at_zero() {
    for (horizon, first_visit) in [
        (Horizon::Fixed(1), false),
        (Horizon::Fixed(4), false),
        (Horizon::FullReturn, false),
        (Horizon::FullReturn, true),
    ] {
        let config = gridworlds::gridworld3();
        let mut env = Env::seeded(&config, 21).unwrap();
        let mut agent = NStepSarsa::seeded(
            &env,
            AgentConfig {
                horizon,
                first_visit,
                ..AgentConfig::default()
            },
            21,
        )
        .unwrap();
        let report = agent.start(&mut env, 20);
        assert_eq!(report.episodes().len(), 20);
        for action in Movement::ALL {
            assert_eq!(agent.table().get(action, config.terminal), 0.0);
        }
        assert!(agent.table().as_array().iter().all(|v| v.is_finite()));
    }
}

#[test]
fn csv_export_writes_one_row_per_episode() {
    let config = gridworlds::gridworld1();
    let mut env = Env::seeded(&config, 8).unwrap();
    let mut agent = NStepSarsa::seeded(&env, AgentConfig::default(), 8).unwrap();
    let report = agent.start(&mut env, 3);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stats.csv");
    report.write_csv(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 4);
    assert!(text.starts_with("episode,steps,total_return,average_return"));
}
