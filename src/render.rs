//! Plain-text views of the environment and of what the agent has learned.
//!
//! Everything here only reads; nothing feeds back into training.

use std::fmt::Write;

use crate::environment::{Cell, Env, Movement, Pos};
use crate::policy::{ActionValueTable, GreedyPolicy};

const CELL_WIDTH: usize = 5;

fn column_footer(out: &mut String, width: usize) {
    out.push_str("    ||");
    for x in 0..width {
        let _ = write!(out, "{:>w$}|", x, w = CELL_WIDTH);
    }
    out.push('\n');
}

fn grid_with<E, F>(env: &Env<E>, mut cell_text: F) -> String
where
    F: FnMut(Pos, Cell) -> String,
{
    let mut out = String::new();
    for row in 0..env.height() {
        let _ = write!(out, "{:>4}||", row);
        for col in 0..env.width() {
            let pos = Pos::new(row, col);
            let _ = write!(out, "{:>w$}|", cell_text(pos, env.cell(pos)), w = CELL_WIDTH);
        }
        out.push('\n');
    }
    column_footer(&mut out, env.width());
    out
}

/// The grid with the agent as `A`, barriers as `X` and the reward of every
/// cell that has one.
pub fn grid<E>(env: &Env<E>) -> String {
    let agent = env.agent();
    grid_with(env, |pos, cell| match cell {
        _ if pos == agent => "A".to_string(),
        Cell::Barrier => "XXXXX".to_string(),
        Cell::Open => String::new(),
        Cell::Penalty(reward) | Cell::Terminal(reward) => format!("{}", reward),
    })
}

pub fn policy<E>(env: &Env<E>, policy: &GreedyPolicy) -> String {
    grid_with(env, |pos, cell| match cell {
        Cell::Barrier => "XXXXX".to_string(),
        Cell::Terminal(_) => "T".to_string(),
        _ => policy
            .action(pos)
            .map(|a| a.arrow().to_string())
            .unwrap_or_default(),
    })
}

/// One block per action with the estimated value of every cell.
pub fn values<E>(env: &Env<E>, table: &ActionValueTable) -> String {
    let mut out = String::new();
    for action in Movement::ALL {
        let _ = writeln!(out, "{:?}", action);
        out.push_str(&grid_with(env, |pos, cell| match cell {
            Cell::Barrier => "XXXXX".to_string(),
            _ => format!("{:.1}", table.get(action, pos)),
        }));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::GridConfig;

    fn env() -> Env {
        let config = GridConfig::new(3, 2, Pos::new(0, 0), Pos::new(1, 2))
            .with_barrier(Pos::new(0, 1))
            .with_penalty(Pos::new(1, 0), -1.0);
        Env::seeded(&config, 0).unwrap()
    }

    #[test]
    fn test_grid() {
        let text = grid(&env());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "   0||    A|XXXXX|     |");
        assert_eq!(lines[1], "   1||   -1|     |   10|");
        assert_eq!(lines[2], "    ||    0|    1|    2|");
    }

    #[test]
    fn test_policy_arrows() {
        let env = env();
        let mut table = ActionValueTable::zeros(2, 3);
        table.set(Movement::Down, Pos::new(0, 0), 1.0);
        table.set(Movement::Right, Pos::new(1, 1), 1.0);
        let text = policy(&env, &GreedyPolicy::from_table(&env, &table));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "   0||    v|XXXXX|    ^|");
        assert_eq!(lines[1], "   1||    ^|    >|    T|");
    }

    #[test]
    fn test_values_has_block_per_action() {
        let env = env();
        let text = values(&env, &ActionValueTable::zeros(2, 3));
        assert!(text.starts_with("Up\n"));
        assert!(text.contains("Right\n"));
        assert!(text.contains("  0.0|"));
    }
}
