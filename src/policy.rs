use std::collections::HashMap;

use ndarray::{s, Array3, ArrayView1};
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::environment::{Cell, Env, Movement, Pos};
use crate::error::{Error, Result};

/// Action-value estimates indexed by `[action, row, col]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionValueTable {
    q: Array3<f64>,
}

impl ActionValueTable {
    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            q: Array3::zeros((Movement::ALL.len(), height, width)),
        }
    }

    /// Small Gaussian noise everywhere except the terminal, which stays at zero.
    pub fn random<R: Rng + ?Sized>(
        height: usize,
        width: usize,
        terminal: Pos,
        noise_std: f64,
        rng: &mut R,
    ) -> Result<Self> {
        if !(noise_std >= 0.0 && noise_std.is_finite()) {
            return Err(Error::config(format!(
                "initial noise must be finite and non-negative, got {}",
                noise_std
            )));
        }
        let normal = Normal::new(0.0, noise_std).map_err(|e| {
            Error::config(format!("invalid initial noise {}: {}", noise_std, e))
        })?;
        let q = Array3::from_shape_simple_fn((Movement::ALL.len(), height, width), || {
            normal.sample(&mut *rng)
        });
        let mut table = Self { q };
        table.zero_state(terminal);
        Ok(table)
    }

    pub fn get(&self, action: Movement, pos: Pos) -> f64 {
        self.q[[action.index(), pos.row, pos.col]]
    }

    pub fn set(&mut self, action: Movement, pos: Pos, value: f64) {
        self.q[[action.index(), pos.row, pos.col]] = value;
    }

    /// Moves `Q[action, pos]` a fraction `alpha` of the way towards `target`.
    pub fn update(&mut self, action: Movement, pos: Pos, target: f64, alpha: f64) {
        let q = &mut self.q[[action.index(), pos.row, pos.col]];
        *q += alpha * (target - *q);
    }

    /// Best action at `pos`; ties go to the lowest action index.
    pub fn greedy_action(&self, pos: Pos) -> Movement {
        Movement::ALL.iter().skip(1).fold(Movement::ALL[0], |best, &a| {
            if self.get(a, pos) > self.get(best, pos) { a } else { best }
        })
    }

    pub fn zero_state(&mut self, pos: Pos) {
        self.q.slice_mut(s![.., pos.row, pos.col]).fill(0.0);
    }

    /// Values of every action at `pos`, in action-index order.
    pub fn state_values(&self, pos: Pos) -> ArrayView1<'_, f64> {
        self.q.slice(s![.., pos.row, pos.col])
    }

    pub fn max_value(&self, pos: Pos) -> f64 {
        self.get(self.greedy_action(pos), pos)
    }

    pub fn as_array(&self) -> &Array3<f64> {
        &self.q
    }
}

pub trait ExplorationStrategy {
    fn next_action(&mut self, state: Pos, table: &ActionValueTable) -> Movement;
}

pub struct EpsilonGreedy<R> {
    epsilon: f64,
    rng: R,
}

impl<R: Rng> EpsilonGreedy<R> {
    pub fn new(epsilon: f64, rng: R) -> Self {
        EpsilonGreedy { epsilon, rng }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }
}

impl<R: Rng> ExplorationStrategy for EpsilonGreedy<R> {
    fn next_action(&mut self, state: Pos, table: &ActionValueTable) -> Movement {
        if self.rng.gen::<f64>() < self.epsilon {
            return self.rng.gen::<Movement>();
        }
        table.greedy_action(state)
    }
}

// Deterministic policy read off a value table
#[derive(Debug, Clone, Default)]
pub struct GreedyPolicy {
    pub policy: HashMap<Pos, Movement>,
}

impl GreedyPolicy {
    /// Greedy action for every cell the agent can stand on before the episode ends.
    pub fn from_table<E>(env: &Env<E>, table: &ActionValueTable) -> Self {
        let policy = env
            .iter_all_coordinates()
            .filter(|pos| matches!(env.cell(*pos), Cell::Open | Cell::Penalty(_)))
            .map(|pos| (pos, table.greedy_action(pos)))
            .collect();
        GreedyPolicy { policy }
    }

    pub fn action(&self, pos: Pos) -> Option<Movement> {
        self.policy.get(&pos).copied()
    }

    pub fn prob(&self, pos: Pos, movement: Movement) -> f64 {
        if self.action(pos) == Some(movement) { 1.0 } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::GridConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_table_zeroes_terminal() {
        let mut rng = StdRng::seed_from_u64(5);
        let table = ActionValueTable::random(3, 4, Pos::new(2, 3), 0.2, &mut rng).unwrap();
        assert_eq!(table.as_array().dim(), (4, 3, 4));
        for action in Movement::ALL {
            assert_eq!(table.get(action, Pos::new(2, 3)), 0.0);
        }
        assert!(table.as_array().iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_random_table_rejects_negative_noise() {
        let mut rng = StdRng::seed_from_u64(5);
        assert!(ActionValueTable::random(2, 2, Pos::new(0, 0), -1.0, &mut rng).is_err());
        assert!(ActionValueTable::random(2, 2, Pos::new(0, 0), f64::NAN, &mut rng).is_err());
        assert!(ActionValueTable::random(2, 2, Pos::new(0, 0), 0.0, &mut rng).is_ok());
    }

    #[test]
    fn test_greedy_action_prefers_lowest_index_on_ties() {
        let mut table = ActionValueTable::zeros(2, 2);
        let pos = Pos::new(1, 1);
        assert_eq!(table.greedy_action(pos), Movement::Up);

        table.set(Movement::Left, pos, 1.0);
        table.set(Movement::Right, pos, 1.0);
        assert_eq!(table.greedy_action(pos), Movement::Left);

        table.set(Movement::Right, pos, 1.5);
        assert_eq!(table.greedy_action(pos), Movement::Right);
        assert_eq!(table.max_value(pos), 1.5);
    }

    #[test]
    fn test_update_moves_towards_target() {
        let mut table = ActionValueTable::zeros(1, 1);
        let pos = Pos::new(0, 0);
        table.update(Movement::Down, pos, 10.0, 0.5);
        assert_eq!(table.get(Movement::Down, pos), 5.0);
        table.update(Movement::Down, pos, 10.0, 1.0);
        assert_eq!(table.get(Movement::Down, pos), 10.0);
        assert_eq!(table.state_values(pos).to_vec(), vec![0.0, 10.0, 0.0, 0.0]);
    }

    #[test]
    fn test_epsilon_greedy_extremes() {
        let mut table = ActionValueTable::zeros(1, 1);
        let pos = Pos::new(0, 0);
        table.set(Movement::Right, pos, 3.0);

        let mut greedy = EpsilonGreedy::new(0.0, StdRng::seed_from_u64(11));
        for _ in 0..50 {
            assert_eq!(greedy.next_action(pos, &table), Movement::Right);
        }

        let mut random = EpsilonGreedy::new(1.0, StdRng::seed_from_u64(11));
        let picks: Vec<Movement> = (0..200).map(|_| random.next_action(pos, &table)).collect();
        for action in Movement::ALL {
            assert!(picks.contains(&action));
        }
    }

    #[test]
    fn test_greedy_policy_skips_barriers_and_terminal() {
        let config = GridConfig::new(3, 1, Pos::new(0, 0), Pos::new(0, 2)).with_barrier(Pos::new(0, 1));
        let env = Env::seeded(&config, 0).unwrap();
        let mut table = ActionValueTable::zeros(1, 3);
        table.set(Movement::Down, Pos::new(0, 0), 2.0);

        let policy = GreedyPolicy::from_table(&env, &table);
        assert_eq!(policy.policy.len(), 1);
        assert_eq!(policy.action(Pos::new(0, 0)), Some(Movement::Down));
        assert_eq!(policy.action(Pos::new(0, 1)), None);
        assert_eq!(policy.prob(Pos::new(0, 0), Movement::Down), 1.0);
        assert_eq!(policy.prob(Pos::new(0, 0), Movement::Up), 0.0);
    }
}
