use std::fmt;
use std::fs;
use std::path::Path;

use ndarray::Array2;
use rand::{
    distributions::{Distribution, Standard},
    rngs::StdRng,
    Rng, SeedableRng,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};

/// Reward for an accepted move onto a cell that carries no reward of its own.
pub const STEP_COST: f64 = -0.1;
/// Reward for a move that hits the grid border or a barrier.
pub const INVALID_MOVE_PENALTY: f64 = -0.5;
pub const DEFAULT_TERMINAL_REWARD: f64 = 10.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Cell {
    Open,
    Penalty(f64),
    Terminal(f64),
    Barrier,
}

impl Cell {
    /// Reward found on the cell, if any. Open cells and barriers carry none.
    pub fn reward(&self) -> Option<f64> {
        match self {
            Cell::Penalty(reward) | Cell::Terminal(reward) => Some(*reward),
            Cell::Open | Cell::Barrier => None,
        }
    }

    pub fn is_barrier(&self) -> bool {
        matches!(self, Cell::Barrier)
    }
}

// Action
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Movement {
    Up,
    Down,
    Left,
    Right,
}

impl Movement {
    /// All actions, in action-index order.
    pub const ALL: [Movement; 4] = [
        Movement::Up,
        Movement::Down,
        Movement::Left,
        Movement::Right,
    ];

    pub fn into_vector(self) -> (isize, isize) {
        match self {
            Movement::Up => (-1, 0),
            Movement::Down => (1, 0),
            Movement::Left => (0, -1),
            Movement::Right => (0, 1),
        }
    }

    pub fn index(self) -> usize {
        match self {
            Movement::Up => 0,
            Movement::Down => 1,
            Movement::Left => 2,
            Movement::Right => 3,
        }
    }

    /// Panics on an index outside `0..4`; callers own the action range.
    pub fn from_index(index: usize) -> Movement {
        Movement::ALL[index]
    }

    pub fn arrow(self) -> char {
        match self {
            Movement::Up => '^',
            Movement::Down => 'v',
            Movement::Left => '<',
            Movement::Right => '>',
        }
    }
}

impl Distribution<Movement> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Movement {
        Movement::from_index(rng.gen_range(0..Movement::ALL.len()))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub fn new(row: usize, col: usize) -> Self {
        Pos { row, col }
    }

    /// Builds a position from grid (x, y) coordinates, x being the column.
    pub fn from_xy(x: usize, y: usize) -> Self {
        Pos { row: y, col: x }
    }

    fn index(self) -> [usize; 2] {
        [self.row, self.col]
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PenaltyCell {
    pub pos: Pos,
    pub reward: f64,
}

fn default_terminal_reward() -> f64 {
    DEFAULT_TERMINAL_REWARD
}

/// Construction input of a grid environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub width: usize,
    pub height: usize,
    /// Probability that a requested action is replaced by a uniformly random one.
    pub epsilon: f64,
    pub start: Pos,
    pub terminal: Pos,
    #[serde(default = "default_terminal_reward")]
    pub terminal_reward: f64,
    #[serde(default)]
    pub penalties: Vec<PenaltyCell>,
    #[serde(default)]
    pub barriers: Vec<Pos>,
}

impl GridConfig {
    pub fn new(width: usize, height: usize, start: Pos, terminal: Pos) -> Self {
        Self {
            width,
            height,
            epsilon: 0.0,
            start,
            terminal,
            terminal_reward: DEFAULT_TERMINAL_REWARD,
            penalties: Vec::new(),
            barriers: Vec::new(),
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_barrier(mut self, pos: Pos) -> Self {
        self.barriers.push(pos);
        self
    }

    pub fn with_penalty(mut self, pos: Pos, reward: f64) -> Self {
        self.penalties.push(PenaltyCell { pos, reward });
        self
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            operation: format!("read grid config {}", path.display()),
            source,
        })?;
        let config: GridConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    fn contains(&self, pos: Pos) -> bool {
        pos.row < self.height && pos.col < self.width
    }

    fn check_bounds(&self, what: &'static str, pos: Pos) -> Result<()> {
        if self.contains(pos) {
            Ok(())
        } else {
            Err(Error::OutOfBounds {
                what,
                pos,
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::config(format!(
                "grid dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(Error::config(format!(
                "transition epsilon must lie in [0, 1], got {}",
                self.epsilon
            )));
        }
        self.check_bounds("start", self.start)?;
        self.check_bounds("terminal", self.terminal)?;
        for barrier in &self.barriers {
            self.check_bounds("barrier", *barrier)?;
        }
        for penalty in &self.penalties {
            self.check_bounds("penalty cell", penalty.pos)?;
        }

        if self.barriers.contains(&self.start) {
            return Err(Error::OnBarrier { what: "start", pos: self.start });
        }
        if self.barriers.contains(&self.terminal) {
            return Err(Error::OnBarrier { what: "terminal", pos: self.terminal });
        }
        if let Some(penalty) = self.penalties.iter().find(|p| self.barriers.contains(&p.pos)) {
            return Err(Error::OnBarrier { what: "penalty cell", pos: penalty.pos });
        }
        if self.penalties.iter().any(|p| p.pos == self.terminal) {
            return Err(Error::config(format!(
                "penalty cell overlaps the terminal at {}",
                self.terminal
            )));
        }
        if self.start == self.terminal {
            return Err(Error::config(format!(
                "start and terminal coincide at {}",
                self.start
            )));
        }
        Ok(())
    }
}

/// Outcome of one environment step.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StepResult {
    pub state: Pos,
    pub reward: f64,
    pub terminal: bool,
}

/// A gridworld with noisy action execution.
///
/// The environment mutates its agent position and noise source on every
/// `step`; it is not meant to be shared between threads without external
/// synchronisation.
pub struct Env<R = StdRng> {
    map: Array2<Cell>,
    start: Pos,
    terminal: Pos,
    epsilon: f64,
    agent: Pos,
    rng: R,
}

impl Env<StdRng> {
    pub fn new(config: &GridConfig) -> Result<Self> {
        Env::with_rng(config, StdRng::from_entropy())
    }

    pub fn seeded(config: &GridConfig, seed: u64) -> Result<Self> {
        Env::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Env<R> {
    pub fn with_rng(config: &GridConfig, rng: R) -> Result<Self> {
        config.validate()?;

        let mut map = Array2::from_elem((config.height, config.width), Cell::Open);
        for penalty in &config.penalties {
            map[penalty.pos.index()] = Cell::Penalty(penalty.reward);
        }
        for barrier in &config.barriers {
            map[barrier.index()] = Cell::Barrier;
        }
        map[config.terminal.index()] = Cell::Terminal(config.terminal_reward);

        Ok(Self {
            map,
            start: config.start,
            terminal: config.terminal,
            epsilon: config.epsilon,
            agent: config.start,
            rng,
        })
    }

    /// Puts the agent back on the start cell.
    pub fn reset(&mut self) -> Pos {
        self.agent = self.start;
        self.agent
    }

    /// True iff (row, col) is inside the grid and not a barrier.
    pub fn is_valid(&self, row: isize, col: isize) -> bool {
        if row < 0 || col < 0 {
            return false;
        }
        match self.map.get([row as usize, col as usize]) {
            Some(cell) => !cell.is_barrier(),
            None => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.agent == self.terminal
    }

    /// Executes `action`, or with probability `epsilon` a uniformly random
    /// one instead, and reports the resulting position and reward.
    pub fn step(&mut self, action: Movement) -> StepResult {
        let mut movement = action;
        if self.rng.gen::<f64>() < self.epsilon {
            movement = self.rng.gen();
        }

        let (d_row, d_col) = movement.into_vector();
        let row = self.agent.row as isize + d_row;
        let col = self.agent.col as isize + d_col;

        let reward = if self.is_valid(row, col) {
            self.agent = Pos::new(row as usize, col as usize);
            self.map[self.agent.index()].reward().unwrap_or(STEP_COST)
        } else {
            INVALID_MOVE_PENALTY
        };

        let terminal = self.is_terminal();
        trace!(?action, ?movement, state = %self.agent, reward, terminal, "step");
        StepResult {
            state: self.agent,
            reward,
            terminal,
        }
    }
}

impl<R> Env<R> {
    /// (height, width) of the grid.
    pub fn size(&self) -> (usize, usize) {
        self.map.dim()
    }

    pub fn width(&self) -> usize {
        self.map.ncols()
    }

    pub fn height(&self) -> usize {
        self.map.nrows()
    }

    pub fn actions(&self) -> &'static [Movement] {
        &Movement::ALL
    }

    pub fn terminal(&self) -> Pos {
        self.terminal
    }

    pub fn start(&self) -> Pos {
        self.start
    }

    pub fn agent(&self) -> Pos {
        self.agent
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn cell(&self, pos: Pos) -> Cell {
        self.map[pos.index()]
    }

    pub fn iter_all_coordinates(&self) -> EnvIter {
        EnvIter::new(self.size())
    }
}

/// Row-major iterator over every coordinate of a grid.
pub struct EnvIter {
    next: Option<Pos>,
    size: (usize, usize),
}

impl EnvIter {
    fn new(size: (usize, usize)) -> EnvIter {
        let next = if size.0 > 0 && size.1 > 0 {
            Some(Pos::new(0, 0))
        } else {
            None
        };
        EnvIter { next, size }
    }
}

impl Iterator for EnvIter {
    type Item = Pos;

    fn next(&mut self) -> Option<Pos> {
        let current = self.next?;
        let mut following = Pos::new(current.row, current.col + 1);
        if following.col == self.size.1 {
            following = Pos::new(current.row + 1, 0);
        }
        self.next = if following.row < self.size.0 {
            Some(following)
        } else {
            None
        };
        Some(current)
    }
}
