//! Preset grid layouts.
//!
//! Layouts are drawn with x growing to the right and y growing downwards:
//! `s` start, `X` barrier, numbers are rewards and `10` is the terminal.

use crate::environment::{GridConfig, Pos};

const PRESET_EPSILON: f64 = 0.1;

fn layout(
    (width, height): (usize, usize),
    start: (usize, usize),
    terminal: (usize, usize),
    penalties: &[(usize, usize, f64)],
    barriers: &[(usize, usize)],
) -> GridConfig {
    let mut config = GridConfig::new(
        width,
        height,
        Pos::from_xy(start.0, start.1),
        Pos::from_xy(terminal.0, terminal.1),
    )
    .with_epsilon(PRESET_EPSILON);
    for &(x, y, reward) in penalties {
        config = config.with_penalty(Pos::from_xy(x, y), reward);
    }
    for &(x, y) in barriers {
        config = config.with_barrier(Pos::from_xy(x, y));
    }
    config
}

/// ```text
///  s  0  X  0 10
///  0  0 -1  0  0
///  0  X  0  0  0
///  0  0  X  0  0
/// -1  0  0  0 -1
/// ```
pub fn gridworld0() -> GridConfig {
    layout(
        (5, 5),
        (0, 0),
        (4, 0),
        &[(0, 4, -1.0), (2, 1, -1.0), (4, 4, -1.0)],
        &[(1, 2), (2, 0), (2, 3)],
    )
}

/// ```text
///  0  0  0
///  0  X  0
///  s  X 10
/// ```
pub fn gridworld1() -> GridConfig {
    layout((3, 3), (0, 2), (2, 2), &[], &[(1, 2), (1, 1)])
}

/// ```text
///  s  0  0  X  0  0  0  0
///  0  X  0  0  0  X  X  0
///  0  0  X  0  X  0  0  0
///  0  0  0  X  0  0  0  0
/// -1  0  X  0  X  0  0  0
///  0  0  0  0  0  X  0  0
///  0  0  0  0  0 -1 10  0
///  0  0  0  0  0 -1  0  0
/// ```
pub fn gridworld2() -> GridConfig {
    layout(
        (8, 8),
        (0, 0),
        (6, 6),
        &[(0, 4, -1.0), (5, 6, -1.0), (5, 7, -1.0)],
        &[
            (1, 1),
            (2, 2),
            (3, 3),
            (4, 4),
            (5, 5),
            (2, 4),
            (3, 0),
            (4, 2),
            (5, 1),
            (6, 1),
        ],
    )
}

/// ```text
/// -3  0 10
///  0  0  0
///  s  0  0
/// ```
pub fn gridworld3() -> GridConfig {
    layout((3, 3), (0, 2), (2, 0), &[(0, 0, -3.0)], &[])
}

/// ```text
///  0  X 10  0
///  0  s  X  0
///  0 -1  X  0
///  0  0  0  0
/// ```
pub fn gridworld4() -> GridConfig {
    layout(
        (4, 4),
        (1, 1),
        (2, 0),
        &[(1, 2, -1.0)],
        &[(1, 0), (2, 1), (2, 2)],
    )
}

pub const PRESET_COUNT: usize = 5;

/// Preset by number, `None` past the last one.
pub fn preset(index: usize) -> Option<GridConfig> {
    match index {
        0 => Some(gridworld0()),
        1 => Some(gridworld1()),
        2 => Some(gridworld2()),
        3 => Some(gridworld3()),
        4 => Some(gridworld4()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Cell, Env};

    #[test]
    fn test_all_presets_validate() {
        for i in 0..PRESET_COUNT {
            let config = preset(i).unwrap();
            assert!(config.validate().is_ok(), "preset {} is invalid", i);
        }
        assert!(preset(PRESET_COUNT).is_none());
    }

    #[test]
    fn test_gridworld1_layout() {
        let env = Env::seeded(&gridworld1(), 0).unwrap();
        assert_eq!(env.start(), Pos::new(2, 0));
        assert_eq!(env.terminal(), Pos::new(2, 2));
        assert_eq!(env.cell(Pos::new(1, 1)), Cell::Barrier);
        assert_eq!(env.cell(Pos::new(2, 1)), Cell::Barrier);
        assert_eq!(env.cell(Pos::new(2, 2)), Cell::Terminal(10.0));
    }
}
