use std::fmt;
use std::io;
use std::path::Path;

use csv::Writer;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeStats {
    /// 1-based episode number.
    pub episode: usize,
    pub steps: usize,
    pub total_return: f64,
    pub average_return: f64,
}

impl EpisodeStats {
    pub fn new(episode: usize, steps: usize, total_return: f64) -> Self {
        let average_return = if steps == 0 {
            0.0
        } else {
            total_return / steps as f64
        };
        Self {
            episode,
            steps,
            total_return,
            average_return,
        }
    }
}

/// Per-episode statistics of a training run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingReport {
    episodes: Vec<EpisodeStats>,
}

impl TrainingReport {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            episodes: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, stats: EpisodeStats) {
        self.episodes.push(stats);
    }

    pub fn episodes(&self) -> &[EpisodeStats] {
        &self.episodes
    }

    pub fn mean_steps(&self) -> f64 {
        self.mean(|s| s.steps as f64)
    }

    pub fn mean_return(&self) -> f64 {
        self.mean(|s| s.total_return)
    }

    fn mean<F: Fn(&EpisodeStats) -> f64>(&self, f: F) -> f64 {
        if self.episodes.is_empty() {
            return 0.0;
        }
        self.episodes.iter().map(f).sum::<f64>() / self.episodes.len() as f64
    }

    /// Episode with the highest total return; the earliest one wins ties.
    pub fn best_return(&self) -> Option<&EpisodeStats> {
        self.episodes
            .iter()
            .rev()
            .max_by_key(|s| OrderedFloat(s.total_return))
    }

    pub fn to_writer<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = Writer::from_writer(writer);
        for stats in &self.episodes {
            wtr.serialize(stats)?;
        }
        wtr.flush().map_err(|source| Error::Io {
            operation: "flush episode statistics".to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).map_err(|source| Error::Io {
            operation: format!("create {}", path.display()),
            source,
        })?;
        self.to_writer(file)
    }
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stats in &self.episodes {
            writeln!(
                f,
                "Episode {:>7} ; Steps: {:>10} ; Return: {:>9.2} ; Avg: {:>7.3}",
                stats.episode, stats.steps, stats.total_return, stats.average_return
            )?;
        }
        Ok(())
    }
}
