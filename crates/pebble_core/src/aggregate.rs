//! Reduction of per-center (S, U) counts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable and unstable counts of one configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuPair {
    pub stable: usize,
    pub unstable: usize,
}

impl SuPair {
    pub fn new(stable: usize, unstable: usize) -> Self {
        Self { stable, unstable }
    }
}

/// Aggregated counts; fractional only after averaging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SuSummary {
    pub stable: f64,
    pub unstable: f64,
}

impl From<SuPair> for SuSummary {
    fn from(pair: SuPair) -> Self {
        Self {
            stable: pair.stable as f64,
            unstable: pair.unstable as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    First,
    Average,
    SMin,
    SMax,
    UMin,
    UMax,
}

impl Aggregation {
    pub const ALL: [Aggregation; 6] = [
        Aggregation::First,
        Aggregation::Average,
        Aggregation::SMin,
        Aggregation::SMax,
        Aggregation::UMin,
        Aggregation::UMax,
    ];

    /// Keyword used in parameter rows.
    pub fn keyword(self) -> &'static str {
        match self {
            Aggregation::First => "first",
            Aggregation::Average => "average",
            Aggregation::SMin => "smin",
            Aggregation::SMax => "smax",
            Aggregation::UMin => "umin",
            Aggregation::UMax => "umax",
        }
    }

    /// `None` for an empty list.
    pub fn reduce(self, pairs: &[SuPair]) -> Option<SuSummary> {
        let first = *pairs.first()?;
        let by_su = |p: &&SuPair| (p.stable, p.unstable);
        let by_us = |p: &&SuPair| (p.unstable, p.stable);
        let picked = match self {
            Aggregation::First => first,
            Aggregation::Average => {
                let n = pairs.len() as f64;
                let (s, u) = pairs
                    .iter()
                    .fold((0.0, 0.0), |(s, u), p| (s + p.stable as f64, u + p.unstable as f64));
                return Some(SuSummary {
                    stable: s / n,
                    unstable: u / n,
                });
            }
            Aggregation::SMin => *pairs.iter().min_by_key(by_su)?,
            Aggregation::SMax => *pairs.iter().max_by_key(by_su)?,
            Aggregation::UMin => *pairs.iter().min_by_key(by_us)?,
            Aggregation::UMax => *pairs.iter().max_by_key(by_us)?,
        };
        Some(picked.into())
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
