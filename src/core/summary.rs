//! Ranked summary of all runs.

use std::fmt;
use std::time::Duration;

use crate::model::Structure;
use crate::optimizer_result::Status;
use crate::selection::compare_fitness;

use super::shared::RunSnapshot;

/// Number of decimals worth printing for scores compared up to `eps`:
/// `1 - log10(eps)` with the logarithm truncated toward zero.
pub fn precision_for(eps: f64) -> usize {
    if !(eps > 0.0) || !eps.is_finite() {
        return 6;
    }
    let log = eps.log10();
    // Exact powers of ten may land a hair off the integer.
    let exponent = if (log - log.round()).abs() < 1e-9 {
        log.round()
    } else {
        log.trunc()
    };
    (1.0 - exponent).clamp(0.0, 16.0) as usize
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub rank: usize,
    pub index: usize,
    pub score: f64,
    pub structure: Option<Structure>,
    pub n_eval: usize,
    pub n_iter: usize,
    pub status: Status,
    pub elapsed: Duration,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RunsSummary {
    rows: Vec<SummaryRow>,
    total_runs: usize,
    finished_runs: usize,
    precision: usize,
}

impl RunsSummary {
    /// Ranks snapshots by score, then by run index.
    pub fn from_snapshots(snapshots: &[RunSnapshot], total_runs: usize, eps: f64) -> Self {
        let mut ordered: Vec<&RunSnapshot> = snapshots.iter().collect();
        ordered.sort_by(|a, b| {
            compare_fitness(a.result.y(), b.result.y()).then(a.index.cmp(&b.index))
        });
        let rows = ordered
            .into_iter()
            .enumerate()
            .map(|(i, snapshot)| SummaryRow {
                rank: i + 1,
                index: snapshot.index,
                score: snapshot.result.y(),
                structure: snapshot.structure.clone(),
                n_eval: snapshot.result.n_eval(),
                n_iter: snapshot.result.n_iter(),
                status: snapshot.result.status(),
                elapsed: snapshot.elapsed,
            })
            .collect();
        Self {
            rows,
            total_runs,
            finished_runs: snapshots.iter().filter(|s| s.finished).count(),
            precision: precision_for(eps),
        }
    }

    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn best(&self) -> Option<&SummaryRow> {
        self.rows.first()
    }

    pub fn total_runs(&self) -> usize {
        self.total_runs
    }

    pub fn finished_runs(&self) -> usize {
        self.finished_runs
    }

    pub fn precision(&self) -> usize {
        self.precision
    }
}

impl fmt::Display for RunsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Runs finished: {}/{}, reporting: {}",
            self.finished_runs,
            self.total_runs,
            self.rows.len()
        )?;
        writeln!(
            f,
            "{:>4}  {:>4}  {:>16}  {:>12}  {:>8}  {:>8}  {:>10}  {}",
            "rank", "run", "score", "structure", "n_eval", "n_iter", "elapsed", "status"
        )?;
        for row in &self.rows {
            let structure = row
                .structure
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                f,
                "{:>4}  {:>4}  {:>16.prec$}  {:>12}  {:>8}  {:>8}  {:>9.1}s  {}",
                row.rank,
                row.index,
                row.score,
                structure,
                row.n_eval,
                row.n_iter,
                row.elapsed.as_secs_f64(),
                row.status,
                prec = self.precision
            )?;
        }
        Ok(())
    }
}
