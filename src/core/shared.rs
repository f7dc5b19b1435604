//! State shared between the coordinator and its runs.
//!
//! One slot per run index, created up front. Each slot has exactly one
//! writer, the `RunSlot` handed to the run that owns it, and any number of
//! readers. A snapshot is swapped in whole under the slot lock, so readers
//! see the previous snapshot or the new one and never a mix.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::{OptimizationError, Result};
use crate::model::Structure;
use crate::optimizer_result::OptimizerResult;

/// Latest published state of one run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct RunSnapshot {
    /// Run index, starting at 1.
    pub index: usize,
    pub result: OptimizerResult,
    pub structure: Option<Structure>,
    pub elapsed: Duration,
    pub finished: bool,
}

#[derive(Debug)]
pub struct SharedRunState {
    slots: Vec<RwLock<Option<RunSnapshot>>>,
    claimed: Vec<AtomicBool>,
}

impl SharedRunState {
    pub fn new(number_of_runs: usize) -> Arc<Self> {
        Arc::new(Self {
            slots: (0..number_of_runs).map(|_| RwLock::new(None)).collect(),
            claimed: (0..number_of_runs).map(|_| AtomicBool::new(false)).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Hands out the only writer of slot `index`.
    ///
    /// # Errors
    ///
    /// Fails when the index is out of range or its writer was already taken.
    pub fn writer(self: &Arc<Self>, index: usize) -> Result<RunSlot> {
        let position = self.position(index)?;
        if self.claimed[position].swap(true, Ordering::SeqCst) {
            return Err(OptimizationError::Configuration(format!(
                "Slot of run {} already has a writer",
                index
            )));
        }
        Ok(RunSlot {
            state: Arc::clone(self),
            index,
        })
    }

    pub fn snapshot(&self, index: usize) -> Option<RunSnapshot> {
        let position = self.position(index).ok()?;
        self.slots[position].read().clone()
    }

    /// Every published snapshot, by run index.
    pub fn snapshots(&self) -> Vec<RunSnapshot> {
        self.slots
            .iter()
            .filter_map(|slot| slot.read().clone())
            .collect()
    }

    pub fn finished_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.read().as_ref().map_or(false, |s| s.finished))
            .count()
    }

    fn position(&self, index: usize) -> Result<usize> {
        if index == 0 || index > self.slots.len() {
            return Err(OptimizationError::Configuration(format!(
                "Run index {} is outside 1..={}",
                index,
                self.slots.len()
            )));
        }
        Ok(index - 1)
    }
}

/// Exclusive writer of one slot.
#[derive(Debug)]
pub struct RunSlot {
    state: Arc<SharedRunState>,
    index: usize,
}

impl RunSlot {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn publish(&self, snapshot: RunSnapshot) {
        *self.state.slots[self.index - 1].write() = Some(snapshot);
    }
}
