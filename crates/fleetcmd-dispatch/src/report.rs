//! Aggregate outcome of a fleet run.

use crate::dispatcher::InvocationOutcome;
use crate::error::DispatchError;

/// Outcome of a single batch.
#[derive(Debug)]
pub struct BatchReport {
    pub index: usize,
    pub instance_count: usize,
    pub result: Result<InvocationOutcome, DispatchError>,
}

impl BatchReport {
    /// The invocation was observed and ended `Finished`.
    pub fn is_success(&self) -> bool {
        matches!(&self.result, Ok(outcome) if outcome.is_success())
    }
}

/// Per-batch outcomes of one run, ordered by batch index.
#[derive(Debug, Default)]
pub struct RunReport {
    pub batches: Vec<BatchReport>,
}

impl RunReport {
    pub fn new(mut batches: Vec<BatchReport>) -> Self {
        batches.sort_by_key(|b| b.index);
        Self { batches }
    }

    pub fn total_instances(&self) -> usize {
        self.batches.iter().map(|b| b.instance_count).sum()
    }

    /// Batches whose invocation finished successfully.
    pub fn succeeded(&self) -> usize {
        self.batches.iter().filter(|b| b.is_success()).count()
    }

    /// Batches that reached a failure-class terminal status.
    pub fn unsuccessful(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| matches!(&b.result, Ok(outcome) if !outcome.is_success()))
            .count()
    }

    /// Batches that could not be driven to a terminal status.
    pub fn errored(&self) -> usize {
        self.batches.iter().filter(|b| b.result.is_err()).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.batches.iter().all(BatchReport::is_success)
    }
}
