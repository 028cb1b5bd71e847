// src/bulk.rs

//! Per-item results of bulk operations
//!
//! Bulk operations never stop at the first failure. Each item gets an
//! [`ItemOutcome`]; [`BulkReport::into_result`] turns the report into a
//! single aggregate error when anything failed.

use crate::error::{BulkFamily, Error, Result};

/// What happened to one item of a bulk operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The item was changed
    Done,
    /// Nothing needed doing; no write happened
    Unchanged,
    /// One or more failures, already formatted for display
    Failed(Vec<String>),
}

impl ItemOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ItemOutcome::Failed(_))
    }
}

/// Ordered outcomes of a bulk operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub outcomes: Vec<(String, ItemOutcome)>,
}

impl BulkReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: impl Into<String>, outcome: ItemOutcome) {
        self.outcomes.push((item.into(), outcome));
    }

    /// Items that were actually changed
    pub fn changed(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == ItemOutcome::Done)
            .map(|(item, _)| item.as_str())
    }

    /// Every failure message, in item order
    pub fn messages(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|(_, outcome)| match outcome {
                ItemOutcome::Failed(messages) => Some(messages.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|(_, outcome)| outcome.is_failure())
    }

    /// `Ok` when every item succeeded, otherwise one aggregate error
    pub fn into_result(self, family: BulkFamily) -> Result<()> {
        let messages = self.messages();
        if messages.is_empty() {
            Ok(())
        } else {
            Err(Error::Aggregate { family, messages })
        }
    }
}
