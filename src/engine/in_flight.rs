// src/engine/in_flight.rs

use tracing::warn;

use crate::engine::ConnectorName;
use crate::exec::{CompletionPoll, InFlightWork};

/// A finished entry removed from the [`InFlightSet`].
#[derive(Debug)]
pub enum Finished {
    /// The worker resolved the completion signal.
    Resolved(InFlightWork, crate::exec::DrainResult),
    /// The worker dropped the signal without resolving it.
    Broken(InFlightWork),
}

impl Finished {
    pub fn work(&self) -> &InFlightWork {
        match self {
            Finished::Resolved(work, _) | Finished::Broken(work) => work,
        }
    }

    pub fn connector(&self) -> &ConnectorName {
        &self.work().connector
    }
}

/// Launched runs that have not been collected yet, in launch order.
///
/// Holds at most one entry per connector.
#[derive(Debug, Default)]
pub struct InFlightSet {
    work: Vec<InFlightWork>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.work.len()
    }

    pub fn is_empty(&self) -> bool {
        self.work.is_empty()
    }

    pub fn contains(&self, connector: &str) -> bool {
        self.work.iter().any(|w| w.connector == connector)
    }

    pub fn connectors(&self) -> impl Iterator<Item = &str> {
        self.work.iter().map(|w| w.connector.as_str())
    }

    /// Register a launched run. A second entry for the same connector is
    /// refused and handed back.
    pub fn insert(&mut self, work: InFlightWork) -> Result<(), InFlightWork> {
        if self.contains(&work.connector) {
            warn!(connector = %work.connector, "connector already has a run in flight");
            return Err(work);
        }
        self.work.push(work);
        Ok(())
    }

    /// Remove and return every entry whose completion signal has resolved
    /// or broken. Pending entries stay in the set.
    pub fn take_finished(&mut self) -> Vec<Finished> {
        let mut finished = Vec::new();
        let mut pending = Vec::with_capacity(self.work.len());

        for mut work in self.work.drain(..) {
            match work.poll_completion() {
                CompletionPoll::Pending => pending.push(work),
                CompletionPoll::Ready(result) => finished.push(Finished::Resolved(work, result)),
                CompletionPoll::Broken => finished.push(Finished::Broken(work)),
            }
        }

        self.work = pending;
        finished
    }
}
