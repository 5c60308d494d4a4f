//! Visitation bookkeeping that turns re-entrant resolution into an error.

use super::{TargetGraph, TargetId};
use crate::error::BuildError;

/// Resolution state of a target.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum VisitState {
    Visiting,
    Visited,
}

impl TargetGraph {
    pub(super) fn state(&self, id: TargetId) -> Option<VisitState> {
        self.states.get(&id).copied()
    }

    pub(super) fn enter(&mut self, id: TargetId) {
        self.states.insert(id, VisitState::Visiting);
        self.stack.push(id);
    }

    pub(super) fn leave(&mut self, id: TargetId, completed: bool) {
        self.stack.pop();
        if completed {
            self.states.insert(id, VisitState::Visited);
        } else {
            self.states.remove(&id);
        }
    }

    /// Build the error for re-entering `id` while it is still on the stack.
    pub(super) fn cycle_error(&self, id: TargetId) -> BuildError {
        let start = self.stack.iter().position(|entry| *entry == id).unwrap_or_else(|| {
            debug_assert!(false, "visiting target must be on the stack");
            0
        });
        let mut cycle: Vec<String> = self
            .stack
            .iter()
            .skip(start)
            .map(|entry| self[*entry].import_id().to_owned())
            .collect();
        cycle.push(self[id].import_id().to_owned());
        BuildError::ImportCycle {
            cycle: canonicalize_cycle(cycle),
        }
    }
}

/// Rotate a closed cycle so that it starts, and ends, at its smallest member.
fn canonicalize_cycle(mut cycle: Vec<String>) -> Vec<String> {
    if cycle.len() < 2 {
        return cycle;
    }
    let len = cycle.len() - 1;
    let start = cycle
        .iter()
        .take(len)
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map_or(0, |(idx, _)| idx);
    let (prefix, suffix) = cycle.split_at_mut(len);
    prefix.rotate_left(start);
    if let (Some(first), Some(slot)) = (prefix.first().cloned(), suffix.first_mut()) {
        *slot = first;
    }
    cycle
}
