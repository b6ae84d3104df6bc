//! Cancellable pending work.
//!
//! A `TicketSlot` holds at most one pending action. Scheduling a new action
//! supersedes the old one, and a ticket that is no longer live resolves to
//! nothing, so a browser timer (or fetch) that completes after a reset cannot
//! touch newer state.

use serde::{Deserialize, Serialize};

/// Opaque id of a scheduled action. Ids are unique per slot and increase
/// monotonically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ticket(u64);

impl Ticket {
    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub struct TicketSlot<A> {
    next_id: u64,
    pending: Option<(Ticket, A)>,
}

impl<A> Default for TicketSlot<A> {
    fn default() -> Self {
        Self {
            next_id: 1,
            pending: None,
        }
    }
}

impl<A> TicketSlot<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever is pending with `action`. Returns the new ticket and
    /// the superseded one, if there was one.
    pub fn schedule(&mut self, action: A) -> (Ticket, Option<Ticket>) {
        let ticket = Ticket(self.next_id);
        self.next_id += 1;
        let old = self.pending.replace((ticket, action)).map(|(t, _)| t);
        (ticket, old)
    }

    pub fn cancel(&mut self) -> Option<Ticket> {
        self.pending.take().map(|(t, _)| t)
    }

    /// Claim the action for `ticket`. `None` when it was cancelled or superseded.
    pub fn take(&mut self, ticket: Ticket) -> Option<A> {
        match self.pending.take() {
            Some((live, action)) if live == ticket => Some(action),
            other => {
                self.pending = other;
                None
            }
        }
    }

    pub fn live(&self) -> Option<Ticket> {
        self.pending.as_ref().map(|(t, _)| *t)
    }

    pub fn peek(&self) -> Option<&A> {
        self.pending.as_ref().map(|(_, a)| a)
    }
}
