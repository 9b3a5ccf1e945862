// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Generation counter used to discard results of superseded requests.
//!
//! Every trigger (new item list, new trip context, retry) calls
//! [`Generation::advance`] and carries the returned [`Ticket`] through its
//! awaits. A result may only be applied while its ticket is still current.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Generation {
    counter: Arc<AtomicU64>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new cycle, invalidating every ticket issued before.
    pub fn advance(&self) -> Ticket {
        let id = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            id,
            counter: Arc::clone(&self.counter),
        }
    }

    /// Ticket for the cycle in progress, without invalidating it.
    pub fn current(&self) -> Ticket {
        Ticket {
            id: self.counter.load(Ordering::SeqCst),
            counter: Arc::clone(&self.counter),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ticket {
    id: u64,
    counter: Arc<AtomicU64>,
}

impl Ticket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.id
    }

    pub fn is_stale(&self) -> bool {
        !self.is_current()
    }
}
