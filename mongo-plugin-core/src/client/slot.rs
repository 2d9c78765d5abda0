//! Generation-tracked holder for a client's live connection handle.
//!
//! Connecting is a two-step affair: read whatever handle is live, verify it
//! over the network, then store it. A `close` from another holder can land
//! between those steps. Every [`HandleSlot::take`] bumps the slot's
//! generation, and [`HandleSlot::install`] refuses a [`Lease`] taken under an
//! older generation, so a handle that was shut down mid-connect is never
//! put back.

use std::sync::{PoisonError, RwLock};

/// Holds at most one live handle and counts how often it was closed.
#[derive(Debug)]
pub struct HandleSlot<T> {
    state: RwLock<SlotState<T>>,
}

#[derive(Debug)]
struct SlotState<T> {
    live: Option<T>,
    generation: u64,
}

/// Snapshot of a slot taken at the start of a connect attempt.
#[derive(Debug)]
pub struct Lease<T> {
    /// Handle that was live when the lease was taken
    pub live: Option<T>,
    generation: u64,
}

impl<T> Default for HandleSlot<T> {
    fn default() -> Self {
        Self {
            state: RwLock::new(SlotState {
                live: None,
                generation: 0,
            }),
        }
    }
}

impl<T: Clone> HandleSlot<T> {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clone of the live handle, if any.
    pub fn current(&self) -> Option<T> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .live
            .clone()
    }

    /// Starts a connect attempt.
    pub fn lease(&self) -> Lease<T> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Lease {
            live: state.live.clone(),
            generation: state.generation,
        }
    }

    /// Finishes a connect attempt with a verified `handle`.
    ///
    /// Returns `false` if the slot was closed after `lease` was taken; the
    /// handle is then dropped. If another attempt already stored a handle
    /// under the same generation, that one is kept.
    pub fn install(&self, lease: Lease<T>, handle: T) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.generation != lease.generation {
            return false;
        }

        if state.live.is_none() {
            state.live = Some(handle);
        }
        true
    }

    /// Removes the live handle and invalidates all outstanding leases.
    pub fn take(&self) -> Option<T> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.generation = state.generation.wrapping_add(1);
        state.live.take()
    }
}
