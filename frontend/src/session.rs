//! # Dialog session
//!
//! The page has a single modal region shared by every trigger. This module
//! owns it as one explicit session: each load or submit takes a [`Ticket`],
//! and starting new work moves the generation on, so a slow response can
//! never overwrite the result of a newer request. Pending loads are aborted;
//! a pending submission is left to finish because the server may already
//! have committed it.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::error::ModalError;

/// Where the modal is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalState {
    Closed,
    Loading,
    FormShown,
    Submitting,
}

#[derive(Default)]
struct CancelState {
    cancelled: Cell<bool>,
    hooks: RefCell<Vec<Box<dyn FnOnce()>>>,
}

/// Single-shot cancellation flag shared between a session and a request
#[derive(Clone, Default)]
pub struct Cancellation {
    inner: Rc<CancelState>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.get()
    }

    /// Run `hook` on cancellation, or right away if already cancelled
    pub fn on_cancel(&self, hook: impl FnOnce() + 'static) {
        if self.is_cancelled() {
            hook();
        } else {
            self.inner.hooks.borrow_mut().push(Box::new(hook));
        }
    }

    pub fn cancel(&self) {
        if self.inner.cancelled.replace(true) {
            return;
        }
        // Hooks may register further hooks; release the borrow first.
        let hooks = std::mem::take(&mut *self.inner.hooks.borrow_mut());
        for hook in hooks {
            hook();
        }
    }
}

impl fmt::Debug for Cancellation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Cancellation")
            .field("cancelled", &self.is_cancelled())
            .field("hooks", &self.inner.hooks.borrow().len())
            .finish()
    }
}

/// Proof of which request a response belongs to
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    cancellation: Cancellation,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }
}

#[derive(Debug)]
pub struct DialogSession {
    state: ModalState,
    generation: u64,
    /// Pending form load; superseded by any newer request or a dismissal
    load: Option<Cancellation>,
    /// Generation of the pending submission. A submission is never cancelled
    /// from here: the server may already have acted on it.
    submit: Option<u64>,
}

impl Default for DialogSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DialogSession {
    pub fn new() -> Self {
        Self {
            state: ModalState::Closed,
            generation: 0,
            load: None,
            submit: None,
        }
    }

    pub fn state(&self) -> ModalState {
        self.state
    }

    pub fn has_request_in_flight(&self) -> bool {
        self.load.is_some() || self.submit.is_some()
    }

    pub fn is_submitting(&self) -> bool {
        self.submit.is_some()
    }

    /// Start loading a form; a pending load is superseded
    pub fn begin_load(&mut self) -> Ticket {
        self.supersede();
        self.state = ModalState::Loading;
        self.issue_load()
    }

    /// Start a submission. A second submission while one is pending is
    /// rejected; a pending load is superseded.
    pub fn begin_submit(&mut self) -> Result<Ticket, ModalError> {
        if self.submit.is_some() {
            return Err(ModalError::SubmitInFlight);
        }
        self.supersede();
        self.state = ModalState::Submitting;
        self.submit = Some(self.generation);
        Ok(Ticket {
            generation: self.generation,
            cancellation: Cancellation::new(),
        })
    }

    /// Release the submission slot held by `ticket`. Returns whether the
    /// modal still belongs to that submission.
    pub fn end_submit(&mut self, ticket: &Ticket) -> bool {
        if self.submit == Some(ticket.generation) {
            self.submit = None;
        }
        self.is_current(ticket)
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation && !ticket.cancellation.is_cancelled()
    }

    /// Record the state a current request settled into. Stale tickets are
    /// ignored and `false` is returned.
    pub fn settle(&mut self, ticket: &Ticket, state: ModalState) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.load = None;
        self.state = state;
        true
    }

    /// Drop the session: cancel a pending load and mark the modal closed.
    /// A pending submission keeps running.
    pub fn close(&mut self) {
        self.supersede();
        self.state = ModalState::Closed;
    }

    fn supersede(&mut self) {
        if let Some(pending) = self.load.take() {
            pending.cancel();
        }
        self.generation += 1;
    }

    fn issue_load(&mut self) -> Ticket {
        let cancellation = Cancellation::new();
        self.load = Some(cancellation.clone());
        Ticket {
            generation: self.generation,
            cancellation,
        }
    }
}
