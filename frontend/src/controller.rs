//! # Modal form controller
//!
//! Drives the two request/response flows of the page:
//!
//! - `load_form`: show the modal, GET a form fragment, render it
//! - `submit_form`: send the form, then redisplay, reload or redirect
//!   according to the server's `is_valid` status
//!
//! The DOM and the network sit behind [`ModalView`] and [`Transport`] so the
//! flows can be exercised without a browser.

use std::cell::RefCell;

use async_trait::async_trait;
use shared::{FormFragment, FormRequest, SubmissionOutcome, SubmissionReply};

use crate::config::AlertMessages;
use crate::error::{ErrorKind, ModalError};
use crate::services::logging::Logger;
use crate::session::{Cancellation, DialogSession, ModalState};

const COMPONENT: &str = "modal-controller";

/// The modal region and the page navigation it can trigger
pub trait ModalView {
    fn show(&self);
    fn hide(&self);
    /// Replace the content region's markup
    fn replace_content(&self, html: &str);
    fn reload(&self);
    /// Navigate without leaving a history entry
    fn redirect(&self, url: &str);
    /// Blocking user-facing message
    fn alert(&self, message: &str);
}

/// HTTP side of the controller
#[async_trait(?Send)]
pub trait Transport {
    /// GET a form fragment from a trigger's `data-url`
    async fn fetch_form(
        &self,
        url: &str,
        cancel: &Cancellation,
    ) -> Result<FormFragment, ModalError>;

    /// Send a serialized form
    async fn submit_form(
        &self,
        request: &FormRequest,
        cancel: &Cancellation,
    ) -> Result<SubmissionReply, ModalError>;
}

/// How a flow ended when it did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    /// The response was applied to the page
    Applied,
    /// A newer request or a dismissal made this response irrelevant
    Superseded,
}

pub struct ModalFormController<V, T> {
    view: V,
    transport: T,
    session: RefCell<DialogSession>,
    messages: AlertMessages,
}

impl<V: ModalView, T: Transport> ModalFormController<V, T> {
    pub fn new(view: V, transport: T, messages: AlertMessages) -> Self {
        Self {
            view,
            transport,
            session: RefCell::new(DialogSession::new()),
            messages,
        }
    }

    pub fn state(&self) -> ModalState {
        self.session.borrow().state()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Open the modal and fill it with the form served at `url`
    pub async fn load_form(&self, url: &str) -> Result<Settled, ModalError> {
        let ticket = self.session.borrow_mut().begin_load();
        self.view.show();
        Logger::debug_with_component(COMPONENT, &format!("loading form from {}", url));

        let result = self.transport.fetch_form(url, ticket.cancellation()).await;
        if !self.session.borrow().is_current(&ticket) {
            Logger::debug_with_component(COMPONENT, &format!("dropping stale form from {}", url));
            return Ok(Settled::Superseded);
        }

        match result {
            Ok(fragment) => {
                self.view.replace_content(&fragment.html_form);
                self.session.borrow_mut().settle(&ticket, ModalState::FormShown);
                Ok(Settled::Applied)
            }
            Err(err) if err.kind() == ErrorKind::Cancelled => Ok(Settled::Superseded),
            Err(err) => {
                self.session.borrow_mut().settle(&ticket, ModalState::Closed);
                self.view.hide();
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Send a form and act on the server's verdict
    pub async fn submit_form(&self, request: FormRequest) -> Result<Settled, ModalError> {
        let ticket = match self.session.borrow_mut().begin_submit() {
            Ok(ticket) => ticket,
            Err(err) => {
                self.report(&err);
                return Err(err);
            }
        };
        Logger::debug_with_component(
            COMPONENT,
            &format!("submitting {} {}", request.verb, request.action),
        );

        let result = self.transport.submit_form(&request, ticket.cancellation()).await;
        // Success is applied even after a dismissal or a newer load.
        let current = self.session.borrow_mut().end_submit(&ticket);

        let reply = match result {
            Ok(reply) => reply,
            Err(err) if err.kind() == ErrorKind::Cancelled => return Ok(Settled::Superseded),
            Err(err) if !current => {
                Logger::warn_with_component(
                    COMPONENT,
                    &format!("submission to {} failed after dismissal: {}", request.action, err),
                );
                return Ok(Settled::Superseded);
            }
            Err(err) => {
                self.session.borrow_mut().settle(&ticket, ModalState::FormShown);
                self.report(&err);
                return Err(err);
            }
        };

        match SubmissionOutcome::try_from(reply) {
            Ok(SubmissionOutcome::Succeeded) => {
                self.session.borrow_mut().settle(&ticket, ModalState::Closed);
                self.view.reload();
            }
            Ok(SubmissionOutcome::SucceededWithRedirect { url }) => {
                self.session.borrow_mut().settle(&ticket, ModalState::Closed);
                Logger::info_with_component(COMPONENT, &format!("redirecting to {}", url));
                self.view.redirect(&url);
            }
            Ok(SubmissionOutcome::ValidationFailed { .. }) if !current => {
                Logger::debug_with_component(
                    COMPONENT,
                    &format!("dropping validation errors from {}", request.action),
                );
                return Ok(Settled::Superseded);
            }
            Ok(SubmissionOutcome::ValidationFailed { form }) => {
                self.view.replace_content(&form);
                self.session.borrow_mut().settle(&ticket, ModalState::FormShown);
            }
            Err(outcome) if !current => {
                Logger::warn_with_component(
                    COMPONENT,
                    &format!("ignoring reply from {} after dismissal: {}", request.action, outcome),
                );
                return Ok(Settled::Superseded);
            }
            Err(outcome) => {
                let err = ModalError::from(outcome);
                self.session.borrow_mut().settle(&ticket, ModalState::FormShown);
                self.report(&err);
                return Err(err);
            }
        }
        Ok(Settled::Applied)
    }

    /// Report a form that could not be turned into a request. The submission
    /// was already intercepted, so the user still needs to hear about it.
    pub fn reject_form(&self, err: ModalError) -> ModalError {
        self.report(&err);
        err
    }

    /// Dismiss the modal. A pending load is dropped; a pending submission
    /// still reloads or redirects if the server accepts it.
    pub fn close(&self) {
        self.session.borrow_mut().close();
        self.view.hide();
    }

    fn report(&self, err: &ModalError) {
        match err.kind() {
            ErrorKind::Transport => {
                Logger::error_with_component(COMPONENT, &err.to_string());
                self.view.alert(&self.messages.network);
            }
            ErrorKind::Protocol => {
                Logger::error_with_component(COMPONENT, &err.to_string());
                self.view.alert(&self.messages.unexpected);
            }
            ErrorKind::Busy => Logger::warn_with_component(COMPONENT, &err.to_string()),
            ErrorKind::Cancelled => {}
        }
    }
}
