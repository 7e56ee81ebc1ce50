//! Test doubles for the controller seams.
//!
//! `RecordingView` remembers every call made to the modal, and
//! `ScriptedTransport` answers requests from oneshot channels so tests decide
//! when (and in which order) responses arrive.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use futures::channel::oneshot;
use shared::{FormFragment, FormRequest, SubmissionReply};

use crate::controller::{ModalView, Transport};
use crate::error::ModalError;
use crate::session::Cancellation;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Shown,
    Hidden,
    Content(String),
    Reloaded,
    Redirected(String),
    Alerted(String),
}

#[derive(Default)]
pub struct RecordingView {
    events: RefCell<Vec<ViewEvent>>,
    content: RefCell<Option<String>>,
}

impl RecordingView {
    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.borrow().clone()
    }

    pub fn content(&self) -> Option<String> {
        self.content.borrow().clone()
    }

    fn record(&self, event: ViewEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl ModalView for RecordingView {
    fn show(&self) {
        self.record(ViewEvent::Shown);
    }

    fn hide(&self) {
        self.record(ViewEvent::Hidden);
    }

    fn replace_content(&self, html: &str) {
        *self.content.borrow_mut() = Some(html.to_string());
        self.record(ViewEvent::Content(html.to_string()));
    }

    fn reload(&self) {
        self.record(ViewEvent::Reloaded);
    }

    fn redirect(&self, url: &str) {
        self.record(ViewEvent::Redirected(url.to_string()));
    }

    fn alert(&self, message: &str) {
        self.record(ViewEvent::Alerted(message.to_string()));
    }
}

pub type FormResult = Result<FormFragment, ModalError>;
pub type ReplyResult = Result<SubmissionReply, ModalError>;

#[derive(Default)]
pub struct ScriptedTransport {
    forms: RefCell<HashMap<String, VecDeque<oneshot::Receiver<FormResult>>>>,
    replies: RefCell<VecDeque<oneshot::Receiver<ReplyResult>>>,
    requests: RefCell<Vec<String>>,
}

impl ScriptedTransport {
    /// Requests seen so far, as `"VERB url[ body]"`
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    /// Queue a fragment for `url` that is available immediately
    pub fn form_ready(&self, url: &str, html_form: &str) {
        let respond = self.form_later(url);
        respond(Ok(FormFragment { html_form: html_form.to_string() }));
    }

    pub fn form_failing(&self, url: &str, err: ModalError) {
        let respond = self.form_later(url);
        respond(Err(err));
    }

    /// Queue a response for `url` that arrives when the returned closure runs
    pub fn form_later(&self, url: &str) -> impl FnOnce(FormResult) {
        let (tx, rx) = oneshot::channel();
        self.forms
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(rx);
        move |result| {
            let _ = tx.send(result);
        }
    }

    /// Queue a submission reply, given as raw JSON
    pub fn reply_ready(&self, json: serde_json::Value) {
        let respond = self.reply_later();
        respond(serde_json::from_value(json).map_err(|e| ModalError::Decode {
            url: "scripted".to_string(),
            reason: e.to_string(),
        }));
    }

    pub fn reply_failing(&self, err: ModalError) {
        let respond = self.reply_later();
        respond(Err(err));
    }

    pub fn reply_later(&self) -> impl FnOnce(ReplyResult) {
        let (tx, rx) = oneshot::channel();
        self.replies.borrow_mut().push_back(rx);
        move |result| {
            let _ = tx.send(result);
        }
    }
}

#[async_trait(?Send)]
impl Transport for ScriptedTransport {
    async fn fetch_form(
        &self,
        url: &str,
        _cancel: &Cancellation,
    ) -> Result<FormFragment, ModalError> {
        self.requests.borrow_mut().push(format!("GET {}", url));
        let pending = self
            .forms
            .borrow_mut()
            .get_mut(url)
            .and_then(|queue| queue.pop_front());
        match pending {
            Some(rx) => rx.await.unwrap_or_else(|_| {
                Err(ModalError::Cancelled {
                    url: url.to_string(),
                })
            }),
            None => Err(ModalError::Network {
                url: url.to_string(),
                reason: "no scripted response".to_string(),
            }),
        }
    }

    async fn submit_form(
        &self,
        request: &FormRequest,
        _cancel: &Cancellation,
    ) -> Result<SubmissionReply, ModalError> {
        let line = match request.body() {
            Some(body) => format!("{} {} {}", request.verb, request.url(), body),
            None => format!("{} {}", request.verb, request.url()),
        };
        self.requests.borrow_mut().push(line);
        let pending = self.replies.borrow_mut().pop_front();
        match pending {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(ModalError::Cancelled { url: request.url() })),
            None => Err(ModalError::Network {
                url: request.url(),
                reason: "no scripted response".to_string(),
            }),
        }
    }
}
