use async_trait::async_trait;
use futures::future::{select, Either};
use futures::pin_mut;
use gloo::net::http::{Request, Response};
use gloo::timers::future::TimeoutFuture;
use serde::de::DeserializeOwned;
use shared::{FormFragment, FormRequest, HttpVerb, SubmissionReply};
use wasm_bindgen::JsValue;
use web_sys::{AbortController, AbortSignal};

use crate::controller::Transport;
use crate::error::ModalError;
use crate::session::Cancellation;

/// What a JSON-expecting XHR sends, so server frameworks recognise AJAX calls
const ACCEPT_JSON: &str = "application/json, text/javascript, */*; q=0.01";

/// API client for the form endpoints of the page's backend
#[derive(Clone)]
pub struct ApiClient {
    timeout_ms: Option<u32>,
}

impl ApiClient {
    /// Create a new API client with the default 30 second timeout
    pub fn new() -> Self {
        Self {
            timeout_ms: Some(30_000),
        }
    }

    /// Create a new API client with a custom timeout (`None` waits forever)
    pub fn with_timeout(timeout_ms: Option<u32>) -> Self {
        Self { timeout_ms }
    }

    pub fn timeout_ms(&self) -> Option<u32> {
        self.timeout_ms
    }

    /// Build the request: AJAX headers, abort signal and, for bodies, the
    /// form content type
    fn prepare(
        verb: HttpVerb,
        url: &str,
        body: Option<String>,
        signal: &AbortSignal,
    ) -> Result<Request, ModalError> {
        let builder = match verb {
            HttpVerb::Get => Request::get(url),
            HttpVerb::Post => Request::post(url),
            HttpVerb::Put => Request::put(url),
            HttpVerb::Patch => Request::patch(url),
            HttpVerb::Delete => Request::delete(url),
        }
        .header("Accept", ACCEPT_JSON)
        .header("X-Requested-With", "XMLHttpRequest")
        .abort_signal(Some(signal));

        match body {
            Some(body) => builder
                .header("Content-Type", FormRequest::CONTENT_TYPE)
                .body(body),
            None => builder.build(),
        }
        .map_err(|e| ModalError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Send a request and return the body of a 2xx response
    async fn exchange(
        &self,
        verb: HttpVerb,
        url: &str,
        body: Option<String>,
        cancel: &Cancellation,
    ) -> Result<String, ModalError> {
        let abort = AbortController::new().map_err(|e| network(url, &e))?;
        let request = Self::prepare(verb, url, body, &abort.signal())?;

        {
            let abort = abort.clone();
            cancel.on_cancel(move || abort.abort());
        }

        let send = async {
            let response = request
                .send()
                .await
                .map_err(|e| failed(url, cancel, e.to_string()))?;
            read_body(url, response, cancel).await
        };

        match self.timeout_ms {
            None => send.await,
            Some(timeout_ms) => {
                let timer = TimeoutFuture::new(timeout_ms);
                pin_mut!(send);
                pin_mut!(timer);
                match select(send, timer).await {
                    Either::Left((result, _)) => result,
                    Either::Right(_) => {
                        abort.abort();
                        Err(ModalError::TimedOut {
                            url: url.to_string(),
                            timeout_ms,
                        })
                    }
                }
            }
        }
    }
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl Transport for ApiClient {
    async fn fetch_form(
        &self,
        url: &str,
        cancel: &Cancellation,
    ) -> Result<FormFragment, ModalError> {
        let text = self.exchange(HttpVerb::Get, url, None, cancel).await?;
        decode(url, &text)
    }

    async fn submit_form(
        &self,
        request: &FormRequest,
        cancel: &Cancellation,
    ) -> Result<SubmissionReply, ModalError> {
        let url = request.url();
        let text = self
            .exchange(request.verb, &url, request.body(), cancel)
            .await?;
        decode(&url, &text)
    }
}

async fn read_body(
    url: &str,
    response: Response,
    cancel: &Cancellation,
) -> Result<String, ModalError> {
    if !response.ok() {
        return Err(ModalError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }
    response
        .text()
        .await
        .map_err(|e| failed(url, cancel, e.to_string()))
}

/// A failed fetch is a cancellation when the session asked for it
fn failed(url: &str, cancel: &Cancellation, reason: String) -> ModalError {
    if cancel.is_cancelled() {
        ModalError::Cancelled { url: url.to_string() }
    } else {
        ModalError::Network {
            url: url.to_string(),
            reason,
        }
    }
}

fn decode<T: DeserializeOwned>(url: &str, text: &str) -> Result<T, ModalError> {
    serde_json::from_str(text).map_err(|e| ModalError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

fn network(url: &str, err: &JsValue) -> ModalError {
    ModalError::Network {
        url: url.to_string(),
        reason: err.as_string().unwrap_or_else(|| format!("{:?}", err)),
    }
}
