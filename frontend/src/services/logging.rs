use serde::Serialize;
use std::cell::RefCell;

#[derive(Debug, Clone, Serialize)]
struct LogRequest {
    level: String,
    message: String,
    component: Option<String>,
}

thread_local! {
    static FORWARD_ENDPOINT: RefCell<Option<String>> = const { RefCell::new(None) };
}

pub struct Logger;

impl Logger {
    /// Also POST every record as JSON to `endpoint` (or stop forwarding with `None`)
    pub fn forward_to(endpoint: Option<String>) {
        FORWARD_ENDPOINT.with(|slot| *slot.borrow_mut() = endpoint);
    }

    pub fn debug_with_component(component: &str, message: &str) {
        Self::log("debug", message, Some(component.to_string()));
    }

    pub fn info_with_component(component: &str, message: &str) {
        Self::log("info", message, Some(component.to_string()));
    }

    pub fn warn_with_component(component: &str, message: &str) {
        Self::log("warn", message, Some(component.to_string()));
    }

    pub fn error_with_component(component: &str, message: &str) {
        Self::log("error", message, Some(component.to_string()));
    }

    fn log(level: &str, message: &str, component: Option<String>) {
        let request = LogRequest {
            level: level.to_string(),
            message: message.to_string(),
            component,
        };

        Self::write_console(&request);

        if let Some(endpoint) = FORWARD_ENDPOINT.with(|slot| slot.borrow().clone()) {
            Self::forward(endpoint, request);
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn write_console(request: &LogRequest) {
        let line = format!(
            "[{}] {}",
            request.component.as_deref().unwrap_or("crud-modal"),
            request.message
        );
        match request.level.as_str() {
            "debug" => gloo::console::debug!(line),
            "info" => gloo::console::info!(line),
            "warn" => gloo::console::warn!(line),
            _ => gloo::console::error!(line),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn write_console(request: &LogRequest) {
        eprintln!(
            "{:>5} [{}] {}",
            request.level,
            request.component.as_deref().unwrap_or("crud-modal"),
            request.message
        );
    }

    #[cfg(target_arch = "wasm32")]
    fn forward(endpoint: String, request: LogRequest) {
        use gloo::net::http::Request;
        use wasm_bindgen_futures::spawn_local;

        // Fire and forget; a failing log sink must not log about itself.
        spawn_local(async move {
            if let Ok(post) = Request::post(&endpoint).json(&request) {
                let _ = post.send().await;
            }
        });
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn forward(_endpoint: String, _request: LogRequest) {}
}
