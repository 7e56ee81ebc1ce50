//! Modal CRUD forms for server-rendered pages.
//!
//! Create/edit/delete buttons open `#modal`, load a server-rendered form into
//! it and submit that form over AJAX. The server's `is_valid` reply decides
//! whether the form is shown again, the page reloads, or the browser moves on.

pub mod config;
pub mod controller;
pub mod dom;
pub mod error;
pub mod services;
pub mod session;

#[cfg(test)]
pub mod test_utils;

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};
use gloo::events::EventListener;
use gloo::utils::document;
use wasm_bindgen::prelude::*;

use crate::config::ControllerConfig;
use crate::controller::ModalFormController;
use crate::dom::bindings::{bind, Bindings};
use crate::dom::modal::DomModal;
use crate::services::api::ApiClient;
use crate::services::logging::Logger;

pub type DomController = ModalFormController<DomModal, ApiClient>;

const COMPONENT: &str = "crud-modal";

thread_local! {
    static BINDINGS: RefCell<Option<Bindings>> = const { RefCell::new(None) };
}

/// Module entry point: wire the page once the DOM is parsed
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    if document().ready_state() == "loading" {
        EventListener::once(&document(), "DOMContentLoaded", |_| {
            if let Err(err) = boot() {
                Logger::error_with_component(COMPONENT, &format!("{:#}", err));
            }
        })
        .forget();
        return Ok(());
    }
    boot().map_err(|err| JsValue::from_str(&format!("{:#}", err)))
}

/// Detach every listener installed by `start`
#[wasm_bindgen]
pub fn unbind() {
    if BINDINGS.with(|slot| slot.borrow_mut().take()).is_some() {
        Logger::info_with_component(COMPONENT, "listeners detached");
    }
}

fn boot() -> Result<()> {
    let defaults = ControllerConfig::default();
    let Some(modal) = document().get_element_by_id(&defaults.modal_id) else {
        // Pages without a modal have nothing to wire.
        Logger::debug_with_component(
            COMPONENT,
            &format!("no #{} on this page", defaults.modal_id),
        );
        return Ok(());
    };
    let config = ControllerConfig::from_element(&modal).context("invalid modal configuration")?;
    Logger::forward_to(config.log_endpoint.clone());

    let view = DomModal::from_element(modal.clone(), &config)?;
    let transport = ApiClient::with_timeout(config.request_timeout_ms);
    let controller: Rc<DomController> =
        Rc::new(ModalFormController::new(view, transport, config.messages.clone()));

    let bindings = bind(&config, &modal, controller)?;
    BINDINGS.with(|slot| *slot.borrow_mut() = Some(bindings));
    Logger::info_with_component(COMPONENT, "modal forms ready");
    Ok(())
}
