//! Event wiring between the page and the controller.
//!
//! Edit/delete triggers are delegated from their containers so rows inserted
//! after boot keep working; form submissions are delegated from the modal,
//! since its forms are replaced on every load.

use std::rc::Rc;

use anyhow::{anyhow, Result};
use gloo::events::{EventListener, EventListenerOptions};
use gloo::utils::document;
use shared::TriggerKind;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Element, Event, HtmlFormElement, KeyboardEvent};

use crate::config::{ControllerConfig, TriggerScope};
use crate::controller::{ModalFormController, ModalView, Transport};
use crate::error::ModalError;
use crate::services::form_data::collect_form;
use crate::services::logging::Logger;
use crate::session::ModalState;

const COMPONENT: &str = "modal-bindings";
const DISMISS_SELECTOR: &str = r#"[data-dismiss="modal"], [data-bs-dismiss="modal"]"#;

/// Live listeners; dropping this detaches them
pub struct Bindings {
    listeners: Vec<EventListener>,
}

impl Bindings {
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// Attach every trigger, submit and dismiss listener described by `config`.
/// Dismissal covers `[data-dismiss]` controls and, unless disabled, backdrop
/// clicks and Escape.
pub fn bind<V, T>(
    config: &ControllerConfig,
    modal: &Element,
    controller: Rc<ModalFormController<V, T>>,
) -> Result<Bindings>
where
    V: ModalView + 'static,
    T: Transport + 'static,
{
    let mut listeners = Vec::new();

    for binding in &config.triggers {
        let kind = binding.kind;
        let selector = kind.trigger_selector();
        match &binding.scope {
            TriggerScope::Direct => {
                let nodes = document()
                    .query_selector_all(&selector)
                    .map_err(|e| anyhow!("bad selector {}: {:?}", selector, e))?;
                for index in 0..nodes.length() {
                    let node = nodes.item(index);
                    let Some(trigger) = node.and_then(|node| node.dyn_into::<Element>().ok())
                    else {
                        continue;
                    };
                    let controller = controller.clone();
                    let target = trigger.clone();
                    listeners.push(EventListener::new(&trigger, "click", move |_| {
                        open_from(&controller, &target, kind);
                    }));
                }
            }
            TriggerScope::Delegated(container_ids) => {
                for id in container_ids {
                    let Some(container) = document().get_element_by_id(id) else {
                        Logger::debug_with_component(
                            COMPONENT,
                            &format!("no #{} on this page, skipping {} triggers", id, kind),
                        );
                        continue;
                    };
                    let controller = controller.clone();
                    let selector = selector.clone();
                    let scope = container.clone();
                    listeners.push(EventListener::new(&container, "click", move |event| {
                        if let Some(trigger) = delegate_target(event, &scope, &selector) {
                            open_from(&controller, &trigger, kind);
                        }
                    }));
                }
            }
        }
    }

    {
        let controller = controller.clone();
        let form_selector = config.form_selector();
        let scope = modal.clone();
        listeners.push(EventListener::new_with_options(
            modal,
            "submit",
            EventListenerOptions::enable_prevent_default(),
            move |event| {
                let Some(form) = delegate_target(event, &scope, &form_selector) else {
                    return;
                };
                // Never let the browser submit these forms natively.
                event.prevent_default();
                submit_from(&controller, form);
            },
        ));
    }

    {
        let controller = controller.clone();
        let scope = modal.clone();
        let close_on_backdrop = config.close_on_backdrop;
        listeners.push(EventListener::new(modal, "click", move |event| {
            if delegate_target(event, &scope, DISMISS_SELECTOR).is_some()
                || (close_on_backdrop && is_backdrop_click(event, &scope))
            {
                controller.close();
            }
        }));
    }

    if config.close_on_escape {
        listeners.push(EventListener::new(&document(), "keydown", move |event| {
            let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                return;
            };
            if event.key() == "Escape" && controller.state() != ModalState::Closed {
                controller.close();
            }
        }));
    }

    Logger::info_with_component(COMPONENT, &format!("bound {} listeners", listeners.len()));
    Ok(Bindings { listeners })
}

/// Closest ancestor of the event target matching `selector`, inside `scope`
fn delegate_target(event: &Event, scope: &Element, selector: &str) -> Option<Element> {
    let target = event.target()?.dyn_into::<Element>().ok()?;
    let matched = target.closest(selector).ok()??;
    scope.contains(Some(&matched)).then_some(matched)
}

/// The modal element spans the viewport around the dialog, so a click that
/// lands on it directly landed outside the dialog
fn is_backdrop_click(event: &Event, modal: &Element) -> bool {
    event
        .target()
        .and_then(|target| target.dyn_into::<Element>().ok())
        .is_some_and(|target| &target == modal)
}

fn open_from<V, T>(
    controller: &Rc<ModalFormController<V, T>>,
    trigger: &Element,
    kind: TriggerKind,
) where
    V: ModalView + 'static,
    T: Transport + 'static,
{
    let url = trigger.get_attribute("data-url");
    let Some(url) = url.filter(|url| !url.trim().is_empty()) else {
        Logger::warn_with_component(
            COMPONENT,
            &format!("{} trigger without data-url ignored", kind),
        );
        return;
    };
    let controller = controller.clone();
    spawn_local(async move {
        // Failures are reported to the user by the controller.
        let _ = controller.load_form(&url).await;
    });
}

fn submit_from<V, T>(controller: &Rc<ModalFormController<V, T>>, form: Element)
where
    V: ModalView + 'static,
    T: Transport + 'static,
{
    let request = match form.dyn_into::<HtmlFormElement>() {
        Ok(form) => collect_form(&form),
        Err(_) => Err(ModalError::Form("submit target is not a <form>".to_string())),
    };
    match request {
        Ok(request) => {
            let controller = controller.clone();
            spawn_local(async move {
                let _ = controller.submit_form(request).await;
            });
        }
        Err(err) => {
            controller.reject_form(err);
        }
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use crate::config::AlertMessages;
    use crate::test_utils::{RecordingView, ScriptedTransport, ViewEvent};
    use gloo::timers::future::TimeoutFuture;
    use gloo::utils::body;
    use serde_json::json;
    use wasm_bindgen_test::*;
    use web_sys::{EventInit, HtmlElement, KeyboardEventInit};

    wasm_bindgen_test_configure!(run_in_browser);

    type TestController = ModalFormController<RecordingView, ScriptedTransport>;

    struct Page {
        root: Element,
        modal: Element,
    }

    impl Drop for Page {
        fn drop(&mut self) {
            self.root.remove();
        }
    }

    fn page() -> Page {
        let root = document().create_element("div").unwrap();
        root.set_inner_html(
            r#"<button class="js-criar" data-url="/items/novo/">Novo</button>
               <table id="tabela"><tbody></tbody></table>
               <div id="detail">
                 <a class="js-editar" data-url="/items/7/editar/">Editar</a>
                 <a class="js-deletar" data-url="/items/7/deletar/">Deletar</a>
               </div>
               <div id="modal">
                 <div class="modal-dialog"><div class="modal-content"></div></div>
               </div>"#,
        );
        body().append_child(&root).unwrap();
        let modal = document().get_element_by_id("modal").unwrap();
        Page { root, modal }
    }

    impl Page {
        fn find(&self, selector: &str) -> Element {
            self.root.query_selector(selector).unwrap().unwrap()
        }
    }

    fn controller() -> Rc<TestController> {
        Rc::new(ModalFormController::new(
            RecordingView::default(),
            ScriptedTransport::default(),
            AlertMessages::default(),
        ))
    }

    fn bind_defaults(page: &Page, controller: &Rc<TestController>) -> Bindings {
        bind(&ControllerConfig::default(), &page.modal, controller.clone()).unwrap()
    }

    fn click(element: &Element) {
        element.clone().unchecked_into::<HtmlElement>().click();
    }

    fn dispatch_submit(form: &Element) -> bool {
        let init = EventInit::new();
        init.set_bubbles(true);
        init.set_cancelable(true);
        let event = Event::new_with_event_init_dict("submit", &init).unwrap();
        form.dispatch_event(&event).unwrap()
    }

    fn press(key: &str) {
        let init = KeyboardEventInit::new();
        init.set_key(key);
        init.set_bubbles(true);
        let event = KeyboardEvent::new_with_keyboard_event_init_dict("keydown", &init).unwrap();
        document().dispatch_event(&event).unwrap();
    }

    async fn settle() {
        TimeoutFuture::new(0).await;
    }

    /// Load a form so the modal is open
    async fn open(page: &Page, controller: &Rc<TestController>) {
        controller.transport().form_ready("/items/novo/", "<p>form</p>");
        click(&page.find(".js-criar"));
        settle().await;
        assert_eq!(controller.state(), ModalState::FormShown);
    }

    #[wasm_bindgen_test]
    async fn test_delegated_trigger_added_after_bind() {
        let page = page();
        let controller = controller();
        let _bindings = bind_defaults(&page, &controller);
        controller.transport().form_ready("/items/5/editar/", "<p>X</p>");

        let rows = page.find("#tabela tbody");
        rows.set_inner_html(
            r#"<tr><td><button class="js-editar" data-url="/items/5/editar/">
               <span>Editar</span></button></td></tr>"#,
        );
        click(&rows.query_selector("span").unwrap().unwrap());
        settle().await;

        assert_eq!(controller.transport().requests(), vec!["GET /items/5/editar/".to_string()]);
        assert_eq!(
            controller.view().events(),
            vec![ViewEvent::Shown, ViewEvent::Content("<p>X</p>".to_string())]
        );
    }

    #[wasm_bindgen_test]
    async fn test_delete_trigger_in_table() {
        let page = page();
        let controller = controller();
        let _bindings = bind_defaults(&page, &controller);
        controller.transport().form_ready("/items/5/deletar/", "<p>Confirmar?</p>");

        let rows = page.find("#tabela tbody");
        rows.set_inner_html(
            r#"<tr><td>
               <button class="js-deletar" data-url="/items/5/deletar/">X</button>
               </td></tr>"#,
        );
        click(&rows.query_selector(".js-deletar").unwrap().unwrap());
        settle().await;

        assert_eq!(
            controller.transport().requests(),
            vec!["GET /items/5/deletar/".to_string()]
        );
        assert_eq!(controller.view().content().as_deref(), Some("<p>Confirmar?</p>"));
    }

    #[wasm_bindgen_test]
    async fn test_detail_triggers() {
        let page = page();
        let controller = controller();
        let _bindings = bind_defaults(&page, &controller);
        controller.transport().form_ready("/items/7/editar/", "<p>edit</p>");
        controller.transport().form_ready("/items/7/deletar/", "<p>delete</p>");

        click(&page.find("#detail .js-editar"));
        settle().await;
        assert_eq!(controller.view().content().as_deref(), Some("<p>edit</p>"));

        click(&page.find("#detail .js-deletar"));
        settle().await;
        assert_eq!(controller.view().content().as_deref(), Some("<p>delete</p>"));

        // Exactly one GET per click
        assert_eq!(
            controller.transport().requests(),
            vec![
                "GET /items/7/editar/".to_string(),
                "GET /items/7/deletar/".to_string(),
            ]
        );
    }

    #[wasm_bindgen_test]
    async fn test_direct_create_trigger() {
        let page = page();
        let controller = controller();
        let _bindings = bind_defaults(&page, &controller);
        controller
            .transport()
            .form_ready("/items/novo/", "<form class=\"js-criar-form\"></form>");

        click(&page.find(".js-criar"));
        settle().await;

        assert_eq!(controller.transport().requests(), vec!["GET /items/novo/".to_string()]);
    }

    #[wasm_bindgen_test]
    async fn test_matching_submit_is_intercepted() {
        let page = page();
        let controller = controller();
        let _bindings = bind_defaults(&page, &controller);
        controller
            .transport()
            .reply_ready(json!({"is_valid": 0, "html_form": "<p>errors</p>"}));

        let content = page.find(".modal-content");
        content.set_inner_html(
            r#"<form class="js-criar-form" method="post" action="/items/novo/">
               <input name="nome" value="A"></form>"#,
        );
        let form = content.query_selector("form").unwrap().unwrap();

        assert!(!dispatch_submit(&form), "native submission must be prevented");
        settle().await;

        let requests = controller.transport().requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].starts_with("POST "));
        assert!(requests[0].ends_with("/items/novo/ nome=A"));
        assert_eq!(controller.view().content().as_deref(), Some("<p>errors</p>"));
    }

    #[wasm_bindgen_test]
    async fn test_other_forms_are_left_alone() {
        let page = page();
        let controller = controller();
        let _bindings = bind_defaults(&page, &controller);

        let content = page.find(".modal-content");
        content.set_inner_html(r#"<form class="busca" action="/busca/"></form>"#);
        let form = content.query_selector("form").unwrap().unwrap();

        assert!(dispatch_submit(&form));
        settle().await;
        assert!(controller.transport().requests().is_empty());
    }

    #[wasm_bindgen_test]
    async fn test_unsupported_method_is_still_intercepted() {
        let page = page();
        let controller = controller();
        let _bindings = bind_defaults(&page, &controller);

        let content = page.find(".modal-content");
        content.set_inner_html(
            r#"<form class="js-deletar-form" method="bogus" action="/items/5/"></form>"#,
        );
        let form = content.query_selector("form").unwrap().unwrap();

        assert!(!dispatch_submit(&form));
        assert!(controller.transport().requests().is_empty());
        assert_eq!(
            controller.view().events(),
            vec![ViewEvent::Alerted("Error, tente novamente!".to_string())]
        );
    }

    #[wasm_bindgen_test]
    async fn test_backdrop_click_closes() {
        let page = page();
        let controller = controller();
        let _bindings = bind_defaults(&page, &controller);
        open(&page, &controller).await;

        click(&page.modal);

        assert_eq!(controller.state(), ModalState::Closed);
        assert_eq!(controller.view().events().last(), Some(&ViewEvent::Hidden));
    }

    #[wasm_bindgen_test]
    async fn test_click_inside_dialog_keeps_it_open() {
        let page = page();
        let controller = controller();
        let _bindings = bind_defaults(&page, &controller);
        open(&page, &controller).await;

        click(&page.find(".modal-content"));

        assert_eq!(controller.state(), ModalState::FormShown);
        assert!(!controller.view().events().contains(&ViewEvent::Hidden));
    }

    #[wasm_bindgen_test]
    async fn test_static_backdrop_ignores_clicks() {
        let page = page();
        let controller = controller();
        let config = ControllerConfig {
            close_on_backdrop: false,
            ..ControllerConfig::default()
        };
        let _bindings = bind(&config, &page.modal, controller.clone()).unwrap();
        open(&page, &controller).await;

        click(&page.modal);

        assert_eq!(controller.state(), ModalState::FormShown);
    }

    #[wasm_bindgen_test]
    async fn test_escape_closes_open_modal() {
        let page = page();
        let controller = controller();
        let _bindings = bind_defaults(&page, &controller);
        open(&page, &controller).await;

        press("Enter");
        assert_eq!(controller.state(), ModalState::FormShown);

        press("Escape");
        assert_eq!(controller.state(), ModalState::Closed);
        assert_eq!(controller.view().events().last(), Some(&ViewEvent::Hidden));
    }

    #[wasm_bindgen_test]
    async fn test_escape_on_closed_modal_does_nothing() {
        let page = page();
        let controller = controller();
        let _bindings = bind_defaults(&page, &controller);

        press("Escape");

        assert!(controller.view().events().is_empty());
    }

    #[wasm_bindgen_test]
    async fn test_dropping_bindings_detaches_listeners() {
        let page = page();
        let controller = controller();
        let bindings = bind_defaults(&page, &controller);
        // create button, #tabela and #detail for edit and delete, then submit,
        // dismiss and keydown
        assert_eq!(bindings.len(), 8);
        drop(bindings);

        click(&page.find(".js-criar"));
        click(&page.find("#detail .js-editar"));
        settle().await;
        assert!(controller.view().events().is_empty());
        assert!(controller.transport().requests().is_empty());
    }
}
