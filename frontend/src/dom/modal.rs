use anyhow::{anyhow, Context, Result};
use gloo::utils::{body, document, window};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlElement};

use crate::config::ControllerConfig;
use crate::controller::ModalView;
use crate::services::logging::Logger;

const COMPONENT: &str = "modal-view";
const BACKDROP_CLASS: &str = "modal-backdrop";

/// The page's `#modal` element, shown and hidden with Bootstrap's classes
pub struct DomModal {
    modal: HtmlElement,
    content: Element,
}

impl DomModal {
    pub fn from_element(modal: Element, config: &ControllerConfig) -> Result<Self> {
        let content = modal
            .query_selector(&config.content_selector)
            .map_err(js_error)
            .with_context(|| format!("invalid content selector {:?}", config.content_selector))?
            .ok_or_else(|| {
                anyhow!("#{} has no {} region", config.modal_id, config.content_selector)
            })?;
        let modal = modal
            .dyn_into::<HtmlElement>()
            .map_err(|_| anyhow!("#{} is not an HTML element", config.modal_id))?;
        Ok(Self { modal, content })
    }

    pub fn is_open(&self) -> bool {
        self.modal.class_list().contains("show")
    }

    fn try_show(&self) -> Result<(), JsValue> {
        if self.is_open() {
            return Ok(());
        }
        self.modal.style().set_property("display", "block")?;
        self.modal.class_list().add_1("show")?;
        self.modal.remove_attribute("aria-hidden")?;
        self.modal.set_attribute("aria-modal", "true")?;
        body().class_list().add_1("modal-open")?;

        let backdrop = document().create_element("div")?;
        backdrop.set_class_name(&format!("{} fade show", BACKDROP_CLASS));
        body().append_child(&backdrop)?;
        Ok(())
    }

    fn try_hide(&self) -> Result<(), JsValue> {
        self.modal.class_list().remove_1("show")?;
        self.modal.style().set_property("display", "none")?;
        self.modal.set_attribute("aria-hidden", "true")?;
        self.modal.remove_attribute("aria-modal")?;
        body().class_list().remove_1("modal-open")?;

        let backdrops = document().get_elements_by_class_name(BACKDROP_CLASS);
        // Live collection: always remove the first one
        while let Some(backdrop) = backdrops.item(0) {
            backdrop.remove();
        }
        Ok(())
    }
}

impl ModalView for DomModal {
    fn show(&self) {
        if let Err(e) = self.try_show() {
            Logger::warn_with_component(COMPONENT, &format!("could not show modal: {:?}", e));
        }
    }

    fn hide(&self) {
        if let Err(e) = self.try_hide() {
            Logger::warn_with_component(COMPONENT, &format!("could not hide modal: {:?}", e));
        }
    }

    fn replace_content(&self, html: &str) {
        self.content.set_inner_html(html);
    }

    fn reload(&self) {
        if let Err(e) = window().location().reload() {
            Logger::error_with_component(COMPONENT, &format!("reload failed: {:?}", e));
        }
    }

    fn redirect(&self, url: &str) {
        if let Err(e) = window().location().replace(url) {
            Logger::error_with_component(
                COMPONENT,
                &format!("redirect to {} failed: {:?}", url, e),
            );
        }
    }

    fn alert(&self, message: &str) {
        if let Err(e) = window().alert_with_message(message) {
            Logger::error_with_component(COMPONENT, &format!("alert failed: {:?}", e));
        }
    }
}

fn js_error(err: JsValue) -> anyhow::Error {
    anyhow!(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn fixture() -> (Element, DomModal) {
        let modal = document().create_element("div").unwrap();
        modal.set_inner_html(
            r#"<div class="modal-dialog"><div class="modal-content"></div></div>"#,
        );
        body().append_child(&modal).unwrap();
        let view = DomModal::from_element(modal.clone(), &ControllerConfig::default()).unwrap();
        (modal, view)
    }

    #[wasm_bindgen_test]
    fn test_replace_content_is_exact() {
        let (modal, view) = fixture();
        view.replace_content("<p>X</p>");
        let content = modal.query_selector(".modal-content").unwrap().unwrap();
        assert_eq!(content.inner_html(), "<p>X</p>");
        modal.remove();
    }

    #[wasm_bindgen_test]
    fn test_show_and_hide() {
        let (modal, view) = fixture();
        view.show();
        view.show();
        assert!(view.is_open());
        assert!(body().class_list().contains("modal-open"));
        assert_eq!(document().get_elements_by_class_name(BACKDROP_CLASS).length(), 1);

        view.hide();
        assert!(!view.is_open());
        assert_eq!(modal.get_attribute("aria-hidden").as_deref(), Some("true"));
        assert_eq!(document().get_elements_by_class_name(BACKDROP_CLASS).length(), 0);
        modal.remove();
    }

    #[wasm_bindgen_test]
    fn test_missing_content_region_is_an_error() {
        let modal = document().create_element("div").unwrap();
        assert!(DomModal::from_element(modal, &ControllerConfig::default()).is_err());
    }
}
