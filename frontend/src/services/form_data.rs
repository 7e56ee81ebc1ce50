use shared::{FormFields, FormRequest, HttpVerb};
use wasm_bindgen::JsCast;
use web_sys::{FormData, HtmlFormElement};

use crate::error::ModalError;

/// Serialize a live form the way an AJAX form submission does: successful
/// text controls in document order, file inputs and the submitter left out.
pub fn collect_form(form: &HtmlFormElement) -> Result<FormRequest, ModalError> {
    let verb = HttpVerb::from_attribute(form.get_attribute("method").as_deref())?;
    // The `action` property resolves relative paths and falls back to the
    // document URL when the attribute is missing.
    let action = form.action();

    let data = FormData::new_with_form(form).map_err(|e| ModalError::Form(describe(&e)))?;
    let entries = js_sys::try_iter(&data)
        .map_err(|e| ModalError::Form(describe(&e)))?
        .ok_or_else(|| ModalError::Form("FormData is not iterable".to_string()))?;

    let mut fields = FormFields::new();
    for entry in entries {
        let entry: js_sys::Array = entry
            .map_err(|e| ModalError::Form(describe(&e)))?
            .unchecked_into();
        let (Some(name), Some(value)) = (entry.get(0).as_string(), entry.get(1).as_string()) else {
            // File values
            continue;
        };
        fields.push(name, value);
    }

    Ok(FormRequest::new(verb, action, fields))
}

fn describe(err: &wasm_bindgen::JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}
