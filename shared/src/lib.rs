use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use url::form_urlencoded;

/// Reply to a GET on a trigger's `data-url`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormFragment {
    /// Server-rendered form markup to inject into the modal body
    pub html_form: String,
}

/// Raw reply to a form submission.
///
/// `is_valid` is kept as a JSON value so that anything the server sends
/// (strings, booleans, a missing field) can be classified instead of failing
/// deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReply {
    #[serde(default)]
    pub is_valid: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_form: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_url: Option<String>,
}

impl SubmissionReply {
    pub const VALIDATION_FAILED: i64 = 0;
    pub const SUCCEEDED: i64 = 1;
    pub const SUCCEEDED_WITH_REDIRECT: i64 = 2;

    /// Reply asking the client to redisplay `html_form` (with its errors)
    pub fn validation_failed(html_form: impl Into<String>) -> Self {
        Self {
            is_valid: Value::from(Self::VALIDATION_FAILED),
            html_form: Some(html_form.into()),
            success_url: None,
        }
    }

    /// Reply asking the client to reload the current page
    pub fn succeeded() -> Self {
        Self {
            is_valid: Value::from(Self::SUCCEEDED),
            html_form: None,
            success_url: None,
        }
    }

    /// Reply asking the client to navigate to `success_url`
    pub fn redirect(success_url: impl Into<String>) -> Self {
        Self {
            is_valid: Value::from(Self::SUCCEEDED_WITH_REDIRECT),
            html_form: None,
            success_url: Some(success_url.into()),
        }
    }

    /// Integer status, if `is_valid` holds one (integral floats included)
    pub fn status(&self) -> Option<i64> {
        self.is_valid.as_i64().or_else(|| {
            self.is_valid
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        })
    }
}

/// What the client should do after a submission
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    /// Server rejected the input; redisplay the returned form
    ValidationFailed { form: String },
    /// Saved; reload the current document
    Succeeded,
    /// Saved; navigate to `url` without adding a history entry
    SucceededWithRedirect { url: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OutcomeError {
    #[error("unexpected is_valid value {0}")]
    UnknownStatus(String),
    #[error("is_valid = 0 without html_form")]
    MissingForm,
    #[error("is_valid = 2 without success_url")]
    MissingRedirect,
}

impl TryFrom<SubmissionReply> for SubmissionOutcome {
    type Error = OutcomeError;

    fn try_from(reply: SubmissionReply) -> Result<Self, Self::Error> {
        match reply.status() {
            Some(SubmissionReply::VALIDATION_FAILED) => reply
                .html_form
                .map(|form| SubmissionOutcome::ValidationFailed { form })
                .ok_or(OutcomeError::MissingForm),
            Some(SubmissionReply::SUCCEEDED) => Ok(SubmissionOutcome::Succeeded),
            Some(SubmissionReply::SUCCEEDED_WITH_REDIRECT) => reply
                .success_url
                .filter(|url| !url.trim().is_empty())
                .map(|url| SubmissionOutcome::SucceededWithRedirect { url })
                .ok_or(OutcomeError::MissingRedirect),
            _ => Err(OutcomeError::UnknownStatus(reply.is_valid.to_string())),
        }
    }
}

impl From<SubmissionOutcome> for SubmissionReply {
    fn from(outcome: SubmissionOutcome) -> Self {
        match outcome {
            SubmissionOutcome::ValidationFailed { form } => {
                SubmissionReply::validation_failed(form)
            }
            SubmissionOutcome::Succeeded => SubmissionReply::succeeded(),
            SubmissionOutcome::SucceededWithRedirect { url } => SubmissionReply::redirect(url),
        }
    }
}

/// The three trigger families; they behave identically and differ only by class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    Create,
    Edit,
    Delete,
}

impl TriggerKind {
    pub const ALL: [TriggerKind; 3] = [TriggerKind::Create, TriggerKind::Edit, TriggerKind::Delete];

    /// CSS class carried by elements that open this kind of form
    pub fn trigger_class(self) -> &'static str {
        match self {
            TriggerKind::Create => "js-criar",
            TriggerKind::Edit => "js-editar",
            TriggerKind::Delete => "js-deletar",
        }
    }

    /// CSS class carried by the form the server returns for this kind
    pub fn form_class(self) -> &'static str {
        match self {
            TriggerKind::Create => "js-criar-form",
            TriggerKind::Edit => "js-editar-form",
            TriggerKind::Delete => "js-deletar-form",
        }
    }

    pub fn trigger_selector(self) -> String {
        format!(".{}", self.trigger_class())
    }

    pub fn form_selector(self) -> String {
        format!(".{}", self.form_class())
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TriggerKind::Create => write!(f, "create"),
            TriggerKind::Edit => write!(f, "edit"),
            TriggerKind::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MethodError {
    #[error("unsupported form method {0:?}")]
    Unsupported(String),
}

impl HttpVerb {
    /// Verb for a form's `method` attribute; absent or blank means GET
    pub fn from_attribute(attribute: Option<&str>) -> Result<Self, MethodError> {
        match attribute.map(str::trim) {
            None | Some("") => Ok(HttpVerb::Get),
            Some(method) => method.parse(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
        }
    }
}

impl FromStr for HttpVerb {
    type Err = MethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpVerb::Get),
            "POST" => Ok(HttpVerb::Post),
            "PUT" => Ok(HttpVerb::Put),
            "PATCH" => Ok(HttpVerb::Patch),
            "DELETE" => Ok(HttpVerb::Delete),
            _ => Err(MethodError::Unsupported(s.to_string())),
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful form controls in document order; repeated names are kept
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `application/x-www-form-urlencoded` encoding (spaces become `+`)
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A form submission ready to go on the wire
#[derive(Debug, Clone, PartialEq)]
pub struct FormRequest {
    pub verb: HttpVerb,
    pub action: String,
    pub fields: FormFields,
}

impl FormRequest {
    pub const CONTENT_TYPE: &'static str = "application/x-www-form-urlencoded; charset=UTF-8";

    pub fn new(verb: HttpVerb, action: impl Into<String>, fields: FormFields) -> Self {
        Self {
            verb,
            action: action.into(),
            fields,
        }
    }

    /// Target URL; GET requests carry the fields in the query string
    pub fn url(&self) -> String {
        let action = self.action.split('#').next().unwrap_or_default();
        if self.verb != HttpVerb::Get || self.fields.is_empty() {
            return action.to_string();
        }
        let separator = if action.contains('?') { '&' } else { '?' };
        format!("{}{}{}", action, separator, self.fields.encode())
    }

    /// Request body; GET requests have none
    pub fn body(&self) -> Option<String> {
        match self.verb {
            HttpVerb::Get => None,
            _ => Some(self.fields.encode()),
        }
    }
}
