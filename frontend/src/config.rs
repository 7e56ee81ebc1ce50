use shared::TriggerKind;
use web_sys::Element;

/// Where the listeners for one trigger kind are attached
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerScope {
    /// Bound to each matching element present at boot
    Direct,
    /// Delegated from these container ids, so rows added later still work
    Delegated(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerBinding {
    pub kind: TriggerKind,
    pub scope: TriggerScope,
}

/// User-facing alert texts
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessages {
    /// Shown when the server answers with something unexpected
    pub unexpected: String,
    /// Shown when the server cannot be reached
    pub network: String,
}

impl Default for AlertMessages {
    fn default() -> Self {
        Self {
            unexpected: "Error, tente novamente!".to_string(),
            network: "Não foi possível contatar o servidor, tente novamente!".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid request timeout {0:?}, expected milliseconds or \"none\"")]
    InvalidTimeout(String),
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Configuration for the modal form controller
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub modal_id: String,
    pub content_selector: String,
    pub triggers: Vec<TriggerBinding>,
    pub request_timeout_ms: Option<u32>,
    pub messages: AlertMessages,
    pub log_endpoint: Option<String>,
    /// Clicking the backdrop around the dialog dismisses it
    pub close_on_backdrop: bool,
    /// Escape dismisses the dialog
    pub close_on_escape: bool,
}

pub const TIMEOUT_ATTR: &str = "data-request-timeout";
pub const ERROR_MESSAGE_ATTR: &str = "data-error-message";
pub const NETWORK_MESSAGE_ATTR: &str = "data-network-error-message";
pub const CONTAINERS_ATTR: &str = "data-trigger-containers";
pub const LOG_ENDPOINT_ATTR: &str = "data-log-endpoint";
/// Bootstrap's option attributes: `data-backdrop="static"`, `data-keyboard="false"`
pub const BACKDROP_ATTR: &str = "data-backdrop";
pub const KEYBOARD_ATTR: &str = "data-keyboard";

impl Default for ControllerConfig {
    fn default() -> Self {
        let containers = vec!["tabela".to_string(), "detail".to_string()];
        Self {
            modal_id: "modal".to_string(),
            content_selector: ".modal-content".to_string(),
            triggers: vec![
                TriggerBinding {
                    kind: TriggerKind::Create,
                    scope: TriggerScope::Direct,
                },
                TriggerBinding {
                    kind: TriggerKind::Edit,
                    scope: TriggerScope::Delegated(containers.clone()),
                },
                TriggerBinding {
                    kind: TriggerKind::Delete,
                    scope: TriggerScope::Delegated(containers),
                },
            ],
            request_timeout_ms: Some(30_000),
            messages: AlertMessages::default(),
            log_endpoint: None,
            close_on_backdrop: true,
            close_on_escape: true,
        }
    }
}

impl ControllerConfig {
    /// Defaults overridden by the `data-*` attributes of the modal element
    pub fn from_element(modal: &Element) -> Result<Self, ConfigError> {
        Self::default().with_overrides(|name| modal.get_attribute(name))
    }

    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(TIMEOUT_ATTR) {
            self.request_timeout_ms = parse_timeout(&raw)?;
        }
        if let Some(message) = lookup(ERROR_MESSAGE_ATTR) {
            self.messages.unexpected = non_empty(message, ERROR_MESSAGE_ATTR)?;
        }
        if let Some(message) = lookup(NETWORK_MESSAGE_ATTR) {
            self.messages.network = non_empty(message, NETWORK_MESSAGE_ATTR)?;
        }
        if let Some(raw) = lookup(CONTAINERS_ATTR) {
            let ids: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
            if ids.is_empty() {
                return Err(ConfigError::Empty(CONTAINERS_ATTR));
            }
            for binding in &mut self.triggers {
                if let TriggerScope::Delegated(containers) = &mut binding.scope {
                    *containers = ids.clone();
                }
            }
        }
        if let Some(endpoint) = lookup(LOG_ENDPOINT_ATTR) {
            self.log_endpoint = Some(non_empty(endpoint, LOG_ENDPOINT_ATTR)?);
        }
        if let Some(raw) = lookup(BACKDROP_ATTR) {
            self.close_on_backdrop = !raw.trim().eq_ignore_ascii_case("static");
        }
        if let Some(raw) = lookup(KEYBOARD_ATTR) {
            self.close_on_escape = !raw.trim().eq_ignore_ascii_case("false");
        }
        Ok(self)
    }

    /// Selector matching every form whose submission is intercepted
    pub fn form_selector(&self) -> String {
        self.triggers
            .iter()
            .map(|binding| binding.kind.form_selector())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn parse_timeout(raw: &str) -> Result<Option<u32>, ConfigError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    match raw.parse::<u32>() {
        Ok(0) => Ok(None),
        Ok(ms) => Ok(Some(ms)),
        Err(_) => Err(ConfigError::InvalidTimeout(raw.to_string())),
    }
}

fn non_empty(value: String, attr: &'static str) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Empty(attr))
    } else {
        Ok(value)
    }
}
