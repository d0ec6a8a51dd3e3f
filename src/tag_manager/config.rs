use serde_json::{Map, Value};
use url::Url;

use crate::consent::constants::{COOKIE_EXPIRY_DAYS, COOKIE_NAME};
use crate::consent::{ConsentMode, ConsentSettings, ConsentType, PartialConsent};
use crate::platform::browser::CookieOptions;
use crate::platform::environment::{default_gtm_config_json, BuildMode};
use crate::tag_manager::constants::{DEFAULT_DATA_LAYER_NAME, GTM_NOSCRIPT_URL, GTM_SCRIPT_URL};
use crate::tag_manager::error::{internal_error, invalid_argument, GtmResult};

/// How a consent update reaches the container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConsentUpdateMode {
    /// Only `gtag('consent', 'update', ...)`. GTM derives its own consent event from it.
    #[default]
    DirectiveOnly,
    /// The directive plus a `consent_update` data layer event for triggers keyed on it.
    DirectiveAndEvent,
}

impl ConsentUpdateMode {
    fn parse(raw: &str) -> GtmResult<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "directive" | "directive_only" => Ok(ConsentUpdateMode::DirectiveOnly),
            "directive_and_event" | "both" => Ok(ConsentUpdateMode::DirectiveAndEvent),
            other => Err(invalid_argument(format!(
                "unknown consent update mode `{other}`"
            ))),
        }
    }
}

/// Provider configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GtmConfig {
    pub gtm_id: String,
    pub debug: bool,
    pub enable_in_development: bool,
    pub default_consent: ConsentSettings,
    pub nonce: Option<String>,
    pub cookie_name: String,
    pub cookie_expiry_days: u32,
    pub data_layer_name: String,
    pub consent_update_mode: ConsentUpdateMode,
}

impl GtmConfig {
    pub fn new(gtm_id: impl Into<String>) -> Self {
        Self {
            gtm_id: gtm_id.into().trim().to_string(),
            debug: false,
            enable_in_development: false,
            default_consent: ConsentSettings::default(),
            nonce: None,
            cookie_name: COOKIE_NAME.to_string(),
            cookie_expiry_days: COOKIE_EXPIRY_DAYS,
            data_layer_name: DEFAULT_DATA_LAYER_NAME.to_string(),
            consent_update_mode: ConsentUpdateMode::default(),
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_enable_in_development(mut self, enabled: bool) -> Self {
        self.enable_in_development = enabled;
        self
    }

    pub fn with_default_consent(mut self, consent: ConsentSettings) -> Self {
        self.default_consent = consent;
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn with_cookie_expiry_days(mut self, days: u32) -> Self {
        self.cookie_expiry_days = days;
        self
    }

    pub fn with_data_layer_name(mut self, name: impl Into<String>) -> Self {
        self.data_layer_name = name.into();
        self
    }

    pub fn with_consent_update_mode(mut self, mode: ConsentUpdateMode) -> Self {
        self.consent_update_mode = mode;
        self
    }

    pub fn validate(&self) -> GtmResult<()> {
        if self.gtm_id.trim().is_empty() {
            return Err(invalid_argument("gtm_id must not be empty"));
        }
        if self.cookie_name.trim().is_empty() {
            return Err(invalid_argument("cookie_name must not be empty"));
        }
        if self.cookie_expiry_days == 0 {
            return Err(invalid_argument("cookie_expiry_days must be at least 1"));
        }
        if self.data_layer_name.trim().is_empty() {
            return Err(invalid_argument("data_layer_name must not be empty"));
        }
        Ok(())
    }

    /// Tag manager runs in production builds, or in development when explicitly enabled.
    pub fn should_load(&self, mode: BuildMode) -> bool {
        mode.is_production() || self.enable_in_development
    }

    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions::default().with_expiry_days(self.cookie_expiry_days)
    }

    /// `gtm.js` URL for this container, with `l=` when a custom data layer name is used.
    pub fn loader_script_url(&self) -> GtmResult<String> {
        let mut params = vec![("id", self.gtm_id.as_str())];
        if self.data_layer_name != DEFAULT_DATA_LAYER_NAME {
            params.push(("l", self.data_layer_name.as_str()));
        }
        Url::parse_with_params(GTM_SCRIPT_URL, &params)
            .map(String::from)
            .map_err(|err| internal_error(format!("failed to build loader URL: {err}")))
    }

    pub fn noscript_url(&self) -> GtmResult<String> {
        Url::parse_with_params(GTM_NOSCRIPT_URL, &[("id", self.gtm_id.as_str())])
            .map(String::from)
            .map_err(|err| internal_error(format!("failed to build noscript URL: {err}")))
    }

    /// Builds a config from a JSON object using either camelCase or snake_case keys.
    /// Values supplied as strings (from `key=value` lists) are coerced.
    pub fn from_json_map(map: &Map<String, Value>) -> GtmResult<Self> {
        let gtm_id = string_field(map, &["gtmId", "gtm_id", "id"])
            .ok_or_else(|| invalid_argument("configuration is missing `gtmId`"))?;
        let mut config = GtmConfig::new(gtm_id);

        if let Some(debug) = bool_field(map, &["debug"])? {
            config.debug = debug;
        }
        if let Some(enabled) = bool_field(map, &["enableInDevelopment", "enable_in_development"])? {
            config.enable_in_development = enabled;
        }
        config.nonce = string_field(map, &["nonce"]);
        if let Some(name) = string_field(map, &["cookieName", "cookie_name"]) {
            config.cookie_name = name;
        }
        if let Some(days) = u32_field(map, &["cookieExpiry", "cookie_expiry", "cookieExpiryDays"])? {
            config.cookie_expiry_days = days;
        }
        if let Some(name) = string_field(map, &["dataLayerName", "data_layer_name", "dataLayer"]) {
            config.data_layer_name = name;
        }
        if let Some(mode) = string_field(map, &["consentUpdateMode", "consent_update_mode"]) {
            config.consent_update_mode = ConsentUpdateMode::parse(&mode)?;
        }
        if let Some(value) = field(map, &["defaultConsent", "default_consent"]) {
            config.default_consent = ConsentSettings::default().merge(&parse_partial(value)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration from the environment sources described in
    /// [`default_gtm_config_json`]. Returns `Ok(None)` when no source is present.
    pub fn from_env() -> GtmResult<Option<Self>> {
        match default_gtm_config_json() {
            Some(map) => Self::from_json_map(&map).map(Some),
            None => Ok(None),
        }
    }
}

fn field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| map.get(*key))
}

fn string_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    field(map, keys)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn bool_field(map: &Map<String, Value>, keys: &[&str]) -> GtmResult<Option<bool>> {
    match field(map, keys) {
        None => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            other => Err(invalid_argument(format!("expected a boolean, got `{other}`"))),
        },
        Some(other) => Err(invalid_argument(format!("expected a boolean, got {other}"))),
    }
}

fn u32_field(map: &Map<String, Value>, keys: &[&str]) -> GtmResult<Option<u32>> {
    let parsed = match field(map, keys) {
        None => return Ok(None),
        Some(Value::Number(number)) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(text)) => text.trim().parse().ok(),
        Some(_) => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| invalid_argument("expected a positive whole number of days"))
}

fn parse_partial(value: &Value) -> GtmResult<PartialConsent> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid_argument("defaultConsent must be an object"))?;
    object
        .iter()
        .map(|(key, mode)| -> GtmResult<(ConsentType, ConsentMode)> {
            let ty: ConsentType = key.parse()?;
            let mode: ConsentMode = mode
                .as_str()
                .ok_or_else(|| invalid_argument(format!("consent mode for `{key}` must be a string")))?
                .parse()?;
            Ok((ty, mode))
        })
        .collect()
}
