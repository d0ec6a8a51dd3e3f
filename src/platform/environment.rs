//! Runtime environment detection and default configuration sources.

use std::env;
use std::fmt;
use std::fs;
#[cfg(not(target_arch = "wasm32"))]
use std::path::Path;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::tag_manager::error::{invalid_argument, GtmError};

/// Whether the host application was built for production.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildMode {
    Production,
    Development,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Production => "production",
            BuildMode::Development => "development",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, BuildMode::Production)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = GtmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" | "release" => Ok(BuildMode::Production),
            "development" | "dev" | "debug" | "test" => Ok(BuildMode::Development),
            other => Err(invalid_argument(format!("unknown build mode `{other}`"))),
        }
    }
}

/// Returns the parsed `__GTM_DEFAULTS__` object when available.
fn gtm_defaults() -> Option<Value> {
    defaults_from_env()
        .or_else(defaults_from_path)
        .or_else(defaults_from_global)
}

fn defaults_from_env() -> Option<Value> {
    let raw = env::var("__GTM_DEFAULTS__").ok()?;
    parse_json_value(raw)
}

fn defaults_from_path() -> Option<Value> {
    let path = env::var("__GTM_DEFAULTS_PATH").ok()?;
    let content = fs::read_to_string(path).ok()?;
    parse_json_value(content)
}

#[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
fn defaults_from_global() -> Option<Value> {
    use wasm_bindgen::JsValue;

    let global = js_sys::global();
    let value = js_sys::Reflect::get(&global, &JsValue::from_str("__GTM_DEFAULTS__")).ok()?;
    if value.is_null() || value.is_undefined() {
        return None;
    }
    let serialized = js_sys::JSON::stringify(&value).ok()?.as_string()?;
    serde_json::from_str(&serialized).ok()
}

#[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
fn defaults_from_global() -> Option<Value> {
    None
}

fn parse_json_value(raw: String) -> Option<Value> {
    serde_json::from_str::<Value>(&raw).ok()
}

fn parse_config_source(raw: &str) -> Option<Value> {
    if let Ok(json) = serde_json::from_str::<Value>(raw) {
        if json.is_object() {
            return Some(json);
        }
    }

    if let Some(path) = treat_as_path(raw) {
        if let Ok(contents) = fs::read_to_string(&path) {
            if let Ok(json) = serde_json::from_str::<Value>(&contents) {
                if json.is_object() {
                    return Some(json);
                }
            }
        }
    }

    parse_key_value_config(raw)
}

#[cfg(not(target_arch = "wasm32"))]
fn treat_as_path(raw: &str) -> Option<String> {
    if raw.contains('=') {
        return None;
    }
    let trimmed = raw.trim();
    if Path::new(trimmed).exists() {
        Some(trimmed.to_string())
    } else {
        None
    }
}

#[cfg(target_arch = "wasm32")]
fn treat_as_path(_raw: &str) -> Option<String> {
    None
}

fn parse_key_value_config(raw: &str) -> Option<Value> {
    let mut map = Map::new();
    for entry in raw.split(',') {
        let Some((key, value)) = entry.split_once('=') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }
        map.insert(key.to_string(), Value::String(value.to_string()));
    }
    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

/// Retrieves the default tag manager configuration as a JSON map when available.
///
/// Sources, first hit wins: the `config` member of `__GTM_DEFAULTS__`, then `GTM_CONFIG`
/// (inline JSON, a path to a JSON file, or a `key=value,key=value` list).
pub fn default_gtm_config_json() -> Option<Map<String, Value>> {
    if let Some(defaults) = gtm_defaults() {
        if let Some(config) = defaults.get("config").and_then(Value::as_object) {
            return Some(config.clone());
        }
    }

    let raw = env::var("GTM_CONFIG").ok()?;
    parse_config_source(&raw)?.as_object().cloned()
}

fn defaults_string(key: &str) -> Option<String> {
    gtm_defaults()
        .and_then(|defaults| defaults.get(key).cloned())
        .and_then(|value| match value {
            Value::String(text) => Some(text.to_lowercase()),
            _ => None,
        })
}

fn force_environment() -> Option<String> {
    defaults_string("forceEnvironment")
        .or_else(|| env::var("GTM_FORCE_ENVIRONMENT").ok().map(|v| v.to_lowercase()))
}

/// Returns `true` if the runtime should behave as a browser environment.
pub fn is_browser() -> bool {
    if let Some(forced) = force_environment() {
        return forced == "browser";
    }

    #[cfg(all(target_arch = "wasm32", feature = "wasm-web"))]
    {
        use wasm_bindgen::JsCast;
        js_sys::global().dyn_into::<web_sys::Window>().is_ok()
    }

    #[cfg(not(all(target_arch = "wasm32", feature = "wasm-web")))]
    {
        false
    }
}

/// Resolves the build mode: `GTM_BUILD_MODE`, then `buildMode` in `__GTM_DEFAULTS__`, then
/// `debug_assertions`.
pub fn build_mode() -> BuildMode {
    let explicit = env::var("GTM_BUILD_MODE")
        .ok()
        .or_else(|| defaults_string("buildMode"));
    if let Some(raw) = explicit {
        match raw.parse() {
            Ok(mode) => return mode,
            Err(err) => log::warn!("ignoring build mode override: {err}"),
        }
    }

    if cfg!(debug_assertions) {
        BuildMode::Development
    } else {
        BuildMode::Production
    }
}
