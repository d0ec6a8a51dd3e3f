//! Minimal single-cookie access used by the consent store.
//!
//! Values are percent-encoded the same way `encodeURIComponent` does, so cookies written here can be
//! read back by other scripts on the page and vice versa.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::tag_manager::error::{invalid_argument, GtmResult};

/// Characters left untouched by `encodeURIComponent`.
const COOKIE_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes applied when a cookie is written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieOptions {
    pub expires_in_days: u32,
    pub path: String,
    pub same_site: SameSite,
    pub secure: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            expires_in_days: 365,
            path: "/".to_string(),
            same_site: SameSite::Lax,
            secure: false,
        }
    }
}

impl CookieOptions {
    pub fn with_expiry_days(mut self, days: u32) -> Self {
        self.expires_in_days = days;
        self
    }

    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(i64::from(self.expires_in_days))
    }
}

/// Storage for named cookies, keyed by name. Values passed in and out are decoded.
pub trait CookieJar: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> GtmResult<()>;
    fn remove(&self, name: &str, options: &CookieOptions) -> GtmResult<()>;
}

pub fn encode_cookie_value(value: &str) -> String {
    utf8_percent_encode(value, COOKIE_VALUE).to_string()
}

/// Decodes a cookie value. Malformed UTF-8 sequences are replaced rather than rejected.
pub fn decode_cookie_value(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Builds the `document.cookie` assignment string for `name=value` with the given attributes.
pub fn serialize_cookie(
    name: &str,
    value: &str,
    options: &CookieOptions,
    now: DateTime<Utc>,
) -> GtmResult<String> {
    validate_cookie_name(name)?;
    let expires = options
        .expires_at(now)
        .format("%a, %d %b %Y %H:%M:%S GMT");
    let mut cookie = format!(
        "{name}={}; expires={expires}; path={}; SameSite={}",
        encode_cookie_value(value),
        options.path,
        options.same_site
    );
    if options.secure || options.same_site == SameSite::None {
        cookie.push_str("; Secure");
    }
    Ok(cookie)
}

/// Builds an assignment string that expires `name` immediately.
pub fn serialize_removal(name: &str, options: &CookieOptions) -> GtmResult<String> {
    validate_cookie_name(name)?;
    Ok(format!(
        "{name}=; expires=Thu, 01 Jan 1970 00:00:00 GMT; path={}; SameSite={}",
        options.path, options.same_site
    ))
}

/// Looks `name` up in a `document.cookie` style header (`a=1; b=2`).
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| decode_cookie_value(value))
}

fn validate_cookie_name(name: &str) -> GtmResult<()> {
    let invalid = name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "=;,".contains(c));
    if invalid {
        return Err(invalid_argument(format!("invalid cookie name `{name}`")));
    }
    Ok(())
}

#[derive(Clone, Debug)]
struct StoredCookie {
    value: String,
    options: CookieOptions,
    expires_at: DateTime<Utc>,
}

/// In-process cookie jar with expiry handling. Backs [`MemoryBrowser`](super::MemoryBrowser).
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<BTreeMap<String, StoredCookie>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` verbatim with default attributes, bypassing name validation.
    pub fn insert_raw(&self, name: impl Into<String>, value: impl Into<String>) {
        let options = CookieOptions::default();
        let expires_at = options.expires_at(Utc::now());
        self.cookies.lock().unwrap().insert(
            name.into(),
            StoredCookie {
                value: value.into(),
                options,
                expires_at,
            },
        );
    }

    /// Attributes the cookie was last written with, if it is still live.
    pub fn options(&self, name: &str) -> Option<CookieOptions> {
        self.live(name).map(|cookie| cookie.options)
    }

    pub fn expires_at(&self, name: &str) -> Option<DateTime<Utc>> {
        self.live(name).map(|cookie| cookie.expires_at)
    }

    pub fn clear(&self) {
        self.cookies.lock().unwrap().clear();
    }

    fn live(&self, name: &str) -> Option<StoredCookie> {
        let mut cookies = self.cookies.lock().unwrap();
        match cookies.get(name) {
            Some(cookie) if cookie.expires_at > Utc::now() => Some(cookie.clone()),
            Some(_) => {
                cookies.remove(name);
                None
            }
            None => None,
        }
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.live(name).map(|cookie| cookie.value)
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> GtmResult<()> {
        validate_cookie_name(name)?;
        let expires_at = options.expires_at(Utc::now());
        self.cookies.lock().unwrap().insert(
            name.to_string(),
            StoredCookie {
                value: value.to_string(),
                options: options.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    fn remove(&self, name: &str, _options: &CookieOptions) -> GtmResult<()> {
        validate_cookie_name(name)?;
        self.cookies.lock().unwrap().remove(name);
        Ok(())
    }
}
