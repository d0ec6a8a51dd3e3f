//! `web-sys` backed browser context for `wasm32` builds with the `wasm-web` feature.

use serde_json::Value;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};

use super::cookies::{find_cookie, serialize_cookie, serialize_removal, CookieJar, CookieOptions};
use super::{BrowserContext, LoaderScript, PageLocation, ScriptLoadCallback};
use crate::tag_manager::error::{internal_error, GtmResult};

#[derive(Clone, Copy, Debug, Default)]
pub struct WebBrowser {
    cookies: WebCookieJar,
}

impl WebBrowser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BrowserContext for WebBrowser {
    fn location(&self) -> PageLocation {
        let location = web_sys::window().map(|window| window.location());
        let read = |f: fn(&web_sys::Location) -> Result<String, JsValue>| {
            location
                .as_ref()
                .and_then(|loc| f(loc).ok())
                .unwrap_or_default()
        };
        PageLocation {
            href: read(web_sys::Location::href),
            pathname: read(web_sys::Location::pathname),
            search: read(web_sys::Location::search),
        }
    }

    fn document_title(&self) -> String {
        document().map(|doc| doc.title()).unwrap_or_default()
    }

    fn push_data_layer(&self, data_layer: &str, entry: Value) {
        let result = data_layer_array(data_layer).and_then(|array| {
            array.push(&to_js(&entry)?);
            Ok(())
        });
        if let Err(err) = result {
            log::warn!("failed to push to {data_layer}: {err}");
        }
    }

    fn gtag(&self, data_layer: &str, args: Vec<Value>) {
        let result = gtag_function(data_layer).and_then(|gtag| {
            let js_args = js_sys::Array::new();
            for arg in &args {
                js_args.push(&to_js(arg)?);
            }
            gtag.apply(&JsValue::NULL, &js_args)
                .map_err(|err| internal_error(format!("gtag() threw: {err:?}")))?;
            Ok(())
        });
        if let Err(err) = result {
            log::warn!("gtag call failed: {err}");
        }
    }

    fn cookies(&self) -> &dyn CookieJar {
        &self.cookies
    }

    fn inject_script(&self, script: LoaderScript, on_load: ScriptLoadCallback) -> GtmResult<()> {
        let document = document().ok_or_else(|| internal_error("Document not available"))?;
        if document.get_element_by_id(&script.id).is_some() {
            on_load();
            return Ok(());
        }

        let element = document
            .create_element("script")
            .map_err(|err| internal_error(format!("Failed to create script: {err:?}")))?
            .dyn_into::<web_sys::HtmlScriptElement>()
            .map_err(|_| internal_error("Script element has wrong type"))?;
        element.set_id(&script.id);
        element.set_async(script.is_async);
        element.set_src(&script.src);
        if let Some(nonce) = &script.nonce {
            element
                .set_attribute("nonce", nonce)
                .map_err(|err| internal_error(format!("Failed to set nonce: {err:?}")))?;
        }

        let onload = Closure::once_into_js(move || on_load());
        element.set_onload(Some(onload.unchecked_ref()));

        let src = script.src.clone();
        let onerror = Closure::<dyn FnMut()>::new(move || {
            log::warn!("failed to load tag manager script: {src}");
        });
        element.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onerror.forget();

        if let Some(head) = document.head() {
            head.append_child(&element)
                .map_err(|err| internal_error(format!("Failed to append script to <head>: {err:?}")))?;
        } else if let Some(body) = document.body() {
            body.append_child(&element)
                .map_err(|err| internal_error(format!("Failed to append script to <body>: {err:?}")))?;
        } else {
            return Err(internal_error("No <head> or <body> element found"));
        }
        Ok(())
    }
}

/// Cookie access through `document.cookie`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WebCookieJar;

impl CookieJar for WebCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        let header = html_document()?.cookie().ok()?;
        find_cookie(&header, name)
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) -> GtmResult<()> {
        let cookie = serialize_cookie(name, value, options, chrono::Utc::now())?;
        write_cookie(&cookie)
    }

    fn remove(&self, name: &str, options: &CookieOptions) -> GtmResult<()> {
        write_cookie(&serialize_removal(name, options)?)
    }
}

fn write_cookie(cookie: &str) -> GtmResult<()> {
    html_document()
        .ok_or_else(|| internal_error("Document not available"))?
        .set_cookie(cookie)
        .map_err(|err| internal_error(format!("Failed to write cookie: {err:?}")))
}

fn document() -> Option<web_sys::Document> {
    web_sys::window().and_then(|window| window.document())
}

fn html_document() -> Option<web_sys::HtmlDocument> {
    document().and_then(|doc| doc.dyn_into::<web_sys::HtmlDocument>().ok())
}

fn data_layer_array(name: &str) -> GtmResult<js_sys::Array> {
    let window = web_sys::window().ok_or_else(|| internal_error("Window not available"))?;
    let key = JsValue::from_str(name);
    let existing = js_sys::Reflect::get(&window, &key)
        .map_err(|err| internal_error(format!("Failed to read {name}: {err:?}")))?;
    if js_sys::Array::is_array(&existing) {
        return Ok(existing.unchecked_into());
    }
    let array = js_sys::Array::new();
    js_sys::Reflect::set(&window, &key, &array)
        .map_err(|err| internal_error(format!("Failed to create {name}: {err:?}")))?;
    Ok(array)
}

fn gtag_function(data_layer: &str) -> GtmResult<js_sys::Function> {
    let window = web_sys::window().ok_or_else(|| internal_error("Window not available"))?;
    let key = JsValue::from_str("gtag");
    let existing = js_sys::Reflect::get(&window, &key)
        .map_err(|err| internal_error(format!("Failed to read gtag: {err:?}")))?;
    if let Some(function) = existing.dyn_ref::<js_sys::Function>() {
        return Ok(function.clone());
    }

    let name = serde_json::to_string(data_layer)
        .map_err(|err| internal_error(format!("Invalid data layer name: {err}")))?;
    let shim = js_sys::Function::new_no_args(&format!(
        "var w = window; w[{name}] = w[{name}] || []; w[{name}].push(arguments);"
    ));
    js_sys::Reflect::set(&window, &key, &shim)
        .map_err(|err| internal_error(format!("Failed to install gtag: {err:?}")))?;
    Ok(shim)
}

fn to_js(value: &Value) -> GtmResult<JsValue> {
    let encoded = serde_json::to_string(value)
        .map_err(|err| internal_error(format!("Failed to encode data layer entry: {err}")))?;
    js_sys::JSON::parse(&encoded)
        .map_err(|err| internal_error(format!("Failed to decode data layer entry: {err:?}")))
}
