//! Page options object -> [`RendererConfig`].
//!
//! Every key is optional. Unknown keys are ignored; known keys with a value of
//! the wrong type are rejected rather than silently defaulted.

use folio_gpu::{RendererChoice, RendererConfig, RendererError};
use js_sys::Reflect;
use wasm_bindgen::JsValue;

#[derive(Debug, Clone, PartialEq)]
pub struct PageOptions {
    pub config: RendererConfig,
    pub log_level: tracing::Level,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            config: RendererConfig::default(),
            log_level: tracing::Level::INFO,
        }
    }
}

pub fn parse_options(options: &JsValue) -> Result<PageOptions, RendererError> {
    let mut page = PageOptions::default();
    let config = &mut page.config;

    if let Some(value) = parse_bool(options, "disableWebGpu")? {
        config.disable_webgpu = value;
    }
    if let Some(label) = parse_string(options, "forceRenderer")? {
        let choice = RendererChoice::parse(&label).ok_or_else(|| {
            RendererError::InvalidConfig(format!(
                "forceRenderer must be one of webgpu, webgl, canvas; got {label:?}"
            ))
        })?;
        config.force_renderer = Some(choice);
    }
    if let Some(value) = parse_bool(options, "mountBaselineWithoutGpu")? {
        config.mount_baseline_without_gpu = value;
    }
    if let Some(value) = parse_bool(options, "notifyOnDemotion")? {
        config.notify_on_demotion = value;
    }
    if let Some(count) = parse_count(options, "sectionCount")? {
        config.section_count = count as usize;
    }
    if let Some(ms) = parse_number(options, "slowFrameMs")? {
        config.slow_frame_ms = ms;
    }
    if let Some(ms) = parse_count(options, "probeTimeoutMs")? {
        config.probe_timeout_ms = Some(ms);
    }
    if let Some(level) = parse_string(options, "logLevel")? {
        page.log_level = level.parse().map_err(|_| {
            RendererError::InvalidConfig(format!(
                "logLevel must be one of trace, debug, info, warn, error; got {level:?}"
            ))
        })?;
    }

    page.config.validate()?;
    Ok(page)
}

fn get(obj: &JsValue, key: &str) -> Option<JsValue> {
    if obj.is_undefined() || obj.is_null() {
        return None;
    }
    let value = Reflect::get(obj, &JsValue::from_str(key)).ok()?;
    if value.is_undefined() || value.is_null() {
        return None;
    }
    Some(value)
}

fn wrong_type(key: &str, expected: &str) -> RendererError {
    RendererError::InvalidConfig(format!("{key} must be {expected}"))
}

fn parse_bool(obj: &JsValue, key: &str) -> Result<Option<bool>, RendererError> {
    get(obj, key)
        .map(|value| value.as_bool().ok_or_else(|| wrong_type(key, "a boolean")))
        .transpose()
}

fn parse_string(obj: &JsValue, key: &str) -> Result<Option<String>, RendererError> {
    get(obj, key)
        .map(|value| value.as_string().ok_or_else(|| wrong_type(key, "a string")))
        .transpose()
}

fn parse_number(obj: &JsValue, key: &str) -> Result<Option<f64>, RendererError> {
    get(obj, key)
        .map(|value| value.as_f64().ok_or_else(|| wrong_type(key, "a number")))
        .transpose()
}

/// Non-negative integer that fits in a `u32`.
fn parse_count(obj: &JsValue, key: &str) -> Result<Option<u32>, RendererError> {
    let Some(value) = parse_number(obj, key)? else {
        return Ok(None);
    };
    if value.fract() != 0.0 || !(0.0..=u32::MAX as f64).contains(&value) {
        return Err(wrong_type(key, "a non-negative integer"));
    }
    Ok(Some(value as u32))
}
