use folio_gpu::{detect, CapabilityReport, GraphicsEnvironment, RendererError};
use js_sys::{Array, Function, Object, Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlCanvasElement, WebGl2RenderingContext, WebGlRenderingContext, WebglLoseContext};

use super::{dom, options, telemetry};

/// Value a probe timeout resolves with, distinguishable from a real adapter.
const PROBE_TIMEOUT_MARKER: &str = "folio:probe-timeout";

/// Probes the real browser: `navigator.gpu` for WebGPU and throwaway canvases
/// for the WebGL tiers.
#[derive(Debug, Clone, Default)]
pub(crate) struct BrowserEnvironment {
    probe_timeout_ms: Option<u32>,
}

impl BrowserEnvironment {
    pub(crate) fn new(probe_timeout_ms: Option<u32>) -> Self {
        Self { probe_timeout_ms }
    }

    async fn settle(&self, promise: Promise) -> Result<JsValue, RendererError> {
        let promise = match self.probe_timeout_ms {
            Some(ms) => Promise::race(&Array::of2(&promise, &timeout_promise(ms)?)),
            None => promise,
        };
        let value = JsFuture::from(promise)
            .await
            .map_err(|err| RendererError::Backend(dom::js_error(&err)))?;
        if value.as_string().as_deref() == Some(PROBE_TIMEOUT_MARKER) {
            return Err(RendererError::Backend(format!(
                "WebGPU probe still pending after {}ms",
                self.probe_timeout_ms.unwrap_or_default()
            )));
        }
        Ok(value)
    }
}

impl GraphicsEnvironment for BrowserEnvironment {
    async fn probe_webgpu(&self) -> Result<(), RendererError> {
        let navigator = dom::window()?.navigator();
        let gpu = Reflect::get(&navigator, &JsValue::from_str("gpu")).unwrap_or(JsValue::UNDEFINED);
        if gpu.is_undefined() || gpu.is_null() {
            return Err(RendererError::ContextUnavailable("navigator.gpu"));
        }

        let adapter = self.settle(call_method(&gpu, "requestAdapter")?).await?;
        if adapter.is_undefined() || adapter.is_null() {
            return Err(RendererError::ContextUnavailable("GPUAdapter"));
        }

        let device = self.settle(call_method(&adapter, "requestDevice")?).await?;
        if device.is_undefined() || device.is_null() {
            return Err(RendererError::NullHandle("GPUDevice"));
        }

        // The probe device is never used for rendering.
        if let Ok(destroy) = Reflect::get(&device, &JsValue::from_str("destroy"))
            .and_then(|f| f.dyn_into::<Function>())
        {
            let _ = destroy.call0(&device);
        }
        Ok(())
    }

    fn probe_webgl2(&self) -> Result<(), RendererError> {
        let canvas = dom::create_canvas(&dom::document()?)?;
        let context = request_context(&canvas, "webgl2")?
            .ok_or(RendererError::ContextUnavailable("webgl2"))?;
        let gl = context
            .dyn_into::<WebGl2RenderingContext>()
            .map_err(|_| RendererError::NullHandle("webgl2"))?;
        release_probe_context(gl.get_extension("WEBGL_lose_context"));
        Ok(())
    }

    fn probe_webgl(&self) -> Result<(), RendererError> {
        let canvas = dom::create_canvas(&dom::document()?)?;
        let context = match request_context(&canvas, "webgl")? {
            Some(context) => context,
            None => request_context(&canvas, "experimental-webgl")?
                .ok_or(RendererError::ContextUnavailable("webgl"))?,
        };
        let gl = context
            .dyn_into::<WebGlRenderingContext>()
            .map_err(|_| RendererError::NullHandle("webgl"))?;
        release_probe_context(gl.get_extension("WEBGL_lose_context"));
        Ok(())
    }
}

fn request_context(canvas: &HtmlCanvasElement, kind: &str) -> Result<Option<Object>, RendererError> {
    canvas.get_context(kind).map_err(|err| {
        RendererError::Backend(format!("getContext({kind}) threw: {}", dom::js_error(&err)))
    })
}

/// Browsers cap live WebGL contexts; hand the probe's back right away.
fn release_probe_context(extension: Result<Option<Object>, JsValue>) {
    if let Ok(Some(extension)) = extension {
        extension.unchecked_into::<WebglLoseContext>().lose_context();
    }
}

fn call_method(target: &JsValue, name: &str) -> Result<Promise, RendererError> {
    let method = Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .and_then(|f| f.dyn_into::<Function>().ok())
        .ok_or_else(|| RendererError::Backend(format!("{name} is not a function")))?;
    method
        .call0(target)
        .map_err(|err| RendererError::Backend(format!("{name} threw: {}", dom::js_error(&err))))?
        .dyn_into::<Promise>()
        .map_err(|_| RendererError::Backend(format!("{name} did not return a promise")))
}

fn timeout_promise(ms: u32) -> Result<Promise, RendererError> {
    let window = dom::window()?;
    let mut scheduled = Ok(0);
    let promise = Promise::new(&mut |resolve, _reject| {
        scheduled = window.set_timeout_with_callback_and_timeout_and_arguments_1(
            &resolve,
            ms.min(i32::MAX as u32) as i32,
            &JsValue::from_str(PROBE_TIMEOUT_MARKER),
        );
    });
    scheduled.map_err(|err| {
        RendererError::Backend(format!("setTimeout failed: {}", dom::js_error(&err)))
    })?;
    Ok(promise)
}

pub(crate) fn report_to_js(report: &CapabilityReport) -> JsValue {
    let obj = Object::new();
    dom::set(&obj, "webgpu", report.supports_tier_a());
    dom::set(&obj, "webgl2", report.supports_tier_b());
    dom::set(&obj, "webgl", report.supports_tier_c());
    dom::set(&obj, "performanceLevel", report.performance_level().as_str());
    obj.into()
}

/// Probes every graphics backend and resolves to
/// `{ webgpu, webgl2, webgl, performanceLevel }`. Re-probes on every call.
#[wasm_bindgen]
pub async fn detect_graphics_capabilities(options: Option<JsValue>) -> Result<JsValue, JsValue> {
    let options = options.unwrap_or(JsValue::UNDEFINED);
    let page =
        options::parse_options(&options).map_err(|err| JsValue::from_str(&err.to_string()))?;
    super::init_logging(page.log_level);

    let env = BrowserEnvironment::new(page.config.probe_timeout_ms);
    let report = detect(&env, &telemetry::stats()).await;
    Ok(report_to_js(&report))
}
