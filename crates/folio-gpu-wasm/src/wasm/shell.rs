use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use folio_gpu::frame_monitor::FrameTimingsReport;
use folio_gpu::host::{Notice, NoticeKind, RendererHost, ShellObserver};
use folio_gpu::lifecycle::{AdapterFactory, BoxedAdapter};
use folio_gpu::stats::RendererStats;
use folio_gpu::{detect, CapabilityReport, RendererChoice, RendererConfig, RendererError};
use js_sys::{Function, Object, Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::HtmlElement;

use super::canvas_adapter::CanvasAdapter;
use super::gpu_adapter::GpuAdapter;
use super::probe::{report_to_js, BrowserEnvironment};
use super::{dom, options, telemetry};

const WEBGL_HELP_TEXT: &str = "Your browser does not support WebGL or it has been disabled.

To enable 3D features, please:
\u{2022} Update your browser to the latest version
\u{2022} Enable hardware acceleration in your browser settings
\u{2022} Make sure WebGL is not blocked by extensions
\u{2022} Try using a different browser (Chrome, Firefox, Safari, Edge)

You can still use the 2D version of the portfolio.";

/// Help text for the page's "3D unavailable" view.
#[wasm_bindgen]
pub fn webgl_error_message() -> String {
    WEBGL_HELP_TEXT.to_string()
}

fn to_js(err: RendererError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn busy() -> JsValue {
    JsValue::from_str("PortfolioRenderer is busy; call it again outside renderer callbacks")
}

/// Builds a fresh adapter per mount attempt.
pub(crate) struct WebAdapterFactory {
    stats: Rc<RendererStats>,
    timings: Rc<RefCell<Option<FrameTimingsReport>>>,
}

impl AdapterFactory for WebAdapterFactory {
    type Container = HtmlElement;

    fn create(
        &mut self,
        choice: RendererChoice,
        config: &RendererConfig,
    ) -> Result<BoxedAdapter<HtmlElement>, RendererError> {
        match choice {
            RendererChoice::TierA | RendererChoice::TierB => Ok(Box::new(GpuAdapter::new(
                choice,
                config,
                self.stats.clone(),
                self.timings.clone(),
            ))),
            RendererChoice::TierC => Ok(Box::new(CanvasAdapter::new(config, self.timings.clone()))),
            RendererChoice::Exhausted => Err(RendererError::NoAdapter(choice)),
        }
    }
}

/// Page callbacks. Every key is optional.
#[derive(Default)]
struct JsCallbacks {
    on_capability_resolved: Option<Function>,
    on_renderer_changed: Option<Function>,
    on_exhausted: Option<Function>,
    on_notice: Option<Function>,
    on_section_change: Option<Function>,
}

impl JsCallbacks {
    fn parse(obj: &JsValue) -> Result<Self, RendererError> {
        if obj.is_undefined() || obj.is_null() {
            return Ok(Self::default());
        }
        Ok(Self {
            on_capability_resolved: callback(obj, "onCapabilityResolved")?,
            on_renderer_changed: callback(obj, "onRendererChanged")?,
            on_exhausted: callback(obj, "onExhausted")?,
            on_notice: callback(obj, "onNotice")?,
            on_section_change: callback(obj, "onSectionChange")?,
        })
    }
}

fn callback(obj: &JsValue, key: &str) -> Result<Option<Function>, RendererError> {
    let value = Reflect::get(obj, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED);
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    value
        .dyn_into::<Function>()
        .map(Some)
        .map_err(|_| RendererError::InvalidConfig(format!("{key} must be a function")))
}

fn invoke(callback: &Option<Function>, name: &str, arg: &JsValue) -> Result<(), JsValue> {
    match callback {
        Some(f) => f.call1(&JsValue::NULL, arg).map(|_| ()).map_err(|err| {
            tracing::warn!("{name} callback threw: {}", dom::js_error(&err));
            err
        }),
        None => Ok(()),
    }
}

struct JsShellObserver {
    callbacks: Rc<JsCallbacks>,
}

impl ShellObserver for JsShellObserver {
    fn on_capability_resolved(&self, report: &CapabilityReport) {
        let _ = invoke(
            &self.callbacks.on_capability_resolved,
            "onCapabilityResolved",
            &report_to_js(report),
        );
    }

    fn on_renderer_changed(&self, choice: RendererChoice) {
        let _ = invoke(
            &self.callbacks.on_renderer_changed,
            "onRendererChanged",
            &JsValue::from_str(choice.as_str()),
        );
    }

    fn on_exhausted(&self) {
        let _ = invoke(&self.callbacks.on_exhausted, "onExhausted", &JsValue::UNDEFINED);
    }

    fn on_notice(&self, notice: &Notice) -> Result<(), RendererError> {
        let obj = Object::new();
        dom::set(
            &obj,
            "kind",
            match notice.kind {
                NoticeKind::Demoted => "demoted",
                NoticeKind::Exhausted => "exhausted",
            },
        );
        dom::set(&obj, "renderer", notice.choice.as_str());
        if let Some(phase) = notice.phase {
            dom::set(&obj, "phase", phase.as_str());
        }
        dom::set(&obj, "message", notice.message.as_str());
        invoke(&self.callbacks.on_notice, "onNotice", &obj.into())
            .map_err(|err| RendererError::Backend(dom::js_error(&err)))
    }
}

struct Session {
    host: RendererHost<WebAdapterFactory>,
    env: BrowserEnvironment,
}

impl Session {
    fn flush_events(&mut self) {
        telemetry::record_events(self.host.drain_events());
    }
}

/// Drains adapter signals on a microtask after each hook call, outside of
/// whatever adapter code raised them.
fn install_waker(session: &Rc<RefCell<Session>>) {
    let weak: Weak<RefCell<Session>> = Rc::downgrade(session);
    let scheduled = Rc::new(Cell::new(false));
    let signals = session.borrow().host.signals().clone();
    signals.set_waker(move || {
        if scheduled.replace(true) {
            return;
        }
        let weak = weak.clone();
        let scheduled = scheduled.clone();
        wasm_bindgen_futures::spawn_local(async move {
            scheduled.set(false);
            let Some(session) = weak.upgrade() else {
                return;
            };
            let Ok(mut session) = session.try_borrow_mut() else {
                tracing::debug!("renderer busy; the active call drains pending signals");
                return;
            };
            session.host.pump_signals();
            session.flush_events();
        });
    });
}

/// Renderer selection, mounting and fallback for one page container.
///
/// Page callbacks run synchronously from inside renderer work; calling back
/// into this object from them fails with a "busy" error.
#[wasm_bindgen]
pub struct PortfolioRenderer {
    session: Rc<RefCell<Session>>,
}

#[wasm_bindgen]
impl PortfolioRenderer {
    /// Probes the browser, then mounts the best renderer into `container`.
    ///
    /// Resolves once the first renderer has been mounted (or the chain is
    /// exhausted). Rejects only on invalid options or callbacks.
    pub async fn start(
        container: HtmlElement,
        options: JsValue,
        callbacks: JsValue,
    ) -> Result<PortfolioRenderer, JsValue> {
        let page = options::parse_options(&options).map_err(to_js)?;
        super::init_logging(page.log_level);
        let callbacks = Rc::new(JsCallbacks::parse(&callbacks).map_err(to_js)?);

        let stats = telemetry::stats();
        let factory = WebAdapterFactory {
            stats: stats.clone(),
            timings: telemetry::timings_slot(),
        };
        let navigate: Rc<dyn Fn(usize)> = {
            let callbacks = callbacks.clone();
            Rc::new(move |index: usize| {
                let _ = invoke(
                    &callbacks.on_section_change,
                    "onSectionChange",
                    &JsValue::from_f64(index as f64),
                );
            })
        };
        let observer = Box::new(JsShellObserver { callbacks });
        let env = BrowserEnvironment::new(page.config.probe_timeout_ms);

        let host = RendererHost::new(page.config, factory, container, observer, navigate)
            .map_err(to_js)?
            .with_stats(stats.clone())
            .with_clock(|| dom::now_ms() as u64);
        let session = Rc::new(RefCell::new(Session {
            host,
            env: env.clone(),
        }));
        install_waker(&session);

        let report = detect(&env, &stats).await;
        {
            let mut session = session.try_borrow_mut().map_err(|_| busy())?;
            let choice = session.host.start(report).map_err(to_js)?;
            tracing::info!("renderer started on {}", choice.as_str());
            session.flush_events();
        }
        Ok(PortfolioRenderer { session })
    }

    #[wasm_bindgen(js_name = setActiveSection)]
    pub fn set_active_section(&self, index: u32) -> Result<(), JsValue> {
        let mut session = self.session.try_borrow_mut().map_err(|_| busy())?;
        session
            .host
            .set_active_section(index as usize)
            .map_err(to_js)
    }

    /// Re-probes and restarts the fallback chain from the best tier. Resolves
    /// to the new renderer kind.
    pub fn retry(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            let env = session.try_borrow().map_err(|_| busy())?.env.clone();
            let report = detect(&env, &telemetry::stats()).await;
            let mut session = session.try_borrow_mut().map_err(|_| busy())?;
            let choice = session.host.retry(report).map_err(to_js)?;
            session.flush_events();
            Ok(JsValue::from_str(choice.as_str()))
        })
    }

    /// Unmounts the current renderer. Idempotent.
    pub fn dispose(&self) {
        match self.session.try_borrow_mut() {
            Ok(mut session) => {
                session.host.shutdown();
                session.flush_events();
            }
            Err(_) => {
                // Called from a renderer callback; finish once it returns.
                let session = self.session.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    if let Ok(mut session) = session.try_borrow_mut() {
                        session.host.shutdown();
                        session.flush_events();
                    }
                });
            }
        }
    }

    /// `webgpu`, `webgl`, `canvas`, or `none` once every renderer failed.
    #[wasm_bindgen(getter, js_name = rendererKind)]
    pub fn renderer_kind(&self) -> Result<String, JsValue> {
        let session = self.session.try_borrow().map_err(|_| busy())?;
        Ok(session
            .host
            .current_choice()
            .unwrap_or(RendererChoice::Exhausted)
            .as_str()
            .to_string())
    }

    #[wasm_bindgen(getter)]
    pub fn capabilities(&self) -> Result<JsValue, JsValue> {
        let session = self.session.try_borrow().map_err(|_| busy())?;
        Ok(session
            .host
            .report()
            .map(|report| report_to_js(&report))
            .unwrap_or(JsValue::NULL))
    }

    #[wasm_bindgen(getter, js_name = isExhausted)]
    pub fn is_exhausted(&self) -> Result<bool, JsValue> {
        let session = self.session.try_borrow().map_err(|_| busy())?;
        Ok(session.host.is_exhausted())
    }

    #[wasm_bindgen(getter, js_name = activeSection)]
    pub fn active_section(&self) -> Result<u32, JsValue> {
        let session = self.session.try_borrow().map_err(|_| busy())?;
        Ok(session.host.active_section() as u32)
    }
}
