use std::cell::RefCell;
use std::rc::Rc;

use folio_gpu::frame_monitor::{FrameTimeMonitor, FrameTimingsReport};
use folio_gpu::lifecycle::{AdapterHooks, AdapterLifecycleState, LifecycleTracker, RendererAdapter};
use folio_gpu::section::{section_color, PanelLayout, SectionFocus};
use folio_gpu::subscription::SubscriptionSet;
use folio_gpu::{RendererChoice, RendererConfig, RendererError};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, Event, HtmlCanvasElement, HtmlElement, MouseEvent};

use super::{dom, frame_loop, listeners};

const BACKGROUND: &str = "#0f172a";
const INACTIVE_ALPHA: f64 = 0.75;

/// Baseline renderer: section panels drawn with the 2D canvas API.
pub(crate) struct CanvasAdapter {
    shared: Rc<RefCell<CanvasState>>,
    timings: Rc<RefCell<Option<FrameTimingsReport>>>,
    mounted: bool,
}

struct CanvasState {
    tracker: LifecycleTracker,
    focus: SectionFocus,
    layout: PanelLayout,
    monitor: FrameTimeMonitor,
    container: Option<HtmlElement>,
    canvas: Option<HtmlCanvasElement>,
    context: Option<CanvasRenderingContext2d>,
    needs_resize: bool,
    dirty: bool,
    subscriptions: SubscriptionSet,
}

impl CanvasAdapter {
    pub(crate) fn new(
        config: &RendererConfig,
        timings: Rc<RefCell<Option<FrameTimingsReport>>>,
    ) -> Self {
        let state = CanvasState {
            tracker: LifecycleTracker::new(),
            focus: SectionFocus::new(0, config.section_count),
            layout: PanelLayout::new(config.section_count),
            monitor: FrameTimeMonitor::new(RendererChoice::TierC, config.slow_frame_ms),
            container: None,
            canvas: None,
            context: None,
            needs_resize: true,
            dirty: true,
            subscriptions: SubscriptionSet::new(),
        };
        Self {
            shared: Rc::new(RefCell::new(state)),
            timings,
            mounted: false,
        }
    }

    fn try_mount(
        &self,
        container: &HtmlElement,
        initial_section: usize,
        hooks: &AdapterHooks,
    ) -> Result<(), RendererError> {
        let canvas = dom::attach_canvas(container)?;
        {
            let mut state = self.shared.borrow_mut();
            state.focus = SectionFocus::new(initial_section, state.layout.section_count());
            state.container = Some(container.clone());
            state.canvas = Some(canvas.clone());
        }

        let context = canvas
            .get_context("2d")
            .map_err(|err| {
                RendererError::Backend(format!("getContext(2d) threw: {}", dom::js_error(&err)))
            })?
            .ok_or(RendererError::NullHandle("2d"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| RendererError::NullHandle("2d"))?;
        self.shared.borrow_mut().context = Some(context);

        let window = dom::window()?;
        let resize = {
            let shared = self.shared.clone();
            listeners::listen(&window, "resize", move |_: Event| {
                shared.borrow_mut().needs_resize = true;
            })?
        };

        let click = {
            let shared = self.shared.clone();
            let hooks = hooks.clone();
            listeners::listen(&canvas, "click", move |event: MouseEvent| {
                let hit = {
                    let state = shared.borrow();
                    state.canvas.as_ref().and_then(|canvas| {
                        let (x, y) = dom::normalized_point(canvas, event.client_x(), event.client_y())?;
                        state.layout.hit_test(x, y, state.focus.target())
                    })
                };
                if let Some(index) = hit {
                    hooks.navigate(index);
                }
            })?
        };

        let context_lost = {
            let shared = self.shared.clone();
            let hooks = hooks.clone();
            listeners::listen(&canvas, "contextlost", move |_: Event| {
                let failed = {
                    let mut state = shared.borrow_mut();
                    let failed = matches!(state.tracker.mark_failed(), Ok(true));
                    if failed {
                        state.release();
                    }
                    failed
                };
                if failed {
                    hooks.fail_runtime(RendererError::ContextLost("contextlost".into()));
                }
            })?
        };

        let frames = {
            let shared = self.shared.clone();
            let timings = self.timings.clone();
            let hooks = hooks.clone();
            frame_loop::start_animation_loop(move |_timestamp| {
                let started = dom::now_ms();
                let first_frame = {
                    let Ok(mut state) = shared.try_borrow_mut() else {
                        return true;
                    };
                    if !state.tracker.is_live() {
                        return false;
                    }
                    state.draw();
                    state.monitor.record(dom::now_ms() - started);
                    *timings.borrow_mut() = state.monitor.report();
                    matches!(state.tracker.mark_running(), Ok(true))
                };
                if first_frame {
                    hooks.first_frame();
                }
                true
            })?
        };

        let mut state = self.shared.borrow_mut();
        state.subscriptions.add(resize);
        state.subscriptions.add(click);
        state.subscriptions.add(context_lost);
        state.subscriptions.add(frames);
        Ok(())
    }
}

impl CanvasState {
    fn release(&mut self) {
        self.subscriptions.dispose_all();
        self.context = None;
        if let Some(canvas) = self.canvas.take() {
            canvas.remove();
        }
        self.container = None;
    }

    fn draw(&mut self) {
        let (Some(canvas), Some(context), Some(container)) =
            (&self.canvas, &self.context, &self.container)
        else {
            return;
        };

        if self.needs_resize {
            self.needs_resize = false;
            let before = (canvas.width(), canvas.height());
            if dom::fit_canvas(canvas, container) != before {
                self.dirty = true;
            }
        }
        if self.focus.take_for_frame().is_some() {
            self.dirty = true;
        }
        if !self.dirty {
            return;
        }
        self.dirty = false;

        let width = canvas.width() as f32;
        let height = canvas.height() as f32;
        context.set_global_alpha(1.0);
        context.set_fill_style(&JsValue::from_str(BACKGROUND));
        context.fill_rect(0.0, 0.0, width as f64, height as f64);

        let active = self.focus.active();
        // Active panel last so its enlarged rect sits on top.
        let order = (0..self.layout.section_count())
            .filter(|&i| i != active)
            .chain(std::iter::once(active));
        for index in order {
            let rect = self.layout.drawn_panel(index, active).to_pixels(width, height);
            let [r, g, b] = section_color(index);
            context.set_global_alpha(if index == active { 1.0 } else { INACTIVE_ALPHA });
            context.set_fill_style(&JsValue::from_str(&format!("rgb({r}, {g}, {b})")));
            context.fill_rect(rect.x as f64, rect.y as f64, rect.width as f64, rect.height as f64);
            if index == active {
                context.set_stroke_style(&JsValue::from_str("#ffffff"));
                context.set_line_width(3.0 * dom::device_pixel_ratio());
                context.stroke_rect(
                    rect.x as f64,
                    rect.y as f64,
                    rect.width as f64,
                    rect.height as f64,
                );
            }
        }
        context.set_global_alpha(1.0);
    }
}

impl RendererAdapter for CanvasAdapter {
    type Container = HtmlElement;

    fn choice(&self) -> RendererChoice {
        RendererChoice::TierC
    }

    fn mount(&mut self, container: &HtmlElement, initial_section: usize, hooks: AdapterHooks) {
        if self.shared.borrow().tracker.is_disposed() {
            hooks.fail_construction(RendererError::MountAfterDispose);
            return;
        }
        if self.mounted {
            hooks.fail_construction(RendererError::AlreadyMounted);
            return;
        }
        self.mounted = true;

        if let Err(err) = self.try_mount(container, initial_section, &hooks) {
            {
                let mut state = self.shared.borrow_mut();
                let _ = state.tracker.mark_failed();
                state.release();
            }
            hooks.fail_construction(err);
        }
    }

    fn set_active_section(&mut self, index: usize) {
        let mut state = self.shared.borrow_mut();
        if state.tracker.is_live() {
            state.focus.request(index);
        }
    }

    fn dispose(&mut self) {
        let mut state = self.shared.borrow_mut();
        if !state.tracker.mark_disposed() {
            return;
        }
        state.release();
    }

    fn lifecycle(&self) -> AdapterLifecycleState {
        self.shared.borrow().tracker.state()
    }
}
