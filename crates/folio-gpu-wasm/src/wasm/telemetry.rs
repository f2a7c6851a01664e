use std::cell::RefCell;
use std::rc::Rc;

use folio_gpu::events::{EventLog, RendererEvent};
use folio_gpu::frame_monitor::FrameTimingsReport;
use folio_gpu::stats::RendererStats;
use folio_gpu::DEFAULT_EVENT_LOG_CAPACITY;
use js_sys::{Array, Object};
use wasm_bindgen::prelude::*;

use super::dom;

/// Page-wide counters, events and timings shared by every renderer instance.
struct PageTelemetry {
    stats: Rc<RendererStats>,
    events: RefCell<EventLog>,
    timings: Rc<RefCell<Option<FrameTimingsReport>>>,
}

thread_local! {
    static TELEMETRY: PageTelemetry = PageTelemetry {
        stats: Rc::new(RendererStats::new()),
        events: RefCell::new(EventLog::new(DEFAULT_EVENT_LOG_CAPACITY)),
        timings: Rc::new(RefCell::new(None)),
    };
}

pub(crate) fn stats() -> Rc<RendererStats> {
    TELEMETRY.with(|t| t.stats.clone())
}

/// Slot the mounted adapter publishes its latest frame report into.
pub(crate) fn timings_slot() -> Rc<RefCell<Option<FrameTimingsReport>>> {
    TELEMETRY.with(|t| t.timings.clone())
}

pub(crate) fn record_events(events: Vec<RendererEvent>) {
    if events.is_empty() {
        return;
    }
    TELEMETRY.with(|t| {
        let mut log = t.events.borrow_mut();
        for event in events {
            log.push(event);
        }
    });
}

fn event_to_js(event: &RendererEvent) -> JsValue {
    let obj = Object::new();
    dom::set(&obj, "time_ms", event.time_ms as f64);
    dom::set(&obj, "backend", event.choice.as_str());
    dom::set(&obj, "severity", event.severity.as_str());
    dom::set(&obj, "category", event.category.as_str());
    dom::set(&obj, "message", event.message.as_str());
    if let Some(details) = &event.details {
        let details_obj = Object::new();
        for (key, value) in details {
            dom::set(&details_obj, key, value.as_str());
        }
        dom::set(&obj, "details", details_obj);
    }
    obj.into()
}

fn timings_to_js(report: &FrameTimingsReport) -> JsValue {
    let obj = Object::new();
    dom::set(&obj, "frame_index", report.frame_index as f64);
    dom::set(&obj, "backend", report.backend.as_str());
    dom::set(&obj, "last_frame_ms", report.last_frame_ms);
    dom::set(&obj, "average_frame_ms", report.average_frame_ms);
    dom::set(&obj, "slow_frames", report.slow_frames as f64);
    obj.into()
}

/// Renderer counters as a plain object of numbers.
#[wasm_bindgen]
pub fn get_renderer_stats() -> JsValue {
    let snapshot = stats().snapshot();
    let obj = Object::new();
    for (key, value) in snapshot.entries() {
        dom::set(&obj, key, value as f64);
    }
    obj.into()
}

/// Removes and returns every buffered renderer event, oldest first.
#[wasm_bindgen]
pub fn drain_renderer_events() -> Array {
    let events = TELEMETRY.with(|t| t.events.borrow_mut().drain());
    events.iter().map(event_to_js).collect()
}

/// Latest frame timing report of the mounted renderer, or `null`.
#[wasm_bindgen]
pub fn get_frame_timings() -> JsValue {
    match timings_slot().borrow().as_ref() {
        Some(report) => timings_to_js(report),
        None => JsValue::NULL,
    }
}
