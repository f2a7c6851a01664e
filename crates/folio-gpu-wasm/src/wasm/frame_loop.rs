use std::cell::{Cell, RefCell};
use std::rc::Rc;

use folio_gpu::subscription::Subscription;
use folio_gpu::RendererError;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

use super::dom;

type FrameCallback = Closure<dyn FnMut(f64)>;

/// Calls `tick` once per animation frame until it returns `false` or the
/// returned subscription is disposed.
///
/// Disposing cancels the pending request, so no tick runs afterwards. It is
/// safe to dispose from inside `tick`.
pub(crate) fn start_animation_loop(
    mut tick: impl FnMut(f64) -> bool + 'static,
) -> Result<Subscription, RendererError> {
    let window = dom::window()?;
    let cancelled = Rc::new(Cell::new(false));
    let pending = Rc::new(Cell::new(None::<i32>));
    let slot: Rc<RefCell<Option<FrameCallback>>> = Rc::new(RefCell::new(None));

    let callback = {
        let window = window.clone();
        let cancelled = cancelled.clone();
        let pending = pending.clone();
        let slot = slot.clone();
        Closure::wrap(Box::new(move |timestamp: f64| {
            pending.set(None);
            if cancelled.get() || !tick(timestamp) || cancelled.get() {
                return;
            }
            if let Some(callback) = slot.borrow().as_ref() {
                match window.request_animation_frame(callback.as_ref().unchecked_ref()) {
                    Ok(id) => pending.set(Some(id)),
                    Err(err) => {
                        tracing::warn!("requestAnimationFrame failed: {}", dom::js_error(&err))
                    }
                }
            }
        }) as Box<dyn FnMut(f64)>)
    };

    let first = window
        .request_animation_frame(callback.as_ref().unchecked_ref())
        .map_err(|err| {
            RendererError::Backend(format!(
                "requestAnimationFrame failed: {}",
                dom::js_error(&err)
            ))
        })?;
    pending.set(Some(first));
    *slot.borrow_mut() = Some(callback);

    Ok(Subscription::new("animation frame", move || {
        cancelled.set(true);
        if let Some(id) = pending.take() {
            let _ = window.cancel_animation_frame(id);
        }
        // Breaks the callback's reference to itself. Dropped on a later
        // microtask, since the tick itself may be disposing.
        if let Some(callback) = slot.borrow_mut().take() {
            wasm_bindgen_futures::spawn_local(async move { drop(callback) });
        }
    }))
}
