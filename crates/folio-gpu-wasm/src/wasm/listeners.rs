use folio_gpu::subscription::Subscription;
use folio_gpu::RendererError;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Event, EventTarget};

use super::dom;

/// `addEventListener` paired with the matching `removeEventListener`.
pub(crate) fn listen<E>(
    target: &EventTarget,
    event: &'static str,
    mut handler: impl FnMut(E) + 'static,
) -> Result<Subscription, RendererError>
where
    E: JsCast + 'static,
{
    let callback = Closure::wrap(Box::new(move |raw: Event| match raw.dyn_into::<E>() {
        Ok(typed) => handler(typed),
        Err(_) => tracing::debug!("ignoring {event} event of an unexpected type"),
    }) as Box<dyn FnMut(Event)>);

    target
        .add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
        .map_err(|err| {
            RendererError::Backend(format!(
                "addEventListener({event}) failed: {}",
                dom::js_error(&err)
            ))
        })?;

    let target = target.clone();
    Ok(Subscription::new(event, move || {
        let _ = target.remove_event_listener_with_callback(event, callback.as_ref().unchecked_ref());
        // The handler may be the one disposing; free it once it has returned.
        wasm_bindgen_futures::spawn_local(async move { drop(callback) });
    }))
}
