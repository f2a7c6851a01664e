use std::cell::RefCell;

use folio_gpu::shared_library::SharedLibrarySlot;
use folio_gpu::subscription::Subscription;
use folio_gpu::RendererError;
use js_sys::{Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlScriptElement;

use super::dom;

const ANIMATION_LIBRARY_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/animejs/3.2.1/anime.min.js";
const ANIMATION_LIBRARY_GLOBAL: &str = "anime";

thread_local! {
    static ANIMATION_LIBRARY: RefCell<SharedLibrarySlot<JsValue>> =
        RefCell::new(SharedLibrarySlot::new());
    /// Load shared by callers that arrive while the script is in flight.
    static PENDING: RefCell<Option<Promise>> = const { RefCell::new(None) };
}

fn read_global(name: &str) -> Result<Option<JsValue>, RendererError> {
    let value = Reflect::get(&dom::window()?, &JsValue::from_str(name))
        .map_err(|err| RendererError::ScriptLoad(dom::js_error(&err)))?;
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    Ok(Some(value))
}

/// Inserts the script tag. Returns the element and a promise settling on its
/// load or error event.
fn inject_script(url: &str) -> Result<(HtmlScriptElement, Promise), RendererError> {
    let document = dom::document()?;
    let script = document
        .create_element("script")
        .map_err(|err| RendererError::ScriptLoad(dom::js_error(&err)))?
        .dyn_into::<HtmlScriptElement>()
        .map_err(|_| RendererError::NullHandle("script"))?;
    script.set_src(url);
    script.set_async(true);

    let loaded = {
        let script = script.clone();
        Promise::new(&mut move |resolve, reject| {
            script.set_onload(Some(&resolve));
            script.set_onerror(Some(&reject));
        })
    };

    let head = document.head().ok_or(RendererError::MissingGlobal("document.head"))?;
    head.append_child(&script)
        .map_err(|err| RendererError::ScriptLoad(dom::js_error(&err)))?;
    Ok((script, loaded))
}

/// Resolves to the library object, plus the script element when this call
/// inserted it.
async fn fetch_library(
    url: &str,
    global: &str,
) -> Result<(JsValue, Option<HtmlScriptElement>), RendererError> {
    if let Some(existing) = read_global(global)? {
        tracing::debug!("{global} already present on the page");
        return Ok((existing, None));
    }

    let missing = || RendererError::ScriptLoad(format!("{url} did not define {global}"));

    if let Some(promise) = PENDING.with(|p| p.borrow().clone()) {
        JsFuture::from(promise)
            .await
            .map_err(|err| RendererError::ScriptLoad(dom::js_error(&err)))?;
        return Ok((read_global(global)?.ok_or_else(missing)?, None));
    }

    let (script, loaded) = inject_script(url)?;
    PENDING.with(|p| *p.borrow_mut() = Some(loaded.clone()));
    let result = JsFuture::from(loaded).await;
    PENDING.with(|p| p.borrow_mut().take());
    script.set_onload(None);
    script.set_onerror(None);

    let library = match result {
        Ok(_) => read_global(global)?,
        Err(err) => {
            script.remove();
            return Err(RendererError::ScriptLoad(format!(
                "{url} failed to load: {}",
                dom::js_error(&err)
            )));
        }
    };
    match library {
        Some(library) => Ok((library, Some(script))),
        None => {
            script.remove();
            Err(missing())
        }
    }
}

/// Loads the shared animation library once per page and takes a lease on it.
///
/// Later calls resolve to the same object without another fetch. Pair every
/// successful call with [`release_animation_library`].
#[wasm_bindgen]
pub async fn load_animation_library(
    url: Option<String>,
    global: Option<String>,
) -> Result<JsValue, JsValue> {
    if let Some(handle) = ANIMATION_LIBRARY.with(|slot| slot.borrow_mut().try_reuse()) {
        return Ok(handle);
    }

    let url = url.unwrap_or_else(|| ANIMATION_LIBRARY_URL.to_string());
    let global = global.unwrap_or_else(|| ANIMATION_LIBRARY_GLOBAL.to_string());
    let (handle, script) = fetch_library(&url, &global)
        .await
        .map_err(|err| JsValue::from_str(&err.to_string()))?;

    Ok(ANIMATION_LIBRARY.with(|slot| {
        let mut slot = slot.borrow_mut();
        let first_lease = !slot.is_loaded();
        let handle = slot.install(handle);
        if first_lease {
            tracing::info!("animation library {global} loaded");
        }
        if let Some(script) = script {
            slot.attach(Subscription::new("animation library script", move || {
                script.remove();
            }));
        }
        handle
    }))
}

/// Drops one lease. Returns `true` when it was the last one.
#[wasm_bindgen]
pub fn release_animation_library() -> bool {
    ANIMATION_LIBRARY.with(|slot| slot.borrow_mut().release())
}
