//! Browser bindings: one globe per page, mounted onto a canvas by id.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use compute::worker::{ArcWorker, InlineWorker};
use futures_util::future::LocalBoxFuture;
use gpu::renderer::RenderFrame;
use runtime::frame::{FrameRequestId, FrameScheduler};
use runtime::timer::Timer;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{Event, HtmlCanvasElement};

use crate::gpu_backend::GlobeRenderer;
use crate::widget::{self, GlobeWidget, SharedWidget, WidgetEnv, WidgetOptions};

struct Mounted {
    widget: SharedWidget,
    canvas: HtmlCanvasElement,
    on_lost: Closure<dyn FnMut(Event)>,
    on_restored: Closure<dyn FnMut(Event)>,
}

thread_local! {
    static MOUNTED: RefCell<Option<Mounted>> = const { RefCell::new(None) };
    static RENDERER: RefCell<Option<GlobeRenderer>> = const { RefCell::new(None) };
}

fn current_widget() -> Option<SharedWidget> {
    MOUNTED
        .try_with(|m| m.borrow().as_ref().map(|m| m.widget.clone()))
        .ok()
        .flatten()
}

fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

fn draw(shared: &SharedWidget, frame: &RenderFrame) {
    let _ = RENDERER.try_with(|r| {
        if let Some(renderer) = r.borrow_mut().as_mut() {
            if let Err(err) = renderer.draw(frame, shared.borrow().controller()) {
                log(&format!("draw failed: {err:?}"));
            }
        }
    });
}

/// Draws the widget's current frame, if it has one.
fn redraw(shared: &SharedWidget) {
    let frame = shared.borrow().render();
    if let Some(frame) = frame {
        draw(shared, &frame);
    }
}

/// Brings up the wgpu renderer on `canvas`, then draws whatever is current.
/// A newer mount or a context loss in the meantime discards the result.
fn attach_renderer(shared: SharedWidget, canvas: HtmlCanvasElement) {
    spawn_local(async move {
        match GlobeRenderer::from_canvas(canvas).await {
            Ok(renderer) => {
                let still_current = current_widget().is_some_and(|w| Rc::ptr_eq(&w, &shared));
                let context_ok = shared.borrow().host().is_some_and(|h| !h.is_context_lost());
                if !still_current || !context_ok {
                    return;
                }
                let _ = RENDERER.try_with(|r| *r.borrow_mut() = Some(renderer));
                redraw(&shared);
            }
            Err(err) => log(&format!("renderer unavailable: {err:?}")),
        }
    });
}

fn detach_renderer() {
    let _ = RENDERER.try_with(|r| r.borrow_mut().take());
}

/// `setTimeout`-backed delays.
struct JsTimer;

impl Timer for JsTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let ms = duration.as_millis().min(i32::MAX as u128) as i32;
        let promise = js_sys::Promise::new(&mut |resolve, _| {
            if let Some(window) = web_sys::window() {
                let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms);
            }
        });
        Box::pin(async move {
            let _ = JsFuture::from(promise).await;
        })
    }
}

/// `requestAnimationFrame` scheduler; each callback drives one widget frame.
struct RafScheduler;

impl FrameScheduler for RafScheduler {
    fn request_frame(&self) -> FrameRequestId {
        let Some(window) = web_sys::window() else {
            return FrameRequestId(0);
        };
        let callback = Closure::once_into_js(|| {
            if let Some(shared) = current_widget() {
                let frame = shared.borrow_mut().on_animation_frame();
                if let Some(frame) = frame {
                    draw(&shared, &frame);
                }
            }
        });
        let id = window
            .request_animation_frame(callback.unchecked_ref())
            .unwrap_or_default();
        FrameRequestId(id as u64)
    }

    fn cancel_frame(&self, id: FrameRequestId) {
        if let Some(window) = web_sys::window() {
            let _ = window.cancel_animation_frame(id.0 as i32);
        }
    }
}

/// Acquires a WebGL context on a throwaway canvas.
fn webgl_available() -> bool {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return false;
    };
    let Ok(canvas) = document
        .create_element("canvas")
        .and_then(|el| el.dyn_into::<HtmlCanvasElement>().map_err(JsValue::from))
    else {
        return false;
    };
    matches!(canvas.get_context("webgl"), Ok(Some(_)))
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}

/// Mounts the globe onto `canvas_id`. `config_json` and `settings_json` are
/// optional JSON objects; missing fields take their defaults.
/// `boundaries_json` is a country GeoJSON feature collection for the hex
/// overlay; without it the overlay stays empty.
#[wasm_bindgen]
pub fn mount_globe(
    canvas_id: &str,
    config_json: Option<String>,
    settings_json: Option<String>,
    boundaries_json: Option<String>,
) -> Result<(), JsValue> {
    unmount_globe();

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let canvas = document
        .get_element_by_id(canvas_id)
        .ok_or_else(|| JsValue::from_str(&format!("missing {canvas_id}")))?
        .dyn_into::<HtmlCanvasElement>()?;

    let mut options = WidgetOptions::from_json(
        config_json.as_deref(),
        settings_json.as_deref(),
        boundaries_json.as_deref(),
    )
    .map_err(|err| JsValue::from_str(&err.to_string()))?;
    // The browser build has no OS entropy source wired up.
    let seed = *options
        .settings
        .seed
        .get_or_insert_with(|| (js_sys::Math::random() * u64::MAX as f64) as u64);
    options.device_pixel_ratio = window.device_pixel_ratio();
    options.viewport = Some((canvas.client_width() as f64, canvas.client_height() as f64));

    let env = WidgetEnv {
        timer: Arc::new(JsTimer),
        frames: Arc::new(RafScheduler),
        workers: Box::new(move || Ok(Arc::new(InlineWorker::new(Some(seed))) as Arc<dyn ArcWorker>)),
    };
    let shared: SharedWidget = Rc::new(RefCell::new(GlobeWidget::mount(
        options,
        &webgl_available,
        env,
    )));

    let lost_widget = shared.clone();
    let on_lost = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        detach_renderer();
        let loss = lost_widget.borrow_mut().on_context_lost();
        if let Some(loss) = loss {
            if loss.prevent_default {
                event.prevent_default();
            }
            log(&loss.announcement.text);
        }
    });
    let restored_widget = shared.clone();
    let restored_canvas = canvas.clone();
    let on_restored = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
        let shared = restored_widget.clone();
        let canvas = restored_canvas.clone();
        spawn_local(async move {
            if widget::restore(shared.clone()).await {
                log("graphics context restored");
                attach_renderer(shared, canvas);
            }
        });
    });
    canvas.add_event_listener_with_callback("webglcontextlost", on_lost.as_ref().unchecked_ref())?;
    canvas.add_event_listener_with_callback(
        "webglcontextrestored",
        on_restored.as_ref().unchecked_ref(),
    )?;

    MOUNTED.with(|m| {
        *m.borrow_mut() = Some(Mounted {
            widget: shared.clone(),
            canvas: canvas.clone(),
            on_lost,
            on_restored,
        });
    });
    attach_renderer(shared.clone(), canvas);

    log("globe mounted");
    spawn_local(widget::load(shared));
    Ok(())
}

#[wasm_bindgen]
pub fn unmount_globe() {
    let Some(mounted) = MOUNTED.try_with(|m| m.borrow_mut().take()).ok().flatten() else {
        return;
    };
    let _ = mounted.canvas.remove_event_listener_with_callback(
        "webglcontextlost",
        mounted.on_lost.as_ref().unchecked_ref(),
    );
    let _ = mounted.canvas.remove_event_listener_with_callback(
        "webglcontextrestored",
        mounted.on_restored.as_ref().unchecked_ref(),
    );
    detach_renderer();
    mounted.widget.borrow_mut().unmount();
    log("globe unmounted");
}

#[wasm_bindgen]
pub fn retry_globe() {
    if let Some(shared) = current_widget() {
        spawn_local(async move {
            let action = widget::retry(shared).await;
            log(&format!("globe retry: {action:?}"));
        });
    }
}

/// `width` and `height` are CSS pixels; the canvas backing store follows
/// them at the device pixel ratio.
#[wasm_bindgen]
pub fn resize_globe(width: f64, height: f64) {
    let Some(shared) = current_widget() else {
        return;
    };
    shared.borrow_mut().resize(width, height);

    let ratio = web_sys::window().map_or(1.0, |w| w.device_pixel_ratio());
    let (px_width, px_height) = ((width * ratio).round() as u32, (height * ratio).round() as u32);
    let _ = MOUNTED.try_with(|m| {
        if let Some(mounted) = m.borrow().as_ref() {
            mounted.canvas.set_width(px_width);
            mounted.canvas.set_height(px_height);
        }
    });
    let _ = RENDERER.try_with(|r| {
        if let Some(renderer) = r.borrow_mut().as_mut() {
            renderer.resize(px_width, px_height);
        }
    });
    redraw(&shared);
}

/// Current status as JSON (`{"status": "loading", ...}`).
#[wasm_bindgen]
pub fn globe_status() -> String {
    let status = match current_widget() {
        Some(shared) => shared.borrow().status(),
        None => widget::WidgetStatus::Unmounted,
    };
    serde_json::to_string(&status).unwrap_or_else(|_| r#"{"status":"unmounted"}"#.to_string())
}
