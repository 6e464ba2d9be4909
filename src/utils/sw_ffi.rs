// ============================================================================
// SERVICE WORKER FFI - Foreign Function Interface para el scope del worker
// ============================================================================
// Wrappers para la superficie ServiceWorkerGlobalScope que web-sys no expone
// de forma cómoda - Sin estado, sin lógica
// ============================================================================

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

#[wasm_bindgen]
extern "C" {
    /// El global del service worker (self en el script del worker)
    #[wasm_bindgen(extends = web_sys::EventTarget)]
    pub type WorkerScope;

    #[wasm_bindgen(method, getter)]
    pub fn registration(this: &WorkerScope) -> WorkerRegistration;

    #[wasm_bindgen(method, getter)]
    pub fn clients(this: &WorkerScope) -> WorkerClients;

    #[wasm_bindgen(method, getter)]
    pub fn caches(this: &WorkerScope) -> web_sys::CacheStorage;

    #[wasm_bindgen(method, js_name = skipWaiting)]
    pub fn skip_waiting(this: &WorkerScope) -> js_sys::Promise;

    #[wasm_bindgen(method, js_name = fetch)]
    pub fn fetch_with_request(this: &WorkerScope, request: &web_sys::Request) -> js_sys::Promise;

    pub type WorkerRegistration;

    #[wasm_bindgen(method, js_name = showNotification)]
    pub fn show_notification(
        this: &WorkerRegistration,
        title: &str,
        options: &JsValue,
    ) -> js_sys::Promise;

    pub type WorkerClients;

    #[wasm_bindgen(method)]
    pub fn claim(this: &WorkerClients) -> js_sys::Promise;

    #[wasm_bindgen(method, js_name = matchAll)]
    pub fn match_all(this: &WorkerClients, options: &JsValue) -> js_sys::Promise;

    #[wasm_bindgen(method, js_name = openWindow)]
    pub fn open_window(this: &WorkerClients, url: &str) -> js_sys::Promise;

    /// Cliente de tipo window devuelto por matchAll
    pub type WindowClientHandle;

    #[wasm_bindgen(method, getter)]
    pub fn url(this: &WindowClientHandle) -> String;

    #[wasm_bindgen(method)]
    pub fn focus(this: &WindowClientHandle) -> js_sys::Promise;

    /// Push event con su payload opcional
    #[wasm_bindgen(extends = web_sys::ExtendableEvent)]
    pub type PushEventHandle;

    #[wasm_bindgen(method, getter)]
    pub fn data(this: &PushEventHandle) -> Option<PushPayloadHandle>;

    pub type PushPayloadHandle;

    #[wasm_bindgen(method)]
    pub fn text(this: &PushPayloadHandle) -> String;

    /// Evento de click en notificación; web-sys no expone el getter action
    #[wasm_bindgen(extends = web_sys::ExtendableEvent)]
    pub type NotificationEventHandle;

    #[wasm_bindgen(method, getter)]
    pub fn action(this: &NotificationEventHandle) -> String;

    #[wasm_bindgen(method, getter)]
    pub fn notification(this: &NotificationEventHandle) -> web_sys::Notification;

    /// Evento sync/periodicsync: solo nos interesa el tag
    #[wasm_bindgen(extends = web_sys::ExtendableEvent)]
    pub type TaggedSyncEvent;

    #[wasm_bindgen(method, getter)]
    pub fn tag(this: &TaggedSyncEvent) -> String;

    /// Response con el clone() de JS accesible sin chocar con Clone de Rust
    #[wasm_bindgen(extends = web_sys::Response)]
    pub type CloneableResponse;

    #[wasm_bindgen(method, js_name = clone, catch)]
    pub fn clone_body(this: &CloneableResponse) -> Result<CloneableResponse, JsValue>;
}

/// Obtiene el global scope del worker.
/// Nota: unchecked_into porque WorkerScope es un tipo FFI propio sin
/// constructor JS contra el que hacer instanceof.
pub fn worker_scope() -> WorkerScope {
    js_sys::global().unchecked_into::<WorkerScope>()
}

/// Verifica si el registration soporta Periodic Background Sync
pub fn supports_periodic_sync(registration: &WorkerRegistration) -> bool {
    js_sys::Reflect::has(registration.as_ref(), &JsValue::from_str("periodicSync"))
        .unwrap_or(false)
}
