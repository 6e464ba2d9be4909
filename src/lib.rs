// ============================================================================
// CA FINAL TRACKER - SERVICE WORKER (RUST PURO + WASM)
// ============================================================================
// Un único punto de entrada registra el set finito de operaciones del
// worker, cada una con su payload tipado:
// - install/activate: ciclo de vida de la caché versionada
// - fetch: interceptor cache-first con fallback a red
// - push/notificationclick: notificaciones de estudio
// - sync/periodicsync/message: entrega del queue pendiente
// ============================================================================

mod config;
mod models;
mod services;
mod utils;

use wasm_bindgen::closure::{Closure, WasmClosure};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::future_to_promise;

use crate::config::CONFIG;
use crate::models::sync::WorkerMessage;
use crate::services::{cache_service, fetch_service, notification_service, sync_service};
use crate::services::fetch_service::FetchDecision;
use crate::services::sync_service::{FlushOutcome, SyncCoordinator};
use crate::utils::sw_ffi::{
    supports_periodic_sync, worker_scope, NotificationEventHandle, PushEventHandle,
    TaggedSyncEvent, WorkerScope,
};

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    // Inicializar panic hook para mejor debugging
    console_error_panic_hook::set_once();

    // Inicializar logging
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("🚀 CA Final Tracker SW - caché {}", CONFIG.cache_name());

    let scope = worker_scope();

    register_install(&scope)?;
    register_activate(&scope)?;
    register_fetch(&scope)?;
    register_push(&scope)?;
    register_notification_click(&scope)?;
    register_sync(&scope, "sync")?;

    // Periodic sync solo en navegadores que lo soportan
    if supports_periodic_sync(&scope.registration()) {
        register_sync(&scope, "periodicsync")?;
    } else {
        log::info!("ℹ️ Periodic sync no soportado en esta plataforma");
    }

    register_message(&scope)?;

    Ok(())
}

/// Registra un listener y mantiene vivo su closure.
/// Nota: closure.forget() es necesario en Rust WASM; los listeners del
/// global scope persisten durante toda la vida del worker y cada uno
/// se registra exactamente una vez aquí.
fn register_listener<T: ?Sized + WasmClosure>(
    scope: &WorkerScope,
    event_name: &str,
    closure: Closure<T>,
) -> Result<(), JsValue> {
    scope.add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn js_err(e: String) -> JsValue {
    JsValue::from_str(&e)
}

/// Install: precachear el manifest completo (todo-o-nada) y pasar a
/// skipWaiting. Un fallo rechaza la promesa y la instalación entera;
/// la plataforma gobierna el reintento.
fn register_install(scope: &WorkerScope) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(move |event: web_sys::ExtendableEvent| {
        let promise = future_to_promise(async move {
            let scope = worker_scope();
            cache_service::populate(&scope, &CONFIG).await.map_err(js_err)?;
            wasm_bindgen_futures::JsFuture::from(scope.skip_waiting()).await?;
            Ok(JsValue::UNDEFINED)
        });
        let _ = event.wait_until(&promise);
    }) as Box<dyn FnMut(web_sys::ExtendableEvent)>);

    register_listener(scope, "install", closure)
}

/// Activate: podar cachés obsoletas y solo después reclamar los clientes
fn register_activate(scope: &WorkerScope) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(move |event: web_sys::ExtendableEvent| {
        let promise = future_to_promise(async move {
            cache_service::prune_and_claim(&worker_scope(), &CONFIG)
                .await
                .map_err(js_err)?;
            Ok(JsValue::UNDEFINED)
        });
        let _ = event.wait_until(&promise);
    }) as Box<dyn FnMut(web_sys::ExtendableEvent)>);

    register_listener(scope, "activate", closure)
}

/// Fetch: la decisión de intercepción es síncrona; si el request pasa de
/// largo no se llama respondWith y el navegador resuelve solo
fn register_fetch(scope: &WorkerScope) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(move |event: web_sys::FetchEvent| {
        let request = event.request();

        let decision = fetch_service::classify_request(&request.method(), &request.url(), &CONFIG);
        if decision == FetchDecision::PassThrough {
            return;
        }

        let promise = future_to_promise(fetch_service::respond(request, CONFIG.clone()));
        let _ = event.respond_with(&promise);
    }) as Box<dyn FnMut(web_sys::FetchEvent)>);

    register_listener(scope, "fetch", closure)
}

/// Push: el payload se captura síncronamente, el resto corre bajo waitUntil
fn register_push(scope: &WorkerScope) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(move |event: PushEventHandle| {
        log::info!("📨 Push event recibido");
        let raw_payload = event.data().map(|data| data.text());

        let promise = future_to_promise(async move {
            notification_service::show_push_notification(raw_payload)
                .await
                .map_err(js_err)?;
            Ok(JsValue::UNDEFINED)
        });
        let _ = event.wait_until(&promise);
    }) as Box<dyn FnMut(PushEventHandle)>);

    register_listener(scope, "push", closure)
}

/// Click de notificación: cerrar siempre, y salvo "dismiss" enfocar o
/// abrir una ventana en la URL guardada en data
fn register_notification_click(scope: &WorkerScope) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(move |event: NotificationEventHandle| {
        let notification = event.notification();
        notification.close();

        let action = event.action();
        let stored_url = js_sys::Reflect::get(&notification.data(), &JsValue::from_str("url"))
            .ok()
            .and_then(|value| value.as_string());

        let promise = future_to_promise(async move {
            notification_service::handle_notification_click(action, stored_url)
                .await
                .map_err(js_err)?;
            Ok(JsValue::UNDEFINED)
        });
        let _ = event.wait_until(&promise);
    }) as Box<dyn FnMut(NotificationEventHandle)>);

    register_listener(scope, "notificationclick", closure)
}

/// Sync y periodic sync comparten la misma rutina de entrega, pero cada
/// tipo de evento atiende exclusivamente su propio tag. El error se
/// propaga en la promesa para que la plataforma reprograme el sync con
/// los registros intactos.
fn register_sync(scope: &WorkerScope, event_name: &str) -> Result<(), JsValue> {
    let expected = match sync_service::expected_tag(event_name, &CONFIG) {
        Some(tag) => tag,
        None => return Ok(()),
    };

    let closure = Closure::wrap(Box::new(move |event: TaggedSyncEvent| {
        let tag = event.tag();
        log::info!("🔄 Sync event: {}", tag);

        if tag != expected {
            return;
        }

        let promise = future_to_promise(async move {
            let delivered = SyncCoordinator::from_config(&CONFIG)
                .flush()
                .await
                .map_err(js_err)?;
            Ok(JsValue::from_f64(delivered as f64))
        });
        let _ = event.wait_until(&promise);
    }) as Box<dyn FnMut(TaggedSyncEvent)>);

    register_listener(scope, event_name, closure)
}

/// Mensajes del foreground: SKIP_WAITING activa el worker en espera,
/// SYNC_NOW dispara una entrega fuera de banda (con backoff manual).
/// Mensajes desconocidos se loguean y se ignoran.
fn register_message(scope: &WorkerScope) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(move |event: web_sys::ExtendableMessageEvent| {
        let data = event.data();
        if data.is_undefined() || data.is_null() {
            return;
        }

        let json = match js_sys::JSON::stringify(&data) {
            Ok(text) => String::from(text),
            Err(_) => return,
        };

        match WorkerMessage::parse(&json) {
            Some(WorkerMessage::SkipWaiting) => {
                log::info!("⏭️ SKIP_WAITING recibido, activando worker en espera");
                let _ = worker_scope().skip_waiting();
            }
            Some(WorkerMessage::SyncNow) => {
                log::info!("🔄 SYNC_NOW recibido desde el foreground");
                let promise = future_to_promise(async move {
                    let outcome = SyncCoordinator::from_config(&CONFIG)
                        .flush_if_due()
                        .await
                        .map_err(js_err)?;

                    // El valor resuelto distingue entrega, queue vacío y
                    // sync diferido por backoff
                    Ok(match outcome {
                        FlushOutcome::Delivered(count) => JsValue::from_f64(count as f64),
                        FlushOutcome::Empty => JsValue::from_f64(0.0),
                        FlushOutcome::Deferred { remaining_secs } => {
                            JsValue::from_str(&format!("deferred:{}s", remaining_secs))
                        }
                    })
                });
                let _ = event.wait_until(&promise);
            }
            None => {
                log::warn!("⚠️ Mensaje desconocido del foreground: {}", json);
            }
        }
    }) as Box<dyn FnMut(web_sys::ExtendableMessageEvent)>);

    register_listener(scope, "message", closure)
}
