// ============================================================================
// NOTIFICATION SERVICE - PUSH Y CLICKS DE NOTIFICACIÓN
// ============================================================================
// Un push muestra una notificación persistente con acciones open/dismiss.
// Un click la cierra y, salvo "dismiss", enfoca una ventana abierta o abre
// una nueva en la URL guardada.
// ============================================================================

use crate::models::push::{resolve_click, resolve_push_payload, ClickOutcome, NotificationContent};
use crate::utils::sw_ffi::{worker_scope, WindowClientHandle};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

/// Construye el objeto de opciones de showNotification.
/// requireInteraction fuerza que la notificación persista hasta que el
/// usuario actúe; data lleva la URL destino y el timestamp de captura.
fn build_options(content: &NotificationContent) -> Result<JsValue, String> {
    let options = serde_json::json!({
        "body": content.body,
        "icon": content.icon,
        "badge": content.badge,
        "tag": content.tag,
        "data": {
            "url": content.url,
            "timestamp": chrono::Utc::now().timestamp_millis(),
        },
        "actions": [
            { "action": "open", "title": "Open App" },
            { "action": "dismiss", "title": "Dismiss" },
        ],
        "requireInteraction": true,
        "silent": false,
    });

    js_sys::JSON::parse(&options.to_string())
        .map_err(|e| format!("Error construyendo opciones: {:?}", e))
}

/// Muestra la notificación resuelta de un push event
pub async fn show_push_notification(raw_payload: Option<String>) -> Result<(), String> {
    let content = resolve_push_payload(raw_payload);
    log::info!("🔔 Mostrando notificación: {}", content.title);

    let options = build_options(&content)?;
    let scope = worker_scope();

    JsFuture::from(scope.registration().show_notification(&content.title, &options))
        .await
        .map_err(|e| format!("Error mostrando notificación: {:?}", e))?;

    Ok(())
}

/// Maneja el click sobre una notificación ya cerrada.
/// Política de desempate: gana el primer cliente window que matchee "/",
/// sin ranking de recencia.
pub async fn handle_notification_click(action: String, stored_url: Option<String>) -> Result<(), String> {
    let url = match resolve_click(&action, stored_url) {
        ClickOutcome::Dismiss => {
            log::info!("🔕 Notificación descartada");
            return Ok(());
        }
        ClickOutcome::Open { url } => url,
    };

    let scope = worker_scope();
    let query = js_sys::JSON::parse(r#"{"type":"window","includeUncontrolled":true}"#)
        .map_err(|e| format!("Error construyendo query de clientes: {:?}", e))?;

    let client_list = JsFuture::from(scope.clients().match_all(&query))
        .await
        .map_err(|e| format!("Error enumerando clientes: {:?}", e))?;

    for client in js_sys::Array::from(&client_list).iter() {
        let has_focus = js_sys::Reflect::has(&client, &JsValue::from_str("focus"))
            .unwrap_or(false);
        let handle = client.unchecked_into::<WindowClientHandle>();

        if handle.url().contains('/') && has_focus {
            log::info!("🪟 Enfocando ventana ya abierta");
            let _ = JsFuture::from(handle.focus()).await;
            return Ok(());
        }
    }

    log::info!("🪟 Sin ventanas abiertas, abriendo {}", url);
    JsFuture::from(scope.clients().open_window(&url))
        .await
        .map_err(|e| format!("Error abriendo ventana: {:?}", e))?;

    Ok(())
}
