use serde::{de::DeserializeOwned, Serialize};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::Storage;

/// Obtiene localStorage desde el global del worker.
/// En un worker no hay window(), así que se resuelve vía Reflect sobre
/// js_sys::global(), igual que el acceso a navigator.onLine en el monitor
/// de red de la app principal.
pub fn get_local_storage() -> Option<Storage> {
    let global = js_sys::global();
    js_sys::Reflect::get(&global, &JsValue::from_str("localStorage"))
        .ok()?
        .dyn_into::<Storage>()
        .ok()
}

pub fn save_to_storage<T: Serialize>(key: &str, value: &T) -> Result<(), String> {
    let storage = get_local_storage().ok_or("No se pudo acceder a localStorage")?;
    let json = serde_json::to_string(value)
        .map_err(|e| format!("Error serializando datos: {}", e))?;
    storage.set_item(key, &json)
        .map_err(|_| "Error guardando en localStorage".to_string())?;
    Ok(())
}

pub fn load_from_storage<T: DeserializeOwned>(key: &str) -> Option<T> {
    let storage = get_local_storage()?;
    let json = storage.get_item(key).ok()??;
    serde_json::from_str(&json).ok()
}

pub fn remove_from_storage(key: &str) -> Result<(), String> {
    let storage = get_local_storage().ok_or("No se pudo acceder a localStorage")?;
    storage.remove_item(key)
        .map_err(|_| "Error eliminando de localStorage".to_string())?;
    Ok(())
}
