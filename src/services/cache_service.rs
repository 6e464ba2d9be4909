// ============================================================================
// CACHE SERVICE - CICLO DE VIDA DE LA CACHÉ VERSIONADA
// ============================================================================
// Install: precachear el manifest completo como batch todo-o-nada.
// Activate: borrar toda caché cuyo nombre no sea la versión actual y
// reclamar el control de las páginas abiertas.
// ============================================================================

use crate::config::WorkerConfig;
use crate::utils::sw_ffi::WorkerScope;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::Cache;

/// Calcula qué cachés borrar en la activación: todas menos la actual.
/// Invariante: la allow-list tiene exactamente un nombre a la vez.
pub fn caches_to_delete(existing: &[String], current: &str) -> Vec<String> {
    existing
        .iter()
        .filter(|name| name.as_str() != current)
        .cloned()
        .collect()
}

/// Abre la caché de la versión actual
async fn open_current_cache(scope: &WorkerScope, config: &WorkerConfig) -> Result<Cache, String> {
    let promise = scope.caches().open(&config.cache_name());
    let cache = JsFuture::from(promise)
        .await
        .map_err(|e| format!("Error abriendo caché: {:?}", e))?;

    cache
        .dyn_into::<Cache>()
        .map_err(|_| "caches.open no devolvió una Cache".to_string())
}

/// Precachea el manifest completo en la caché actual.
/// addAll es todo-o-nada: cualquier fetch fallido aborta la instalación
/// entera y el reintento queda en manos de la plataforma. No hay caché
/// parcial que recuperar.
pub async fn populate(scope: &WorkerScope, config: &WorkerConfig) -> Result<(), String> {
    let cache = open_current_cache(scope, config).await?;
    log::info!("📦 Caché abierta: {}", config.cache_name());

    let manifest = config.full_manifest();
    let urls = js_sys::Array::new();
    for url in &manifest {
        urls.push(&JsValue::from_str(url));
    }

    JsFuture::from(cache.add_all_with_str_sequence(&urls))
        .await
        .map_err(|e| format!("Error precacheando manifest: {:?}", e))?;

    log::info!("✅ {} recursos precacheados", manifest.len());
    Ok(())
}

/// Poda las cachés obsoletas y reclama los clientes abiertos.
/// Solo después de la poda el worker nuevo empieza a atender requests
/// de las páginas ya abiertas (takeover forzado).
pub async fn prune_and_claim(scope: &WorkerScope, config: &WorkerConfig) -> Result<(), String> {
    let keys = JsFuture::from(scope.caches().keys())
        .await
        .map_err(|e| format!("Error enumerando cachés: {:?}", e))?;

    let existing: Vec<String> = js_sys::Array::from(&keys)
        .iter()
        .filter_map(|name| name.as_string())
        .collect();

    for name in caches_to_delete(&existing, &config.cache_name()) {
        log::info!("🗑️ Borrando caché obsoleta: {}", name);
        let _ = JsFuture::from(scope.caches().delete(&name)).await;
    }

    JsFuture::from(scope.clients().claim())
        .await
        .map_err(|e| format!("Error reclamando clientes: {:?}", e))?;

    log::info!("✅ Worker activado y controlando clientes");
    Ok(())
}

/// Busca un request en la caché actual por match exacto.
/// Devuelve None en cache miss.
pub async fn match_request(
    scope: &WorkerScope,
    config: &WorkerConfig,
    request: &web_sys::Request,
) -> Option<web_sys::Response> {
    let cache = open_current_cache(scope, config).await.ok()?;
    let matched = JsFuture::from(cache.match_with_request(request)).await.ok()?;

    if matched.is_undefined() {
        return None;
    }
    matched.dyn_into::<web_sys::Response>().ok()
}

/// Busca una URL concreta en la caché actual (para los fallbacks offline)
pub async fn match_url(
    scope: &WorkerScope,
    config: &WorkerConfig,
    url: &str,
) -> Option<web_sys::Response> {
    let cache = open_current_cache(scope, config).await.ok()?;
    let matched = JsFuture::from(cache.match_with_str(url)).await.ok()?;

    if matched.is_undefined() {
        return None;
    }
    matched.dyn_into::<web_sys::Response>().ok()
}

/// Guarda una copia de la respuesta bajo su request
pub async fn store_response(
    scope: &WorkerScope,
    config: &WorkerConfig,
    request: &web_sys::Request,
    response: &web_sys::Response,
) -> Result<(), String> {
    let cache = open_current_cache(scope, config).await?;

    JsFuture::from(cache.put_with_request(request, response))
        .await
        .map_err(|e| format!("Error guardando en caché: {:?}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prune_keeps_only_current_version() {
        let existing = vec![
            "ca-final-tracker-v2".to_string(),
            "ca-final-tracker-v3".to_string(),
        ];
        let doomed = caches_to_delete(&existing, "ca-final-tracker-v3");
        assert_eq!(doomed, vec!["ca-final-tracker-v2".to_string()]);
    }

    #[test]
    fn test_prune_deletes_unrelated_names() {
        let existing = vec![
            "otra-app-v1".to_string(),
            "ca-final-tracker-v3".to_string(),
            "ca-final-tracker-v1".to_string(),
        ];
        let doomed = caches_to_delete(&existing, "ca-final-tracker-v3");
        assert_eq!(doomed.len(), 2);
        assert!(!doomed.contains(&"ca-final-tracker-v3".to_string()));
    }

    #[test]
    fn test_prune_noop_when_only_current() {
        let existing = vec!["ca-final-tracker-v3".to_string()];
        assert!(caches_to_delete(&existing, "ca-final-tracker-v3").is_empty());
    }
}
