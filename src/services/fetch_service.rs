// ============================================================================
// FETCH SERVICE - INTERCEPTOR CACHE-FIRST CON FALLBACK A RED
// ============================================================================
// Solo se interceptan GETs; el host del proveedor de IA nunca se toca.
// Cache hit -> respuesta guardada tal cual. Miss -> red, y si la respuesta
// es 200 "basic" se guarda un clon antes de devolverla (el body solo se
// puede leer una vez, así que caller y caché consumen clones independientes).
// ============================================================================

use crate::config::WorkerConfig;
use crate::services::cache_service;
use crate::utils::sw_ffi::{worker_scope, CloneableResponse};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, Response, ResponseType};

/// Decisión de intercepción para un request entrante
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchDecision {
    /// No interceptar: el navegador resuelve solo
    PassThrough,
    /// Aplicar la política cache-first
    Intercept,
}

/// Fallback offline cuando la red falla y no hay entrada en caché
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfflineFallback {
    /// Requests que aceptan HTML reciben el documento raíz cacheado
    RootDocument,
    /// El bundle de iconos recibe la webfont sólida cacheada
    IconFont,
    /// Todo lo demás propaga el rechazo sin sustituto
    None,
}

/// Política de intercepción: solo GET, y nunca los hosts excluidos
pub fn classify_request(method: &str, url: &str, config: &WorkerConfig) -> FetchDecision {
    if method != "GET" {
        return FetchDecision::PassThrough;
    }
    if config.is_excluded_url(url) {
        return FetchDecision::PassThrough;
    }
    FetchDecision::Intercept
}

/// Solo se cachean respuestas 200 de tipo "basic" (same-origin, no opacas)
/// y nunca las de hosts excluidos
pub fn is_cacheable(status: u16, kind: ResponseType, url: &str, config: &WorkerConfig) -> bool {
    status == 200 && kind == ResponseType::Basic && !config.is_excluded_url(url)
}

/// Tabla de fallbacks offline: HTML -> documento raíz, bundle de iconos
/// -> webfont cacheada, resto sin sustituto (gap conocido del diseño)
pub fn fallback_for(accept: Option<&str>, url: &str, config: &WorkerConfig) -> OfflineFallback {
    if accept.map_or(false, |value| value.contains("text/html")) {
        return OfflineFallback::RootDocument;
    }
    if url.contains(config.font_bundle_marker.as_str()) {
        return OfflineFallback::IconFont;
    }
    OfflineFallback::None
}

/// Resuelve un GET interceptado: caché primero, red después,
/// fallback offline al final
pub async fn respond(request: Request, config: WorkerConfig) -> Result<JsValue, JsValue> {
    let scope = worker_scope();

    // Cache hit: devolver la respuesta guardada tal cual
    if let Some(cached) = cache_service::match_request(&scope, &config, &request).await {
        return Ok(cached.into());
    }

    // El header Accept se captura antes de ir a la red, lo necesita el fallback
    let accept = request.headers().get("accept").ok().flatten();
    let url = request.url();

    match JsFuture::from(scope.fetch_with_request(&request)).await {
        Ok(fetched) => {
            let response: Response = fetched.unchecked_into();

            if is_cacheable(response.status(), response.type_(), &url, &config) {
                // Dos copias independientes del body de lectura única:
                // una para la caché, la original para el caller
                match response.unchecked_ref::<CloneableResponse>().clone_body() {
                    Ok(copy) => {
                        if let Err(e) =
                            cache_service::store_response(&scope, &config, &request, &copy).await
                        {
                            log::warn!("⚠️ No se pudo cachear {}: {}", url, e);
                        }
                    }
                    Err(e) => {
                        log::warn!("⚠️ No se pudo clonar la respuesta de {}: {:?}", url, e);
                    }
                }
            }

            Ok(response.into())
        }
        Err(network_error) => {
            log::warn!("📴 Fetch falló para {}, buscando fallback offline", url);

            let fallback_url = match fallback_for(accept.as_deref(), &url, &config) {
                OfflineFallback::RootDocument => config.offline_document.clone(),
                OfflineFallback::IconFont => config.offline_font.clone(),
                OfflineFallback::None => return Err(network_error),
            };

            match cache_service::match_url(&scope, &config, &fallback_url).await {
                Some(fallback) => Ok(fallback.into()),
                None => Err(network_error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_get_passes_through() {
        let config = WorkerConfig::default();
        assert_eq!(
            classify_request("POST", "https://example.com/api", &config),
            FetchDecision::PassThrough
        );
        assert_eq!(
            classify_request("PUT", "/index.html", &config),
            FetchDecision::PassThrough
        );
    }

    #[test]
    fn test_excluded_host_never_intercepted() {
        let config = WorkerConfig::default();
        assert_eq!(
            classify_request("GET", "https://js.puter.com/v2/ai/chat", &config),
            FetchDecision::PassThrough
        );
    }

    #[test]
    fn test_plain_get_intercepted() {
        let config = WorkerConfig::default();
        assert_eq!(
            classify_request("GET", "/manifest.json", &config),
            FetchDecision::Intercept
        );
        assert_eq!(
            classify_request("GET", "https://cdn.jsdelivr.net/npm/chart.js", &config),
            FetchDecision::Intercept
        );
    }

    #[test]
    fn test_only_basic_200_is_cacheable() {
        let config = WorkerConfig::default();
        assert!(is_cacheable(200, ResponseType::Basic, "/app.js", &config));
        assert!(!is_cacheable(404, ResponseType::Basic, "/app.js", &config));
        assert!(!is_cacheable(200, ResponseType::Opaque, "/app.js", &config));
        assert!(!is_cacheable(200, ResponseType::Cors, "/app.js", &config));
    }

    #[test]
    fn test_excluded_host_never_cached() {
        let config = WorkerConfig::default();
        assert!(!is_cacheable(
            200,
            ResponseType::Basic,
            "https://js.puter.com/v2/",
            &config
        ));
    }

    #[test]
    fn test_html_request_falls_back_to_root_document() {
        let config = WorkerConfig::default();
        assert_eq!(
            fallback_for(Some("text/html,application/xhtml+xml"), "/study", &config),
            OfflineFallback::RootDocument
        );
    }

    #[test]
    fn test_font_bundle_falls_back_to_cached_font() {
        let config = WorkerConfig::default();
        assert_eq!(
            fallback_for(
                Some("*/*"),
                "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/webfonts/fa-brands-400.woff2",
                &config
            ),
            OfflineFallback::IconFont
        );
    }

    #[test]
    fn test_other_requests_get_no_fallback() {
        let config = WorkerConfig::default();
        assert_eq!(
            fallback_for(Some("application/json"), "/api/stats", &config),
            OfflineFallback::None
        );
        assert_eq!(fallback_for(None, "/data.bin", &config), OfflineFallback::None);
    }
}
