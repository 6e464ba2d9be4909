use serde::{Deserialize, Serialize};

/// Configuración explícita del worker.
/// Todo el estado "global" del service worker (nombre de caché, manifest,
/// hosts excluidos, endpoint de sync) vive aquí y se pasa a cada handler,
/// en vez de quedar como constantes ambientales sueltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Versión de la caché. Cambiar este número es el único mecanismo
    /// soportado de invalidación de caché.
    pub cache_version: u32,
    /// Assets estáticos conocidos en build time (paths locales + CDN)
    pub static_assets: Vec<String>,
    /// Webfonts de Font Awesome a precachear
    pub font_assets: Vec<String>,
    /// Iconos usados por las notificaciones
    pub icon_assets: Vec<String>,
    /// Hosts que nunca se interceptan (el proveedor de IA necesita red directa)
    pub excluded_hosts: Vec<String>,
    /// Documento servido como fallback offline para requests HTML
    pub offline_document: String,
    /// Fuente servida como fallback offline para el bundle de iconos
    pub offline_font: String,
    /// Marcador en la URL que identifica el bundle de Font Awesome
    pub font_bundle_marker: String,
    /// Endpoint de entrega del queue de estudio pendiente
    pub sync_endpoint: String,
    /// Tag del background sync one-shot
    pub sync_tag: String,
    /// Tag del periodic sync diario
    pub periodic_sync_tag: String,
    /// Clave de localStorage con el array JSON de registros pendientes
    pub pending_records_key: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_version: 3,
            static_assets: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/license-generator.html".to_string(),
                "/manifest.json".to_string(),
                "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/css/all.min.css".to_string(),
                "https://js.puter.com/v2/".to_string(),
                "https://cdn.jsdelivr.net/npm/chart.js".to_string(),
            ],
            font_assets: vec![
                "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/webfonts/fa-solid-900.woff2".to_string(),
                "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/webfonts/fa-brands-400.woff2".to_string(),
            ],
            icon_assets: vec![
                "https://img.icons8.com/color/96/000000/book-and-pencil.png".to_string(),
                "https://img.icons8.com/color/192/000000/book-and-pencil.png".to_string(),
            ],
            excluded_hosts: vec!["puter.com".to_string()],
            offline_document: "/index.html".to_string(),
            offline_font: "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/webfonts/fa-solid-900.woff2".to_string(),
            font_bundle_marker: "font-awesome".to_string(),
            sync_endpoint: "/api/sync".to_string(),
            sync_tag: "sync-study-data".to_string(),
            periodic_sync_tag: "daily-study-sync".to_string(),
            pending_records_key: "unsynced_study_data".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Carga la configuración con overrides de variables de entorno
    /// en tiempo de compilación (inyectadas por build.rs desde .env)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        config.cache_version = option_env!("CACHE_VERSION")
            .unwrap_or("3").parse().unwrap_or(3);

        if let Some(endpoint) = option_env!("SYNC_ENDPOINT") {
            config.sync_endpoint = endpoint.to_string();
        }

        config
    }

    /// Nombre versionado de la caché actual
    pub fn cache_name(&self) -> String {
        format!("ca-final-tracker-v{}", self.cache_version)
    }

    /// Manifest completo a precachear en la instalación:
    /// assets estáticos + webfonts + iconos de notificación
    pub fn full_manifest(&self) -> Vec<String> {
        let mut manifest = self.static_assets.clone();
        manifest.extend(self.font_assets.iter().cloned());
        manifest.extend(self.icon_assets.iter().cloned());
        manifest
    }

    /// Verifica si una URL pertenece a un host excluido de la intercepción
    pub fn is_excluded_url(&self, url: &str) -> bool {
        self.excluded_hosts.iter().any(|host| url.contains(host.as_str()))
    }
}

// Configuración global estática
lazy_static::lazy_static! {
    pub static ref CONFIG: WorkerConfig = WorkerConfig::from_env();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_name_embeds_version() {
        let mut config = WorkerConfig::default();
        assert_eq!(config.cache_name(), "ca-final-tracker-v3");
        config.cache_version = 4;
        assert_eq!(config.cache_name(), "ca-final-tracker-v4");
    }

    #[test]
    fn test_full_manifest_contains_all_groups() {
        let config = WorkerConfig::default();
        let manifest = config.full_manifest();

        assert_eq!(
            manifest.len(),
            config.static_assets.len() + config.font_assets.len() + config.icon_assets.len()
        );
        // Los estáticos van primero, en orden
        assert_eq!(manifest[0], "/");
        assert_eq!(manifest[1], "/index.html");
        assert!(manifest.contains(&config.offline_font));
        assert!(manifest.iter().any(|url| url.contains("book-and-pencil")));
    }

    #[test]
    fn test_excluded_url_matches_host_anywhere() {
        let config = WorkerConfig::default();
        assert!(config.is_excluded_url("https://js.puter.com/v2/ai/chat"));
        assert!(config.is_excluded_url("https://api.puter.com/drivers"));
        assert!(!config.is_excluded_url("https://cdn.jsdelivr.net/npm/chart.js"));
    }
}
