// ============================================================================
// SYNC SERVICE - ENTREGA DEL QUEUE DE ESTUDIO PENDIENTE
// ============================================================================
// El foreground acumula registros bajo una sola clave de localStorage.
// El worker los entrega por POST y SOLO limpia la clave tras una entrega
// confirmada (2xx); en fallo los registros quedan intactos y el error se
// propaga para que la plataforma reprograme el sync.
// ============================================================================

use crate::config::WorkerConfig;
use crate::models::sync::{PendingStudyQueue, RetryMeta, StudyRecord};
use crate::utils::storage;
use gloo_net::http::Request;

/// Clave companion con los metadatos de reintento del queue
fn meta_key(config: &WorkerConfig) -> String {
    format!("{}_meta", config.pending_records_key)
}

/// Tag que atiende cada tipo de evento de sync: el sync one-shot y el
/// periódico son exclusivos, un tag en el evento equivocado se ignora
pub fn expected_tag(event_name: &str, config: &WorkerConfig) -> Option<String> {
    match event_name {
        "sync" => Some(config.sync_tag.clone()),
        "periodicsync" => Some(config.periodic_sync_tag.clone()),
        _ => None,
    }
}

/// Resultado de un flush manual (SYNC_NOW)
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// Registros entregados y clave limpiada
    Delivered(usize),
    /// No había nada que entregar
    Empty,
    /// Entrega diferida: el backoff del último fallo sigue corriendo
    Deferred { remaining_secs: i64 },
}

/// Gate del flush manual: vacío y backoff se resuelven sin tocar la red.
/// None significa que la entrega debe intentarse.
fn manual_flush_gate(queue: &PendingStudyQueue) -> Option<FlushOutcome> {
    if queue.is_empty() {
        return Some(FlushOutcome::Empty);
    }
    if !queue.meta.should_retry() {
        return Some(FlushOutcome::Deferred {
            remaining_secs: queue.meta.backoff_remaining(),
        });
    }
    None
}

/// Coordinador de sincronización del queue pendiente
#[derive(Clone)]
pub struct SyncCoordinator {
    endpoint: String,
    records_key: String,
    meta_key: String,
}

impl SyncCoordinator {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            endpoint: config.sync_endpoint.clone(),
            records_key: config.pending_records_key.clone(),
            meta_key: meta_key(config),
        }
    }

    /// Carga el queue pendiente desde storage (array plano + metadatos)
    fn load_queue(&self) -> PendingStudyQueue {
        let records: Vec<StudyRecord> =
            storage::load_from_storage(&self.records_key).unwrap_or_default();
        let meta: RetryMeta =
            storage::load_from_storage(&self.meta_key).unwrap_or_default();

        PendingStudyQueue::resume(records, meta)
    }

    /// Entrega el queue pendiente. Devuelve cuántos registros se entregaron.
    /// Idempotente: con el queue vacío es un no-op.
    pub async fn flush(&self) -> Result<usize, String> {
        let mut queue = self.load_queue();

        if queue.is_empty() {
            log::info!("📭 No hay registros pendientes");
            return Ok(0);
        }

        log::info!(
            "📤 Entregando {} registros de estudio (intento {})",
            queue.len(),
            queue.meta.retry_count + 1
        );

        match self.deliver(&queue.records).await {
            Ok(()) => {
                // Entrega confirmada: recién ahora se limpia la clave
                let delivered = queue.len();
                let _ = storage::remove_from_storage(&self.records_key);
                let _ = storage::remove_from_storage(&self.meta_key);
                log::info!("✅ {} registros sincronizados", delivered);
                Ok(delivered)
            }
            Err(e) => {
                // Los registros quedan intactos para el próximo intento
                queue.meta.increment_retry();
                if let Err(save_err) = storage::save_to_storage(&self.meta_key, &queue.meta) {
                    log::error!("❌ Error guardando metadatos de reintento: {}", save_err);
                }
                log::error!("❌ Sync falló, {} registros retenidos: {}", queue.len(), e);
                Err(e)
            }
        }
    }

    /// Variante para SYNC_NOW: respeta el backoff exponencial entre
    /// reintentos manuales; los sync events de la plataforma no pasan
    /// por aquí porque traen su propia política de reprogramación.
    /// El resultado distingue entrega, queue vacío y entrega diferida.
    pub async fn flush_if_due(&self) -> Result<FlushOutcome, String> {
        let queue = self.load_queue();

        if let Some(outcome) = manual_flush_gate(&queue) {
            if let FlushOutcome::Deferred { remaining_secs } = outcome {
                log::info!("⏳ Esperando backoff: {}s restantes", remaining_secs);
            }
            return Ok(outcome);
        }

        self.flush().await.map(FlushOutcome::Delivered)
    }

    /// POST del array de registros al endpoint de sync
    async fn deliver(&self, records: &[StudyRecord]) -> Result<(), String> {
        let response = Request::post(&self.endpoint)
            .json(&records)
            .map_err(|e| format!("Serialization error: {}", e))?
            .send()
            .await
            .map_err(|e| format!("Network error: {}", e))?;

        if !response.ok() {
            return Err(format!(
                "HTTP {}: {}",
                response.status(),
                response.status_text()
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_event_type_has_its_own_tag() {
        let config = WorkerConfig::default();
        assert_eq!(
            expected_tag("sync", &config),
            Some("sync-study-data".to_string())
        );
        assert_eq!(
            expected_tag("periodicsync", &config),
            Some("daily-study-sync".to_string())
        );
        assert_eq!(expected_tag("message", &config), None);
    }

    #[test]
    fn test_periodic_tag_not_accepted_on_oneshot_sync() {
        // Un sync one-shot con el tag periódico (y viceversa) se ignora
        let config = WorkerConfig::default();
        let oneshot = expected_tag("sync", &config).unwrap();
        let periodic = expected_tag("periodicsync", &config).unwrap();
        assert_ne!(oneshot, "daily-study-sync");
        assert_ne!(periodic, "sync-study-data");
    }

    #[test]
    fn test_manual_gate_reports_empty_queue() {
        let queue = PendingStudyQueue::resume(vec![], RetryMeta::default());
        assert_eq!(manual_flush_gate(&queue), Some(FlushOutcome::Empty));
    }

    #[test]
    fn test_manual_gate_defers_during_backoff() {
        // Fallo reciente: el gate difiere en vez de fingir un queue vacío
        let records = vec![StudyRecord(serde_json::json!({"subject": "FR"}))];
        let mut meta = RetryMeta::default();
        meta.increment_retry();

        let queue = PendingStudyQueue::resume(records, meta);
        match manual_flush_gate(&queue) {
            Some(FlushOutcome::Deferred { remaining_secs }) => assert!(remaining_secs > 0),
            other => panic!("se esperaba Deferred, llegó {:?}", other),
        }
    }

    #[test]
    fn test_manual_gate_allows_due_queue() {
        let records = vec![StudyRecord(serde_json::json!({"subject": "Audit"}))];
        let queue = PendingStudyQueue::resume(records, RetryMeta::default());
        assert_eq!(manual_flush_gate(&queue), None);
    }

    #[test]
    fn test_meta_key_derived_from_records_key() {
        let config = WorkerConfig::default();
        assert_eq!(meta_key(&config), "unsynced_study_data_meta");
    }

    #[test]
    fn test_coordinator_takes_endpoint_from_config() {
        let mut config = WorkerConfig::default();
        config.sync_endpoint = "/v2/sync".to_string();
        let coordinator = SyncCoordinator::from_config(&config);
        assert_eq!(coordinator.endpoint, "/v2/sync");
        assert_eq!(coordinator.records_key, "unsynced_study_data");
    }
}
