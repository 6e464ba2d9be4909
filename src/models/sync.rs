use serde::{Deserialize, Serialize};

/// Registro de estudio pendiente de sincronizar.
/// El foreground lo genera con forma libre; para el worker es un valor
/// JSON opaco que solo hay que entregar intacto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudyRecord(pub serde_json::Value);

/// Metadatos de reintento del queue pendiente, persistidos aparte de los
/// registros para no romper el contrato "una clave = un array JSON"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryMeta {
    pub created_at: i64,
    pub retry_count: usize,
    pub last_retry: Option<i64>,
}

impl Default for RetryMeta {
    fn default() -> Self {
        Self {
            created_at: chrono::Utc::now().timestamp(),
            retry_count: 0,
            last_retry: None,
        }
    }
}

impl RetryMeta {
    pub fn increment_retry(&mut self) {
        self.retry_count += 1;
        self.last_retry = Some(chrono::Utc::now().timestamp());
    }

    /// Determinar si debemos reintentar basado en backoff exponencial
    pub fn should_retry(&self) -> bool {
        self.should_retry_at(chrono::Utc::now().timestamp())
    }

    fn should_retry_at(&self, now: i64) -> bool {
        if self.retry_count == 0 {
            return true;
        }

        let last_retry = match self.last_retry {
            Some(ts) => ts,
            None => return true,
        };

        now - last_retry >= self.backoff_seconds()
    }

    /// Backoff exponencial: 60s, 120s, 240s, max 300s (5 min)
    fn backoff_seconds(&self) -> i64 {
        std::cmp::min(30 * 2_i64.pow(self.retry_count.min(8) as u32), 300)
    }

    /// Segundos restantes hasta el próximo intento permitido
    pub fn backoff_remaining(&self) -> i64 {
        let last_retry = match self.last_retry {
            Some(ts) => ts,
            None => return 0,
        };

        let elapsed = chrono::Utc::now().timestamp() - last_retry;
        std::cmp::max(self.backoff_seconds() - elapsed, 0)
    }
}

/// Queue pendiente en memoria: registros cargados de storage + metadatos
/// de reintento. Un registro permanece en el queue hasta que su entrega
/// se confirma; un intento fallido lo deja intacto.
#[derive(Debug, Clone)]
pub struct PendingStudyQueue {
    pub records: Vec<StudyRecord>,
    pub meta: RetryMeta,
}

impl PendingStudyQueue {
    pub fn resume(records: Vec<StudyRecord>, meta: RetryMeta) -> Self {
        Self { records, meta }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Mensajes del hilo principal hacia el worker
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerMessage {
    /// Activar el worker en espera inmediatamente
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
    /// Disparar una sincronización fuera de banda
    #[serde(rename = "SYNC_NOW")]
    SyncNow,
}

impl WorkerMessage {
    /// Parsea el JSON de un message event. Mensajes desconocidos o
    /// malformados se ignoran (None), nunca son fatales.
    pub fn parse(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_serialize_as_bare_array() {
        // El contrato de storage es un array JSON plano bajo una sola clave
        let records = vec![
            StudyRecord(json!({"subject": "FR", "minutes": 45})),
            StudyRecord(json!({"subject": "Audit", "minutes": 30})),
        ];
        let encoded = serde_json::to_string(&records).unwrap();
        assert!(encoded.starts_with('['));

        let decoded: Vec<StudyRecord> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn test_first_attempt_always_allowed() {
        let meta = RetryMeta::default();
        assert_eq!(meta.retry_count, 0);
        assert!(meta.should_retry());
        assert_eq!(meta.backoff_remaining(), 0);
    }

    #[test]
    fn test_backoff_blocks_immediate_retry() {
        let mut meta = RetryMeta::default();
        meta.increment_retry();
        // Recién fallado: el backoff de 60s sigue corriendo
        assert!(!meta.should_retry());
        assert!(meta.backoff_remaining() > 0);
    }

    #[test]
    fn test_backoff_expires_with_time() {
        let meta = RetryMeta {
            created_at: 0,
            retry_count: 1,
            last_retry: Some(1_000),
        };
        // 60s de backoff para el primer reintento
        assert!(!meta.should_retry_at(1_030));
        assert!(meta.should_retry_at(1_061));
    }

    #[test]
    fn test_backoff_capped_at_five_minutes() {
        let meta = RetryMeta {
            created_at: 0,
            retry_count: 10,
            last_retry: Some(0),
        };
        assert!(!meta.should_retry_at(299));
        assert!(meta.should_retry_at(300));
    }

    #[test]
    fn test_queue_keeps_records_until_confirmed() {
        let records = vec![StudyRecord(json!({"a": 1})), StudyRecord(json!({"b": 2}))];
        let mut queue = PendingStudyQueue::resume(records, RetryMeta::default());
        assert_eq!(queue.len(), 2);

        // Un fallo solo incrementa el contador, los registros quedan
        queue.meta.increment_retry();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.meta.retry_count, 1);
    }

    #[test]
    fn test_message_parse() {
        assert_eq!(
            WorkerMessage::parse(r#"{"type":"SKIP_WAITING"}"#),
            Some(WorkerMessage::SkipWaiting)
        );
        assert_eq!(
            WorkerMessage::parse(r#"{"type":"SYNC_NOW"}"#),
            Some(WorkerMessage::SyncNow)
        );
        assert_eq!(WorkerMessage::parse(r#"{"type":"OTRO"}"#), None);
        assert_eq!(WorkerMessage::parse("garbage"), None);
    }
}
