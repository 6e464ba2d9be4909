use serde::{Deserialize, Serialize};

fn default_title() -> String {
    "CA Final Tracker".to_string()
}

fn default_body() -> String {
    "Time to study!".to_string()
}

fn default_icon() -> String {
    "https://img.icons8.com/color/96/000000/book-and-pencil.png".to_string()
}

fn default_tag() -> String {
    "ca-study-reminder".to_string()
}

fn default_target_url() -> String {
    "/".to_string()
}

/// Contenido resuelto de una notificación push.
/// Cada campo ausente en el payload toma su valor por defecto; un payload
/// imposible de parsear descarta todo y usa el objeto por defecto completo
/// (nunca un merge parcial).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_body")]
    pub body: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_icon")]
    pub badge: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default = "default_target_url")]
    pub url: String,
}

impl Default for NotificationContent {
    fn default() -> Self {
        Self {
            title: default_title(),
            body: default_body(),
            icon: default_icon(),
            badge: default_icon(),
            tag: default_tag(),
            url: default_target_url(),
        }
    }
}

/// Resuelve el texto crudo de un push event a contenido de notificación.
/// Payload ausente o corrupto -> defaults completos, nunca fatal.
pub fn resolve_push_payload(raw: Option<String>) -> NotificationContent {
    let text = match raw {
        Some(text) => text,
        None => return NotificationContent::default(),
    };

    match serde_json::from_str::<NotificationContent>(&text) {
        Ok(content) => content,
        Err(e) => {
            log::error!("❌ Error parseando payload push: {}", e);
            NotificationContent::default()
        }
    }
}

/// Qué hacer cuando el usuario toca la notificación
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Acción "dismiss": cerrar y nada más
    Dismiss,
    /// Acción "open" o click directo: enfocar/abrir ventana en la URL guardada
    Open { url: String },
}

/// Política de click: "dismiss" no hace nada; cualquier otra acción
/// (incluido el click sin acción) abre la URL guardada, "/" por defecto
pub fn resolve_click(action: &str, stored_url: Option<String>) -> ClickOutcome {
    if action == "dismiss" {
        return ClickOutcome::Dismiss;
    }

    ClickOutcome::Open {
        url: stored_url.unwrap_or_else(default_target_url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_with_all_fields() {
        let content = resolve_push_payload(Some(
            r#"{"title":"T","body":"B","url":"/x"}"#.to_string(),
        ));
        assert_eq!(content.title, "T");
        assert_eq!(content.body, "B");
        assert_eq!(content.url, "/x");
        // Los campos no enviados toman sus defaults
        assert_eq!(content.tag, "ca-study-reminder");
        assert!(content.icon.contains("book-and-pencil"));
    }

    #[test]
    fn test_unparsable_payload_yields_complete_default() {
        let content = resolve_push_payload(Some("not json {{".to_string()));
        assert_eq!(content, NotificationContent::default());
        assert_eq!(content.title, "CA Final Tracker");
        assert_eq!(content.body, "Time to study!");
    }

    #[test]
    fn test_missing_payload_yields_complete_default() {
        let content = resolve_push_payload(None);
        assert_eq!(content, NotificationContent::default());
    }

    #[test]
    fn test_non_object_payload_yields_default() {
        // JSON válido pero no un objeto: se descarta entero
        let content = resolve_push_payload(Some("\"hola\"".to_string()));
        assert_eq!(content, NotificationContent::default());
    }

    #[test]
    fn test_click_dismiss_does_nothing() {
        assert_eq!(
            resolve_click("dismiss", Some("/x".to_string())),
            ClickOutcome::Dismiss
        );
    }

    #[test]
    fn test_click_open_uses_stored_url() {
        assert_eq!(
            resolve_click("open", Some("/x".to_string())),
            ClickOutcome::Open { url: "/x".to_string() }
        );
    }

    #[test]
    fn test_click_without_action_falls_back_to_root() {
        assert_eq!(
            resolve_click("", None),
            ClickOutcome::Open { url: "/".to_string() }
        );
    }
}
