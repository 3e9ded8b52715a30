use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Immutable interaction record against a lead. Never updated after insert;
/// removal is a soft delete (`is_active = false`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TouchPoint {
    pub touch_id: String,
    pub uid: String,
    pub lead_id: String,
    pub contact_method: String,
    pub description: String,

    // Auto-generated annotation when the touch point also changed the lead's
    // status ("Status changed from X to Y").
    pub system_note: Option<String>,

    // "sales_rep" or "admin".
    pub commenter_type: String,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContactMethod {
    PhoneCall,
    TextMessage,
    Email,
    InPerson,
    Voicemail,
    Other,
}

impl ContactMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactMethod::PhoneCall => "phone_call",
            ContactMethod::TextMessage => "text_message",
            ContactMethod::Email => "email",
            ContactMethod::InPerson => "in_person",
            ContactMethod::Voicemail => "voicemail",
            ContactMethod::Other => "other",
        }
    }
}

/// Generates a touch point id in the `tp_<unix-millis>_<random>` format the
/// rest of the system expects.
pub fn generate_touch_id(now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("tp_{}_{}", now.timestamp_millis(), &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_id_has_expected_shape() {
        let now = Utc::now();
        let id = generate_touch_id(now);
        let mut parts = id.splitn(3, '_');
        assert_eq!(parts.next(), Some("tp"));
        assert_eq!(
            parts.next().unwrap(),
            now.timestamp_millis().to_string()
        );
        assert_eq!(parts.next().unwrap().len(), 8);
    }
}
