use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::consent::types::{ConsentSettings, ConsentStatus};
use crate::tag_manager::error::{internal_error, GtmResult};

/// The JSON document persisted in the consent cookie.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub status: ConsentStatus,
    pub settings: ConsentSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ConsentRecord {
    /// A record stamped with the current UTC time.
    pub fn new(status: ConsentStatus, settings: ConsentSettings) -> Self {
        Self {
            status,
            settings,
            timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }

    pub fn encode(&self) -> GtmResult<String> {
        serde_json::to_string(self)
            .map_err(|err| internal_error(format!("failed to encode consent record: {err}")))
    }

    /// Parses a cookie value. Records missing `status` or any settings category are rejected.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::types::{ConsentMode, ConsentType};
    use serde_json::json;

    #[test]
    fn new_records_carry_millisecond_utc_timestamp() {
        let record = ConsentRecord::new(ConsentStatus::Accepted, ConsentSettings::all_granted());
        let timestamp = record.timestamp.unwrap();
        assert!(timestamp.ends_with('Z'));
        let fraction = timestamp.rsplit('.').next().unwrap();
        assert_eq!(fraction.len(), 4);
        assert!(chrono::DateTime::parse_from_rfc3339(&timestamp).is_ok());
    }

    #[test]
    fn encoded_record_uses_wire_names() {
        let record = ConsentRecord {
            status: ConsentStatus::Partial,
            settings: ConsentSettings::default()
                .with(ConsentType::AnalyticsStorage, ConsentMode::Granted),
            timestamp: Some("2024-01-01T00:00:00.000Z".into()),
        };
        let value: serde_json::Value = serde_json::from_str(&record.encode().unwrap()).unwrap();
        assert_eq!(value["status"], "partial");
        assert_eq!(value["settings"]["analytics_storage"], "granted");
        assert_eq!(value["settings"]["ad_storage"], "denied");
        assert_eq!(value["timestamp"], "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn incomplete_records_are_rejected() {
        assert!(ConsentRecord::decode(r#"{"status":"accepted","settings":{"ad_storage":"gr"#).is_err());
        let missing_category = json!({
            "status": "accepted",
            "settings": {
                "analytics_storage": "granted",
                "ad_storage": "granted",
                "ad_user_data": "granted",
                "ad_personalization": "granted",
                "functionality_storage": "granted"
            }
        });
        assert!(ConsentRecord::decode(&missing_category.to_string()).is_err());
        assert!(ConsentRecord::decode(r#"{"settings":{}}"#).is_err());
    }

    #[test]
    fn timestamp_is_optional_when_reading() {
        let raw = json!({"status": "rejected", "settings": ConsentSettings::necessary_only()});
        let record = ConsentRecord::decode(&raw.to_string()).unwrap();
        assert_eq!(record.status, ConsentStatus::Rejected);
        assert_eq!(record.timestamp, None);
    }
}
