use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder for client metadata the request did not carry.
pub const UNKNOWN: &str = "Unknown";

/// Timestamp layout used for every record (local time, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Submitted form fields. A key sent more than once keeps its last value.
pub type FormFields = BTreeMap<String, String>;

/// One accepted submission, as persisted in the store file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: String,
    #[serde(rename = "post_data", default)]
    pub fields: FormFields,
    #[serde(rename = "server_info", default)]
    pub client: ClientInfo,
}

/// Request metadata attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(rename = "remote_addr", default = "unknown")]
    pub remote_address: String,
    #[serde(default = "unknown")]
    pub user_agent: String,
    #[serde(rename = "request_method", default = "unknown")]
    pub method: String,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

impl ClientInfo {
    /// Build client metadata, substituting [`UNKNOWN`] for anything missing.
    pub fn new(
        remote_address: Option<String>,
        user_agent: Option<String>,
        method: Option<String>,
    ) -> Self {
        Self {
            remote_address: remote_address.unwrap_or_else(unknown),
            user_agent: user_agent.unwrap_or_else(unknown),
            method: method.unwrap_or_else(unknown),
        }
    }
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}

impl Record {
    /// Stamp a new record with the current local time.
    pub fn new(fields: FormFields, client: ClientInfo) -> Self {
        Self {
            timestamp: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            fields,
            client,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn fields(pairs: &[(&str, &str)]) -> FormFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn client_info_substitutes_unknown_for_missing_values() {
        let client = ClientInfo::new(None, None, Some("POST".into()));
        assert_eq!(client.remote_address, "Unknown");
        assert_eq!(client.user_agent, "Unknown");
        assert_eq!(client.method, "POST");
    }

    #[test]
    fn timestamp_has_second_precision() {
        let record = Record::new(FormFields::new(), ClientInfo::default());
        let parsed = NaiveDateTime::parse_from_str(&record.timestamp, TIMESTAMP_FORMAT);
        assert!(parsed.is_ok(), "unexpected timestamp {}", record.timestamp);
        assert_eq!(record.timestamp.len(), "2024-01-01 00:00:00".len());
    }

    #[test]
    fn serializes_with_persisted_field_names() {
        let record = Record {
            timestamp: "2024-05-01 12:00:00".into(),
            fields: fields(&[("user", "alice")]),
            client: ClientInfo::new(Some("10.0.0.1".into()), Some("curl/8".into()), Some("POST".into())),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "timestamp": "2024-05-01 12:00:00",
                "post_data": { "user": "alice" },
                "server_info": {
                    "remote_addr": "10.0.0.1",
                    "user_agent": "curl/8",
                    "request_method": "POST"
                }
            })
        );
    }

    #[test]
    fn empty_fields_serialize_as_object() {
        let record = Record::new(FormFields::new(), ClientInfo::default());
        let value = serde_json::to_value(&record).unwrap();
        assert!(value["post_data"].as_object().unwrap().is_empty());
    }

    #[test]
    fn sparse_record_deserializes_with_defaults() {
        let record: Record = serde_json::from_str(r#"{"timestamp":"2024-05-01 12:00:00"}"#).unwrap();
        assert!(record.fields.is_empty());
        assert_eq!(record.client, ClientInfo::default());
    }
}
