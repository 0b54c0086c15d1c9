use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const WAITLIST_COLLECTION: &str = "waitlist";
pub const DEFAULT_SOURCE: &str = "landing-page";
pub const UNKNOWN: &str = "unknown";

/// One signup as persisted in the `waitlist` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    pub email: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
    #[serde(default = "unknown")]
    pub user_agent: String,
    #[serde(default = "unknown")]
    pub ip: String,
    #[serde(default = "unknown")]
    pub source: String,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Admin-facing projection. Provenance beyond `source` stays in the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub email: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

impl From<WaitlistEntry> for EntrySummary {
    fn from(entry: WaitlistEntry) -> Self {
        Self {
            email: entry.email,
            timestamp: entry.timestamp,
            source: entry.source,
        }
    }
}

#[derive(Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub already_exists: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistStats {
    pub total: usize,
    pub today: usize,
    pub this_week: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub success: bool,
    pub stats: WaitlistStats,
    pub emails: Vec<EntrySummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConnectionResponse {
    pub success: bool,
    pub message: String,
    pub databases: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_response_omits_absent_flags() {
        let created = JoinResponse {
            success: true,
            message: "ok".to_string(),
            already_exists: None,
            id: Some("abc".to_string()),
        };
        let value = serde_json::to_value(&created).unwrap();

        assert_eq!(value["id"], "abc");
        assert!(value.get("alreadyExists").is_none());
    }

    #[test]
    fn stats_use_camel_case_keys() {
        let stats = WaitlistStats {
            total: 3,
            today: 1,
            this_week: 2,
        };
        let value = serde_json::to_value(stats).unwrap();

        assert_eq!(value["thisWeek"], 2);
    }

    #[test]
    fn summary_drops_ip_and_user_agent() {
        let entry = WaitlistEntry {
            email: "a@b.co".to_string(),
            timestamp: Utc::now(),
            user_agent: "curl/8".to_string(),
            ip: "10.0.0.1".to_string(),
            source: DEFAULT_SOURCE.to_string(),
        };
        let value = serde_json::to_value(EntrySummary::from(entry)).unwrap();

        assert!(value.get("ip").is_none());
        assert!(value.get("userAgent").is_none());
        assert_eq!(value["source"], DEFAULT_SOURCE);
    }
}
