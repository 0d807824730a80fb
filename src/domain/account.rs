use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PICTURE_URL: &str = "/images/default-avatar.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    User,
    Guest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    pub fn picture_or_default(&self) -> &str {
        self.picture
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_PICTURE_URL)
    }

    pub fn full_name(&self) -> String {
        [
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
            Some(self.last_name.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub token: String,
    pub account_id: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_access_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub contact: Contact,
    #[serde(default)]
    pub sessions: Vec<Session>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub full_name: String,
    pub phone: Option<String>,
    pub picture: String,
    pub active_sessions: usize,
    pub last_access_at: Option<DateTime<Utc>>,
}

impl AccountSummary {
    pub fn from_account(account: &Account, now: DateTime<Utc>) -> Self {
        let active_sessions = account
            .sessions
            .iter()
            .filter(|session| session.expires_at > now)
            .count();
        let last_access_at = account
            .sessions
            .iter()
            .filter_map(|session| session.last_access_at)
            .max();

        Self {
            id: account.id.clone(),
            email: account.email.clone(),
            role: account.role,
            full_name: account.contact.full_name(),
            phone: account.contact.phone.clone(),
            picture: account.contact.picture_or_default().to_string(),
            active_sessions,
            last_access_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::{Account, AccountSummary, DEFAULT_PICTURE_URL, Role};

    fn at(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("timestamp should parse")
            .with_timezone(&Utc)
    }

    fn sample_account_json() -> serde_json::Value {
        serde_json::json!({
            "id": "acc-1",
            "email": "gardener@example.com",
            "role": "ADMIN",
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-02T00:00:00Z",
            "contact": {
                "id": "con-1",
                "firstName": "Ada",
                "middleName": null,
                "lastName": "Moss",
                "email": "gardener@example.com",
                "phone": "+6281234",
                "picture": "",
                "createdAt": "2026-01-01T00:00:00Z",
                "updatedAt": "2026-01-01T00:00:00Z"
            },
            "sessions": [
                {
                    "id": "s-1",
                    "token": "t-1",
                    "accountId": "acc-1",
                    "expiresAt": "2026-03-01T00:00:00Z",
                    "ip": "10.0.0.2",
                    "createdAt": "2026-01-01T00:00:00Z",
                    "updatedAt": "2026-01-01T00:00:00Z",
                    "lastAccessAt": "2026-02-10T08:00:00Z"
                },
                {
                    "id": "s-2",
                    "token": "t-2",
                    "accountId": "acc-1",
                    "expiresAt": "2026-01-15T00:00:00Z",
                    "createdAt": "2026-01-01T00:00:00Z",
                    "updatedAt": "2026-01-01T00:00:00Z",
                    "lastAccessAt": "2026-01-14T08:00:00Z"
                }
            ]
        })
    }

    #[test]
    fn deserializes_account_from_camel_case_payload() {
        let account: Account =
            serde_json::from_value(sample_account_json()).expect("account should parse");

        assert_eq!(account.role, Role::Admin);
        assert_eq!(account.sessions.len(), 2);
        assert_eq!(account.sessions[0].ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(account.contact.registration_number, None);
    }

    #[test]
    fn rejects_unknown_role() {
        let mut payload = sample_account_json();
        payload["role"] = serde_json::json!("SUPERUSER");

        assert!(serde_json::from_value::<Account>(payload).is_err());
    }

    #[test]
    fn blank_picture_falls_back_to_default() {
        let account: Account =
            serde_json::from_value(sample_account_json()).expect("account should parse");
        assert_eq!(account.contact.picture_or_default(), DEFAULT_PICTURE_URL);
    }

    #[test]
    fn summary_counts_only_unexpired_sessions() {
        let account: Account =
            serde_json::from_value(sample_account_json()).expect("account should parse");

        let summary = AccountSummary::from_account(&account, at("2026-02-01T00:00:00Z"));

        assert_eq!(summary.full_name, "Ada Moss");
        assert_eq!(summary.active_sessions, 1);
        assert_eq!(summary.last_access_at, Some(at("2026-02-10T08:00:00Z")));
        assert_eq!(summary.picture, DEFAULT_PICTURE_URL);
    }
}
