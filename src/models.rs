use crate::errors::ApiError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cap on invalid-entry samples accumulated across upload chunks.
const MAX_INVALID_SAMPLES: usize = 100;

/// Handle for an ad account node.
///
/// The platform addresses ad accounts as `act_<numeric id>` in node paths
/// but wants the bare numeric id inside share lists, so the handle keeps
/// the canonical prefixed form and exposes both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdAccount {
    act_id: String,
}

impl AdAccount {
    /// Creates an account handle, accepting either `123` or `act_123`.
    pub fn new(id: &str) -> Result<Self, ApiError> {
        let trimmed = id.trim();
        let bare = trimmed.strip_prefix("act_").unwrap_or(trimmed);

        if bare.is_empty() || !bare.chars().all(|c| c.is_ascii_digit()) {
            return Err(ApiError::BadRequest(format!(
                "Invalid ad account id: '{}'",
                id
            )));
        }

        Ok(Self {
            act_id: format!("act_{}", bare),
        })
    }

    /// Node id with the `act_` prefix, for request paths.
    pub fn node_id(&self) -> &str {
        &self.act_id
    }

    /// Numeric id without the prefix, for share lists.
    pub fn bare_id(&self) -> &str {
        &self.act_id["act_".len()..]
    }
}

/// A custom audience node as returned by the platform.
///
/// Every field except `id` is optional: the platform only returns what the
/// `fields` parameter asked for.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomAudience {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// `CUSTOM` for uploaded audiences, `LOOKALIKE` for derived ones.
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub approximate_count: Option<i64>,
    #[serde(default)]
    pub operation_status: Option<OperationStatus>,
    /// Unix seconds.
    #[serde(default)]
    pub time_created: Option<i64>,
    /// Unix seconds.
    #[serde(default)]
    pub time_updated: Option<i64>,
    /// Echo of the lookalike spec for `LOOKALIKE` audiences.
    #[serde(default)]
    pub lookalike_spec: Option<serde_json::Value>,
}

impl CustomAudience {
    /// Creation time as a UTC timestamp, when the field was requested.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.time_created
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Last update time as a UTC timestamp, when the field was requested.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.time_updated
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Processing status of an audience (population, deletion, ...).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OperationStatus {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Response for node-creation calls: `{"id": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedNode {
    pub id: String,
}

/// Response for delete/share-style calls: `{"success": true}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Cursor-paging envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Paging {
    #[serde(default)]
    pub cursors: Option<Cursors>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Cursors {
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
}

/// One page of an account's custom audiences.
#[derive(Debug, Clone, Deserialize)]
pub struct AudiencePage {
    pub data: Vec<CustomAudience>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

impl AudiencePage {
    /// Cursor to request the next page, if there is one.
    pub fn next_cursor(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|p| p.cursors.as_ref())
            .and_then(|c| c.after.as_deref())
            // A cursor without a `next` link means this is the last page
            .filter(|_| {
                self.paging
                    .as_ref()
                    .map(|p| p.next.is_some())
                    .unwrap_or(false)
            })
    }
}

/// An ad account an audience has been shared with.
#[derive(Debug, Clone, Deserialize)]
pub struct SharedAccount {
    pub account_id: String,
}

/// One page of share grantees.
#[derive(Debug, Clone, Deserialize)]
pub struct SharedAccountPage {
    pub data: Vec<SharedAccount>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

/// Per-chunk receipt for a member upload/removal.
#[derive(Debug, Clone, Deserialize)]
pub struct UsersUploadResponse {
    #[serde(default)]
    pub audience_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub num_received: i64,
    #[serde(default)]
    pub num_invalid_entries: i64,
    #[serde(default)]
    pub invalid_entry_samples: Vec<String>,
}

/// Aggregate receipt over all chunks of one upload/removal call.
#[derive(Debug, Clone, Default)]
pub struct UploadSummary {
    /// Chunks actually sent (ceil(entries_sent / 10_000)).
    pub chunks_sent: usize,
    /// Entries that survived normalization and were sent.
    pub entries_sent: usize,
    /// Raw entries dropped during normalization.
    pub entries_skipped: usize,
    /// Sum of the platform's per-chunk `num_received`.
    pub num_received: i64,
    /// Sum of the platform's per-chunk `num_invalid_entries`.
    pub num_invalid_entries: i64,
    /// Platform-reported invalid samples, capped at 100.
    pub invalid_entry_samples: Vec<String>,
}

impl UploadSummary {
    pub fn new(entries_skipped: usize) -> Self {
        Self {
            entries_skipped,
            ..Self::default()
        }
    }

    /// Folds one chunk's receipt into the running totals.
    pub fn absorb(&mut self, chunk_len: usize, response: UsersUploadResponse) {
        self.chunks_sent += 1;
        self.entries_sent += chunk_len;
        self.num_received += response.num_received;
        self.num_invalid_entries += response.num_invalid_entries;
        for sample in response.invalid_entry_samples {
            if self.invalid_entry_samples.len() >= MAX_INVALID_SAMPLES {
                break;
            }
            self.invalid_entry_samples.push(sample);
        }
    }
}

/// Targeting spec for a lookalike audience.
///
/// The platform caps the ratio at 20% of the target country's population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookalikeSpec {
    /// ISO 3166-1 alpha-2 country code, e.g. "US".
    pub country: String,
    /// Fraction of the country population to reach, in (0, 0.20].
    pub ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_ratio: Option<f64>,
    /// Optimization goal, e.g. "similarity" or "reach".
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
}

impl LookalikeSpec {
    pub fn new(country: impl Into<String>, ratio: f64) -> Self {
        Self {
            country: country.into(),
            ratio,
            starting_ratio: None,
            kind: None,
        }
    }

    /// Client-side validation before the spec is serialized into a request.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.country.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "Lookalike spec requires a country".to_string(),
            ));
        }
        if !(self.ratio > 0.0 && self.ratio <= 0.20) {
            return Err(ApiError::BadRequest(format!(
                "Lookalike ratio must be in (0, 0.20], got {}",
                self.ratio
            )));
        }
        if let Some(starting) = self.starting_ratio {
            if !(starting > 0.0 && starting < self.ratio) {
                return Err(ApiError::BadRequest(format!(
                    "Lookalike starting_ratio must be in (0, ratio), got {}",
                    starting
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ad_account_normalization() {
        let from_bare = AdAccount::new("1234567890").unwrap();
        assert_eq!(from_bare.node_id(), "act_1234567890");
        assert_eq!(from_bare.bare_id(), "1234567890");

        let from_prefixed = AdAccount::new("act_1234567890").unwrap();
        assert_eq!(from_prefixed, from_bare);

        let padded = AdAccount::new("  act_42  ").unwrap();
        assert_eq!(padded.node_id(), "act_42");
    }

    #[test]
    fn test_ad_account_rejects_garbage() {
        assert!(AdAccount::new("").is_err());
        assert!(AdAccount::new("act_").is_err());
        assert!(AdAccount::new("act_12x4").is_err());
        assert!(AdAccount::new("not-an-id").is_err());
    }

    #[test]
    fn test_lookalike_spec_validation() {
        assert!(LookalikeSpec::new("BR", 0.05).validate().is_ok());
        assert!(LookalikeSpec::new("BR", 0.20).validate().is_ok());

        assert!(LookalikeSpec::new("", 0.05).validate().is_err());
        assert!(LookalikeSpec::new("BR", 0.0).validate().is_err());
        assert!(LookalikeSpec::new("BR", 0.21).validate().is_err());

        let mut spec = LookalikeSpec::new("BR", 0.10);
        spec.starting_ratio = Some(0.05);
        assert!(spec.validate().is_ok());
        spec.starting_ratio = Some(0.10);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_lookalike_spec_serializes_platform_keys() {
        let mut spec = LookalikeSpec::new("US", 0.01);
        spec.kind = Some("similarity".to_string());

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["country"], "US");
        assert_eq!(json["type"], "similarity");
        assert!(json.get("starting_ratio").is_none());
    }

    #[test]
    fn test_audience_timestamps() {
        let audience: CustomAudience = serde_json::from_str(
            r#"{"id": "777", "time_created": 1700000000}"#,
        )
        .unwrap();

        let created = audience.created_at().unwrap();
        assert_eq!(created.timestamp(), 1700000000);
        assert!(audience.updated_at().is_none());
    }

    #[test]
    fn test_upload_summary_caps_samples() {
        let mut summary = UploadSummary::new(0);
        for _ in 0..3 {
            summary.absorb(
                10,
                UsersUploadResponse {
                    audience_id: None,
                    session_id: None,
                    num_received: 10,
                    num_invalid_entries: 50,
                    invalid_entry_samples: vec!["x".to_string(); 50],
                },
            );
        }

        assert_eq!(summary.chunks_sent, 3);
        assert_eq!(summary.entries_sent, 30);
        assert_eq!(summary.num_received, 30);
        assert_eq!(summary.num_invalid_entries, 150);
        assert_eq!(summary.invalid_entry_samples.len(), 100);
    }
}
