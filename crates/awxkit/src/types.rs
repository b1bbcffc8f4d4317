//! Core types for the AWX v2 API.
//!
//! Records mirror the JSON the server returns, trimmed to the fields this
//! crate consumes. Unknown fields are ignored on deserialization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Query-string filters for list endpoints (`?name=foo&id=3`).
pub type Filters = BTreeMap<String, String>;

/// How requests authenticate against the server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Auth {
    /// No `Authorization` header.
    #[default]
    None,
    /// OAuth2 personal access token.
    Token(String),
    /// HTTP basic authentication.
    Basic {
        /// Login name.
        username: String,
        /// Password.
        password: String,
    },
}

/// Connection settings for the HTTP backend.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server base URL, e.g. `https://awx.example.com`.
    pub url: String,
    /// Authentication scheme.
    pub auth: Auth,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Whether to verify the server's TLS certificate.
    pub verify_tls: bool,
}

impl ConnectionConfig {
    /// Create a config with defaults for everything but the URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth: Auth::None,
            timeout: Duration::from_secs(30),
            verify_tls: true,
        }
    }

    /// Set the authentication scheme.
    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable TLS verification.
    pub fn verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }
}

/// Retry configuration for transient failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (1 means no retry)
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

/// Pagination metadata returned alongside list results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMeta {
    /// Total number of matches on the server.
    pub count: usize,
    /// URL of the next page, if any.
    pub next: Option<String>,
    /// URL of the previous page, if any.
    pub previous: Option<String>,
}

/// One page of a list endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub(crate) fn split(self) -> (Vec<T>, ListMeta) {
        (
            self.results,
            ListMeta {
                count: self.count,
                next: self.next,
                previous: self.previous,
            },
        )
    }
}

/// A credential (`/api/v2/credentials/<id>/`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Server-assigned id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Credential kind derived from its type, e.g. "ssh".
    #[serde(default)]
    pub kind: String,
    /// Owning organization.
    #[serde(default)]
    pub organization: Option<i64>,
    /// Credential type id.
    #[serde(default)]
    pub credential_type: i64,
    /// Type-specific inputs. Secret values come back as `$encrypted$`.
    #[serde(default)]
    pub inputs: Map<String, Value>,
}

impl Credential {
    /// The `username` input, if the credential type has one.
    pub fn username(&self) -> Option<&str> {
        self.inputs.get("username").and_then(Value::as_str)
    }
}

/// Payload for creating or patching a credential.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialRequest {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Owning organization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<i64>,
    /// Credential type id.
    pub credential_type: i64,
    /// Type-specific inputs.
    pub inputs: Map<String, Value>,
}

/// A job template (`/api/v2/job_templates/<id>/`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobTemplate {
    /// Server-assigned id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// "run" or "check".
    #[serde(default)]
    pub job_type: String,
    /// Inventory id.
    #[serde(default)]
    pub inventory: Option<i64>,
    /// Project id.
    #[serde(default)]
    pub project: Option<i64>,
    /// Playbook path inside the project.
    #[serde(default)]
    pub playbook: String,
    /// Whether the attached survey is shown on launch.
    #[serde(default)]
    pub survey_enabled: bool,
}

/// Body for the association sub-endpoints (`POST .../credentials/`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssociationRequest {
    /// Id of the child object.
    pub id: i64,
    /// Set to remove the link instead of creating it.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub disassociate: bool,
}

impl AssociationRequest {
    /// Link the child with the given id.
    pub fn associate(id: i64) -> Self {
        Self {
            id,
            disassociate: false,
        }
    }

    /// Unlink the child with the given id.
    pub fn disassociate(id: i64) -> Self {
        Self {
            id,
            disassociate: true,
        }
    }
}

/// A job template survey (`/api/v2/job_templates/<id>/survey_spec/`).
///
/// Questions are kept as raw JSON: the server accepts several shapes for
/// `default` and `choices`, so decoding them is left to the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    /// Survey title.
    #[serde(default)]
    pub name: String,
    /// Survey description.
    #[serde(default)]
    pub description: String,
    /// Ordered question list.
    #[serde(default)]
    pub spec: Vec<Value>,
}

/// Input type of a survey question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// Single-line text.
    Text,
    /// Pick one of `choices`.
    Multiplechoice,
    /// Pick any of `choices`.
    Multiselect,
    /// Masked text.
    Password,
    /// Whole number between `min` and `max`.
    Integer,
    /// Decimal number between `min` and `max`.
    Float,
}

impl QuestionType {
    /// Wire name of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Multiplechoice => "multiplechoice",
            Self::Multiselect => "multiselect",
            Self::Password => "password",
            Self::Integer => "integer",
            Self::Float => "float",
        }
    }

    /// All accepted types, in wire-name form.
    #[must_use]
    pub fn all() -> &'static [QuestionType] {
        &[
            Self::Text,
            Self::Multiplechoice,
            Self::Multiselect,
            Self::Password,
            Self::Integer,
            Self::Float,
        ]
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::all().iter().map(QuestionType::as_str).collect();
                format!("{s:?} is not one of {names:?}")
            })
    }
}

/// Typed view of one survey question as the server stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyQuestion {
    /// Prompt shown to the user.
    pub question_name: String,
    /// Help text.
    #[serde(default)]
    pub question_description: String,
    /// Whether an answer is mandatory.
    #[serde(default)]
    pub required: bool,
    /// Extra-var name the answer is stored under.
    pub variable: String,
    /// Input type.
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Lower bound (length for text, value for numbers).
    #[serde(default)]
    pub min: Option<i64>,
    /// Upper bound.
    #[serde(default)]
    pub max: Option<i64>,
    /// Default answer; a string or a number depending on the type.
    #[serde(default)]
    pub default: Value,
    /// Choices; a newline-separated string or a list of strings.
    #[serde(default)]
    pub choices: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_question_type_parse() {
        assert_eq!("text".parse::<QuestionType>(), Ok(QuestionType::Text));
        assert_eq!(
            "multiplechoice".parse::<QuestionType>(),
            Ok(QuestionType::Multiplechoice)
        );
        assert_eq!("float".parse::<QuestionType>(), Ok(QuestionType::Float));

        let err = "textarea".parse::<QuestionType>().unwrap_err();
        assert!(err.contains("textarea"));
        assert!(err.contains("multiselect"));
    }

    #[test]
    fn test_question_type_round_trips_through_wire_name() {
        for t in QuestionType::all() {
            assert_eq!(t.as_str().parse::<QuestionType>(), Ok(*t));
        }
    }

    #[test]
    fn test_association_request_body() {
        assert_eq!(
            serde_json::to_value(AssociationRequest::associate(9)).unwrap(),
            json!({"id": 9})
        );
        assert_eq!(
            serde_json::to_value(AssociationRequest::disassociate(9)).unwrap(),
            json!({"id": 9, "disassociate": true})
        );
    }

    #[test]
    fn test_credential_username() {
        let cred: Credential = serde_json::from_value(json!({
            "id": 42,
            "name": "svc-account",
            "kind": "ssh",
            "credential_type": 1,
            "inputs": {"username": "svc", "password": "$encrypted$"}
        }))
        .unwrap();
        assert_eq!(cred.username(), Some("svc"));

        let no_inputs: Credential =
            serde_json::from_value(json!({"id": 1, "name": "vault"})).unwrap();
        assert_eq!(no_inputs.username(), None);
        assert_eq!(no_inputs.kind, "");
    }

    #[test]
    fn test_page_split() {
        let page: Page<Credential> = serde_json::from_value(json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{"id": 3, "name": "a"}]
        }))
        .unwrap();
        let (items, meta) = page.split();
        assert_eq!(items.len(), 1);
        assert_eq!(meta.count, 1);
        assert!(meta.next.is_none());
    }

    #[test]
    fn test_retry_delay_backoff() {
        let config = RetryConfig::new(4, Duration::from_secs(1), 2.0);
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));

        let capped = RetryConfig {
            max_delay: Duration::from_secs(3),
            ..config
        };
        assert_eq!(capped.delay_for_attempt(5), Duration::from_secs(3));
    }
}
