use anyhow::{Context, Result};
use awxkit::{Auth, ConnectionConfig, QuestionType, RetryConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::time::Duration;

use crate::resource::{
    CredentialLookupState, CredentialState, JobTemplateCredentialState, Question, SurveyState,
};

// ============================================================================
// Main Config Schema
// ============================================================================

/// The `awxform.toml` document
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwxformConfig {
    /// Server connection
    #[serde(default)]
    pub connection: ConnectionSection,

    /// Client retry policy
    #[serde(default)]
    pub retry: RetrySection,

    /// Read-only lookups
    #[serde(default)]
    pub data: DataSection,

    /// Managed resources
    #[serde(default)]
    pub resource: ResourceSection,
}

impl AwxformConfig {
    /// Load and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Validate the configuration without contacting the server
    pub fn validate(&self) -> Result<()> {
        self.connection.validate()?;

        for (name, lookup) in &self.data.credential {
            lookup
                .validate()
                .with_context(|| format!("Invalid data.credential '{}'", name))?;
        }

        for (name, credential) in &self.resource.credential {
            credential
                .validate()
                .with_context(|| format!("Invalid credential '{}'", name))?;
        }

        let mut links = HashMap::new();
        for (name, link) in &self.resource.job_template_credential {
            link.validate()
                .with_context(|| format!("Invalid job_template_credential '{}'", name))?;
            if let Some(other) = links.insert((link.job_template_id, link.credential_id), name) {
                anyhow::bail!(
                    "job_template_credential '{}' and '{}' both link credential {} to job template {}",
                    other,
                    name,
                    link.credential_id,
                    link.job_template_id
                );
            }
        }

        let mut owners = HashMap::new();
        for (name, survey) in &self.resource.survey {
            survey
                .validate()
                .with_context(|| format!("Invalid survey '{}'", name))?;
            if let Some(other) = owners.insert(survey.job_template_id, name) {
                anyhow::bail!(
                    "surveys '{}' and '{}' both target job template {}",
                    other,
                    name,
                    survey.job_template_id
                );
            }
        }

        Ok(())
    }

    /// Number of declared lookups and resources
    pub fn total_resources(&self) -> usize {
        self.data.credential.len()
            + self.resource.credential.len()
            + self.resource.job_template_credential.len()
            + self.resource.survey.len()
    }
}

// ============================================================================
// Connection
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSection {
    /// Server base URL
    #[serde(default)]
    pub url: Option<String>,

    /// OAuth2 token; takes precedence over username/password
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_true")]
    pub verify_tls: bool,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
            verify_tls: true,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

/// Connection values that take precedence over the file, e.g. from the environment
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub url: Option<String>,
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ConnectionSection {
    /// Layer overrides on top of the file values
    pub fn merge(&mut self, overrides: ConnectionOverrides) {
        if overrides.url.is_some() {
            self.url = overrides.url;
        }
        if overrides.token.is_some() {
            self.token = overrides.token;
        }
        if overrides.username.is_some() {
            self.username = overrides.username;
        }
        if overrides.password.is_some() {
            self.password = overrides.password;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let Some(url) = &self.url else {
            anyhow::bail!("connection.url is not set (use [connection] url or AWX_URL)");
        };
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("connection.url must start with http:// or https://, got '{}'", url);
        }
        if self.username.is_some() != self.password.is_some() && self.token.is_none() {
            anyhow::bail!("connection.username and connection.password must be set together");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("connection.timeout_secs must be greater than zero");
        }
        Ok(())
    }

    fn auth(&self) -> Auth {
        match (&self.token, &self.username, &self.password) {
            (Some(token), _, _) => Auth::Token(token.clone()),
            (None, Some(username), Some(password)) => Auth::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            _ => Auth::None,
        }
    }

    /// Build client connection settings
    pub fn to_config(&self) -> Result<ConnectionConfig> {
        self.validate()?;
        let url = self.url.clone().unwrap_or_default();
        let auth = self.auth();
        if auth == Auth::None {
            log::warn!("No AWX credentials configured, requests will be anonymous");
        }
        Ok(ConnectionConfig::new(url)
            .auth(auth)
            .timeout(Duration::from_secs(self.timeout_secs))
            .verify_tls(self.verify_tls))
    }
}

// ============================================================================
// Retry
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_backoff_factor() -> f64 {
    2.0
}

impl RetrySection {
    pub fn to_config(&self) -> RetryConfig {
        RetryConfig::new(
            self.max_attempts.max(1),
            Duration::from_millis(self.base_delay_ms),
            self.backoff_factor,
        )
    }
}

// ============================================================================
// Lookups
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataSection {
    #[serde(default)]
    pub credential: BTreeMap<String, CredentialLookupConfig>,
}

/// `[data.credential.<name>]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialLookupConfig {
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub name: Option<String>,

    /// Restrict the lookup to one organization
    #[serde(default)]
    pub organization_id: Option<i64>,
}

impl CredentialLookupConfig {
    pub fn validate(&self) -> Result<()> {
        if self.id.is_none() && self.name.is_none() {
            anyhow::bail!("one of `id` or `name` must be set");
        }
        Ok(())
    }

    pub fn desired(&self) -> CredentialLookupState {
        CredentialLookupState::select(self.id, self.name.clone(), self.organization_id)
    }
}

// ============================================================================
// Resources
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceSection {
    #[serde(default)]
    pub credential: BTreeMap<String, CredentialConfig>,

    #[serde(default)]
    pub job_template_credential: BTreeMap<String, JobTemplateCredentialConfig>,

    #[serde(default)]
    pub survey: BTreeMap<String, SurveyConfig>,
}

/// `[resource.credential.<name>]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub organization_id: Option<i64>,

    pub credential_type_id: i64,

    /// Type-specific inputs, e.g. `username`, `password`, `ssh_key_data`
    #[serde(default)]
    pub inputs: Map<String, Value>,
}

impl CredentialConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("Credential name cannot be empty");
        }
        if self.credential_type_id <= 0 {
            anyhow::bail!("credential_type_id must be a positive id");
        }
        Ok(())
    }

    pub fn desired(&self) -> CredentialState {
        CredentialState {
            name: self.name.clone(),
            description: self.description.clone(),
            organization_id: self.organization_id,
            credential_type_id: self.credential_type_id,
            inputs: self.inputs.clone(),
            ..Default::default()
        }
    }
}

/// `[resource.job_template_credential.<name>]`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobTemplateCredentialConfig {
    pub job_template_id: i64,
    pub credential_id: i64,
}

impl JobTemplateCredentialConfig {
    pub fn validate(&self) -> Result<()> {
        if self.job_template_id <= 0 || self.credential_id <= 0 {
            anyhow::bail!("job_template_id and credential_id must be positive ids");
        }
        Ok(())
    }

    pub fn desired(&self) -> JobTemplateCredentialState {
        JobTemplateCredentialState {
            job_template_id: self.job_template_id,
            credential_id: self.credential_id,
        }
    }
}

/// `[resource.survey.<name>]` with its `[[...spec]]` questions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurveyConfig {
    pub job_template_id: i64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub spec: Vec<Question>,
}

impl SurveyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.job_template_id <= 0 {
            anyhow::bail!("job_template_id must be a positive id");
        }

        let mut variables = BTreeSet::new();
        for question in &self.spec {
            question
                .question_type
                .parse::<QuestionType>()
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("Invalid type for question '{}'", question.variable))?;
            if question.variable.is_empty() {
                anyhow::bail!("Question '{}' has an empty variable", question.question_name);
            }
            if !variables.insert(question.variable.as_str()) {
                anyhow::bail!("Variable '{}' is asked more than once", question.variable);
            }
            if question.min > question.max {
                anyhow::bail!(
                    "Question '{}' has min {} greater than max {}",
                    question.variable,
                    question.min,
                    question.max
                );
            }
        }
        Ok(())
    }

    pub fn desired(&self) -> SurveyState {
        SurveyState {
            job_template_id: self.job_template_id,
            name: self.name.clone(),
            description: self.description.clone(),
            spec: self.spec.iter().cloned().collect(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
[connection]
url = "https://awx.example.com"
token = "abc"

[retry]
max_attempts = 5

[data.credential.svc]
name = "svc-account"
organization_id = 1

[resource.credential.deploy]
name = "deploy"
credential_type_id = 1
organization_id = 1
inputs = { username = "deploy", password = "hunter2" }

[resource.job_template_credential.deploy]
job_template_id = 7
credential_id = 9

[resource.survey.deploy]
job_template_id = 7
name = "Deploy"

[[resource.survey.deploy.spec]]
question_name = "Target"
required = true
variable = "target"
type = "multiplechoice"
choices = "dev\nprod"
default = "dev"

[[resource.survey.deploy.spec]]
question_name = "Replicas"
variable = "replicas"
type = "integer"
min = 1
max = 10
"#;

    #[test]
    fn test_parse_example_config() {
        let config: AwxformConfig = toml::from_str(EXAMPLE).expect("Failed to parse config");

        assert_eq!(config.connection.url.as_deref(), Some("https://awx.example.com"));
        assert_eq!(config.connection.timeout_secs, 30);
        assert!(config.connection.verify_tls);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 500);

        let svc = &config.data.credential["svc"];
        assert_eq!(svc.name.as_deref(), Some("svc-account"));
        assert_eq!(svc.organization_id, Some(1));

        let deploy = &config.resource.credential["deploy"];
        assert_eq!(deploy.inputs["username"], "deploy");

        let survey = &config.resource.survey["deploy"];
        assert_eq!(survey.spec.len(), 2);
        assert_eq!(survey.spec[0].choices, "dev\nprod");
        assert_eq!(survey.spec[1].max, 10);
        assert_eq!(survey.spec[0].max, 1024);

        assert_eq!(config.total_resources(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let toml = r#"
[resource.credential.deploy]
name = "deploy"
credential_type_id = 1
colour = "blue"
"#;
        assert!(toml::from_str::<AwxformConfig>(toml).is_err());
    }

    #[test]
    fn test_connection_validation() {
        let mut connection = ConnectionSection::default();
        assert!(connection.validate().is_err());

        connection.url = Some("awx.example.com".into());
        assert!(connection.validate().is_err());

        connection.url = Some("https://awx.example.com".into());
        assert!(connection.validate().is_ok());

        connection.username = Some("admin".into());
        assert!(connection.validate().is_err());

        connection.password = Some("secret".into());
        let config = connection.to_config().unwrap();
        assert!(matches!(config.auth, Auth::Basic { .. }));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut connection = ConnectionSection {
            url: Some("https://file.example.com".into()),
            token: Some("file".into()),
            ..Default::default()
        };
        connection.merge(ConnectionOverrides {
            token: Some("env".into()),
            ..Default::default()
        });
        assert_eq!(connection.url.as_deref(), Some("https://file.example.com"));
        assert_eq!(connection.auth(), Auth::Token("env".into()));
    }

    #[test]
    fn test_survey_validation() {
        let mut config: AwxformConfig = toml::from_str(EXAMPLE).unwrap();
        let survey = config.resource.survey.get_mut("deploy").unwrap();
        survey.spec[1].question_type = "textarea".into();
        let err = config.validate().unwrap_err();
        assert!(format!("{err:#}").contains("textarea"));

        let mut config: AwxformConfig = toml::from_str(EXAMPLE).unwrap();
        let survey = config.resource.survey.get_mut("deploy").unwrap();
        survey.spec[1].variable = "target".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_two_surveys_on_one_job_template() {
        let mut config: AwxformConfig = toml::from_str(EXAMPLE).unwrap();
        let copy = config.resource.survey["deploy"].clone();
        config.resource.survey.insert("again".into(), copy);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("job template 7"));
    }

    #[test]
    fn test_lookup_needs_a_selector() {
        let lookup = CredentialLookupConfig {
            organization_id: Some(1),
            ..Default::default()
        };
        assert!(lookup.validate().is_err());
    }

    #[test]
    fn test_desired_states() {
        let config: AwxformConfig = toml::from_str(EXAMPLE).unwrap();
        let survey = config.resource.survey["deploy"].desired();
        assert_eq!(survey.job_template_id, 7);
        assert_eq!(survey.spec.len(), 2);

        let link = config.resource.job_template_credential["deploy"].desired();
        assert_eq!((link.job_template_id, link.credential_id), (7, 9));

        let credential = config.resource.credential["deploy"].desired();
        assert_eq!(credential.id, None);
        assert_eq!(credential.credential_type_id, 1);
    }
}
