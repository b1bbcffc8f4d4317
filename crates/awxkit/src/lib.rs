//! # awxkit
//!
//! Blocking Rust client for the AWX / Ansible Tower v2 REST API.
//!
//! This crate provides:
//! - Typed records for credentials, job templates and survey specs
//! - A [`Backend`](backend::Backend) trait with an HTTP implementation and an
//!   in-memory mock for tests
//! - Retries with exponential backoff for transient failures
//! - Cooperative cancellation through [`CancelToken`]
//!
//! ## Example
//!
//! ```no_run
//! use awxkit::{Auth, Client, ConnectionConfig, Filters};
//!
//! let config = ConnectionConfig::new("https://awx.example.com")
//!     .auth(Auth::Token("secret".to_string()));
//! let client = Client::new(&config).expect("invalid connection settings");
//!
//! let mut filters = Filters::new();
//! filters.insert("name".to_string(), "deploy-key".to_string());
//! let (found, meta) = client.list_credentials(&filters).unwrap();
//! println!("{} match(es), first id {:?}", meta.count, found.first().map(|c| c.id));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod cancel;
pub mod error;
pub mod retry;
pub mod types;

pub use cancel::CancelToken;
pub use error::{Error, ErrorCategory, Result};
pub use types::{
    AssociationRequest, Auth, ConnectionConfig, Credential, CredentialRequest, Filters,
    JobTemplate, ListMeta, QuestionType, RetryConfig, Survey, SurveyQuestion,
};

pub use backend::MockBackend;
use backend::Backend;
use backend::http::HttpBackend;
use retry::{LogCallback, with_retry};

/// High-level AWX client.
///
/// Wraps a [`Backend`] with retries and cancellation. Every call checks the
/// cancel token before each attempt, so a tripped token stops retry loops as
/// well as fresh requests.
///
/// # Example
///
/// ```
/// use awxkit::{Client, MockBackend, RetryConfig};
///
/// let mock = MockBackend::new();
/// mock.add_job_template(7, "deploy");
///
/// let client = Client::with_backend(Box::new(mock)).with_retry(RetryConfig::no_retry());
/// assert_eq!(client.get_job_template(7, &Default::default()).unwrap().name, "deploy");
/// ```
pub struct Client {
    backend: Box<dyn Backend>,
    retry: RetryConfig,
    cancel: CancelToken,
}

impl Client {
    /// Create a client backed by the HTTP API.
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        Ok(Self::with_backend(Box::new(HttpBackend::new(config)?)))
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            retry: RetryConfig::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The token checked before every request.
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    fn call<T>(&self, mut operation: impl FnMut(&dyn Backend) -> Result<T>) -> Result<T> {
        with_retry(&self.retry, Some(&LogCallback), || {
            self.cancel.check()?;
            operation(self.backend.as_ref())
        })
    }

    fn call_once<T>(&self, operation: impl FnOnce(&dyn Backend) -> Result<T>) -> Result<T> {
        self.cancel.check()?;
        operation(self.backend.as_ref())
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    /// List credentials matching all `filters`.
    pub fn list_credentials(&self, filters: &Filters) -> Result<(Vec<Credential>, ListMeta)> {
        self.call(|b| b.list_credentials(filters))
    }

    /// Fetch one credential.
    pub fn get_credential(&self, id: i64) -> Result<Credential> {
        self.call(|b| b.get_credential(id))
    }

    /// Create a credential.
    ///
    /// Not retried: a request that timed out may still have created the object.
    pub fn create_credential(&self, request: &CredentialRequest) -> Result<Credential> {
        self.call_once(|b| b.create_credential(request))
    }

    /// Patch a credential in place.
    pub fn update_credential(&self, id: i64, request: &CredentialRequest) -> Result<Credential> {
        self.call(|b| b.update_credential(id, request))
    }

    /// Delete a credential.
    pub fn delete_credential(&self, id: i64) -> Result<()> {
        self.call(|b| b.delete_credential(id))
    }

    // =========================================================================
    // Job templates
    // =========================================================================

    /// Fetch one job template.
    pub fn get_job_template(&self, id: i64, filters: &Filters) -> Result<JobTemplate> {
        self.call(|b| b.get_job_template(id, filters))
    }

    /// List credentials attached to a job template.
    pub fn list_job_template_credentials(
        &self,
        job_template_id: i64,
        filters: &Filters,
    ) -> Result<(Vec<Credential>, ListMeta)> {
        self.call(|b| b.list_job_template_credentials(job_template_id, filters))
    }

    /// Attach a credential to a job template.
    pub fn associate_credential(&self, job_template_id: i64, credential_id: i64) -> Result<()> {
        let request = AssociationRequest::associate(credential_id);
        self.call(|b| b.associate_credential(job_template_id, &request))
    }

    /// Detach a credential from a job template.
    pub fn disassociate_credential(&self, job_template_id: i64, credential_id: i64) -> Result<()> {
        let request = AssociationRequest::disassociate(credential_id);
        self.call(|b| b.disassociate_credential(job_template_id, &request))
    }

    // =========================================================================
    // Surveys
    // =========================================================================

    /// Replace the survey of a job template.
    pub fn post_survey(&self, job_template_id: i64, survey: &Survey) -> Result<()> {
        self.call(|b| b.post_survey(job_template_id, survey))
    }

    /// Fetch the survey of a job template.
    pub fn get_survey(&self, job_template_id: i64) -> Result<Survey> {
        self.call(|b| b.get_survey(job_template_id))
    }

    /// Remove the survey of a job template.
    pub fn delete_survey(&self, job_template_id: i64) -> Result<()> {
        self.call(|b| b.delete_survey(job_template_id))
    }
}
