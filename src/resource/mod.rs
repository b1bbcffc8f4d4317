//! AWX resource reconcilers
//!
//! Each module implements [`declarative::Reconciler`] for one resource kind:
//! - `data.credential` - read-only credential lookup
//! - `credential` - managed credential
//! - `job_template_credential` - job template ↔ credential link
//! - `survey` - survey spec of a job template

pub mod credential;
pub mod credential_lookup;
pub mod job_template_credential;
pub mod survey;

pub use credential::{CredentialReconciler, CredentialState};
pub use credential_lookup::{CredentialLookup, CredentialLookupState};
pub use job_template_credential::{JobTemplateCredential, JobTemplateCredentialState};
pub use survey::{Question, SurveyReconciler, SurveyState};

/// Context handed to every AWX reconciler.
pub type AwxContext<'a> = declarative::ApplyContext<'a, awxkit::Client>;

/// Resource type names accepted in addresses.
pub const RESOURCE_TYPES: &[&str] = &[
    credential_lookup::TYPE_NAME,
    credential::TYPE_NAME,
    job_template_credential::TYPE_NAME,
    survey::TYPE_NAME,
];

#[cfg(test)]
pub(crate) mod testing {
    use awxkit::{Client, MockBackend, RetryConfig};

    /// Client over a shared mock, without retries.
    pub fn client(mock: &MockBackend) -> Client {
        Client::with_backend(Box::new(mock.clone())).with_retry(RetryConfig::no_retry())
    }
}
