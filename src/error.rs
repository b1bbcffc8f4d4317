//! Reconciliation error taxonomy
//!
//! Every variant maps to a short, stable summary plus a detail string so
//! the framework can turn it into a [`Diagnostic`](declarative::Diagnostic).

use declarative::Diagnose;

/// Errors raised by the resource reconcilers
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Neither `id` nor `name` was given to a lookup.
    #[error("one of `id` or `name` must be set to look up a {resource}")]
    MissingSelector { resource: &'static str },

    /// A lookup matched more than one object.
    #[error("found {count} {resource}s matching {filters}, expected exactly one")]
    AmbiguousResult {
        resource: &'static str,
        count: usize,
        filters: String,
    },

    /// A lookup or read matched nothing.
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// An identity string does not have the expected shape.
    #[error("unexpected format of ID ({id:?}), expected {expected}")]
    MalformedIdentity { id: String, expected: &'static str },

    /// The job template owning an association or survey is gone.
    #[error("job template {job_template_id} could not be fetched: {source}")]
    ParentNotFound {
        job_template_id: i64,
        #[source]
        source: awxkit::Error,
    },

    #[error("failed to associate credential {credential_id} with job template {job_template_id}: {source}")]
    AssociateFailed {
        job_template_id: i64,
        credential_id: i64,
        #[source]
        source: awxkit::Error,
    },

    #[error("failed to disassociate credential {credential_id} from job template {job_template_id}: {source}")]
    DisassociateFailed {
        job_template_id: i64,
        credential_id: i64,
        #[source]
        source: awxkit::Error,
    },

    /// The association list returned more than one row for one credential.
    #[error("job template {job_template_id} lists credential {credential_id} {count} times")]
    AmbiguousAssociation {
        job_template_id: i64,
        credential_id: i64,
        count: usize,
    },

    #[error("failed to create {resource}: {source}")]
    CreateFailed {
        resource: String,
        #[source]
        source: awxkit::Error,
    },

    #[error("failed to update {resource}: {source}")]
    UpdateFailed {
        resource: String,
        #[source]
        source: awxkit::Error,
    },

    #[error("failed to delete {resource}: {source}")]
    DeleteFailed {
        resource: String,
        #[source]
        source: awxkit::Error,
    },

    /// A survey question could not be mapped between local and remote shape.
    #[error("survey spec of job template {job_template_id}, question {index}: {message}")]
    SpecDecode {
        job_template_id: i64,
        index: usize,
        message: String,
    },

    /// A survey question uses a type outside the accepted set.
    #[error("survey question {variable:?}: type {message}")]
    InvalidQuestionType { variable: String, message: String },

    /// Any other client failure while looking something up.
    #[error("{what}: {source}")]
    UpstreamLookupFailed {
        what: String,
        #[source]
        source: awxkit::Error,
    },
}

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

impl ReconcileError {
    /// Whether the error means the object is absent remotely.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Diagnose for ReconcileError {
    fn summary(&self) -> String {
        let summary = match self {
            Self::MissingSelector { .. } => "Missing parameters",
            Self::AmbiguousResult { .. } => "More than one element found",
            Self::NotFound { .. } => "Not found",
            Self::MalformedIdentity { .. } => "Malformed identity",
            Self::ParentNotFound { .. } => "Job template not found",
            Self::AssociateFailed { .. } => "Associate credential failed",
            Self::DisassociateFailed { .. } => "Disassociate credential failed",
            Self::AmbiguousAssociation { .. } => "Ambiguous association",
            Self::CreateFailed { .. } => "Create failed",
            Self::UpdateFailed { .. } => "Update failed",
            Self::DeleteFailed { .. } => "Delete failed",
            Self::SpecDecode { .. } => "Survey spec decode error",
            Self::InvalidQuestionType { .. } => "Invalid survey question type",
            Self::UpstreamLookupFailed { .. } => "Lookup failed",
        };
        summary.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::Diagnostics;

    #[test]
    fn test_detail_names_both_ids() {
        let err = ReconcileError::AssociateFailed {
            job_template_id: 7,
            credential_id: 9,
            source: awxkit::Error::http(400, "Credential with id 9 does not exist"),
        };
        let detail = err.detail();
        assert!(detail.contains("job template 7"));
        assert!(detail.contains("credential 9"));
        assert!(detail.contains("does not exist"));
    }

    #[test]
    fn test_upstream_message_is_verbatim() {
        let err = ReconcileError::UpstreamLookupFailed {
            what: "list credentials".into(),
            source: awxkit::Error::http(403, "You do not have permission to perform this action."),
        };
        assert!(
            err.to_string()
                .ends_with("HTTP 403: You do not have permission to perform this action.")
        );
    }

    #[test]
    fn test_into_diagnostic() {
        let err = ReconcileError::MalformedIdentity {
            id: "abc".into(),
            expected: "<job_template_id>-<credential_id>",
        };
        let diags = Diagnostics::from_error(&err);
        let first = diags.first_error().unwrap();
        assert_eq!(first.summary, "Malformed identity");
        assert!(first.detail.contains("<job_template_id>-<credential_id>"));
        assert!(first.detail.contains("\"abc\""));
    }
}
