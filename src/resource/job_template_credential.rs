//! Association of a credential with a job template
//!
//! The link itself has no attributes beyond the two ids, so every change is
//! a replacement: disassociate the old pair, associate the new one.

use awxkit::Filters;
use declarative::{LocalState, Observed, Reconciler};
use serde::{Deserialize, Serialize};

use super::AwxContext;
use crate::error::{ReconcileError, Result};
use crate::identity;

pub const TYPE_NAME: &str = "job_template_credential";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTemplateCredentialState {
    pub job_template_id: i64,
    pub credential_id: i64,
}

impl LocalState for JobTemplateCredentialState {}

pub struct JobTemplateCredential;

/// Fail loudly when the owning job template cannot be fetched.
fn require_parent(ctx: &AwxContext<'_>, job_template_id: i64) -> Result<()> {
    ctx.client
        .get_job_template(job_template_id, &Filters::new())
        .map(|_| ())
        .map_err(|source| ReconcileError::ParentNotFound {
            job_template_id,
            source,
        })
}

impl Reconciler for JobTemplateCredential {
    type State = JobTemplateCredentialState;
    type Client = awxkit::Client;
    type Error = ReconcileError;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn create(
        &self,
        ctx: &AwxContext<'_>,
        desired: &JobTemplateCredentialState,
    ) -> Result<(String, JobTemplateCredentialState)> {
        let JobTemplateCredentialState {
            job_template_id,
            credential_id,
        } = *desired;

        require_parent(ctx, job_template_id)?;
        ctx.client
            .associate_credential(job_template_id, credential_id)
            .map_err(|source| ReconcileError::AssociateFailed {
                job_template_id,
                credential_id,
                source,
            })?;

        Ok((identity::encode(job_template_id, credential_id), *desired))
    }

    fn read(
        &self,
        ctx: &AwxContext<'_>,
        id: &str,
        _current: &JobTemplateCredentialState,
    ) -> Result<Observed<JobTemplateCredentialState>> {
        let (job_template_id, credential_id) = identity::decode(id)?;

        let mut filters = Filters::new();
        filters.insert("id".to_string(), credential_id.to_string());
        let (found, _) = ctx
            .client
            .list_job_template_credentials(job_template_id, &filters)
            .map_err(|source| ReconcileError::UpstreamLookupFailed {
                what: format!(
                    "failed to fetch credential {credential_id} of job template {job_template_id}"
                ),
                source,
            })?;

        match found.len() {
            0 => Ok(Observed::Absent),
            1 => Ok(Observed::Present(JobTemplateCredentialState {
                job_template_id,
                credential_id,
            })),
            count => Err(ReconcileError::AmbiguousAssociation {
                job_template_id,
                credential_id,
                count,
            }),
        }
    }

    fn update(
        &self,
        _ctx: &AwxContext<'_>,
        _id: &str,
        current: &JobTemplateCredentialState,
        _desired: &JobTemplateCredentialState,
    ) -> Result<JobTemplateCredentialState> {
        Ok(*current)
    }

    fn delete(&self, ctx: &AwxContext<'_>, id: &str, _current: &JobTemplateCredentialState) -> Result<()> {
        let (job_template_id, credential_id) = identity::decode(id)?;

        require_parent(ctx, job_template_id)?;
        match ctx
            .client
            .disassociate_credential(job_template_id, credential_id)
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(source) => Err(ReconcileError::DisassociateFailed {
                job_template_id,
                credential_id,
                source,
            }),
        }
    }

    fn import(&self, id: &str) -> Result<JobTemplateCredentialState> {
        let (job_template_id, credential_id) = identity::decode(id)?;
        Ok(JobTemplateCredentialState {
            job_template_id,
            credential_id,
        })
    }

    fn force_new(&self, old: &JobTemplateCredentialState, new: &JobTemplateCredentialState) -> bool {
        old != new
    }
}
