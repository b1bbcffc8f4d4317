//! Managed credential

use awxkit::{Credential, CredentialRequest};
use declarative::{LocalState, Observed, Reconciler};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::AwxContext;
use crate::error::{ReconcileError, Result};
use crate::identity;
use crate::lookup::{self, Selectors};

pub const TYPE_NAME: &str = "credential";

/// Placeholder the server returns in place of secret inputs.
const ENCRYPTED: &str = "$encrypted$";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialState {
    /// Server-assigned id (computed)
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub organization_id: Option<i64>,
    pub credential_type_id: i64,
    pub inputs: Map<String, Value>,
    /// Derived from the credential type (computed)
    pub kind: String,
    /// Copy of the `username` input (computed)
    pub username: String,
}

impl CredentialState {
    fn request(&self) -> CredentialRequest {
        CredentialRequest {
            name: self.name.clone(),
            description: self.description.clone(),
            organization: self.organization_id,
            credential_type: self.credential_type_id,
            inputs: self.inputs.clone(),
        }
    }

    /// State as observed remotely; secrets keep their local value.
    fn observed(credential: &Credential, local: &Self) -> Self {
        Self {
            id: Some(credential.id),
            name: credential.name.clone(),
            description: credential.description.clone(),
            organization_id: credential.organization,
            credential_type_id: credential.credential_type,
            inputs: merge_secrets(&credential.inputs, &local.inputs),
            kind: credential.kind.clone(),
            username: credential.username().unwrap_or_default().to_string(),
        }
    }

    fn label(&self) -> String {
        format!("credential {:?}", self.name)
    }
}

impl LocalState for CredentialState {
    fn carry_computed(&mut self, observed: &Self) {
        self.id = observed.id;
        self.kind = observed.kind.clone();
        self.username = observed.username.clone();
    }
}

fn merge_secrets(remote: &Map<String, Value>, local: &Map<String, Value>) -> Map<String, Value> {
    remote
        .iter()
        .map(|(key, value)| {
            let kept = match (value.as_str(), local.get(key)) {
                (Some(ENCRYPTED), Some(known)) => known.clone(),
                _ => value.clone(),
            };
            (key.clone(), kept)
        })
        .collect()
}

pub struct CredentialReconciler;

impl Reconciler for CredentialReconciler {
    type State = CredentialState;
    type Client = awxkit::Client;
    type Error = ReconcileError;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn create(&self, ctx: &AwxContext<'_>, desired: &CredentialState) -> Result<(String, CredentialState)> {
        let created = ctx
            .client
            .create_credential(&desired.request())
            .map_err(|source| ReconcileError::CreateFailed {
                resource: desired.label(),
                source,
            })?;
        log::debug!("Credential {:?} got id {}", created.name, created.id);
        Ok((created.id.to_string(), CredentialState::observed(&created, desired)))
    }

    fn read(&self, ctx: &AwxContext<'_>, id: &str, current: &CredentialState) -> Result<Observed<CredentialState>> {
        let id = identity::parse_numeric(id, "<credential_id>")?;
        match lookup::resolve_credential(ctx.client, &Selectors::by_id(id), None) {
            Ok(found) => Ok(Observed::Present(CredentialState::observed(&found, current))),
            Err(e) if e.is_not_found() => Ok(Observed::Absent),
            Err(e) => Err(e),
        }
    }

    fn update(
        &self,
        ctx: &AwxContext<'_>,
        id: &str,
        _current: &CredentialState,
        desired: &CredentialState,
    ) -> Result<CredentialState> {
        let numeric = identity::parse_numeric(id, "<credential_id>")?;
        ctx.client
            .update_credential(numeric, &desired.request())
            .map_err(|source| ReconcileError::UpdateFailed {
                resource: desired.label(),
                source,
            })?;

        match self.read(ctx, id, desired)? {
            Observed::Present(state) => Ok(state),
            Observed::Absent => Err(ReconcileError::NotFound {
                resource: format!("credential {numeric}"),
            }),
        }
    }

    fn delete(&self, ctx: &AwxContext<'_>, id: &str, current: &CredentialState) -> Result<()> {
        let numeric = identity::parse_numeric(id, "<credential_id>")?;
        match ctx.client.delete_credential(numeric) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                log::debug!("Credential {numeric} was already gone");
                Ok(())
            }
            Err(source) => Err(ReconcileError::DeleteFailed {
                resource: current.label(),
                source,
            }),
        }
    }

    fn import(&self, id: &str) -> Result<CredentialState> {
        let id = identity::parse_numeric(id, "<credential_id>")?;
        Ok(CredentialState {
            id: Some(id),
            ..Default::default()
        })
    }

    fn force_new(&self, old: &CredentialState, new: &CredentialState) -> bool {
        old.credential_type_id != new.credential_type_id || old.organization_id != new.organization_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::client;
    use awxkit::MockBackend;
    use declarative::{Action, ApplyContext, ApplyResult, Managed, Resource};
    use serde_json::json;

    fn deploy() -> CredentialState {
        let inputs = json!({"username": "deploy", "password": "hunter2"});
        CredentialState {
            name: "deploy".into(),
            description: "deploy key".into(),
            organization_id: Some(1),
            credential_type_id: 1,
            inputs: inputs.as_object().cloned().unwrap_or_default(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_fills_computed_fields() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let (id, state) = CredentialReconciler.create(&ctx, &deploy()).unwrap();
        assert_eq!(id, "1");
        assert_eq!(state.id, Some(1));
        assert_eq!(state.kind, "ssh");
        assert_eq!(state.username, "deploy");
        // Secret comes back encrypted but the local value is kept.
        assert_eq!(state.inputs["password"], "hunter2");
        assert_eq!(mock.credential(1).unwrap().inputs["password"], ENCRYPTED);
    }

    #[test]
    fn test_create_failure() {
        let mock = MockBackend::new();
        mock.fail_on("create_credential", awxkit::Error::http(400, "name: This field may not be blank."));
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let err = CredentialReconciler.create(&ctx, &deploy()).unwrap_err();
        assert!(matches!(err, ReconcileError::CreateFailed { .. }));
        assert!(err.to_string().contains("may not be blank"));
    }

    #[test]
    fn test_read_vanished_credential_is_absent() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let observed = CredentialReconciler.read(&ctx, "7", &deploy()).unwrap();
        assert_eq!(observed, Observed::Absent);

        let err = CredentialReconciler.read(&ctx, "seven", &deploy()).unwrap_err();
        assert!(matches!(err, ReconcileError::MalformedIdentity { .. }));
    }

    #[test]
    fn test_unchanged_credential_plans_noop() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let (id, state) = CredentialReconciler.create(&ctx, &deploy()).unwrap();
        let mut resource = Managed::new(CredentialReconciler, "deploy")
            .with_prior(id, state)
            .with_desired(deploy());
        assert!(resource.refresh(&ctx).is_empty());
        assert_eq!(resource.planned_action(), Action::NoOp);
    }

    #[test]
    fn test_description_change_updates_in_place() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let (id, state) = CredentialReconciler.create(&ctx, &deploy()).unwrap();
        let desired = CredentialState {
            description: "rotated".into(),
            ..deploy()
        };
        let mut resource = Managed::new(CredentialReconciler, "deploy")
            .with_prior(id, state)
            .with_desired(desired);
        assert_eq!(resource.planned_action(), Action::Update);

        let (result, diags) = resource.apply(&ctx);
        assert!(diags.is_empty());
        assert_eq!(result, ApplyResult::Updated);
        assert_eq!(mock.credential(1).unwrap().description, "rotated");
        assert!(mock.operations().ends_with(&["update_credential", "list_credentials"]));
    }

    #[test]
    fn test_type_change_forces_replacement() {
        let old = deploy();
        let new = CredentialState {
            credential_type_id: 2,
            ..deploy()
        };
        assert!(CredentialReconciler.force_new(&old, &new));

        let moved = CredentialState {
            organization_id: Some(2),
            ..deploy()
        };
        assert!(CredentialReconciler.force_new(&old, &moved));

        let renamed = CredentialState {
            name: "deploy2".into(),
            ..deploy()
        };
        assert!(!CredentialReconciler.force_new(&old, &renamed));
    }

    #[test]
    fn test_delete_tolerates_missing() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        assert!(CredentialReconciler.delete(&ctx, "9", &deploy()).is_ok());

        mock.fail_on("delete_credential", awxkit::Error::http(409, "in use"));
        let err = CredentialReconciler.delete(&ctx, "9", &deploy()).unwrap_err();
        assert!(matches!(err, ReconcileError::DeleteFailed { .. }));
    }

    #[test]
    fn test_import_reads_back() {
        let mock = MockBackend::new();
        mock.add_credential(5, "legacy", "ssh", Some("root"));
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let mut resource = Managed::new(CredentialReconciler, "legacy");
        assert!(resource.import(&ctx, "5").is_empty());
        let state = resource.data().state();
        assert_eq!(state.name, "legacy");
        assert_eq!(state.username, "root");
        assert_eq!(resource.data().id(), Some("5"));
    }
}
