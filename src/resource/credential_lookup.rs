//! Credential lookup - resolve an existing credential by id or name

use declarative::{LocalState, Observed, Reconciler};
use serde::{Deserialize, Serialize};

use super::AwxContext;
use crate::error::{ReconcileError, Result};
use crate::identity;
use crate::lookup::{self, Scope, Selectors};

pub const TYPE_NAME: &str = "data.credential";

/// Declared selectors plus the attributes read back from the server
///
/// `selector_id`/`selector_name` are what the configuration asked for and
/// drive every resolve. `id`/`name` describe the match and follow the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialLookupState {
    pub selector_id: Option<i64>,
    pub selector_name: Option<String>,
    pub organization_id: Option<i64>,
    pub id: Option<i64>,
    pub name: Option<String>,
    pub username: String,
    pub kind: String,
}

impl CredentialLookupState {
    pub fn select(id: Option<i64>, name: Option<String>, organization_id: Option<i64>) -> Self {
        Self {
            selector_id: id,
            selector_name: name,
            organization_id,
            ..Default::default()
        }
    }

    fn selectors(&self) -> Selectors {
        // Records written before selectors were kept apart only know the match.
        if self.selector_id.is_none() && self.selector_name.is_none() {
            return Selectors {
                id: self.id,
                name: None,
            };
        }
        Selectors {
            id: self.selector_id,
            name: self.selector_name.clone(),
        }
    }

    fn same_selection(&self, other: &Self) -> bool {
        self.selector_id == other.selector_id
            && self.selector_name == other.selector_name
            && self.organization_id == other.organization_id
    }
}

impl LocalState for CredentialLookupState {
    fn carry_computed(&mut self, observed: &Self) {
        self.id = observed.id;
        self.name = observed.name.clone();
        self.username = observed.username.clone();
        self.kind = observed.kind.clone();
    }

    fn vacate(&mut self) {
        *self = Self::select(self.selector_id, self.selector_name.take(), self.organization_id);
    }
}

/// Read-only reconciler: create and read both resolve the declared selectors
pub struct CredentialLookup;

impl CredentialLookup {
    fn resolve(ctx: &AwxContext<'_>, wanted: &CredentialLookupState) -> Result<CredentialLookupState> {
        let scope = wanted.organization_id.map(Scope::organization);
        let credential = lookup::resolve_credential(ctx.client, &wanted.selectors(), scope)?;
        Ok(CredentialLookupState {
            id: Some(credential.id),
            name: Some(credential.name.clone()),
            username: credential.username().unwrap_or_default().to_string(),
            kind: credential.kind,
            ..Self::selection_of(wanted)
        })
    }

    fn selection_of(wanted: &CredentialLookupState) -> CredentialLookupState {
        CredentialLookupState::select(wanted.selector_id, wanted.selector_name.clone(), wanted.organization_id)
    }
}

impl Reconciler for CredentialLookup {
    type State = CredentialLookupState;
    type Client = awxkit::Client;
    type Error = ReconcileError;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn create(
        &self,
        ctx: &AwxContext<'_>,
        desired: &CredentialLookupState,
    ) -> Result<(String, CredentialLookupState)> {
        let state = Self::resolve(ctx, desired)?;
        let id = state.id.unwrap_or_default().to_string();
        Ok((id, state))
    }

    fn read(
        &self,
        ctx: &AwxContext<'_>,
        _id: &str,
        current: &CredentialLookupState,
    ) -> Result<Observed<CredentialLookupState>> {
        match Self::resolve(ctx, current) {
            Ok(state) => Ok(Observed::Present(state)),
            Err(e) if e.is_not_found() => Ok(Observed::Absent),
            Err(e) => Err(e),
        }
    }

    fn update(
        &self,
        ctx: &AwxContext<'_>,
        _id: &str,
        _current: &CredentialLookupState,
        desired: &CredentialLookupState,
    ) -> Result<CredentialLookupState> {
        Self::resolve(ctx, desired)
    }

    fn delete(&self, _ctx: &AwxContext<'_>, id: &str, _current: &CredentialLookupState) -> Result<()> {
        log::debug!("Forgetting credential lookup {id}");
        Ok(())
    }

    fn import(&self, id: &str) -> Result<CredentialLookupState> {
        let id = identity::parse_numeric(id, "<credential_id>")?;
        Ok(CredentialLookupState {
            id: Some(id),
            ..CredentialLookupState::select(Some(id), None, None)
        })
    }

    fn force_new(&self, old: &CredentialLookupState, new: &CredentialLookupState) -> bool {
        !old.same_selection(new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::client;
    use awxkit::MockBackend;
    use declarative::{Action, ApplyContext, Managed, Resource, ResourceData, lifecycle};

    fn by_name(name: &str) -> CredentialLookupState {
        CredentialLookupState::select(None, Some(name.into()), None)
    }

    fn by_id(id: i64) -> CredentialLookupState {
        CredentialLookupState::select(Some(id), None, None)
    }

    #[test]
    fn test_lookup_by_name() {
        let mock = MockBackend::new();
        mock.add_credential(42, "svc-account", "ssh", Some("svc"));
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let mut data = ResourceData::new();
        let diags = lifecycle::create(&CredentialLookup, &ctx, &mut data, &by_name("svc-account"));
        assert!(diags.is_empty());
        assert_eq!(data.id(), Some("42"));
        assert_eq!(data.state().id, Some(42));
        assert_eq!(data.state().kind, "ssh");
        assert_eq!(data.state().username, "svc");
        assert_eq!(data.state().name.as_deref(), Some("svc-account"));
    }

    #[test]
    fn test_lookup_without_selectors() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let err = CredentialLookup
            .create(&ctx, &CredentialLookupState::default())
            .unwrap_err();
        assert!(matches!(err, ReconcileError::MissingSelector { .. }));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_lookup_ambiguous_and_missing() {
        let mock = MockBackend::new();
        mock.add_credential(1, "dup", "ssh", None);
        mock.add_credential(2, "dup", "ssh", None);
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let mut data = ResourceData::new();
        let diags = lifecycle::create(&CredentialLookup, &ctx, &mut data, &by_name("dup"));
        assert_eq!(diags.first_error().unwrap().summary, "More than one element found");
        assert!(!data.is_present());

        let err = CredentialLookup.create(&ctx, &by_name("nope")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_lookup_scoped_to_organization() {
        let mock = MockBackend::new();
        mock.insert_credential(awxkit::Credential {
            organization: Some(3),
            ..sample(10, "shared")
        });
        mock.insert_credential(awxkit::Credential {
            organization: Some(4),
            ..sample(11, "shared")
        });
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let wanted = CredentialLookupState {
            organization_id: Some(4),
            ..by_name("shared")
        };
        let (id, state) = CredentialLookup.create(&ctx, &wanted).unwrap();
        assert_eq!(id, "11");
        assert_eq!(state.organization_id, Some(4));
    }

    fn sample(id: i64, name: &str) -> awxkit::Credential {
        awxkit::Credential {
            id,
            name: name.into(),
            description: String::new(),
            kind: "ssh".into(),
            organization: None,
            credential_type: 1,
            inputs: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_refreshed_lookup_is_stable() {
        let mock = MockBackend::new();
        mock.add_credential(42, "svc-account", "ssh", Some("svc"));
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let (id, state) = CredentialLookup.create(&ctx, &by_name("svc-account")).unwrap();
        let mut resource = Managed::new(CredentialLookup, "svc")
            .with_prior(id, state)
            .with_desired(by_name("svc-account"));
        assert!(resource.refresh(&ctx).is_empty());
        assert_eq!(resource.planned_action(), Action::NoOp);

        let renamed = Managed::new(CredentialLookup, "svc")
            .with_prior("42", resource.data().state().clone())
            .with_desired(by_name("other"));
        assert_eq!(renamed.planned_action(), Action::Replace);
    }

    #[test]
    fn test_delete_makes_no_remote_call() {
        let mock = MockBackend::new();
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let mut data = ResourceData::present("42", by_name("svc-account"));
        assert!(lifecycle::delete(&CredentialLookup, &ctx, &mut data).is_empty());
        assert!(!data.is_present());
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_lookup_by_id_survives_remote_rename() {
        let mock = MockBackend::new();
        mock.add_credential(42, "svc-account", "ssh", Some("svc"));
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let (id, state) = CredentialLookup.create(&ctx, &by_id(42)).unwrap();
        assert_eq!(state.name.as_deref(), Some("svc-account"));

        let mut renamed = mock.credential(42).unwrap();
        renamed.name = "svc-renamed".into();
        mock.insert_credential(renamed);

        let mut resource = Managed::new(CredentialLookup, "svc")
            .with_prior(id, state)
            .with_desired(by_id(42));
        assert!(resource.refresh(&ctx).is_empty());
        assert_eq!(resource.data().id(), Some("42"));
        assert_eq!(resource.data().state().name.as_deref(), Some("svc-renamed"));
        assert_eq!(resource.data().state().selector_name, None);
        assert_eq!(resource.planned_action(), Action::NoOp);
    }

    #[test]
    fn test_lookup_gone_upstream_reads_absent() {
        let mock = MockBackend::new();
        mock.add_credential(42, "svc-account", "ssh", None);
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let mut data = ResourceData::new();
        assert!(lifecycle::create(&CredentialLookup, &ctx, &mut data, &by_name("svc-account")).is_empty());
        client.delete_credential(42).unwrap();

        assert!(lifecycle::read(&CredentialLookup, &ctx, &mut data).is_empty());
        assert!(!data.is_present());
        assert_eq!(data.state().selector_name.as_deref(), Some("svc-account"));
    }
}
