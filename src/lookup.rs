//! Selector-based lookup of remote objects
//!
//! Turns `id` / `name` selectors plus an optional parent scope into list
//! filters and insists on exactly one match.

use crate::error::{ReconcileError, Result};
use awxkit::{Client, Credential, Filters, ListMeta};

/// User-supplied selectors; at least one must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selectors {
    pub id: Option<i64>,
    pub name: Option<String>,
}

impl Selectors {
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none()
    }
}

/// Restricts a lookup to children of one parent, e.g. `organization=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub key: &'static str,
    pub id: i64,
}

impl Scope {
    pub fn organization(id: i64) -> Self {
        Self {
            key: "organization",
            id,
        }
    }
}

/// Build the list filters for a lookup.
pub fn filters_for(selectors: &Selectors, scope: Option<Scope>) -> Filters {
    let mut filters = Filters::new();
    if let Some(id) = selectors.id {
        filters.insert("id".to_string(), id.to_string());
    }
    if let Some(name) = &selectors.name {
        filters.insert("name".to_string(), name.clone());
    }
    if let Some(scope) = scope {
        filters.insert(scope.key.to_string(), scope.id.to_string());
    }
    filters
}

fn describe(filters: &Filters) -> String {
    filters
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve selectors to exactly one object using `list`.
pub fn resolve<T, F>(
    resource: &'static str,
    selectors: &Selectors,
    scope: Option<Scope>,
    list: F,
) -> Result<T>
where
    F: FnOnce(&Filters) -> awxkit::Result<(Vec<T>, ListMeta)>,
{
    if selectors.is_empty() {
        return Err(ReconcileError::MissingSelector { resource });
    }

    let filters = filters_for(selectors, scope);
    log::debug!("Looking up {resource} with {}", describe(&filters));

    let (mut found, _meta) = list(&filters).map_err(|source| ReconcileError::UpstreamLookupFailed {
        what: format!("failed to fetch {resource} ({})", describe(&filters)),
        source,
    })?;

    match found.len() {
        0 => Err(ReconcileError::NotFound {
            resource: format!("{resource} matching {}", describe(&filters)),
        }),
        1 => Ok(found.remove(0)),
        count => Err(ReconcileError::AmbiguousResult {
            resource,
            count,
            filters: describe(&filters),
        }),
    }
}

/// Resolve a credential through the client's list endpoint.
pub fn resolve_credential(
    client: &Client,
    selectors: &Selectors,
    scope: Option<Scope>,
) -> Result<Credential> {
    resolve("credential", selectors, scope, |filters| {
        client.list_credentials(filters)
    })
}
