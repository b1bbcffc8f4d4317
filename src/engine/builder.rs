//! Plan construction from configuration and state

use anyhow::{Context, Result};
use awxkit::Client;
use declarative::{BoxedResource, ExecutionPlan, Managed, Reconciler, Snapshot};
use std::collections::BTreeSet;

use crate::resource::{
    CredentialLookup, CredentialReconciler, JobTemplateCredential, RESOURCE_TYPES,
    SurveyReconciler, credential, credential_lookup, job_template_credential, survey,
};
use crate::schema::AwxformConfig;
use crate::state::AwxformState;

/// A plan over the AWX client
pub type AwxPlan = ExecutionPlan<Client>;

/// Split `type.name` (or `data.type.name`) into its parts.
pub fn parse_address(address: &str) -> Result<(&'static str, &str)> {
    // Longest type first so `data.credential` wins over `credential`.
    let mut types: Vec<&'static str> = RESOURCE_TYPES.to_vec();
    types.sort_by_key(|t| std::cmp::Reverse(t.len()));

    for resource_type in types {
        if let Some(name) = address
            .strip_prefix(resource_type)
            .and_then(|rest| rest.strip_prefix('.'))
            && !name.is_empty()
            && !name.contains('.')
        {
            return Ok((resource_type, name));
        }
    }
    anyhow::bail!(
        "Invalid address '{}', expected <type>.<name> with type one of {}",
        address,
        RESOURCE_TYPES.join(", ")
    )
}

fn managed<R>(
    reconciler: R,
    name: &str,
    desired: Option<R::State>,
    prior: Option<&Snapshot>,
) -> Result<BoxedResource<Client>>
where
    R: Reconciler<Client = Client> + 'static,
{
    let mut resource = Managed::new(reconciler, name);
    if let Some(snapshot) = prior {
        resource = resource
            .with_snapshot(snapshot)
            .with_context(|| format!("Corrupt state entry for {}.{}", snapshot.resource_type, name))?;
    }
    if let Some(desired) = desired {
        resource = resource.with_desired(desired);
    }
    Ok(Box::new(resource))
}

/// A resource with no desired state, rebuilt from its snapshot
fn orphan(address: &str, snapshot: &Snapshot) -> Result<BoxedResource<Client>> {
    let (resource_type, name) = parse_address(address)?;
    if resource_type != snapshot.resource_type {
        anyhow::bail!(
            "State entry '{}' records type '{}'",
            address,
            snapshot.resource_type
        );
    }
    match resource_type {
        credential_lookup::TYPE_NAME => managed(CredentialLookup, name, None, Some(snapshot)),
        credential::TYPE_NAME => managed(CredentialReconciler, name, None, Some(snapshot)),
        job_template_credential::TYPE_NAME => {
            managed(JobTemplateCredential, name, None, Some(snapshot))
        }
        survey::TYPE_NAME => managed(SurveyReconciler, name, None, Some(snapshot)),
        other => anyhow::bail!("Unknown resource type '{}' in state", other),
    }
}

/// Build the plan for `plan`/`apply`
///
/// Declared resources carry their desired state and any recorded prior.
/// State entries no longer declared are planned for deletion.
pub fn build_plan(config: &AwxformConfig, state: &AwxformState) -> Result<AwxPlan> {
    let mut plan = AwxPlan::new();
    let mut declared = BTreeSet::new();

    let mut add = |address: String, resource: BoxedResource<Client>| {
        declared.insert(address);
        plan.push(resource);
    };

    for (name, lookup) in &config.data.credential {
        let address = format!("{}.{name}", credential_lookup::TYPE_NAME);
        let prior = state.get(&address);
        add(address, managed(CredentialLookup, name, Some(lookup.desired()), prior)?);
    }
    for (name, cred) in &config.resource.credential {
        let address = format!("{}.{name}", credential::TYPE_NAME);
        let prior = state.get(&address);
        add(address, managed(CredentialReconciler, name, Some(cred.desired()), prior)?);
    }
    for (name, link) in &config.resource.job_template_credential {
        let address = format!("{}.{name}", job_template_credential::TYPE_NAME);
        let prior = state.get(&address);
        add(address, managed(JobTemplateCredential, name, Some(link.desired()), prior)?);
    }
    for (name, spec) in &config.resource.survey {
        let address = format!("{}.{name}", survey::TYPE_NAME);
        let prior = state.get(&address);
        add(address, managed(SurveyReconciler, name, Some(spec.desired()), prior)?);
    }

    for (address, snapshot) in &state.resources {
        if !declared.contains(address) {
            log::debug!("{address} is no longer declared, planning removal");
            plan.push(orphan(address, snapshot)?);
        }
    }

    Ok(plan)
}

/// Build the plan for `destroy`: every tracked resource, none desired
pub fn build_destroy_plan(state: &AwxformState) -> Result<AwxPlan> {
    let mut plan = AwxPlan::new();
    for (address, snapshot) in &state.resources {
        plan.push(orphan(address, snapshot)?);
    }
    Ok(plan)
}
