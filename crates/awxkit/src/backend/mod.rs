//! Backend traits and implementations for the AWX API.
//!
//! This module provides the [`Backend`] trait, the HTTP implementation in
//! [`http::HttpBackend`], and an in-memory [`MockBackend`] for tests.
//!
//! # Testing
//!
//! ```
//! use awxkit::backend::{Backend, MockBackend};
//! use awxkit::Filters;
//!
//! let mock = MockBackend::new();
//! mock.add_credential(42, "svc-account", "ssh", Some("svc"));
//!
//! let mut filters = Filters::new();
//! filters.insert("name".to_string(), "svc-account".to_string());
//! let (found, _) = mock.list_credentials(&filters).unwrap();
//! assert_eq!(found[0].id, 42);
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{
    AssociationRequest, Credential, CredentialRequest, Filters, JobTemplate, ListMeta, Survey,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Backend trait for AWX API calls.
///
/// One method per endpoint the reconcilers use. Implementations perform a
/// single request per call; retries and cancellation are layered on top by
/// [`Client`](crate::Client).
pub trait Backend: Send + Sync {
    /// `GET /credentials/?<filters>`
    fn list_credentials(&self, filters: &Filters) -> Result<(Vec<Credential>, ListMeta)>;

    /// `GET /credentials/<id>/`
    fn get_credential(&self, id: i64) -> Result<Credential>;

    /// `POST /credentials/`
    fn create_credential(&self, request: &CredentialRequest) -> Result<Credential>;

    /// `PATCH /credentials/<id>/`
    fn update_credential(&self, id: i64, request: &CredentialRequest) -> Result<Credential>;

    /// `DELETE /credentials/<id>/`
    fn delete_credential(&self, id: i64) -> Result<()>;

    /// `GET /job_templates/<id>/?<filters>`
    fn get_job_template(&self, id: i64, filters: &Filters) -> Result<JobTemplate>;

    /// `GET /job_templates/<id>/credentials/?<filters>`
    fn list_job_template_credentials(
        &self,
        job_template_id: i64,
        filters: &Filters,
    ) -> Result<(Vec<Credential>, ListMeta)>;

    /// `POST /job_templates/<id>/credentials/` with `{"id": <credential>}`
    fn associate_credential(&self, job_template_id: i64, request: &AssociationRequest)
    -> Result<()>;

    /// `POST /job_templates/<id>/credentials/` with `{"id": <credential>, "disassociate": true}`
    fn disassociate_credential(
        &self,
        job_template_id: i64,
        request: &AssociationRequest,
    ) -> Result<()>;

    /// `POST /job_templates/<id>/survey_spec/`, replacing the whole survey.
    fn post_survey(&self, job_template_id: i64, survey: &Survey) -> Result<()>;

    /// `GET /job_templates/<id>/survey_spec/`
    fn get_survey(&self, job_template_id: i64) -> Result<Survey>;

    /// `DELETE /job_templates/<id>/survey_spec/`
    fn delete_survey(&self, job_template_id: i64) -> Result<()>;
}

/// A request recorded by [`MockBackend`].
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Backend method name, e.g. `"disassociate_credential"`.
    pub operation: &'static str,
    /// Id in the request path, if any.
    pub target: Option<i64>,
    /// JSON body or filters sent with the request.
    pub body: Option<Value>,
}

impl Call {
    /// Build an expected call for assertions.
    pub fn new(operation: &'static str, target: Option<i64>, body: Option<Value>) -> Self {
        Self {
            operation,
            target,
            body,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    credentials: BTreeMap<i64, Credential>,
    job_templates: BTreeMap<i64, JobTemplate>,
    links: Vec<(i64, i64)>,
    surveys: BTreeMap<i64, Survey>,
    failures: HashMap<&'static str, Error>,
    calls: Vec<Call>,
    next_id: i64,
}

impl MockState {
    fn allocate_id(&mut self) -> i64 {
        let floor = self.credentials.keys().max().copied().unwrap_or(0);
        self.next_id = self.next_id.max(floor) + 1;
        self.next_id
    }

    fn record(&mut self, operation: &'static str, target: Option<i64>, body: Option<Value>) -> Result<()> {
        self.calls.push(Call::new(operation, target, body));
        match self.failures.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn require_job_template(&self, id: i64) -> Result<()> {
        if self.job_templates.contains_key(&id) {
            Ok(())
        } else {
            Err(Error::not_found(format!("job template {id}")))
        }
    }
}

/// In-memory AWX server for testing without network access.
///
/// Clones share the same store, so a test can keep a handle for assertions
/// after handing a clone to a [`Client`](crate::Client).
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a credential with the given id, name, kind and optional username input.
    pub fn add_credential(&self, id: i64, name: &str, kind: &str, username: Option<&str>) {
        let mut inputs = Map::new();
        if let Some(username) = username {
            inputs.insert("username".to_string(), Value::from(username));
        }
        self.insert_credential(Credential {
            id,
            name: name.to_string(),
            description: String::new(),
            kind: kind.to_string(),
            organization: None,
            credential_type: 1,
            inputs,
        });
    }

    /// Store a fully specified credential.
    pub fn insert_credential(&self, credential: Credential) {
        self.lock().credentials.insert(credential.id, credential);
    }

    /// Store a job template with the given id and name.
    pub fn add_job_template(&self, id: i64, name: &str) {
        self.lock().job_templates.insert(
            id,
            JobTemplate {
                id,
                name: name.to_string(),
                description: String::new(),
                job_type: "run".to_string(),
                inventory: None,
                project: None,
                playbook: String::new(),
                survey_enabled: false,
            },
        );
    }

    /// Link a credential to a job template. Repeated calls add duplicate rows.
    pub fn link(&self, job_template_id: i64, credential_id: i64) {
        self.lock().links.push((job_template_id, credential_id));
    }

    /// Store a survey verbatim, bypassing any validation.
    pub fn set_survey(&self, job_template_id: i64, survey: Survey) {
        self.lock().surveys.insert(job_template_id, survey);
    }

    /// Make every call to `operation` fail with `error` until cleared.
    pub fn fail_on(&self, operation: &'static str, error: Error) {
        self.lock().failures.insert(operation, error);
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// All recorded calls, oldest first.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Names of all recorded calls, oldest first.
    pub fn operations(&self) -> Vec<&'static str> {
        self.lock().calls.iter().map(|c| c.operation).collect()
    }

    /// Current credential with the given id.
    pub fn credential(&self, id: i64) -> Option<Credential> {
        self.lock().credentials.get(&id).cloned()
    }

    /// Current job template ↔ credential links.
    pub fn links(&self) -> Vec<(i64, i64)> {
        self.lock().links.clone()
    }

    /// Current survey of a job template.
    pub fn survey(&self, job_template_id: i64) -> Option<Survey> {
        self.lock().surveys.get(&job_template_id).cloned()
    }
}

fn matches_filters(credential: &Credential, filters: &Filters) -> bool {
    filters.iter().all(|(key, value)| match key.as_str() {
        "id" => credential.id.to_string() == *value,
        "name" => credential.name == *value,
        "kind" => credential.kind == *value,
        "organization" => credential.organization.map(|o| o.to_string()).as_deref() == Some(value),
        _ => true,
    })
}

fn meta_for(items: &[Credential]) -> ListMeta {
    ListMeta {
        count: items.len(),
        next: None,
        previous: None,
    }
}

fn kind_for_type(credential_type: i64) -> &'static str {
    match credential_type {
        1 => "ssh",
        2 => "scm",
        3 => "vault",
        4 => "net",
        5 => "aws",
        _ => "cloud",
    }
}

fn stored_inputs(inputs: &Map<String, Value>) -> Map<String, Value> {
    inputs
        .iter()
        .map(|(k, v)| {
            let stored = if matches!(k.as_str(), "password" | "ssh_key_data" | "vault_password") {
                Value::from("$encrypted$")
            } else {
                v.clone()
            };
            (k.clone(), stored)
        })
        .collect()
}

fn filters_body(filters: &Filters) -> Option<Value> {
    serde_json::to_value(filters).ok()
}

impl Backend for MockBackend {
    fn list_credentials(&self, filters: &Filters) -> Result<(Vec<Credential>, ListMeta)> {
        let mut state = self.lock();
        state.record("list_credentials", None, filters_body(filters))?;
        let found: Vec<Credential> = state
            .credentials
            .values()
            .filter(|c| matches_filters(c, filters))
            .cloned()
            .collect();
        let meta = meta_for(&found);
        Ok((found, meta))
    }

    fn get_credential(&self, id: i64) -> Result<Credential> {
        let mut state = self.lock();
        state.record("get_credential", Some(id), None)?;
        state
            .credentials
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("credential {id}")))
    }

    fn create_credential(&self, request: &CredentialRequest) -> Result<Credential> {
        let mut state = self.lock();
        state.record("create_credential", None, serde_json::to_value(request).ok())?;
        let id = state.allocate_id();
        let credential = Credential {
            id,
            name: request.name.clone(),
            description: request.description.clone(),
            kind: kind_for_type(request.credential_type).to_string(),
            organization: request.organization,
            credential_type: request.credential_type,
            inputs: stored_inputs(&request.inputs),
        };
        state.credentials.insert(id, credential.clone());
        Ok(credential)
    }

    fn update_credential(&self, id: i64, request: &CredentialRequest) -> Result<Credential> {
        let mut state = self.lock();
        state.record("update_credential", Some(id), serde_json::to_value(request).ok())?;
        let credential = state
            .credentials
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("credential {id}")))?;
        credential.name = request.name.clone();
        credential.description = request.description.clone();
        credential.inputs = stored_inputs(&request.inputs);
        Ok(credential.clone())
    }

    fn delete_credential(&self, id: i64) -> Result<()> {
        let mut state = self.lock();
        state.record("delete_credential", Some(id), None)?;
        if state.credentials.remove(&id).is_none() {
            return Err(Error::not_found(format!("credential {id}")));
        }
        state.links.retain(|(_, cred)| *cred != id);
        Ok(())
    }

    fn get_job_template(&self, id: i64, filters: &Filters) -> Result<JobTemplate> {
        let mut state = self.lock();
        state.record("get_job_template", Some(id), filters_body(filters))?;
        state
            .job_templates
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("job template {id}")))
    }

    fn list_job_template_credentials(
        &self,
        job_template_id: i64,
        filters: &Filters,
    ) -> Result<(Vec<Credential>, ListMeta)> {
        let mut state = self.lock();
        state.record(
            "list_job_template_credentials",
            Some(job_template_id),
            filters_body(filters),
        )?;
        state.require_job_template(job_template_id)?;
        let found: Vec<Credential> = state
            .links
            .iter()
            .filter(|(jt, _)| *jt == job_template_id)
            .filter_map(|(_, cred)| state.credentials.get(cred))
            .filter(|c| matches_filters(c, filters))
            .cloned()
            .collect();
        let meta = meta_for(&found);
        Ok((found, meta))
    }

    fn associate_credential(
        &self,
        job_template_id: i64,
        request: &AssociationRequest,
    ) -> Result<()> {
        let mut state = self.lock();
        state.record(
            "associate_credential",
            Some(job_template_id),
            serde_json::to_value(request).ok(),
        )?;
        state.require_job_template(job_template_id)?;
        if !state.credentials.contains_key(&request.id) {
            return Err(Error::http(
                400,
                format!("Credential with id {} does not exist", request.id),
            ));
        }
        if !state.links.contains(&(job_template_id, request.id)) {
            state.links.push((job_template_id, request.id));
        }
        Ok(())
    }

    fn disassociate_credential(
        &self,
        job_template_id: i64,
        request: &AssociationRequest,
    ) -> Result<()> {
        let mut state = self.lock();
        state.record(
            "disassociate_credential",
            Some(job_template_id),
            serde_json::to_value(request).ok(),
        )?;
        state.require_job_template(job_template_id)?;
        state
            .links
            .retain(|link| *link != (job_template_id, request.id));
        Ok(())
    }

    fn post_survey(&self, job_template_id: i64, survey: &Survey) -> Result<()> {
        let mut state = self.lock();
        state.record(
            "post_survey",
            Some(job_template_id),
            serde_json::to_value(survey).ok(),
        )?;
        state.require_job_template(job_template_id)?;
        state.surveys.insert(job_template_id, survey.clone());
        Ok(())
    }

    fn get_survey(&self, job_template_id: i64) -> Result<Survey> {
        let mut state = self.lock();
        state.record("get_survey", Some(job_template_id), None)?;
        state.require_job_template(job_template_id)?;
        state.surveys.get(&job_template_id).cloned().ok_or_else(|| {
            Error::not_found(format!("survey spec of job template {job_template_id}"))
        })
    }

    fn delete_survey(&self, job_template_id: i64) -> Result<()> {
        let mut state = self.lock();
        state.record("delete_survey", Some(job_template_id), None)?;
        state.require_job_template(job_template_id)?;
        match state.surveys.remove(&job_template_id) {
            Some(_) => Ok(()),
            None => Err(Error::not_found(format!(
                "survey spec of job template {job_template_id}"
            ))),
        }
    }
}
