//! AWX v2 REST backend.
//!
//! All paths live under `<url>/api/v2/`. Status codes are inspected by hand
//! so a 404 becomes [`Error::NotFound`] and other failures carry the
//! server's `detail` message.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{
    AssociationRequest, Auth, ConnectionConfig, Credential, CredentialRequest, Filters,
    JobTemplate, ListMeta, Page, Survey,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::DeserializeOwned;
use serde_json::Value;
use ureq::http::Response;
use ureq::{Agent, Body, RequestBuilder};

/// Upper bound on pages followed for a single list call.
const MAX_PAGES: usize = 50;

/// Backend talking to a live AWX server over HTTP.
///
/// # Example
///
/// ```no_run
/// use awxkit::backend::http::HttpBackend;
/// use awxkit::backend::Backend;
/// use awxkit::{Auth, ConnectionConfig};
///
/// let config = ConnectionConfig::new("https://awx.example.com")
///     .auth(Auth::Token("secret".to_string()));
/// let backend = HttpBackend::new(&config).unwrap();
/// let template = backend.get_job_template(7, &Default::default()).unwrap();
/// println!("{}", template.name);
/// ```
pub struct HttpBackend {
    agent: Agent,
    base: String,
    authorization: Option<String>,
}

impl HttpBackend {
    /// Create a backend for the given connection settings.
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let url = config.url.trim().trim_end_matches('/');
        if url.is_empty() {
            return Err(Error::Config("server URL is empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "server URL must start with http:// or https://, got {url:?}"
            )));
        }

        let tls = ureq::tls::TlsConfig::builder()
            .disable_verification(!config.verify_tls)
            .build();
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .tls_config(tls)
            .user_agent(concat!("awxkit/", env!("CARGO_PKG_VERSION")))
            .build()
            .into();

        Ok(Self {
            agent,
            base: url.to_string(),
            authorization: authorization_header(&config.auth),
        })
    }

    /// Server base URL without the trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v2/{}", self.base, path.trim_start_matches('/'))
    }

    fn prepare<B>(&self, request: RequestBuilder<B>) -> RequestBuilder<B> {
        let request = request.header("Accept", "application/json");
        match &self.authorization {
            Some(value) => request.header("Authorization", value),
            None => request,
        }
    }

    fn get_json<T: DeserializeOwned>(&self, what: &str, url: &str, filters: &Filters) -> Result<T> {
        log::debug!("GET {url} {filters:?}");
        let request = filters
            .iter()
            .fold(self.prepare(self.agent.get(url)), |req, (k, v)| req.query(k, v));
        let response = request.call()?;
        read_json(what, response)
    }

    fn list<T: DeserializeOwned>(
        &self,
        what: &str,
        path: &str,
        filters: &Filters,
    ) -> Result<(Vec<T>, ListMeta)> {
        let first: Page<T> = self.get_json(what, &self.url(path), filters)?;
        let (mut items, meta) = first.split();

        let mut next = meta.next.clone();
        let mut pages = 1;
        while let Some(link) = next.take() {
            if pages >= MAX_PAGES {
                log::warn!("Stopped listing {what} after {MAX_PAGES} pages");
                break;
            }
            // `next` already carries the filters in its query string.
            let page: Page<T> = self.get_json(what, &self.absolute(&link), &Filters::new())?;
            let (more, page_meta) = page.split();
            items.extend(more);
            next = page_meta.next;
            pages += 1;
        }

        Ok((items, meta))
    }

    fn absolute(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("{}/{}", self.base, link.trim_start_matches('/'))
        }
    }

    fn post_json<T: serde::Serialize>(&self, what: &str, path: &str, body: &T) -> Result<Response<Body>> {
        let url = self.url(path);
        log::debug!("POST {url}");
        let response = self.prepare(self.agent.post(&url)).send_json(body)?;
        check_status(what, response)
    }
}

fn authorization_header(auth: &Auth) -> Option<String> {
    match auth {
        Auth::None => None,
        Auth::Token(token) => Some(format!("Bearer {token}")),
        Auth::Basic { username, password } => {
            Some(format!("Basic {}", STANDARD.encode(format!("{username}:{password}"))))
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// AWX answers most failures with `{"detail": "..."}`; validation errors map
/// field names to message lists instead. Anything else is returned trimmed.
pub(crate) fn extract_detail(body: &str) -> String {
    let trimmed = body.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => {
            if let Some(detail) = map.get("detail").and_then(Value::as_str) {
                return detail.to_string();
            }
            let fields: Vec<String> = map
                .iter()
                .map(|(field, messages)| match messages {
                    Value::Array(list) => {
                        let joined: Vec<String> = list
                            .iter()
                            .map(|m| m.as_str().map_or_else(|| m.to_string(), str::to_string))
                            .collect();
                        format!("{field}: {}", joined.join(", "))
                    }
                    Value::String(s) => format!("{field}: {s}"),
                    other => format!("{field}: {other}"),
                })
                .collect();
            if fields.is_empty() {
                trimmed.to_string()
            } else {
                fields.join("; ")
            }
        }
        _ => trimmed.to_string(),
    }
}

fn check_status(what: &str, mut response: Response<Body>) -> Result<Response<Body>> {
    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        return Ok(response);
    }
    if status == 404 {
        return Err(Error::not_found(what));
    }
    let body = response.body_mut().read_to_string().unwrap_or_default();
    Err(Error::http(status, extract_detail(&body)))
}

fn read_json<T: DeserializeOwned>(what: &str, response: Response<Body>) -> Result<T> {
    let mut response = check_status(what, response)?;
    Ok(response.body_mut().read_json()?)
}

impl Backend for HttpBackend {
    fn list_credentials(&self, filters: &Filters) -> Result<(Vec<Credential>, ListMeta)> {
        self.list("credentials", "credentials/", filters)
    }

    fn get_credential(&self, id: i64) -> Result<Credential> {
        let what = format!("credential {id}");
        self.get_json(&what, &self.url(&format!("credentials/{id}/")), &Filters::new())
    }

    fn create_credential(&self, request: &CredentialRequest) -> Result<Credential> {
        let response = self.post_json("credentials", "credentials/", request)?;
        read_json("credentials", response)
    }

    fn update_credential(&self, id: i64, request: &CredentialRequest) -> Result<Credential> {
        let what = format!("credential {id}");
        let url = self.url(&format!("credentials/{id}/"));
        log::debug!("PATCH {url}");
        let response = self.prepare(self.agent.patch(&url)).send_json(request)?;
        read_json(&what, response)
    }

    fn delete_credential(&self, id: i64) -> Result<()> {
        let what = format!("credential {id}");
        let url = self.url(&format!("credentials/{id}/"));
        log::debug!("DELETE {url}");
        let response = self.prepare(self.agent.delete(&url)).call()?;
        check_status(&what, response).map(drop)
    }

    fn get_job_template(&self, id: i64, filters: &Filters) -> Result<JobTemplate> {
        let what = format!("job template {id}");
        self.get_json(&what, &self.url(&format!("job_templates/{id}/")), filters)
    }

    fn list_job_template_credentials(
        &self,
        job_template_id: i64,
        filters: &Filters,
    ) -> Result<(Vec<Credential>, ListMeta)> {
        let what = format!("job template {job_template_id}");
        self.list(
            &what,
            &format!("job_templates/{job_template_id}/credentials/"),
            filters,
        )
    }

    fn associate_credential(
        &self,
        job_template_id: i64,
        request: &AssociationRequest,
    ) -> Result<()> {
        let what = format!("job template {job_template_id}");
        self.post_json(
            &what,
            &format!("job_templates/{job_template_id}/credentials/"),
            request,
        )
        .map(drop)
    }

    fn disassociate_credential(
        &self,
        job_template_id: i64,
        request: &AssociationRequest,
    ) -> Result<()> {
        self.associate_credential(job_template_id, request)
    }

    fn post_survey(&self, job_template_id: i64, survey: &Survey) -> Result<()> {
        let what = format!("job template {job_template_id}");
        self.post_json(
            &what,
            &format!("job_templates/{job_template_id}/survey_spec/"),
            survey,
        )
        .map(drop)
    }

    fn get_survey(&self, job_template_id: i64) -> Result<Survey> {
        let what = format!("survey spec of job template {job_template_id}");
        let raw: Value = self.get_json(
            &what,
            &self.url(&format!("job_templates/{job_template_id}/survey_spec/")),
            &Filters::new(),
        )?;
        // A template without a survey answers `{}` rather than 404.
        if raw.as_object().is_some_and(serde_json::Map::is_empty) {
            return Err(Error::not_found(what));
        }
        Ok(serde_json::from_value(raw)?)
    }

    fn delete_survey(&self, job_template_id: i64) -> Result<()> {
        let what = format!("survey spec of job template {job_template_id}");
        let url = self.url(&format!("job_templates/{job_template_id}/survey_spec/"));
        log::debug!("DELETE {url}");
        let response = self.prepare(self.agent.delete(&url)).call()?;
        check_status(&what, response).map(drop)
    }
}
