//! Survey spec of a job template
//!
//! Locally the questions form a set: their order in the configuration is
//! not significant. Remotely they are an ordered list of loosely typed JSON
//! objects, where `default` may be a string or a number and `choices` a
//! newline-separated string or a list. Reads normalize both to strings so
//! equality is stable across round-trips.
//!
//! Questions are posted in the set's order, sorted by question name, so the
//! order shown by AWX is that sorted order and not the declaration order.

use std::collections::BTreeSet;

use awxkit::{QuestionType, Survey, SurveyQuestion};
use declarative::{LocalState, Observed, Reconciler};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::AwxContext;
use crate::error::{ReconcileError, Result};
use crate::identity;

pub const TYPE_NAME: &str = "survey";

const DEFAULT_MIN: i64 = 0;
const DEFAULT_MAX: i64 = 1024;

fn default_max() -> i64 {
    DEFAULT_MAX
}

/// One survey question in normalized form
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Question {
    pub question_name: String,
    #[serde(default)]
    pub question_description: String,
    #[serde(default)]
    pub required: bool,
    pub variable: String,
    #[serde(rename = "type")]
    pub question_type: String,
    #[serde(default)]
    pub min: i64,
    #[serde(default = "default_max")]
    pub max: i64,
    #[serde(default)]
    pub default: String,
    /// Newline-separated
    #[serde(default)]
    pub choices: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyState {
    pub job_template_id: i64,
    pub name: String,
    pub description: String,
    pub spec: BTreeSet<Question>,
}

impl LocalState for SurveyState {
    fn vacate(&mut self) {
        // The owning job template outlives its survey.
        *self = Self {
            job_template_id: self.job_template_id,
            ..Self::default()
        };
    }
}

fn label(job_template_id: i64) -> String {
    format!("survey spec of job template {job_template_id}")
}

fn decode_failure(job_template_id: i64, index: usize) -> impl Fn(String) -> ReconcileError {
    move |message| ReconcileError::SpecDecode {
        job_template_id,
        index,
        message,
    }
}

/// Check every question type before anything is sent.
fn validate_types(spec: &BTreeSet<Question>) -> Result<Vec<QuestionType>> {
    spec.iter()
        .map(|q| {
            q.question_type
                .parse::<QuestionType>()
                .map_err(|message| ReconcileError::InvalidQuestionType {
                    variable: q.variable.clone(),
                    message,
                })
        })
        .collect()
}

/// Numeric defaults go out as numbers only when the number prints back as
/// the same text; `"1"` for a float or `"007"` for an integer stay strings.
fn encode_default(question_type: QuestionType, default: &str) -> Value {
    let number = match question_type {
        QuestionType::Integer => default.parse::<i64>().ok().map(serde_json::Number::from),
        QuestionType::Float => default.parse::<f64>().ok().and_then(serde_json::Number::from_f64),
        _ => None,
    };
    match number {
        Some(n) if n.to_string() == default => Value::Number(n),
        _ => Value::from(default),
    }
}

fn encode_question(
    job_template_id: i64,
    index: usize,
    question: &Question,
    question_type: QuestionType,
) -> Result<Value> {
    let wire = SurveyQuestion {
        question_name: question.question_name.clone(),
        question_description: question.question_description.clone(),
        required: question.required,
        variable: question.variable.clone(),
        question_type,
        min: Some(question.min),
        max: Some(question.max),
        default: encode_default(question_type, &question.default),
        choices: Value::from(question.choices.as_str()),
    };
    serde_json::to_value(&wire).map_err(|e| decode_failure(job_template_id, index)(e.to_string()))
}

fn text_of(value: Value, field: &str) -> std::result::Result<String, String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(format!("{field} list holds a non-scalar value: {other}")),
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(|items| items.join("\n")),
        Value::Object(_) => Err(format!("{field} must be a string or a list")),
    }
}

fn decode_question(job_template_id: i64, index: usize, raw: &Value) -> Result<Question> {
    let fail = decode_failure(job_template_id, index);
    let wire: SurveyQuestion = serde_json::from_value(raw.clone()).map_err(|e| fail(e.to_string()))?;

    Ok(Question {
        question_name: wire.question_name,
        question_description: wire.question_description,
        required: wire.required,
        variable: wire.variable,
        question_type: wire.question_type.to_string(),
        min: wire.min.unwrap_or(DEFAULT_MIN),
        max: wire.max.unwrap_or(DEFAULT_MAX),
        default: text_of(wire.default, "default").map_err(&fail)?,
        choices: text_of(wire.choices, "choices").map_err(&fail)?,
    })
}

pub struct SurveyReconciler;

impl SurveyReconciler {
    /// Validate, encode and post the whole spec.
    fn write(
        ctx: &AwxContext<'_>,
        desired: &SurveyState,
        failed: fn(String, awxkit::Error) -> ReconcileError,
    ) -> Result<()> {
        let job_template_id = desired.job_template_id;
        let types = validate_types(&desired.spec)?;

        let spec = desired
            .spec
            .iter()
            .zip(types)
            .enumerate()
            .map(|(index, (question, question_type))| {
                encode_question(job_template_id, index, question, question_type)
            })
            .collect::<Result<Vec<_>>>()?;

        let survey = Survey {
            name: desired.name.clone(),
            description: desired.description.clone(),
            spec,
        };
        log::debug!(
            "Posting {} question(s) to job template {job_template_id}",
            survey.spec.len()
        );
        ctx.client
            .post_survey(job_template_id, &survey)
            .map_err(|source| failed(label(job_template_id), source))
    }

    fn fetch(ctx: &AwxContext<'_>, job_template_id: i64) -> Result<SurveyState> {
        let survey = ctx.client.get_survey(job_template_id).map_err(|source| {
            if source.is_not_found() {
                ReconcileError::NotFound {
                    resource: label(job_template_id),
                }
            } else {
                ReconcileError::UpstreamLookupFailed {
                    what: format!("failed to fetch {}", label(job_template_id)),
                    source,
                }
            }
        })?;

        let spec = survey
            .spec
            .iter()
            .enumerate()
            .map(|(index, raw)| decode_question(job_template_id, index, raw))
            .collect::<Result<BTreeSet<_>>>()?;

        Ok(SurveyState {
            job_template_id,
            name: survey.name,
            description: survey.description,
            spec,
        })
    }
}

impl Reconciler for SurveyReconciler {
    type State = SurveyState;
    type Client = awxkit::Client;
    type Error = ReconcileError;

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn create(&self, ctx: &AwxContext<'_>, desired: &SurveyState) -> Result<(String, SurveyState)> {
        Self::write(ctx, desired, |resource, source| ReconcileError::CreateFailed { resource, source })?;
        let state = Self::fetch(ctx, desired.job_template_id)?;
        Ok((desired.job_template_id.to_string(), state))
    }

    /// A missing spec is an error, not drift: the job template still exists
    /// and the spec has to be written again.
    fn read(&self, ctx: &AwxContext<'_>, id: &str, _current: &SurveyState) -> Result<Observed<SurveyState>> {
        let job_template_id = identity::parse_numeric(id, "<job_template_id>")?;
        Self::fetch(ctx, job_template_id).map(Observed::Present)
    }

    fn update(
        &self,
        ctx: &AwxContext<'_>,
        _id: &str,
        _current: &SurveyState,
        desired: &SurveyState,
    ) -> Result<SurveyState> {
        Self::write(ctx, desired, |resource, source| ReconcileError::UpdateFailed { resource, source })?;
        Self::fetch(ctx, desired.job_template_id)
    }

    fn delete(&self, ctx: &AwxContext<'_>, id: &str, _current: &SurveyState) -> Result<()> {
        let job_template_id = identity::parse_numeric(id, "<job_template_id>")?;
        match ctx.client.delete_survey(job_template_id) {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(source) => Err(ReconcileError::DeleteFailed {
                resource: label(job_template_id),
                source,
            }),
        }
    }

    fn import(&self, id: &str) -> Result<SurveyState> {
        let job_template_id = identity::parse_numeric(id, "<job_template_id>")?;
        Ok(SurveyState {
            job_template_id,
            ..Default::default()
        })
    }

    fn force_new(&self, old: &SurveyState, new: &SurveyState) -> bool {
        old.job_template_id != new.job_template_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::client;
    use awxkit::MockBackend;
    use declarative::{Action, ApplyContext, Managed, Resource, ResourceData, lifecycle};
    use serde_json::json;

    fn question(variable: &str, question_type: &str) -> Question {
        Question {
            question_name: format!("What {variable}?"),
            question_description: String::new(),
            required: true,
            variable: variable.into(),
            question_type: question_type.into(),
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
            default: String::new(),
            choices: String::new(),
        }
    }

    fn survey(questions: Vec<Question>) -> SurveyState {
        SurveyState {
            job_template_id: 7,
            name: "deploy".into(),
            description: String::new(),
            spec: questions.into_iter().collect(),
        }
    }

    fn server() -> MockBackend {
        let mock = MockBackend::new();
        mock.add_job_template(7, "deploy-app");
        mock
    }

    #[test]
    fn test_question_order_is_not_significant() {
        let a = survey(vec![question("env", "text"), question("replicas", "integer")]);
        let b = survey(vec![question("replicas", "integer"), question("env", "text")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_create_posts_and_reads_back() {
        let mock = server();
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let desired = survey(vec![
            Question {
                choices: "dev\nprod".into(),
                default: "dev".into(),
                ..question("env", "multiplechoice")
            },
            Question {
                default: "3".into(),
                min: 1,
                max: 10,
                ..question("replicas", "integer")
            },
        ]);

        let (id, state) = SurveyReconciler.create(&ctx, &desired).unwrap();
        assert_eq!(id, "7");
        assert_eq!(state, desired);

        let posted = mock.survey(7).unwrap();
        let replicas = posted.spec.iter().find(|q| q["variable"] == "replicas").unwrap();
        assert_eq!(replicas["default"], json!(3));
        let env = posted.spec.iter().find(|q| q["variable"] == "env").unwrap();
        assert_eq!(env["choices"], json!("dev\nprod"));
    }

    #[test]
    fn test_numeric_defaults_read_back_unchanged() {
        let mock = server();
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let desired = survey(vec![
            Question {
                default: "1".into(),
                ..question("ratio", "float")
            },
            Question {
                default: "2.5".into(),
                ..question("scale", "float")
            },
            Question {
                default: "007".into(),
                ..question("agent", "integer")
            },
            Question {
                default: "+3".into(),
                ..question("offset", "integer")
            },
        ]);

        let (_, state) = SurveyReconciler.create(&ctx, &desired).unwrap();
        assert_eq!(state, desired);

        let posted = mock.survey(7).unwrap();
        let default_of = |variable: &str| {
            posted.spec.iter().find(|q| q["variable"] == variable).unwrap()["default"].clone()
        };
        assert_eq!(default_of("ratio"), json!("1"));
        assert_eq!(default_of("scale"), json!(2.5));
        assert_eq!(default_of("agent"), json!("007"));
        assert_eq!(default_of("offset"), json!("+3"));

        let mut resource = Managed::new(SurveyReconciler, "deploy")
            .with_prior("7", state)
            .with_desired(desired);
        assert!(resource.refresh(&ctx).is_empty());
        assert_eq!(resource.planned_action(), Action::NoOp);
    }

    #[test]
    fn test_invalid_type_rejected_before_any_call() {
        let mock = server();
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let desired = survey(vec![question("notes", "textarea")]);
        let err = SurveyReconciler.create(&ctx, &desired).unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidQuestionType { .. }));
        assert!(err.to_string().contains("textarea"));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_read_normalizes_remote_shapes() {
        let mock = server();
        mock.set_survey(
            7,
            Survey {
                name: "deploy".into(),
                description: String::new(),
                spec: vec![
                    json!({
                        "question_name": "What env?",
                        "required": true,
                        "variable": "env",
                        "type": "multiselect",
                        "min": null,
                        "max": null,
                        "default": ["dev", "qa"],
                        "choices": ["dev", "qa", "prod"]
                    }),
                    json!({
                        "question_name": "What ratio?",
                        "variable": "ratio",
                        "type": "float",
                        "min": 0,
                        "max": 1,
                        "default": 0.5,
                        "choices": ""
                    }),
                ],
            },
        );
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let Observed::Present(state) = SurveyReconciler.read(&ctx, "7", &SurveyState::default()).unwrap()
        else {
            panic!("expected a survey");
        };
        let env = state.spec.iter().find(|q| q.variable == "env").unwrap();
        assert_eq!(env.choices, "dev\nqa\nprod");
        assert_eq!(env.default, "dev\nqa");
        assert_eq!((env.min, env.max), (DEFAULT_MIN, DEFAULT_MAX));

        let ratio = state.spec.iter().find(|q| q.variable == "ratio").unwrap();
        assert_eq!(ratio.default, "0.5");
        assert!(!ratio.required);
    }

    #[test]
    fn test_malformed_remote_question() {
        let mock = server();
        mock.set_survey(
            7,
            Survey {
                spec: vec![json!({"question_name": "x", "variable": "x", "type": "text", "choices": {"a": 1}})],
                ..Survey::default()
            },
        );
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let err = SurveyReconciler.read(&ctx, "7", &SurveyState::default()).unwrap_err();
        assert!(matches!(err, ReconcileError::SpecDecode { index: 0, .. }));
    }

    #[test]
    fn test_missing_spec_is_not_found() {
        let mock = server();
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let err = SurveyReconciler.read(&ctx, "7", &SurveyState::default()).unwrap_err();
        assert!(err.is_not_found());

        let err = SurveyReconciler.read(&ctx, "x7", &SurveyState::default()).unwrap_err();
        assert!(matches!(err, ReconcileError::MalformedIdentity { .. }));
    }

    #[test]
    fn test_changed_question_updates_in_place() {
        let mock = server();
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        let (id, state) = SurveyReconciler
            .create(&ctx, &survey(vec![question("env", "text")]))
            .unwrap();
        let desired = survey(vec![Question {
            default: "prod".into(),
            ..question("env", "text")
        }]);
        let mut resource = Managed::new(SurveyReconciler, "deploy")
            .with_prior(id, state)
            .with_desired(desired);
        assert!(resource.refresh(&ctx).is_empty());
        assert_eq!(resource.planned_action(), Action::Update);

        let (_, diags) = resource.apply(&ctx);
        assert!(diags.is_empty());
        assert_eq!(mock.survey(7).unwrap().spec[0]["default"], "prod");
    }

    #[test]
    fn test_delete_keeps_parent_id() {
        let mock = server();
        let client = client(&mock);
        let ctx = ApplyContext::new(&client);

        // Already gone: still succeeds.
        let mut data = ResourceData::present("7", survey(vec![question("env", "text")]));
        assert!(lifecycle::delete(&SurveyReconciler, &ctx, &mut data).is_empty());
        assert!(!data.is_present());
        assert_eq!(data.state().job_template_id, 7);
        assert!(data.state().spec.is_empty());

        mock.fail_on("delete_survey", awxkit::Error::http(403, "denied"));
        let err = SurveyReconciler.delete(&ctx, "7", &SurveyState::default()).unwrap_err();
        assert!(matches!(err, ReconcileError::DeleteFailed { .. }));
    }

    #[test]
    fn test_moving_to_another_job_template_replaces() {
        let old = survey(vec![]);
        let new = SurveyState {
            job_template_id: 8,
            ..survey(vec![])
        };
        assert!(SurveyReconciler.force_new(&old, &new));
        assert!(!SurveyReconciler.force_new(&old, &survey(vec![question("a", "text")])));
    }
}
