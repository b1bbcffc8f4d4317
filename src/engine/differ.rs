//! Plan display - awxform-specific UI

use colored::Colorize;
use declarative::{Action, DiffSummary, ResourceDiff, group_by_type};
use serde_json::Value;
use similar::{ChangeTag, TextDiff};

/// Input keys whose values never reach the terminal
const SENSITIVE_MARKERS: &[&str] = &["password", "secret", "token", "key_data", "passphrase"];

fn is_sensitive(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_MARKERS.iter().any(|marker| key.contains(marker))
}

/// Mask sensitive values anywhere in an attribute tree
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let shown = if is_sensitive(k) && !v.is_null() {
                        Value::from("(sensitive)")
                    } else {
                        redact(v)
                    };
                    (k.clone(), shown)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

fn pretty(value: Option<&Value>) -> String {
    value
        .map(redact)
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .map(|s| s + "\n")
        .unwrap_or_default()
}

/// Line diff of the before/after attributes, tagged for display
pub fn attribute_lines(diff: &ResourceDiff) -> Vec<(ChangeTag, String)> {
    let before = pretty(diff.before.as_ref());
    let after = pretty(diff.after.as_ref());
    TextDiff::from_lines(&before, &after)
        .iter_all_changes()
        .filter(|change| change.tag() != ChangeTag::Equal)
        .map(|change| (change.tag(), change.value().trim_end().to_string()))
        .collect()
}

fn type_title(resource_type: &str) -> &str {
    match resource_type {
        "data.credential" => "Lookups (credentials)",
        "credential" => "Credentials",
        "job_template_credential" => "Job template credentials",
        "survey" => "Surveys",
        other => other,
    }
}

fn action_symbol(action: Action) -> colored::ColoredString {
    match action {
        Action::Create => "+".green(),
        Action::Delete => "-".red(),
        Action::Update => "~".yellow(),
        Action::Replace => "-/+".magenta(),
        Action::NoOp => " ".normal(),
    }
}

fn describe(diff: &ResourceDiff) -> String {
    match diff.action {
        Action::Create => "(will create)".to_string(),
        Action::Delete => "(will remove)".to_string(),
        Action::Update | Action::Replace => {
            let changed = diff.changed_attributes();
            let verb = if diff.action == Action::Replace {
                "forces replacement"
            } else {
                "changes"
            };
            if changed.is_empty() {
                format!("({verb})")
            } else {
                format!("({verb}: {})", changed.join(", "))
            }
        }
        Action::NoOp => String::new(),
    }
}

/// Display a list of diffs in a user-friendly format
pub fn display_plan(diffs: &[ResourceDiff], detailed: bool) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Execution Plan".bold()
    );
    println!("│");

    for (resource_type, type_diffs) in group_by_type(diffs) {
        println!("│ {}", type_title(&resource_type).bold());

        for diff in type_diffs {
            println!(
                "│   {} {:<40} {}",
                action_symbol(diff.action),
                diff.address,
                describe(diff).dimmed()
            );

            if detailed {
                for (tag, line) in attribute_lines(diff) {
                    match tag {
                        ChangeTag::Delete => println!("│       {}", format!("- {line}").red()),
                        ChangeTag::Insert => println!("│       {}", format!("+ {line}").green()),
                        ChangeTag::Equal => {}
                    }
                }
            }
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Plan: {} to add, {} to change, {} to replace, {} to remove",
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.replacements.to_string().magenta(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn update(before: Value, after: Value) -> ResourceDiff {
        ResourceDiff {
            address: "credential.deploy".into(),
            resource_type: "credential".into(),
            action: Action::Update,
            before: Some(before),
            after: Some(after),
        }
    }

    #[test]
    fn test_redact_hides_secrets() {
        let value = json!({
            "name": "deploy",
            "inputs": {"username": "deploy", "password": "hunter2", "ssh_key_data": "-----BEGIN"}
        });
        let shown = redact(&value);
        assert_eq!(shown["name"], "deploy");
        assert_eq!(shown["inputs"]["username"], "deploy");
        assert_eq!(shown["inputs"]["password"], "(sensitive)");
        assert_eq!(shown["inputs"]["ssh_key_data"], "(sensitive)");
    }

    #[test]
    fn test_attribute_lines_show_only_changes() {
        let diff = update(
            json!({"name": "deploy", "description": "old"}),
            json!({"name": "deploy", "description": "new"}),
        );
        let lines = attribute_lines(&diff);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, ChangeTag::Delete);
        assert!(lines[0].1.contains("\"old\""));
        assert_eq!(lines[1].0, ChangeTag::Insert);
        assert!(lines[1].1.contains("\"new\""));
    }

    #[test]
    fn test_secret_rotation_is_not_printed() {
        let diff = update(
            json!({"inputs": {"password": "old-secret"}}),
            json!({"inputs": {"password": "new-secret"}}),
        );
        let lines = attribute_lines(&diff);
        assert!(lines.iter().all(|(_, line)| !line.contains("secret\"")));
        assert!(describe(&diff).contains("inputs"));
    }

    #[test]
    fn test_describe_creation_and_replacement() {
        let mut diff = update(json!({"credential_id": 9}), json!({"credential_id": 10}));
        diff.action = Action::Replace;
        assert_eq!(describe(&diff), "(forces replacement: credential_id)");

        diff.action = Action::Create;
        assert_eq!(describe(&diff), "(will create)");
    }
}
