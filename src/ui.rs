use colored::Colorize;
use declarative::{Diagnostic, Diagnostics, Severity};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print one diagnostic under the address it belongs to
pub fn diagnostic(address: &str, diag: &Diagnostic) {
    let line = format!("{}: {}", address.bold(), diag.summary);
    match diag.severity {
        Severity::Error => error(&line),
        Severity::Warning => warn(&line),
    }
    if !diag.detail.is_empty() && diag.detail != diag.summary {
        dim(&diag.detail);
    }
}

/// Print every diagnostic of a resource
pub fn diagnostics(address: &str, diags: &Diagnostics) {
    for diag in diags {
        diagnostic(address, diag);
    }
}

/// Truncate a value for one-line display, keeping the start
pub fn truncate(value: &str, max_len: usize) -> String {
    if value.chars().count() <= max_len {
        value.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = value.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

// ============================================================================
// Tests
// ============================================================================
