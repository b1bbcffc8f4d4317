use anyhow::{Context, Result};
use std::path::PathBuf;

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "awxform.toml";

/// Get the state directory path (~/.local/state/awxform)
pub fn state_dir() -> Result<PathBuf> {
    if let Some(dir) = dirs::state_dir() {
        return Ok(dir.join("awxform"));
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".local").join("state").join("awxform"))
}

/// Get the default state file path
pub fn default_state_file() -> Result<PathBuf> {
    Ok(state_dir()?.join("state.json"))
}

/// Expand `~` and environment variables in a user-supplied path
pub fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .with_context(|| format!("Could not expand path: {path}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_path("~/awx/state.json").unwrap(), home.join("awx/state.json"));
        assert_eq!(expand_path("relative.toml").unwrap(), PathBuf::from("relative.toml"));
    }

    #[test]
    fn test_default_state_file_name() {
        let path = default_state_file().unwrap();
        assert!(path.ends_with("awxform/state.json"));
    }
}
