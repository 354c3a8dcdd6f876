use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One sales rep allowed to sign in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepConfig {
    /// Three-letter sign-in code, matched case-insensitively.
    pub code: String,
    pub name: String,
    /// Vendor "assigned to" user id. Resolved by name at sign-in when absent.
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RepsFile {
    pub reps: Vec<RepConfig>,
}

/// Validated rep list keyed by upper-case code.
#[derive(Debug, Clone, Default)]
pub struct RepRoster {
    by_code: BTreeMap<String, RepConfig>,
}

impl RepRoster {
    #[must_use]
    pub fn lookup(&self, code: &str) -> Option<&RepConfig> {
        self.by_code.get(&normalize_code(code))
    }

    /// Codes in sorted order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.by_code.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RepConfig> {
        self.by_code.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

/// Trims and upper-cases a sign-in code.
#[must_use]
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Load and validate the rep roster from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_reps(path: &Path) -> Result<RepRoster, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RepsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_reps(&content)
}

/// Parse and validate a rep roster from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_reps(content: &str) -> Result<RepRoster, ConfigError> {
    let reps_file: RepsFile = serde_yaml::from_str(content).map_err(ConfigError::RepsFileParse)?;
    validate_reps(reps_file)
}

fn validate_reps(reps_file: RepsFile) -> Result<RepRoster, ConfigError> {
    let mut by_code = BTreeMap::new();

    for mut rep in reps_file.reps {
        let code = normalize_code(&rep.code);
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Validation(format!(
                "rep code '{}' must be exactly three letters",
                rep.code
            )));
        }

        if rep.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "rep '{code}' has an empty name"
            )));
        }

        rep.code.clone_from(&code);
        if by_code.insert(code.clone(), rep).is_some() {
            return Err(ConfigError::Validation(format!(
                "duplicate rep code: '{code}'"
            )));
        }
    }

    Ok(RepRoster { by_code })
}

#[cfg(test)]
#[path = "reps_test.rs"]
mod tests;
