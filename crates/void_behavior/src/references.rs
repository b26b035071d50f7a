//! Host reference validation
//!
//! The most common reason a behavior build fails is a host that was set up
//! without one of the modules behavior code links against. Checking for
//! them up front turns that into one clear diagnostic per missing module.

use thiserror::Error;

use crate::compiler::Diagnostic;
use crate::host::HostEnvironment;

/// Pseudo-source used for missing reference diagnostics
pub const REFERENCES_SOURCE: &str = "<references>";

/// Modules every host must provide by default
pub const DEFAULT_REQUIRED: &[&str] = &["core", "entity", "input"];

/// Required host modules that are absent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Missing host references: {}", .missing.join(", "))]
pub struct MissingReferences {
    pub missing: Vec<String>,
}

impl MissingReferences {
    /// One error per missing module
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        self.missing
            .iter()
            .map(|name| {
                Diagnostic::error(
                    REFERENCES_SOURCE,
                    format!("Required host module '{}' is not registered", name),
                )
            })
            .collect()
    }
}

/// Checks a host environment against a required module set
#[derive(Debug, Clone)]
pub struct ReferenceValidator {
    required: Vec<String>,
}

impl ReferenceValidator {
    /// Validator for a custom required set
    pub fn new<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut required: Vec<String> = required.into_iter().map(Into::into).collect();
        required.sort();
        required.dedup();
        Self { required }
    }

    /// Required module names, sorted
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Fail with every missing name at once
    pub fn validate(&self, host: &HostEnvironment) -> Result<(), MissingReferences> {
        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|name| !host.contains(name))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            log::warn!("Missing host references: {}", missing.join(", "));
            Err(MissingReferences { missing })
        }
    }
}

impl Default for ReferenceValidator {
    fn default() -> Self {
        Self::new(DEFAULT_REQUIRED.iter().copied())
    }
}
