//! Configuration for git-fly sessions.
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or no file) is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::process::CommandLine;

/// What an interrupt does when no supervised process is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterruptPolicy {
    /// Offer registered sandboxes for removal, then exit.
    #[default]
    Cleanup,
    /// Exit immediately, leaving sandboxes in place.
    Exit,
}

/// A dependency-install step triggered by a manifest file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRule {
    /// File name whose presence in the sandbox root enables this rule.
    pub manifest: String,
    /// Command run inside the sandbox to install dependencies.
    pub command: String,
}

impl InstallRule {
    /// Creates an install rule.
    pub fn new(manifest: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            manifest: manifest.into(),
            command: command.into(),
        }
    }

    /// Parses the install command.
    pub fn command_line(&self) -> Result<CommandLine> {
        CommandLine::parse(&self.command)?.ok_or_else(|| {
            Error::Config(format!("install command for '{}' is empty", self.manifest))
        })
    }

    /// Returns true if this rule's manifest exists in `dir`.
    pub fn applies_to(&self, dir: &Path) -> bool {
        dir.join(&self.manifest).is_file()
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory under which sandboxes are created.
    #[serde(default = "default_sandbox_root")]
    pub sandbox_root: PathBuf,
    /// git binary used for cloning.
    #[serde(default = "default_git_program")]
    pub git_program: String,
    /// Interrupt behavior when no process is running.
    #[serde(default)]
    pub interrupt: InterruptPolicy,
    /// Install rules, checked in order; the first matching manifest wins.
    #[serde(default = "default_install_rules")]
    pub install: Vec<InstallRule>,
}

fn default_sandbox_root() -> PathBuf {
    std::env::temp_dir()
}

fn default_git_program() -> String {
    "git".to_string()
}

fn default_install_rules() -> Vec<InstallRule> {
    vec![InstallRule::new("package.json", "npm install")]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sandbox_root: default_sandbox_root(),
            git_program: default_git_program(),
            interrupt: InterruptPolicy::default(),
            install: default_install_rules(),
        }
    }
}

impl Config {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Loads a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = ?path, "loaded configuration");
        Ok(config)
    }

    /// Overrides the sandbox root.
    pub fn with_sandbox_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sandbox_root = root.into();
        self
    }

    /// Overrides the interrupt policy.
    pub fn with_interrupt(mut self, policy: InterruptPolicy) -> Self {
        self.interrupt = policy;
        self
    }

    /// Returns the first install rule whose manifest exists in `dir`.
    pub fn install_rule_for(&self, dir: &Path) -> Option<&InstallRule> {
        self.install.iter().find(|rule| rule.applies_to(dir))
    }
}

/// Problems found in a [`Config`] before any session starts.
///
/// Errors stop git-fly at startup; warnings are logged and ignored.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Problems that make the configuration unusable.
    pub errors: Vec<String>,
    /// Suspicious settings that still work.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// No errors were found.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Folds in the findings for a nested item, such as one install rule.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Returns the warnings, or every error joined into one [`Error::Config`].
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Startup checks for configuration items.
pub trait Validate {
    fn validate(&self) -> ValidationResult;
}

impl Validate for InstallRule {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.manifest.trim().is_empty() {
            result.add_error("install rule manifest cannot be empty");
        } else if self.manifest.contains('/') || self.manifest.contains('\\') {
            result.add_warning(format!(
                "install manifest '{}' is a path; it is resolved relative to the sandbox root",
                self.manifest
            ));
        }

        if let Err(e) = self.command_line() {
            result.add_error(e.to_string());
        }

        result
    }
}

impl Validate for Config {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.git_program.trim().is_empty() {
            result.add_error("git_program cannot be empty");
        }

        if self.sandbox_root.as_os_str().is_empty() {
            result.add_error("sandbox_root cannot be empty");
        } else if self.sandbox_root.is_relative() {
            result.add_warning(format!(
                "sandbox_root '{}' is relative to the current directory",
                self.sandbox_root.display()
            ));
        }

        if self.install.is_empty() {
            result.add_warning("no install rules configured; dependency install is disabled");
        }

        for rule in &self.install {
            result.merge(rule.validate());
        }

        result
    }
}
