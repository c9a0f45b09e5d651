use std::collections::HashMap;
use std::path::Path;

use crate::error::Error;
use crate::rule::DIAGNOSTIC_ID;

/// Name of the config file looked up in the project root.
pub const CONFIG_FILE: &str = ".idiom.toml";

/// Project configuration loaded from `.idiom.toml`.
/// Include/exclude patterns are path prefixes applied to C# source files.
#[derive(Debug, Default)]
pub struct Config {
    /// Prefixes to skip.
    exclude: Vec<String>,
    /// Types from referenced libraries, e.g. `System.Console`.
    pub extern_types: Vec<String>,
    /// Prefixes to scan; empty means everything.
    include: Vec<String>,
    /// Per-rule switches keyed by rule id.
    rules: HashMap<String, RuleSettings>,
}

/// Per-rule settings.
#[derive(Debug, Default, Clone, serde::Deserialize)]
pub struct RuleSettings {
    /// Overrides the rule's default-enabled flag.
    pub enabled: Option<bool>,
}

/// Raw TOML structure for `.idiom.toml`.
#[derive(serde::Deserialize)]
struct IdiomTomlConfig {
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    extern_types: Vec<String>,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    rules: HashMap<String, RuleSettings>,
}

impl Config {
    /// Load config from `.idiom.toml` in the given root directory.
    /// Returns a default that scans everything if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed,
    /// or `Error::UnknownRule` if a `[rules.*]` table names an unknown rule.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };
        return Self::parse(&content);
    }

    /// Parse config from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed,
    /// or `Error::UnknownRule` for rule ids this tool does not define.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: IdiomTomlConfig = toml::from_str(content)?;
        if let Some(id) = raw.rules.keys().find(|id| return id.as_str() != DIAGNOSTIC_ID) {
            return Err(Error::UnknownRule { id: id.clone() });
        }

        return Ok(Self {
            exclude: raw.exclude,
            extern_types: raw.extern_types,
            include: raw.include,
            rules: raw.rules,
        });
    }

    /// Whether the rule `id` runs, given its default.
    pub fn rule_enabled(&self, id: &str, enabled_by_default: bool) -> bool {
        return self
            .rules
            .get(id)
            .and_then(|r| return r.enabled)
            .unwrap_or(enabled_by_default);
    }

    /// Check whether a source file path should be scanned.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}
