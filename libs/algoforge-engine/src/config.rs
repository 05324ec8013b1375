// Per-language toolchain configuration
use algoforge_common::types::Language;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Resolved settings for one language.
///
/// `compiler` is set for languages with a compile step, `runtime` for those
/// whose run step goes through an interpreter or VM. A compiled C/C++ binary
/// is run directly and has no runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub name: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compile_args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    pub timeout_ms: u64,
}

impl LanguageConfig {
    /// Built-in toolchains and wall-clock budgets. The budget covers compile
    /// and run together.
    pub fn builtin(language: Language) -> Self {
        let (compiler, runtime, timeout_ms) = match language {
            Language::C => (Some("gcc"), None, 5_000),
            Language::Cpp => (Some("g++"), None, 5_000),
            Language::Java => (Some("javac"), Some("java"), 10_000),
            Language::Python => (None, Some("python3"), 2_000),
            Language::Javascript => (None, Some("node"), 2_000),
        };
        Self {
            name: language,
            compiler: compiler.map(str::to_string),
            compile_args: Vec::new(),
            runtime: runtime.map(str::to_string),
            timeout_ms,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn apply(&mut self, entry: LanguageOverride) {
        if let Some(compiler) = entry.compiler {
            self.compiler = Some(compiler);
        }
        if let Some(args) = entry.compile_args {
            self.compile_args = args;
        }
        if let Some(runtime) = entry.runtime {
            self.runtime = Some(runtime);
        }
        if let Some(timeout_ms) = entry.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
    }
}

/// One entry of languages.json. Anything left out keeps the built-in value.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LanguageOverride {
    name: Language,
    #[serde(default)]
    compiler: Option<String>,
    #[serde(default)]
    compile_args: Option<Vec<String>>,
    #[serde(default)]
    runtime: Option<String>,
    #[serde(default)]
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LanguagesJson {
    languages: Vec<LanguageOverride>,
}

#[derive(Debug, Serialize)]
struct LanguagesJsonOut<'a> {
    languages: Vec<&'a LanguageConfig>,
}

/// Language configuration manager
#[derive(Debug, Clone)]
pub struct LanguageConfigManager {
    configs: HashMap<Language, LanguageConfig>,
}

impl Default for LanguageConfigManager {
    fn default() -> Self {
        let configs = Language::ALL
            .iter()
            .map(|lang| (*lang, LanguageConfig::builtin(*lang)))
            .collect();
        Self { configs }
    }
}

impl LanguageConfigManager {
    /// Load overrides from languages.json on top of the built-in table
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    /// Same as [`load`](Self::load), but a missing file means built-in defaults
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            warn!(
                path = %config_path.display(),
                "Language config not found, using built-in toolchains"
            );
            return Ok(Self::default());
        }
        let manager = Self::load(config_path)?;
        info!(path = %config_path.display(), "Loaded language configuration");
        Ok(manager)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let languages_json: LanguagesJson = serde_json::from_str(content)?;

        let mut manager = Self::default();
        for entry in languages_json.languages {
            if entry.timeout_ms == Some(0) {
                anyhow::bail!("timeout_ms for '{}' must be greater than zero", entry.name);
            }
            if let Some(config) = manager.configs.get_mut(&entry.name) {
                config.apply(entry);
            }
        }
        Ok(manager)
    }

    /// Render the resolved table in the languages.json format
    pub fn to_json_pretty(&self) -> Result<String> {
        let out = LanguagesJsonOut {
            languages: self.list(),
        };
        Ok(serde_json::to_string_pretty(&out)?)
    }

    /// Get configuration for a specific language
    pub fn get_config(&self, language: Language) -> &LanguageConfig {
        // every Language has an entry from Default
        &self.configs[&language]
    }

    /// Get the wall-clock budget for a language
    pub fn get_timeout(&self, language: Language) -> Duration {
        self.get_config(language).timeout()
    }

    /// All languages in declaration order
    pub fn list(&self) -> Vec<&LanguageConfig> {
        Language::ALL.iter().map(|l| self.get_config(*l)).collect()
    }
}
