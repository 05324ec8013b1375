use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Languages the execution service knows how to compile and run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    #[serde(alias = "c++")]
    Cpp,
    Java,
    #[serde(alias = "py")]
    Python,
    #[serde(alias = "js")]
    Javascript,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::C,
        Language::Cpp,
        Language::Java,
        Language::Python,
        Language::Javascript,
    ];

    /// Canonical lowercase name, as stored on job records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Python => "python",
            Language::Javascript => "javascript",
        }
    }

    /// Source file extension expected by the language's toolchain.
    pub fn extension(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Python => "py",
            Language::Javascript => "js",
        }
    }

    /// Inverse of [`Language::extension`], also accepting common C++ suffixes.
    pub fn from_extension(ext: &str) -> Option<Language> {
        match ext.to_ascii_lowercase().as_str() {
            "c" => Some(Language::C),
            "cpp" | "cc" | "cxx" => Some(Language::Cpp),
            "java" => Some(Language::Java),
            "py" => Some(Language::Python),
            "js" | "mjs" => Some(Language::Javascript),
            _ => None,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Cpp
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported Language: {0}")]
pub struct UnsupportedLanguage(pub String);

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" => Ok(Language::C),
            "cpp" | "c++" => Ok(Language::Cpp),
            "java" => Ok(Language::Java),
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" => Ok(Language::Javascript),
            _ => Err(UnsupportedLanguage(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Success,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Success => "success",
            JobStatus::Error => "error",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted record of one execution request and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub language: Language,
    pub source_path: PathBuf,
    pub source_code: String,
    pub status: JobStatus,
    #[serde(default)]
    pub output: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

/// Fields supplied by the orchestrator when a job is first recorded.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub language: Language,
    pub source_path: PathBuf,
    pub source_code: String,
    pub owner_id: Option<String>,
}

impl Job {
    pub fn pending(new: NewJob) -> Self {
        Self {
            id: Uuid::new_v4(),
            language: new.language,
            source_path: new.source_path,
            source_code: new.source_code,
            status: JobStatus::Pending,
            output: String::new(),
            submitted_at: Utc::now(),
            completed_at: None,
            owner_id: new.owner_id,
        }
    }

    /// Whether `requester` may read this job. Unowned jobs are public.
    pub fn visible_to(&self, requester: Option<&str>) -> bool {
        match self.owner_id.as_deref() {
            None => true,
            Some(owner) => requester == Some(owner),
        }
    }
}

/// Body of `POST /run`. Every field is optional on the wire so that the
/// handler can apply defaults and reject a missing `code` itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub input: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub source_path: PathBuf,
    pub output: String,
    pub job_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub diagnostic_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: ErrorDetail,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
}

impl ErrorResponse {
    pub fn new(diagnostic_text: impl Into<String>, job_id: Option<Uuid>) -> Self {
        Self {
            error: ErrorDetail {
                diagnostic_text: diagnostic_text.into(),
            },
            job_id,
        }
    }
}
