//! File Materializer
//!
//! Writes submitted source text and stdin text into a scratch storage root.
//! The root is handed in at construction; nothing is resolved from the
//! process working directory.
//!
//! Layout under the root:
//! - `codes/<job>.<ext>`   submitted source
//! - `inputs/<job>.txt`    stdin for the run step (always created)
//! - `outputs/`            compiled artifacts, see [`RunWorkspace`]

use algoforge_common::types::Language;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::runners::RunWorkspace;

const CODES_DIR: &str = "codes";
const INPUTS_DIR: &str = "inputs";
const OUTPUTS_DIR: &str = "outputs";

/// A source file written for one request. `job_name` is the random stem
/// shared by every artifact of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub job_name: String,
    pub language: Language,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Materializer {
    root: PathBuf,
}

impl Materializer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create every scratch directory up front
    pub async fn init(&self) -> io::Result<()> {
        for dir in [self.codes_dir(), self.inputs_dir(), self.outputs_dir()] {
            fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn codes_dir(&self) -> PathBuf {
        self.root.join(CODES_DIR)
    }

    pub fn inputs_dir(&self) -> PathBuf {
        self.root.join(INPUTS_DIR)
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join(OUTPUTS_DIR)
    }

    /// Write `code` under a fresh random name with the language's extension
    pub async fn materialize_source(&self, language: Language, code: &str) -> io::Result<SourceFile> {
        let job_name = Uuid::new_v4().to_string();
        let dir = self.codes_dir();
        fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("{}.{}", job_name, language.extension()));
        fs::write(&path, code).await?;
        debug!(path = %path.display(), bytes = code.len(), "Source materialized");

        Ok(SourceFile {
            job_name,
            language,
            path,
        })
    }

    /// Write the stdin companion file. Empty input still produces a file so
    /// the run step always has something to redirect from.
    pub async fn materialize_input(&self, job_name: &str, input: &str) -> io::Result<PathBuf> {
        let dir = self.inputs_dir();
        fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("{}.txt", job_name));
        fs::write(&path, input).await?;
        debug!(path = %path.display(), bytes = input.len(), "Input materialized");

        Ok(path)
    }

    pub fn workspace(&self, source: &SourceFile, input_path: PathBuf) -> RunWorkspace {
        RunWorkspace {
            job_name: source.job_name.clone(),
            language: source.language,
            source_path: source.path.clone(),
            input_path,
            outputs_dir: self.outputs_dir(),
            root: self.root.clone(),
        }
    }
}
