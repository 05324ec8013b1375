//! Language runners.
//!
//! Each runner turns a [`RunWorkspace`] into an optional compile command and a
//! run command. The set is closed: [`runner_for`] is the only place a
//! [`Language`] is mapped to a runner.

mod c;
mod cpp;
mod java;
mod javascript;
mod python;

use algoforge_common::types::Language;
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;

use crate::config::LanguageConfig;
use crate::process::CommandSpec;

pub use c::CRunner;
pub use cpp::CppRunner;
pub use java::JavaRunner;
pub use javascript::JavascriptRunner;
pub use python::PythonRunner;

/// Paths of every artifact belonging to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunWorkspace {
    pub job_name: String,
    pub language: Language,
    pub source_path: PathBuf,
    pub input_path: PathBuf,
    pub outputs_dir: PathBuf,
    /// Storage root, stripped from diagnostics
    pub root: PathBuf,
}

impl RunWorkspace {
    /// Native binary produced by the C and C++ compile steps
    pub fn binary_path(&self) -> PathBuf {
        self.outputs_dir.join(format!("{}.out", self.job_name))
    }

    /// Private directory for toolchains that need a fixed entry-file name
    pub fn job_dir(&self) -> PathBuf {
        self.outputs_dir.join(&self.job_name)
    }
}

#[async_trait]
pub trait LanguageRunner: Send + Sync {
    fn language(&self) -> Language;

    /// Stage files the toolchain expects before the compile step
    async fn prepare(&self, _workspace: &RunWorkspace) -> io::Result<()> {
        Ok(())
    }

    fn compile_command(&self, workspace: &RunWorkspace, config: &LanguageConfig) -> Option<CommandSpec>;

    fn run_command(&self, workspace: &RunWorkspace, config: &LanguageConfig) -> CommandSpec;
}

/// Dispatch table from language to runner
pub fn runner_for(language: Language) -> &'static dyn LanguageRunner {
    match language {
        Language::C => &CRunner,
        Language::Cpp => &CppRunner,
        Language::Java => &JavaRunner,
        Language::Python => &PythonRunner,
        Language::Javascript => &JavascriptRunner,
    }
}

/// `<compiler> [args] <source> -o <binary>`, shared by C and C++
fn native_compile(workspace: &RunWorkspace, config: &LanguageConfig, fallback: &str) -> CommandSpec {
    let compiler = config.compiler.as_deref().unwrap_or(fallback);
    CommandSpec::new(compiler)
        .args(config.compile_args.iter().cloned())
        .arg(workspace.source_path.to_string_lossy())
        .arg("-o")
        .arg(workspace.binary_path().to_string_lossy())
}

/// Run the compiled binary with stdin redirected
fn native_run(workspace: &RunWorkspace) -> CommandSpec {
    CommandSpec::new(workspace.binary_path().to_string_lossy()).stdin_from(&workspace.input_path)
}
