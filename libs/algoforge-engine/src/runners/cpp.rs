use algoforge_common::types::Language;

use super::{native_compile, native_run, LanguageRunner, RunWorkspace};
use crate::config::LanguageConfig;
use crate::process::CommandSpec;

#[derive(Debug, Clone, Copy, Default)]
pub struct CppRunner;

impl LanguageRunner for CppRunner {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn compile_command(&self, workspace: &RunWorkspace, config: &LanguageConfig) -> Option<CommandSpec> {
        Some(native_compile(workspace, config, "g++"))
    }

    fn run_command(&self, workspace: &RunWorkspace, _config: &LanguageConfig) -> CommandSpec {
        native_run(workspace)
    }
}
