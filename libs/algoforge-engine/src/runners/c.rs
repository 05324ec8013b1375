use algoforge_common::types::Language;

use super::{native_compile, native_run, LanguageRunner, RunWorkspace};
use crate::config::LanguageConfig;
use crate::process::CommandSpec;

#[derive(Debug, Clone, Copy, Default)]
pub struct CRunner;

impl LanguageRunner for CRunner {
    fn language(&self) -> Language {
        Language::C
    }

    fn compile_command(&self, workspace: &RunWorkspace, config: &LanguageConfig) -> Option<CommandSpec> {
        Some(native_compile(workspace, config, "gcc"))
    }

    fn run_command(&self, workspace: &RunWorkspace, _config: &LanguageConfig) -> CommandSpec {
        native_run(workspace)
    }
}
