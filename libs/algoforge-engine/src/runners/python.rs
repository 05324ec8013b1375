use algoforge_common::types::Language;

use super::{LanguageRunner, RunWorkspace};
use crate::config::LanguageConfig;
use crate::process::CommandSpec;

#[derive(Debug, Clone, Copy, Default)]
pub struct PythonRunner;

impl LanguageRunner for PythonRunner {
    fn language(&self) -> Language {
        Language::Python
    }

    fn compile_command(&self, _workspace: &RunWorkspace, _config: &LanguageConfig) -> Option<CommandSpec> {
        None
    }

    fn run_command(&self, workspace: &RunWorkspace, config: &LanguageConfig) -> CommandSpec {
        CommandSpec::new(config.runtime.as_deref().unwrap_or("python3"))
            .arg(workspace.source_path.to_string_lossy())
            .stdin_from(&workspace.input_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runners::test_support::workspace;

    #[test]
    fn test_interpreter_runs_source() {
        let ws = workspace(Language::Python);
        let cmd = PythonRunner.run_command(&ws, &LanguageConfig::builtin(Language::Python));
        assert_eq!(cmd.to_string(), "python3 /srv/af/codes/job.py < /srv/af/inputs/job.txt");
    }
}
