use algoforge_common::types::Language;

use super::{LanguageRunner, RunWorkspace};
use crate::config::LanguageConfig;
use crate::process::CommandSpec;

#[derive(Debug, Clone, Copy, Default)]
pub struct JavascriptRunner;

impl LanguageRunner for JavascriptRunner {
    fn language(&self) -> Language {
        Language::Javascript
    }

    fn compile_command(&self, _workspace: &RunWorkspace, _config: &LanguageConfig) -> Option<CommandSpec> {
        None
    }

    fn run_command(&self, workspace: &RunWorkspace, config: &LanguageConfig) -> CommandSpec {
        CommandSpec::new(config.runtime.as_deref().unwrap_or("node"))
            .arg(workspace.source_path.to_string_lossy())
            .stdin_from(&workspace.input_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runners::test_support::workspace;

    #[test]
    fn test_runtime_override() {
        let ws = workspace(Language::Javascript);
        let mut config = LanguageConfig::builtin(Language::Javascript);
        config.runtime = Some("/opt/node/bin/node".to_string());

        let cmd = JavascriptRunner.run_command(&ws, &config);
        assert_eq!(cmd.program, "/opt/node/bin/node");
        assert_eq!(cmd.args, vec!["/srv/af/codes/job.js"]);
    }
}
