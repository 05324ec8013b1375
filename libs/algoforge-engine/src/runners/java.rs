use algoforge_common::types::Language;
use async_trait::async_trait;
use std::io;
use tokio::fs;

use super::{LanguageRunner, RunWorkspace};
use crate::config::LanguageConfig;
use crate::process::CommandSpec;

/// javac binds the public class name to the file name, so every submission
/// is copied to `Main.java` inside its own job directory.
pub const ENTRY_FILE: &str = "Main.java";
pub const ENTRY_CLASS: &str = "Main";

/// Variables that make the JVM print a "Picked up ..." banner on stderr,
/// which would otherwise be classified as a failure.
const JVM_NOISE_VARS: [&str; 2] = ["JAVA_TOOL_OPTIONS", "_JAVA_OPTIONS"];

#[derive(Debug, Clone, Copy, Default)]
pub struct JavaRunner;

fn scrubbed(mut spec: CommandSpec) -> CommandSpec {
    for var in JVM_NOISE_VARS {
        spec = spec.without_env(var);
    }
    spec
}

#[async_trait]
impl LanguageRunner for JavaRunner {
    fn language(&self) -> Language {
        Language::Java
    }

    async fn prepare(&self, workspace: &RunWorkspace) -> io::Result<()> {
        let dir = workspace.job_dir();
        fs::create_dir_all(&dir).await?;
        fs::copy(&workspace.source_path, dir.join(ENTRY_FILE)).await?;
        Ok(())
    }

    fn compile_command(&self, workspace: &RunWorkspace, config: &LanguageConfig) -> Option<CommandSpec> {
        let spec = CommandSpec::new(config.compiler.as_deref().unwrap_or("javac"))
            .args(config.compile_args.iter().cloned())
            .arg(ENTRY_FILE)
            .current_dir(workspace.job_dir());
        Some(scrubbed(spec))
    }

    fn run_command(&self, workspace: &RunWorkspace, config: &LanguageConfig) -> CommandSpec {
        let spec = CommandSpec::new(config.runtime.as_deref().unwrap_or("java"))
            .arg(ENTRY_CLASS)
            .current_dir(workspace.job_dir())
            .stdin_from(&workspace.input_path);
        scrubbed(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runners::test_support::workspace;
    use std::path::PathBuf;

    #[test]
    fn test_steps_run_inside_job_dir() {
        let ws = workspace(Language::Java);
        let config = LanguageConfig::builtin(Language::Java);

        let compile = JavaRunner.compile_command(&ws, &config).unwrap();
        assert_eq!(compile.program, "javac");
        assert_eq!(compile.args, vec!["Main.java"]);
        assert_eq!(compile.cwd, Some(PathBuf::from("/srv/af/outputs/job")));

        let run = JavaRunner.run_command(&ws, &config);
        assert_eq!(run.program, "java");
        assert_eq!(run.args, vec!["Main"]);
        assert_eq!(run.cwd, Some(PathBuf::from("/srv/af/outputs/job")));
        assert!(run.env_remove.iter().any(|v| v == "JAVA_TOOL_OPTIONS"));
    }

    #[tokio::test]
    async fn test_prepare_copies_entry_file() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("codes/abc.java");
        std::fs::create_dir_all(source_path.parent().unwrap()).unwrap();
        std::fs::write(&source_path, "public class Main {}").unwrap();

        let ws = RunWorkspace {
            job_name: "abc".to_string(),
            language: Language::Java,
            source_path,
            input_path: dir.path().join("inputs/abc.txt"),
            outputs_dir: dir.path().join("outputs"),
            root: dir.path().to_path_buf(),
        };
        JavaRunner.prepare(&ws).await.unwrap();

        let copied = std::fs::read_to_string(dir.path().join("outputs/abc/Main.java")).unwrap();
        assert_eq!(copied, "public class Main {}");
    }
}
