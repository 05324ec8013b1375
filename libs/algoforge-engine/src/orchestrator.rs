//! Execution Orchestrator
//!
//! Per request: Received → Materialized → Executing → Completed.
//! 1. The language is already a [`Language`] by the time a request exists,
//!    so unsupported names never reach the filesystem.
//! 2. Take an admission permit, then write the source and stdin files.
//! 3. Record a `pending` job and dispatch to the language's runner.
//! 4. Complete the job with the classified result.
//!
//! Once `run` returns, the job it created is never left `pending` unless the
//! job store itself failed.

use algoforge_common::types::{Job, JobStatus, Language, NewJob};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{error, info, instrument, warn};

use crate::config::LanguageConfigManager;
use crate::error::ExecutionError;
use crate::executor::{self, ExecutionResult};
use crate::jobs::JobStore;
use crate::materializer::Materializer;
use crate::runners::runner_for;

/// Safety limits to keep pathological submissions off the disk
pub const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB
pub const MAX_INPUT_BYTES: usize = 10 * 1024 * 1024; // 10MB

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub language: Language,
    pub code: String,
    pub input: String,
    pub owner_id: Option<String>,
}

impl ExecutionRequest {
    /// Apply the inbound defaults: missing language means C++, missing input
    /// means empty stdin. Missing code is rejected.
    pub fn parse(
        language: Option<&str>,
        code: Option<String>,
        input: Option<String>,
        owner_id: Option<String>,
    ) -> Result<Self, ExecutionError> {
        let code = code.ok_or_else(|| ExecutionError::InvalidRequest("Empty code body!".to_string()))?;
        let language = match language {
            Some(name) => name.parse::<Language>()?,
            None => Language::default(),
        };
        Ok(Self {
            language,
            code,
            input: input.unwrap_or_default(),
            owner_id,
        })
    }

    fn validate(&self) -> Result<(), ExecutionError> {
        if self.code.len() > MAX_SOURCE_CODE_BYTES {
            return Err(ExecutionError::InvalidRequest(format!(
                "Source code exceeds maximum size of {} bytes",
                MAX_SOURCE_CODE_BYTES
            )));
        }
        if self.input.len() > MAX_INPUT_BYTES {
            return Err(ExecutionError::InvalidRequest(format!(
                "Input exceeds maximum size of {} bytes",
                MAX_INPUT_BYTES
            )));
        }
        Ok(())
    }
}

/// A completed request: the terminal job plus the classified result
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub job: Job,
    pub result: ExecutionResult,
}

impl RunOutcome {
    pub fn source_path(&self) -> &PathBuf {
        &self.job.source_path
    }
}

pub struct Orchestrator {
    materializer: Materializer,
    languages: LanguageConfigManager,
    store: Arc<dyn JobStore>,
    gate: Arc<Semaphore>,
    admission_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        materializer: Materializer,
        languages: LanguageConfigManager,
        store: Arc<dyn JobStore>,
        max_concurrent: usize,
        admission_timeout: Duration,
    ) -> Self {
        Self {
            materializer,
            languages,
            store,
            gate: Arc::new(Semaphore::new(max_concurrent.max(1))),
            admission_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    pub fn languages(&self) -> &LanguageConfigManager {
        &self.languages
    }

    pub fn materializer(&self) -> &Materializer {
        &self.materializer
    }

    /// Permits currently free in the admission gate
    pub fn available_slots(&self) -> usize {
        self.gate.available_permits()
    }

    #[instrument(
        skip(self, request),
        fields(language = %request.language, source_size = request.code.len())
    )]
    pub async fn run(&self, request: ExecutionRequest) -> Result<RunOutcome, ExecutionError> {
        request.validate()?;

        // Received → admitted. Beyond capacity we queue for a bounded time and
        // then turn the request away without touching the disk.
        let _permit = match tokio::time::timeout(
            self.admission_timeout,
            self.gate.clone().acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) | Err(_) => {
                warn!("Admission gate full, rejecting request");
                return Err(ExecutionError::Busy);
            }
        };

        // → Materialized
        let source = self
            .materializer
            .materialize_source(request.language, &request.code)
            .await
            .map_err(ExecutionError::Materialization)?;
        let input_path = self
            .materializer
            .materialize_input(&source.job_name, &request.input)
            .await
            .map_err(ExecutionError::Materialization)?;

        // → Executing
        let job = self
            .store
            .create(NewJob {
                language: request.language,
                source_path: source.path.clone(),
                source_code: request.code,
                owner_id: request.owner_id,
            })
            .await?;
        info!(job_id = %job.id, "Job created");

        let workspace = self.materializer.workspace(&source, input_path);
        let config = self.languages.get_config(request.language);
        let start = Instant::now();
        let executed = executor::execute(runner_for(request.language), &workspace, config).await;

        // → Completed
        match executed {
            Ok(result) => {
                let (status, output) = result.job_terminal();
                let job = self.store.complete(job.id, status, output).await?;
                info!(
                    job_id = %job.id,
                    outcome = %result.outcome,
                    execution_ms = start.elapsed().as_millis() as u64,
                    "Execution completed"
                );
                Ok(RunOutcome { job, result })
            }
            Err(e) => {
                let message = e.to_string();
                error!(job_id = %job.id, error = %message, "Execution pipeline failed");
                self.store
                    .complete(job.id, JobStatus::Error, message.clone())
                    .await?;
                Err(ExecutionError::Aborted {
                    job_id: job.id,
                    message,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Outcome;
    use crate::jobs::MemoryJobStore;
    use std::path::Path;
    use std::process::Command;

    fn toolchain_available(program: &str) -> bool {
        Command::new(program)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn java_available() -> bool {
        // javac and java both answer -version on stderr
        ["javac", "java"].iter().all(|p| {
            Command::new(p)
                .arg("-version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
    }

    fn available(language: Language) -> bool {
        match language {
            Language::C => toolchain_available("gcc"),
            Language::Cpp => toolchain_available("g++"),
            Language::Java => java_available(),
            Language::Python => toolchain_available("python3"),
            Language::Javascript => toolchain_available("node"),
        }
    }

    fn orchestrator(root: &Path, store: Arc<MemoryJobStore>) -> Orchestrator {
        Orchestrator::new(
            Materializer::new(root),
            LanguageConfigManager::default(),
            store,
            4,
            Duration::from_secs(30),
        )
    }

    fn request(language: Language, code: &str, input: &str) -> ExecutionRequest {
        ExecutionRequest {
            language,
            code: code.to_string(),
            input: input.to_string(),
            owner_id: None,
        }
    }

    fn hello_program(language: Language) -> &'static str {
        match language {
            Language::C => "#include <stdio.h>\nint main(){printf(\"Hello AlgoForge!\\n\");return 0;}\n",
            Language::Cpp => "#include <iostream>\nint main(){std::cout<<\"Hello AlgoForge!\"<<std::endl;return 0;}\n",
            Language::Java => "public class Main { public static void main(String[] a) { System.out.println(\"Hello AlgoForge!\"); } }\n",
            Language::Python => "print(\"Hello AlgoForge!\")\n",
            Language::Javascript => "console.log(\"Hello AlgoForge!\");\n",
        }
    }

    fn echo_program(language: Language) -> &'static str {
        match language {
            Language::C => "#include <stdio.h>\nint main(){char b[64];if(fgets(b,64,stdin))printf(\"%s\",b);return 0;}\n",
            Language::Cpp => "#include <iostream>\n#include <string>\nint main(){std::string s;std::getline(std::cin,s);std::cout<<s<<std::endl;}\n",
            Language::Java => "import java.util.Scanner;\npublic class Main { public static void main(String[] a) { Scanner s = new Scanner(System.in); System.out.println(s.nextLine()); } }\n",
            Language::Python => "print(input())\n",
            Language::Javascript => "const d=require('fs').readFileSync(0,'utf8');console.log(d.split('\\n')[0]);\n",
        }
    }

    fn looping_program(language: Language) -> &'static str {
        match language {
            Language::C => "int main(){volatile int x=0;for(;;){x++;}}\n",
            Language::Cpp => "int main(){volatile int x=0;for(;;){x++;}}\n",
            Language::Java => "public class Main { public static void main(String[] a) { while (true) {} } }\n",
            Language::Python => "while True:\n    pass\n",
            Language::Javascript => "while (true) {}\n",
        }
    }

    fn broken_program(language: Language) -> &'static str {
        match language {
            Language::C | Language::Cpp => "int main( { return 0 }\n",
            Language::Java => "public class Main { public static void main(String[] a) { System.out.println(\"x\") } }\n",
            Language::Python => "def broken(:\n",
            Language::Javascript => "function broken( {\n",
        }
    }

    #[tokio::test]
    async fn test_hello_world_every_language() {
        for language in Language::ALL {
            if !available(language) {
                eprintln!("skipping {}: toolchain not installed", language);
                continue;
            }
            let dir = tempfile::tempdir().unwrap();
            let store = Arc::new(MemoryJobStore::new());
            let orch = orchestrator(dir.path(), store.clone());

            let outcome = orch
                .run(request(language, hello_program(language), ""))
                .await
                .unwrap();
            assert_eq!(outcome.result.outcome, Outcome::Success, "{}: {:?}", language, outcome.result);
            assert_eq!(outcome.job.status, JobStatus::Success);
            assert_eq!(outcome.job.output, "Hello AlgoForge!\n");

            let stored = store.get(outcome.job.id, None).await.unwrap().unwrap();
            assert_eq!(stored.output, "Hello AlgoForge!\n");
            assert_eq!(stored.source_code, hello_program(language));
            assert!(stored.source_path.exists());
        }
    }

    #[tokio::test]
    async fn test_stdin_echo_every_language() {
        for language in Language::ALL {
            if !available(language) {
                continue;
            }
            let dir = tempfile::tempdir().unwrap();
            let orch = orchestrator(dir.path(), Arc::new(MemoryJobStore::new()));

            let outcome = orch
                .run(request(language, echo_program(language), "42"))
                .await
                .unwrap();
            assert!(outcome.result.is_success(), "{}: {:?}", language, outcome.result);
            assert!(outcome.job.output.contains("42"), "{}", language);
        }
    }

    #[tokio::test]
    async fn test_infinite_loop_hits_time_limit() {
        for language in Language::ALL {
            if !available(language) {
                continue;
            }
            let dir = tempfile::tempdir().unwrap();
            let orch = orchestrator(dir.path(), Arc::new(MemoryJobStore::new()));
            let budget = LanguageConfigManager::default().get_timeout(language);

            let started = Instant::now();
            let outcome = orch
                .run(request(language, looping_program(language), ""))
                .await
                .unwrap();
            let elapsed = started.elapsed();

            assert_eq!(outcome.result.outcome, Outcome::Timeout, "{}", language);
            assert_eq!(outcome.job.status, JobStatus::Error);
            assert!(outcome.job.output.starts_with("Time Limit Exceeded"));
            assert!(elapsed >= budget, "{} stopped early: {:?}", language, elapsed);
            assert!(elapsed < budget + Duration::from_secs(3), "{} overran: {:?}", language, elapsed);
        }
    }

    #[tokio::test]
    async fn test_time_limit_also_stops_forked_children() {
        if !available(Language::Python) {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("forked-child-ran");
        let code = format!(
            "import os, time\nif os.fork() == 0:\n    time.sleep(4)\n    open({:?}, 'w').close()\n    os._exit(0)\nwhile True:\n    pass\n",
            marker.display().to_string()
        );
        let orch = orchestrator(dir.path(), Arc::new(MemoryJobStore::new()));

        let outcome = orch.run(request(Language::Python, &code, "")).await.unwrap();
        assert_eq!(outcome.result.outcome, Outcome::Timeout);
        assert_eq!(outcome.job.output, "Time Limit Exceeded (2s)");

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_syntax_error_yields_diagnostic() {
        for language in Language::ALL {
            if !available(language) {
                continue;
            }
            let dir = tempfile::tempdir().unwrap();
            let orch = orchestrator(dir.path(), Arc::new(MemoryJobStore::new()));

            let outcome = orch
                .run(request(language, broken_program(language), ""))
                .await
                .unwrap();
            assert_eq!(outcome.job.status, JobStatus::Error, "{}", language);
            assert!(!outcome.job.output.trim().is_empty(), "{}", language);
            assert!(matches!(
                outcome.result.outcome,
                Outcome::CompileError | Outcome::RuntimeError
            ));
            // host paths are not leaked into diagnostics
            assert!(!outcome.job.output.contains(&dir.path().to_string_lossy().to_string()));
        }
    }

    #[tokio::test]
    async fn test_compile_error_is_classified_separately() {
        if !available(Language::Cpp) {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let orch = orchestrator(dir.path(), Arc::new(MemoryJobStore::new()));
        let outcome = orch
            .run(request(Language::Cpp, broken_program(Language::Cpp), ""))
            .await
            .unwrap();
        assert_eq!(outcome.result.outcome, Outcome::CompileError);
        assert!(outcome.job.output.contains("solution.cpp"));
    }

    #[tokio::test]
    async fn test_missing_runtime_marks_job_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryJobStore::new());
        let languages = LanguageConfigManager::from_json(
            r#"{ "languages": [ { "name": "python", "runtime": "algoforge-missing-python" } ] }"#,
        )
        .unwrap();
        let orch = Orchestrator::new(
            Materializer::new(dir.path()),
            languages,
            store.clone(),
            1,
            Duration::from_secs(5),
        );

        let outcome = orch.run(request(Language::Python, "print(1)", "")).await.unwrap();
        assert_eq!(outcome.result.outcome, Outcome::RuntimeError);
        assert_eq!(outcome.job.status, JobStatus::Error);
        assert!(outcome.job.output.contains("algoforge-missing-python"));
    }

    #[test]
    fn test_parse_applies_defaults() {
        let req = ExecutionRequest::parse(None, Some("int main(){}".to_string()), None, None).unwrap();
        assert_eq!(req.language, Language::Cpp);
        assert_eq!(req.input, "");

        let err = ExecutionRequest::parse(Some("python"), None, None, None).unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidRequest(_)));
    }

    #[test]
    fn test_unsupported_language_rejected_at_parse() {
        let err = ExecutionRequest::parse(Some("cobol"), Some("DISPLAY 'HI'".to_string()), None, None)
            .unwrap_err();
        assert!(matches!(err, ExecutionError::UnsupportedLanguage(_)));
        assert!(err.is_caller_error());
        assert_eq!(err.to_string(), "Unsupported Language: cobol");
    }

    #[tokio::test]
    async fn test_oversized_source_rejected_before_disk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("scratch");
        let store = Arc::new(MemoryJobStore::new());
        let orch = orchestrator(&root, store.clone());

        let huge = "x".repeat(MAX_SOURCE_CODE_BYTES + 1);
        let err = orch.run(request(Language::Python, &huge, "")).await.unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidRequest(_)));
        assert!(!root.exists());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_full_gate_rejects_with_busy() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("scratch");
        let store = Arc::new(MemoryJobStore::new());
        let orch = Orchestrator::new(
            Materializer::new(&root),
            LanguageConfigManager::default(),
            store.clone(),
            1,
            Duration::from_millis(50),
        );

        let _held = orch.gate.clone().acquire_owned().await.unwrap();
        assert_eq!(orch.available_slots(), 0);

        let err = orch.run(request(Language::Python, "print(1)", "")).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Busy));
        assert!(!root.exists());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_isolated() {
        if !available(Language::Python) {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryJobStore::new());
        let orch = Arc::new(orchestrator(dir.path(), store.clone()));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let orch = orch.clone();
                tokio::spawn(async move {
                    let code = format!("import sys\nprint('{}:' + sys.stdin.read().strip())\n", i);
                    let outcome = orch
                        .run(request(Language::Python, &code, &format!("in{}", i)))
                        .await
                        .unwrap();
                    (i, code, outcome)
                })
            })
            .collect();

        let results = futures_util::future::join_all(handles).await;
        let mut paths = std::collections::HashSet::new();
        for joined in results {
            let (i, code, outcome) = joined.unwrap();
            assert_eq!(outcome.job.output, format!("{}:in{}\n", i, i));
            assert_eq!(outcome.job.source_code, code);
            assert!(paths.insert(outcome.job.source_path.clone()));
        }
        assert_eq!(store.len().await, 8);
        assert!(store.all().await.iter().all(|j| j.status == JobStatus::Success));
    }
}
