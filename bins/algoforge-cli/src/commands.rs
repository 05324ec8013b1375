// CLI commands for local runs and language settings
use algoforge_common::types::Language;
use algoforge_engine::{ExecutionRequest, LanguageConfigManager, Materializer, MemoryJobStore, Orchestrator};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Language from `--language`, or from the file extension
fn resolve_language(file: &Path, language: Option<&str>) -> Result<Language> {
    if let Some(name) = language {
        return Ok(name.parse()?);
    }
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .with_context(|| format!("Cannot infer language of {}, pass --language", file.display()))?;
    match Language::from_extension(ext) {
        Some(language) => Ok(language),
        None => bail!("Unsupported Language: {}", ext),
    }
}

/// Run one file through the execution pipeline. Returns whether it succeeded.
pub async fn run_file(
    config_path: &Path,
    file: &Path,
    language: Option<&str>,
    input: Option<&Path>,
    stdin: Option<String>,
    storage_root: &Path,
) -> Result<bool> {
    let language = resolve_language(file, language)?;
    let code = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let stdin = match input {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read input file {}", path.display()))?,
        ),
        None => stdin,
    };

    let languages = LanguageConfigManager::load_or_default(config_path)?;
    let orchestrator = Orchestrator::new(
        Materializer::new(storage_root),
        languages,
        Arc::new(MemoryJobStore::new()),
        1,
        Duration::from_secs(1),
    );

    let request = ExecutionRequest::parse(Some(language.as_str()), Some(code), stdin, None)?;
    let outcome = orchestrator.run(request).await?;

    if outcome.result.is_success() {
        print!("{}", outcome.job.output);
        eprintln!(
            "--- {} in {} ms ({})",
            outcome.result.outcome,
            outcome.result.elapsed_ms,
            outcome.source_path().display()
        );
        Ok(true)
    } else {
        eprintln!("{}", outcome.job.output);
        eprintln!("--- {} in {} ms", outcome.result.outcome, outcome.result.elapsed_ms);
        Ok(false)
    }
}

/// Print the resolved settings table
pub fn list_languages(config_path: &Path) -> Result<()> {
    let manager = LanguageConfigManager::load_or_default(config_path)?;
    println!("{}", render_table(&manager));
    Ok(())
}

fn render_table(manager: &LanguageConfigManager) -> String {
    let mut lines = vec![format!(
        "{:<12} {:<10} {:<10} {:>8}",
        "LANGUAGE", "COMPILER", "RUNTIME", "TIMEOUT"
    )];
    for config in manager.list() {
        lines.push(format!(
            "{:<12} {:<10} {:<10} {:>6}ms",
            config.name.as_str(),
            config.compiler.as_deref().unwrap_or("-"),
            config.runtime.as_deref().unwrap_or("-"),
            config.timeout_ms
        ));
    }
    lines.join("\n")
}

/// Write the built-in settings to `config_path`
pub fn init_config(config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "{} already exists, pass --force to overwrite",
            config_path.display()
        );
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json_content = LanguageConfigManager::default().to_json_pretty()?;
    fs::write(config_path, json_content)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Created: {}", config_path.display());
    Ok(())
}
