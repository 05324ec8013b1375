//! Remote code execution core: writes submissions to scratch storage, drives
//! the per-language toolchains under a wall-clock budget, and records one job
//! per request.

pub mod config;
pub mod error;
pub mod executor;
pub mod jobs;
pub mod materializer;
pub mod orchestrator;
pub mod process;
pub mod runners;

pub use config::{LanguageConfig, LanguageConfigManager};
pub use error::{ExecutionError, StoreError};
pub use executor::{ExecutionResult, Outcome};
pub use jobs::{JobStore, MemoryJobStore, RedisJobStore};
pub use materializer::Materializer;
pub use orchestrator::{ExecutionRequest, Orchestrator, RunOutcome};
