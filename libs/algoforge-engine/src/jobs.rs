//! Job Lifecycle Tracker
//!
//! One record per submission. A job is created `pending` and completed
//! exactly once, with its output written in the same step as the status.
//! Jobs are never deleted here.

use algoforge_common::redis as job_redis;
use algoforge_common::types::{Job, JobStatus, NewJob};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Record a new `pending` job
    async fn create(&self, new_job: NewJob) -> Result<Job, StoreError>;

    /// Transition a pending job to `status`, which must be terminal
    async fn complete(&self, job_id: Uuid, status: JobStatus, output: String) -> Result<Job, StoreError>;

    /// Fetch one job. Jobs owned by someone other than `requester` are
    /// reported as absent.
    async fn get(&self, job_id: Uuid, requester: Option<&str>) -> Result<Option<Job>, StoreError>;

    /// An owner's jobs, most recently submitted first
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Job>, StoreError>;
}

fn check_terminal(status: JobStatus) -> Result<(), StoreError> {
    if status.is_terminal() {
        Ok(())
    } else {
        Err(StoreError::InvalidTransition(status))
    }
}

/// Process-local store, used by the CLI and tests
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Every stored job, newest first, regardless of owner
    pub async fn all(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        jobs
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, new_job: NewJob) -> Result<Job, StoreError> {
        let job = Job::pending(new_job);
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn complete(&self, job_id: Uuid, status: JobStatus, output: String) -> Result<Job, StoreError> {
        check_terminal(status)?;

        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&job_id).ok_or(StoreError::NotFound(job_id))?;
        if job.status.is_terminal() {
            return Err(StoreError::AlreadyCompleted(job_id));
        }
        job.status = status;
        job.output = output;
        job.completed_at = Some(Utc::now());
        Ok(job.clone())
    }

    async fn get(&self, job_id: Uuid, requester: Option<&str>) -> Result<Option<Job>, StoreError> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(&job_id).filter(|job| job.visible_to(requester)).cloned())
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.owner_id.as_deref() == Some(owner_id))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(jobs)
    }
}

/// Redis-backed store; see `algoforge_common::redis` for the key layout
#[derive(Clone)]
pub struct RedisJobStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisJobStore {
    pub fn new(conn: redis::aio::ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn create(&self, new_job: NewJob) -> Result<Job, StoreError> {
        let job = Job::pending(new_job);
        let mut conn = self.conn.clone();
        job_redis::insert_job(&mut conn, &job).await?;
        debug!(job_id = %job.id, "Job record created");
        Ok(job)
    }

    async fn complete(&self, job_id: Uuid, status: JobStatus, output: String) -> Result<Job, StoreError> {
        check_terminal(status)?;

        let mut conn = self.conn.clone();
        match job_redis::complete_job(&mut conn, &job_id, status, &output, Utc::now()).await? {
            job_redis::CompletionWrite::Written(job) => Ok(job),
            job_redis::CompletionWrite::Missing => Err(StoreError::NotFound(job_id)),
            job_redis::CompletionWrite::AlreadyTerminal => Err(StoreError::AlreadyCompleted(job_id)),
        }
    }

    async fn get(&self, job_id: Uuid, requester: Option<&str>) -> Result<Option<Job>, StoreError> {
        let mut conn = self.conn.clone();
        let job = job_redis::get_job(&mut conn, &job_id).await?;
        Ok(job.filter(|job| job.visible_to(requester)))
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Job>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(job_redis::list_owner_jobs(&mut conn, owner_id).await?)
    }
}
