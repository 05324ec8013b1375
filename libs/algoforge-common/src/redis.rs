//! Redis job-record semantics shared by every process that touches jobs.
//! Keys are deterministic so the API and the CLI never drift.

use crate::types::{Job, JobStatus};
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, RedisResult};
use std::fmt;
use uuid::Uuid;

pub const JOB_PREFIX: &str = "algoforge:job";
pub const OWNER_PREFIX: &str = "algoforge:owner";

/// Terminal transition as a single server-side step: the record is only
/// rewritten while it is still pending.
/// Returns 0 when the key is missing, -1 when the job is already terminal,
/// otherwise the re-encoded record.
const COMPLETE_JOB_SCRIPT: &str = r#"
local raw = redis.call('GET', KEYS[1])
if not raw then
  return 0
end
local job = cjson.decode(raw)
if job.status ~= 'pending' then
  return -1
end
job.status = ARGV[1]
job.output = ARGV[2]
job.completedAt = ARGV[3]
local encoded = cjson.encode(job)
redis.call('SET', KEYS[1], encoded)
return encoded
"#;

/// Generate the record key for a job. Accepts a `Uuid` or its string form
/// as read back from the owner index.
pub fn job_key(job_id: impl fmt::Display) -> String {
    format!("{}:{}", JOB_PREFIX, job_id)
}

/// Generate the per-owner history index key
pub fn owner_index_key(owner_id: &str) -> String {
    format!("{}:{}:jobs", OWNER_PREFIX, owner_id)
}

/// Result of attempting the pending → terminal write
#[derive(Debug)]
pub enum CompletionWrite {
    Written(Job),
    Missing,
    AlreadyTerminal,
}

fn serialization_error(e: serde_json::Error) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::TypeError, "serialization error", e.to_string()))
}

fn deserialization_error(e: serde_json::Error) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::TypeError, "deserialization error", e.to_string()))
}

/// Store a freshly created job and index it under its owner.
/// Jobs carry no TTL: history is never expired by this subsystem.
pub async fn insert_job(
    conn: &mut redis::aio::ConnectionManager,
    job: &Job,
) -> RedisResult<()> {
    let payload = serde_json::to_string(job).map_err(serialization_error)?;
    let key = job_key(&job.id);

    let mut pipe = redis::pipe();
    pipe.atomic().set(&key, payload).ignore();
    if let Some(owner) = &job.owner_id {
        pipe.zadd(
            owner_index_key(owner),
            job.id.to_string(),
            job.submitted_at.timestamp_millis(),
        )
        .ignore();
    }
    pipe.query_async(conn).await
}

/// Move a pending job to its terminal status, writing output in the same step
pub async fn complete_job(
    conn: &mut redis::aio::ConnectionManager,
    job_id: &Uuid,
    status: JobStatus,
    output: &str,
    completed_at: DateTime<Utc>,
) -> RedisResult<CompletionWrite> {
    let script = redis::Script::new(COMPLETE_JOB_SCRIPT);
    let value: redis::Value = script
        .key(job_key(job_id))
        .arg(status.as_str())
        .arg(output)
        .arg(completed_at.to_rfc3339())
        .invoke_async(conn)
        .await?;

    match value {
        redis::Value::Int(0) => Ok(CompletionWrite::Missing),
        redis::Value::Int(_) => Ok(CompletionWrite::AlreadyTerminal),
        redis::Value::Data(bytes) => {
            let job: Job = serde_json::from_slice(&bytes).map_err(deserialization_error)?;
            Ok(CompletionWrite::Written(job))
        }
        other => Err(redis::RedisError::from((
            redis::ErrorKind::TypeError,
            "unexpected script reply",
            format!("{:?}", other),
        ))),
    }
}

/// Retrieve one job record
pub async fn get_job(
    conn: &mut redis::aio::ConnectionManager,
    job_id: &Uuid,
) -> RedisResult<Option<Job>> {
    let payload: Option<String> = conn.get(job_key(job_id)).await?;

    match payload {
        Some(data) => {
            let job: Job = serde_json::from_str(&data).map_err(deserialization_error)?;
            Ok(Some(job))
        }
        None => Ok(None),
    }
}

/// List an owner's jobs, most recently submitted first
pub async fn list_owner_jobs(
    conn: &mut redis::aio::ConnectionManager,
    owner_id: &str,
) -> RedisResult<Vec<Job>> {
    let ids: Vec<String> = conn.zrevrange(owner_index_key(owner_id), 0, -1).await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let keys: Vec<String> = ids
        .iter()
        .map(|id| job_key(id))
        .collect();
    let payloads: Vec<Option<String>> = redis::cmd("MGET").arg(&keys).query_async(conn).await?;

    payloads
        .into_iter()
        .flatten()
        .map(|data| serde_json::from_str::<Job>(&data).map_err(deserialization_error))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_key_deterministic() {
        let id = Uuid::new_v4();
        let key1 = job_key(&id);
        let key2 = job_key(&id);
        assert_eq!(key1, key2);
        assert!(key1.starts_with("algoforge:job:"));
        assert!(key1.contains(&id.to_string()));
        assert_eq!(job_key(id.to_string()), key1);
    }

    #[test]
    fn test_owner_index_key_format() {
        assert_eq!(owner_index_key("alice"), "algoforge:owner:alice:jobs");
    }
}
