use serde::{Deserialize, Serialize};
use std::fmt;

use crate::protocol::StatusResponse;

/// 後端回傳的 job 識別（不透明字串）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: String,
}

impl JobHandle {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self { job_id: job_id.into() }
    }

    pub fn id(&self) -> &str {
        &self.job_id
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.job_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Completed,
    Recurring,
    Failed,
    /// pending / running / unknown……任何非終止狀態
    Active(String),
}

impl JobStatus {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "completed" => JobStatus::Completed,
            "recurring" => JobStatus::Recurring,
            "failed" => JobStatus::Failed,
            other => JobStatus::Active(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Active(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Completed => "completed",
            JobStatus::Recurring => "recurring",
            JobStatus::Failed => "failed",
            JobStatus::Active(s) => s,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次狀態查詢的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: JobStatus,
    pub next_time: Option<String>,
}

impl StatusReport {
    pub fn new(status: &str, next_time: Option<&str>) -> Self {
        Self {
            status: JobStatus::from_wire(status),
            next_time: next_time.map(str::to_string),
        }
    }
}

impl From<StatusResponse> for StatusReport {
    fn from(resp: StatusResponse) -> Self {
        Self {
            status: JobStatus::from_wire(&resp.status),
            // 後端可能回空字串
            next_time: resp.next_time.filter(|s| !s.trim().is_empty()),
        }
    }
}
