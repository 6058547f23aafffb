use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

use crate::time::LOCAL_INPUT_FORMAT;

/// 重複規則（後端只認得這幾種）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Hourly,
    Daily,
    Weekly,
}

impl Recurrence {
    pub const ALL: [Recurrence; 4] = [
        Recurrence::None,
        Recurrence::Hourly,
        Recurrence::Daily,
        Recurrence::Weekly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Recurrence::None => "none",
            Recurrence::Hourly => "hourly",
            Recurrence::Daily => "daily",
            Recurrence::Weekly => "weekly",
        }
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recurrence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Recurrence::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown recurrence {s:?} (none, hourly, daily, weekly)"))
    }
}

/// 一次送出的任務（不在客戶端保存）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    pub task: String,
    /// None = 立即執行；本地牆上時間
    pub scheduled_time: Option<NaiveDateTime>,
    pub recurrence: Recurrence,
}

impl TaskRequest {
    pub fn to_wire(&self) -> RunTaskRequest {
        RunTaskRequest {
            task: self.task.clone(),
            scheduled_time: self
                .scheduled_time
                .map(|t| t.format(LOCAL_INPUT_FORMAT).to_string()),
            recurrence: self.recurrence,
        }
    }
}

/// GET /list_tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub available_tasks: BTreeMap<String, Vec<String>>,
}

/// POST /run_task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTaskRequest {
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
    pub recurrence: Recurrence,
}

/// 成功：{message, job_id}；失敗：{error}
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunTaskResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// GET /task_status/{job_id}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub job_id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub next_time: Option<String>,
}

/// GET /tasks 的一列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: i64,
    pub task: String,
    pub status: String,
    #[serde(default)]
    pub scheduled_time: Option<String>,
    pub job_id: String,
    #[serde(default, deserialize_with = "flag")]
    pub is_recurring: bool,
    #[serde(default)]
    pub last_run: Option<String>,
    #[serde(default)]
    pub next_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksResponse {
    pub tasks: Vec<ScheduledTask>,
}

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

// SQLite 存的是 0/1，也接受 true/false
fn flag<'de, D>(de: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }
    Ok(match Flag::deserialize(de)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
    })
}
