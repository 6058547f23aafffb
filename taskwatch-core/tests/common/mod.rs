#![allow(dead_code)]

use async_trait::async_trait;
use std::{
    collections::{BTreeMap, VecDeque},
    sync::Mutex,
};
use tokio::time::Instant;

use taskwatch_core::{
    error::ServiceError,
    protocol::{
        CatalogResponse, HealthResponse, RunTaskRequest, RunTaskResponse, ScheduledTask,
        StatusResponse,
    },
    JobHandle, TaskService,
};

/// 一次狀態查詢要回什麼
#[derive(Debug, Clone)]
pub enum Step {
    Status(&'static str, Option<&'static str>),
    Down,
}

pub fn st(s: &'static str) -> Step {
    Step::Status(s, None)
}

/// 依腳本回應的假後端；記下每次呼叫的時間（tokio 時鐘）
#[derive(Default)]
pub struct ScriptedService {
    catalog: Option<BTreeMap<String, Vec<String>>>,
    run_reply: Option<RunTaskResponse>,
    steps: Mutex<VecDeque<Step>>,
    pub run_calls: Mutex<Vec<(RunTaskRequest, Instant)>>,
    pub status_calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(mut self, entries: &[(&str, &[&str])]) -> Self {
        let map = entries
            .iter()
            .map(|(c, tasks)| (c.to_string(), tasks.iter().map(|t| t.to_string()).collect()))
            .collect();
        self.catalog = Some(map);
        self
    }

    pub fn accepting(mut self, message: &str, job_id: &str) -> Self {
        self.run_reply = Some(RunTaskResponse {
            message: Some(message.to_string()),
            job_id: Some(job_id.to_string()),
            error: None,
        });
        self
    }

    pub fn rejecting(mut self, error: &str) -> Self {
        self.run_reply = Some(RunTaskResponse {
            error: Some(error.to_string()),
            ..Default::default()
        });
        self
    }

    /// 腳本用完之後一律回 running
    pub fn with_steps(self, steps: impl IntoIterator<Item = Step>) -> Self {
        *self.steps.lock().unwrap() = steps.into_iter().collect();
        self
    }

    pub fn run_count(&self) -> usize {
        self.run_calls.lock().unwrap().len()
    }

    pub fn status_count(&self) -> usize {
        self.status_calls.lock().unwrap().len()
    }

    pub fn status_times(&self) -> Vec<Instant> {
        self.status_calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

fn down() -> ServiceError {
    ServiceError::Status {
        status: 503,
        body: "service unavailable".to_string(),
    }
}

#[async_trait]
impl TaskService for ScriptedService {
    async fn list_tasks(&self) -> Result<CatalogResponse, ServiceError> {
        self.catalog
            .clone()
            .map(|available_tasks| CatalogResponse { available_tasks })
            .ok_or_else(down)
    }

    async fn run_task(&self, req: &RunTaskRequest) -> Result<RunTaskResponse, ServiceError> {
        self.run_calls.lock().unwrap().push((req.clone(), Instant::now()));
        self.run_reply.clone().ok_or_else(down)
    }

    async fn task_status(&self, job: &JobHandle) -> Result<StatusResponse, ServiceError> {
        self.status_calls
            .lock()
            .unwrap()
            .push((job.job_id.clone(), Instant::now()));
        let step = self.steps.lock().unwrap().pop_front().unwrap_or(st("running"));
        match step {
            Step::Status(status, next_time) => Ok(StatusResponse {
                job_id: Some(job.job_id.clone()),
                status: status.to_string(),
                next_time: next_time.map(str::to_string),
            }),
            Step::Down => Err(down()),
        }
    }

    async fn scheduled_tasks(&self) -> Result<Vec<ScheduledTask>, ServiceError> {
        Ok(Vec::new())
    }

    async fn health(&self) -> Result<HealthResponse, ServiceError> {
        Ok(HealthResponse {
            status: "ok".to_string(),
        })
    }
}
