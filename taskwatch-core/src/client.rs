use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::{
    error::ServiceError,
    job::JobHandle,
    protocol::{
        CatalogResponse, HealthResponse, RunTaskRequest, RunTaskResponse, ScheduledTask,
        StatusResponse, TasksResponse,
    },
};

/// 後端任務服務的 HTTP 契約
#[async_trait]
pub trait TaskService: Send + Sync {
    /// GET /list_tasks
    async fn list_tasks(&self) -> Result<CatalogResponse, ServiceError>;

    /// POST /run_task；`{error}` 也算正常回應，交給呼叫端判斷
    async fn run_task(&self, req: &RunTaskRequest) -> Result<RunTaskResponse, ServiceError>;

    /// GET /task_status/{job_id}
    async fn task_status(&self, job: &JobHandle) -> Result<StatusResponse, ServiceError>;

    /// GET /tasks
    async fn scheduled_tasks(&self) -> Result<Vec<ScheduledTask>, ServiceError>;

    /// GET /health
    async fn health(&self) -> Result<HealthResponse, ServiceError>;
}

pub struct HttpTaskService {
    base_url: Url,
    client: Client,
}

impl HttpTaskService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let base_url =
            Url::parse(base_url).map_err(|_| ServiceError::InvalidUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ServiceError::InvalidUrl(base_url.to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// 每段各自 percent-encode，job_id 裡的 `/` 不會變成路徑
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ServiceError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments.iter().copied());
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ServiceError> {
        debug!(%url, "GET");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl TaskService for HttpTaskService {
    async fn list_tasks(&self) -> Result<CatalogResponse, ServiceError> {
        self.get_json(self.endpoint(&["list_tasks"])?).await
    }

    async fn run_task(&self, req: &RunTaskRequest) -> Result<RunTaskResponse, ServiceError> {
        let url = self.endpoint(&["run_task"])?;
        debug!(%url, task = %req.task, "POST");
        let resp = self.client.post(url).json(req).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        // 400 也會帶 {error}，先試著解開
        match serde_json::from_str::<RunTaskResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn task_status(&self, job: &JobHandle) -> Result<StatusResponse, ServiceError> {
        self.get_json(self.endpoint(&["task_status", job.id()])?).await
    }

    async fn scheduled_tasks(&self) -> Result<Vec<ScheduledTask>, ServiceError> {
        let resp: TasksResponse = self.get_json(self.endpoint(&["tasks"])?).await?;
        Ok(resp.tasks)
    }

    async fn health(&self) -> Result<HealthResponse, ServiceError> {
        self.get_json(self.endpoint(&["health"])?).await
    }
}
