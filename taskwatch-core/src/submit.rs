use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{client::TaskService, error::WidgetError, job::JobHandle, protocol::TaskRequest};

pub const IMMEDIATE_NOTICE: &str = "No time selected. Task will execute immediately.";

/// 沒選時間時的固定提示時間（只是提示，不能取消）
pub const IMMEDIATE_NOTICE_DELAY: Duration = Duration::from_millis(2000);

/// 後端接受的回應
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub message: String,
    pub job: JobHandle,
}

pub struct JobSubmitter<'a> {
    service: &'a dyn TaskService,
    notice_delay: Duration,
}

impl<'a> JobSubmitter<'a> {
    pub fn new(service: &'a dyn TaskService, notice_delay: Duration) -> Self {
        Self {
            service,
            notice_delay,
        }
    }

    /// 送出任務。沒有 scheduled_time 時先透過 `on_notice(Some(..))` 顯示提示，
    /// 等 notice_delay，再 `on_notice(None)` 清掉後送出；一旦開始就不能中止。
    pub async fn submit<F>(&self, request: &TaskRequest, mut on_notice: F) -> Result<Accepted, WidgetError>
    where
        F: FnMut(Option<&str>) + Send,
    {
        if request.scheduled_time.is_none() {
            info!(task = %request.task, "no time selected, executing immediately");
            on_notice(Some(IMMEDIATE_NOTICE));
            sleep(self.notice_delay).await;
            on_notice(None);
        }

        let wire = request.to_wire();
        let resp = self.service.run_task(&wire).await.map_err(|e| {
            warn!(task = %request.task, error = %e, "submit failed");
            WidgetError::Unreachable {
                message: e.to_string(),
            }
        })?;

        if let Some(error) = resp.error {
            warn!(task = %request.task, %error, "backend rejected task");
            return Err(WidgetError::Rejected { message: error });
        }
        let job_id = resp
            .job_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| WidgetError::Rejected {
                message: "response carried no job_id".to_string(),
            })?;

        let message = resp.message.unwrap_or_default();
        info!(task = %request.task, %job_id, %message, "task submitted");
        Ok(Accepted {
            message,
            job: JobHandle::new(job_id),
        })
    }
}
