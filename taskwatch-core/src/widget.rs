use chrono::{DateTime, Local, TimeZone};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    catalog::load_catalog,
    client::TaskService,
    config::ClientConfig,
    error::WidgetError,
    form::FormState,
    job::JobHandle,
    notify::{Notification, NotificationSink},
    poller::{PollState, StatusPoller},
    submit::JobSubmitter,
    time::MinSelectable,
    validate::ValidationErrorSet,
};

#[derive(Debug)]
pub enum SubmitOutcome {
    /// 欄位有錯，沒有發出任何請求
    Invalid(ValidationErrorSet),
    /// 後端拒絕或連不上；表單保留原樣
    Rejected(String),
    Accepted {
        job: JobHandle,
        message: String,
        /// None：這個 job 已經有 session 在追了
        session: Option<JoinHandle<PollState>>,
    },
}

/// 表單 + 提交 + 輪詢 串起來的整個 widget
pub struct TaskWidget {
    service: Arc<dyn TaskService>,
    sink: Arc<dyn NotificationSink>,
    poller: Arc<StatusPoller>,
    min_selectable: MinSelectable,
    notice_delay: Duration,
    form: FormState,
}

impl TaskWidget {
    pub fn new(service: Arc<dyn TaskService>, sink: Arc<dyn NotificationSink>, config: &ClientConfig) -> Self {
        let poller = Arc::new(StatusPoller::new(service.clone(), sink.clone(), config.poll()));
        Self {
            service,
            sink,
            poller,
            min_selectable: MinSelectable::new(),
            notice_delay: config.immediate_notice_delay,
            form: FormState::new(),
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    pub fn poller(&self) -> &Arc<StatusPoller> {
        &self.poller
    }

    pub fn min_selectable(&self) -> &MinSelectable {
        &self.min_selectable
    }

    /// 載入失敗時表單進入「無法選任務」狀態，錯誤仍回傳給呼叫端
    pub async fn load_catalog(&mut self) -> Result<(), WidgetError> {
        match load_catalog(&*self.service).await {
            Ok(catalog) => {
                self.form.set_catalog(catalog);
                Ok(())
            }
            Err(e) => {
                self.form.set_catalog_unavailable(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn submit(&mut self) -> SubmitOutcome {
        let now = Local::now();
        self.submit_at(&now).await
    }

    pub async fn submit_at<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> SubmitOutcome {
        let Some(request) = self.form.check(now) else {
            info!(errors = ?self.form.errors(), "form rejected");
            return SubmitOutcome::Invalid(self.form.errors().clone());
        };

        let submitter = JobSubmitter::new(&*self.service, self.notice_delay);
        let (form, sink) = (&mut self.form, &self.sink);
        let result = submitter
            .submit(&request, |notice| {
                // 提示要在等待期間就送到 sink，表單欄位只是鏡像
                if let Some(text) = notice {
                    sink.notify(Notification::info(text));
                }
                form.set_notice(notice);
            })
            .await;

        let accepted = match result {
            Ok(a) => a,
            Err(e) => {
                let n = match &e {
                    WidgetError::Unreachable { .. } => Notification::warning(format!("Failed: {e}")),
                    _ => Notification::failure(format!("Error: {e}")),
                };
                self.sink.notify(n);
                return SubmitOutcome::Rejected(e.to_string());
            }
        };

        self.sink.notify(Notification::success(accepted.message.clone()));
        let session = match self.poller.spawn(accepted.job.clone()) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "not starting a second poll session");
                None
            }
        };

        self.form.reset();
        self.min_selectable.refresh();

        SubmitOutcome::Accepted {
            job: accepted.job,
            message: accepted.message,
            session,
        }
    }
}
