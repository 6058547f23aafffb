//! 狀態輪詢：每個 job 一個 session，直到終止狀態、網路錯誤或次數用完。
//!
//! 狀態轉移是純函式（`PollState::advance`）；`StatusPoller` 只負責計時、
//! 查詢，以及在結束時發出唯一一則通知。

use chrono::{Local, TimeZone};
use dashmap::{mapref::entry::Entry, DashMap};
use std::{fmt::Display, sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::{sleep, Instant}};
use tracing::{debug, info, warn};

use crate::{
    client::TaskService,
    error::WidgetError,
    job::{JobHandle, JobStatus, StatusReport},
    notify::{Notification, NotificationSink},
    time::format_next_run_in,
};

pub const TASK_COMPLETED: &str = "Task completed.";
pub const TASK_FAILED: &str = "Task failed.";
pub const STATUS_TIMEOUT: &str = "Task status timeout. It may have finished shortly after.";
pub const STATUS_UNREACHABLE: &str = "Could not check task status.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_duration: Duration,
}

impl PollConfig {
    pub fn new(interval: Duration, max_duration: Duration) -> Self {
        Self {
            interval,
            max_duration,
        }
    }

    /// 次數上限 = floor(max_duration / interval)
    pub fn budget(&self) -> u32 {
        self.max_duration
            .as_nanos()
            .checked_div(self.interval.as_nanos())
            .map(|n| n.min(u32::MAX as u128) as u32)
            .unwrap_or(0)
    }

    /// 第一次查詢延後 1.5 個間隔，避開後端建立 job 的延遲
    pub fn first_delay(&self) -> Duration {
        self.interval * 3 / 2
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Polling { attempts: u32 },
    Completed { next_time: Option<String> },
    Recurring { next_time: Option<String> },
    Failed,
    TimedOut { attempts: u32 },
    NetworkError(String),
}

/// 一次 tick 看到的東西
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Report(StatusReport),
    Unreachable(String),
}

impl PollState {
    pub fn start() -> Self {
        PollState::Polling { attempts: 0 }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Polling { .. })
    }

    /// 終止狀態不再變動
    pub fn advance(self, observation: Observation, budget: u32) -> PollState {
        let attempts = match self {
            PollState::Polling { attempts } => attempts,
            terminal => return terminal,
        };
        match observation {
            Observation::Unreachable(reason) => PollState::NetworkError(reason),
            Observation::Report(report) => match report.status {
                JobStatus::Completed => PollState::Completed {
                    next_time: report.next_time,
                },
                JobStatus::Recurring => PollState::Recurring {
                    next_time: report.next_time,
                },
                JobStatus::Failed => PollState::Failed,
                JobStatus::Active(_) => {
                    let attempts = attempts + 1;
                    if attempts >= budget {
                        PollState::TimedOut { attempts }
                    } else {
                        PollState::Polling { attempts }
                    }
                }
            },
        }
    }

    pub fn notification_in<Tz>(&self, tz: &Tz) -> Option<Notification>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Some(match self {
            PollState::Polling { .. } => return None,
            PollState::Completed { next_time } | PollState::Recurring { next_time } => match next_time {
                Some(raw) => Notification::success(format!(
                    "{TASK_COMPLETED} Next run scheduled at {}",
                    format_next_run_in(raw, tz)
                )),
                None => Notification::success(TASK_COMPLETED),
            },
            PollState::Failed => Notification::failure(TASK_FAILED),
            PollState::TimedOut { .. } => Notification::warning(STATUS_TIMEOUT),
            PollState::NetworkError(_) => Notification::warning(STATUS_UNREACHABLE),
        })
    }

    pub fn notification(&self) -> Option<Notification> {
        self.notification_in(&Local)
    }
}

/// 正在輪詢的 job；同一個 job 同時只能有一個 session
#[derive(Debug, Clone, Default)]
pub struct PollRegistry {
    active: Arc<DashMap<String, Instant>>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_begin(&self, job: &JobHandle) -> Option<SessionGuard> {
        match self.active.entry(job.job_id.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
                Some(SessionGuard {
                    active: self.active.clone(),
                    job_id: job.job_id.clone(),
                })
            }
        }
    }

    pub fn is_active(&self, job: &JobHandle) -> bool {
        self.active.contains_key(job.id())
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// drop 時釋放 job
#[derive(Debug)]
pub struct SessionGuard {
    active: Arc<DashMap<String, Instant>>,
    job_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some((_, started)) = self.active.remove(&self.job_id) {
            debug!(job_id = %self.job_id, elapsed_ms = started.elapsed().as_millis() as u64, "poll session released");
        }
    }
}

pub struct StatusPoller {
    service: Arc<dyn TaskService>,
    sink: Arc<dyn NotificationSink>,
    config: PollConfig,
    registry: PollRegistry,
}

impl StatusPoller {
    pub fn new(service: Arc<dyn TaskService>, sink: Arc<dyn NotificationSink>, config: PollConfig) -> Self {
        Self {
            service,
            sink,
            config,
            registry: PollRegistry::new(),
        }
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    pub fn registry(&self) -> &PollRegistry {
        &self.registry
    }

    /// 在目前的 task 裡跑完整個 session
    pub async fn run(&self, job: JobHandle) -> Result<PollState, WidgetError> {
        let _guard = self
            .registry
            .try_begin(&job)
            .ok_or_else(|| WidgetError::AlreadyPolling(job.job_id.clone()))?;
        Ok(self.drive(&job).await)
    }

    /// 背景輪詢；先同步佔住 job，重複的呼叫立刻被拒絕
    pub fn spawn(self: &Arc<Self>, job: JobHandle) -> Result<JoinHandle<PollState>, WidgetError> {
        let guard = self
            .registry
            .try_begin(&job)
            .ok_or_else(|| WidgetError::AlreadyPolling(job.job_id.clone()))?;
        let this = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let _guard = guard;
            this.drive(&job).await
        }))
    }

    async fn drive(&self, job: &JobHandle) -> PollState {
        let budget = self.config.budget();
        let mut state = PollState::start();
        let mut last_status: Option<String> = None;

        info!(job_id = %job, budget, "polling started");
        sleep(self.config.first_delay()).await;

        // 上一次的回應處理完才排下一次，不會重疊
        loop {
            let observation = match self.service.task_status(job).await {
                Ok(resp) => {
                    let report = StatusReport::from(resp);
                    if last_status.as_deref() != Some(report.status.as_str()) {
                        info!(
                            job_id = %job,
                            from = last_status.as_deref().unwrap_or("-"),
                            to = %report.status,
                            next_time = ?report.next_time,
                            "status changed"
                        );
                        last_status = Some(report.status.as_str().to_string());
                    }
                    Observation::Report(report)
                }
                Err(e) => {
                    warn!(job_id = %job, error = %e, "status check error");
                    Observation::Unreachable(e.to_string())
                }
            };

            state = state.advance(observation, budget);
            match &state {
                PollState::Polling { attempts } => {
                    debug!(job_id = %job, attempt = *attempts, "not finished yet");
                    sleep(self.config.interval).await;
                }
                _ => break,
            }
        }

        if let Some(n) = state.notification() {
            self.sink.notify(n);
        }
        info!(job_id = %job, outcome = ?state, "polling finished");
        state
    }
}
