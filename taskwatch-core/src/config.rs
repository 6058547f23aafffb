use std::time::Duration;

use crate::{poller::PollConfig, submit::IMMEDIATE_NOTICE_DELAY, time::MIN_SELECTABLE_REFRESH};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5001";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_POLL_MAX_DURATION: Duration = Duration::from_millis(300_000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// 客戶端設定；base URL 以外都有固定預設值
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 後端位址
    pub base_url: String,
    /// 單一 HTTP 請求逾時
    pub request_timeout: Duration,
    /// 輪詢間隔
    pub poll_interval: Duration,
    /// 輪詢總時長；次數上限 = poll_max_duration / poll_interval
    pub poll_max_duration: Duration,
    /// 沒選時間時，送出前的提示時間
    pub immediate_notice_delay: Duration,
    /// 最早可選時間的重算間隔
    pub min_selectable_refresh: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_max_duration: DEFAULT_POLL_MAX_DURATION,
            immediate_notice_delay: IMMEDIATE_NOTICE_DELAY,
            min_selectable_refresh: MIN_SELECTABLE_REFRESH,
        }
    }
}

impl ClientConfig {
    pub fn poll(&self) -> PollConfig {
        PollConfig::new(self.poll_interval, self.poll_max_duration)
    }
}
