use thiserror::Error;

/// 和後端溝通時的傳輸層錯誤
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("http {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid base url {0:?}")]
    InvalidUrl(String),
}

/// 元件邊界上的錯誤；每一種最後都轉成使用者看得到的訊息
#[derive(Error, Debug)]
pub enum WidgetError {
    #[error("tasks unavailable: {0}")]
    CatalogUnavailable(String),

    /// 後端回了 `{error}` 或回應不完整
    #[error("{message}")]
    Rejected { message: String },

    /// 請求沒有送達或回應讀不到
    #[error("{message}")]
    Unreachable { message: String },

    #[error("job {0} is already being polled")]
    AlreadyPolling(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("expected YYYY-MM-DDTHH:MM, got {0:?}")]
    Malformed(String),

    #[error("{0} does not exist in the local time zone")]
    Nonexistent(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("tasks unavailable")]
    CatalogUnavailable,

    #[error("unknown category {0:?}")]
    UnknownCategory(String),

    #[error("task selection is disabled")]
    TaskDisabled,

    #[error("task {task:?} is not in category {category:?}")]
    UnknownTask { category: String, task: String },
}

pub type Result<T> = std::result::Result<T, WidgetError>;
