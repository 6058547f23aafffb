//! 任務提交與狀態追蹤的客戶端元件。
//!
//! 流程：載入任務目錄 → 使用者編輯表單 → 驗證 → 提交 → 輪詢直到終止 → 通知。

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod form;
pub mod job;
pub mod notify;
pub mod poller;
pub mod protocol;
pub mod submit;
pub mod time;
pub mod validate;
pub mod widget;

pub use catalog::{load_catalog, CatalogState, TaskCatalog, TaskSelector};
pub use client::{HttpTaskService, TaskService};
pub use config::ClientConfig;
pub use error::{SelectionError, ServiceError, TimeParseError, WidgetError};
pub use form::FormState;
pub use job::{JobHandle, JobStatus, StatusReport};
pub use notify::{MemorySink, Notification, NotificationSink, ToastSlot, Tone, Visibility};
pub use poller::{PollConfig, PollRegistry, PollState, StatusPoller};
pub use protocol::{Recurrence, TaskRequest};
pub use submit::{Accepted, JobSubmitter};
pub use time::MinSelectable;
pub use validate::{validate, Field, TaskForm, ValidationErrorSet};
pub use widget::{SubmitOutcome, TaskWidget};
