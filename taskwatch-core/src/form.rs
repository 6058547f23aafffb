//! 表單的 UI 狀態。所有顯示用的東西（欄位值、欄位錯誤、提示）都在這裡，
//! 畫面只負責把它渲染出來。

use chrono::{DateTime, TimeZone};

use crate::{
    catalog::{TaskCatalog, TaskSelector},
    error::SelectionError,
    protocol::{Recurrence, TaskRequest},
    time::parse_local_naive,
    validate::{validate, Field, TaskForm, ValidationErrorSet},
};

#[derive(Debug, Clone, Default)]
pub struct FormState {
    selector: TaskSelector,
    scheduled_time: Option<String>,
    recurrence: Recurrence,
    errors: ValidationErrorSet,
    /// 時間欄位下方的提示（不是錯誤）
    notice: Option<String>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selector(&self) -> &TaskSelector {
        &self.selector
    }

    pub fn set_catalog(&mut self, catalog: TaskCatalog) {
        self.selector.set_catalog(catalog);
    }

    pub fn set_catalog_unavailable(&mut self, reason: impl Into<String>) {
        self.selector.set_unavailable(reason);
    }

    pub fn errors(&self) -> &ValidationErrorSet {
        &self.errors
    }

    pub fn error(&self, field: Field) -> Option<&str> {
        self.errors.get(field)
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn scheduled_time(&self) -> Option<&str> {
        self.scheduled_time.as_deref()
    }

    pub fn recurrence(&self) -> Recurrence {
        self.recurrence
    }

    // 編輯欄位 → 立刻清掉該欄位的錯誤，不必重新驗證

    pub fn set_category(&mut self, category: &str) -> Result<&[String], SelectionError> {
        self.errors.clear(Field::Category);
        self.selector.select_category(category)
    }

    pub fn set_task(&mut self, task: &str) -> Result<(), SelectionError> {
        self.errors.clear(Field::Task);
        self.selector.select_task(task)
    }

    pub fn set_scheduled_time(&mut self, input: Option<&str>) {
        self.errors.clear(Field::Time);
        self.scheduled_time = input
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
    }

    pub fn set_recurrence(&mut self, recurrence: Recurrence) {
        self.recurrence = recurrence;
    }

    pub fn set_notice(&mut self, notice: Option<&str>) {
        self.notice = notice.map(str::to_string);
    }

    pub fn snapshot(&self) -> TaskForm {
        TaskForm {
            category: self.selector.category().unwrap_or_default().to_string(),
            task: self.selector.task().unwrap_or_default().to_string(),
            scheduled_time: self.scheduled_time.clone(),
        }
    }

    /// 清掉舊錯誤再驗證；通過就回傳要送出的 TaskRequest
    pub fn check<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Option<TaskRequest> {
        self.errors.clear_all();
        let form = self.snapshot();
        let errors = validate(&form, now);
        if !errors.is_empty() {
            self.errors = errors;
            return None;
        }

        // 驗證過了，時間一定解析得了
        let scheduled_time = match form.scheduled_time.as_deref().map(parse_local_naive) {
            Some(Ok(t)) => Some(t),
            Some(Err(_)) => return None,
            None => None,
        };
        Some(TaskRequest {
            task: form.task,
            scheduled_time,
            recurrence: self.recurrence,
        })
    }

    /// 送出成功後：欄位歸零、錯誤清空，目錄保留
    pub fn reset(&mut self) {
        self.selector.clear();
        self.scheduled_time = None;
        self.recurrence = Recurrence::None;
        self.errors.clear_all();
        self.notice = None;
    }
}
