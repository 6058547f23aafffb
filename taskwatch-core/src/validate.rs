use chrono::{DateTime, TimeZone};
use std::{collections::BTreeMap, fmt};

use crate::time::{is_past, parse_local_in};

pub const CATEGORY_REQUIRED: &str = "Please select a category.";
pub const TASK_REQUIRED: &str = "Please select a task.";
pub const TIME_IN_PAST: &str = "Scheduled time must be in the future.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Category,
    Task,
    Time,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Category => "category",
            Field::Task => "task",
            Field::Time => "time",
        })
    }
}

/// 欄位 → 錯誤訊息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrorSet {
    errors: BTreeMap<Field, String>,
}

impl ValidationErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.errors.insert(field, message.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn clear(&mut self, field: Field) {
        self.errors.remove(&field);
    }

    pub fn clear_all(&mut self) {
        self.errors.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.errors.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.errors.iter().map(|(f, m)| (*f, m.as_str()))
    }
}

/// 表單當下的值（都是字串，還沒驗證）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub category: String,
    pub task: String,
    pub scheduled_time: Option<String>,
}

/// 每條規則獨立檢查，不短路
pub fn validate<Tz: TimeZone>(form: &TaskForm, now: &DateTime<Tz>) -> ValidationErrorSet {
    let mut errors = ValidationErrorSet::new();

    if form.category.trim().is_empty() {
        errors.insert(Field::Category, CATEGORY_REQUIRED);
    }
    if form.task.trim().is_empty() {
        errors.insert(Field::Task, TASK_REQUIRED);
    }
    if let Some(raw) = form.scheduled_time.as_deref() {
        // 解析失敗也當成「不在未來」
        let in_future = parse_local_in(raw, &now.timezone())
            .map(|t| !is_past(&t, now))
            .unwrap_or(false);
        if !in_future {
            errors.insert(Field::Time, TIME_IN_PAST);
        }
    }
    errors
}
