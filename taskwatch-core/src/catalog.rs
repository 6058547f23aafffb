use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::{
    client::TaskService,
    error::{SelectionError, WidgetError},
    protocol::CatalogResponse,
};

pub const UNAVAILABLE_TEXT: &str = "Error loading tasks.";

/// 類別 → 任務清單；載入後不再變動
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskCatalog {
    categories: BTreeMap<String, Vec<String>>,
}

impl TaskCatalog {
    pub fn new(categories: BTreeMap<String, Vec<String>>) -> Self {
        Self { categories }
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn tasks(&self, category: &str) -> Option<&[String]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }
}

impl From<CatalogResponse> for TaskCatalog {
    fn from(resp: CatalogResponse) -> Self {
        Self::new(resp.available_tasks)
    }
}

/// GET /list_tasks；任何失敗都歸為 CatalogUnavailable
pub async fn load_catalog(service: &dyn TaskService) -> Result<TaskCatalog, WidgetError> {
    match service.list_tasks().await {
        Ok(resp) => {
            let catalog = TaskCatalog::from(resp);
            info!(categories = catalog.len(), "task catalog loaded");
            Ok(catalog)
        }
        Err(e) => {
            warn!(error = %e, "failed to fetch tasks");
            Err(WidgetError::CatalogUnavailable(e.to_string()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogState {
    Loading,
    Ready(TaskCatalog),
    Unavailable(String),
}

/// 類別/任務兩層下拉選單的狀態
#[derive(Debug, Clone)]
pub struct TaskSelector {
    state: CatalogState,
    category: Option<String>,
    task: Option<String>,
    task_options: Vec<String>,
    task_enabled: bool,
}

impl TaskSelector {
    pub fn new() -> Self {
        Self {
            state: CatalogState::Loading,
            category: None,
            task: None,
            task_options: Vec::new(),
            task_enabled: false,
        }
    }

    pub fn set_catalog(&mut self, catalog: TaskCatalog) {
        self.state = CatalogState::Ready(catalog);
        self.clear();
    }

    pub fn set_unavailable(&mut self, reason: impl Into<String>) {
        self.state = CatalogState::Unavailable(reason.into());
        self.clear();
    }

    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    pub fn catalog(&self) -> Option<&TaskCatalog> {
        match &self.state {
            CatalogState::Ready(c) => Some(c),
            _ => None,
        }
    }

    /// 載入失敗時顯示的狀態文字
    pub fn status_text(&self) -> Option<&'static str> {
        matches!(self.state, CatalogState::Unavailable(_)).then_some(UNAVAILABLE_TEXT)
    }

    pub fn category_enabled(&self) -> bool {
        self.catalog().is_some()
    }

    pub fn task_enabled(&self) -> bool {
        self.task_enabled
    }

    pub fn task_options(&self) -> &[String] {
        &self.task_options
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn task(&self) -> Option<&str> {
        self.task.as_deref()
    }

    /// 換類別：先清空並停用任務選單，再依新類別重新填入
    pub fn select_category(&mut self, category: &str) -> Result<&[String], SelectionError> {
        let catalog = self.catalog().ok_or(SelectionError::CatalogUnavailable)?;
        let tasks = catalog
            .tasks(category)
            .ok_or_else(|| SelectionError::UnknownCategory(category.to_string()))?
            .to_vec();

        self.task = None;
        self.task_options.clear();
        self.task_enabled = false;

        self.category = Some(category.to_string());
        if !tasks.is_empty() {
            self.task_options = tasks;
            self.task_enabled = true;
        }
        Ok(&self.task_options)
    }

    pub fn select_task(&mut self, task: &str) -> Result<(), SelectionError> {
        if !self.task_enabled {
            return Err(SelectionError::TaskDisabled);
        }
        if !self.task_options.iter().any(|t| t == task) {
            return Err(SelectionError::UnknownTask {
                category: self.category.clone().unwrap_or_default(),
                task: task.to_string(),
            });
        }
        self.task = Some(task.to_string());
        Ok(())
    }

    /// 清掉選擇但保留已載入的目錄
    pub fn clear(&mut self) {
        self.category = None;
        self.task = None;
        self.task_options.clear();
        self.task_enabled = false;
    }
}

impl Default for TaskSelector {
    fn default() -> Self {
        Self::new()
    }
}
