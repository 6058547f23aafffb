use std::io::{self, Write};
use tracing::info;

use taskwatch_core::{
    protocol::ScheduledTask, Notification, NotificationSink, TaskCatalog, Tone,
    ValidationErrorSet,
};

/// 通知直接印在終端，同時寫進 log
pub struct TerminalSink;

impl NotificationSink for TerminalSink {
    fn notify(&self, n: Notification) {
        println!("{} {}", glyph(n.tone), n.message);
        info!(tone = ?n.tone, message = %n.message, "notification");
    }
}

fn glyph(tone: Tone) -> &'static str {
    match tone {
        Tone::Success => "✅",
        Tone::Failure => "❌",
        Tone::Warning => "⚠️",
        Tone::Info => "⚡",
    }
}

pub fn prompt(label: &str) {
    print!("{label}: ");
    let _ = io::stdout().flush();
}

pub fn info(msg: &str) {
    println!("{msg}");
}

pub fn error(msg: &str) {
    eprintln!("error: {msg}");
}

pub fn options<S: AsRef<str>>(items: &[S]) {
    for (i, item) in items.iter().enumerate() {
        println!("  {:>2}) {}", i + 1, item.as_ref());
    }
}

pub fn field_errors(errors: &ValidationErrorSet) {
    for (field, msg) in errors.iter() {
        println!("  ✗ {field}: {msg}");
    }
}

pub fn catalog(catalog: &TaskCatalog) {
    if catalog.is_empty() {
        println!("（沒有可用的任務）");
        return;
    }
    for category in catalog.categories() {
        let tasks = catalog.tasks(category).unwrap_or_default();
        if tasks.is_empty() {
            println!("{category}: -");
        } else {
            println!("{category}: {}", tasks.join(", "));
        }
    }
}

pub fn scheduled(list: &[ScheduledTask]) {
    if list.is_empty() {
        println!("（目前沒有排程任務）");
        return;
    }
    println!("=== 排程任務（共 {} 筆） ===", list.len());
    for t in list {
        println!(
            "- {} [{}] job={}{}",
            t.task,
            t.status,
            t.job_id,
            if t.is_recurring { " (recurring)" } else { "" }
        );
        if let Some(next) = &t.next_time {
            println!("  └─ next: {next}");
        }
        if let Some(last) = &t.last_run {
            println!("  └─ last: {last}");
        }
    }
}
