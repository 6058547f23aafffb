mod common;

use chrono::{Duration as ChronoDuration, Local};
use common::{st, ScriptedService};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::time::Instant;

use taskwatch_core::{
    catalog::UNAVAILABLE_TEXT,
    poller::TASK_COMPLETED,
    submit::IMMEDIATE_NOTICE,
    time::LOCAL_INPUT_FORMAT,
    validate::TIME_IN_PAST,
    ClientConfig, Field, MemorySink, Notification, NotificationSink, PollState, Recurrence, SubmitOutcome, TaskWidget, Tone,
    WidgetError,
};

fn widget(svc: Arc<ScriptedService>, sink: Arc<MemorySink>) -> TaskWidget {
    TaskWidget::new(svc, sink, &ClientConfig::default())
}

fn reports() -> ScriptedService {
    ScriptedService::new().with_catalog(&[
        ("reports", &["daily_summary", "weekly_rollup"]),
        ("maintenance", &["clear_temp"]),
    ])
}

#[tokio::test(start_paused = true)]
async fn immediate_submission_end_to_end() {
    let svc = Arc::new(
        reports()
            .accepting("queued", "abc123")
            .with_steps([st("pending"), st("running"), st("completed")]),
    );
    let sink = Arc::new(MemorySink::new());
    let mut w = widget(svc.clone(), sink.clone());

    w.load_catalog().await.unwrap();
    w.form_mut().set_category("reports").unwrap();
    w.form_mut().set_task("daily_summary").unwrap();
    w.form_mut().set_recurrence(Recurrence::None);

    let start = Instant::now();
    let outcome = w.submit().await;

    let (job, message, session) = match outcome {
        SubmitOutcome::Accepted { job, message, session } => (job, message, session),
        other => panic!("expected acceptance, got {other:?}"),
    };
    assert_eq!(job.id(), "abc123");
    assert_eq!(message, "queued");

    // 2 秒提示後才送出，而且沒有 scheduled_time 欄位
    {
        let runs = w_runs(&svc);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].1 - start, Duration::from_millis(2000));
        let body = serde_json::to_value(&runs[0].0).unwrap();
        assert_eq!(body, serde_json::json!({"task": "daily_summary", "recurrence": "none"}));
    }

    // 成功後表單清空
    assert_eq!(w.form().snapshot().category, "");
    assert!(w.form().errors().is_empty());
    assert!(w.form().notice().is_none());

    let state = session.expect("session started").await.unwrap();
    assert_eq!(state, PollState::Completed { next_time: None });

    let submitted = start + Duration::from_millis(2000);
    let offsets: Vec<_> = svc.status_times().into_iter().map(|t| t - submitted).collect();
    assert_eq!(offsets, [1500, 2500, 3500].map(Duration::from_millis));

    let messages = sink.messages();
    assert_eq!(messages, [IMMEDIATE_NOTICE, "queued", TASK_COMPLETED]);
    assert_eq!(messages.iter().filter(|m| *m == TASK_COMPLETED).count(), 1);
}

fn w_runs(svc: &ScriptedService) -> Vec<(taskwatch_core::protocol::RunTaskRequest, Instant)> {
    svc.run_calls.lock().unwrap().clone()
}

/// 記下每則通知送達的時間
#[derive(Default)]
struct TimedSink {
    seen: Mutex<Vec<(Notification, Instant)>>,
}

impl NotificationSink for TimedSink {
    fn notify(&self, n: Notification) {
        self.seen.lock().unwrap().push((n, Instant::now()));
    }
}

#[tokio::test(start_paused = true)]
async fn immediate_notice_reaches_the_sink_before_the_request() {
    let svc = Arc::new(reports().accepting("queued", "n1").with_steps([st("completed")]));
    let sink = Arc::new(TimedSink::default());
    let mut w = TaskWidget::new(svc.clone(), sink.clone(), &ClientConfig::default());
    w.load_catalog().await.unwrap();
    w.form_mut().set_category("maintenance").unwrap();
    w.form_mut().set_task("clear_temp").unwrap();

    let start = Instant::now();
    let outcome = w.submit().await;
    assert!(matches!(outcome, SubmitOutcome::Accepted { .. }), "{outcome:?}");

    let seen = sink.seen.lock().unwrap().clone();
    let (notice, shown_at) = &seen[0];
    assert_eq!(notice.message, IMMEDIATE_NOTICE);
    assert_eq!(notice.tone, Tone::Info);
    assert_eq!(*shown_at, start);

    let posted_at = w_runs(&svc)[0].1;
    assert_eq!(posted_at - *shown_at, Duration::from_millis(2000));
    assert_eq!(seen[1].0.message, "queued");
    assert!(w.form().notice().is_none());
}

#[tokio::test(start_paused = true)]
async fn past_time_is_rejected_without_network() {
    let svc = Arc::new(reports().accepting("queued", "never"));
    let sink = Arc::new(MemorySink::new());
    let mut w = widget(svc.clone(), sink.clone());
    w.load_catalog().await.unwrap();
    w.form_mut().set_category("reports").unwrap();
    w.form_mut().set_task("daily_summary").unwrap();
    let yesterday = (Local::now() - ChronoDuration::days(1)).format(LOCAL_INPUT_FORMAT).to_string();
    w.form_mut().set_scheduled_time(Some(&yesterday));

    let start = Instant::now();
    let outcome = w.submit().await;

    let errors = match outcome {
        SubmitOutcome::Invalid(errors) => errors,
        other => panic!("expected validation failure, got {other:?}"),
    };
    assert_eq!(errors.fields().collect::<Vec<_>>(), [Field::Time]);
    assert_eq!(errors.get(Field::Time), Some(TIME_IN_PAST));
    assert_eq!(w.form().error(Field::Time), Some(TIME_IN_PAST));
    assert_eq!(Instant::now(), start);
    assert_eq!(svc.run_count(), 0);
    assert_eq!(svc.status_count(), 0);
    assert!(sink.all().is_empty());
}

#[tokio::test(start_paused = true)]
async fn scheduled_submission_skips_the_notice_delay() {
    let svc = Arc::new(reports().accepting("Task scheduled successfully.", "weekly_rollup_1").with_steps([st("pending")]));
    let sink = Arc::new(MemorySink::new());
    let mut w = widget(svc.clone(), sink);
    w.load_catalog().await.unwrap();
    w.form_mut().set_category("reports").unwrap();
    w.form_mut().set_task("weekly_rollup").unwrap();
    w.form_mut().set_recurrence(Recurrence::Weekly);
    let tomorrow = (Local::now() + ChronoDuration::days(1)).format(LOCAL_INPUT_FORMAT).to_string();
    w.form_mut().set_scheduled_time(Some(&tomorrow));

    let start = Instant::now();
    let outcome = w.submit().await;
    assert!(matches!(outcome, SubmitOutcome::Accepted { .. }), "{outcome:?}");

    let runs = w_runs(&svc);
    assert_eq!(runs[0].1, start);
    assert_eq!(runs[0].0.scheduled_time.as_deref(), Some(tomorrow.as_str()));
    assert_eq!(runs[0].0.recurrence, Recurrence::Weekly);
}

#[tokio::test(start_paused = true)]
async fn backend_error_keeps_the_form() {
    let svc = Arc::new(reports().rejecting("Invalid or unsupported command for this OS"));
    let sink = Arc::new(MemorySink::new());
    let mut w = widget(svc.clone(), sink.clone());
    w.load_catalog().await.unwrap();
    w.form_mut().set_category("reports").unwrap();
    w.form_mut().set_task("daily_summary").unwrap();

    let outcome = w.submit().await;

    assert!(matches!(outcome, SubmitOutcome::Rejected(ref m) if m == "Invalid or unsupported command for this OS"));
    let all = sink.all();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].message, IMMEDIATE_NOTICE);
    assert_eq!(all[1].tone, Tone::Failure);
    assert_eq!(all[1].message, "Error: Invalid or unsupported command for this OS");
    assert_eq!(w.form().snapshot().task, "daily_summary");
    assert_eq!(svc.status_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn unreachable_backend_on_submit_is_reported() {
    // 沒設定 run_reply → 傳輸層錯誤
    let svc = Arc::new(reports());
    let sink = Arc::new(MemorySink::new());
    let mut w = widget(svc.clone(), sink.clone());
    w.load_catalog().await.unwrap();
    w.form_mut().set_category("reports").unwrap();
    w.form_mut().set_task("daily_summary").unwrap();

    assert!(matches!(w.submit().await, SubmitOutcome::Rejected(_)));
    let last = sink.all().pop().unwrap();
    assert_eq!(last.tone, Tone::Warning);
    assert!(last.message.starts_with("Failed: "), "{}", last.message);
    assert_eq!(w.form().snapshot().category, "reports");
}

#[tokio::test]
async fn catalog_failure_disables_selection() {
    let svc = Arc::new(ScriptedService::new());
    let sink = Arc::new(MemorySink::new());
    let mut w = widget(svc, sink);

    let err = w.load_catalog().await.unwrap_err();
    assert!(matches!(err, WidgetError::CatalogUnavailable(_)));
    assert_eq!(w.form().selector().status_text(), Some(UNAVAILABLE_TEXT));
    assert!(!w.form().selector().task_enabled());
    assert!(w.form_mut().set_category("reports").is_err());
}
