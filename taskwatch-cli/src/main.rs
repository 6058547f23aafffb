use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use taskwatch_core::{
    config::DEFAULT_BASE_URL, ClientConfig, HttpTaskService, PollState,
    Recurrence, SubmitOutcome, TaskService, TaskWidget,
};

mod interactive;
mod render;

#[derive(Parser, Debug)]
#[command(name = "taskwatch")]
#[command(about = "Submit tasks to the task service and watch them finish")]
struct Opts {
    /// 後端 task service 位址
    #[arg(long, env = "TASKWATCH_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// 輪詢間隔（毫秒）
    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u64,

    /// 最長輪詢時間（毫秒）
    #[arg(long, default_value_t = 300_000)]
    poll_timeout_ms: u64,

    /// 單一 HTTP 請求逾時（秒）
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,

    /// 寫 log 檔的目錄（每日輪替）；不給就寫 stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// 子命令（預設 run）
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// 互動式表單
    Run,

    /// 送出一個任務並等待結果
    Submit {
        #[arg(long)]
        category: String,
        #[arg(long)]
        task: String,
        /// 本地時間 YYYY-MM-DDTHH:MM；不給就立即執行
        #[arg(long)]
        at: Option<String>,
        #[arg(long, default_value = "none")]
        recurrence: Recurrence,
    },

    /// 列出可用的類別與任務
    Catalog,

    /// 列出後端所有排程任務
    Tasks,

    /// 檢查後端是否存活
    Health,
}

impl Opts {
    fn config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            poll_max_duration: Duration::from_millis(self.poll_timeout_ms),
            ..ClientConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();
    let _log_guard = init_tracing(opts.log_dir.as_deref());

    let config = opts.config();
    if config.poll_interval.is_zero() {
        bail!("--poll-interval-ms must be greater than 0");
    }
    let service: Arc<dyn TaskService> = Arc::new(
        HttpTaskService::new(&config.base_url, config.request_timeout).context("build http client")?,
    );
    tracing::info!(base_url = %config.base_url, "taskwatch starting");

    match opts.cmd.unwrap_or(Cmd::Run) {
        Cmd::Run => {
            let mut widget = TaskWidget::new(service, Arc::new(render::TerminalSink), &config);
            let cancel = CancellationToken::new();
            let refresher = widget
                .min_selectable()
                .spawn_refresher(config.min_selectable_refresh, cancel.clone());

            let res = interactive::run(&mut widget).await;

            cancel.cancel();
            let _ = refresher.await;
            res?;
        }

        Cmd::Submit {
            category,
            task,
            at,
            recurrence,
        } => {
            let mut widget = TaskWidget::new(service, Arc::new(render::TerminalSink), &config);
            submit_once(&mut widget, &category, &task, at.as_deref(), recurrence).await?;
        }

        Cmd::Catalog => {
            let catalog = taskwatch_core::load_catalog(&*service)
                .await
                .context("load task catalog")?;
            render::catalog(&catalog);
        }

        Cmd::Tasks => {
            let list = service.scheduled_tasks().await.context("list scheduled tasks")?;
            render::scheduled(&list);
        }

        Cmd::Health => {
            let health = service.health().await.context("health check")?;
            render::info(&format!("{}: {}", config.base_url, health.status));
        }
    }

    Ok(())
}

async fn submit_once(
    widget: &mut TaskWidget,
    category: &str,
    task: &str,
    at: Option<&str>,
    recurrence: Recurrence,
) -> Result<()> {
    widget.load_catalog().await.context("load task catalog")?;

    let form = widget.form_mut();
    form.set_category(category)
        .with_context(|| format!("category {category:?}"))?;
    form.set_task(task).with_context(|| format!("task {task:?}"))?;
    form.set_scheduled_time(at);
    form.set_recurrence(recurrence);

    match widget.submit().await {
        SubmitOutcome::Invalid(errors) => {
            render::field_errors(&errors);
            bail!("form has errors");
        }
        SubmitOutcome::Rejected(msg) => bail!("submission failed: {msg}"),
        SubmitOutcome::Accepted { job, session, .. } => {
            let Some(session) = session else {
                render::info(&format!("job {job} is already being tracked"));
                return Ok(());
            };
            match session.await.context("poll session")? {
                PollState::Completed { .. } | PollState::Recurring { .. } => Ok(()),
                PollState::Failed => bail!("job {job} failed"),
                PollState::TimedOut { attempts } => {
                    bail!("job {job} still running after {attempts} status checks")
                }
                PollState::NetworkError(reason) => bail!("could not check job {job}: {reason}"),
                PollState::Polling { .. } => unreachable!("poll session ends in a terminal state"),
            }
        }
    }
}

/// 沒設 RUST_LOG 時的過濾等級；寫 stderr 時只留警告，避免蓋掉互動提示
fn default_filter(log_dir: Option<&Path>) -> &'static str {
    if log_dir.is_some() {
        "info"
    } else {
        "warn"
    }
}

fn init_tracing(log_dir: Option<&Path>) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(log_dir)));

    let (writer, guard) = match log_dir {
        Some(dir) => tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "taskwatch.log")),
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_dir.is_none())
        .init();
    guard
}
