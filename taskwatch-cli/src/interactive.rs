//! 互動式表單：一題一題問，送出後 job 在背景輪詢，可以繼續送下一個。

use anyhow::{Context, Result};
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    task::JoinHandle,
};

use crate::render;
use taskwatch_core::{
    Field, PollState, Recurrence, SubmitOutcome, TaskWidget,
    ValidationErrorSet,
};

#[derive(Debug, Clone, Copy)]
enum Step {
    /// 選完類別會接著選任務
    Category,
    Task,
    Time,
    Recurrence,
}

/// 一輪表單要問的題目；Task 不在裡面，由 Category 接著問
const FORM_STEPS: [Step; 3] = [Step::Category, Step::Time, Step::Recurrence];

struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn stdin() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// None = EOF 或使用者要離開
    async fn ask(&mut self, label: &str) -> Result<Option<String>> {
        render::prompt(label);
        let line = self.lines.next_line().await.context("read stdin")?;
        Ok(line
            .map(|l| l.trim().to_string())
            .filter(|l| !matches!(l.as_str(), "q" | "quit" | "exit")))
    }
}

pub async fn run(widget: &mut TaskWidget) -> Result<()> {
    if let Err(e) = widget.load_catalog().await {
        if let Some(text) = widget.form().selector().status_text() {
            render::error(text);
        }
        return Err(e).context("load task catalog");
    }

    let mut prompt = Prompt::stdin();
    let mut sessions: Vec<JoinHandle<PollState>> = Vec::new();
    render::info("q = 離開；時間留空 = 立即執行");

    'form: loop {
        let mut todo = FORM_STEPS.to_vec();
        loop {
            for step in todo.drain(..) {
                if !fill(widget, &mut prompt, step).await? {
                    break 'form;
                }
            }

            match widget.submit().await {
                SubmitOutcome::Invalid(errors) => {
                    render::field_errors(&errors);
                    todo = redo_steps(&errors);
                }
                SubmitOutcome::Rejected(_) => match prompt.ask("retry with the same values? [y/N]").await? {
                    Some(answer) if answer.eq_ignore_ascii_case("y") => {}
                    Some(_) => todo = FORM_STEPS.to_vec(),
                    None => break 'form,
                },
                SubmitOutcome::Accepted { job, session, .. } => {
                    render::info(&format!("tracking job {job}"));
                    track(&mut sessions, session);
                    continue 'form;
                }
            }
        }
    }

    sessions.retain(|h| !h.is_finished());
    if !sessions.is_empty() {
        render::info(&format!("waiting for {} job(s) to finish (Ctrl-C to stop)", sessions.len()));
        for handle in sessions {
            handle.await.context("poll session")?;
        }
    }
    Ok(())
}

/// 先丟掉已經結束的 session 再加入新的
fn track(sessions: &mut Vec<JoinHandle<PollState>>, session: Option<JoinHandle<PollState>>) {
    sessions.retain(|h| !h.is_finished());
    sessions.extend(session);
}

fn redo_steps(errors: &ValidationErrorSet) -> Vec<Step> {
    let mut steps = Vec::new();
    if errors.get(Field::Category).is_some() {
        steps.push(Step::Category);
    } else if errors.get(Field::Task).is_some() {
        steps.push(Step::Task);
    }
    if errors.get(Field::Time).is_some() {
        steps.push(Step::Time);
    }
    steps
}

/// 輸入編號或名稱
fn pick(input: &str, items: &[String]) -> Option<String> {
    if let Ok(n) = input.parse::<usize>() {
        return items.get(n.checked_sub(1)?).cloned();
    }
    items.iter().find(|item| item.as_str() == input).cloned()
}

/// 回傳 false 表示使用者要離開
async fn fill(widget: &mut TaskWidget, prompt: &mut Prompt, step: Step) -> Result<bool> {
    let mut step = step;
    loop {
        match step {
            Step::Category => {
                let categories: Vec<String> = widget
                    .form()
                    .selector()
                    .catalog()
                    .map(|c| c.categories().map(str::to_string).collect())
                    .unwrap_or_default();
                render::options(&categories);
                let Some(input) = prompt.ask("category").await? else {
                    return Ok(false);
                };
                let Some(choice) = pick(&input, &categories) else {
                    render::error(&format!("no category {input:?}"));
                    continue;
                };
                match widget.form_mut().set_category(&choice) {
                    Ok(tasks) if tasks.is_empty() => render::error("this category has no tasks"),
                    Ok(_) => step = Step::Task,
                    Err(e) => render::error(&e.to_string()),
                }
            }
            Step::Task => {
                if !widget.form().selector().task_enabled() {
                    step = Step::Category;
                    continue;
                }
                let tasks = widget.form().selector().task_options().to_vec();
                render::options(&tasks);
                let Some(input) = prompt.ask("task").await? else {
                    return Ok(false);
                };
                let Some(choice) = pick(&input, &tasks) else {
                    render::error(&format!("no task {input:?}"));
                    continue;
                };
                match widget.form_mut().set_task(&choice) {
                    Ok(()) => return Ok(true),
                    Err(e) => render::error(&e.to_string()),
                }
            }
            Step::Time => {
                let label = format!(
                    "time (YYYY-MM-DDTHH:MM, earliest {}, empty = now)",
                    widget.min_selectable().current_input()
                );
                let Some(input) = prompt.ask(&label).await? else {
                    return Ok(false);
                };
                widget.form_mut().set_scheduled_time(Some(&input));
                return Ok(true);
            }
            Step::Recurrence => {
                let Some(input) = prompt.ask("recurrence [none/hourly/daily/weekly]").await? else {
                    return Ok(false);
                };
                if input.is_empty() {
                    widget.form_mut().set_recurrence(Recurrence::None);
                    return Ok(true);
                }
                match input.parse::<Recurrence>() {
                    Ok(r) => {
                        widget.form_mut().set_recurrence(r);
                        return Ok(true);
                    }
                    Err(e) => render::error(&e),
                }
            }
        }
    }
}
