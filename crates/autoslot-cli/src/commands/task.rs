//! Task management commands for CLI.

use autoslot_core::task::parse_due;
use autoslot_core::Task;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use clap::Subcommand;
use serde::Serialize;

use super::{local, CliResult, Session};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a task to the queue
    Add {
        /// Task name, used as the event title
        name: String,
        /// Task description
        #[arg(long, default_value = "")]
        desc: String,
        /// Duration in minutes (default: scheduler.default_task_minutes)
        #[arg(long)]
        minutes: Option<i64>,
        /// Deadline, RFC 3339 or YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
    },
    /// List queued and scheduled tasks
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct TaskRow {
    id: String,
    name: String,
    desc: String,
    length: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    due: Option<String>,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    event_id: Option<String>,
}

impl TaskRow {
    fn new(task: &Task, status: &'static str, event_id: Option<&str>) -> Self {
        Self {
            id: task.id().to_string(),
            name: task.name().to_string(),
            desc: task.description().to_string(),
            length: task.minutes(),
            due: task.due().map(|d| d.to_rfc3339()),
            status,
            event_id: event_id.map(str::to_string),
        }
    }
}

pub fn run(action: TaskAction) -> CliResult {
    let session = Session::load()?;

    match action {
        TaskAction::Add {
            name,
            desc,
            minutes,
            due,
        } => {
            let timezone = session.config.timezone()?;
            let minutes = minutes.unwrap_or(session.config.scheduler.default_task_minutes);
            let due = due.map(|raw| parse_deadline(&raw, timezone)).transpose()?;

            let task = Task::new(name, desc, minutes, due)?;
            let id = task.id().clone();
            let mut planner = session.local_planner()?;
            planner.submit(task)?;
            println!("Task added: {id}");
        }
        TaskAction::List { json } => {
            let planner = session.local_planner()?;
            let timezone = planner.settings().timezone;

            let entries: Vec<(&Task, &'static str, Option<&str>)> = planner
                .pending()
                .iter()
                .map(|t| (t, "pending", None))
                .chain(
                    planner
                        .uploaded()
                        .iter()
                        .map(|u| (&u.task, "scheduled", Some(u.event_id.as_str()))),
                )
                .collect();

            if json {
                let rows: Vec<TaskRow> = entries
                    .iter()
                    .map(|(task, status, event_id)| TaskRow::new(task, *status, *event_id))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }
            if entries.is_empty() {
                println!("No tasks.");
                return Ok(());
            }
            for (task, status, _) in entries {
                let due = task
                    .due()
                    .map(|d| format!(", due {}", local(d, timezone)))
                    .unwrap_or_default();
                println!("[{status}] {task}{due}");
            }
        }
    }
    Ok(())
}

/// Accept a full timestamp or a bare date, which means the end of that day.
fn parse_deadline(raw: &str, timezone: Tz) -> CliResult<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let end_of_day = format!("{}T23:59:00", date.format("%Y-%m-%d"));
        if let Some(due) = parse_due(&end_of_day, timezone) {
            return Ok(due);
        }
    }
    parse_due(raw, timezone).ok_or_else(|| format!("invalid due date '{raw}'").into())
}
