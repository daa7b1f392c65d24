use std::path::PathBuf;

use clap::Subcommand;

use super::{format_secs, open_database};

#[derive(Subcommand)]
pub enum SessionsAction {
    /// List recent phase sessions
    List {
        /// Only sessions for this task
        #[arg(long)]
        task: Option<i64>,
        #[arg(long, default_value = "20")]
        limit: usize,
        #[arg(long)]
        json: bool,
        /// Database file (defaults to the data dir)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Totals for one task
    Stats {
        #[arg(long)]
        task: i64,
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

pub fn run(action: SessionsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionsAction::List {
            task,
            limit,
            json,
            db,
        } => {
            let db = open_database(db.as_deref())?;
            let sessions = db.list_sessions(task, limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sessions)?);
                return Ok(());
            }
            if sessions.is_empty() {
                println!("no sessions");
                return Ok(());
            }
            for s in sessions {
                let status = if s.completed { "done" } else { "open" };
                println!(
                    "#{:<5} task {:<6} {:<12} {} {:>8}/{:<8} {} interruption(s) {}",
                    s.id,
                    s.task_id,
                    s.session_type,
                    s.start_time.format("%Y-%m-%d %H:%M"),
                    format_secs(u64::from(s.actual_duration_secs)),
                    format_secs(u64::from(s.planned_duration_secs)),
                    s.interruptions,
                    status
                );
            }
        }
        SessionsAction::Stats { task, db } => {
            let db = open_database(db.as_deref())?;
            let stats = db.task_stats(task)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
