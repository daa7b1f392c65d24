use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use focuscycle_core::storage::Database;
use focuscycle_core::{
    generate_phases, Config, CycleEngine, EngineAction, EngineConfig, EngineError, Event, Phase,
    PhaseOutcome, SettingsSource, SqliteSessionTracker, TimerState,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use super::{format_secs, open_database};
use crate::feedback::TerminalBell;

#[derive(Args)]
pub struct RunArgs {
    /// Estimated task length in minutes
    pub minutes: u32,
    /// Task the sessions are recorded against
    #[arg(long)]
    pub task: i64,
    #[arg(long, default_value = "1")]
    pub user: i64,
    /// Milliseconds per countdown second (1000 = real time)
    #[arg(long, default_value = "1000")]
    pub tick_ms: u64,
    /// Start the next phase without waiting for `c`
    #[arg(long)]
    pub auto_advance: bool,
    /// Database file (defaults to the data dir)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

const HELP: &str =
    "keys: p pause, r resume, c continue, s skip break, x stop and save, q quit without saving, ? actions";

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let settings = config.cycle_settings();
    let phases = generate_phases(args.minutes, &settings.phases);
    if phases.is_empty() {
        return Err(format!(
            "{} minutes is shorter than the minimum focus phase of {} minutes",
            args.minutes, settings.phases.min_focus_tail_minutes
        )
        .into());
    }
    let db = open_database(args.db.as_deref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(drive(
        &args,
        phases,
        SettingsSource::new(settings),
        db,
        config.feedback.bell,
    ))
}

async fn drive(
    args: &RunArgs,
    phases: Vec<Phase>,
    settings: SettingsSource,
    db: Database,
    bell: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = CycleEngine::spawn(
        Arc::new(SqliteSessionTracker::new(db)),
        Arc::new(TerminalBell::new(bell)),
        settings.subscribe(),
        EngineConfig {
            tick_interval: Duration::from_millis(args.tick_ms.max(1)),
            ..EngineConfig::default()
        },
    );
    let mut states = engine.subscribe_state();
    let mut events = engine.subscribe_events();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let phase_count = phases.len();

    println!("{HELP}");
    engine
        .start_pomodoro_cycle(args.task, args.user, phases)
        .await?;

    let ending = loop {
        tokio::select! {
            Some(state) = states.recv() => render(&state),
            event = events.recv() => match event {
                Ok(event) => {
                    report(&event, phase_count);
                    if event.is_terminal() {
                        break event;
                    }
                    if args.auto_advance
                        && matches!(event, Event::PhaseCompleted { outcome: PhaseOutcome::Elapsed, .. })
                    {
                        engine.confirm_completion_and_proceed().await?;
                    }
                }
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return Err(EngineError::ShutDown.into()),
            },
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => handle_input(&engine, line.trim()).await?,
                None => stdin_open = false,
            },
        }
    };

    engine.shutdown().await;
    match ending {
        Event::CycleAborted { reason, .. } => Err(format!("cycle aborted: {reason}").into()),
        _ => Ok(()),
    }
}

async fn handle_input(engine: &CycleEngine, input: &str) -> Result<(), EngineError> {
    match input {
        "" => {}
        "p" => engine.pause().await?,
        "r" => engine.resume().await?,
        "c" => engine.confirm_completion_and_proceed().await?,
        "s" => engine.skip_current_break().await?,
        "x" => engine.stop_pomodoro_cycle(true).await?,
        "q" => engine.stop_pomodoro_cycle(false).await?,
        "?" => {
            let actions: Vec<String> = engine
                .available_actions()
                .into_iter()
                .map(|a| format!("{} [{}]", a.label(), key_for(a)))
                .collect();
            println!("available: {}", actions.join(", "));
        }
        other => eprintln!("unknown key '{other}'\n{HELP}"),
    }
    Ok(())
}

fn key_for(action: EngineAction) -> char {
    match action {
        EngineAction::Pause => 'p',
        EngineAction::Resume => 'r',
        EngineAction::Confirm => 'c',
        EngineAction::SkipBreak => 's',
        EngineAction::Stop => 'x',
    }
}

/// Countdown line on stderr, redrawn in place.
fn render(state: &TimerState) {
    match *state {
        TimerState::Running {
            remaining_secs,
            phase_type,
            ..
        } => eprint!("\r{phase_type:<12} {:>8}   ", format_secs(u64::from(remaining_secs))),
        TimerState::Paused {
            remaining_secs,
            phase_type,
            ..
        } => eprint!(
            "\r{phase_type:<12} {:>8} (paused)",
            format_secs(u64::from(remaining_secs))
        ),
        TimerState::WaitingForConfirmation { phase_type, .. } => {
            eprint!("\r{phase_type} done, press c to continue")
        }
        TimerState::Idle => {}
    }
}

fn report(event: &Event, phase_count: usize) {
    match event {
        Event::CycleStarted {
            task_id,
            phase_count,
            ..
        } => println!("cycle started: {phase_count} phases for task {task_id}"),
        Event::PhaseStarted {
            index,
            phase_type,
            duration_secs,
            ..
        } => println!(
            "\nphase {}/{phase_count}: {phase_type} {}",
            index + 1,
            format_secs(u64::from(*duration_secs))
        ),
        Event::PhasePaused { .. } => println!("\npaused"),
        Event::PhaseResumed { .. } => println!("\nresumed"),
        Event::PhaseCompleted {
            index,
            phase_type,
            actual_duration_secs,
            outcome,
            ..
        } => {
            let how = match outcome {
                PhaseOutcome::Elapsed => "finished",
                PhaseOutcome::Skipped => "skipped",
                PhaseOutcome::Stopped => "stopped",
            };
            println!(
                "\nphase {}/{phase_count}: {phase_type} {how} after {}",
                index + 1,
                format_secs(u64::from(*actual_duration_secs))
            );
        }
        Event::BreakSkipped { .. } => println!("break skipped"),
        Event::CycleFinished { .. } => println!("cycle finished"),
        Event::CycleStopped { saved, .. } => {
            let progress = if *saved { "saved" } else { "discarded" };
            println!("\ncycle stopped, progress {progress}");
        }
        Event::CycleAborted { reason, .. } => println!("\ncycle aborted: {reason}"),
    }
}
