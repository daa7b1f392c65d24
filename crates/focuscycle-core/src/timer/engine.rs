//! Cycle engine.
//!
//! A single worker task owns the [`TimerStateMachine`] and the per-cycle
//! context. Every [`CycleEngine`] handle feeds one bounded command queue; the
//! worker applies commands strictly in submission order, each to completion,
//! session-tracker round trips included. No two transitions ever overlap.
//!
//! The countdown is a separate task that never touches state. Once per tick
//! interval it enqueues a `Tick` tagged with the generation of the phase it
//! was launched for; a tick from an older generation is dropped.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = CycleEngine::spawn(tracker, feedback, settings.subscribe(), EngineConfig::default());
//! engine.start_pomodoro_cycle(task_id, user_id, phases).await?;
//! let mut states = engine.subscribe_state();
//! while let Some(state) = states.recv().await {
//!     // render
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::actions::{available_actions, EngineAction};
use super::context::{CycleContext, InterruptedPhaseInfo};
use super::observable::{Observable, Subscription};
use super::state::{TickOutcome, TimerState, TimerStateMachine};
use crate::cycle::Phase;
use crate::error::EngineError;
use crate::events::{Event, PhaseOutcome};
use crate::feedback::{CompletionFeedback, CompletionSignal};
use crate::session::SessionTracker;
use crate::settings::CycleSettings;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Time between countdown ticks. Each tick consumes one second of the
    /// phase, so anything other than one second only makes sense in demos.
    pub tick_interval: Duration,
    pub command_capacity: usize,
    /// Buffered values per observer. A subscriber that falls further behind
    /// skips straight to the latest value and never sees the transitions in
    /// between; size this for the slowest consumer that reacts to
    /// transitions rather than to final values.
    pub observer_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            command_capacity: 64,
            observer_capacity: 64,
        }
    }
}

#[derive(Debug)]
enum Command {
    Start {
        task_id: i64,
        user_id: i64,
        phases: Vec<Phase>,
    },
    Pause,
    Resume,
    Tick {
        generation: u64,
    },
    Confirm,
    SkipBreak,
    Stop {
        save_progress: bool,
    },
    Flush {
        reply: oneshot::Sender<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Published engine outputs, shared between the worker and every handle.
#[derive(Debug)]
struct Outputs {
    state: Arc<Observable<TimerState>>,
    phases: Arc<Observable<Vec<Phase>>>,
    index: Arc<Observable<Option<usize>>>,
    current_phase: Arc<Observable<Option<Phase>>>,
    interrupted: Arc<Observable<Option<InterruptedPhaseInfo>>>,
    events: broadcast::Sender<Event>,
}

impl Outputs {
    fn new(capacity: usize) -> Self {
        let (events, _rx) = broadcast::channel(capacity.max(1));
        Self {
            state: Observable::new(TimerState::Idle, capacity),
            phases: Observable::new(Vec::new(), capacity),
            index: Observable::new(None, capacity),
            current_phase: Observable::new(None, capacity),
            interrupted: Observable::new(None, capacity),
            events,
        }
    }
}

/// Handle to a running cycle engine. Cheap to clone; the worker exits once
/// every handle is dropped or [`shutdown`](Self::shutdown) is called.
#[derive(Debug, Clone)]
pub struct CycleEngine {
    commands: mpsc::Sender<Command>,
    outputs: Arc<Outputs>,
}

impl CycleEngine {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(
        tracker: Arc<dyn SessionTracker>,
        feedback: Arc<dyn CompletionFeedback>,
        settings: watch::Receiver<CycleSettings>,
        config: EngineConfig,
    ) -> Self {
        let (tx, rx) = mpsc::channel(config.command_capacity.max(1));
        let outputs = Arc::new(Outputs::new(config.observer_capacity));
        let worker = Worker {
            machine: TimerStateMachine::new(),
            context: None,
            tracker,
            feedback,
            settings,
            outputs: Arc::clone(&outputs),
            commands: tx.downgrade(),
            countdown: None,
            generation: 0,
            tick_interval: config.tick_interval,
        };
        tokio::spawn(worker.run(rx));
        Self {
            commands: tx,
            outputs,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────
    //
    // Each returns once the command is queued, not once it is applied.
    // Commands that do not fit the current state are logged and dropped.

    pub async fn start_pomodoro_cycle(
        &self,
        task_id: i64,
        user_id: i64,
        phases: Vec<Phase>,
    ) -> Result<(), EngineError> {
        self.send(Command::Start {
            task_id,
            user_id,
            phases,
        })
        .await
    }

    pub async fn pause(&self) -> Result<(), EngineError> {
        self.send(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<(), EngineError> {
        self.send(Command::Resume).await
    }

    pub async fn confirm_completion_and_proceed(&self) -> Result<(), EngineError> {
        self.send(Command::Confirm).await
    }

    pub async fn skip_current_break(&self) -> Result<(), EngineError> {
        self.send(Command::SkipBreak).await
    }

    pub async fn stop_pomodoro_cycle(&self, save_progress: bool) -> Result<(), EngineError> {
        self.send(Command::Stop { save_progress }).await
    }

    /// Wait until every command queued before this call has been applied.
    pub async fn flush(&self) -> Result<(), EngineError> {
        let (reply, done) = oneshot::channel();
        self.send(Command::Flush { reply }).await?;
        done.await.map_err(|_| EngineError::ShutDown)
    }

    /// Stop the worker. An active cycle ends without saving; later commands
    /// fail with [`EngineError::ShutDown`].
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self.send(Command::Shutdown { reply }).await.is_ok() {
            let _ = done.await;
        }
    }

    async fn send(&self, command: Command) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::ShutDown)
    }

    // ── Snapshots ────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.outputs.state.get()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.outputs.phases.get()
    }

    pub fn current_phase_index(&self) -> Option<usize> {
        self.outputs.index.get()
    }

    pub fn current_phase(&self) -> Option<Phase> {
        self.outputs.current_phase.get()
    }

    /// The running or paused phase, for callers that finalize it themselves.
    pub fn current_interrupted_phase_info(&self) -> Option<InterruptedPhaseInfo> {
        self.outputs.interrupted.get()
    }

    pub fn available_actions(&self) -> Vec<EngineAction> {
        let state = self.state();
        let phases = self.phases();
        let index = self.current_phase_index();
        let current = index.and_then(|i| phases.get(i));
        let next = index.and_then(|i| phases.get(i + 1));
        available_actions(&state, current, next)
    }

    // ── Streams ──────────────────────────────────────────────────────

    pub fn subscribe_state(&self) -> Subscription<TimerState> {
        self.outputs.state.subscribe()
    }

    pub fn subscribe_phases(&self) -> Subscription<Vec<Phase>> {
        self.outputs.phases.subscribe()
    }

    pub fn subscribe_phase_index(&self) -> Subscription<Option<usize>> {
        self.outputs.index.subscribe()
    }

    pub fn subscribe_current_phase(&self) -> Subscription<Option<Phase>> {
        self.outputs.current_phase.subscribe()
    }

    /// Transition events from now on. Events are not replayed.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.outputs.events.subscribe()
    }
}

#[derive(Debug)]
enum CycleEnd {
    Finished,
    Stopped { saved: bool },
    Aborted(String),
}

struct Worker {
    machine: TimerStateMachine,
    context: Option<CycleContext>,
    tracker: Arc<dyn SessionTracker>,
    feedback: Arc<dyn CompletionFeedback>,
    settings: watch::Receiver<CycleSettings>,
    outputs: Arc<Outputs>,
    /// Weak so the countdown never keeps the queue open on its own.
    commands: mpsc::WeakSender<Command>,
    countdown: Option<CancellationToken>,
    /// Identity of the current countdown; bumped on every launch.
    generation: u64,
    tick_interval: Duration,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        debug!("cycle engine worker started");
        while let Some(command) = commands.recv().await {
            match command {
                Command::Start {
                    task_id,
                    user_id,
                    phases,
                } => self.start_cycle(task_id, user_id, phases).await,
                Command::Pause => self.pause(),
                Command::Resume => self.resume(),
                Command::Tick { generation } => self.tick(generation).await,
                Command::Confirm => self.confirm().await,
                Command::SkipBreak => self.skip_break().await,
                Command::Stop { save_progress } => self.stop(save_progress).await,
                Command::Flush { reply } => {
                    let _ = reply.send(());
                }
                Command::Shutdown { reply } => {
                    self.teardown();
                    let _ = reply.send(());
                    debug!("cycle engine worker shut down");
                    return;
                }
            }
        }
        self.teardown();
        debug!("cycle engine worker stopped: all handles dropped");
    }

    // ── Commands ─────────────────────────────────────────────────────

    async fn start_cycle(&mut self, task_id: i64, user_id: i64, phases: Vec<Phase>) {
        let phase_count = phases.len();
        if phase_count == 0 {
            warn!(task_id, "start ignored: no phases");
            return;
        }
        if let Err(rejected) = self.machine.load_cycle(phases) {
            warn!(task_id, %rejected, "start ignored");
            return;
        }

        self.feedback.stop();
        info!(task_id, user_id, phase_count, "cycle started");
        self.context = Some(CycleContext::new(task_id, user_id));
        self.outputs.phases.publish(self.machine.phases().to_vec());
        self.emit(Event::CycleStarted {
            task_id,
            user_id,
            phase_count,
            at: Utc::now(),
        });
        self.start_phase(0).await;
    }

    fn pause(&mut self) {
        match self.machine.pause() {
            Ok(state) => {
                self.cancel_countdown();
                self.outputs.state.publish(state);
                self.publish_interrupted();
                let index = self.machine.current_index().unwrap_or_default();
                info!(index, interruptions = state.interruptions(), "phase paused");
                self.emit(Event::PhasePaused {
                    index,
                    remaining_secs: state.remaining_secs().unwrap_or_default(),
                    interruptions: state.interruptions(),
                    at: Utc::now(),
                });
            }
            Err(rejected) => warn!(%rejected, "pause ignored"),
        }
    }

    fn resume(&mut self) {
        match self.machine.resume() {
            Ok(state) => {
                self.outputs.state.publish(state);
                let index = self.machine.current_index().unwrap_or_default();
                info!(index, "phase resumed");
                self.emit(Event::PhaseResumed {
                    index,
                    remaining_secs: state.remaining_secs().unwrap_or_default(),
                    at: Utc::now(),
                });
                self.launch_countdown();
            }
            Err(rejected) => warn!(%rejected, "resume ignored"),
        }
    }

    async fn tick(&mut self, generation: u64) {
        if generation != self.generation {
            debug!(generation, current = self.generation, "stale tick dropped");
            return;
        }
        match self.machine.tick() {
            Ok(TickOutcome::Counting(state)) => self.outputs.state.publish(state),
            Ok(TickOutcome::Expired(state)) => {
                self.outputs.state.publish(state);
                self.cancel_countdown();
                self.finalize_phase(PhaseOutcome::Elapsed).await;
            }
            Err(rejected) => debug!(%rejected, "tick dropped"),
        }
    }

    async fn confirm(&mut self) {
        self.feedback.stop();
        match self.machine.confirm_target() {
            Ok(Some(next)) => self.start_phase(next).await,
            Ok(None) => self.end_cycle(CycleEnd::Finished),
            Err(rejected) => warn!(%rejected, "confirm ignored"),
        }
    }

    async fn skip_break(&mut self) {
        self.feedback.stop();
        let plan = match self.machine.skip_plan() {
            Ok(plan) => plan,
            Err(rejected) => {
                warn!(%rejected, "skip ignored");
                return;
            }
        };

        self.cancel_countdown();
        if plan.finalize_current && !self.finalize_phase(PhaseOutcome::Skipped).await {
            return;
        }

        let from_index = self.machine.current_index().unwrap_or_default();
        info!(from_index, to_index = ?plan.next_focus, "break skipped");
        self.emit(Event::BreakSkipped {
            from_index,
            to_index: plan.next_focus,
            at: Utc::now(),
        });
        match plan.next_focus {
            Some(next) => self.start_phase(next).await,
            None => self.end_cycle(CycleEnd::Finished),
        }
    }

    async fn stop(&mut self, save_progress: bool) {
        self.feedback.stop();
        let in_flight = match self.machine.stop_plan() {
            Ok(in_flight) => in_flight,
            Err(rejected) => {
                warn!(%rejected, "stop ignored");
                return;
            }
        };

        self.cancel_countdown();
        let saved =
            save_progress && in_flight && self.finalize_phase(PhaseOutcome::Stopped).await;
        self.end_cycle(CycleEnd::Stopped { saved });
    }

    // ── Routines ─────────────────────────────────────────────────────

    /// Create the session for `index` and start its countdown.
    async fn start_phase(&mut self, index: usize) {
        let Some(phase) = self.machine.phase_at(index).copied() else {
            self.end_cycle(CycleEnd::Finished);
            return;
        };
        let Some((task_id, user_id)) = self.context.as_ref().map(|c| (c.task_id, c.user_id))
        else {
            return;
        };

        let session_id = match self
            .tracker
            .create_phase_session(task_id, user_id, &phase)
            .await
        {
            Ok(id) => id,
            Err(err) => {
                error!(task_id, index, error = %err, "could not create phase session");
                self.end_cycle(CycleEnd::Aborted(err.to_string()));
                return;
            }
        };

        if let Some(ctx) = self.context.as_mut() {
            ctx.open_session(session_id);
        }
        let Some(state) = self.machine.enter_phase(index) else {
            return;
        };
        info!(
            index,
            phase_type = %phase.phase_type,
            duration_secs = phase.duration_secs,
            %session_id,
            "phase started"
        );
        self.publish_index();
        self.outputs.state.publish(state);
        self.publish_interrupted();
        self.emit(Event::PhaseStarted {
            index,
            phase_type: phase.phase_type,
            duration_secs: phase.duration_secs,
            session_id,
            at: Utc::now(),
        });
        self.launch_countdown();
    }

    /// Complete the current phase's session record. Returns whether the
    /// record was written.
    ///
    /// On failure the cycle is aborted, except for a stop, which ends the
    /// cycle itself.
    async fn finalize_phase(&mut self, outcome: PhaseOutcome) -> bool {
        let Some(ctx) = self.context.as_ref() else {
            return false;
        };
        let task_id = ctx.task_id;
        let state = self.machine.state();
        let (Some(session), Some(phase_type), Some(index)) = (
            ctx.session(),
            state.phase_type(),
            self.machine.current_index(),
        ) else {
            warn!(task_id, ?outcome, "no open session to finalize");
            return false;
        };
        let interruptions = state.interruptions();
        let actual = session.elapsed_secs();

        if let Err(err) = self
            .tracker
            .complete_phase_session(session.session_id, task_id, phase_type, actual, interruptions)
            .await
        {
            error!(
                task_id,
                session_id = %session.session_id,
                error = %err,
                "could not complete phase session"
            );
            if outcome != PhaseOutcome::Stopped {
                self.end_cycle(CycleEnd::Aborted(err.to_string()));
            }
            return false;
        }

        info!(
            index,
            %phase_type,
            session_id = %session.session_id,
            actual_secs = actual,
            interruptions,
            ?outcome,
            "phase finalized"
        );
        if let Some(ctx) = self.context.as_mut() {
            ctx.close_session();
        }
        self.publish_interrupted();
        self.emit(Event::PhaseCompleted {
            index,
            phase_type,
            session_id: session.session_id,
            actual_duration_secs: actual,
            interruptions,
            outcome,
            at: Utc::now(),
        });

        if outcome == PhaseOutcome::Elapsed {
            if let Some(waiting) = self.machine.complete_phase() {
                self.outputs.state.publish(waiting);
            }
            let signal = CompletionSignal::from_settings(phase_type, &self.settings.borrow());
            self.feedback.play_completion(&signal);
        }
        true
    }

    /// Return to `Idle` and clear every cycle output.
    fn end_cycle(&mut self, end: CycleEnd) {
        self.cancel_countdown();
        let task_id = self.context.take().map(|c| c.task_id).unwrap_or_default();
        self.machine.reset();

        self.outputs.state.publish_if_changed(TimerState::Idle);
        self.publish_index();
        self.outputs.phases.publish_if_changed(Vec::new());
        self.publish_interrupted();

        info!(task_id, ?end, "cycle ended");
        let at = Utc::now();
        self.emit(match end {
            CycleEnd::Finished => Event::CycleFinished { task_id, at },
            CycleEnd::Stopped { saved } => Event::CycleStopped { task_id, saved, at },
            CycleEnd::Aborted(reason) => Event::CycleAborted {
                task_id,
                reason,
                at,
            },
        });
    }

    fn teardown(&mut self) {
        self.cancel_countdown();
        self.feedback.stop();
        if self.machine.state().is_active() {
            self.end_cycle(CycleEnd::Stopped { saved: false });
        }
    }

    // ── Countdown ────────────────────────────────────────────────────

    fn launch_countdown(&mut self) {
        self.cancel_countdown();
        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let commands = self.commands.clone();
        let period = self.tick_interval;

        tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(tx) = commands.upgrade() else { break };
                        if tx.send(Command::Tick { generation }).await.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!(generation, "countdown ended");
        });
        self.countdown = Some(token);
    }

    fn cancel_countdown(&mut self) {
        if let Some(token) = self.countdown.take() {
            token.cancel();
        }
    }

    // ── Publishing ───────────────────────────────────────────────────

    fn publish_index(&self) {
        // Neighbouring phases can be equal, so the current phase follows the
        // index rather than its own value.
        if self
            .outputs
            .index
            .publish_if_changed(self.machine.current_index())
        {
            self.outputs
                .current_phase
                .publish(self.machine.current_phase().copied());
        }
    }

    fn publish_interrupted(&self) {
        let state = self.machine.state();
        let info = match state {
            TimerState::Running { .. } | TimerState::Paused { .. } => {
                self.context.as_ref().zip(state.phase_type()).and_then(|(ctx, phase_type)| {
                    ctx.interrupted_info(phase_type, state.interruptions())
                })
            }
            TimerState::Idle | TimerState::WaitingForConfirmation { .. } => None,
        };
        self.outputs.interrupted.publish_if_changed(info);
    }

    fn emit(&self, event: Event) {
        let _ = self.outputs.events.send(event);
    }
}
