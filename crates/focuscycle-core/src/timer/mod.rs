mod actions;
mod context;
mod engine;
mod observable;
mod state;

pub use actions::{available_actions, EngineAction};
pub use context::InterruptedPhaseInfo;
pub use engine::{CycleEngine, EngineConfig};
pub use observable::{Observable, Subscription};
pub use state::{
    CommandKind, InvalidTransition, SkipPlan, StateKind, TickOutcome, TimerState,
    TimerStateMachine,
};
