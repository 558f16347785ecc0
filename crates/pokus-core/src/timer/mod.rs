mod engine;
pub mod flow;
mod session;

pub use engine::{
    Completion, Recovery, SessionController, SessionPhase, StartRequest,
};
pub use flow::{suggested_break_seconds, DEFAULT_FLOW_RATIO, MIN_BREAK_SECONDS};
pub use session::{
    load_session, save_session, SessionMode, SessionState, LEGACY_DURATION_SECONDS,
    SESSION_SCHEMA,
};

pub(crate) use session::seconds_after;
