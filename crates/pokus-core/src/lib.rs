//! # Pokus Core Library
//!
//! This library provides the core logic for Pokus, a focus timer that pays
//! out in catch encounters. Every operation is available through the `pokus`
//! CLI; any other front end is a thin layer over the same core.
//!
//! ## Architecture
//!
//! - **Session Controller**: A wall-clock state machine over one focus or
//!   break session. Completion is derived from the stored end time.
//! - **Rewards**: Focus history, coins and banked focus time
//! - **Nudges**: A self-rescheduling chain of one-shot alarms that vibrates
//!   periodically during focus
//! - **Encounters**: The timing-bar catch minigame and the collection
//! - **Storage**: Key-value persistence (SQLite or in-memory), user settings
//!   and TOML game tuning
//!
//! ## Key Components
//!
//! - [`SessionController`]: Core session state machine
//! - [`PokusStore`]: Typed, namespaced persistence
//! - [`NudgeChain`]: Background nudge alarms
//! - [`Encounter`]: One catch attempt
//! - [`Config`]: Game tuning configuration

pub mod clock;
pub mod device;
pub mod encounter;
pub mod error;
pub mod events;
pub mod nudge;
pub mod rewards;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use device::{Device, RecordingDevice, VibrationPattern};
pub use encounter::{start_encounter, Collection, Encounter, EncounterResult, Pokedex, Species};
pub use error::{AlarmError, ConfigError, CoreError, StorageError, ValidationError};
pub use events::Event;
pub use nudge::{AlarmHandle, AlarmScheduler, InMemoryAlarms, NudgeChain, NudgeOutcome};
pub use rewards::{Credit, FocusHistory, Rewards};
pub use storage::{Config, Database, GameConfig, KeyValueStore, MemoryStore, PokusStore, Settings};
pub use timer::{
    Completion, Recovery, SessionController, SessionMode, SessionPhase, SessionState,
    StartRequest,
};
