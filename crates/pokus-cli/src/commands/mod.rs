pub mod config;
pub mod encounter;
pub mod nudge;
pub mod settings;
pub mod stats;
pub mod timer;

use pokus_core::{Config, Database, PokusStore, SessionController, SystemClock};
use serde::Serialize;

use crate::terminal::TerminalDevice;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// A controller for one CLI invocation. The database doubles as the alarm
/// scheduler; due alarms are activated by `pokus nudge run-due`.
pub type Controller<'a> =
    SessionController<&'a Database, SystemClock, &'a Database, TerminalDevice>;

pub fn controller<'a>(db: &'a Database, config: &Config) -> Controller<'a> {
    let store = PokusStore::new(db);
    let game = config.game_for(store.developer_mode());
    SessionController::new(store, SystemClock, db, TerminalDevice, game)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
