use chrono::Utc;
use clap::Subcommand;
use pokus_core::nudge::monitor;
use pokus_core::nudge::NudgeSnapshot;
use pokus_core::{Config, Database, Event};
use serde_json::json;
use tracing::info;

use super::{controller, print_json, CliResult};

#[derive(Subcommand)]
pub enum NudgeAction {
    /// Handle one alarm activation now
    Fire,
    /// Activate every alarm that is due, as the platform alarm service would
    RunDue,
    /// Pending alarm and the current nudge decision inputs
    Status,
}

pub fn run(action: NudgeAction) -> CliResult {
    let db = Database::open()?;
    let config = Config::load()?;
    let controller = controller(&db, &config);

    match action {
        NudgeAction::Fire => print_json(&controller.on_alarm().event(Utc::now()))?,
        NudgeAction::RunDue => {
            let due = db.take_due_alarms(Utc::now())?;
            info!(count = due.len(), "due nudge alarms");
            let events: Vec<Event> = due
                .iter()
                .map(|_| controller.on_alarm().event(Utc::now()))
                .collect();
            print_json(&events)?;
        }
        NudgeAction::Status => {
            let store = controller.store();
            let now = Utc::now();
            print_json(&json!({
                "handle": store.nudge_alarm(),
                "pending": db
                    .pending_alarms()?
                    .iter()
                    .map(|a| json!({ "handle": a.handle, "fire_at": a.fire_at }))
                    .collect::<Vec<_>>(),
                "snapshot": NudgeSnapshot::read(store, now),
                "monitor": monitor::check(store, now),
            }))?;
        }
    }
    Ok(())
}
