use pokus_core::clock::{Clock, SystemClock};
use pokus_core::rewards::stats::format_compact;
use pokus_core::{Collection, Config, Database, Pokedex, PokusStore, Rewards, SessionMode};
use serde_json::json;

use super::{print_json, CliResult};

pub fn run() -> CliResult {
    let db = Database::open()?;
    let config = Config::load()?;
    let store = PokusStore::new(&db);
    let game = config.game_for(store.developer_mode());
    let rewards = Rewards::new(&store, &game);
    let collection = Collection::new(&store);
    let today = SystemClock.today();
    let total = rewards.total_focus();
    let weekly_total = rewards.weekly_total(today);

    print_json(&json!({
        "developer_mode": store.developer_mode(),
        "coins": rewards.coins(),
        "accumulated_focus": rewards.accumulated_focus(),
        "last_session_seconds": store.last_session_seconds(),
        "encounters_available": rewards.claim_encounter_eligibility(game.encounter_threshold_secs),
        "today_focus": rewards.history().get(today),
        "weekly_focus": rewards.weekly_focus(today),
        "weekly_total": weekly_total,
        "weekly_total_display": format_compact(weekly_total),
        "total_focus": total,
        "total_focus_display": format_compact(total),
        "caught": collection.caught().len(),
        "shiny": collection.shiny().len(),
        "last_result": collection.last_result(),
        "recent_focus": store.recent_timers(SessionMode::Focus),
        "recent_break": store.recent_timers(SessionMode::Break),
    }))
}

/// The catalog with collection flags.
pub fn dex() -> CliResult {
    let db = Database::open()?;
    let store = PokusStore::new(&db);
    let collection = Collection::new(&store);
    let caught = collection.caught();
    let shiny = collection.shiny();

    let entries: Vec<_> = Pokedex::starter()
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "name": s.name,
                "typeId": s.type_id,
                "typeId2": s.type_id2,
                "caught": caught.contains(&s.id),
                "shiny": shiny.contains(&s.id),
            })
        })
        .collect();
    print_json(&entries)
}

pub fn reset(confirmed: bool) -> CliResult {
    if !confirmed {
        return Err("refusing to reset progress without --yes".into());
    }
    let db = Database::open()?;
    let store = PokusStore::new(&db);
    store.reset_progress()?;
    println!("progress reset");
    Ok(())
}
