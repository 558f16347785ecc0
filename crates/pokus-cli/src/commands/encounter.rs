use chrono::Utc;
use clap::Args;
use pokus_core::encounter::{TimingBar, TimingCursor};
use pokus_core::{
    start_encounter, Config, Database, Device, Pokedex, PokusStore, Rewards, VibrationPattern,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use super::{print_json, CliResult};
use crate::terminal::TerminalDevice;

#[derive(Args)]
pub struct EncounterArgs {
    /// Cursor centre on the timing bar, in bar pixels
    #[arg(long, conflicts_with = "frames")]
    position: Option<f64>,
    /// Stop the bouncing cursor after this many animation frames
    #[arg(long)]
    frames: Option<u32>,
    /// Seed the random draws for a reproducible encounter
    #[arg(long)]
    seed: Option<u64>,
}

pub fn run(args: EncounterArgs) -> CliResult {
    let db = Database::open()?;
    let config = Config::load()?;
    let store = PokusStore::new(&db);
    let game = config.game_for(store.developer_mode());

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let session_seconds = store.last_session_seconds();
    let Some(mut encounter) =
        start_encounter(&store, &config, &Pokedex::starter(), session_seconds, &mut rng)?
    else {
        let rewards = Rewards::new(&store, &game);
        print_json(&json!({
            "type": "NotEligible",
            "accumulated_focus": rewards.accumulated_focus(),
            "threshold_secs": game.encounter_threshold_secs,
        }))?;
        return Ok(());
    };

    let position = match (args.position, args.frames) {
        (Some(p), _) => p,
        (None, Some(frames)) => cursor_after(encounter.bar(), frames),
        (None, None) => encounter.bar().random_stop(&mut rng),
    };

    let device = TerminalDevice;
    if let Some(result) = encounter.throw(position, &mut rng, &store) {
        device.vibrate(if result.caught {
            VibrationPattern::CatchSuccess
        } else {
            VibrationPattern::CatchFail
        });
    }
    if let Some(event) = encounter.resolved_event(Utc::now()) {
        print_json(&event)?;
    }
    Ok(())
}

fn cursor_after(bar: &TimingBar, frames: u32) -> f64 {
    let mut cursor = TimingCursor::new(bar);
    for _ in 0..frames {
        cursor.step();
    }
    cursor.center()
}
