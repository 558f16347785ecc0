use clap::Subcommand;
use pokus_core::{Database, Settings};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Get a setting (e.g. "nudge_interval", "flow_ratio")
    Get {
        /// Setting name
        name: String,
    },
    /// Set a setting
    Set {
        /// Setting name
        name: String,
        /// New value
        value: String,
    },
    /// List all settings
    List,
}

pub fn run(action: SettingsAction) -> CliResult {
    let db = Database::open()?;
    let mut settings = Settings::load(&db);

    match action {
        SettingsAction::Get { name } => {
            let json = serde_json::to_value(&settings)?;
            match json.get(&name) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown setting: {name}").into()),
            }
        }
        SettingsAction::Set { name, value } => {
            settings.set_field(&name, &value)?;
            settings.save(&db)?;
            println!("ok");
        }
        SettingsAction::List => print_json(&settings)?,
    }
    Ok(())
}
