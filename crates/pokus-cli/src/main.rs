use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod terminal;

#[derive(Parser)]
#[command(name = "pokus", version, about = "Pokus focus timer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Focus and break sessions
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Background nudge alarms
    Nudge {
        #[command(subcommand)]
        action: commands::nudge::NudgeAction,
    },
    /// Spend banked focus on a catch encounter
    Encounter(commands::encounter::EncounterArgs),
    /// Focus statistics and balances
    Stats,
    /// Species catalog and collection
    Dex,
    /// User settings
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Game tuning configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Erase progress in the active data namespace
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("POKUS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Nudge { action } => commands::nudge::run(action),
        Commands::Encounter(args) => commands::encounter::run(args),
        Commands::Stats => commands::stats::run(),
        Commands::Dex => commands::stats::dex(),
        Commands::Settings { action } => commands::settings::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Reset { yes } => commands::stats::reset(yes),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
