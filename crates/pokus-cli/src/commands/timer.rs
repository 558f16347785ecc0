use std::io::{BufRead, Write};
use std::time::Duration;

use clap::Subcommand;
use pokus_core::rewards::stats::format_clock;
use pokus_core::timer::suggested_break_seconds;
use pokus_core::{Completion, Config, Database, Recovery, SessionMode, StartRequest};
use serde_json::json;
use tracing::debug;

use super::{controller, print_json, CliResult, Controller};

/// Advisory refresh rate of the live countdown.
const WATCH_INTERVAL: Duration = Duration::from_millis(250);

/// Break length when none is given and none was used recently.
const DEFAULT_BREAK_SECONDS: u64 = 300;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a session, replacing any running one
    Start {
        /// Session mode: focus or break
        #[arg(long, default_value = "focus")]
        mode: SessionMode,
        /// Length in minutes (focus defaults to the focus goal)
        #[arg(long, conflicts_with = "seconds")]
        minutes: Option<u64>,
        /// Length in seconds
        #[arg(long)]
        seconds: Option<u64>,
        /// Size a break from this many seconds of focus and the flow ratio
        #[arg(long, conflicts_with_all = ["minutes", "seconds"])]
        after_focus: Option<u64>,
        /// Stay attached and show the countdown
        #[arg(long)]
        watch: bool,
    },
    /// Recover the session and print its state as JSON
    Status,
    /// Abandon the running session without reward
    Cancel,
    /// Show the countdown until the session completes
    Watch {
        /// Exit on completion instead of offering the next action
        #[arg(long)]
        no_prompt: bool,
    },
    /// Recently used durations per mode
    Recent,
}

pub fn run(action: TimerAction) -> CliResult {
    let db = Database::open()?;
    let config = Config::load()?;
    let mut controller = controller(&db, &config);

    match action {
        TimerAction::Start {
            mode,
            minutes,
            seconds,
            after_focus,
            watch,
        } => {
            let request = start_request(&controller, mode, minutes, seconds, after_focus)?;
            let event = controller.start(request)?;
            print_json(&event)?;
            if watch {
                watch_session(&mut controller, true)?;
            }
        }
        TimerAction::Status => {
            if let Recovery::Completed(done) = controller.recover() {
                print_completion(&done)?;
            }
            print_json(&controller.snapshot())?;
        }
        TimerAction::Cancel => {
            controller.recover();
            match controller.cancel() {
                Some(event) => print_json(&event)?,
                None => print_json(&controller.snapshot())?,
            }
        }
        TimerAction::Watch { no_prompt } => match controller.recover() {
            Recovery::NoSession => {
                return Err("no session is running".into());
            }
            Recovery::Running(event) => {
                print_json(&event)?;
                watch_session(&mut controller, !no_prompt)?;
            }
            Recovery::Completed(done) => {
                print_completion(&done)?;
                if !no_prompt && after_completion(&mut controller)? {
                    watch_session(&mut controller, true)?;
                }
            }
        },
        TimerAction::Recent => {
            let store = controller.store();
            print_json(&json!({
                "focus": store.recent_timers(SessionMode::Focus),
                "break": store.recent_timers(SessionMode::Break),
            }))?;
        }
    }
    Ok(())
}

fn start_request(
    controller: &Controller<'_>,
    mode: SessionMode,
    minutes: Option<u64>,
    seconds: Option<u64>,
    after_focus: Option<u64>,
) -> Result<StartRequest, Box<dyn std::error::Error>> {
    let settings = controller.store().settings();
    if let Some(focus) = after_focus {
        let secs = suggested_break_seconds(focus, settings.flow_ratio)
            .ok_or("focus session too short for a break")?;
        return Ok(StartRequest::rest(secs));
    }

    let duration = match (minutes, seconds) {
        (Some(m), _) => m.saturating_mul(60),
        (None, Some(s)) => s,
        (None, None) => match mode {
            SessionMode::Focus => u64::from(settings.focus_goal) * 60,
            SessionMode::Break => controller
                .store()
                .recent_timers(SessionMode::Break)
                .first()
                .copied()
                .unwrap_or(DEFAULT_BREAK_SECONDS),
        },
    };
    Ok(StartRequest::new(mode, duration))
}

fn print_completion(done: &Completion) -> CliResult {
    print_json(&done.event)?;
    if let Some(credit) = &done.credit {
        print_json(credit)?;
    }
    Ok(())
}

enum WatchEnd {
    Completed(Completion),
    Hidden,
}

async fn countdown(controller: &mut Controller<'_>) -> WatchEnd {
    let mut interval = tokio::time::interval(WATCH_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Some(done) = controller.tick() {
                    eprintln!();
                    return WatchEnd::Completed(done);
                }
                if let (Some(session), Some(remaining)) =
                    (controller.session(), controller.remaining_seconds())
                {
                    eprint!("\r{} {}  ", session.mode.label(), format_clock(remaining));
                    let _ = std::io::stderr().flush();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!();
                return WatchEnd::Hidden;
            }
        }
    }
}

/// Drive the countdown until completion or Ctrl-C. Hiding leaves the
/// session running; the next `status` or `watch` picks it up.
fn watch_session(controller: &mut Controller<'_>, prompt: bool) -> CliResult {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    loop {
        match runtime.block_on(countdown(controller)) {
            WatchEnd::Hidden => {
                debug!("countdown hidden, session keeps running");
                return Ok(());
            }
            WatchEnd::Completed(done) => {
                print_completion(&done)?;
                if !prompt || !after_completion(controller)? {
                    return Ok(());
                }
            }
        }
    }
}

/// Offer the post-completion actions. Returns true when a new session
/// started.
fn after_completion(
    controller: &mut Controller<'_>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let suggested = controller.suggested_break();
    let extendable = controller.can_extend();

    let mut options = vec!["[r]estart"];
    if suggested.is_some() {
        options.push("[b]reak");
    }
    if extendable {
        options.push("[e]xtend");
    }
    options.push("[q]uit");
    if let Some(secs) = suggested {
        eprintln!("suggested break: {}", format_clock(secs));
    }
    eprint!("{} > ", options.join("  "));
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let event = match line.trim() {
        "r" => controller.restart_same_duration(),
        "b" => match suggested {
            Some(secs) => Some(controller.start(StartRequest::rest(secs))?),
            None => None,
        },
        "e" => controller.extend(),
        _ => None,
    };

    match event {
        Some(event) => {
            print_json(&event)?;
            Ok(true)
        }
        None => {
            controller.return_to_idle();
            Ok(false)
        }
    }
}
