use std::time::Duration;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, ContentArrangement, Table};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

use crate::runner::{SessionState, UpdateSession};

fn elapsed(session: &UpdateSession) -> Option<Duration> {
    let (start, end) = (session.started_at?, session.finished_at?);
    let secs = (end - start).num_seconds().max(0) as u64;
    Some(Duration::from_secs(secs))
}

fn state_text(state: SessionState, use_color: bool) -> String {
    if !use_color {
        return format!("\u{25cf} {}", state);
    }
    match state {
        SessionState::Succeeded => format!("{} {}", "\u{25cf}".green(), state.green()),
        SessionState::NoUpdateAvailable => format!("{} {}", "\u{25cf}".blue(), state.blue()),
        SessionState::Failed => format!("{} {}", "\u{25cf}".red(), state.red()),
        SessionState::Running | SessionState::Idle => {
            format!("{} {}", "\u{25cf}".yellow(), state.yellow())
        }
    }
}

pub fn outcome_table(session: &UpdateSession, use_color: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![Cell::new("Result"), Cell::new(state_text(session.state, use_color))]);
    table.add_row(vec![Cell::new("Mode"), Cell::new(session.mode)]);
    table.add_row(vec![Cell::new("Channel"), Cell::new(session.channel)]);
    table.add_row(vec![
        Cell::new("Progress"),
        Cell::new(format!("{:.1}%", session.progress_percent)),
    ]);
    if let Some(d) = elapsed(session) {
        table.add_row(vec![
            Cell::new("Duration"),
            Cell::new(humantime::format_duration(d).to_string()),
        ]);
    }
    if let Some(ref path) = session.log_path {
        table.add_row(vec![Cell::new("Log"), Cell::new(path.display())]);
    }
    table
}

/// The blocking notification shown when a session failed.
pub fn failure_notification(session: &UpdateSession) -> Option<String> {
    if session.state != SessionState::Failed {
        return None;
    }
    let reason = session.error.as_deref().unwrap_or("unknown error");
    let log_hint = match session.log_path {
        Some(ref path) => format!("Check the log at {}", path.display()),
        None => "Check the log above".to_string(),
    };
    Some(format!(
        "The update failed: {}.\n{} and verify your password and permissions.",
        reason, log_hint
    ))
}

pub fn print_outcome(session: &UpdateSession) {
    let use_color = std::io::stdout().is_terminal();

    println!();
    for line in outcome_table(session, use_color).to_string().lines() {
        println!("  {}", line);
    }
    println!();

    if let Some(message) = failure_notification(session) {
        if use_color {
            eprintln!("{}", message.red());
        } else {
            eprintln!("{}", message);
        }
    }
}
