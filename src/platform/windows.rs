use std::io::{BufRead, Write};

use tokio::process::Command;
use tracing::warn;

pub fn configure_process_group(_cmd: &mut Command) {}

pub fn request_termination(child: &mut tokio::process::Child) {
    // No SIGTERM equivalent for a console-less child; kill directly.
    if let Err(e) = child.start_kill() {
        warn!(error = %e, "failed to kill update process");
    }
}

pub fn force_kill(child: &mut tokio::process::Child) {
    let _ = child.start_kill();
}

pub fn read_password(prompt: &str) -> std::io::Result<String> {
    let mut stderr = std::io::stderr();
    write!(stderr, "{}", prompt)?;
    stderr.flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(super::trim_line_ending(line))
}
