use std::path::PathBuf;
use tokio::process::Command;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
use unix as imp;
#[cfg(windows)]
use windows as imp;

/// Configure the command to run in a new process group so the whole script
/// tree (sudo, hdiutil, curl) can be signalled at once.
pub fn configure_process_group(cmd: &mut Command) {
    imp::configure_process_group(cmd)
}

/// Ask a child process (and its group) to terminate. Does not wait.
pub fn request_termination(child: &mut tokio::process::Child) {
    imp::request_termination(child)
}

/// Forcefully kill a child process (and its group). Does not wait.
pub fn force_kill(child: &mut tokio::process::Child) {
    imp::force_kill(child)
}

/// Prompt on stderr and read a line from the terminal without echoing it.
pub fn read_password(prompt: &str) -> std::io::Result<String> {
    imp::read_password(prompt)
}

/// Get the current user's home directory.
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Expand leading `~` or `$HOME` in a path string to the actual home directory.
///
/// Returns the original string unchanged when no home directory is available
/// or the string doesn't start with `~` or `$HOME`.
pub fn expand_home(path: &str) -> String {
    if let Some(home) = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
    {
        let home = home.to_string_lossy();
        if path == "~" || path == "$HOME" {
            return home.to_string();
        }
        if let Some(rest) = path.strip_prefix("~/") {
            return format!("{}/{}", home, rest);
        }
        if let Some(rest) = path
            .strip_prefix("$HOME/")
            .or_else(|| path.strip_prefix("$HOME\\"))
        {
            return format!("{}/{}", home, rest);
        }
    }
    path.to_string()
}

/// Strip the trailing newline (and carriage return) from a line read from a
/// terminal or pipe.
pub(crate) fn trim_line_ending(mut line: String) -> String {
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    line
}
