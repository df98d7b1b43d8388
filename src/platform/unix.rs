use std::io::{BufRead, Write};
use std::os::fd::AsFd;

use nix::sys::signal::{killpg, Signal};
use nix::sys::termios::{self, LocalFlags, SetArg};
use nix::unistd::Pid;
use tokio::process::Command;
use tracing::{debug, warn};

pub fn configure_process_group(cmd: &mut Command) {
    cmd.process_group(0);
}

fn signal_group(child: &mut tokio::process::Child, signal: Signal) {
    let Some(pid) = child.id() else {
        // Already reaped.
        return;
    };
    let pgid = Pid::from_raw(pid as i32);
    match killpg(pgid, signal) {
        Ok(()) => debug!(pid, ?signal, "signalled process group"),
        Err(nix::errno::Errno::ESRCH) => debug!(pid, "process group already exited"),
        Err(e) => {
            warn!(pid, error = %e, "killpg failed, falling back to kill");
            let _ = child.start_kill();
        }
    }
}

pub fn request_termination(child: &mut tokio::process::Child) {
    signal_group(child, Signal::SIGTERM);
}

pub fn force_kill(child: &mut tokio::process::Child) {
    signal_group(child, Signal::SIGKILL);
    let _ = child.start_kill();
}

pub fn read_password(prompt: &str) -> std::io::Result<String> {
    let mut stderr = std::io::stderr();
    write!(stderr, "{}", prompt)?;
    stderr.flush()?;

    let stdin = std::io::stdin();
    let fd = stdin.as_fd();
    // Not a terminal (piped input): read the line as-is.
    let original = termios::tcgetattr(fd).ok();

    if let Some(ref original) = original {
        let mut silent = original.clone();
        silent.local_flags.remove(LocalFlags::ECHO);
        silent.local_flags.insert(LocalFlags::ECHONL);
        termios::tcsetattr(fd, SetArg::TCSANOW, &silent).map_err(std::io::Error::from)?;
    }

    let mut line = String::new();
    let result = stdin.lock().read_line(&mut line);

    if let Some(ref original) = original {
        let _ = termios::tcsetattr(fd, SetArg::TCSANOW, original);
    }

    result?;
    Ok(super::trim_line_ending(line))
}
