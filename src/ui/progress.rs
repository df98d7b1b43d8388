use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use is_terminal::IsTerminal;

use super::logs::paint_line;
use crate::runner::{SessionHandle, UpdateSession};

/// Bar resolution: tenths of a percent, so checkpoints like 77.5 show.
const BAR_LENGTH: u64 = 1000;

/// Live view of a running session: script output above, a progress bar
/// below. Lines ending in `\r` (curl's meter) replace the bar message
/// instead of being printed.
pub struct ProgressRenderer {
    bar: ProgressBar,
    use_color: bool,
    printed: usize,
}

impl ProgressRenderer {
    pub fn new(title: &str) -> Self {
        let use_color = std::io::stdout().is_terminal();
        let bar = if std::io::stderr().is_terminal() {
            ProgressBar::with_draw_target(Some(BAR_LENGTH), ProgressDrawTarget::stderr())
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} {prefix:.bold} [{bar:40.cyan/blue}] {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_length(BAR_LENGTH);
        bar.set_prefix(title.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            bar,
            use_color,
            printed: 0,
        }
    }

    /// Print output that arrived since the last call and move the bar.
    pub fn update(&mut self, session: &UpdateSession) {
        let (lines, meter) = take_new_lines(&session.log, &mut self.printed);
        for line in lines {
            let text = paint_line(line, self.use_color);
            if self.bar.is_hidden() {
                println!("{}", text);
            } else {
                self.bar.println(text);
            }
        }
        self.bar.set_position(bar_position(session.progress_percent));
        let percent = format!("{:5.1}%", session.progress_percent);
        match meter {
            Some(m) if !m.trim().is_empty() => self.bar.set_message(format!("{} {}", percent, m.trim())),
            _ => self.bar.set_message(percent),
        }
    }

    /// Flush the remaining output and remove the bar.
    pub fn finish(mut self, session: &UpdateSession) {
        self.update(session);
        let rest = &session.log[self.printed.min(session.log.len())..];
        let rest = rest.trim_matches(['\r', '\n']);
        if !rest.is_empty() {
            let text = paint_line(rest.rsplit('\r').next().unwrap_or(rest), self.use_color);
            if self.bar.is_hidden() {
                println!("{}", text);
            } else {
                self.bar.println(text);
            }
        }
        self.bar.finish_and_clear();
    }
}

/// Follow a session until it reaches a terminal state, rendering as it goes.
pub async fn follow(handle: &SessionHandle, mut renderer: ProgressRenderer) -> UpdateSession {
    let mut rx = handle.subscribe();
    loop {
        let session = rx.borrow_and_update().clone();
        if session.state.is_terminal() {
            renderer.finish(&session);
            return session;
        }
        renderer.update(&session);
        if rx.changed().await.is_err() {
            let session = rx.borrow().clone();
            renderer.finish(&session);
            return session;
        }
    }
}

fn bar_position(percent: f64) -> u64 {
    (percent.clamp(0.0, 100.0) * 10.0).round() as u64
}

/// Complete lines of `log` after `offset`, advancing `offset` past them, plus
/// the latest `\r`-terminated meter segment if one arrived. A trailing partial
/// line stays unread until it is complete. So does a segment ending in a lone
/// `\r`: it is reported as the meter, but it may still turn out to be a
/// `\r\n` line once the next read arrives.
pub fn take_new_lines<'a>(log: &'a str, offset: &mut usize) -> (Vec<&'a str>, Option<&'a str>) {
    let Some(new) = log.get(*offset..) else {
        return (Vec::new(), None);
    };
    let held = new.strip_suffix('\r').map(|rest| {
        let start = rest.rfind(['\n', '\r']).map_or(0, |i| i + 1);
        (start, &rest[start..])
    });
    let readable = match held {
        Some((start, _)) => &new[..start],
        None => new,
    };
    let held_meter = held.map(|(_, segment)| segment);

    let Some(end) = readable.rfind(['\n', '\r']) else {
        return (Vec::new(), held_meter);
    };
    let complete = &readable[..end];
    let terminator = readable.as_bytes()[end];
    *offset += end + 1;

    let mut lines = Vec::new();
    for line in complete.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        // Within a line, `\r` rewrites the terminal row: keep the last state.
        lines.push(line.rsplit('\r').next().unwrap_or(line));
    }
    // A final `\r` segment is a meter update, not a printed line.
    let meter = if terminator == b'\r' { lines.pop() } else { None };
    (lines, held_meter.or(meter))
}
