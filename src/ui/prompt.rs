use std::io::{BufRead, Write};

use crate::runner::UpdateMode;

const MODE_MENU: &str = "\
How do you want to update MCreator?
  1) Full update (replaces the installed app, needs your password)
  2) Download only (saves the disk image to your downloads folder)
";

/// Ask for full update vs download-only. Re-asks on unrecognized input and
/// returns `None` when the input ends.
pub fn prompt_mode<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> std::io::Result<Option<UpdateMode>> {
    write!(output, "{}", MODE_MENU)?;
    loop {
        write!(output, "Choice [1/2]: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        match parse_mode_choice(&line) {
            Some(mode) => return Ok(Some(mode)),
            None => writeln!(output, "Please answer 1 or 2.")?,
        }
    }
}

pub fn parse_mode_choice(answer: &str) -> Option<UpdateMode> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "1" | "full" | "f" => Some(UpdateMode::FullUpdate),
        "2" | "download" | "download-only" | "d" => Some(UpdateMode::DownloadOnly),
        _ => None,
    }
}

/// Read the administrator password: from the terminal without echo, or as
/// the first line of stdin with `--password-stdin`.
pub fn read_credential(from_stdin: bool) -> std::io::Result<String> {
    if from_stdin {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        return Ok(line.trim_end_matches(['\n', '\r']).to_string());
    }
    crate::platform::read_password("Administrator password: ")
}
