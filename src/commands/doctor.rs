use anyhow::Result;
use std::process::Command;

/// Tools the update scripts call, with the arguments used to probe them.
const CHECKS: &[(&str, &[&str])] = &[
    ("zsh", &["--version"]),
    ("curl", &["--version"]),
    ("hdiutil", &["help"]),
    ("sudo", &["-V"]),
    ("open", &["-h"]),
];

fn probe(bin: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(bin).args(args).output().ok()?;
    // hdiutil and open print usage with a non-zero status; existing is enough.
    let text = String::from_utf8_lossy(&output.stdout);
    let text = if text.trim().is_empty() {
        String::from_utf8_lossy(&output.stderr).into_owned()
    } else {
        text.into_owned()
    };
    Some(text.lines().next().unwrap_or("").trim().to_string())
}

pub fn run() -> Result<()> {
    println!("mupdater doctor");
    println!("===============");
    println!();

    let mut all_ok = true;
    for (name, args) in CHECKS {
        match probe(name, args) {
            Some(version) => println!("  [ok] {:<10} {}", name, version),
            None => {
                println!("  [!!] {:<10} not found", name);
                all_ok = false;
            }
        }
    }

    println!();
    if all_ok {
        println!("All dependencies found.");
    } else {
        println!("Some dependencies are missing. Full updates need all of them.");
        println!("Note: hdiutil and open are only available on macOS.");
    }

    Ok(())
}
