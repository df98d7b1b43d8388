use clap::CommandFactory;
use clap_complete::aot::generate;
use std::io::BufWriter;

fn completions_for(shell: clap_complete::aot::Shell) -> String {
    let mut buf = BufWriter::new(Vec::new());
    generate(shell, &mut mupdater::cli::Cli::command(), "mupdater", &mut buf);
    String::from_utf8(buf.into_inner().unwrap()).unwrap()
}

#[test]
fn completions_bash_generates_output() {
    let output = completions_for(clap_complete::aot::Shell::Bash);
    assert!(!output.is_empty(), "bash completions should not be empty");
    assert!(output.contains("mupdater"));
    assert!(output.contains("--check-first"));
}

#[test]
fn completions_zsh_generates_output() {
    let output = completions_for(clap_complete::aot::Shell::Zsh);
    assert!(!output.is_empty(), "zsh completions should not be empty");
    assert!(output.contains("mupdater"));
}

#[test]
fn completions_fish_generates_output() {
    let output = completions_for(clap_complete::aot::Shell::Fish);
    assert!(!output.is_empty(), "fish completions should not be empty");
    assert!(output.contains("mupdater"));
}
