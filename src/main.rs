use clap::{CommandFactory, Parser};
use clap_complete::aot::generate;
use mupdater::cli::{Cli, Commands};
use mupdater::commands;
use mupdater::commands::update::UpdateOptions;

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber with env-filter support. Logs go to
    // stderr so script output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_file = cli.global.config_file.as_deref();

    let result = match cli.command {
        Commands::Check { channel } => commands::check::run(config_file, channel.into()).await,
        Commands::Update {
            channel,
            mode,
            check_first,
            password_stdin,
        } => {
            let opts = UpdateOptions {
                channel: channel.into(),
                mode: mode.map(Into::into),
                check_first,
                password_stdin,
            };
            commands::update::run(config_file, opts).await
        }
        Commands::Watch { interval } => commands::watch::run(config_file, interval).await,
        Commands::Agent { command } => commands::agent::run(config_file, command),
        Commands::Doctor => commands::doctor::run(),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "mupdater", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
