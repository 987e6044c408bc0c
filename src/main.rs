use clap::Parser;
use plaintrack::TrackError;
use plaintrack::cli::commands;
use plaintrack::cli::{Cli, Commands};
use plaintrack::logging::init_logging;
use serde_json::json;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let overrides = cli.overrides();
    let result = match &cli.command {
        Commands::Status => commands::status::execute(cli.json, &overrides),
        Commands::Merge(args) => commands::merge::execute(args, cli.json, &overrides),
        Commands::Diff(args) => commands::diff::execute(args, cli.json, &overrides),
        Commands::Migrate(args) => commands::migrate::execute(args, cli.json, &overrides),
        Commands::Conflicts(args) => commands::conflicts::execute(args, cli.json, &overrides),
    };

    if let Err(e) = result {
        handle_error(&e, cli.json);
    }
}

/// Report an error on stderr and exit with its code.
fn handle_error(err: &TrackError, json_mode: bool) -> ! {
    if json_mode {
        let payload = json!({
            "error": err.to_string(),
            "suggestion": err.suggestion(),
            "recoverable": err.is_user_recoverable(),
        });
        eprintln!("{payload}");
    } else {
        eprintln!("Error: {err}");
        if let Some(hint) = err.suggestion() {
            eprintln!("Hint: {hint}");
        }
    }
    std::process::exit(err.exit_code());
}
