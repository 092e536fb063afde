use clap::Parser;
use form_panel::cli::commands::{cmd_action, cmd_check, cmd_evaluate};
use form_panel::cli::config::{Cli, Commands, load_config, log_level};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref()).with_overrides(&cli);

    match &cli.command {
        Commands::Evaluate { form, sets, format } => {
            cmd_evaluate(form, sets, format, &config, cli.verbose)?;
        }
        Commands::Check { form } => {
            let clean = cmd_check(form, &config, cli.verbose)?;
            if !clean {
                std::process::exit(1);
            }
        }
        Commands::Action {
            form,
            button,
            sets,
            vars,
            format,
        } => {
            let completed = cmd_action(form, button, sets, vars, format, &config, cli.verbose)?;
            if !completed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
