use clap::Parser;
use tracing::Level;

use shortlink_client::cli::commands::{
    Context, cmd_history, cmd_login, cmd_logout, cmd_register, cmd_shorten, cmd_status,
};
use shortlink_client::cli::config::{Cli, Commands, load_config};
use shortlink_client::cli::shell::cmd_shell;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // CLI > config file > defaults
    let config = load_config(cli.config.as_deref()).with_overrides(&cli);
    let ctx = Context::open(config)?;

    let succeeded = match cli.command {
        Commands::Register {
            name,
            email,
            password,
            confirm_password,
        } => cmd_register(&ctx, &name, &email, &password, &confirm_password).await?,
        Commands::Login { email, password } => cmd_login(&ctx, &email, &password).await?,
        Commands::Shorten { url, expiration } => cmd_shorten(&ctx, &url, expiration).await?,
        Commands::History => cmd_history(&ctx).await?,
        Commands::Logout => {
            cmd_logout(&ctx)?;
            true
        }
        Commands::Status => {
            cmd_status(&ctx);
            true
        }
        Commands::Shell { form } => {
            cmd_shell(&ctx, &form).await?;
            true
        }
    };

    if !succeeded {
        std::process::exit(1);
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
