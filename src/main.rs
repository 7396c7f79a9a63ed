use clap::Parser;
use quotekeeper::cli::{check, config as config_cmd, logs, run, service, status, wallet, Cli, Commands, ConfigCommands, ServiceCommands, WalletCommands};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run(args) => run::execute(args, &cli.config, cli.log_level.as_deref(), cli.dry_run).await,
        Commands::HealthCheck => check::execute_health(&cli.config),
        Commands::Status => {
            status::execute();
            Ok(())
        }
        Commands::Logs(args) => {
            logs::execute(args);
            Ok(())
        }
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Init { path, force } => config_cmd::execute_init(path, *force),
            ConfigCommands::Show => config_cmd::execute_show(&cli.config),
            ConfigCommands::Validate => config_cmd::execute_validate(&cli.config),
        },
        Commands::Wallet(cmd) => match cmd {
            WalletCommands::Address => wallet::execute_address(&cli.config),
        },
        Commands::Service(cmd) => {
            match cmd {
                ServiceCommands::Install(args) => service::execute_install(args),
                ServiceCommands::Uninstall => service::execute_uninstall(),
            }
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
