use clap::Parser;
use task_cli::cli::Cli;
use task_cli::commands;
use task_cli::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    let config = Config::load(args.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(config.log_level())
        .init();

    let store_path = args
        .store
        .clone()
        .unwrap_or_else(|| config.storage.path.clone());

    commands::run(args.command, &store_path, &config, &mut std::io::stdout()).await
}
