use clap::Parser;
use tracing_subscriber::EnvFilter;

use mdnotes::cli::{
    handle_add, handle_compact, handle_delete, handle_edit, handle_get, handle_init, handle_list,
    handle_move, handle_search, handle_session, Cli, Commands,
};

/// Environment variable holding a tracing filter, e.g. `mdnotes=debug`.
const LOG_ENV: &str = "MDNOTES_LOG";

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("mdnotes=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // stdout carries command output and session responses
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let data_dir = cli.data_dir;
    let result = match cli.command {
        Commands::Init => handle_init(data_dir).await,
        Commands::Add {
            title,
            content,
            stdin,
            json,
        } => handle_add(data_dir, title, content, stdin, json).await,
        Commands::List { filter, json } => handle_list(data_dir, filter, json).await,
        Commands::Get { id, json } => handle_get(data_dir, id, json).await,
        Commands::Edit {
            id,
            title,
            content,
            stdin,
        } => handle_edit(data_dir, id, title, content, stdin).await,
        Commands::Delete { id, force } => handle_delete(data_dir, id, force).await,
        Commands::Search { query, json } => handle_search(data_dir, query, json).await,
        Commands::Move { id, order_index } => handle_move(data_dir, id, order_index).await,
        Commands::Compact => handle_compact(data_dir).await,
        Commands::Session => handle_session(data_dir).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
