//! openapi-inspect - print what an OpenAPI document resolves to

use clap::{Parser, Subcommand};
use openapi_inspect::{load_document, render_components, render_routes};
use openapi_loader::LoaderSettings;
use std::path::PathBuf;
use std::process::ExitCode;

/// Inspect resolved routes, dereferenced output and components of an OpenAPI document
#[derive(Parser, Debug)]
#[command(name = "openapi-inspect")]
#[command(author = "Symbia Labs")]
#[command(version)]
#[command(about = "Inspect OpenAPI documents with their references resolved")]
struct Args {
    /// Document to inspect (JSON or YAML)
    file: PathBuf,

    /// Loader settings file (JSON)
    #[arg(long, env = "OPENAPI_INSPECT_CONFIG", default_value = "openapi-loader.json")]
    config: PathBuf,

    /// Load external references before dereferencing
    #[arg(long, env = "OPENAPI_INSPECT_EXTERNAL")]
    external: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every endpoint with its merged parameters, servers and security
    Routes,
    /// Print the dereferenced document as JSON
    Dereference,
    /// List component names per kind
    Components,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let settings = LoaderSettings::load(&args.config)?;
    let document = load_document(&args.file, &settings, args.external).await?;

    match args.command {
        Command::Routes => {
            let resolved = document.resolved()?;
            print!("{}", render_routes(&resolved));
        }
        Command::Dereference => {
            let dereferenced = document.locally_dereferenced()?;
            println!("{}", serde_json::to_string_pretty(&dereferenced)?);
        }
        Command::Components => {
            print!("{}", render_components(&document));
        }
    }
    Ok(())
}
