use crate::demo::{print_catalog, run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use obra_audit::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Obra Audit",
    about = "Run construction-site compliance audits from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the inspection blocks, questions and interview script
    Catalog,
    /// Walk a scripted audit through every block using the offline scorer
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Catalog => {
            print_catalog();
            Ok(())
        }
        Command::Demo(args) => run_demo(args).await,
    }
}
