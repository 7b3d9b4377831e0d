use crate::demo::{run_demo, DemoArgs};
use crate::infra::build_pipeline;
use crate::server;
use clap::{Args, Parser, Subcommand};
use veridoc::config::AppConfig;
use veridoc::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Document Intelligence Gateway",
    about = "Run and exercise the document intelligence pipeline from the command line",
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
    /// Run the pipeline over local scans using the configured collaborators
    Process(ProcessArgs),
    /// Run an offline end-to-end demo with scripted collaborators
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

#[derive(Args, Debug)]
pub(crate) struct ProcessArgs {
    /// Image locators to process as one document (front, back, ...)
    #[arg(required = true)]
    pub(crate) images: Vec<String>,
    /// Skip auto-detection and process as this document type
    #[arg(long)]
    pub(crate) document_type: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Process(args) => run_process(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}

async fn run_process(args: ProcessArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    veridoc::telemetry::init(&config.telemetry)?;

    let pipeline = build_pipeline(&config)?;
    let ctx = match &args.document_type {
        Some(token) => pipeline.process_known(args.images, token).await,
        None => pipeline.process(args.images).await,
    };

    let report = ctx.report();
    println!(
        "{}",
        serde_json::to_string_pretty(&report).expect("report serializes")
    );
    Ok(())
}
