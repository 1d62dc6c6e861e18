use crate::demo::{run_demo, run_license_report, DemoArgs, LicenseReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use pharmacy_ops::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Pharmacy Operations Dashboard",
    about = "Run the pharmacy operations service or its reports from the command line",
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
    /// License expiry reporting
    Licenses {
        #[command(subcommand)]
        command: LicenseCommand,
    },
    /// Run an end-to-end demo over in-memory backends
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum LicenseCommand {
    /// Classify a license CSV export and print renewal notices
    Report(LicenseReportArgs),
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
        Command::Licenses {
            command: LicenseCommand::Report(args),
        } => run_license_report(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
