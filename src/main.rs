use clap::Parser;
use complaint_box::cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    // before parsing, so `.env` can supply DATABASE_URL to clap
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    complaint_box::run(cli)
}
