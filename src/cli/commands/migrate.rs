//! Migrate command handler

use std::process::ExitCode;

use crate::cli::MigrateArgs;
use crate::migrate::{self, MigrationOptions};

pub async fn cmd_migrate(args: MigrateArgs) -> ExitCode {
    let options = MigrationOptions {
        source: args.sqlite,
        target: args.target,
        force: args.force,
    };

    match migrate::run(&options).await {
        Ok(report) => {
            if let Some(cleared) = report.cleared {
                println!(
                    "Cleared target tables ({} complaint row(s), {} admin row(s) removed)",
                    cleared.complaints, cleared.admins
                );
            }

            println!(
                "Migrated {} complaint(s) and {} admin row(s)",
                report.complaints, report.admins
            );

            if report.deferred_timestamps > 0 {
                println!(
                    "  {} date(s) passed through as text for the target to convert",
                    report.deferred_timestamps
                );
            }
            if report.failed_timestamps > 0 {
                println!(
                    "  {} unreadable date(s) stored as NULL",
                    report.failed_timestamps
                );
            }

            println!();
            println!("Migration completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
