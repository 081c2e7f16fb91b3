use anyhow::Context;
use pathkit::{init_logging, run_file, Diagnostics};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> anyhow::Result<ExitCode> {
    init_logging().context("Failed to initialize logging")?;

    let files: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if files.is_empty() {
        eprintln!("usage: pathkit <job.json>...");
        return Ok(ExitCode::from(2));
    }

    let mut failed = false;
    for file in &files {
        let mut diags = Diagnostics::default();
        match run_file(file, &mut diags) {
            Ok(report) => {
                info!(
                    "{}: {} programs written, about {} min of machining",
                    file.display(),
                    report.programs,
                    report.statistics.rounded_minutes()
                );
                if diags.has_errors() {
                    error!("{}: {} errors", file.display(), diags.error_count());
                    failed = true;
                }
            }
            Err(e) => {
                error!("{:#}", e);
                failed = true;
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
