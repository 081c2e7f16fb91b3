//! Job files.
//!
//! A job is one JSON document holding the job-wide defaults and every path
//! layer of a drawing. Running a job writes one `.nc` program per top-level
//! path next to the job file, plus a probing program and a nominal heights
//! file for paths that use bed probes.

use crate::{BUILD_DATE, VERSION};
use anyhow::{Context, Result};
use pathkit_camtools::{Defaults, ModelBuilder, PathLayer, PathLibrary, Program};
use pathkit_core::{DiagContext, Diagnostics, PathName, Statistics};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Contents of a job file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub paths: Vec<PathLayer>,
}

/// Everything generated for one top-level path.
#[derive(Debug, Clone)]
pub struct CompiledPath {
    pub program: Program,
    /// Measures the bed probes, when the path has any
    pub probing: Option<Program>,
    /// Probe parameter assignments for a flat bed
    pub nominal_heights: Option<String>,
}

/// Outcome of running one job file.
#[derive(Debug, Clone, Default)]
pub struct JobReport {
    pub written: Vec<PathBuf>,
    pub programs: usize,
    pub statistics: Statistics,
}

impl Job {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse job")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read job file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid job file {}", path.display()))
    }

    /// Compiles every top-level path. Problems are reported to `diags`;
    /// paths with errors are left out.
    pub fn compile(self, diags: &mut Diagnostics) -> Vec<CompiledPath> {
        let library = PathLibrary::new(self.defaults, self.paths, diags);
        debug!("job: {} paths", library.len());

        let models = ModelBuilder::new(&library, diags).root_models();
        let mut compiled = Vec::with_capacity(models.len());
        for model in models {
            let generated = model.generate().and_then(|program| {
                let probing = model.probing_program()?;
                Ok(CompiledPath {
                    program,
                    nominal_heights: probing.as_ref().map(|_| model.nominal_heights()),
                    probing,
                })
            });
            match generated {
                Ok(path) => compiled.push(path),
                Err(e) => diags.error(DiagContext::path(&model.name), "{0}", [e.to_string()]),
            }
        }
        compiled
    }
}

fn output_path(job_file: &Path, path: &PathName, suffix: &str) -> PathBuf {
    let stem = job_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "job".to_string());
    job_file.with_file_name(format!("{}_{}{}.nc", stem, path.file_stem(), suffix))
}

fn write_program(file: &Path, program: &Program) -> Result<()> {
    let mut text = format!("; pathkit {}, built {}\n", VERSION, BUILD_DATE);
    text.push_str(&program.to_text());
    fs::write(file, text).with_context(|| format!("Failed to write {}", file.display()))
}

/// Compiles the job in `job_file` and writes its programs next to it.
///
/// Drawing problems go to `diags` and do not stop the other paths; only
/// unreadable jobs and failed writes are errors.
pub fn run_file(job_file: &Path, diags: &mut Diagnostics) -> Result<JobReport> {
    let job = Job::load(job_file)?;
    let mut report = JobReport::default();

    for compiled in job.compile(diags) {
        let name = &compiled.program.name;
        let file = output_path(job_file, name, "");
        write_program(&file, &compiled.program)?;
        info!("path {}: written to {}", name, file.display());
        report.written.push(file);

        if let Some(probing) = &compiled.probing {
            let file = output_path(job_file, name, "_probe");
            write_program(&file, probing)?;
            report.written.push(file);
        }
        if let Some(heights) = &compiled.nominal_heights {
            let file = output_path(job_file, name, "_heights");
            fs::write(&file, heights)
                .with_context(|| format!("Failed to write {}", file.display()))?;
            report.written.push(file);
        }

        report.programs += 1;
        report.statistics.merge(&compiled.program.statistics);
    }
    Ok(report)
}
