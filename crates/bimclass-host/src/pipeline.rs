//! End-to-end command runners: export, and extract → invoke → reconcile.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bimclass_ai::{InvocationDescriptor, InvocationError, ResultParseError, invoke, read_results};
use bimclass_core::{ModelError, ModelReader, ModelWriter};
use bimclass_features::{ExchangeError, ExtractionConfig, extract, write_exchange};
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::reconcile::{ReconcileError, ReconcileReport, WritePolicy, reconcile};

pub const TABULAR_INPUT: &str = "export.csv";
pub const STRUCTURED_INPUT: &str = "export.json";
pub const RESULT_FILE: &str = "classified.json";

/// How to run the external classifier for one classify command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub program: PathBuf,
    pub leading_args: Vec<String>,
    /// Holds the interchange files and the result file.
    pub work_dir: PathBuf,
    /// Trained model location passed to the classifier; defaults to `work_dir`.
    pub model_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl ClassifierConfig {
    pub fn new(program: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            work_dir: work_dir.into(),
            model_dir: None,
            timeout: None,
        }
    }

    pub fn descriptor(&self) -> InvocationDescriptor {
        InvocationDescriptor {
            program: self.program.clone(),
            leading_args: self.leading_args.clone(),
            tabular_input: self.work_dir.join(TABULAR_INPUT),
            structured_input: self.work_dir.join(STRUCTURED_INPUT),
            model_dir: self
                .model_dir
                .clone()
                .unwrap_or_else(|| self.work_dir.clone()),
            result_path: self.work_dir.join(RESULT_FILE),
            timeout: self.timeout,
        }
    }
}

/// A failed pipeline run, tagged with the phase that failed.
///
/// Every phase before `Reconcile` runs without touching the model, and a
/// `Reconcile` failure has already been rolled back.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("feature extraction failed: {0}")]
    Extract(#[source] ModelError),

    #[error("cannot prepare working directory {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("writing exchange files failed: {0}")]
    Export(#[from] ExchangeError),

    #[error("classifier {program} failed (work dir {work_dir}): {source}")]
    Invoke {
        program: PathBuf,
        work_dir: PathBuf,
        #[source]
        source: InvocationError,
    },

    #[error("cannot decode {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ResultParseError,
    },

    #[error("writing classifications failed, model unchanged: {0}")]
    Reconcile(#[from] ReconcileError),
}

impl PipelineError {
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Extract(_) => "extract",
            Self::WorkDir { .. } | Self::Export(_) => "export",
            Self::Invoke { .. } => "invoke",
            Self::Parse { .. } => "parse",
            Self::Reconcile(_) => "reconcile",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub records: usize,
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
}

impl ExportReport {
    pub fn summary(&self) -> String {
        format!(
            "Exported {} element(s) to {} and {}",
            self.records,
            self.json_path.display(),
            self.csv_path.display()
        )
    }
}

#[derive(Debug, Clone)]
pub struct ClassifyReport {
    pub started_at: DateTime<Utc>,
    pub records: usize,
    pub classified: usize,
    pub reconcile: ReconcileReport,
    pub classifier_stdout: String,
    pub elapsed: Duration,
}

impl ClassifyReport {
    pub fn started(&self) -> String {
        self.started_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn summary(&self) -> String {
        format!(
            "Classification started {}, complete in {:.1}s: {} of {} exported element(s) returned; {}",
            self.started(),
            self.elapsed.as_secs_f64(),
            self.classified,
            self.records,
            self.reconcile
        )
    }
}

/// Terminal state of a user-triggered command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Succeeded(String),
    Failed(String),
    Cancelled,
}

impl CommandOutcome {
    pub fn message(&self) -> &str {
        match self {
            Self::Succeeded(m) | Self::Failed(m) => m,
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Succeeded(_) => 0,
            Self::Failed(_) => 1,
            Self::Cancelled => 2,
        }
    }
}

/// Extract all records and write them as JSON at `json_path` with a CSV beside it.
pub fn run_export<R: ModelReader + ?Sized>(
    model: &R,
    extraction: &ExtractionConfig,
    json_path: &Path,
) -> Result<ExportReport, PipelineError> {
    let records = extract(model, extraction).map_err(PipelineError::Extract)?;
    let csv_path = json_path.with_extension("csv");
    write_exchange(&records, json_path, &csv_path)?;

    Ok(ExportReport {
        records: records.len(),
        json_path: json_path.to_path_buf(),
        csv_path,
    })
}

/// Extract, hand the records to the classifier, and write its codes back.
///
/// The model is only mutated in the final phase, inside one transaction.
pub async fn run_classify<W: ModelWriter + ?Sized>(
    model: &mut W,
    extraction: &ExtractionConfig,
    classifier: &ClassifierConfig,
    policy: &WritePolicy,
) -> Result<ClassifyReport, PipelineError> {
    let started_at = Utc::now();
    let start = Instant::now();

    let records = extract(&*model, extraction).map_err(PipelineError::Extract)?;

    std::fs::create_dir_all(&classifier.work_dir).map_err(|source| PipelineError::WorkDir {
        path: classifier.work_dir.clone(),
        source,
    })?;
    let desc = classifier.descriptor();
    write_exchange(&records, &desc.structured_input, &desc.tabular_input)?;

    let invocation = invoke(&desc)
        .await
        .map_err(|source| PipelineError::Invoke {
            program: classifier.program.clone(),
            work_dir: classifier.work_dir.clone(),
            source,
        })?;
    if !invocation.stdout.trim().is_empty() {
        debug!(stdout = %invocation.stdout.trim_end(), "classifier output");
    }

    let result = read_results(&invocation.result_path).map_err(|source| PipelineError::Parse {
        path: invocation.result_path.clone(),
        source,
    })?;
    info!(entries = result.len(), "classifier result decoded");

    let reconciled = reconcile(model, &result, policy)?;

    let report = ClassifyReport {
        started_at,
        records: records.len(),
        classified: result.len(),
        reconcile: reconciled,
        classifier_stdout: invocation.stdout,
        elapsed: start.elapsed(),
    };
    info!(
        started_at = %report.started(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        written = report.reconcile.written(),
        "classification finished"
    );
    Ok(report)
}

/// Export command: `None` destination means the user dismissed the save prompt.
pub fn export_command<R: ModelReader + ?Sized>(
    model: &R,
    extraction: &ExtractionConfig,
    destination: Option<&Path>,
) -> CommandOutcome {
    let Some(json_path) = destination else {
        info!("export cancelled, no destination");
        return CommandOutcome::Cancelled;
    };
    match run_export(model, extraction, json_path) {
        Ok(report) => CommandOutcome::Succeeded(report.summary()),
        Err(e) => failed(&e),
    }
}

pub async fn classify_command<W: ModelWriter + ?Sized>(
    model: &mut W,
    extraction: &ExtractionConfig,
    classifier: &ClassifierConfig,
    policy: &WritePolicy,
) -> CommandOutcome {
    match run_classify(model, extraction, classifier, policy).await {
        Ok(report) => CommandOutcome::Succeeded(report.summary()),
        Err(e) => failed(&e),
    }
}

fn failed(e: &PipelineError) -> CommandOutcome {
    error!(phase = e.phase(), error = %e, "command failed");
    CommandOutcome::Failed(format!("{} phase failed: {e}", e.phase()))
}
