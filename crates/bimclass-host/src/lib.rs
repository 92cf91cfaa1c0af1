//! Pipeline host: runs the export and classify commands against a model store
//! and writes classification codes back in a single transaction.

pub mod pipeline;
pub mod reconcile;

pub use pipeline::{
    ClassifierConfig, ClassifyReport, CommandOutcome, ExportReport, PipelineError,
    classify_command, export_command, run_classify, run_export,
};
pub use reconcile::{ReconcileError, ReconcileReport, WritePolicy, reconcile};
