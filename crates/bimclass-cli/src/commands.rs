use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use bimclass_features::ExtractionConfig;
use bimclass_host::{ClassifierConfig, CommandOutcome, WritePolicy};
use bimclass_store::SnapshotStore;

use crate::{ClassifierArgs, ModelArgs, PolicyArgs};

pub fn export(args: &ModelArgs, output: Option<&Path>) -> anyhow::Result<CommandOutcome> {
    let store = SnapshotStore::open(&args.model)
        .with_context(|| format!("loading model {}", args.model.display()))?;
    Ok(bimclass_host::export_command(
        &store,
        &extraction(args),
        output,
    ))
}

pub async fn classify(
    args: &ModelArgs,
    classifier: &ClassifierArgs,
    policy: &PolicyArgs,
) -> anyhow::Result<CommandOutcome> {
    let mut store = SnapshotStore::open_persistent(&args.model)
        .with_context(|| format!("loading model {}", args.model.display()))?;

    let outcome = bimclass_host::classify_command(
        &mut store,
        &extraction(args),
        &classifier_config(classifier),
        &write_policy(policy),
    )
    .await;
    Ok(outcome)
}

pub fn info() {
    println!("bimclass {}", env!("CARGO_PKG_VERSION"));
    println!(
        "Exports building-model element features for an external classifier \
         and writes the returned classification codes back onto the elements."
    );
}

pub fn report(outcome: &CommandOutcome) {
    match outcome {
        CommandOutcome::Succeeded(message) => println!("{message}"),
        CommandOutcome::Failed(message) => eprintln!("error: {message}"),
        CommandOutcome::Cancelled => eprintln!("cancelled: no output file given (use --output)"),
    }
}

fn extraction(args: &ModelArgs) -> ExtractionConfig {
    ExtractionConfig::with_categories(args.categories.clone())
}

fn classifier_config(args: &ClassifierArgs) -> ClassifierConfig {
    let work_dir = args
        .work_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("bimclass"));
    ClassifierConfig {
        program: args.classifier.clone(),
        leading_args: args.classifier_args.clone(),
        work_dir,
        model_dir: args.model_dir.clone(),
        timeout: timeout(args.timeout_secs),
    }
}

fn timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

fn write_policy(args: &PolicyArgs) -> WritePolicy {
    WritePolicy {
        primary_parameter: args.primary_parameter.clone(),
        fallback_parameter: args.fallback_parameter.clone(),
        fallback_label: args.fallback_label.clone(),
        ..WritePolicy::default()
    }
}
