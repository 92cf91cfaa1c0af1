//! Writing classification codes back onto model elements.
//!
//! All entries are applied inside one named transaction. Entries that cannot
//! be applied (non-numeric key, element gone, no writable parameter) are
//! counted and skipped. The fallback parameter is used only when the primary
//! one is absent or read-only; a primary whose storage rejects text is
//! counted as unwritable. Any other store error aborts the run and the
//! transaction guard rolls back every write made so far.

use std::fmt;

use bimclass_core::{ClassificationResult, ElementId, ModelError, ModelWriter, Transaction};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Where classification codes are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePolicy {
    /// Parameter receiving the bare code.
    pub primary_parameter: String,
    /// Free-text parameter receiving `"<label>: <code>"` when the primary is unusable.
    pub fallback_parameter: String,
    pub fallback_label: String,
    pub transaction_name: String,
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            primary_parameter: "Classification.Uniclass.Ss.Number".into(),
            fallback_parameter: "Comments".into(),
            fallback_label: "Uniclass".into(),
            transaction_name: "Apply Uniclass classification".into(),
        }
    }
}

impl WritePolicy {
    pub fn fallback_text(&self, code: &str) -> String {
        format!("{}: {}", self.fallback_label, code)
    }
}

/// Per-outcome entry counts for one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub primary: usize,
    pub fallback: usize,
    pub invalid_keys: usize,
    pub missing_elements: usize,
    /// Entries whose element had neither parameter in a writable state.
    pub unwritable: usize,
}

impl ReconcileReport {
    pub fn written(&self) -> usize {
        self.primary + self.fallback
    }

    pub fn skipped(&self) -> usize {
        self.invalid_keys + self.missing_elements + self.unwritable
    }
}

impl fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} element(s) classified ({} primary, {} fallback)",
            self.written(),
            self.primary,
            self.fallback
        )?;
        if self.unwritable > 0 {
            write!(
                f,
                "; {} had no writable classification parameter",
                self.unwritable
            )?;
        }
        if self.invalid_keys + self.missing_elements > 0 {
            write!(
                f,
                "; {} invalid id(s), {} missing element(s) skipped",
                self.invalid_keys, self.missing_elements
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to open transaction: {0}")]
    Begin(#[source] ModelError),

    #[error("failed to look up element {element}: {source}")]
    Lookup {
        element: ElementId,
        #[source]
        source: ModelError,
    },

    #[error("failed to write '{parameter}' on element {element}: {source}")]
    Write {
        element: ElementId,
        parameter: String,
        #[source]
        source: ModelError,
    },

    #[error("failed to commit transaction: {0}")]
    Commit(#[source] ModelError),
}

enum Target {
    Primary,
    Fallback,
}

/// Apply every entry of `result` in one transaction.
pub fn reconcile<W: ModelWriter + ?Sized>(
    writer: &mut W,
    result: &ClassificationResult,
    policy: &WritePolicy,
) -> Result<ReconcileReport, ReconcileError> {
    let mut tx =
        Transaction::start(writer, &policy.transaction_name).map_err(ReconcileError::Begin)?;
    let mut report = ReconcileReport::default();

    for (key, code) in result.iter() {
        let Ok(raw) = key.trim().parse::<i64>() else {
            debug!(key, "non-numeric result key, skipped");
            report.invalid_keys += 1;
            continue;
        };
        let id = ElementId(raw);

        let lookup = |source: ModelError| ReconcileError::Lookup {
            element: id,
            source,
        };
        if tx.element(id).map_err(lookup)?.is_none() {
            debug!(element = %id, "element no longer in model, skipped");
            report.missing_elements += 1;
            continue;
        }

        let target = if writable(&*tx, id, &policy.primary_parameter).map_err(lookup)? {
            Target::Primary
        } else if writable(&*tx, id, &policy.fallback_parameter).map_err(lookup)? {
            Target::Fallback
        } else {
            debug!(element = %id, "no writable classification parameter");
            report.unwritable += 1;
            continue;
        };

        let (parameter, value) = match target {
            Target::Primary => (&policy.primary_parameter, code.to_string()),
            Target::Fallback => (&policy.fallback_parameter, policy.fallback_text(code)),
        };
        match tx.set_text_parameter(id, parameter, &value) {
            Ok(()) => {}
            Err(ModelError::StorageMismatch { .. }) => {
                debug!(element = %id, parameter, "parameter does not store text");
                report.unwritable += 1;
                continue;
            }
            Err(source) => {
                return Err(ReconcileError::Write {
                    element: id,
                    parameter: parameter.clone(),
                    source,
                });
            }
        }
        match target {
            Target::Primary => report.primary += 1,
            Target::Fallback => report.fallback += 1,
        }
    }

    tx.commit().map_err(ReconcileError::Commit)?;

    if report.unwritable > 0 {
        warn!(
            count = report.unwritable,
            "classification codes dropped, no writable parameter"
        );
    }
    info!(
        primary = report.primary,
        fallback = report.fallback,
        invalid_keys = report.invalid_keys,
        missing = report.missing_elements,
        unwritable = report.unwritable,
        "reconciliation committed"
    );
    Ok(report)
}

fn writable<W: ModelWriter + ?Sized>(
    model: &W,
    id: ElementId,
    name: &str,
) -> Result<bool, ModelError> {
    Ok(model
        .parameter(id, name)?
        .is_some_and(|p| p.is_writable()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bimclass_core::{
        BoundingBox, BuiltInParam, Category, ElementInfo, ElementType, GeometryObject, Location,
        ModelReader, Parameter,
    };
    use bimclass_store::{ElementRecord, ModelSnapshot, SnapshotStore, TypeRecord};

    const PRIMARY: &str = "Classification.Uniclass.Ss.Number";

    fn snapshot() -> ModelSnapshot {
        ModelSnapshot {
            elements: vec![
                ElementRecord::new(101, Category::Walls)
                    .with_type(201)
                    .with_parameter(PRIMARY, Parameter::text(""))
                    .with_parameter("Comments", Parameter::text("")),
                ElementRecord::new(102, Category::Doors)
                    .with_type(201)
                    .with_parameter(PRIMARY, Parameter::text("").read_only())
                    .with_parameter("Comments", Parameter::text("")),
                ElementRecord::new(103, Category::Floors)
                    .with_type(201)
                    .with_parameter("Comments", Parameter::text("").read_only()),
                ElementRecord::new(104, Category::Roofs)
                    .with_type(201)
                    .with_parameter(PRIMARY, Parameter::double(1.0))
                    .with_parameter("Comments", Parameter::text("designer note")),
            ],
            types: vec![TypeRecord::new(201, "Basic", "Generic")],
            materials: vec![],
        }
    }

    fn store() -> SnapshotStore {
        SnapshotStore::from_snapshot(snapshot()).unwrap()
    }

    fn text(store: &SnapshotStore, id: i64, name: &str) -> Option<String> {
        store
            .parameter(ElementId(id), name)
            .unwrap()
            .and_then(|p| p.value_string())
    }

    fn result(pairs: &[(&str, &str)]) -> ClassificationResult {
        pairs.iter().copied().collect()
    }

    #[test]
    fn primary_write_and_missing_element_skip() {
        let mut store = store();
        let report = reconcile(
            &mut store,
            &result(&[("101", "Ss_25_10"), ("999", "Zz_99_99")]),
            &WritePolicy::default(),
        )
        .unwrap();

        assert_eq!(text(&store, 101, PRIMARY).as_deref(), Some("Ss_25_10"));
        assert_eq!(report.primary, 1);
        assert_eq!(report.missing_elements, 1);
        assert!(!store.in_transaction());
    }

    #[test]
    fn read_only_primary_uses_fallback() {
        let mut store = store();
        let report = reconcile(
            &mut store,
            &result(&[("102", "Ss_25_30")]),
            &WritePolicy::default(),
        )
        .unwrap();

        assert_eq!(text(&store, 102, "Comments").as_deref(), Some("Uniclass: Ss_25_30"));
        assert_eq!(text(&store, 102, PRIMARY).as_deref(), Some(""));
        assert_eq!(report.fallback, 1);
    }

    #[test]
    fn non_text_primary_is_unwritable_and_keeps_comments() {
        let mut store = store();
        let report = reconcile(
            &mut store,
            &result(&[("104", "Ss_30"), ("101", "Ss_25_10")]),
            &WritePolicy::default(),
        )
        .unwrap();

        assert_eq!(text(&store, 104, "Comments").as_deref(), Some("designer note"));
        assert_eq!(text(&store, 104, PRIMARY).as_deref(), Some("1"));
        assert_eq!(report.unwritable, 1);
        assert_eq!(report.fallback, 0);
        assert_eq!(report.primary, 1);
        assert_eq!(text(&store, 101, PRIMARY).as_deref(), Some("Ss_25_10"));
    }

    #[test]
    fn no_writable_parameter_is_counted_not_raised() {
        let mut store = store();
        let report = reconcile(
            &mut store,
            &result(&[("103", "Ss_40")]),
            &WritePolicy::default(),
        )
        .unwrap();
        assert_eq!(report.unwritable, 1);
        assert_eq!(report.written(), 0);
        assert_eq!(store.snapshot(), &snapshot());
        assert!(report.to_string().contains("1 had no writable"));
    }

    #[test]
    fn invalid_keys_skipped() {
        let mut store = store();
        let report = reconcile(
            &mut store,
            &result(&[("abc", "Ss_1"), ("", "Ss_2"), (" 101 ", "Ss_3"), ("1.5", "Ss_4")]),
            &WritePolicy::default(),
        )
        .unwrap();
        assert_eq!(report.invalid_keys, 3);
        assert_eq!(report.primary, 1);
        assert_eq!(text(&store, 101, PRIMARY).as_deref(), Some("Ss_3"));
    }

    #[test]
    fn custom_policy() {
        let mut store = store();
        let policy = WritePolicy {
            primary_parameter: "Missing".into(),
            fallback_label: "Ss".into(),
            ..WritePolicy::default()
        };
        reconcile(&mut store, &result(&[("101", "Ss_25")]), &policy).unwrap();
        assert_eq!(text(&store, 101, "Comments").as_deref(), Some("Ss: Ss_25"));
        assert_eq!(text(&store, 101, PRIMARY).as_deref(), Some(""));
    }

    #[test]
    fn empty_result_commits_nothing() {
        let mut store = store();
        let report =
            reconcile(&mut store, &ClassificationResult::new(), &WritePolicy::default()).unwrap();
        assert_eq!(report, ReconcileReport::default());
        assert!(!store.in_transaction());
    }

    #[test]
    fn open_transaction_is_begin_error() {
        let mut store = store();
        store.begin_transaction("other").unwrap();
        let err = reconcile(&mut store, &result(&[("101", "x")]), &WritePolicy::default())
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Begin(ModelError::TransactionOpen(_))));
    }

    /// Delegates to a snapshot store but rejects writes to one element.
    struct FailingWriter {
        inner: SnapshotStore,
        fail_on: ElementId,
    }

    impl ModelReader for FailingWriter {
        fn instances_of(&self, category: Category) -> Result<Vec<ElementId>, ModelError> {
            self.inner.instances_of(category)
        }
        fn element(&self, id: ElementId) -> Result<Option<ElementInfo>, ModelError> {
            self.inner.element(id)
        }
        fn element_type(&self, id: ElementId) -> Result<Option<ElementType>, ModelError> {
            self.inner.element_type(id)
        }
        fn parameter(&self, id: ElementId, name: &str) -> Result<Option<Parameter>, ModelError> {
            self.inner.parameter(id, name)
        }
        fn builtin_parameter(
            &self,
            id: ElementId,
            param: BuiltInParam,
        ) -> Result<Option<Parameter>, ModelError> {
            self.inner.builtin_parameter(id, param)
        }
        fn geometry(&self, id: ElementId) -> Result<Option<Vec<GeometryObject>>, ModelError> {
            self.inner.geometry(id)
        }
        fn bounding_box(&self, id: ElementId) -> Result<Option<BoundingBox>, ModelError> {
            self.inner.bounding_box(id)
        }
        fn location(&self, id: ElementId) -> Result<Location, ModelError> {
            self.inner.location(id)
        }
        fn material_names(&self, id: ElementId) -> Result<Vec<String>, ModelError> {
            self.inner.material_names(id)
        }
    }

    impl ModelWriter for FailingWriter {
        fn begin_transaction(&mut self, name: &str) -> Result<(), ModelError> {
            self.inner.begin_transaction(name)
        }
        fn commit(&mut self) -> Result<(), ModelError> {
            self.inner.commit()
        }
        fn rollback(&mut self) -> Result<(), ModelError> {
            self.inner.rollback()
        }
        fn set_text_parameter(
            &mut self,
            id: ElementId,
            name: &str,
            value: &str,
        ) -> Result<(), ModelError> {
            if id == self.fail_on {
                return Err(ModelError::Other("disk full".into()));
            }
            self.inner.set_text_parameter(id, name, value)
        }
    }

    #[test]
    fn write_error_rolls_back_earlier_writes() {
        let mut writer = FailingWriter {
            inner: store(),
            fail_on: ElementId(102),
        };
        let err = reconcile(
            &mut writer,
            &result(&[("101", "Ss_25_10"), ("102", "Ss_25_30")]),
            &WritePolicy::default(),
        )
        .unwrap_err();

        assert!(matches!(err, ReconcileError::Write { element: ElementId(102), .. }));
        assert_eq!(writer.inner.snapshot(), &snapshot());
        assert!(!writer.inner.in_transaction());
    }

    #[test]
    fn commit_failure_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("model");
        std::fs::create_dir(&model_dir).unwrap();
        let path = model_dir.join("model.json");
        store().save_to(&path).unwrap();

        let mut store = SnapshotStore::open_persistent(&path).unwrap();
        std::fs::remove_dir_all(&model_dir).unwrap();

        let err = reconcile(&mut store, &result(&[("101", "Ss_25_10")]), &WritePolicy::default())
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Commit(_)));
        assert_eq!(store.snapshot(), &snapshot());
        assert!(!store.in_transaction());
    }

    #[test]
    fn works_through_trait_object() {
        let mut store = store();
        let writer: &mut dyn ModelWriter = &mut store;
        let report =
            reconcile(writer, &result(&[("101", "Ss_25_10")]), &WritePolicy::default()).unwrap();
        assert_eq!(report.primary, 1);
    }
}
