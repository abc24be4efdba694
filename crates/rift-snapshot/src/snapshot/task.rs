//! Snapshot orchestration.
//!
//! One invocation runs, in order:
//! filter -> generate -> resolve repeats -> transform -> extract bodies,
//! then persists (when asked) and renders every stub in pipeline order.
//! Each stage takes the previous stage's stubs by value and hands new ones on.

use super::body_extractor::{extract_body, BodyFileStore, DirectoryBodyFileStore, ExtractionOutcome};
use super::error::SnapshotError;
use super::repeats::resolve_repeats;
use super::spec::{OutputFormat, SnapshotSpec};
use super::stub_generator::generate_stub;
use super::transformer::{TransformContext, TransformerRegistry};
use crate::recording::{ExchangeFilter, ServeEventLog};
use crate::stub::{StubMapping, StubStore};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Synthesizes stubs from the exchange log.
pub struct Snapshotter {
    log: Arc<dyn ServeEventLog>,
    store: Arc<dyn StubStore>,
    transformers: TransformerRegistry,
    body_files: Arc<dyn BodyFileStore>,
    context: TransformContext,
}

impl Snapshotter {
    /// Extracted bodies go to `<files_root>/__files`.
    pub fn new(
        log: Arc<dyn ServeEventLog>,
        store: Arc<dyn StubStore>,
        transformers: TransformerRegistry,
        files_root: impl Into<PathBuf>,
    ) -> Self {
        let files_root = files_root.into();
        Self {
            log,
            store,
            transformers,
            body_files: Arc::new(DirectoryBodyFileStore::new(&files_root)),
            context: TransformContext { files_root },
        }
    }

    pub fn with_body_file_store(mut self, body_files: Arc<dyn BodyFileStore>) -> Self {
        self.body_files = body_files;
        self
    }

    /// Run a snapshot from a raw request body. An empty body means the
    /// all-defaults spec.
    pub fn snapshot_from_body(&self, body: &[u8]) -> Result<Vec<Value>, SnapshotError> {
        let spec = if body.iter().all(u8::is_ascii_whitespace) {
            SnapshotSpec::default()
        } else {
            serde_json::from_slice(body).map_err(|e| SnapshotError::InvalidSpec(e.to_string()))?
        };
        self.snapshot(&spec)
    }

    pub fn snapshot(&self, spec: &SnapshotSpec) -> Result<Vec<Value>, SnapshotError> {
        // Both of these fail before any exchange is looked at
        let chain = self
            .transformers
            .chain(&spec.transformers)
            .map_err(SnapshotError::UnknownTransformers)?;
        let filter = ExchangeFilter::from_filters(spec.filters.as_ref())?;

        let events = filter.apply(self.log.serve_events());
        debug!("{} exchanges selected for snapshot", events.len());

        let drafts = events
            .iter()
            .map(|event| {
                generate_stub(event, &spec.capture_headers).map_err(|source| {
                    SnapshotError::StubGeneration {
                        event_id: event.id,
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let resolved = resolve_repeats(drafts, spec.repeat_policy());

        let transformed = resolved
            .into_iter()
            .map(|stub| {
                let stub_id = stub.id;
                chain
                    .apply(stub, &spec.transformer_parameters, &self.context)
                    .map_err(|(name, source)| SnapshotError::Transformer {
                        name,
                        stub_id,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut extracted = 0;
        let mut stubs = Vec::with_capacity(transformed.len());
        for stub in transformed {
            let stub_id = stub.id;
            let (stub, outcome) = extract_body(
                stub,
                spec.extract_body_criteria.as_ref(),
                self.body_files.as_ref(),
            )
            .map_err(|source| SnapshotError::BodyExtraction { stub_id, source })?;
            if matches!(outcome, ExtractionOutcome::Extracted { .. }) {
                extracted += 1;
            }
            stubs.push(stub);
        }

        let mut rendered = Vec::with_capacity(stubs.len());
        for mut stub in stubs {
            if spec.persist {
                stub.persistent = true;
                self.store.add_stub(stub.clone())?;
            }
            rendered.push(render(&stub, spec.output_format)?);
        }

        info!(
            "Snapshot produced {} stubs from {} exchanges ({} bodies extracted, persisted: {})",
            rendered.len(),
            events.len(),
            extracted,
            spec.persist
        );
        Ok(rendered)
    }
}

fn render(stub: &StubMapping, format: OutputFormat) -> Result<Value, serde_json::Error> {
    match format {
        OutputFormat::Full => serde_json::to_value(stub),
        OutputFormat::Ids => Ok(json!({ "id": stub.id })),
    }
}
