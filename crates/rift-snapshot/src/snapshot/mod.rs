//! Snapshot: synthesizing replayable stubs from recorded proxy traffic.

mod body_extractor;
mod builtin;
mod error;
mod repeats;
mod spec;
mod stub_generator;
mod task;
mod transformer;

pub use body_extractor::{
    extract_body, BodyExtractCriteria, BodyFileStore, ByteSize, DirectoryBodyFileStore,
    ExtractionOutcome, FILES_DIR,
};
pub use builtin::{DecorateTransformer, RemoveResponseHeaders, ResponseTemplateTransformer};
pub use error::SnapshotError;
pub use repeats::resolve_repeats;
pub use spec::{CaptureHeader, OutputFormat, Parameters, RepeatPolicy, SnapshotSpec};
pub use stub_generator::{generate_stub, url_slug};
pub use task::Snapshotter;
pub use transformer::{
    StubMappingTransformer, TransformContext, TransformerChain, TransformerError,
    TransformerRegistry,
};
