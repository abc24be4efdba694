//! Stub mappings (rules), the rule store collaborator and the in-memory
//! registry that replays them.

mod registry;
mod store;
mod types;

pub use registry::{ServedResponse, StubRegistry};
pub use store::{StoreError, StubStore};
pub use types::{ResponseDefinition, StubMapping, STARTED};
