// Library exports for the snapshot binary, benchmarks and tests

// ===== Core stub model =====
pub mod predicate;
pub mod stub;
pub mod template;

// ===== Recording and snapshot =====
pub mod recording;
pub mod snapshot;

// ===== Surfaces =====
pub mod admin;
pub mod config;
