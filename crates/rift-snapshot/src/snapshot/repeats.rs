//! Repeated-request resolution.
//!
//! Stubs are grouped by the structural signature of their request pattern.
//! Under `Skip` only the first stub of a group survives; under `Scenarios`
//! every member of a repeated group joins one linear scenario:
//!
//! ```text
//! scenario-1-api_users:  Started -> scenario-1-api_users-2 -> scenario-1-api_users-3 -> ...
//! ```
//!
//! Every surviving stub keeps its capture position.

use super::spec::RepeatPolicy;
use crate::stub::{StubMapping, STARTED};
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub fn resolve_repeats(stubs: Vec<StubMapping>, policy: RepeatPolicy) -> Vec<StubMapping> {
    let signatures: Vec<String> = stubs.iter().map(|s| s.request.signature()).collect();

    match policy {
        RepeatPolicy::Skip => {
            let mut seen: HashSet<&str> = HashSet::new();
            let before = stubs.len();
            let kept: Vec<StubMapping> = stubs
                .into_iter()
                .zip(&signatures)
                .filter(|(_, sig)| seen.insert(sig.as_str()))
                .map(|(stub, _)| stub)
                .collect();
            if kept.len() < before {
                debug!("Skipped {} repeated requests", before - kept.len());
            }
            kept
        }
        RepeatPolicy::Scenarios => {
            let mut sizes: HashMap<&str, usize> = HashMap::new();
            for signature in &signatures {
                *sizes.entry(signature.as_str()).or_default() += 1;
            }

            // scenario ordinals are handed out in order of first occurrence
            let mut ordinals: HashMap<&str, usize> = HashMap::new();
            let mut positions: HashMap<&str, usize> = HashMap::new();
            let mut resolved = Vec::with_capacity(stubs.len());

            for (stub, signature) in stubs.into_iter().zip(&signatures) {
                let signature = signature.as_str();
                if sizes.get(signature).copied().unwrap_or_default() < 2 {
                    resolved.push(stub);
                    continue;
                }
                let next = ordinals.len() + 1;
                let ordinal = *ordinals.entry(signature).or_insert(next);
                let index = positions.entry(signature).or_insert(0);
                *index += 1;
                resolved.push(into_scenario(stub, ordinal, *index));
            }
            resolved
        }
    }
}

/// Make `stub` the `index`-th (1-based) step of scenario number `ordinal`.
fn into_scenario(stub: StubMapping, ordinal: usize, index: usize) -> StubMapping {
    let slug = stub.name.clone().unwrap_or_else(|| "stub".to_string());
    let scenario = format!("scenario-{ordinal}-{slug}");
    let required = state_label(&scenario, index);
    let new_state = state_label(&scenario, index + 1);
    debug!(
        "Stub {} joins scenario '{}' ({} -> {})",
        stub.id, scenario, required, new_state
    );
    stub.in_scenario(scenario, required, new_state)
}

fn state_label(scenario: &str, index: usize) -> String {
    if index == 1 {
        STARTED.to_string()
    } else {
        format!("{scenario}-{index}")
    }
}
