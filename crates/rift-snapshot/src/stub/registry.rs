//! In-memory stub registry with scenario-aware replay.

use super::store::{StoreError, StubStore};
use super::types::{StubMapping, STARTED};
use crate::recording::LoggedRequest;
use crate::snapshot::FILES_DIR;
use crate::template::{has_template_variables, process_template, RequestData, RESPONSE_TEMPLATE};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Response produced by serving a request from the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ServedResponse {
    pub stub_id: Uuid,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl ServedResponse {
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Stubs in insertion order plus the current state of every scenario.
///
/// Adding a stub whose id is already registered replaces it in place.
#[derive(Default)]
pub struct StubRegistry {
    stubs: RwLock<Vec<StubMapping>>,
    scenarios: Mutex<HashMap<String, String>>,
    files_root: Option<PathBuf>,
}

impl StubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `bodyFileName` references under `<files_root>/__files`.
    pub fn with_files_root(mut self, files_root: impl Into<PathBuf>) -> Self {
        self.files_root = Some(files_root.into());
        self
    }

    pub fn stubs(&self) -> Vec<StubMapping> {
        self.stubs.read().clone()
    }

    pub fn get(&self, id: Uuid) -> Option<StubMapping> {
        self.stubs.read().iter().find(|s| s.id == id).cloned()
    }

    pub fn remove(&self, id: Uuid) -> Option<StubMapping> {
        let mut stubs = self.stubs.write();
        let index = stubs.iter().position(|s| s.id == id)?;
        Some(stubs.remove(index))
    }

    pub fn len(&self) -> usize {
        self.stubs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.read().is_empty()
    }

    pub fn scenario_state(&self, scenario: &str) -> Option<String> {
        self.scenarios.lock().get(scenario).cloned()
    }

    /// Put every known scenario back into its initial state.
    pub fn reset_scenarios(&self) {
        let mut scenarios = self.scenarios.lock();
        for state in scenarios.values_mut() {
            *state = STARTED.to_string();
        }
    }

    /// Serve a request: the first stub in insertion order whose pattern is an
    /// exact match and whose scenario is in the required state. Selecting a
    /// scenario stub moves its scenario to the stub's new state.
    pub fn serve(&self, request: &LoggedRequest) -> Option<ServedResponse> {
        let stubs = self.stubs.read();
        let mut scenarios = self.scenarios.lock();

        let stub = stubs
            .iter()
            .find(|stub| {
                scenario_allows(stub, &scenarios)
                    && stub.request.match_request(request).is_exact_match()
            })?
            .clone();
        drop(stubs);

        if let (Some(scenario), Some(new_state)) = (&stub.scenario_name, &stub.new_scenario_state)
        {
            debug!(
                "Scenario '{}' moves to state '{}' (stub {})",
                scenario, new_state, stub.id
            );
            scenarios.insert(scenario.clone(), new_state.clone());
        }
        drop(scenarios);

        debug!("Request {} {} matched stub {}", request.method, request.url, stub.id);
        Some(self.render(&stub, request))
    }

    fn render(&self, stub: &StubMapping, request: &LoggedRequest) -> ServedResponse {
        let response = &stub.response;
        let mut body = match (&response.body_file_name, &self.files_root) {
            (Some(file_name), Some(_)) if !is_plain_file_name(file_name) => {
                warn!(
                    "Stub {} references body file '{}' outside {}",
                    stub.id, file_name, FILES_DIR
                );
                Vec::new()
            }
            (Some(file_name), Some(root)) => {
                let path = root.join(FILES_DIR).join(file_name);
                fs::read(&path).unwrap_or_else(|e| {
                    warn!("Failed to read body file {:?} for stub {}: {}", path, stub.id, e);
                    Vec::new()
                })
            }
            (Some(file_name), None) => {
                warn!(
                    "Stub {} references body file '{}' but no files root is configured",
                    stub.id, file_name
                );
                Vec::new()
            }
            (None, _) => response.inline_body(),
        };

        if response.has_transformer(RESPONSE_TEMPLATE) {
            let text = std::str::from_utf8(&body).ok().filter(|t| has_template_variables(t));
            if let Some(text) = text {
                body = process_template(text, &RequestData::from_request(request)).into_bytes();
            }
        }

        ServedResponse {
            stub_id: stub.id,
            status: response.status,
            headers: response.headers.clone(),
            body,
        }
    }
}

/// A single normal path component, so the file resolves inside `__files`.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn scenario_allows(stub: &StubMapping, scenarios: &HashMap<String, String>) -> bool {
    let Some(scenario) = &stub.scenario_name else {
        return true;
    };
    let current = scenarios.get(scenario).map(String::as_str).unwrap_or(STARTED);
    stub.required_scenario_state
        .as_deref()
        .map_or(true, |required| required == current)
}

impl StubStore for StubRegistry {
    fn add_stub(&self, stub: StubMapping) -> Result<(), StoreError> {
        if let Some(scenario) = &stub.scenario_name {
            self.scenarios
                .lock()
                .entry(scenario.clone())
                .or_insert_with(|| STARTED.to_string());
        }

        let mut stubs = self.stubs.write();
        match stubs.iter().position(|s| s.id == stub.id) {
            Some(index) => {
                debug!("Replacing stub {}", stub.id);
                stubs[index] = stub;
            }
            None => {
                debug!("Adding stub {}", stub.id);
                stubs.push(stub);
            }
        }
        Ok(())
    }
}
