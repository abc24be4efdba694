//! Snapshot request: what to synthesize and how to render it.

use super::body_extractor::BodyExtractCriteria;
use crate::recording::ServeEventFilters;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Parameters shared by every transformer of one snapshot run.
pub type Parameters = Map<String, Value>;

/// How each resulting stub is rendered in the snapshot result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The whole stub mapping
    #[default]
    Full,
    /// `{"id": ...}` only
    Ids,
}

/// What happens to stubs whose request patterns are equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatPolicy {
    /// Keep the first in capture order
    Skip,
    /// Chain all of them into a scenario, in capture order
    Scenarios,
}

/// How one captured request header is matched by the generated pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureHeader {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub case_insensitive: bool,
}

/// `captureHeaders` is either a list of names or a map of name -> options.
fn deserialize_capture_headers<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, CaptureHeader>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Names(Vec<String>),
        Map(BTreeMap<String, CaptureHeader>),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None => BTreeMap::new(),
        Some(Raw::Names(names)) => names
            .into_iter()
            .map(|n| (n, CaptureHeader::default()))
            .collect(),
        Some(Raw::Map(map)) => map,
    })
}

fn default_persist() -> bool {
    true
}

/// Input of one snapshot invocation. Every field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<ServeEventFilters>,
    #[serde(
        default,
        deserialize_with = "deserialize_capture_headers",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub capture_headers: BTreeMap<String, CaptureHeader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_body_criteria: Option<BodyExtractCriteria>,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default = "default_persist")]
    pub persist: bool,
    #[serde(default)]
    pub repeats_as_scenarios: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transformers: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub transformer_parameters: Parameters,
}

impl Default for SnapshotSpec {
    fn default() -> Self {
        Self {
            filters: None,
            capture_headers: BTreeMap::new(),
            extract_body_criteria: None,
            output_format: OutputFormat::Full,
            persist: default_persist(),
            repeats_as_scenarios: false,
            transformers: Vec::new(),
            transformer_parameters: Parameters::new(),
        }
    }
}

impl SnapshotSpec {
    pub fn repeat_policy(&self) -> RepeatPolicy {
        if self.repeats_as_scenarios {
            RepeatPolicy::Scenarios
        } else {
            RepeatPolicy::Skip
        }
    }
}
