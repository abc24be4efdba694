//! Body extraction: moving large response bodies out of stubs into files.

use crate::stub::StubMapping;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Sub-directory of the files root holding extracted bodies.
pub const FILES_DIR: &str = "__files";

/// A size in bytes, written either as a number or as a string with a unit
/// (`B`, `KB`, `MB`, `GB`; 1024-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn parse(text: &str) -> Result<Self, String> {
        let text = text.trim();
        let split = text
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(text.len());
        let (number, unit) = text.split_at(split);
        let number: f64 = number
            .parse()
            .map_err(|_| format!("invalid size '{text}'"))?;
        let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
            "" | "B" => 1,
            "KB" => 1024,
            "MB" => 1024 * 1024,
            "GB" => 1024 * 1024 * 1024,
            other => return Err(format!("unknown size unit '{other}' in '{text}'")),
        };
        Ok(ByteSize((number * multiplier as f64) as u64))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} B", self.0)
    }
}

impl Serialize for ByteSize {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Number(n) => n
                .as_u64()
                .map(ByteSize)
                .ok_or_else(|| D::Error::custom("size must be a non-negative integer")),
            serde_json::Value::String(s) => ByteSize::parse(&s).map_err(D::Error::custom),
            _ => Err(D::Error::custom("size must be a number or a string")),
        }
    }
}

/// When a response body is moved out of its stub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyExtractCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_size_threshold: Option<ByteSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_size_threshold: Option<ByteSize>,
}

impl BodyExtractCriteria {
    /// A body matches when it is larger than the threshold of its kind.
    /// A missing threshold never matches.
    pub fn matches(&self, stub: &StubMapping) -> bool {
        let response = &stub.response;
        if let Some(body) = &response.body {
            return self
                .text_size_threshold
                .is_some_and(|t| body.len() as u64 > t.0);
        }
        if response.base64_body.is_some() {
            let size = response.inline_body().len() as u64;
            return self.binary_size_threshold.is_some_and(|t| size > t.0);
        }
        false
    }
}

/// Auxiliary storage for extracted bodies.
pub trait BodyFileStore: Send + Sync {
    fn write(&self, file_name: &str, contents: &[u8]) -> Result<(), std::io::Error>;
}

/// Writes bodies to `<files_root>/__files`.
#[derive(Debug, Clone)]
pub struct DirectoryBodyFileStore {
    dir: PathBuf,
}

impl DirectoryBodyFileStore {
    pub fn new(files_root: &Path) -> Self {
        Self {
            dir: files_root.join(FILES_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl BodyFileStore for DirectoryBodyFileStore {
    fn write(&self, file_name: &str, contents: &[u8]) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(file_name), contents)
    }
}

/// What happened to one stub's body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// No criteria were configured
    Disabled,
    /// Criteria were configured but the body did not meet them
    Unmatched,
    Extracted { file_name: String },
}

fn file_extension(content_type: Option<&str>) -> &'static str {
    let media_type = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();
    if media_type.ends_with("json") {
        "json"
    } else if media_type.ends_with("xml") {
        "xml"
    } else if media_type == "text/html" {
        "html"
    } else if media_type.starts_with("text/") {
        "txt"
    } else {
        "bin"
    }
}

/// Stub names may come from custom transformers; keep only characters that
/// cannot leave the files directory.
fn file_stem(name: Option<&str>) -> String {
    let stem: String = name
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.trim_matches('_').is_empty() {
        "body".to_string()
    } else {
        stem
    }
}

/// Extract the body of `stub` when `criteria` says so.
///
/// On extraction the body is written through `store` and the stub's response
/// references the file instead; every other field is left as it was.
pub fn extract_body(
    stub: StubMapping,
    criteria: Option<&BodyExtractCriteria>,
    store: &dyn BodyFileStore,
) -> Result<(StubMapping, ExtractionOutcome), std::io::Error> {
    let Some(criteria) = criteria else {
        return Ok((stub, ExtractionOutcome::Disabled));
    };
    if !criteria.matches(&stub) {
        return Ok((stub, ExtractionOutcome::Unmatched));
    }

    let mut stub = stub;
    let file_name = format!(
        "{}-{}.{}",
        file_stem(stub.name.as_deref()),
        stub.id,
        file_extension(stub.response.content_type())
    );
    store.write(&file_name, &stub.response.inline_body())?;
    debug!("Extracted body of stub {} to {}", stub.id, file_name);

    stub.response.body = None;
    stub.response.base64_body = None;
    stub.response.body_file_name = Some(file_name.clone());
    Ok((stub, ExtractionOutcome::Extracted { file_name }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::RequestPattern;
    use crate::stub::ResponseDefinition;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct MemoryStore {
        files: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl BodyFileStore for MemoryStore {
        fn write(&self, file_name: &str, contents: &[u8]) -> Result<(), std::io::Error> {
            self.files.lock().push((file_name.to_string(), contents.to_vec()));
            Ok(())
        }
    }

    struct FailingStore;

    impl BodyFileStore for FailingStore {
        fn write(&self, _: &str, _: &[u8]) -> Result<(), std::io::Error> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    fn stub(response: ResponseDefinition) -> StubMapping {
        StubMapping::new(RequestPattern::new("GET", "/report"), response).with_name("report")
    }

    fn text_criteria(threshold: u64) -> BodyExtractCriteria {
        BodyExtractCriteria {
            text_size_threshold: Some(ByteSize(threshold)),
            binary_size_threshold: None,
        }
    }

    #[test]
    fn test_parse_sizes() {
        assert_eq!(ByteSize::parse("512").unwrap(), ByteSize(512));
        assert_eq!(ByteSize::parse("10 B").unwrap(), ByteSize(10));
        assert_eq!(ByteSize::parse("2KB").unwrap(), ByteSize(2048));
        assert_eq!(ByteSize::parse("1.5 kb").unwrap(), ByteSize(1536));
        assert_eq!(ByteSize::parse("1 MB").unwrap(), ByteSize(1024 * 1024));
        assert_eq!(ByteSize::parse("1GB").unwrap(), ByteSize(1024 * 1024 * 1024));
        assert!(ByteSize::parse("12 parsecs").is_err());
        assert!(ByteSize::parse("KB").is_err());
    }

    #[test]
    fn test_deserialize_sizes() {
        let c: BodyExtractCriteria = serde_json::from_value(serde_json::json!({
            "textSizeThreshold": 100,
            "binarySizeThreshold": "1 KB"
        }))
        .unwrap();
        assert_eq!(c.text_size_threshold, Some(ByteSize(100)));
        assert_eq!(c.binary_size_threshold, Some(ByteSize(1024)));
    }

    #[test]
    fn test_no_criteria_is_disabled() {
        let s = stub(ResponseDefinition::new(200).with_body("x".repeat(100)));
        let (out, outcome) = extract_body(s.clone(), None, &MemoryStore::default()).unwrap();
        assert_eq!(outcome, ExtractionOutcome::Disabled);
        assert_eq!(out, s);
    }

    #[test]
    fn test_small_body_is_unmatched() {
        let s = stub(ResponseDefinition::new(200).with_body("tiny"));
        let store = MemoryStore::default();
        let (out, outcome) = extract_body(s.clone(), Some(&text_criteria(10)), &store).unwrap();
        assert_eq!(outcome, ExtractionOutcome::Unmatched);
        assert_eq!(out, s);
        assert!(store.files.lock().is_empty());
    }

    #[test]
    fn test_missing_threshold_never_matches() {
        let s = stub(ResponseDefinition::new(200).with_binary_body(&[0u8; 64]));
        let (_, outcome) =
            extract_body(s, Some(&text_criteria(1)), &MemoryStore::default()).unwrap();
        assert_eq!(outcome, ExtractionOutcome::Unmatched);
    }

    #[test]
    fn test_large_text_body_is_extracted() {
        let body = "{\"rows\":[1,2,3,4,5,6,7,8,9]}";
        let s = stub(
            ResponseDefinition::new(200)
                .with_header("Content-Type", "application/json")
                .with_body(body),
        );
        let id = s.id;
        let store = MemoryStore::default();
        let (out, outcome) = extract_body(s, Some(&text_criteria(8)), &store).unwrap();

        let expected_name = format!("report-{id}.json");
        assert_eq!(
            outcome,
            ExtractionOutcome::Extracted {
                file_name: expected_name.clone()
            }
        );
        assert_eq!(out.response.body, None);
        assert_eq!(out.response.body_file_name.as_deref(), Some(expected_name.as_str()));
        assert_eq!(out.response.header("content-type"), Some("application/json"));
        assert_eq!(out.id, id);
        assert_eq!(store.files.lock()[0], (expected_name, body.as_bytes().to_vec()));
    }

    #[test]
    fn test_binary_body_written_decoded() {
        let s = stub(
            ResponseDefinition::new(200)
                .with_header("Content-Type", "image/png")
                .with_binary_body(&[1, 2, 3, 4]),
        );
        let criteria = BodyExtractCriteria {
            text_size_threshold: None,
            binary_size_threshold: Some(ByteSize(2)),
        };
        let dir = TempDir::new().unwrap();
        let store = DirectoryBodyFileStore::new(dir.path());
        let (out, outcome) = extract_body(s, Some(&criteria), &store).unwrap();

        let ExtractionOutcome::Extracted { file_name } = outcome else {
            panic!("expected extraction");
        };
        assert!(file_name.ends_with(".bin"));
        assert!(out.response.base64_body.is_none());
        assert_eq!(fs::read(store.dir().join(&file_name)).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_storage_failure_is_reported() {
        let s = stub(ResponseDefinition::new(200).with_body("x".repeat(100)));
        let err = extract_body(s, Some(&text_criteria(1)), &FailingStore).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_unsafe_stub_name_stays_inside_files_dir() {
        let dir = TempDir::new().unwrap();
        let store = DirectoryBodyFileStore::new(dir.path());
        let s = stub(ResponseDefinition::new(200).with_body("x".repeat(100))).with_name("../../x");
        let id = s.id;
        let (out, outcome) = extract_body(s, Some(&text_criteria(1)), &store).unwrap();

        let expected_name = format!("______x-{id}.bin");
        assert_eq!(
            outcome,
            ExtractionOutcome::Extracted {
                file_name: expected_name.clone()
            }
        );
        assert_eq!(out.response.body_file_name.as_deref(), Some(expected_name.as_str()));
        assert!(store.dir().join(&expected_name).is_file());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Some("api_users-list")), "api_users-list");
        assert_eq!(file_stem(Some("a/b\\c")), "a_b_c");
        assert_eq!(file_stem(Some("..")), "body");
        assert_eq!(file_stem(None), "body");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension(Some("application/json; charset=utf-8")), "json");
        assert_eq!(file_extension(Some("application/vnd.api+json")), "json");
        assert_eq!(file_extension(Some("text/xml")), "xml");
        assert_eq!(file_extension(Some("text/html")), "html");
        assert_eq!(file_extension(Some("text/csv")), "txt");
        assert_eq!(file_extension(None), "bin");
    }
}
