//! WireMock-style match predicates.
//!
//! Patterns test a single string value and produce a graded `MatchResult`.
//! They are immutable after construction (regexes are compiled eagerly), so a
//! pattern can be shared across request-handling threads without locking.
//!
//! # Module Structure
//!
//! - `matcher` - `MatchResult`, `CachedValue`, `CompiledRegex`
//! - `string_matcher` - the `StringValuePattern` kinds
//! - `form_data` - form-encoded body decoding and `matchesFormData`
//! - `codec` - discriminant-keyed serialized form of patterns
//! - `request` - `RequestPattern` over method, url, headers and body
//! - `error` - `PatternError`

mod codec;
mod error;
mod form_data;
mod matcher;
mod request;
mod string_matcher;

pub use codec::{decode, encode, lookup, PatternKind, PATTERN_KINDS};
pub use error::PatternError;
pub use form_data::{decode_form_data, FormDataPattern, MATCHES_FORM_DATA};
pub use matcher::{string_distance, CachedValue, CompiledRegex, MatchResult};
pub use request::{RequestPattern, ANY_METHOD};
pub use string_matcher::{
    JsonValuePattern, StringValuePattern, ABSENT, CONTAINS, DOES_NOT_MATCH, EQUAL_TO,
    EQUAL_TO_JSON, MATCHES,
};
