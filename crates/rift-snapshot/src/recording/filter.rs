//! Exchange filter.
//!
//! A filter is the conjunction of a proxied-only predicate with any number of
//! caller predicates. Filtering keeps the order of the source log.

use super::types::ServeEvent;
use crate::predicate::{CompiledRegex, PatternError, StringValuePattern};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A test over one captured exchange.
pub trait ServeEventPredicate: Send + Sync {
    fn test(&self, event: &ServeEvent) -> bool;
}

impl<F> ServeEventPredicate for F
where
    F: Fn(&ServeEvent) -> bool + Send + Sync,
{
    fn test(&self, event: &ServeEvent) -> bool {
        self(event)
    }
}

/// Serialized exchange filters of a snapshot request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServeEventFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Regex that must fully match the request url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, StringValuePattern>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<DateTime<Utc>>,
}

/// Conjunctive set of exchange predicates, always starting with proxied-only.
pub struct ExchangeFilter {
    predicates: Vec<Arc<dyn ServeEventPredicate>>,
}

impl fmt::Debug for ExchangeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeFilter")
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

impl Default for ExchangeFilter {
    fn default() -> Self {
        Self::proxied_only()
    }
}

impl ExchangeFilter {
    pub fn proxied_only() -> Self {
        let proxied: Arc<dyn ServeEventPredicate> =
            Arc::new(|event: &ServeEvent| event.was_proxied());
        Self {
            predicates: vec![proxied],
        }
    }

    /// Add one caller predicate.
    pub fn and(mut self, predicate: impl ServeEventPredicate + 'static) -> Self {
        self.predicates.push(Arc::new(predicate));
        self
    }

    /// Build the filter for a snapshot request. `None` means proxied-only.
    pub fn from_filters(filters: Option<&ServeEventFilters>) -> Result<Self, PatternError> {
        let mut filter = Self::proxied_only();
        let Some(filters) = filters else {
            return Ok(filter);
        };

        if let Some(method) = filters.method.clone() {
            filter =
                filter.and(move |e: &ServeEvent| e.request.method.eq_ignore_ascii_case(&method));
        }
        if let Some(pattern) = &filters.url_pattern {
            let regex = CompiledRegex::compile(pattern)
                .map_err(|e| PatternError::invalid_regex("urlPattern", pattern, e))?;
            filter = filter.and(move |e: &ServeEvent| regex.is_full_match(&e.request.url));
        }
        if !filters.headers.is_empty() {
            let headers = filters.headers.clone();
            filter = filter.and(move |e: &ServeEvent| {
                headers.iter().all(|(name, pattern)| {
                    pattern
                        .match_value(e.request.header(name))
                        .is_exact_match()
                })
            });
        }
        if !filters.ids.is_empty() {
            let ids = filters.ids.clone();
            filter = filter.and(move |e: &ServeEvent| ids.contains(&e.id));
        }
        if let Some(since) = filters.since {
            filter = filter.and(move |e: &ServeEvent| e.logged_date >= since);
        }
        if let Some(before) = filters.before {
            filter = filter.and(move |e: &ServeEvent| e.logged_date < before);
        }
        Ok(filter)
    }

    pub fn accepts(&self, event: &ServeEvent) -> bool {
        self.predicates.iter().all(|p| p.test(event))
    }

    pub fn apply(&self, events: Vec<Arc<ServeEvent>>) -> Vec<Arc<ServeEvent>> {
        events.into_iter().filter(|e| self.accepts(e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{LoggedRequest, LoggedResponse};
    use chrono::TimeZone;
    use serde_json::json;

    fn proxied(method: &str, url: &str) -> Arc<ServeEvent> {
        Arc::new(ServeEvent::new(
            LoggedRequest::new(method, url),
            LoggedResponse::from_proxy(200),
        ))
    }

    fn local(method: &str, url: &str) -> Arc<ServeEvent> {
        Arc::new(ServeEvent::new(
            LoggedRequest::new(method, url),
            LoggedResponse::new(200),
        ))
    }

    #[test]
    fn test_absent_filters_keep_proxied_only() {
        let events = vec![proxied("GET", "/a"), local("GET", "/b"), proxied("GET", "/c")];
        let kept = ExchangeFilter::from_filters(None).unwrap().apply(events);
        let urls: Vec<_> = kept.iter().map(|e| e.request.url.as_str()).collect();
        assert_eq!(urls, vec!["/a", "/c"]);
    }

    #[test]
    fn test_non_proxied_excluded_even_when_caller_accepts() {
        let filter = ExchangeFilter::proxied_only().and(|_: &ServeEvent| true);
        assert!(!filter.accepts(&local("GET", "/a")));
        assert!(filter.accepts(&proxied("GET", "/a")));
    }

    #[test]
    fn test_method_and_url_pattern_are_conjunctive() {
        let filters: ServeEventFilters =
            serde_json::from_value(json!({"method": "get", "urlPattern": "/api/.*"})).unwrap();
        let filter = ExchangeFilter::from_filters(Some(&filters)).unwrap();
        assert!(filter.accepts(&proxied("GET", "/api/users")));
        assert!(!filter.accepts(&proxied("POST", "/api/users")));
        assert!(!filter.accepts(&proxied("GET", "/health")));
    }

    #[test]
    fn test_invalid_url_pattern() {
        let filters = ServeEventFilters {
            url_pattern: Some("(".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            ExchangeFilter::from_filters(Some(&filters)),
            Err(PatternError::InvalidRegex {
                kind: "urlPattern",
                ..
            })
        ));
    }

    #[test]
    fn test_header_filter() {
        let filters: ServeEventFilters =
            serde_json::from_value(json!({"headers": {"X-Tenant": {"equalTo": "acme"}}})).unwrap();
        let filter = ExchangeFilter::from_filters(Some(&filters)).unwrap();

        let acme = Arc::new(ServeEvent::new(
            LoggedRequest::new("GET", "/a").with_header("x-tenant", "acme"),
            LoggedResponse::from_proxy(200),
        ));
        assert!(filter.accepts(&acme));
        assert!(!filter.accepts(&proxied("GET", "/a")));
    }

    #[test]
    fn test_ids_filter() {
        let keep = proxied("GET", "/a");
        let drop = proxied("GET", "/b");
        let filters = ServeEventFilters {
            ids: vec![keep.id],
            ..Default::default()
        };
        let kept = ExchangeFilter::from_filters(Some(&filters))
            .unwrap()
            .apply(vec![keep.clone(), drop]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, keep.id);
    }

    #[test]
    fn test_time_window() {
        let at = |h| {
            Arc::new(
                ServeEvent::new(LoggedRequest::new("GET", "/a"), LoggedResponse::from_proxy(200))
                    .at(Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()),
            )
        };
        let filters: ServeEventFilters = serde_json::from_value(json!({
            "since": "2024-01-01T10:00:00Z",
            "before": "2024-01-01T12:00:00Z"
        }))
        .unwrap();
        let filter = ExchangeFilter::from_filters(Some(&filters)).unwrap();
        assert!(!filter.accepts(&at(9)));
        assert!(filter.accepts(&at(10)));
        assert!(filter.accepts(&at(11)));
        assert!(!filter.accepts(&at(12)));
    }
}
