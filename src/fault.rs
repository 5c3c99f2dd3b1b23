// src/fault.rs
// The in-memory representation of one captured failure

use crate::error::{FaultError, Result};
use crate::fingerprint::fingerprint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use uuid::Uuid;

/// HTTP context captured alongside a fault, when the caller has one.
///
/// Extracting these from a live request is the caller's job; the store only
/// persists them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    pub host: String,
    pub url: String,
    pub http_method: String,
    pub ip_address: Option<String>,
    /// Defaults to 500 when the caller doesn't know better.
    pub status_code: Option<u16>,
}

/// Decomposed fields for manually reported errors (no live error value).
pub struct FaultParams<'a> {
    pub application_name: &'a str,
    pub machine_name: &'a str,
    pub error_type: &'a str,
    pub source: &'a str,
    pub message: &'a str,
    pub detail: &'a str,
    pub rollup_per_server: bool,
    pub context: Option<RequestContext>,
}

/// A logical application error (as opposed to the live error value it may
/// have been built from).
///
/// Created transiently per incoming failure. The store either merges it into
/// an existing durable record (its `guid` is then replaced by the matched
/// record's and `is_duplicate` set) or inserts it as a new row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fault {
    /// Unique identifier, generated at construction on the reporting server.
    pub guid: Uuid,
    pub application_name: String,
    pub machine_name: String,
    pub error_type: String,
    pub source: String,
    pub message: String,
    /// Full rendering of the error, including the nested-cause chain.
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// UTC time the fault was constructed.
    pub created_at: DateTime<Utc>,
    /// Rollup fingerprint; `None` when the detail text was empty.
    pub error_hash: Option<i64>,
    /// How many reports this record represents. Starts at 1.
    pub duplicate_count: i64,
    /// Set by the store when this instance merged into a pre-existing record.
    #[serde(default)]
    pub is_duplicate: bool,
    /// Marks the stored record as exempt from deletion.
    #[serde(default)]
    pub is_protected: bool,
    /// JSON snapshot of the record, populated on first insert only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_json: Option<String>,
}

impl Fault {
    /// Build a fault from a live error value.
    ///
    /// Unwraps to the root cause for the message, renders the whole cause
    /// chain as detail, and stamps creation time and fingerprint. No I/O.
    pub fn from_error<E>(
        err: &E,
        application_name: &str,
        machine_name: &str,
        rollup_per_server: bool,
        context: Option<RequestContext>,
    ) -> Fault
    where
        E: std::error::Error,
    {
        let error_type = std::any::type_name::<E>().to_string();
        let source = module_of(&error_type).to_string();
        let message = root_cause(err).to_string();
        let detail = render_chain(err);

        Self::build(
            application_name,
            machine_name,
            error_type,
            source,
            message,
            detail,
            rollup_per_server,
            context,
        )
    }

    /// Build a fault from already-decomposed fields.
    ///
    /// Used when no live error value exists, e.g. manually reported errors.
    /// Rejects input where type, message, and detail are all empty — there is
    /// nothing to record.
    pub fn from_parts(params: FaultParams<'_>) -> Result<Fault> {
        if params.error_type.is_empty() && params.message.is_empty() && params.detail.is_empty() {
            return Err(FaultError::InvalidInput(
                "fault has no type, message, or detail".to_string(),
            ));
        }

        Ok(Self::build(
            params.application_name,
            params.machine_name,
            params.error_type.to_string(),
            params.source.to_string(),
            params.message.to_string(),
            params.detail.to_string(),
            params.rollup_per_server,
            params.context,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        application_name: &str,
        machine_name: &str,
        error_type: String,
        source: String,
        message: String,
        detail: String,
        rollup_per_server: bool,
        context: Option<RequestContext>,
    ) -> Fault {
        let error_hash = fingerprint(&detail, machine_name, rollup_per_server);

        let mut fault = Fault {
            guid: Uuid::new_v4(),
            application_name: application_name.to_string(),
            machine_name: machine_name.to_string(),
            error_type,
            source,
            message,
            detail,
            host: None,
            url: None,
            http_method: None,
            ip_address: None,
            status_code: None,
            created_at: Utc::now(),
            error_hash,
            duplicate_count: 1,
            is_duplicate: false,
            is_protected: false,
            full_json: None,
        };

        if let Some(ctx) = context {
            fault.host = Some(ctx.host);
            fault.url = Some(ctx.url);
            fault.http_method = Some(ctx.http_method);
            fault.ip_address = ctx.ip_address;
            fault.status_code = Some(ctx.status_code.unwrap_or(500));
        }

        fault
    }
}

/// Walk the cause chain to its root.
fn root_cause<'a>(err: &'a (dyn std::error::Error + 'a)) -> &'a (dyn std::error::Error + 'a) {
    let mut current = err;
    while let Some(cause) = current.source() {
        current = cause;
    }
    current
}

/// Render an error and its nested causes, one cause per line.
fn render_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        current = cause.source();
    }
    out
}

/// Module path portion of a fully-qualified type name, or the name itself.
fn module_of(type_name: &str) -> &str {
    match type_name.rfind("::") {
        Some(idx) => &type_name[..idx],
        None => type_name,
    }
}

/// Force a string down to `max_chars` characters.
///
/// Truncation is lossy by design for bounded storage columns; it never fails.
pub(crate) fn truncate(s: &str, max_chars: usize) -> Cow<'_, str> {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => Cow::Owned(s[..idx].to_string()),
        None => Cow::Borrowed(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer failure")]
    struct Outer {
        #[source]
        inner: Inner,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("inner failure: {0}")]
    struct Inner(String);

    #[test]
    fn test_from_error_renders_cause_chain() {
        let err = Outer {
            inner: Inner("disk full".to_string()),
        };
        let fault = Fault::from_error(&err, "svc1", "web01", false, None);

        assert_eq!(fault.detail, "outer failure\ncaused by: inner failure: disk full");
        assert_eq!(fault.message, "inner failure: disk full", "message comes from the root cause");
        assert!(fault.error_type.ends_with("Outer"));
        assert_eq!(fault.duplicate_count, 1);
        assert!(!fault.is_duplicate);
        assert!(fault.error_hash.is_some());
    }

    #[test]
    fn test_from_error_identical_errors_share_fingerprint() {
        let a = Fault::from_error(&Inner("x".into()), "svc1", "web01", false, None);
        let b = Fault::from_error(&Inner("x".into()), "svc1", "web01", false, None);
        assert_eq!(a.error_hash, b.error_hash);
        assert_ne!(a.guid, b.guid, "each fault gets its own guid");
    }

    #[test]
    fn test_from_error_with_context() {
        let ctx = RequestContext {
            host: "api.example.com".to_string(),
            url: "/orders/42".to_string(),
            http_method: "POST".to_string(),
            ip_address: Some("10.0.0.9".to_string()),
            status_code: None,
        };
        let fault = Fault::from_error(&Inner("x".into()), "svc1", "web01", false, Some(ctx));

        assert_eq!(fault.host.as_deref(), Some("api.example.com"));
        assert_eq!(fault.url.as_deref(), Some("/orders/42"));
        assert_eq!(fault.http_method.as_deref(), Some("POST"));
        assert_eq!(fault.ip_address.as_deref(), Some("10.0.0.9"));
        assert_eq!(fault.status_code, Some(500), "status defaults to 500");
    }

    #[test]
    fn test_from_error_without_context_leaves_fields_unset() {
        let fault = Fault::from_error(&Inner("x".into()), "svc1", "web01", false, None);
        assert!(fault.host.is_none());
        assert!(fault.url.is_none());
        assert!(fault.http_method.is_none());
        assert!(fault.status_code.is_none());
    }

    #[test]
    fn test_from_parts() {
        let fault = Fault::from_parts(FaultParams {
            application_name: "svc1",
            machine_name: "web01",
            error_type: "TimeoutError",
            source: "billing",
            message: "upstream timed out",
            detail: "TimeoutError: upstream timed out after 30s",
            rollup_per_server: true,
            context: None,
        })
        .unwrap();

        assert_eq!(fault.error_type, "TimeoutError");
        assert_eq!(fault.source, "billing");
        assert!(fault.error_hash.is_some());
    }

    #[test]
    fn test_from_parts_rejects_empty_fault() {
        let result = Fault::from_parts(FaultParams {
            application_name: "svc1",
            machine_name: "web01",
            error_type: "",
            source: "",
            message: "",
            detail: "",
            rollup_per_server: false,
            context: None,
        });
        assert!(matches!(result, Err(FaultError::InvalidInput(_))));
    }

    #[test]
    fn test_from_parts_empty_detail_has_no_fingerprint() {
        let fault = Fault::from_parts(FaultParams {
            application_name: "svc1",
            machine_name: "web01",
            error_type: "Oops",
            source: "",
            message: "no trace available",
            detail: "",
            rollup_per_server: false,
            context: None,
        })
        .unwrap();
        assert_eq!(fault.error_hash, None);
    }

    #[test]
    fn test_per_server_fingerprint_uses_machine() {
        let mk = |machine: &str| {
            Fault::from_parts(FaultParams {
                application_name: "svc1",
                machine_name: machine,
                error_type: "E",
                source: "",
                message: "m",
                detail: "same detail",
                rollup_per_server: true,
                context: None,
            })
            .unwrap()
        };
        assert_ne!(mk("hostA").error_hash, mk("hostB").error_hash);
    }

    #[test]
    fn test_serialization_roundtrip_keeps_identity() {
        let fault = Fault::from_error(&Inner("x".into()), "svc1", "web01", false, None);
        let json = serde_json::to_string(&fault).unwrap();
        let back: Fault = serde_json::from_str(&json).unwrap();
        assert_eq!(back.guid, fault.guid);
        assert_eq!(back.error_hash, fault.error_hash);
        assert_eq!(back.detail, fault.detail);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello", 5), "hello");
        assert_eq!(truncate("hello", 3), "hel");
        assert_eq!(truncate("", 3), "");
        // counts characters, not bytes
        assert_eq!(truncate("ééééé", 3), "ééé");
    }

    #[test]
    fn test_truncate_long_message() {
        let long = "x".repeat(1500);
        assert_eq!(truncate(&long, 1000).chars().count(), 1000);
    }
}
