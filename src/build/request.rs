//! Bundle request parsing and validation.
//!
//! Checks run in a fixed order (email, company, modules, version) and the
//! first failure wins, so a client always sees a single, specific message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Fields picked out of the JSON body of `POST /download`.  A field that is
/// absent or of the wrong type is `None` and fails its own check later.
#[derive(Debug, Default)]
pub struct BuildRequestBody {
    pub email: Option<String>,
    pub company: Option<String>,
    pub modules: Option<Vec<String>>,
    pub version: Option<String>,
}

/// A request that passed validation: all fields present, at least one
/// module, and a semantic version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub email: String,
    pub company: String,
    pub modules: Vec<String>,
    pub version: String,
}

/// Why a bundle request was rejected.  Rendered as `400 {"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("malformed request body")]
    MalformedBody,
    #[error("missing email")]
    MissingEmail,
    #[error("missing company")]
    MissingCompany,
    #[error("missing module list")]
    MissingModules,
    #[error("not valid version")]
    InvalidVersion,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Whether `version` is a semantic version string (`MAJOR.MINOR.PATCH` with
/// optional pre-release and build metadata).
pub fn is_valid_version(version: &str) -> bool {
    semver::Version::parse(version).is_ok()
}

/// Decode a raw request body.  An empty body counts as an empty object;
/// anything else must be a JSON object.
pub fn parse_body(body: &[u8]) -> Result<BuildRequestBody, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(BuildRequestBody::default());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(BuildRequestBody::from_fields(&fields)),
        _ => Err(ValidationError::MalformedBody),
    }
}

impl BuildRequestBody {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        Self {
            email: string_field(fields, "email"),
            company: string_field(fields, "company"),
            modules: fields.get("modules").and_then(string_list),
            version: string_field(fields, "version"),
        }
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key)?.as_str().map(str::to_owned)
}

/// An array of strings; any other element type disqualifies the whole list.
fn string_list(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|item| item.as_str().map(str::to_owned))
        .collect()
}

/// Validate a decoded body, short-circuiting on the first failed check.
pub fn validate(body: BuildRequestBody) -> Result<BuildRequest, ValidationError> {
    let email = non_empty(body.email).ok_or(ValidationError::MissingEmail)?;
    let company = non_empty(body.company).ok_or(ValidationError::MissingCompany)?;
    let modules = body
        .modules
        .filter(|m| !m.is_empty())
        .ok_or(ValidationError::MissingModules)?;
    let version = body
        .version
        .filter(|v| is_valid_version(v))
        .ok_or(ValidationError::InvalidVersion)?;

    Ok(BuildRequest {
        email,
        company,
        modules,
        version,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(email: &str, company: &str, modules: &[&str], version: &str) -> BuildRequestBody {
        BuildRequestBody {
            email: Some(email.to_string()),
            company: Some(company.to_string()),
            modules: Some(modules.iter().map(|m| m.to_string()).collect()),
            version: Some(version.to_string()),
        }
    }

    #[test]
    fn accepts_complete_request() {
        let req = validate(body("a@b.com", "Acme", &["appnexusBidAdapter"], "1.2.3")).unwrap();
        assert_eq!(req.email, "a@b.com");
        assert_eq!(req.modules, vec!["appnexusBidAdapter"]);
        assert_eq!(req.version, "1.2.3");
    }

    #[test]
    fn missing_email_is_reported_first() {
        let err = validate(BuildRequestBody::default()).unwrap_err();
        assert_eq!(err, ValidationError::MissingEmail);
        assert_eq!(err.to_string(), "missing email");
    }

    #[test]
    fn empty_email_counts_as_missing() {
        let err = validate(body("", "Acme", &["a"], "1.2.3")).unwrap_err();
        assert_eq!(err, ValidationError::MissingEmail);
    }

    #[test]
    fn missing_company() {
        let err = validate(body("a@b.com", "", &["a"], "1.2.3")).unwrap_err();
        assert_eq!(err.to_string(), "missing company");
    }

    #[test]
    fn empty_module_list() {
        let err = validate(body("a@b.com", "Acme", &[], "1.2.3")).unwrap_err();
        assert_eq!(err.to_string(), "missing module list");
    }

    #[test]
    fn absent_module_list() {
        let mut b = body("a@b.com", "Acme", &["a"], "1.2.3");
        b.modules = None;
        assert_eq!(validate(b).unwrap_err(), ValidationError::MissingModules);
    }

    #[test]
    fn module_check_runs_before_version_check() {
        let err = validate(body("a@b.com", "Acme", &[], "banana")).unwrap_err();
        assert_eq!(err, ValidationError::MissingModules);
    }

    #[test]
    fn bad_version() {
        let err = validate(body("a@b.com", "Acme", &["a"], "1.2")).unwrap_err();
        assert_eq!(err.to_string(), "not valid version");
    }

    #[test]
    fn version_syntax() {
        assert!(is_valid_version("0.34.1"));
        assert!(is_valid_version("1.0.0-pre.1"));
        assert!(is_valid_version("2.1.0+build.7"));
        assert!(!is_valid_version(""));
        assert!(!is_valid_version("1.2"));
        assert!(!is_valid_version("latest"));
        assert!(!is_valid_version("../1.2.3"));
        assert!(!is_valid_version("1.2.3/../../etc"));
    }

    #[test]
    fn parse_body_treats_empty_as_object() {
        let parsed = parse_body(b"").unwrap();
        assert!(parsed.email.is_none());
        let parsed = parse_body(b"  \n").unwrap();
        assert!(parsed.modules.is_none());
    }

    #[test]
    fn parse_body_rejects_non_objects() {
        for raw in [&b"{not json"[..], &b"[1, 2]"[..], &b"\"text\""[..], &b"null"[..]] {
            assert_eq!(parse_body(raw).unwrap_err(), ValidationError::MalformedBody);
        }
    }

    #[test]
    fn wrongly_typed_fields_fail_their_own_check() {
        fn check(raw: &[u8]) -> ValidationError {
            validate(parse_body(raw).unwrap()).unwrap_err()
        }

        assert_eq!(
            check(br#"{"company": "Co", "modules": ["a"], "version": 123}"#),
            ValidationError::MissingEmail
        );
        assert_eq!(
            check(br#"{"email": "a@b.c", "company": 7, "modules": ["a"], "version": "1.2.3"}"#),
            ValidationError::MissingCompany
        );
        assert_eq!(
            check(br#"{"email": "a@b.c", "company": "Co", "modules": "a", "version": "1.2.3"}"#),
            ValidationError::MissingModules
        );
        assert_eq!(
            check(br#"{"email": "a@b.c", "company": "Co", "modules": ["a", 1], "version": "1.2.3"}"#),
            ValidationError::MissingModules
        );
        assert_eq!(
            check(br#"{"email": "a@b.c", "company": "Co", "modules": ["a"], "version": 1}"#),
            ValidationError::InvalidVersion
        );
        assert_eq!(
            check(br#"{"email": null, "company": "Co", "modules": ["a"], "version": "1.2.3"}"#),
            ValidationError::MissingEmail
        );
    }

    #[test]
    fn parse_body_ignores_unknown_fields() {
        let parsed =
            parse_body(br#"{"email": "a@b.com", "company": "Acme", "extra": true}"#).unwrap();
        assert_eq!(parsed.email.as_deref(), Some("a@b.com"));
        assert!(parsed.version.is_none());
    }
}
