use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::projects::ProjectCredentialRegistry;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    // query flow: the project id from the route is not registered; answered
    // 404 no matter what credentials came with the request
    #[error("unknown project")]
    InvalidProject,
    // query flow: registered project, key not in its public set
    #[error("invalid public key")]
    InvalidKey,
    #[error("missing auth header")]
    MissingAuthHeader,
    #[error("auth header lacks sentry_key or sentry_secret")]
    MalformedAuthHeader,
    // header flow: the key/secret pair matches no project. Deliberately a
    // 404 rather than the query flow's 403, preserved for compatibility.
    #[error("credentials match no project")]
    UnknownCredentials,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidKey => (StatusCode::FORBIDDEN, "INVALID KEY").into_response(),
            Self::InvalidProject
            | Self::MissingAuthHeader
            | Self::MalformedAuthHeader
            | Self::UnknownCredentials => StatusCode::NOT_FOUND.into_response(),
        }
    }
}

// Structured form of the X-Sentry-Auth header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaderCredentials {
    pub key: String,
    pub secret: String,
}

// Parse a comma-separated field=value list, e.g.
// "Sentry sentry_version=7, sentry_key=abc, sentry_secret=xyz,".
// Trailing separators and unknown fields are skipped; both credential
// fields must be present and non-empty.
pub fn parse_auth_header(value: &str) -> Option<AuthHeaderCredentials> {
    let value = value.strip_prefix("Sentry ").unwrap_or(value);

    let mut key = None;
    let mut secret = None;

    for field in value.split(',') {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        let Some((name, field_value)) = field.split_once('=') else {
            continue;
        };
        let field_value = field_value.trim();
        if field_value.is_empty() {
            continue;
        }
        match name.trim() {
            "sentry_key" => key = Some(field_value.to_string()),
            "sentry_secret" => secret = Some(field_value.to_string()),
            _ => {}
        }
    }

    Some(AuthHeaderCredentials {
        key: key?,
        secret: secret?,
    })
}

// Query-parameter flow: project id from the route, sentry_key parameter
pub fn authenticate_query(
    registry: &ProjectCredentialRegistry,
    project_id: u64,
    sentry_key: &str,
) -> Result<u64, AuthError> {
    let project = registry.get(project_id).ok_or(AuthError::InvalidProject)?;

    if !project.public_keys.contains(sentry_key.trim()) {
        return Err(AuthError::InvalidKey);
    }

    Ok(project_id)
}

// Header flow: resolve the project from the key/secret pair alone
pub fn authenticate_header(
    registry: &ProjectCredentialRegistry,
    header: Option<&str>,
) -> Result<(u64, AuthHeaderCredentials), AuthError> {
    let header = header.ok_or(AuthError::MissingAuthHeader)?;
    let credentials = parse_auth_header(header).ok_or(AuthError::MalformedAuthHeader)?;

    let project_id = registry
        .match_credentials(&credentials.key, &credentials.secret)
        .ok_or(AuthError::UnknownCredentials)?;

    Ok((project_id, credentials))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::projects::ProjectCredential;

    fn registry() -> ProjectCredentialRegistry {
        ProjectCredentialRegistry::from_credentials(vec![ProjectCredential {
            project_id: 7,
            public_keys: HashSet::from(["abc".to_string()]),
            secret_keys: HashSet::from(["xyz".to_string()]),
        }])
        .expect("registry")
    }

    #[test]
    fn parses_full_header_with_scheme_word() {
        let parsed =
            parse_auth_header("Sentry sentry_version=7, sentry_key=abc, sentry_secret=xyz")
                .expect("credentials");

        assert_eq!(parsed.key, "abc");
        assert_eq!(parsed.secret, "xyz");
    }

    #[test]
    fn parses_header_with_trailing_separator() {
        let parsed = parse_auth_header("sentry_key=abc,sentry_secret=xyz,").expect("credentials");

        assert_eq!(parsed.key, "abc");
        assert_eq!(parsed.secret, "xyz");
    }

    #[test]
    fn rejects_header_missing_a_credential_field() {
        assert_eq!(parse_auth_header("sentry_key=abc,"), None);
        assert_eq!(parse_auth_header("sentry_secret=xyz"), None);
        assert_eq!(parse_auth_header("sentry_key=,sentry_secret=xyz"), None);
        assert_eq!(parse_auth_header(""), None);
        assert_eq!(parse_auth_header("garbage"), None);
    }

    #[test]
    fn query_auth_rejects_unknown_project_before_checking_keys() {
        assert_eq!(
            authenticate_query(&registry(), 99, "abc"),
            Err(AuthError::InvalidProject)
        );
    }

    #[test]
    fn query_auth_rejects_wrong_key() {
        assert_eq!(
            authenticate_query(&registry(), 7, "nope"),
            Err(AuthError::InvalidKey)
        );
    }

    #[test]
    fn query_auth_trims_the_supplied_key() {
        assert_eq!(authenticate_query(&registry(), 7, " abc "), Ok(7));
    }

    #[test]
    fn header_auth_resolves_matching_project() {
        let (project_id, credentials) =
            authenticate_header(&registry(), Some("sentry_key=abc,sentry_secret=xyz,"))
                .expect("auth");

        assert_eq!(project_id, 7);
        assert_eq!(credentials.key, "abc");
    }

    #[test]
    fn header_auth_distinguishes_absent_malformed_and_unmatched() {
        assert_eq!(
            authenticate_header(&registry(), None),
            Err(AuthError::MissingAuthHeader)
        );
        assert_eq!(
            authenticate_header(&registry(), Some("sentry_version=7")),
            Err(AuthError::MalformedAuthHeader)
        );
        assert_eq!(
            authenticate_header(&registry(), Some("sentry_key=abc,sentry_secret=wrong")),
            Err(AuthError::UnknownCredentials)
        );
    }
}
