//! Remote catalog lookups.

use thiserror::Error;
use tracing::{debug, info};

use super::part::PartIdentifier;
use super::types::{CatalogResponse, LookupOutcome, RawCatalogBody};
use crate::error::{FailureKind, UserFacing};
use crate::http::{HttpClient, HttpError};

/// Default catalog endpoint. `{part}` is replaced by the part identifier.
pub const DEFAULT_CATALOG_URL: &str = "https://easyeda.com/api/products/{part}/svgs";

/// Transport-level catalog failures.
///
/// "Part not found" is not an error; it is [`LookupOutcome::NotFound`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The request never produced a usable response.
    #[error("catalog request for {part_id} failed: {source}")]
    Network {
        part_id: String,
        #[source]
        source: HttpError,
    },

    /// The response body could not be interpreted.
    #[error("catalog returned a malformed response for {part_id}: {reason}")]
    MalformedBody { part_id: String, reason: String },
}

impl UserFacing for CatalogError {
    fn kind(&self) -> FailureKind {
        FailureKind::NetworkFailure
    }

    fn user_message(&self) -> String {
        match self {
            Self::Network { part_id, source } => format!(
                "Could not reach the parts catalog while looking up {}.\n\
                 Check your internet connection and try again.\n({})",
                part_id, source
            ),
            Self::MalformedBody { part_id, .. } => format!(
                "The parts catalog sent an unexpected response for {}.\n\
                 Try again later.",
                part_id
            ),
        }
    }
}

/// Looks up part identifiers in a remote product catalog.
pub trait CatalogLookup {
    /// Issue a single lookup for `part_id`.
    fn lookup(&self, part_id: &PartIdentifier) -> Result<LookupOutcome, CatalogError>;
}

/// Catalog client backed by an [`HttpClient`].
pub struct CatalogClient<C: HttpClient> {
    http: C,
    url_template: String,
}

impl<C: HttpClient> CatalogClient<C> {
    /// Create a client for the default catalog endpoint.
    pub fn new(http: C) -> Self {
        Self::with_url_template(http, DEFAULT_CATALOG_URL)
    }

    /// Create a client for a custom endpoint containing a `{part}` placeholder.
    pub fn with_url_template(http: C, url_template: impl Into<String>) -> Self {
        Self {
            http,
            url_template: url_template.into(),
        }
    }

    /// The request URL for a part.
    pub fn url_for(&self, part_id: &PartIdentifier) -> String {
        self.url_template.replace("{part}", part_id.as_str())
    }
}

impl<C: HttpClient> CatalogLookup for CatalogClient<C> {
    fn lookup(&self, part_id: &PartIdentifier) -> Result<LookupOutcome, CatalogError> {
        let url = self.url_for(part_id);
        info!(part_id = %part_id, "Looking up part in catalog");

        let body = match self.http.get(&url) {
            Ok(body) => body,
            // An error status with an explicit `success: false` body is the
            // catalog answering "no such part".
            Err(HttpError::Status { ref body, status, .. }) if reports_failure(body) => {
                debug!(part_id = %part_id, status, "Catalog reported no match with error status");
                return Ok(LookupOutcome::NotFound);
            }
            Err(source) => {
                return Err(CatalogError::Network {
                    part_id: part_id.to_string(),
                    source,
                })
            }
        };

        parse_catalog_body(part_id, &body)
    }
}

fn reports_failure(body: &str) -> bool {
    serde_json::from_str::<RawCatalogBody>(body).is_ok_and(|raw| raw.explicitly_failed())
}

/// Interpret a catalog response body.
pub(crate) fn parse_catalog_body(
    part_id: &PartIdentifier,
    body: &[u8],
) -> Result<LookupOutcome, CatalogError> {
    let malformed = |reason: String| CatalogError::MalformedBody {
        part_id: part_id.to_string(),
        reason,
    };

    let raw: RawCatalogBody = serde_json::from_slice(body).map_err(|e| malformed(e.to_string()))?;

    if !raw.succeeded() {
        debug!(part_id = %part_id, "Catalog reported no match");
        return Ok(LookupOutcome::NotFound);
    }

    let entries = raw.entries().map_err(|e| malformed(e.to_string()))?;
    let count = entries.len();
    let response = CatalogResponse::new(entries)
        .ok_or_else(|| malformed("success reported without any records".to_string()))?;

    debug!(part_id = %part_id, records = count, "Catalog lookup succeeded");
    Ok(LookupOutcome::Found(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::MockHttpClient;

    fn part(id: &str) -> PartIdentifier {
        PartIdentifier::new(id).unwrap()
    }

    #[test]
    fn test_errors_are_network_kind() {
        let err = CatalogError::MalformedBody {
            part_id: "C1".to_string(),
            reason: "eof".to_string(),
        };
        assert_eq!(err.kind(), FailureKind::NetworkFailure);
        assert!(err.user_message().contains("C1"));
    }

    #[test]
    fn test_url_template_substitution() {
        let client = CatalogClient::new(MockHttpClient::ok("{}"));
        assert_eq!(
            client.url_for(&part("C326215")),
            "https://easyeda.com/api/products/C326215/svgs"
        );
    }

    #[test]
    fn test_found_preserves_order() {
        let client = CatalogClient::new(MockHttpClient::ok(
            r#"{"success": true, "result": [
                {"component_uuid": "sym1"},
                {"component_uuid": "sym2"},
                {"component_uuid": "fp1"}
            ]}"#,
        ));

        match client.lookup(&part("C326215")).unwrap() {
            LookupOutcome::Found(response) => {
                assert_eq!(response.footprint_uuid(), "fp1");
                assert_eq!(response.symbol_uuids(), vec!["sym1", "sym2"]);
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn test_success_false_is_not_found() {
        let client = CatalogClient::new(MockHttpClient::ok(r#"{"success": false}"#));
        assert_eq!(
            client.lookup(&part("C0")).unwrap(),
            LookupOutcome::NotFound
        );
    }

    #[test]
    fn test_missing_success_flag_is_not_found() {
        let client = CatalogClient::new(MockHttpClient::ok(r#"{"result": []}"#));
        assert_eq!(
            client.lookup(&part("C0")).unwrap(),
            LookupOutcome::NotFound
        );
    }

    #[test]
    fn test_failed_lookup_ignores_shape_of_result() {
        for body in [
            r#"{"success": false, "code": 404, "result": {"msg": "no such product"}}"#,
            r#"{"success": false, "result": [{"title": "x"}]}"#,
            r#"{"success": false, "result": "C0 not found"}"#,
            r#"{"code": 404, "result": {"msg": "no such product"}}"#,
        ] {
            let client = CatalogClient::new(MockHttpClient::ok(body));
            assert_eq!(
                client.lookup(&part("C0")).unwrap(),
                LookupOutcome::NotFound,
                "body: {}",
                body
            );
        }
    }

    #[test]
    fn test_successful_lookup_with_bad_records_is_malformed() {
        let client = CatalogClient::new(MockHttpClient::ok(
            r#"{"success": true, "result": [{"title": "x"}]}"#,
        ));
        let err = client.lookup(&part("C1")).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedBody { .. }));
    }

    #[test]
    fn test_error_status_with_failure_body_is_not_found() {
        let client = CatalogClient::new(MockHttpClient::err(HttpError::Status {
            status: 404,
            url: "https://easyeda.com/api/products/C0/svgs".to_string(),
            body: r#"{"success": false, "code": 404, "result": null}"#.to_string(),
        }));
        assert_eq!(client.lookup(&part("C0")).unwrap(), LookupOutcome::NotFound);
    }

    #[test]
    fn test_error_status_without_failure_body_is_network_error() {
        for body in ["<html>502 Bad Gateway</html>", r#"{"error": "bad gateway"}"#, ""] {
            let client = CatalogClient::new(MockHttpClient::err(HttpError::Status {
                status: 502,
                url: "https://easyeda.com/api/products/C1/svgs".to_string(),
                body: body.to_string(),
            }));
            let err = client.lookup(&part("C1")).unwrap_err();
            assert!(matches!(err, CatalogError::Network { .. }), "body: {}", body);
            assert_eq!(err.kind(), FailureKind::NetworkFailure);
        }
    }

    #[test]
    fn test_transport_failure_is_network_error() {
        let client = CatalogClient::new(MockHttpClient::err(HttpError::Transport {
            url: "https://easyeda.com".to_string(),
            reason: "dns error".to_string(),
        }));

        let err = client.lookup(&part("C1")).unwrap_err();
        assert!(matches!(err, CatalogError::Network { .. }));
    }

    #[test]
    fn test_malformed_body_is_distinct_from_not_found() {
        let client = CatalogClient::new(MockHttpClient::ok("<html>502</html>"));
        let err = client.lookup(&part("C1")).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedBody { .. }));
    }

    #[test]
    fn test_success_without_records_is_malformed() {
        let client = CatalogClient::new(MockHttpClient::ok(r#"{"success": true, "result": []}"#));
        let err = client.lookup(&part("C1")).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedBody { .. }));
    }
}
