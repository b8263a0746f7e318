use crate::models::ErrorResponse;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};
use tracing::{error, info};
use vakit::planes::data::Source;
use vakit::planes::data::operation::LookupOperations;
use vakit::{CacheKey, LookupRequest, Record};

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// The four lookup paths the proxy serves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Countries,
    Regions,
    Cities,
    TimeTable,
}

impl Endpoint {
    pub const ALL: [Endpoint; 4] = [
        Endpoint::Countries,
        Endpoint::Regions,
        Endpoint::Cities,
        Endpoint::TimeTable,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Countries => "/ulkeler",
            Endpoint::Regions => "/eyaletler",
            Endpoint::Cities => "/sehirler",
            Endpoint::TimeTable => "/vakitler",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|endpoint| endpoint.path() == path)
    }

    /// Body message returned when a lookup on this path fails
    pub fn failure_message(self) -> &'static str {
        match self {
            Endpoint::Countries => "Ülkeler listesi alınamadı.",
            Endpoint::Regions => "Eyaletler listesi alınamadı.",
            Endpoint::Cities => "Şehirler listesi alınamadı.",
            Endpoint::TimeTable => "Vakitler alınamadı.",
        }
    }

    /// Map query parameters onto a lookup. Missing filters become empty strings,
    /// a missing or empty `saat` means offset 0.
    pub fn request(self, query: &[(String, String)]) -> Result<LookupRequest, String> {
        let request = match self {
            Endpoint::Countries => LookupRequest::ListCountries,
            Endpoint::Regions => LookupRequest::regions(param(query, "ulke")),
            Endpoint::Cities => LookupRequest::cities(param(query, "ulke"), param(query, "eyalet")),
            Endpoint::TimeTable => {
                let saat = param(query, "saat").trim();
                let utc_offset = if saat.is_empty() {
                    0
                } else {
                    saat.parse::<i32>()
                        .map_err(|_| "saat must be an integer".to_string())?
                };
                LookupRequest::time_table(param(query, "sehir"), utc_offset)
            }
        };
        Ok(request)
    }
}

/// First value given for `name`, or an empty string
fn param<'a>(query: &'a [(String, String)], name: &str) -> &'a str {
    query
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
        .unwrap_or("")
}

/// Strong validator for a serialized response body
pub fn entity_tag(body: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(body)))
}

/// Whether the client's `If-None-Match` already names `etag` (weak comparison, `*` matches)
fn not_modified(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .any(|candidate| candidate == "*" || candidate.trim_start_matches("W/") == etag)
}

fn records_response(
    headers: &HeaderMap,
    records: &[Record],
    source: Source,
) -> Result<Response, String> {
    let body = serde_json::to_vec(records).map_err(|e| format!("serialize: {}", e))?;
    let etag = entity_tag(&body);
    let etag_value = HeaderValue::from_str(&etag).map_err(|e| format!("etag: {}", e))?;
    let cache_status = HeaderValue::from_static(if source.is_hit() { "HIT" } else { "MISS" });

    if not_modified(headers, &etag) {
        return Ok((
            StatusCode::NOT_MODIFIED,
            [(header::ETAG, etag_value), (X_CACHE, cache_status)],
        )
            .into_response());
    }

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (header::ETAG, etag_value),
            (X_CACHE, cache_status),
        ],
        body,
    )
        .into_response())
}

fn failure(endpoint: Endpoint) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(endpoint.failure_message())),
    )
        .into_response()
}

async fn lookup(
    state: AppState,
    endpoint: Endpoint,
    headers: HeaderMap,
    query: Vec<(String, String)>,
) -> Response {
    let request = match endpoint.request(&query) {
        Ok(request) => request,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response();
        }
    };
    let key = CacheKey::for_request(&request);
    info!("GET: path={}, key={}", endpoint.path(), key);

    match state.cache_aside.resolve(&request, &key).await {
        Ok(resolved) => match records_response(&headers, &resolved.records, resolved.source) {
            Ok(response) => response,
            Err(e) => {
                error!(key = %key, stage = "respond", "{} failed: {}", request, e);
                failure(endpoint)
            }
        },
        Err(e) => {
            error!(key = %key, "{} failed: {}", request, e);
            failure(endpoint)
        }
    }
}

/// GET /ulkeler
pub async fn list_countries(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    lookup(state, Endpoint::Countries, headers, query).await
}

/// GET /eyaletler?ulke=
pub async fn list_regions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    lookup(state, Endpoint::Regions, headers, query).await
}

/// GET /sehirler?ulke=&eyalet=
pub async fn list_cities(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    lookup(state, Endpoint::Cities, headers, query).await
}

/// GET /vakitler?sehir=&saat=
pub async fn list_time_table(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    lookup(state, Endpoint::TimeTable, headers, query).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_time_table_request() {
        let request = Endpoint::TimeTable
            .request(&query(&[("sehir", "9541"), ("saat", "2")]))
            .unwrap();
        assert_eq!(request, LookupRequest::time_table("9541", 2));

        let request = Endpoint::TimeTable
            .request(&query(&[("sehir", "9541"), ("saat", "-3")]))
            .unwrap();
        assert_eq!(request, LookupRequest::time_table("9541", -3));
    }

    #[test]
    fn test_missing_saat_defaults_to_zero() {
        let request = Endpoint::TimeTable
            .request(&query(&[("sehir", "9541")]))
            .unwrap();
        assert_eq!(request, LookupRequest::time_table("9541", 0));

        let request = Endpoint::TimeTable
            .request(&query(&[("sehir", "9541"), ("saat", "")]))
            .unwrap();
        assert_eq!(request, LookupRequest::time_table("9541", 0));
    }

    #[test]
    fn test_non_integer_saat_is_rejected() {
        let err = Endpoint::TimeTable
            .request(&query(&[("sehir", "9541"), ("saat", "abc")]))
            .unwrap_err();
        assert_eq!(err, "saat must be an integer");
    }

    #[test]
    fn test_missing_filters_become_empty() {
        assert_eq!(
            Endpoint::Cities.request(&query(&[("ulke", "TR")])).unwrap(),
            LookupRequest::cities("TR", "")
        );
        assert_eq!(
            Endpoint::Regions.request(&[]).unwrap(),
            LookupRequest::regions("")
        );
    }

    #[test]
    fn test_first_value_wins() {
        assert_eq!(
            Endpoint::Regions
                .request(&query(&[("ulke", "TR"), ("ulke", "DE")]))
                .unwrap(),
            LookupRequest::regions("TR")
        );
    }

    #[test]
    fn test_equivalent_queries_share_a_key() {
        let keys: Vec<CacheKey> = [
            query(&[("sehir", "9541")]),
            query(&[("sehir", "9541"), ("saat", "0")]),
            query(&[("saat", "00"), ("sehir", "9541")]),
            query(&[("sehir", "9541"), ("saat", "0"), ("junk", "1")]),
            query(&[("sehir", "9541"), ("sehir", "1"), ("saat", "+0")]),
        ]
        .iter()
        .map(|q| CacheKey::for_request(&Endpoint::TimeTable.request(q).unwrap()))
        .collect();

        assert!(keys.iter().all(|key| key.as_str() == "vakitler?saat=0&sehir=9541"));
    }

    #[test]
    fn test_entity_tag_tracks_body() {
        let a = entity_tag(br#"[{"UlkeID":"2"}]"#);
        assert_eq!(a, entity_tag(br#"[{"UlkeID":"2"}]"#));
        assert_ne!(a, entity_tag(br#"[{"UlkeID":"13"}]"#));
        // quoted sha-256 hex
        assert_eq!(a.len(), 66);
        assert!(a.starts_with('"') && a.ends_with('"'));
    }

    #[test]
    fn test_if_none_match_comparison() {
        let etag = entity_tag(b"[]");
        let mut headers = HeaderMap::new();
        assert!(!not_modified(&headers, &etag));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_str(&etag).unwrap());
        assert!(not_modified(&headers, &etag));

        let listed = format!("\"other\", W/{}", etag);
        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_str(&listed).unwrap());
        assert!(not_modified(&headers, &etag));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("\"other\""));
        assert!(!not_modified(&headers, &etag));

        headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("*"));
        assert!(not_modified(&headers, &etag));
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Endpoint::from_path("/vakitler"), Some(Endpoint::TimeTable));
        assert_eq!(Endpoint::from_path("/health"), None);
    }
}
