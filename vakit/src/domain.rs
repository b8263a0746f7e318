use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// One lookup against the directory/time-table service.
/// Fields a client leaves out arrive here as empty strings or zero.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LookupRequest {
    ListCountries,
    ListRegions {
        country: String,
    },
    ListCities {
        country: String,
        region: String,
    },
    ListTimeTable {
        city_id: String,
        utc_offset: i32,
    },
}

impl LookupRequest {
    pub fn regions(country: impl Into<String>) -> Self {
        LookupRequest::ListRegions {
            country: country.into(),
        }
    }

    pub fn cities(country: impl Into<String>, region: impl Into<String>) -> Self {
        LookupRequest::ListCities {
            country: country.into(),
            region: region.into(),
        }
    }

    pub fn time_table(city_id: impl Into<String>, utc_offset: i32) -> Self {
        LookupRequest::ListTimeTable {
            city_id: city_id.into(),
            utc_offset,
        }
    }

    /// Resource name the lookup is served under, also the leading part of its cache key
    pub fn resource(&self) -> &'static str {
        match self {
            LookupRequest::ListCountries => "ulkeler",
            LookupRequest::ListRegions { .. } => "eyaletler",
            LookupRequest::ListCities { .. } => "sehirler",
            LookupRequest::ListTimeTable { .. } => "vakitler",
        }
    }

    /// The parameters that identify this lookup, under their query names.
    /// The offset is written as the parsed integer, so `saat=00` and a missing `saat`
    /// both come out as `saat=0`.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            LookupRequest::ListCountries => Vec::new(),
            LookupRequest::ListRegions { country } => vec![("ulke", country.clone())],
            LookupRequest::ListCities { country, region } => {
                vec![("ulke", country.clone()), ("eyalet", region.clone())]
            }
            LookupRequest::ListTimeTable {
                city_id,
                utc_offset,
            } => vec![("sehir", city_id.clone()), ("saat", utc_offset.to_string())],
        }
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            LookupRequest::ListCountries => "countries",
            LookupRequest::ListRegions { .. } => "regions",
            LookupRequest::ListCities { .. } => "cities",
            LookupRequest::ListTimeTable { .. } => "time_table",
        }
    }
}

impl fmt::Display for LookupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupRequest::ListCountries => write!(f, "ListCountries()"),
            LookupRequest::ListRegions { country } => write!(f, "ListRegions({})", country),
            LookupRequest::ListCities { country, region } => {
                write!(f, "ListCities({}, {})", country, region)
            }
            LookupRequest::ListTimeTable {
                city_id,
                utc_offset,
            } => write!(f, "ListTimeTable({}, {})", city_id, utc_offset),
        }
    }
}

/// A structured item as the upstream returned it (country, region, city or day of times)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

impl TryFrom<Value> for Record {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Record(fields)),
            other => Err(other),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("upstream response carried no {operation} result")]
    UpstreamEmptyResult { operation: String },
}

impl FailureReason {
    /// Stable label for logs
    pub fn stage(&self) -> &'static str {
        match self {
            FailureReason::UpstreamUnreachable(_) => "upstream_unreachable",
            FailureReason::UpstreamEmptyResult { .. } => "upstream_empty_result",
        }
    }
}

/// Outcome of a single upstream call. An empty `Success` is a valid answer,
/// a missing result envelope is a `Failure`.
#[derive(Clone, Debug, PartialEq)]
pub enum LookupResult {
    Success(Vec<Record>),
    Failure(FailureReason),
}

impl LookupResult {
    pub fn is_success(&self) -> bool {
        matches!(self, LookupResult::Success(_))
    }
}
