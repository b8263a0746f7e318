use serde_json::{Value, json};
use vakit::{FailureReason, LookupRequest, LookupResult, Record};

/// One remote operation: its name, its parameters and where its items sit in the response
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub operation: &'static str,
    pub params: Value,
    pub result_field: &'static str,
    pub item_field: &'static str,
}

impl Call {
    pub fn for_request(request: &LookupRequest) -> Self {
        match request {
            LookupRequest::ListCountries => Call {
                operation: "GetUlkeler",
                params: json!({ "filter": "" }),
                result_field: "GetUlkelerResult",
                item_field: "UlkeItem",
            },
            LookupRequest::ListRegions { country } => Call {
                operation: "GetEyaletler",
                params: json!({ "ulkeKodu": country, "filter": "" }),
                result_field: "GetEyaletlerResult",
                item_field: "EyaletItem",
            },
            LookupRequest::ListCities { country, region } => Call {
                operation: "GetSehirler",
                params: json!({ "ulkeKodu": country, "eyaletKod": region, "filter": "" }),
                result_field: "GetSehirlerResult",
                item_field: "SehirItem",
            },
            LookupRequest::ListTimeTable {
                city_id,
                utc_offset,
            } => Call {
                operation: "GetVakitler",
                params: json!({ "sehirId": city_id, "saatFarki": utc_offset }),
                result_field: "GetVakitlerResult",
                item_field: "DateItem",
            },
        }
    }

    /// Pull the items out of a response body.
    ///
    /// A missing or null result envelope is a failure. Inside the envelope a missing item
    /// list means no matches, and a lone object stands for a one-item list.
    pub fn extract(&self, body: Value) -> LookupResult {
        let mut result = match body {
            Value::Object(mut fields) => match fields.remove(self.result_field) {
                Some(Value::Null) | None => return self.empty_result(),
                Some(result) => result,
            },
            _ => return self.empty_result(),
        };

        let items = match result.get_mut(self.item_field).map(Value::take) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(item) => vec![item],
        };

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            match Record::try_from(item) {
                Ok(record) => records.push(record),
                Err(other) => {
                    return LookupResult::Failure(FailureReason::UpstreamUnreachable(format!(
                        "{} returned a non-object {}: {}",
                        self.operation, self.item_field, other
                    )));
                }
            }
        }
        LookupResult::Success(records)
    }

    fn empty_result(&self) -> LookupResult {
        LookupResult::Failure(FailureReason::UpstreamEmptyResult {
            operation: self.operation.to_string(),
        })
    }
}
