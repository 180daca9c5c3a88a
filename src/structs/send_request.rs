use actix_web::web;
use serde::Serialize;
use validator::Validate;

use crate::errors::IngestError;

/// Query string of `GET /send`. Absent parameters are empty strings so that
/// missing and empty coordinates are rejected the same way.
#[derive(Validate, Debug, Clone, Default)]
pub struct SendParams {
    #[validate(length(min = 1, message = "Latitude is required"))]
    pub lat: String,
    #[validate(length(min = 1, message = "Longitude is required"))]
    pub lon: String,
    pub agent: String,
}

impl SendParams {
    /// Read `lat`, `long` and `agent` from a raw query string. A repeated
    /// key keeps its first value.
    pub fn from_query(query_string: &str) -> Result<Self, IngestError> {
        let pairs = web::Query::<Vec<(String, String)>>::from_query(query_string)
            .map_err(|_| IngestError::Validation)?
            .into_inner();
        let first = |key: &str| {
            pairs
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.clone())
                .unwrap_or_default()
        };

        Ok(Self {
            lat: first("lat"),
            lon: first("long"),
            agent: first("agent"),
        })
    }
}

#[derive(Serialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_named_parameters() {
        let params =
            SendParams::from_query("lat=40.4168&long=-3.7038&agent=Mozilla%2F5.0").unwrap();
        assert_eq!(params.lat, "40.4168");
        assert_eq!(params.lon, "-3.7038");
        assert_eq!(params.agent, "Mozilla/5.0");
    }

    #[test]
    fn repeated_keys_keep_the_first_value() {
        let params = SendParams::from_query("lat=1&lat=2&long=3&long=4").unwrap();
        assert_eq!(params.lat, "1");
        assert_eq!(params.lon, "3");
    }

    #[test]
    fn absent_and_valueless_keys_are_empty() {
        let params = SendParams::from_query("lat&other=x").unwrap();
        assert_eq!(params.lat, "");
        assert_eq!(params.lon, "");
        assert_eq!(params.agent, "");
        assert!(params.validate().is_err());
    }

    #[test]
    fn malformed_percent_escapes_are_kept_literally() {
        let params = SendParams::from_query("lat=%ZZ&long=2").unwrap();
        assert_eq!(params.lat, "%ZZ");
        assert_eq!(params.lon, "2");
    }
}
