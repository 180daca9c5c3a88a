use chrono::{DateTime, Utc};
use validator::Validate;

use crate::errors::IngestError;
use crate::structs::send_request::SendParams;

pub const UNKNOWN_IP: &str = "N/A";
const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/?api=1&query=";
const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S (UTC)";

/// One captured geolocation report.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationReport {
    pub latitude: String,
    pub longitude: String,
    pub user_agent: String,
    pub ip: String,
    pub timestamp: DateTime<Utc>,
    pub maps_url: String,
}

impl LocationReport {
    /// Build a report from the query parameters. Fails when latitude or
    /// longitude is missing or empty.
    pub fn capture(
        params: SendParams,
        source_ip: Option<String>,
        received_at: DateTime<Utc>,
    ) -> Result<Self, IngestError> {
        params.validate().map_err(|_| IngestError::Validation)?;

        let maps_url = maps_url(&params.lat, &params.lon);
        Ok(Self {
            latitude: params.lat,
            longitude: params.lon,
            user_agent: params.agent,
            ip: source_ip
                .filter(|ip| !ip.is_empty())
                .unwrap_or_else(|| UNKNOWN_IP.to_string()),
            timestamp: received_at,
            maps_url,
        })
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    /// The block written to the HTML log and sent as the email body.
    ///
    /// Caller-supplied values (coordinates, user agent) are interpolated
    /// as-is, without HTML escaping. Treat the log and the email as
    /// untrusted markup.
    pub fn render_html(&self) -> String {
        format!(
            "<pre>Datetime: {}\nIP: {}\nLocation: <a href='{}' target='_blank'>Click Here</a>\nUser-Agent: {}\n</pre>\n\n",
            self.formatted_timestamp(),
            self.ip,
            self.maps_url,
            self.user_agent
        )
    }
}

/// Google Maps search link for a coordinate pair. Values are embedded as
/// given, separated by an encoded comma.
pub fn maps_url(latitude: &str, longitude: &str) -> String {
    format!("{}{}%2C{}", MAPS_SEARCH_URL, latitude, longitude)
}
