//! Reverse-geocoding collaborator contract.
//!
//! Geocoding is the only network-bound operation in the system: it must be
//! invoked with an explicit timeout and its failure is recoverable. The
//! caller surfaces the message and continues, it never takes the session
//! down.

use std::time::Duration;

use crate::error::Result;

/// A reverse-geocoding lookup: position plus language hint and timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Preferred response language (BCP 47 tag).
    pub language: String,
    pub timeout: Duration,
}

impl GeocodeRequest {
    /// A request with the platform defaults: Portuguese, 10 s timeout.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            language: "pt".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An external service resolving a position to a human-readable address.
///
/// Implementations return [`crate::GeoFocusError::Geocoding`] for "no
/// address found" and timeouts alike; callers treat both as recoverable.
pub trait ReverseGeocoder {
    fn reverse_lookup(&self, request: &GeocodeRequest) -> Result<String>;
}

#[cfg(feature = "http")]
pub use http_client::NominatimClient;

#[cfg(feature = "http")]
mod http_client {
    use log::warn;
    use serde_json::Value;

    use super::{GeocodeRequest, ReverseGeocoder};
    use crate::error::{GeoFocusError, Result};

    /// Nominatim-style reverse geocoding over HTTP.
    #[derive(Debug, Clone)]
    pub struct NominatimClient {
        endpoint: String,
        user_agent: String,
    }

    impl Default for NominatimClient {
        fn default() -> Self {
            Self {
                endpoint: "https://nominatim.openstreetmap.org/reverse".to_string(),
                user_agent: "geofocus-cluster-geocoder".to_string(),
            }
        }
    }

    impl NominatimClient {
        /// Client against a custom endpoint (e.g. a self-hosted instance).
        pub fn with_endpoint(endpoint: &str) -> Self {
            Self {
                endpoint: endpoint.to_string(),
                ..Self::default()
            }
        }
    }

    impl ReverseGeocoder for NominatimClient {
        fn reverse_lookup(&self, request: &GeocodeRequest) -> Result<String> {
            let client = reqwest::blocking::Client::builder()
                .timeout(request.timeout)
                .user_agent(self.user_agent.as_str())
                .build()
                .map_err(|e| GeoFocusError::Geocoding {
                    reason: format!("client setup failed: {e}"),
                })?;

            let response = client
                .get(&self.endpoint)
                .query(&[
                    ("lat", request.latitude.to_string()),
                    ("lon", request.longitude.to_string()),
                    ("format", "jsonv2".to_string()),
                    ("accept-language", request.language.clone()),
                ])
                .send()
                .map_err(|e| {
                    warn!("reverse geocoding request failed: {e}");
                    GeoFocusError::Geocoding {
                        reason: if e.is_timeout() {
                            "request timed out".to_string()
                        } else {
                            e.to_string()
                        },
                    }
                })?;

            let body: Value = response.json().map_err(|e| GeoFocusError::Geocoding {
                reason: format!("malformed response: {e}"),
            })?;

            body.get("display_name")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| GeoFocusError::Geocoding {
                    reason: "no address found for position".to_string(),
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoFocusError;

    struct FixedGeocoder(Option<String>);

    impl ReverseGeocoder for FixedGeocoder {
        fn reverse_lookup(&self, _request: &GeocodeRequest) -> Result<String> {
            self.0.clone().ok_or(GeoFocusError::Geocoding {
                reason: "no address found for position".to_string(),
            })
        }
    }

    #[test]
    fn test_request_defaults() {
        let request = GeocodeRequest::new(51.5, -0.12);
        assert_eq!(request.language, "pt");
        assert_eq!(request.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_failure_is_recoverable() {
        let geocoder = FixedGeocoder(None);
        let err = geocoder
            .reverse_lookup(&GeocodeRequest::new(0.0, 0.0))
            .unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_success_returns_address() {
        let geocoder = FixedGeocoder(Some("1 Example Street".to_string()));
        let address = geocoder
            .reverse_lookup(&GeocodeRequest::new(0.0, 0.0))
            .unwrap();
        assert_eq!(address, "1 Example Street");
    }
}
