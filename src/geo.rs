// SSH Honeypot - GeoIP Resolver
// Copyright (C) 2025 Akaere Networks
// SPDX-License-Identifier: AGPL-3.0-or-later

use maxminddb::{Reader, geoip2};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::Path;
use tracing::debug;

use crate::error::{HoneypotError, HoneypotResult};

/// Default City database location, relative to the working directory
pub const DEFAULT_GEOIP_DB: &str = "GeoLite2-City.mmdb";

/// Approximate location of a client address.
///
/// Fields the dataset has no answer for stay `None` and serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub country: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl GeoLocation {
    /// A location with every field absent
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_unknown(&self) -> bool {
        self == &Self::unknown()
    }
}

/// Address to location lookup.
///
/// Implementations never fail the caller; misses resolve to
/// [`GeoLocation::unknown`].
pub trait GeoResolver: Send + Sync {
    fn resolve(&self, addr: IpAddr) -> GeoLocation;
}

/// Resolver that knows nothing; every address is unknown
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResolver;

impl GeoResolver for NullResolver {
    fn resolve(&self, _addr: IpAddr) -> GeoLocation {
        GeoLocation::unknown()
    }
}

/// MaxMind City database reader
pub struct MaxMindResolver {
    reader: Reader<Vec<u8>>,
}

impl MaxMindResolver {
    /// Open a City database (`.mmdb`)
    pub fn open(path: &Path) -> HoneypotResult<Self> {
        let reader =
            Reader::open_readfile(path).map_err(|e| HoneypotError::DatasetUnavailable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        debug!(
            "Opened GeoIP database {:?} ({})",
            path, reader.metadata.database_type
        );
        Ok(Self { reader })
    }
}

impl GeoResolver for MaxMindResolver {
    fn resolve(&self, addr: IpAddr) -> GeoLocation {
        let city = match self.reader.lookup::<geoip2::City>(addr) {
            Ok(city) => city,
            Err(e) => {
                debug!("GeoIP lookup miss for {}: {}", addr, e);
                return GeoLocation::unknown();
            }
        };

        let mut location = GeoLocation::unknown();

        if let Some(country) = city.country {
            location.country = country
                .names
                .and_then(|names| names.get("en").map(|s| s.to_string()));
        }

        if let Some(city_info) = city.city {
            location.city = city_info
                .names
                .and_then(|names| names.get("en").map(|s| s.to_string()));
        }

        if let Some(coords) = city.location {
            location.latitude = coords.latitude;
            location.longitude = coords.longitude;
        }

        location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    struct TableResolver(HashMap<IpAddr, GeoLocation>);

    impl GeoResolver for TableResolver {
        fn resolve(&self, addr: IpAddr) -> GeoLocation {
            self.0.get(&addr).cloned().unwrap_or_default()
        }
    }

    #[test]
    fn test_unknown_serializes_as_nulls() {
        let json = serde_json::to_value(GeoLocation::unknown()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "country": null,
                "city": null,
                "latitude": null,
                "longitude": null
            })
        );
    }

    #[test]
    fn test_null_resolver_is_all_absent() {
        let location = NullResolver.resolve("203.0.113.5".parse().unwrap());
        assert!(location.is_unknown());
    }

    #[test]
    fn test_trait_object_fallback() {
        let known: IpAddr = "198.51.100.7".parse().unwrap();
        let mut table = HashMap::new();
        table.insert(
            known,
            GeoLocation {
                country: Some("Germany".to_string()),
                city: Some("Berlin".to_string()),
                latitude: Some(52.52),
                longitude: Some(13.405),
            },
        );
        let resolver: Box<dyn GeoResolver> = Box::new(TableResolver(table));

        assert_eq!(resolver.resolve(known).city.as_deref(), Some("Berlin"));
        assert!(resolver.resolve("203.0.113.5".parse().unwrap()).is_unknown());
    }

    #[test]
    fn test_missing_dataset_is_unavailable() {
        let dir = tempdir().unwrap();
        let result = MaxMindResolver::open(&dir.path().join("missing.mmdb"));
        assert!(matches!(result, Err(HoneypotError::DatasetUnavailable { .. })));
    }

    #[test]
    fn test_garbage_dataset_is_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.mmdb");
        std::fs::write(&path, b"not a maxmind database").unwrap();
        assert!(MaxMindResolver::open(&path).is_err());
    }
}
