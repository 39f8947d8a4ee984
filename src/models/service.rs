//! Scanner service availability.

use serde::Deserialize;

/// Availability of the scanning service.
///
/// Backends have reported the operating system either as `data.os` or as a
/// top-level `os`. Both decode into this one shape; `data.os` wins when both
/// are present.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "ServiceStatusWire")]
pub struct ServiceStatus {
    pub available: bool,
    pub os: Option<String>,
}

#[derive(Deserialize)]
struct ServiceStatusWire {
    #[serde(default)]
    available: bool,
    #[serde(default)]
    data: Option<ServiceData>,
    #[serde(default)]
    os: Option<String>,
}

#[derive(Deserialize)]
struct ServiceData {
    #[serde(default)]
    os: Option<String>,
}

impl From<ServiceStatusWire> for ServiceStatus {
    fn from(wire: ServiceStatusWire) -> Self {
        let os = wire.data.and_then(|d| d.os).or(wire.os);
        Self {
            available: wire.available,
            os,
        }
    }
}
