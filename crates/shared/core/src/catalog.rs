//! Service Catalog
//!
//! The static registry of every service known to the system. The catalog is
//! keyed and iterated by name, so anything derived from it (for example the
//! list of bridged services) comes out in a stable alphabetical order.

use crate::entities::Service;
use std::collections::BTreeMap;

/// Port assigned to the first declared service; later services count up from here
pub const FIRST_SERVICE_PORT: u16 = 8001;

/// Internal services that are never bridged, whatever the direction or allow-list
pub const EXCLUDED_SERVICES: &[&str] = &["plusFrame", "uiLayoutState"];

/// Whether a service name is on the hard-excluded list
pub fn is_excluded(name: &str) -> bool {
    EXCLUDED_SERVICES.contains(&name)
}

/// (name, should_log, frequency, decimation) in declaration order.
/// Declaration order fixes the port numbers; keep new services at the end.
const BUILTIN_SERVICES: &[(&str, bool, f64, Option<u32>)] = &[
    ("gyroscope", true, 104.0, Some(104)),
    ("gyroscope2", true, 100.0, Some(100)),
    ("accelerometer", true, 104.0, Some(104)),
    ("accelerometer2", true, 100.0, Some(100)),
    ("magnetometer", true, 25.0, Some(25)),
    ("lightSensor", true, 100.0, Some(100)),
    ("temperatureSensor", true, 2.0, Some(200)),
    ("gpsNMEA", true, 9.0, None),
    ("deviceState", true, 2.0, Some(1)),
    ("can", true, 100.0, None),
    ("controlsState", true, 100.0, Some(10)),
    ("pandaStates", true, 2.0, Some(1)),
    ("peripheralState", true, 2.0, Some(1)),
    ("radarState", true, 20.0, Some(5)),
    ("roadEncodeIdx", false, 20.0, Some(1)),
    ("liveTracks", true, 20.0, None),
    ("sendcan", true, 100.0, Some(139)),
    ("logMessage", true, 0.0, None),
    ("errorLogMessage", true, 0.0, Some(1)),
    ("liveCalibration", true, 4.0, Some(4)),
    ("androidLog", true, 0.0, None),
    ("carState", true, 100.0, Some(10)),
    ("carControl", true, 100.0, Some(10)),
    ("longitudinalPlan", true, 20.0, Some(5)),
    ("procLog", true, 0.5, None),
    ("gpsLocationExternal", true, 10.0, Some(10)),
    ("gpsLocation", true, 1.0, Some(1)),
    ("ubloxGnss", true, 10.0, None),
    ("qcomGnss", true, 2.0, None),
    ("gnssMeasurements", true, 10.0, Some(10)),
    ("clocks", true, 1.0, Some(1)),
    ("ubloxRaw", true, 20.0, None),
    ("liveLocation", true, 20.0, Some(5)),
    ("liveLocationKalman", true, 20.0, Some(5)),
    ("liveParameters", true, 20.0, Some(5)),
    ("cameraOdometry", true, 20.0, Some(5)),
    ("lateralPlan", true, 20.0, Some(5)),
    ("thumbnail", true, 0.2, Some(1)),
    ("carEvents", true, 1.0, Some(1)),
    ("carParams", true, 0.02, Some(1)),
    ("roadCameraState", true, 20.0, Some(20)),
    ("driverCameraState", true, 20.0, Some(20)),
    ("driverEncodeIdx", false, 20.0, Some(1)),
    ("driverState", true, 20.0, Some(10)),
    ("driverMonitoringState", true, 20.0, Some(10)),
    ("wideRoadEncodeIdx", false, 20.0, Some(1)),
    ("wideRoadCameraState", true, 20.0, Some(20)),
    ("modelV2", true, 20.0, Some(40)),
    ("managerState", true, 2.0, Some(1)),
    ("uploaderState", true, 0.0, Some(1)),
    ("navInstruction", true, 1.0, Some(10)),
    ("navRoute", true, 0.0, None),
    ("navThumbnail", true, 0.0, None),
    ("microphone", true, 10.0, Some(10)),
    ("userFlag", true, 0.0, Some(1)),
    ("plusFrame", false, 0.0, None),
    ("uiLayoutState", false, 0.0, None),
    ("testJoystick", true, 0.0, None),
    ("roadEncodeData", false, 20.0, None),
    ("driverEncodeData", false, 20.0, None),
    ("wideRoadEncodeData", false, 20.0, None),
    ("qRoadEncodeData", false, 20.0, None),
];

/// Read-only mapping from service name to its metadata
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    services: BTreeMap<String, Service>,
}

impl Catalog {
    /// The catalog compiled into the bridge
    pub fn builtin() -> Self {
        let services = BUILTIN_SERVICES.iter().zip(FIRST_SERVICE_PORT..).map(
            |(&(name, should_log, frequency, decimation), port)| Service {
                name: name.to_string(),
                port,
                should_log,
                frequency,
                decimation,
            },
        );
        Self::from_services(services)
    }

    /// Build a catalog from explicit service entries.
    /// A later entry with the same name replaces an earlier one.
    pub fn from_services(services: impl IntoIterator<Item = Service>) -> Self {
        Self {
            services: services
                .into_iter()
                .map(|service| (service.name.clone(), service))
                .collect(),
        }
    }

    /// Build a catalog from bare names, assigning ports in the given order
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self::from_services(
            names
                .into_iter()
                .zip(FIRST_SERVICE_PORT..)
                .map(|(name, port)| Service::new(name, port)),
        )
    }

    pub fn get(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    /// TCP port of a service, if the service is known
    pub fn port(&self, name: &str) -> Option<u16> {
        self.get(name).map(|s| s.port)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// Service names in catalog (alphabetical) order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
