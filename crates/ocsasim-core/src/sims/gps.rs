//! GPS sim tracing a circle.

use ocsasim_proto::{Component, DataRecordSchema};
use serde_json::{Map, Value, json};

use crate::{
    config::PathConfig,
    error::ConfigError,
    generator::circle_point,
    simulation::Simulation,
};

const POSITION_DEFINITION: &str = "http://sensorml.com/ont/swe/property/Position";
const EPSG_4979: &str = "http://www.opengis.net/def/crs/EPSG/0/4979";

/// Publishes positions along a fixed circular path. Not controllable.
#[derive(Debug, Clone)]
pub struct GpsSim {
    path: PathConfig,
    angle: f64,
    angle_step: f64,
}

impl GpsSim {
    /// Create a sim starting at angle zero.
    pub fn new(path: PathConfig) -> Result<Self, ConfigError> {
        path.validate()?;
        Ok(Self { path, angle: 0.0, angle_step: path.angle_step_deg.to_radians() })
    }

    /// Current angle accumulator, radians.
    pub fn angle(&self) -> f64 {
        self.angle
    }
}

impl Simulation for GpsSim {
    fn kind(&self) -> &'static str {
        "GPS"
    }

    fn datastream_schema(&self) -> DataRecordSchema {
        let coordinates = vec![
            Component::quantity(
                "lat",
                "Latitude",
                "http://sensorml.com/ont/swe/property/Latitude",
                "deg",
                "degrees",
            ),
            Component::quantity(
                "lon",
                "Longitude",
                "http://sensorml.com/ont/swe/property/Longitude",
                "deg",
                "degrees",
            ),
            Component::quantity(
                "alt",
                "Altitude",
                "http://sensorml.com/ont/swe/property/Altitude",
                "m",
                "meters",
            ),
        ];

        DataRecordSchema::new("GPS Simulated Location", "GPS Simulated Location", POSITION_DEFINITION)
            .with_field(Component::timestamp())
            .with_field(Component::vector(
                "location",
                "Location",
                "http://www.opengis.net/def/property/OGC/0/SensorLocation",
                EPSG_4979,
                coordinates,
            ))
            .with_field(Component::quantity(
                "orientation",
                "Orientation",
                "http://sensorml.com/ont/swe/property/Orientation",
                "deg",
                "degrees",
            ))
    }

    fn tick(&mut self, _tick: u64) -> Map<String, Value> {
        let point = circle_point(&self.path, self.angle);
        self.angle += self.angle_step;

        let mut result = Map::new();
        result.insert(
            "location".to_string(),
            json!({ "lat": point.lat, "lon": point.lon, "alt": point.alt }),
        );
        result.insert("orientation".to_string(), json!(self.path.orientation));
        result
    }
}
