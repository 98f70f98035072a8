//! Position samples.

use serde::{Deserialize, Serialize};

/// One position fix for a tracked vehicle.
///
/// Samples are ephemeral: produced by a geolocation source and reported
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters per second.
    #[serde(default)]
    pub speed: f64,
    /// Degrees clockwise from true north.
    #[serde(default)]
    pub heading: f64,
    /// Horizontal accuracy in meters.
    #[serde(default)]
    pub accuracy: f64,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Default::default()
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = heading;
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// Both coordinates are finite and inside WGS84 bounds.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let sample = LocationSample::new(12.9, 77.6)
            .with_speed(10.0)
            .with_heading(90.0)
            .with_accuracy(5.0);
        assert_eq!(sample.latitude, 12.9);
        assert_eq!(sample.longitude, 77.6);
        assert_eq!(sample.speed, 10.0);
        assert_eq!(sample.heading, 90.0);
        assert_eq!(sample.accuracy, 5.0);
    }

    #[test]
    fn test_validity() {
        assert!(LocationSample::new(0.0, 0.0).is_valid());
        assert!(!LocationSample::new(91.0, 0.0).is_valid());
        assert!(!LocationSample::new(0.0, -181.0).is_valid());
        assert!(!LocationSample::new(f64::NAN, 0.0).is_valid());
    }
}
