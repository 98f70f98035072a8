//! Position sources for headless tracking.

use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;

use fleetsync_protocols::error::GeolocationError;
use fleetsync_protocols::geolocation::GeolocationSource;
use fleetsync_protocols::types::LocationSample;

/// Always reports the same fix.
#[derive(Debug, Clone, Copy)]
pub struct StaticSource {
    sample: LocationSample,
}

impl StaticSource {
    pub fn new(sample: LocationSample) -> Self {
        Self { sample }
    }
}

#[async_trait]
impl GeolocationSource for StaticSource {
    async fn current_position(&self) -> Result<LocationSample, GeolocationError> {
        if self.sample.is_valid() {
            Ok(self.sample)
        } else {
            Err(GeolocationError::Unavailable(format!(
                "invalid coordinates ({}, {})",
                self.sample.latitude, self.sample.longitude
            )))
        }
    }
}

/// Replays a recorded track, wrapping around at the end.
#[derive(Debug)]
pub struct ReplaySource {
    samples: Vec<LocationSample>,
    cursor: Mutex<usize>,
}

impl ReplaySource {
    pub fn new(samples: Vec<LocationSample>) -> Result<Self, GeolocationError> {
        if samples.is_empty() {
            return Err(GeolocationError::Unavailable("empty track".to_string()));
        }
        if let Some(bad) = samples.iter().position(|s| !s.is_valid()) {
            return Err(GeolocationError::Unavailable(format!(
                "sample {} has invalid coordinates",
                bad
            )));
        }
        Ok(Self {
            samples,
            cursor: Mutex::new(0),
        })
    }

    /// Load a JSON array of samples (`[{"latitude": .., "longitude": ..}, ..]`).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GeolocationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| GeolocationError::Unavailable(format!("{}: {}", path.display(), e)))?;
        let samples: Vec<LocationSample> = serde_json::from_str(&content)
            .map_err(|e| GeolocationError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Self::new(samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[async_trait]
impl GeolocationSource for ReplaySource {
    async fn current_position(&self) -> Result<LocationSample, GeolocationError> {
        let mut cursor = self.cursor.lock();
        let sample = self.samples[*cursor % self.samples.len()];
        *cursor = (*cursor + 1) % self.samples.len();
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticSource::new(LocationSample::new(12.9, 77.6));
        let sample = source.current_position().await.unwrap();
        assert_eq!(sample.latitude, 12.9);
    }

    #[tokio::test]
    async fn test_static_source_invalid() {
        let source = StaticSource::new(LocationSample::new(120.0, 77.6));
        assert!(matches!(
            source.current_position().await,
            Err(GeolocationError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_replay_wraps_around() {
        let source = ReplaySource::new(vec![
            LocationSample::new(1.0, 1.0),
            LocationSample::new(2.0, 2.0),
        ])
        .unwrap();

        let lats: Vec<f64> = collect_latitudes(&source, 5).await;
        assert_eq!(lats, vec![1.0, 2.0, 1.0, 2.0, 1.0]);
    }

    async fn collect_latitudes(source: &ReplaySource, n: usize) -> Vec<f64> {
        let mut out = Vec::new();
        for _ in 0..n {
            out.push(source.current_position().await.unwrap().latitude);
        }
        out
    }

    #[test]
    fn test_replay_rejects_empty() {
        assert!(ReplaySource::new(Vec::new()).is_err());
    }

    #[test]
    fn test_replay_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("track.json");
        std::fs::write(
            &path,
            r#"[{"latitude": 12.97, "longitude": 77.59, "speed": 8.0},
                {"latitude": 12.98, "longitude": 77.60}]"#,
        )
        .unwrap();

        let source = ReplaySource::from_file(&path).unwrap();
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn test_replay_from_missing_file() {
        let result = ReplaySource::from_file("/nonexistent/track.json");
        assert!(matches!(result, Err(GeolocationError::Unavailable(_))));
    }
}
