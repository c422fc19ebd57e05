use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use trackcore::viewport::ViewConfig;

/// Visualizer settings; every field has a default so a YAML file only
/// needs the values it overrides.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizerConfig {
    pub server: String,
    pub poll_ms: u64,
    pub max_in_flight: usize,
    pub request_timeout_ms: u64,
    pub history_len: usize,
    pub view: ViewConfig,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self {
            server: "http://127.0.0.1:9000".into(),
            poll_ms: 10,
            max_in_flight: 4,
            request_timeout_ms: 500,
            history_len: 20,
            view: ViewConfig::default(),
        }
    }
}

impl VisualizerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading visualizer config {}", path_ref.display()))?;
        let config: VisualizerConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing visualizer config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.server.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms.max(1))
    }

    /// Deadline for a single backend request, never shorter than one poll
    /// interval. A request that misses it frees its in-flight slot.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms).max(self.poll_interval())
    }

    pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout())
            .build()
            .context("building HTTP client")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = VisualizerConfig {
            server: "http://localhost:9000/".into(),
            ..Default::default()
        };
        assert_eq!(config.endpoint("/devices"), "http://localhost:9000/devices");
        assert_eq!(config.endpoint("record/start"), "http://localhost:9000/record/start");
    }

    #[test]
    fn request_timeout_is_bounded_below_by_poll_interval() {
        let config = VisualizerConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_millis(500));

        let slow = VisualizerConfig {
            poll_ms: 2_000,
            request_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(slow.request_timeout(), Duration::from_secs(2));
        assert!(slow.http_client().is_ok());
    }

    #[test]
    fn yaml_overrides_view_settings() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"poll_ms: 20\nview:\n  max_scale: 300.0\n").unwrap();
        let path = temp.into_temp_path();
        let config = VisualizerConfig::load(&path).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(20));
        assert_eq!(config.view.max_scale, 300.0);
        assert_eq!(config.view.min_scale, ViewConfig::default().min_scale);
        assert_eq!(config.max_in_flight, 4);
    }
}
