use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    #[serde(default = "SimulatorConfig::default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub autostart: bool,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            interval_ms: Self::default_interval_ms(),
            autostart: false,
            generator: GeneratorConfig::default(),
        }
    }
}

impl SimulatorConfig {
    fn default_interval_ms() -> u64 {
        10
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading simulator config {}", path_ref.display()))?;
        let config: SimulatorConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing simulator config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(bind: SocketAddr, anchors: usize, tags: usize, seed: u64) -> Self {
        Self {
            bind,
            generator: GeneratorConfig {
                anchors,
                tags,
                seed,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_sets_generator_layout() {
        let cfg = SimulatorConfig::from_args(default_bind(), 6, 3, 7);
        assert_eq!(cfg.generator.anchors, 6);
        assert_eq!(cfg.generator.tags, 3);
        assert_eq!(cfg.interval(), Duration::from_millis(10));
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"bind: 0.0.0.0:9100\ninterval_ms: 25\ngenerator:\n  tags: 5\n  noise_m: 0.05\n")
            .unwrap();
        let path = temp.into_temp_path();
        let cfg = SimulatorConfig::load(&path).unwrap();
        assert_eq!(cfg.bind.port(), 9100);
        assert_eq!(cfg.interval_ms, 25);
        assert_eq!(cfg.generator.tags, 5);
        assert_eq!(cfg.generator.anchors, GeneratorConfig::default().anchors);
        assert!(!cfg.autostart);
    }

    #[test]
    fn zero_interval_is_raised_to_one_millisecond() {
        let cfg = SimulatorConfig {
            interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(cfg.interval(), Duration::from_millis(1));
    }
}
