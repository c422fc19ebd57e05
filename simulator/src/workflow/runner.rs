use crate::generator::profile::DeviceGenerator;
use crate::gui_bridge::model::StatusModel;
use crate::workflow::config::SimulatorConfig;
use log::{debug, info};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use trackcore::device::DeviceRecord;

#[derive(Debug, Default)]
struct SessionState {
    running: bool,
    recording: bool,
    ticks: u64,
    devices: Vec<DeviceRecord>,
}

/// Positioning session: owns the current device snapshot and the
/// start/record signals.
#[derive(Clone)]
pub struct Runner {
    config: SimulatorConfig,
    state: Arc<Mutex<SessionState>>,
}

impl Runner {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// Starts the device loop on the current tokio runtime. Returns false
    /// when a session is already running.
    pub fn start(&self) -> bool {
        let mut generator = DeviceGenerator::new(self.config.generator.clone());
        {
            let mut state = self.lock();
            if state.running {
                debug!("start requested while already running");
                return false;
            }
            state.running = true;
            state.devices = generator.initial();
            info!("session started with {} devices", state.devices.len());
        }

        let runner = self.clone();
        let interval = self.config.interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let dt = interval.as_secs_f64();
            loop {
                ticker.tick().await;
                runner.tick(&mut generator, dt);
            }
        });
        true
    }

    /// Advances the generator once and folds its readings into the snapshot.
    /// Readings with zero quality are not location fixes and leave the
    /// previous position in place.
    pub fn tick(&self, generator: &mut DeviceGenerator, dt_s: f64) {
        let readings = generator.step(dt_s);
        let mut state = self.lock();
        state.ticks += 1;
        for reading in readings.into_iter().filter(|reading| reading.q > 0) {
            if let Some(device) = state
                .devices
                .iter_mut()
                .find(|device| device.address == reading.address)
            {
                device.x = reading.x;
                device.y = reading.y;
                device.q = reading.q;
            }
        }
    }

    pub fn start_recording(&self) {
        let mut state = self.lock();
        if !state.recording {
            state.recording = true;
            info!("recording started");
        }
    }

    pub fn stop_recording(&self) {
        let mut state = self.lock();
        if state.recording {
            state.recording = false;
            info!("recording stopped");
        }
    }

    pub fn devices(&self) -> Vec<DeviceRecord> {
        self.lock().devices.clone()
    }

    pub fn status(&self) -> StatusModel {
        let state = self.lock();
        StatusModel {
            running: state.running,
            recording: state.recording,
            ticks: state.ticks,
            device_count: state.devices.len(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::GeneratorConfig;

    fn config(dropout: f64) -> SimulatorConfig {
        SimulatorConfig {
            generator: GeneratorConfig {
                dropout,
                low_quality: 0.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let runner = Runner::new(config(0.0));
        assert!(runner.start());
        assert!(!runner.start());
        let status = runner.status();
        assert!(status.running);
        assert_eq!(status.device_count, 6);
    }

    #[test]
    fn devices_are_empty_before_start() {
        let runner = Runner::new(config(0.0));
        assert!(runner.devices().is_empty());
        assert!(!runner.status().running);
    }

    #[test]
    fn tick_moves_tags_but_skips_zero_quality() {
        let runner = Runner::new(config(1.0));
        let mut generator = DeviceGenerator::new(runner.config.generator.clone());
        runner.lock().devices = generator.initial();
        let before = runner.devices();

        runner.tick(&mut generator, 1.0);
        let after = runner.devices();
        assert_eq!(runner.status().ticks, 1);
        for (b, a) in before.iter().zip(&after).filter(|(b, _)| b.is_hedge) {
            assert_eq!((b.x, b.y), (a.x, a.y));
        }

        let runner = Runner::new(config(0.0));
        let mut generator = DeviceGenerator::new(runner.config.generator.clone());
        runner.lock().devices = generator.initial();
        let before = runner.devices();
        runner.tick(&mut generator, 1.0);
        let moved = runner
            .devices()
            .iter()
            .zip(&before)
            .filter(|(a, b)| a.is_hedge && (a.x != b.x || a.y != b.y))
            .count();
        assert_eq!(moved, 2);
    }

    #[test]
    fn recording_toggles() {
        let runner = Runner::new(config(0.0));
        runner.start_recording();
        assert!(runner.status().recording);
        runner.stop_recording();
        assert!(!runner.status().recording);
    }
}
