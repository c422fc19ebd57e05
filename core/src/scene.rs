use crate::device::{DeviceReading, DeviceReconciler, DeviceSet, PollSequencer};
use crate::generation::Generation;
use crate::plan::{DecodeOutcome, FloorPlanAsset, MapBundle, PlanDecoder};
use crate::prelude::DecodeError;
use crate::telemetry::{LogChannel, MetricsRecorder};
use log::debug;
use std::future::Future;
use std::sync::Arc;

#[derive(Debug)]
struct PendingMap {
    generation: Generation,
    devices: Vec<DeviceReading>,
    origin_world: crate::math::WorldPoint,
    pixels_per_meter: f64,
}

/// What the renderer draws: the device set and the floor plan.
///
/// The scene is the single owner of both. Polls are merged through the
/// reconciler; a loaded map replaces devices and plan together once its
/// image has decoded, and only if no newer map load was started meanwhile.
pub struct MapScene {
    devices: Arc<DeviceSet>,
    plan: Option<FloorPlanAsset>,
    reconciler: DeviceReconciler,
    polls: PollSequencer,
    decoder: PlanDecoder,
    pending_map: Option<PendingMap>,
    polls_failing: bool,
    log: LogChannel,
    metrics: Arc<MetricsRecorder>,
}

impl MapScene {
    pub fn new(log: LogChannel, metrics: Arc<MetricsRecorder>) -> Self {
        Self {
            devices: Arc::new(DeviceSet::new()),
            plan: None,
            reconciler: DeviceReconciler::default(),
            polls: PollSequencer::new(),
            decoder: PlanDecoder::new(),
            pending_map: None,
            polls_failing: false,
            log,
            metrics,
        }
    }

    pub fn with_reconciler(mut self, reconciler: DeviceReconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn devices(&self) -> &Arc<DeviceSet> {
        &self.devices
    }

    pub fn plan(&self) -> Option<&FloorPlanAsset> {
        self.plan.as_ref()
    }

    pub fn is_loading_map(&self) -> bool {
        self.pending_map.is_some()
    }

    pub fn decoder(&self) -> &PlanDecoder {
        &self.decoder
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }

    /// Ticket for a poll about to be issued.
    pub fn begin_poll(&mut self) -> Generation {
        self.polls.begin()
    }

    /// Merges a completed poll. Returns true when the device set changed.
    pub fn apply_poll(&mut self, ticket: Generation, readings: &[DeviceReading]) -> bool {
        if !self.polls.accept(ticket) {
            self.metrics.record_superseded_poll();
            return false;
        }
        if self.polls_failing {
            self.polls_failing = false;
            self.log.record("device source reachable again");
        }

        let reconciled = self.reconciler.reconcile(&self.devices, readings);
        self.metrics.record_poll(reconciled.changed);
        if reconciled.changed {
            self.devices = reconciled.set;
        }
        reconciled.changed
    }

    /// Records a failed poll. Only the first failure of a run reaches the
    /// log channel.
    pub fn fail_poll(&mut self, ticket: Generation, error: &str) {
        self.metrics.record_poll_error();
        debug!("poll {} failed: {}", ticket.value(), error);
        if !self.polls_failing {
            self.polls_failing = true;
            self.log.warn(&format!("device poll failed: {error}"));
        }
    }

    /// Starts applying a loaded map. Without a floor plan the devices are
    /// replaced and the plan cleared immediately and `None` is returned;
    /// otherwise the returned future decodes the plan and its outcome must
    /// be passed to [`MapScene::complete_map_load`].
    pub fn begin_map_load(
        &mut self,
        bundle: MapBundle,
    ) -> Option<impl Future<Output = DecodeOutcome> + Send + 'static> {
        let Some(source) = bundle.plan else {
            self.decoder.supersede();
            self.pending_map = None;
            self.replace(DeviceSet::from_readings(bundle.devices), None);
            self.log.record("map loaded without floor plan");
            return None;
        };

        let (generation, task) = self.decoder.decode(source.bytes, &source.extension);
        self.pending_map = Some(PendingMap {
            generation,
            devices: bundle.devices,
            origin_world: source.origin_world,
            pixels_per_meter: source.pixels_per_meter,
        });
        Some(task)
    }

    /// Applies a finished decode. Stale completions are discarded; failures
    /// keep the current devices and plan.
    pub fn complete_map_load(&mut self, outcome: DecodeOutcome) -> Result<(), DecodeError> {
        let current = self.decoder.is_current(outcome.generation)
            && self
                .pending_map
                .as_ref()
                .is_some_and(|pending| pending.generation == outcome.generation);
        if !current {
            self.metrics.record_stale_decode();
            debug!("discarding stale decode {}", outcome.generation.value());
            return Err(DecodeError::StaleDecode(outcome.generation.value()));
        }

        let Some(pending) = self.pending_map.take() else {
            return Err(DecodeError::StaleDecode(outcome.generation.value()));
        };

        match outcome.result {
            Ok(image) => {
                let plan = FloorPlanAsset::new(pending.origin_world, pending.pixels_per_meter, image);
                self.log.record(&format!(
                    "map loaded: {} anchors, plan {}x{} px",
                    pending.devices.len(),
                    plan.image.width,
                    plan.image.height
                ));
                self.replace(DeviceSet::from_readings(pending.devices), Some(plan));
                self.metrics.record_decode();
                Ok(())
            }
            Err(err) => {
                self.metrics.record_decode_failure();
                self.log.warn(&format!("failed to load floor plan: {err}"));
                Err(err)
            }
        }
    }

    fn replace(&mut self, devices: DeviceSet, plan: Option<FloorPlanAsset>) {
        self.devices = Arc::new(devices);
        self.plan = plan;
    }
}
