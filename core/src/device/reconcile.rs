use super::reading::DeviceReading;
use super::set::DeviceSet;
use crate::math::DeadBand;
use log::trace;
use std::sync::Arc;

/// Readings below this quality never enter a device set.
pub const ACCEPT_THRESHOLD: u8 = 50;

/// Per-axis position change (meters) below which a reading is treated as noise.
pub const POSITION_EPSILON_M: f64 = 0.01;

/// Outcome of merging one polled batch.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub set: Arc<DeviceSet>,
    pub changed: bool,
}

enum Merge {
    Insert,
    Replace(usize),
    Keep,
}

/// Merges polled batches into a stable, change-minimised device set.
#[derive(Debug, Clone, Copy)]
pub struct DeviceReconciler {
    accept_threshold: u8,
    position_band: DeadBand,
}

impl Default for DeviceReconciler {
    fn default() -> Self {
        Self::new(ACCEPT_THRESHOLD, POSITION_EPSILON_M)
    }
}

impl DeviceReconciler {
    pub fn new(accept_threshold: u8, position_epsilon: f64) -> Self {
        Self {
            accept_threshold,
            position_band: DeadBand::new(position_epsilon),
        }
    }

    /// Applies `incoming` in order on top of `previous`.
    ///
    /// When nothing changes the returned set is `previous` itself, so callers
    /// can compare with `Arc::ptr_eq` and skip downstream work.
    pub fn reconcile(&self, previous: &Arc<DeviceSet>, incoming: &[DeviceReading]) -> Reconciled {
        let mut working: Option<DeviceSet> = None;

        for reading in incoming {
            if reading.quality < self.accept_threshold {
                trace!(
                    "ignoring device {} with quality {}",
                    reading.id,
                    reading.quality
                );
                continue;
            }

            let merge = {
                let current = working.as_ref().unwrap_or(previous.as_ref());
                match current.position(reading.id) {
                    None => Merge::Insert,
                    Some(slot) if self.differs(current.entry(slot), reading) => {
                        Merge::Replace(slot)
                    }
                    Some(_) => Merge::Keep,
                }
            };

            match merge {
                Merge::Insert => working
                    .get_or_insert_with(|| (**previous).clone())
                    .push(Arc::new(*reading)),
                Merge::Replace(slot) => working
                    .get_or_insert_with(|| (**previous).clone())
                    .replace(slot, Arc::new(*reading)),
                Merge::Keep => {}
            }
        }

        match working {
            Some(set) => Reconciled {
                set: Arc::new(set),
                changed: true,
            },
            None => Reconciled {
                set: Arc::clone(previous),
                changed: false,
            },
        }
    }

    fn differs(&self, current: &DeviceReading, next: &DeviceReading) -> bool {
        self.position_band
            .exceeds(current.position.x, next.position.x)
            || self
                .position_band
                .exceeds(current.position.y, next.position.y)
            || current.role != next.role
            || current.quality != next.quality
    }
}

/// Reconciles with the default quality floor and dead-band.
pub fn reconcile(previous: &Arc<DeviceSet>, incoming: &[DeviceReading]) -> Reconciled {
    DeviceReconciler::default().reconcile(previous, incoming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceRole;

    fn seeded(readings: &[DeviceReading]) -> Arc<DeviceSet> {
        reconcile(&Arc::new(DeviceSet::new()), readings).set
    }

    #[test]
    fn identical_batch_returns_same_set() {
        let set = seeded(&[
            DeviceReading::tag(1, 1.0, 2.0, 90),
            DeviceReading::anchor(2, 0.0, 0.0, 100),
        ]);
        let result = reconcile(
            &set,
            &[
                DeviceReading::tag(1, 1.005, 1.995, 90),
                DeviceReading::anchor(2, 0.0, 0.0, 100),
            ],
        );
        assert!(!result.changed);
        assert!(Arc::ptr_eq(&result.set, &set));
    }

    #[test]
    fn centimetre_move_from_nonzero_base_is_not_a_change() {
        for (from, to) in [(1.0, 1.01), (1.23, 1.24), (7.77, 7.78)] {
            let set = seeded(&[DeviceReading::tag(3, from, -from, 90)]);
            let result = reconcile(&set, &[DeviceReading::tag(3, to, -to, 90)]);
            assert!(!result.changed, "{from} -> {to}");
            assert!(Arc::ptr_eq(&result.set, &set));
        }

        let set = seeded(&[DeviceReading::tag(3, 1.23, 0.0, 90)]);
        assert!(reconcile(&set, &[DeviceReading::tag(3, 1.241, 0.0, 90)]).changed);
    }

    #[test]
    fn low_quality_first_sighting_is_invisible() {
        let empty = Arc::new(DeviceSet::new());
        let first = reconcile(&empty, &[DeviceReading::tag(5, 1.0, 1.0, 49)]);
        assert!(!first.changed);
        assert!(first.set.is_empty());

        let second = reconcile(&first.set, &[DeviceReading::tag(5, 1.0, 1.0, 50)]);
        assert!(second.changed);
        assert_eq!(second.set.len(), 1);
        assert_eq!(**second.set.get(5).unwrap(), DeviceReading::tag(5, 1.0, 1.0, 50));
    }

    #[test]
    fn low_quality_update_leaves_entry_alone() {
        let set = seeded(&[DeviceReading::tag(1, 0.0, 0.0, 80)]);
        let result = reconcile(&set, &[DeviceReading::tag(1, 9.0, 9.0, 10)]);
        assert!(!result.changed);
        assert_eq!(result.set.get(1).unwrap().position.x, 0.0);
    }

    #[test]
    fn position_dead_band_is_exclusive() {
        let set = seeded(&[DeviceReading::tag(1, 0.0, 0.0, 80)]);

        let within = reconcile(&set, &[DeviceReading::tag(1, 0.01, 0.0, 80)]);
        assert!(!within.changed);

        let beyond = reconcile(&set, &[DeviceReading::tag(1, 0.011, 0.0, 80)]);
        assert!(beyond.changed);
        assert_eq!(beyond.set.get(1).unwrap().position.x, 0.011);

        let vertical = reconcile(&set, &[DeviceReading::tag(1, 0.0, -0.011, 80)]);
        assert!(vertical.changed);
    }

    #[test]
    fn quality_and_role_compare_exactly() {
        let set = seeded(&[DeviceReading::tag(1, 0.0, 0.0, 80)]);
        assert!(reconcile(&set, &[DeviceReading::tag(1, 0.0, 0.0, 81)]).changed);
        let flipped = reconcile(&set, &[DeviceReading::anchor(1, 0.0, 0.0, 80)]);
        assert!(flipped.changed);
        assert_eq!(flipped.set.get(1).unwrap().role, DeviceRole::Anchor);
    }

    #[test]
    fn insertion_appends_and_update_keeps_order() {
        let set = seeded(&[
            DeviceReading::tag(1, 0.0, 0.0, 80),
            DeviceReading::tag(2, 0.0, 0.0, 80),
            DeviceReading::tag(3, 0.0, 0.0, 80),
        ]);
        let result = reconcile(
            &set,
            &[
                DeviceReading::tag(4, 1.0, 1.0, 80),
                DeviceReading::tag(2, 3.0, 3.0, 80),
            ],
        );
        assert!(result.changed);
        assert_eq!(result.set.ids(), vec![1, 2, 3, 4]);
        assert_eq!(result.set.get(2).unwrap().position.x, 3.0);
    }

    #[test]
    fn untouched_entries_stay_pointer_identical() {
        let set = seeded(&[
            DeviceReading::tag(1, 0.0, 0.0, 80),
            DeviceReading::tag(2, 0.0, 0.0, 80),
        ]);
        let result = reconcile(&set, &[DeviceReading::tag(2, 5.0, 0.0, 80)]);
        assert!(result.changed);
        assert!(Arc::ptr_eq(result.set.get(1).unwrap(), set.get(1).unwrap()));
        assert!(!Arc::ptr_eq(result.set.get(2).unwrap(), set.get(2).unwrap()));
        // previous set is not mutated
        assert_eq!(set.get(2).unwrap().position.x, 0.0);
    }

    #[test]
    fn duplicate_ids_last_occurrence_wins() {
        let empty = Arc::new(DeviceSet::new());
        let result = reconcile(
            &empty,
            &[
                DeviceReading::tag(1, 1.0, 1.0, 80),
                DeviceReading::tag(1, 2.0, 2.0, 90),
            ],
        );
        assert_eq!(result.set.len(), 1);
        assert_eq!(**result.set.get(1).unwrap(), DeviceReading::tag(1, 2.0, 2.0, 90));
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        let set = seeded(&[DeviceReading::tag(1, 0.0, 0.0, 80)]);
        let result = reconcile(&set, &[]);
        assert!(!result.changed);
        assert!(Arc::ptr_eq(&result.set, &set));
    }

    #[test]
    fn devices_absent_from_batch_are_retained() {
        let set = seeded(&[
            DeviceReading::tag(1, 0.0, 0.0, 80),
            DeviceReading::tag(2, 0.0, 0.0, 80),
        ]);
        let result = reconcile(&set, &[DeviceReading::tag(2, 1.0, 0.0, 80)]);
        assert_eq!(result.set.ids(), vec![1, 2]);
    }

    #[test]
    fn custom_threshold_is_honoured() {
        let reconciler = DeviceReconciler::new(10, POSITION_EPSILON_M);
        let result = reconciler.reconcile(
            &Arc::new(DeviceSet::new()),
            &[DeviceReading::tag(1, 0.0, 0.0, 20)],
        );
        assert_eq!(result.set.len(), 1);
    }
}
