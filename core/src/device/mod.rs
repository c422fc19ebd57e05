pub mod poll;
pub mod reading;
pub mod reconcile;
pub mod record;
pub mod set;

pub use poll::PollSequencer;
pub use reading::{DeviceId, DeviceReading, DeviceRole};
pub use reconcile::{reconcile, DeviceReconciler, Reconciled, ACCEPT_THRESHOLD, POSITION_EPSILON_M};
pub use record::{decode_batch, encode_batch, DeviceRecord};
pub use set::DeviceSet;
