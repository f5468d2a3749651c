//! Device selection and automatic quality upgrades.

mod devices;
mod quality;

pub use devices::{devices_for_facing_mode, next_device_id};
pub use quality::{is_acceptable, QualityCheck, QualityViolation};
