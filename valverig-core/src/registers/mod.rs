//! Sensor register catalog and bus read planning
//!
//! A sensor exposes many data registers; the rig samples a fixed subset.
//! The plan merges the selected byte ranges into as few bus transactions
//! as possible and knows how to slice each transaction back into fields.

pub mod field;
pub mod plan;
pub mod reading;

pub use field::{
    AccelRange, Field, FieldCatalog, FieldSpec, GyroRange, MAX_FIELDS, SENSOR_TIME_RESOLUTION_S,
    SENSOR_TIME_WRAP_S,
};
pub use plan::{PlanError, Read, RegisterPlan, MAX_READS, MAX_READ_LEN};
pub use reading::Reading;
