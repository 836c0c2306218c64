//! Row models, one module per table group.

pub mod alert;
pub mod device;
pub mod location;
pub mod sensor;
pub mod sensor_rule;
