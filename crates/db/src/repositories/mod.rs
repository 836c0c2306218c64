//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod alert_repo;
pub mod device_repo;
pub mod location_repo;
pub mod reading_repo;
pub mod sensor_repo;
pub mod sensor_rule_repo;

pub use alert_repo::AlertRepo;
pub use device_repo::DeviceRepo;
pub use location_repo::LocationRepo;
pub use reading_repo::ReadingRepo;
pub use sensor_repo::SensorRepo;
pub use sensor_rule_repo::SensorRuleRepo;
