//! Core types and service wiring for fleetwatch, the fleet operations back office.

/// Idempotent creation of the baseline checklist item definitions.
pub mod defaults;
/// Weekly per-operator indicator aggregation.
pub mod engine;
/// Bundle of source gateways shared by the engine, probe, and initializer.
pub mod gateways;
/// In-process store implementing every gateway, used for demos and tests.
pub mod memory;
/// Domain models and identifiers shared by all stores.
pub mod model;
/// Traits describing the source gateway contracts.
pub mod ports;
/// Representative queries that surface missing composite indexes.
pub mod probe;
/// High-level service facade used by the admin surface.
pub mod service;
/// Reporting periods.
pub mod window;

pub use defaults::*;
pub use engine::*;
pub use gateways::*;
pub use memory::*;
pub use model::*;
pub use ports::*;
pub use probe::*;
pub use service::*;
pub use window::*;
