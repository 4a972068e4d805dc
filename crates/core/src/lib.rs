pub mod error;
pub mod ids;
pub mod name;
pub mod operations;
pub mod plan;
pub mod sequence;

pub use error::CoreError;
pub use ids::*;
pub use name::PositionalName;
pub use operations::{Instructions, Operation};
pub use plan::{PlanSnapshot, RenamePlan, RenameStep, StepOutcome};
pub use sequence::{Item, Sequence};
