pub mod runner;
pub mod stage;
mod state;

pub use runner::{FieldResolution, StageReport, StageRun, StageRunner, StageTimings};
pub use stage::{ExpandStrategy, FieldOperation, FieldPolicy, FieldSpec, Stage, StageDefinition};
pub use state::{InvalidTransition, StageEvent, StageMachine, StageProgress, StageState};
