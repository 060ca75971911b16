mod analyser;
mod planner;

pub use analyser::{Analyser, Binding, InstrumentationTree};
pub use planner::{plan, EmitKind, InstrumentationPoint, MeasurementKind};
