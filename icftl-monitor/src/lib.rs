//! Concurrent runtime monitor maintaining formula trees for an iCFTL
//! specification: a dedicated consumer thread receives trigger and
//! measurement events from instruments planted by [`icftl_analysis::plan`]
//! and evolves one [`binding::BindingState`] per live quantifier binding
//! until its formula resolves to true, false, or monitoring ends.

mod binding;
mod config;
mod errors;
mod formula;
mod logging;
mod monitor;

pub use binding::{BindingState, MeasurementDictionary};
pub use config::{ColorConfig, HostingMode, LoggingConfig, LoggingConfigDefaults, RuntimeConfig};
pub use errors::{BoxedMonitorError, MonitorError, MonitorResult};
pub use formula::update_with_measurement;
pub use logging::initialize_logger;
pub use monitor::{Monitor, Verdict, VerdictSnapshot};
