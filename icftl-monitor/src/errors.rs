//! Runtime-facing errors: channel disconnection, logger setup. Modeled as a
//! `thiserror`-derived enum boxed behind a small wrapper, keeping the
//! `Result` small enough to move across channel boundaries cheaply.

pub type MonitorResult<T> = std::result::Result<T, BoxedMonitorError>;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("trigger channel disconnected")]
    TriggerChannelClosed,
    #[error("measurement channel disconnected")]
    MeasurementChannelClosed,
    #[error("control channel disconnected")]
    ControlChannelClosed,
    #[error("binding index {0} has no corresponding entry in the instrumentation plan")]
    UnknownBinding(usize),
    #[error("atom index {0} is out of range for this specification's constraint")]
    UnknownAtom(usize),
}

#[derive(Debug)]
pub struct BoxedMonitorError(Box<MonitorError>);

impl std::fmt::Display for BoxedMonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for BoxedMonitorError {}

impl std::ops::Deref for BoxedMonitorError {
    type Target = MonitorError;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<MonitorError> for BoxedMonitorError {
    fn from(value: MonitorError) -> Self {
        BoxedMonitorError(Box::new(value))
    }
}
