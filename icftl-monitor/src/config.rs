//! Monitor configuration: a `bon`-builder `RuntimeConfig`/`LoggingConfig`
//! split between hosting-level toggles and logging verbosity.

use bon::Builder;

/// Whether the monitor lives for the lifetime of the monitored process, or
/// is spun up fresh per inbound request and torn down once that request's
/// bindings are resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HostingMode {
    #[default]
    WholeProcess,
    PerRequest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ColorConfig {
    On,
    Off,
    #[default]
    Auto,
}

/// Logging configuration, independent of how the monitor itself is hosted.
#[derive(Clone, Copy, Debug, Builder)]
pub struct LoggingConfig {
    #[builder(default)]
    pub color: ColorConfig,
    #[builder(default = false)]
    pub quiet: bool,
    #[builder(default = false)]
    pub debug: bool,
}

/// Top-level runtime configuration for a [`crate::Monitor`].
#[derive(Clone, Copy, Debug, Builder)]
pub struct RuntimeConfig {
    #[builder(default)]
    pub hosting_mode: HostingMode,
    /// Bound on the per-request measurement channel; ignored in
    /// [`HostingMode::WholeProcess`], where the channel is unbounded.
    #[builder(default = 4096)]
    pub channel_capacity: usize,
    #[builder(default)]
    pub logging: LoggingConfigDefaults,
}

/// A plain-data mirror of [`LoggingConfig`] usable as a `Default` field
/// inside [`RuntimeConfig`] (the `bon`-derived builder type for
/// `LoggingConfig` is not itself `Default`).
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingConfigDefaults {
    pub color: ColorConfig,
    pub quiet: bool,
    pub debug: bool,
}

impl RuntimeConfig {
    pub fn get_logging_config(&self) -> LoggingConfig {
        LoggingConfig::builder()
            .color(self.logging.color)
            .quiet(self.logging.quiet)
            .debug(self.logging.debug)
            .build()
    }
}
