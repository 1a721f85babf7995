//! stderr logging with a level that can be raised at runtime.

use thiserror::Error;
use tracing::Subscriber;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot install the log subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),

    #[error("cannot change the log level: {0}")]
    Reload(#[from] reload::Error),
}

/// Handle to the installed log filter.
#[derive(Debug, Clone)]
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    /// Installs the global subscriber. `RUST_LOG` wins over `default` when
    /// set.
    pub fn init(default: LevelFilter) -> Result<Self, LoggingError> {
        let (subscriber, handle) = Self::subscriber(default);
        subscriber.try_init()?;
        Ok(handle)
    }

    /// Replaces the current filter with a plain `level` filter.
    pub fn set_level(&self, level: LevelFilter) -> Result<(), LoggingError> {
        self.filter
            .reload(EnvFilter::default().add_directive(level.into()))?;
        Ok(())
    }

    pub fn enable_verbose(&self) -> Result<(), LoggingError> {
        self.set_level(LevelFilter::DEBUG)
    }

    fn subscriber(default: LevelFilter) -> (impl Subscriber + Send + Sync + 'static, Self) {
        let filter = EnvFilter::builder()
            .with_default_directive(default.into())
            .from_env_lossy();
        let (filter, handle) = reload::Layer::new(filter);
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        );
        (subscriber, Self { filter: handle })
    }
}
