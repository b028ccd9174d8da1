//! Global subscriber setup for binaries and services embedding dalkit

use std::str::FromStr;
use std::sync::Once;

use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

use crate::errors::{DalError, DalErrorKind};

/// How dalkit's events should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable lines at `debug`
    Development,
    /// One JSON object per event at `info`
    Production,
    /// Nothing is printed; see `init_test_capture()`
    Test,
}

impl Profile {
    /// Filter used when `RUST_LOG` is unset
    pub fn default_directive(self) -> &'static str {
        match self {
            Profile::Development => "dalkit=debug",
            Profile::Production => "dalkit=info",
            Profile::Test => "off",
        }
    }

    fn filter(self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }
}

impl FromStr for Profile {
    type Err = DalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Profile::Development),
            "prod" | "production" => Ok(Profile::Production),
            "test" => Ok(Profile::Test),
            other => Err(DalError::new(DalErrorKind::Configuration)
                .with_op("parse_profile")
                .with_message(format!("unknown logging profile '{}'", other))),
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Install the global subscriber for `profile`
///
/// Only the first call in a process has any effect. `RUST_LOG` takes
/// precedence over [`Profile::default_directive`].
///
/// ```
/// use dalkit_core::logging_facility::{init, Profile};
///
/// init("development".parse().unwrap_or(Profile::Production));
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let installed = match profile {
            Profile::Development => tracing_subscriber::fmt()
                .with_env_filter(profile.filter())
                .finish()
                .try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_env_filter(profile.filter())
                .finish()
                .try_init(),
            Profile::Test => tracing_subscriber::registry().try_init(),
        };

        // A host application may already own the global subscriber
        if installed.is_err() {
            tracing::debug!("global subscriber already installed, keeping it");
        }
    });
}
