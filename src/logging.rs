// Tracing setup for the command line front end

use crate::error::{EngineError, EngineResult};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "loopsmith=info";

/// Installs a compact stderr subscriber
///
/// `RUST_LOG` wins when set; otherwise engine events at info and above are
/// shown. Calling this twice is an error.
pub fn setup_tracing() -> EngineResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| EngineError::InvalidConfig(format!("failed to initialise tracing: {err}")))
}
