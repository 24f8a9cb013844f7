//! Log output setup for the binary.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a global subscriber writing to stderr.
///
/// The filter comes from `RUST_LOG` when it is set, and from
/// `default_filter` otherwise.
pub fn init(default_filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).or_raise(|| ErrorKind::Logging)?,
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init()
        .or_raise(|| ErrorKind::Logging)?;
    tracing::debug!("Logging initialised");
    Ok(())
}
