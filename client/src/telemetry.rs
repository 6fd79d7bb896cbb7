//! Tracing subscriber installation for the binary.

use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a global fmt subscriber filtered by `RUST_LOG` (`warn` when unset).
/// A second installation is logged and otherwise ignored.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(error) = installed {
        warn!(%error, "tracing init failed");
    }
}
