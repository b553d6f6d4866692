pub mod formats;

use flexi_logger::{Logger, LoggerHandle};

use crate::Error;

/// Install the logger. Level comes from `RUST_LOG`, default `info`.
///
/// Library events are emitted through `tracing`'s `log` bridge and land here.
pub fn init() -> Result<LoggerHandle, Error> {
    let handle = Logger::try_with_env_or_str("info")?
        .format(formats::cli_format)
        .log_to_stderr()
        .start()?;

    Ok(handle)
}
