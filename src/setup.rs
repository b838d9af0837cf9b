use std::{env, error::Error};

use tracing_core::LevelFilter;
use tracing_subscriber::{
    filter::ParseError, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

use crate::{format::JsonFormat, logger::CALL_LOG_TARGET};

/// Installs the global `tracing` subscriber that [`TracingSink`] writes to.
///
/// The filter comes from `RUST_LOG`. Without it everything is filtered at
/// `info`, except call lines, which pass at any level: their level was
/// already checked by the call's [`Logger`], possibly raised by the log level
/// header. Lines are written as JSON when `LOG_FORMAT=json`, human readable
/// otherwise. The service name is taken from `SERVICE_NAME`, falling back to
/// the cargo package name.
///
/// This should generally be the first statement of a gateway binary's main
/// function.
///
/// [`TracingSink`]: crate::logger::TracingSink
/// [`Logger`]: crate::logger::Logger
pub fn setup() -> Result<(), Box<dyn Error>> {
    let service = env::var("SERVICE_NAME").unwrap_or(env!("CARGO_PKG_NAME").to_string());
    let json = env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => default_filter()?,
    };
    let output = if json {
        fmt::layer().event_format(JsonFormat).boxed()
    } else {
        fmt::layer().boxed()
    };

    Registry::default().with(filter).with(output).try_init()?;

    tracing::info!(%service, "logging initialised");
    Ok(())
}

fn default_filter() -> Result<EnvFilter, ParseError> {
    Ok(EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
        .add_directive(format!("{CALL_LOG_TARGET}=trace").parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_lines_pass_the_default_filter() {
        let filter = default_filter().unwrap().to_string();
        assert!(filter.contains("gateway_log::calls=trace"), "{filter}");
    }
}
