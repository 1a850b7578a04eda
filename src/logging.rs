//! Structured logging setup.

use std::env;
use std::io;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter when no level is passed.
pub const LOG_ENV: &str = "MILPKIT_LOG";
/// Environment variable selecting `pretty` or `json` output.
pub const LOG_FORMAT_ENV: &str = "MILPKIT_LOG_FORMAT";

/// Installs a global `tracing` subscriber writing to stderr.
///
/// When `level` is `None` the filter is read from `MILPKIT_LOG`, falling back
/// to `warn`. The output format comes from `MILPKIT_LOG_FORMAT`. Returns
/// `Ok(false)` if a subscriber was already installed.
pub fn init(level: Option<&str>) -> Result<bool, String> {
    let format = env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "pretty".to_string());
    init_with(level, &format)
}

/// [`init`] with an explicit output format, `pretty` or `json`.
///
/// The filter and format are checked before looking for an existing
/// subscriber, so a bad setting is reported even when logging is already on.
pub fn init_with(level: Option<&str>, format: &str) -> Result<bool, String> {
    let level_value = level
        .map(str::to_string)
        .or_else(|| env::var(LOG_ENV).ok())
        .unwrap_or_else(|| "warn".to_string());

    let filter = if level_value.eq_ignore_ascii_case("off") {
        EnvFilter::default().add_directive(LevelFilter::OFF.into())
    } else {
        EnvFilter::try_new(&level_value).map_err(|err| format!("Invalid log filter: {err}"))?
    };

    let json = if format.eq_ignore_ascii_case("json") {
        true
    } else if format.eq_ignore_ascii_case("pretty") {
        false
    } else {
        return Err(format!(
            "Invalid {LOG_FORMAT_ENV} '{format}' (expected 'json' or 'pretty')"
        ));
    };

    if tracing::dispatcher::has_been_set() {
        return Ok(false);
    }

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr).json())
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr).compact())
            .try_init()
    };
    installed.map_err(|err| format!("Failed to initialize logging: {err}"))?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_is_rejected() {
        let err = init_with(Some("info"), "xml").unwrap_err();
        assert!(err.contains(LOG_FORMAT_ENV), "{err}");
        assert!(err.contains("'xml'"));
    }

    #[test]
    fn bad_filter_is_rejected() {
        let err = init_with(Some("milpkit=loudest"), "pretty").unwrap_err();
        assert!(err.starts_with("Invalid log filter"), "{err}");
    }

    #[test]
    fn second_init_is_a_no_op() {
        init_with(Some("off"), "pretty").unwrap();
        assert_eq!(init_with(Some("off"), "json"), Ok(false));
    }
}
