//! Tracing subscriber setup.

use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{WorkerError, WorkerResult};

/// Install the global subscriber.
///
/// Human-readable ANSI output by default, JSON lines when
/// `LOG_FORMAT=json`. `RUST_LOG` directives are honoured on top of
/// `mixdeck=info`.
pub fn init_tracing() -> WorkerResult<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let directive = "mixdeck=info"
        .parse::<Directive>()
        .map_err(|e| WorkerError::Logging(format!("invalid directive: {}", e)))?;
    let env_filter = EnvFilter::from_default_env().add_directive(directive);

    let result = if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .try_init()
    };

    result.map_err(|e| WorkerError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error_not_a_panic() {
        let _ = init_tracing();
        assert!(init_tracing().is_err());
    }
}
