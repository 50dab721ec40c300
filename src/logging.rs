use std::io::{self, IsTerminal};

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Console filter for a signed verbosity: negative for `-q`, positive for
/// `-v`. `RUST_LOG` overrides it.
fn console_filter(verbosity: i8) -> &'static str {
    match verbosity {
        i8::MIN..=-2 => "error",
        -1 => "warn",
        0 => "info",
        1 => "info,snipzip=debug",
        2 => "info,snipzip=trace",
        _ => "trace",
    }
}

/// Install the stderr subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_logging(verbosity: i8) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_filter(verbosity)));

    let console_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .without_time()
        .with_target(false)
        .with_level(true)
        .with_filter(env_filter);

    if tracing_subscriber::registry().with(console_layer).try_init().is_err() {
        tracing::debug!("logging already initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(console_filter(-5), "error");
        assert_eq!(console_filter(-1), "warn");
        assert_eq!(console_filter(0), "info");
        assert_eq!(console_filter(1), "info,snipzip=debug");
        assert_eq!(console_filter(9), "trace");
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logging(0);
        init_logging(2);
    }
}
