pub mod interpreter;
pub mod node;
pub mod ops;
pub mod parser;
pub mod scanner;
pub mod scope;
pub mod stream;
pub mod token;
pub mod value;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Installs a stderr log subscriber. `RUST_LOG` selects the filter, e.g.
/// `RUST_LOG=klammer=trace`; without it only warnings are shown. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(filter)
            .init();
    });
}
