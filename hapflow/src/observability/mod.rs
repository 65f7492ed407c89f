//! Observability utilities: subscriber installation and span timing.

mod logging;
mod timer;

pub use logging::{init_tracing, LogFormat};
pub use timer::SpanTimer;
