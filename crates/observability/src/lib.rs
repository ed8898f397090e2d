//! Process-wide observability setup.

mod tracing_init;

pub use tracing_init::init;
