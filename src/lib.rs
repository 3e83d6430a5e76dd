/// Library configuration loading.
pub mod config;
/// Common error types: stream callback failures.
pub mod error;
/// Flexible logging (filters, console sink).
pub mod logging;
/// Pub/Sub: Publisher, Subscription, stream operators.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use config::Settings;
/// Operation errors and result types.
pub use error::{StreamError, StreamResult};
/// Logging setup.
pub use logging::{init_logging, init_logging_simple, LoggingConfig};
/// Pub/Sub API.
pub use pubsub::{Publisher, Subscription};
