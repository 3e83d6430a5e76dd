pub mod stream;

pub use stream::{StreamError, StreamResult};
