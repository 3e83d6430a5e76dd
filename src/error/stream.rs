use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

/// Результат операций внутри потока значений.
pub type StreamResult<T> = Result<T, StreamError>;

/// Ошибка, поднятая пользовательским колбэком оператора.
///
/// Ошибка не фатальна: она превращается в событие обработки ошибок
/// на узле, где возникла, и течёт строго вниз по его поддереву.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("callback failed: {0}")]
    Callback(String),

    #[error("value parse error: {0}")]
    Parse(String),

    #[error("transform failed: {0}")]
    Transform(String),
}

impl StreamError {
    /// Конструктор для ошибок произвольных колбэков.
    pub fn callback(msg: impl Into<String>) -> Self {
        StreamError::Callback(msg.into())
    }

    /// Конструктор для ошибок трансформаций (map-семейство).
    pub fn transform(msg: impl Into<String>) -> Self {
        StreamError::Transform(msg.into())
    }
}

// === Преобразования ===

impl From<ParseIntError> for StreamError {
    fn from(err: ParseIntError) -> Self {
        StreamError::Parse(err.to_string())
    }
}

impl From<ParseFloatError> for StreamError {
    fn from(err: ParseFloatError) -> Self {
        StreamError::Parse(err.to_string())
    }
}
