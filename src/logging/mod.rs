pub mod config;
mod filters;

pub use config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Инициализация логирования с конфигурацией.
///
/// Вызывается один раз на процесс: повторная установка глобального
/// подписчика вернёт ошибку.
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = filters::build_filter_from_config(&config);
    let mut layers = Vec::new();

    // Console layer
    if config.console_enabled {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .boxed();
        layers.push(console_layer);
    }

    // Initialize subscriber
    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        console_enabled = config.console_enabled,
        "Logging system initialized"
    );

    Ok(())
}

/// Инициализация с настройками по умолчанию.
pub fn init_logging_simple() {
    let config = LoggingConfig::default();
    if let Err(e) = init_logging(config) {
        eprintln!("Failed to initialize logging: {e}");
    }
}
