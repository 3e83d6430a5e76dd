use crate::config::Settings;

/// Конфигурация логирования.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Уровень по умолчанию для событий крейта (trace/debug/info/warn/error).
    pub level: String,
    /// Включён ли консольный вывод.
    pub console_enabled: bool,
}

impl LoggingConfig {
    /// Собирает конфигурацию логирования из общих настроек библиотеки.
    pub fn from_settings(settings: &Settings) -> Self {
        LoggingConfig {
            level: settings.log_level.clone(),
            console_enabled: true,
        }
    }

    /// Директива фильтра вида `potok=<level>`.
    pub fn build_filter_directive(&self) -> String {
        format!("potok={}", self.level)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            console_enabled: true,
        }
    }
}
