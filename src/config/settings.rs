use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

/// Настройки библиотеки.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Отдавать ли новой корневой подписке закэшированное значение
    /// (используется `Publisher::subscribe_default`).
    pub replay_last_value: bool,
    /// Начальная ёмкость списка корневых подписок.
    pub root_capacity: usize,
    /// Уровень логирования по умолчанию.
    pub log_level: String,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            // Добавляем значения по умолчанию
            .set_default("replay_last_value", true)?
            .set_default("root_capacity", 4)?
            .set_default("log_level", "info")?
            // Добавляем переменные окружения с префиксом POTOK_
            .add_source(Environment::with_prefix("POTOK"))
            .build()?;

        // Десериализуем конфигурацию в нашу структуру
        cfg.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            replay_last_value: true,
            root_capacity: 4,
            log_level: "info".to_string(),
        }
    }
}
