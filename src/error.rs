// src/error.rs
//! Ошибки уровня конвейера
//!
//! Ошибки отдельных сущностей (незамкнутые отношения, висячие ссылки)
//! сюда не попадают — они накапливаются в [`crate::data::Diagnostics`]
//! и не прерывают обработку остальных объектов.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    /// Недопустимая конфигурация: конвейер не запускается
    #[error("недопустимая конфигурация: {0}")]
    InvalidConfig(String),

    #[error("ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("ошибка разбора JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ошибка разбора TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, MapError>;
