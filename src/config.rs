// src/config.rs
//! Конфигурация конвейера сборки карты
//!
//! Параметры управляют всеми этапами: выбором уровня территорий,
//! компрессией линий, фильтрацией мелких территорий и масштабированием.
//! Структура поддерживает сериализацию в TOML/JSON для настройки
//! через конфигурационные файлы.
//!
//! Нарушение конфигурации — фатальная ошибка: [`MapParams::validate`]
//! отклоняет её до запуска конвейера, ни один этап не стартует.

use crate::area::filter::FilterPolicy;
use crate::error::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// Минимальный допустимый admin_level
pub const MIN_LEVEL: u8 = 1;
/// Максимальный допустимый admin_level
pub const MAX_LEVEL: u8 = 12;

/// Основные параметры генерации карты
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapParams {
    /// Уровень границ, используемых как территории (1..=12)
    #[serde(default = "default_territory_level")]
    pub territory_level: u8,

    /// Уровни границ, используемых как бонусные регионы
    /// (пусто — бонусные регионы не собираются)
    #[serde(default)]
    pub bonus_levels: Vec<u8>,

    /// Ширина карты в пикселях (0 — вычисляется из пропорций)
    #[serde(default = "default_width")]
    pub width: u32,

    /// Высота карты в пикселях (0 — вычисляется из пропорций)
    #[serde(default = "default_height")]
    pub height: u32,

    /// Допуск компрессии линий (0 — компрессия отключена)
    #[serde(default)]
    pub compression_epsilon: f64,

    /// Допуск фильтра по относительной площади, доля в (0, 1]
    /// (0 — фильтр отключён)
    #[serde(default)]
    pub filter_epsilon: f64,

    /// Политика починки графа соседства после фильтрации
    #[serde(default)]
    pub filter_policy: FilterPolicy,

    /// Подробный вывод диагностики
    #[serde(default)]
    pub verbose: bool,
}

fn default_territory_level() -> u8 {
    4
}
fn default_width() -> u32 {
    1000
}
fn default_height() -> u32 {
    0
}

impl Default for MapParams {
    fn default() -> Self {
        Self {
            territory_level: 4,
            bonus_levels: Vec::new(),
            width: 1000,
            height: 0,
            compression_epsilon: 0.0,
            filter_epsilon: 0.0,
            filter_policy: FilterPolicy::default(),
            verbose: false,
        }
    }
}

impl MapParams {
    /// Загружает параметры из TOML-файла
    ///
    /// # Пример
    /// ```toml
    /// # map.toml
    /// territory_level = 4
    /// bonus_levels = [2]
    /// width = 1000
    /// compression_epsilon = 0.0001
    /// ```
    pub fn from_toml_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let params: Self = toml::from_str(&contents)?;
        Ok(params)
    }

    /// Проверяет параметры перед запуском конвейера
    ///
    /// Отклоняет уровни вне 1..=12, совпадение бонусного уровня с
    /// уровнем территорий, отрицательные допуски, долю фильтра вне
    /// [0, 1] и нулевые размеры по обеим осям сразу.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&self.territory_level) {
            return Err(MapError::InvalidConfig(format!(
                "territory_level должен быть в диапазоне {MIN_LEVEL}..={MAX_LEVEL}, получено {}",
                self.territory_level
            )));
        }
        for &level in &self.bonus_levels {
            if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
                return Err(MapError::InvalidConfig(format!(
                    "бонусный уровень должен быть в диапазоне {MIN_LEVEL}..={MAX_LEVEL}, получено {level}"
                )));
            }
            if level == self.territory_level {
                return Err(MapError::InvalidConfig(format!(
                    "бонусный уровень {level} совпадает с уровнем территорий"
                )));
            }
        }
        if self.width == 0 && self.height == 0 {
            return Err(MapError::InvalidConfig(
                "ширина и высота не могут быть нулевыми одновременно".to_string(),
            ));
        }
        if self.compression_epsilon < 0.0 || !self.compression_epsilon.is_finite() {
            return Err(MapError::InvalidConfig(format!(
                "compression_epsilon должен быть неотрицательным, получено {}",
                self.compression_epsilon
            )));
        }
        if !(0.0..=1.0).contains(&self.filter_epsilon) {
            return Err(MapError::InvalidConfig(format!(
                "filter_epsilon должен быть долей в диапазоне [0, 1], получено {}",
                self.filter_epsilon
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        assert!(MapParams::default().validate().is_ok());
    }

    #[test]
    fn rejects_level_out_of_range() {
        let params = MapParams {
            territory_level: 0,
            ..MapParams::default()
        };
        assert!(matches!(params.validate(), Err(MapError::InvalidConfig(_))));

        let params = MapParams {
            territory_level: 13,
            ..MapParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_bonus_level_equal_to_territory() {
        let params = MapParams {
            territory_level: 4,
            bonus_levels: vec![2, 4],
            ..MapParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_both_dimensions_zero() {
        let params = MapParams {
            width: 0,
            height: 0,
            ..MapParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_bad_tolerances() {
        let params = MapParams {
            compression_epsilon: -0.1,
            ..MapParams::default()
        };
        assert!(params.validate().is_err());

        let params = MapParams {
            filter_epsilon: 1.5,
            ..MapParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn parses_toml_with_defaults() {
        let params: MapParams = toml::from_str("territory_level = 6").unwrap();
        assert_eq!(params.territory_level, 6);
        assert_eq!(params.width, 1000);
        assert_eq!(params.height, 0);
        assert!(params.bonus_levels.is_empty());
        assert!(params.validate().is_ok());
    }
}
