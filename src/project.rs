// src/project.rs
//! Проекционный конвейер
//!
//! Проекция — чистая функция `(x, y) -> (x, y)` без состояния помимо
//! собственных параметров. [`Projector`] применяет проекции жадно,
//! в порядке вызова, переписывая координаты узлов на месте; ленивой
//! композиции и отката нет.
//!
//! Штатный порядок для карты: градусы → радианы → сферическая
//! проекция Меркатора → нормализация в единичный квадрат по
//! ограничивающему прямоугольнику → пересчёт в целевые пиксели.

use crate::data::{Node, ObjectId};
use crate::geometry::Rectangle;
use std::collections::HashMap;

/// Широта обрезки Меркатора (за ней проекция уходит в бесконечность)
const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// Чистое преобразование одной координаты
pub trait Projection {
    fn project(&self, x: f64, y: f64) -> (f64, f64);
}

/// Перевод градусов в радианы
#[derive(Debug, Clone, Copy, Default)]
pub struct RadianProjection;

impl Projection for RadianProjection {
    fn project(&self, x: f64, y: f64) -> (f64, f64) {
        (x.to_radians(), y.to_radians())
    }
}

/// Сферическая проекция Меркатора
///
/// Вход — долгота/широта в радианах; широта обрезается по
/// [`MAX_MERCATOR_LATITUDE`], иначе полюса дают бесконечность.
#[derive(Debug, Clone, Copy, Default)]
pub struct MercatorProjection;

impl Projection for MercatorProjection {
    fn project(&self, x: f64, y: f64) -> (f64, f64) {
        let max_lat = MAX_MERCATOR_LATITUDE.to_radians();
        let lat = y.clamp(-max_lat, max_lat);
        (x, (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln())
    }
}

/// Нормализация интервалов `x` и `y` в единичный квадрат
#[derive(Debug, Clone, Copy)]
pub struct UnitProjection {
    pub x: (f64, f64),
    pub y: (f64, f64),
}

impl Projection for UnitProjection {
    fn project(&self, x: f64, y: f64) -> (f64, f64) {
        (remap(x, self.x, (0.0, 1.0)), remap(y, self.y, (0.0, 1.0)))
    }
}

/// Линейный пересчёт из исходных интервалов в целевые
#[derive(Debug, Clone, Copy)]
pub struct IntervalProjection {
    pub source_x: (f64, f64),
    pub source_y: (f64, f64),
    pub target_x: (f64, f64),
    pub target_y: (f64, f64),
}

impl Projection for IntervalProjection {
    fn project(&self, x: f64, y: f64) -> (f64, f64) {
        (
            remap(x, self.source_x, self.target_x),
            remap(y, self.source_y, self.target_y),
        )
    }
}

fn remap(value: f64, source: (f64, f64), target: (f64, f64)) -> f64 {
    let span = source.1 - source.0;
    if span == 0.0 {
        return target.0;
    }
    (value - source.0) / span * (target.1 - target.0) + target.0
}

/// Применяет проекции к координатам узлов на месте
pub struct Projector<'a> {
    nodes: &'a mut HashMap<ObjectId, Node>,
}

impl<'a> Projector<'a> {
    pub fn new(nodes: &'a mut HashMap<ObjectId, Node>) -> Self {
        Self { nodes }
    }

    /// Жадно применяет проекцию ко всем узлам
    pub fn apply_projection<P: Projection>(&mut self, projection: &P) {
        for node in self.nodes.values_mut() {
            let (x, y) = projection.project(node.x, node.y);
            node.x = x;
            node.y = y;
        }
    }

    /// Ограничивающий прямоугольник текущих координат
    #[must_use]
    pub fn bounds(&self) -> Rectangle {
        Rectangle::from_points(self.nodes.values().map(|n| (n.x, n.y)))
    }
}

/// Достраивает недостающий размер карты по пропорциям границ
///
/// Ровно один из размеров может быть нулевым; он вычисляется из
/// отношения сторон `bounds`. Оба нулевых размера отклоняет
/// валидация конфигурации до запуска конвейера.
#[must_use]
pub fn resolve_dimensions(bounds: &Rectangle, width: u32, height: u32) -> (u32, u32) {
    debug_assert!(width > 0 || height > 0);
    if width == 0 && bounds.height() > 0.0 {
        let width = (bounds.width() / bounds.height() * f64::from(height)).round() as u32;
        (width.max(1), height)
    } else if height == 0 && bounds.width() > 0.0 {
        let height = (bounds.height() / bounds.width() * f64::from(width)).round() as u32;
        (width, height.max(1))
    } else {
        (width.max(1), height.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(coords: &[(ObjectId, f64, f64)]) -> HashMap<ObjectId, Node> {
        coords
            .iter()
            .map(|&(id, x, y)| (id, Node { id, x, y }))
            .collect()
    }

    #[test]
    fn radians_then_mercator() {
        let mut map = nodes(&[(1, 90.0, 0.0)]);
        let mut projector = Projector::new(&mut map);
        projector.apply_projection(&RadianProjection);
        projector.apply_projection(&MercatorProjection);
        let n = &map[&1];
        assert!((n.x - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        // на экваторе y = 0
        assert!(n.y.abs() < 1e-12);
    }

    #[test]
    fn mercator_is_finite_at_poles() {
        let mut map = nodes(&[(1, 0.0, 90.0), (2, 0.0, -90.0)]);
        let mut projector = Projector::new(&mut map);
        projector.apply_projection(&RadianProjection);
        projector.apply_projection(&MercatorProjection);
        assert!(map[&1].y.is_finite());
        assert!(map[&2].y.is_finite());
    }

    #[test]
    fn unit_and_interval_scale_to_pixels() {
        let mut map = nodes(&[(1, 2.0, 10.0), (2, 4.0, 20.0)]);
        let mut projector = Projector::new(&mut map);
        let bounds = projector.bounds();
        projector.apply_projection(&UnitProjection {
            x: (bounds.min_x, bounds.max_x),
            y: (bounds.min_y, bounds.max_y),
        });
        projector.apply_projection(&IntervalProjection {
            source_x: (0.0, 1.0),
            source_y: (0.0, 1.0),
            target_x: (0.0, 100.0),
            target_y: (0.0, 50.0),
        });
        assert_eq!((map[&1].x, map[&1].y), (0.0, 0.0));
        assert_eq!((map[&2].x, map[&2].y), (100.0, 50.0));
    }

    #[test]
    fn normalize_and_scale_twice_is_noop() {
        let mut map = nodes(&[(1, 0.0, 0.0), (2, 640.0, 480.0), (3, 320.0, 120.0)]);
        let mut projector = Projector::new(&mut map);

        // координаты уже в целевых границах; повторный проход
        // нормализация + масштаб с теми же границами ничего не меняет
        for _ in 0..2 {
            let bounds = projector.bounds();
            projector.apply_projection(&UnitProjection {
                x: (bounds.min_x, bounds.max_x),
                y: (bounds.min_y, bounds.max_y),
            });
            projector.apply_projection(&IntervalProjection {
                source_x: (0.0, 1.0),
                source_y: (0.0, 1.0),
                target_x: (0.0, 640.0),
                target_y: (0.0, 480.0),
            });
        }
        assert!((map[&3].x - 320.0).abs() < 1e-9);
        assert!((map[&3].y - 120.0).abs() < 1e-9);
    }

    #[test]
    fn auto_height_follows_aspect_ratio() {
        let bounds = Rectangle::from_points(vec![(0.0, 0.0), (2.0, 1.0)]);
        assert_eq!(resolve_dimensions(&bounds, 1000, 0), (1000, 500));
        assert_eq!(resolve_dimensions(&bounds, 0, 500), (1000, 500));
        assert_eq!(resolve_dimensions(&bounds, 800, 600), (800, 600));
    }

    #[test]
    fn degenerate_interval_maps_to_target_start() {
        let p = UnitProjection {
            x: (3.0, 3.0),
            y: (0.0, 1.0),
        };
        assert_eq!(p.project(3.0, 0.5), (0.0, 0.5));
    }
}
