// src/area/png.rs
//! Превью карты в PNG
//!
//! Территории заливаются детерминированными цветами (генератор
//! случайных чисел сеется идентификатором территории, цвета
//! стабильны между запусками), дыры закрашиваются фоном, границы
//! всех уровней обводятся тёмными линиями. Ожидает уже
//! спроецированные в пиксели координаты узлов.

use crate::data::{DataSet, Ring};
use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;
use rand::{Rng, SeedableRng};

/// Тёмно-синий фон (вода)
const BACKGROUND: Rgba<u8> = Rgba([20, 20, 60, 255]);
/// Цвет границ
const BORDER: Rgba<u8> = Rgba([15, 15, 30, 255]);

/// Сохраняет превью карты в PNG-файл
pub fn save_preview(
    data: &DataSet,
    territory_level: u8,
    width: u32,
    height: u32,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if width == 0 || height == 0 {
        return Err("preview dimensions must be non-zero".into());
    }
    let mut img: RgbaImage = ImageBuffer::from_pixel(width, height, BACKGROUND);

    // заливка территорий целевого уровня
    for area in data.areas.iter().filter(|a| a.level == territory_level) {
        let fill = area_color(area.id);
        for ring in area.outer_rings() {
            if let Some(polygon) = ring_polygon(data, ring) {
                draw_polygon_mut(&mut img, &polygon, fill);
            }
        }
        for ring in area.inner_rings() {
            if let Some(polygon) = ring_polygon(data, ring) {
                draw_polygon_mut(&mut img, &polygon, BACKGROUND);
            }
        }
    }

    // границы поверх заливки, включая бонусные уровни
    for area in &data.areas {
        for ring in &area.rings {
            let coords = data.ring_coords(ring);
            for pair in coords.windows(2) {
                draw_line_segment_mut(
                    &mut img,
                    (pair[0].0 as f32, pair[0].1 as f32),
                    (pair[1].0 as f32, pair[1].1 as f32),
                    BORDER,
                );
            }
        }
    }

    img.save(path)?;
    Ok(())
}

/// Детерминированный цвет территории в палитре суши
fn area_color(area_id: u32) -> Rgba<u8> {
    let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(u64::from(area_id));
    Rgba([
        rng.gen_range(100..220),
        rng.gen_range(120..255),
        rng.gen_range(50..100),
        255,
    ])
}

/// Кольцо как многоугольник для заливки
///
/// `draw_polygon_mut` требует непустой контур без дублированной
/// замыкающей точки.
fn ring_polygon(data: &DataSet, ring: &Ring) -> Option<Vec<Point<i32>>> {
    let coords = data.ring_coords(ring);
    let mut polygon: Vec<Point<i32>> = Vec::with_capacity(coords.len());
    for (x, y) in coords {
        let p = Point::new(x.round() as i32, y.round() as i32);
        if polygon.last() != Some(&p) {
            polygon.push(p);
        }
    }
    if polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    if polygon.len() < 3 {
        return None;
    }
    Some(polygon)
}

/// Цвета, пригодные для экспорта в метаданные
#[must_use]
pub fn area_color_hex(area_id: u32) -> String {
    let Rgba([r, g, b, _]) = area_color(area_id);
    format!("#{r:02x}{g:02x}{b:02x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_are_deterministic() {
        assert_eq!(area_color(7), area_color(7));
        assert_ne!(area_color(1), area_color(2));
        let hex = area_color_hex(7);
        assert!(hex.starts_with('#'));
        assert_eq!(hex.len(), 7);
    }
}
