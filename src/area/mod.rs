// src/area/mod.rs
//! Сборка территорий и операции над ними

pub mod assemble;
pub mod filter;
pub mod graph;
pub mod png;

use crate::data::{Area, Node, ObjectId, Ring};
use crate::geometry::{self, Point};
use std::collections::HashMap;

/// Ориентированная площадь кольца по координатам его узлов
#[must_use]
pub fn ring_area(ring: &Ring, nodes: &HashMap<ObjectId, Node>) -> f64 {
    let coords = ring_coords(ring, nodes);
    geometry::signed_area(&coords)
}

/// Координаты кольца в порядке обхода
#[must_use]
pub fn ring_coords(ring: &Ring, nodes: &HashMap<ObjectId, Node>) -> Vec<Point> {
    ring.nodes
        .iter()
        .filter_map(|id| nodes.get(id).map(|n| (n.x, n.y)))
        .collect()
}

/// Площадь территории: внешние кольца минус дыры
#[must_use]
pub fn area_surface(area: &Area, nodes: &HashMap<ObjectId, Node>) -> f64 {
    let outer: f64 = area
        .outer_rings()
        .map(|r| ring_area(r, nodes).abs())
        .sum();
    let inner: f64 = area
        .inner_rings()
        .map(|r| ring_area(r, nodes).abs())
        .sum();
    (outer - inner).max(0.0)
}

/// Опорная точка территории для проверок вложенности
///
/// Среднее вершин первого внешнего кольца; если оно выпало наружу
/// (сильно вогнутый контур), берётся середина первого ребра,
/// сдвинутая к среднему. Для административных границ этого
/// приближения достаточно.
#[must_use]
pub fn representative_point(area: &Area, nodes: &HashMap<ObjectId, Node>) -> Option<Point> {
    let ring = area.outer_rings().next()?;
    let coords = ring_coords(ring, nodes);
    if coords.len() < 3 {
        return None;
    }
    let centroid = vertex_mean(&coords);
    if geometry::point_in_polygon(centroid, &coords) {
        return Some(centroid);
    }
    let mid = (
        (coords[0].0 + coords[1].0) / 2.0,
        (coords[0].1 + coords[1].1) / 2.0,
    );
    let nudged = (
        mid.0 + (centroid.0 - mid.0) * 1e-6,
        mid.1 + (centroid.1 - mid.1) * 1e-6,
    );
    Some(nudged)
}

fn vertex_mean(coords: &[Point]) -> Point {
    // замыкающий дубликат не учитываем
    let slice = if coords.len() > 1 && coords.first() == coords.last() {
        &coords[..coords.len() - 1]
    } else {
        coords
    };
    let n = slice.len() as f64;
    let sum_x: f64 = slice.iter().map(|p| p.0).sum();
    let sum_y: f64 = slice.iter().map(|p| p.1).sum();
    (sum_x / n, sum_y / n)
}
