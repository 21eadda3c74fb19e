// src/compress.rs
//! Компрессор линий: упрощение Дугласа — Пойкера с сохранением топологии
//!
//! Узлы-стыки (входящие в две и более линии либо являющиеся концом
//! любой линии) не удаляются ни при каком допуске: их потеря молча
//! разорвала бы замыкание колец или соседство территорий. Каждая
//! линия разбивается по своим стыкам, упрощаются только строго
//! внутренние участки.
//!
//! Фаза обхода читает арену и может выполняться параллельно;
//! запись результатов и чистка неиспользуемых узлов идут строго
//! после, в один поток.

use crate::data::{DataSet, Node, ObjectId, Way};
use crate::geometry;
use std::collections::{HashMap, HashSet};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Итоги компрессии для отчётности
#[derive(Debug, Clone, Copy)]
pub struct CompressionReport {
    pub nodes_before: usize,
    pub nodes_after: usize,
}

/// Упрощает все линии арены с допуском `epsilon`
///
/// При `epsilon <= 0` ничего не меняет. После упрощения узлы, на
/// которые не ссылается ни одна линия, удаляются из арены.
pub fn compress_ways(data: &mut DataSet, epsilon: f64) -> CompressionReport {
    let nodes_before = data.nodes.len();
    if epsilon <= 0.0 {
        return CompressionReport {
            nodes_before,
            nodes_after: nodes_before,
        };
    }

    let junctions = junction_nodes(&data.ways);

    // Фаза обхода: только чтение арены
    #[cfg(feature = "parallel")]
    let simplified: Vec<(ObjectId, Vec<ObjectId>)> = data
        .ways
        .par_iter()
        .map(|(id, way)| (*id, simplify_way(way, &junctions, &data.nodes, epsilon)))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let simplified: Vec<(ObjectId, Vec<ObjectId>)> = data
        .ways
        .iter()
        .map(|(id, way)| (*id, simplify_way(way, &junctions, &data.nodes, epsilon)))
        .collect();

    // Фаза записи: строго после обхода, один поток
    for (id, nodes) in simplified {
        if let Some(way) = data.ways.get_mut(&id) {
            way.nodes = nodes;
        }
    }

    purge_unreferenced(data);

    CompressionReport {
        nodes_before,
        nodes_after: data.nodes.len(),
    }
}

/// Узлы, которые запрещено удалять: концы линий и узлы,
/// встречающиеся более чем в одной линии
fn junction_nodes(ways: &HashMap<ObjectId, Way>) -> HashSet<ObjectId> {
    let mut junctions = HashSet::new();
    let mut first_owner: HashMap<ObjectId, ObjectId> = HashMap::new();

    for way in ways.values() {
        if let (Some(&first), Some(&last)) = (way.nodes.first(), way.nodes.last()) {
            junctions.insert(first);
            junctions.insert(last);
        }
        for &node_id in &way.nodes {
            match first_owner.get(&node_id) {
                Some(&owner) if owner != way.id => {
                    junctions.insert(node_id);
                }
                Some(_) => {}
                None => {
                    first_owner.insert(node_id, way.id);
                }
            }
        }
    }
    junctions
}

/// Упрощённая последовательность узлов одной линии
fn simplify_way(
    way: &Way,
    junctions: &HashSet<ObjectId>,
    nodes: &HashMap<ObjectId, Node>,
    epsilon: f64,
) -> Vec<ObjectId> {
    if way.nodes.len() <= 2 {
        return way.nodes.clone();
    }

    let mut result = Vec::with_capacity(way.nodes.len());
    result.push(way.nodes[0]);

    // Разбиение по обязательным точкам: каждый участок между двумя
    // соседними стыками упрощается независимо
    let mut segment_start = 0;
    for i in 1..way.nodes.len() {
        if i == way.nodes.len() - 1 || junctions.contains(&way.nodes[i]) {
            douglas_peucker(&way.nodes[segment_start..=i], nodes, epsilon, &mut result);
            segment_start = i;
        }
    }
    result
}

/// Рекурсивное упрощение участка `segment`
///
/// Первая точка участка уже записана в `out`; функция дописывает
/// сохранённые внутренние точки и последнюю точку.
fn douglas_peucker(
    segment: &[ObjectId],
    nodes: &HashMap<ObjectId, Node>,
    epsilon: f64,
    out: &mut Vec<ObjectId>,
) {
    if segment.len() <= 2 {
        if let Some(&last) = segment.last()
            && segment.len() == 2
        {
            out.push(last);
        }
        return;
    }

    let coord = |id: ObjectId| nodes.get(&id).map(|n| (n.x, n.y));
    let (Some(first), Some(last)) = (coord(segment[0]), coord(segment[segment.len() - 1])) else {
        // участок с неразрешимой ссылкой оставляем как есть
        out.extend_from_slice(&segment[1..]);
        return;
    };

    let mut max_distance = 0.0;
    let mut max_index = 0;
    for (i, &node_id) in segment.iter().enumerate().skip(1).take(segment.len() - 2) {
        let Some(p) = coord(node_id) else {
            out.extend_from_slice(&segment[1..]);
            return;
        };
        let d = geometry::perpendicular_distance(p, first, last);
        if d > max_distance {
            max_distance = d;
            max_index = i;
        }
    }

    if max_distance > epsilon {
        douglas_peucker(&segment[..=max_index], nodes, epsilon, out);
        douglas_peucker(&segment[max_index..], nodes, epsilon, out);
    } else {
        out.push(segment[segment.len() - 1]);
    }
}

/// Удаляет из арены узлы, не используемые ни одной линией
fn purge_unreferenced(data: &mut DataSet) {
    let mut referenced: HashSet<ObjectId> = HashSet::with_capacity(data.nodes.len());
    for way in data.ways.values() {
        referenced.extend(way.nodes.iter().copied());
    }
    data.nodes.retain(|id, _| referenced.contains(id));
}
