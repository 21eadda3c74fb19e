// src/area/assemble.rs
//! Сборка территорий из отношений
//!
//! Два алгоритма с разными входными контрактами:
//! - [`assemble_territories`] собирает территории целевого уровня из
//!   сырых линий: члены отношения сцепляются концами в замкнутые
//!   кольца, кольца классифицируются на внешние и дыры;
//! - [`assemble_bonus_areas`] собирает бонусные регионы поверх уже
//!   готовых территорий: члены определяются пространственной
//!   вложенностью, их внешние границы объединяются сокращением
//!   общих рёбер.
//!
//! Ошибка сборки одного отношения не прерывает остальные: отношение
//! попадает в список незавершённых, уже замкнутые кольца сохраняются.

use crate::area::{representative_point, ring_coords};
use crate::data::{Area, DataSet, Node, ObjectId, Ring, Role, Way};
use crate::geometry::{self, Point};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Результат одной фазы сборки
#[derive(Debug, Default)]
pub struct AssemblyOutcome {
    pub areas: Vec<Area>,
    /// Отношения, чьи границы не удалось полностью собрать
    pub incomplete: Vec<ObjectId>,
}

impl AssemblyOutcome {
    fn note_incomplete(&mut self, relation: ObjectId) {
        if !self.incomplete.contains(&relation) {
            self.incomplete.push(relation);
        }
    }
}

/// Собирает территории из отношений уровня `level`
///
/// На каждое отношение с хотя бы одним замкнутым внешним кольцом
/// создаётся одна территория. Идентификаторы продолжают нумерацию
/// уже существующих территорий арены.
#[must_use]
pub fn assemble_territories(data: &DataSet, level: u8) -> AssemblyOutcome {
    let mut outcome = AssemblyOutcome::default();
    let mut next_id = next_area_id(&data.areas);

    for relation in data.relations.iter().filter(|r| r.level == level) {
        let member_ids: Vec<ObjectId> = relation.members.iter().map(|m| m.way).collect();
        let stitched = stitch_ways_to_rings(&data.ways, &member_ids);
        if !stitched.complete {
            outcome.note_incomplete(relation.id);
        }

        let rings = classify_rings(stitched.rings, &data.nodes);
        if rings.iter().any(|r| r.role == Role::Outer) {
            outcome.areas.push(Area {
                id: next_id,
                name: relation.name.clone(),
                level,
                rings,
                relations: vec![relation.id],
            });
            next_id += 1;
        } else {
            outcome.note_incomplete(relation.id);
        }
    }
    outcome
}

/// Собирает бонусные регионы уровней `levels` поверх готовых территорий
///
/// Контур бонусного отношения сцепляется из его собственных линий,
/// но сам по себе территорией не становится: он лишь отбирает члены —
/// существующие территории, чья опорная точка лежит внутри контура.
/// Кольца нового региона — объединение внешних границ членов; части,
/// не смежные друг с другом, остаются отдельными кольцами одной
/// территории. Существующие территории не удаляются и не
/// перенумеровываются.
#[must_use]
pub fn assemble_bonus_areas(data: &DataSet, levels: &[u8]) -> AssemblyOutcome {
    let mut outcome = AssemblyOutcome::default();
    let mut next_id = next_area_id(&data.areas);

    for relation in data.relations.iter().filter(|r| levels.contains(&r.level)) {
        let member_ids: Vec<ObjectId> = relation.members.iter().map(|m| m.way).collect();
        let stitched = stitch_ways_to_rings(&data.ways, &member_ids);
        if !stitched.complete {
            outcome.note_incomplete(relation.id);
        }
        if stitched.rings.is_empty() {
            outcome.note_incomplete(relation.id);
            continue;
        }
        let footprint = classify_rings(stitched.rings, &data.nodes);

        let members: Vec<&Area> = data
            .areas
            .iter()
            .filter(|area| {
                representative_point(area, &data.nodes)
                    .is_some_and(|p| footprint_contains(&footprint, &data.nodes, p))
            })
            .collect();
        if members.is_empty() {
            outcome.note_incomplete(relation.id);
            continue;
        }

        let rings = merge_member_boundaries(&members, &data.nodes);
        if rings.iter().any(|r| r.role == Role::Outer) {
            outcome.areas.push(Area {
                id: next_id,
                name: relation.name.clone(),
                level: relation.level,
                rings,
                relations: vec![relation.id],
            });
            next_id += 1;
        } else {
            outcome.note_incomplete(relation.id);
        }
    }
    outcome
}

fn next_area_id(areas: &[Area]) -> u32 {
    areas.iter().map(|a| a.id).max().map_or(0, |m| m + 1)
}

/// Итог сцепления линий в кольца
struct StitchOutcome {
    rings: Vec<Vec<ObjectId>>,
    /// false, если часть членов не удалось замкнуть или разрешить
    complete: bool,
}

/// Сцепляет линии концами в замкнутые кольца
///
/// Совпадение концов ненаправленное: линия может быть пройдена в
/// любом направлении. Цепочка, не замкнувшаяся после исчерпания
/// членов, отбрасывается и помечает результат как незавершённый.
fn stitch_ways_to_rings(ways: &HashMap<ObjectId, Way>, way_ids: &[ObjectId]) -> StitchOutcome {
    let mut complete = true;
    let mut rings: Vec<Vec<ObjectId>> = Vec::new();

    let mut segments: Vec<&[ObjectId]> = Vec::with_capacity(way_ids.len());
    for way_id in way_ids {
        match ways.get(way_id) {
            // уже замкнутая линия — готовое кольцо, в сцеплении не участвует
            Some(way) if way.is_closed() && way.nodes.len() >= 4 => {
                rings.push(way.nodes.clone());
            }
            Some(way) if way.nodes.len() >= 2 => segments.push(&way.nodes),
            _ => complete = false,
        }
    }

    // Индекс концов: узел -> [(сегмент, является началом)]
    let mut endpoint_index: HashMap<ObjectId, Vec<(usize, bool)>> = HashMap::new();
    for (idx, seg) in segments.iter().enumerate() {
        endpoint_index.entry(seg[0]).or_default().push((idx, true));
        endpoint_index
            .entry(seg[seg.len() - 1])
            .or_default()
            .push((idx, false));
    }

    let mut used = vec![false; segments.len()];

    for start_idx in 0..segments.len() {
        if used[start_idx] {
            continue;
        }

        let mut ring: Vec<ObjectId> = Vec::new();
        let mut current_idx = start_idx;
        let mut forward = true;

        loop {
            used[current_idx] = true;
            let seg = segments[current_idx];

            // дубликат стыковочного узла не добавляем
            let skip = usize::from(!ring.is_empty());
            if forward {
                ring.extend(seg.iter().skip(skip));
            } else {
                ring.extend(seg.iter().rev().skip(skip));
            }

            if ring.len() >= 4 && ring.first() == ring.last() {
                break;
            }

            // продолжение цепочки: неиспользованный сегмент с тем же концом
            let tail = *ring.last().unwrap_or(&0);
            let next = endpoint_index
                .get(&tail)
                .and_then(|candidates| candidates.iter().find(|(idx, _)| !used[*idx]));

            match next {
                Some(&(idx, is_start)) => {
                    current_idx = idx;
                    forward = is_start;
                }
                None => break,
            }
        }

        if ring.len() >= 4 && ring.first() == ring.last() {
            rings.push(ring);
        } else {
            // незамкнутая цепочка
            complete = false;
        }
    }

    StitchOutcome { rings, complete }
}

/// Классифицирует кольца одного отношения на внешние и дыры
///
/// Кольцо — дыра, если оно вложено в нечётное число других колец того
/// же отношения. Ориентация нормализуется: внешние кольца против
/// часовой стрелки, дыры — по часовой. Кольца нулевой площади
/// отбрасываются.
fn classify_rings(raw: Vec<Vec<ObjectId>>, nodes: &HashMap<ObjectId, Node>) -> Vec<Ring> {
    let coords: Vec<Vec<Point>> = raw
        .iter()
        .map(|ring| {
            ring.iter()
                .filter_map(|id| nodes.get(id).map(|n| (n.x, n.y)))
                .collect()
        })
        .collect();
    let id_sets: Vec<HashSet<ObjectId>> = raw
        .iter()
        .map(|ring| ring.iter().copied().collect())
        .collect();

    let mut rings = Vec::with_capacity(raw.len());
    for (i, node_ids) in raw.iter().enumerate() {
        let area = geometry::signed_area(&coords[i]);
        if area == 0.0 || coords[i].len() < 4 {
            continue;
        }

        let probe = probe_point(node_ids, &coords[i], &id_sets, i);
        let depth = (0..raw.len())
            .filter(|&j| j != i && geometry::point_in_polygon(probe, &coords[j]))
            .count();
        let role = if depth % 2 == 1 { Role::Inner } else { Role::Outer };

        // нормализация ориентации: внешние CCW, дыры CW
        let ccw = area > 0.0;
        let mut node_ids = node_ids.clone();
        if (role == Role::Outer && !ccw) || (role == Role::Inner && ccw) {
            node_ids.reverse();
        }
        rings.push(Ring {
            nodes: node_ids,
            role,
        });
    }
    rings
}

/// Точка кольца `i` для проверки вложенности в другие кольца
///
/// Предпочитается вершина, не принадлежащая ни одному другому кольцу:
/// общая вершина лежала бы ровно на чужой границе.
fn probe_point(
    node_ids: &[ObjectId],
    coords: &[Point],
    id_sets: &[HashSet<ObjectId>],
    own: usize,
) -> Point {
    for (k, node_id) in node_ids.iter().enumerate() {
        let shared = id_sets
            .iter()
            .enumerate()
            .any(|(j, set)| j != own && set.contains(node_id));
        if !shared && k < coords.len() {
            return coords[k];
        }
    }
    coords[0]
}

/// Проверка точки по правилу чётности относительно всех колец контура
fn footprint_contains(rings: &[Ring], nodes: &HashMap<ObjectId, Node>, p: Point) -> bool {
    let depth = rings
        .iter()
        .filter(|ring| geometry::point_in_polygon(p, &ring_coords(ring, nodes)))
        .count();
    depth % 2 == 1
}

/// Объединяет внешние границы территорий сокращением общих рёбер
///
/// Ребро, принадлежащее двум членам, лежит внутри объединения и
/// исчезает; оставшиеся рёбра сцепляются обратно в кольца. Несвязные
/// части дают несколько колец, анклавы внутри группы — дыры.
fn merge_member_boundaries(members: &[&Area], nodes: &HashMap<ObjectId, Node>) -> Vec<Ring> {
    let mut edge_use: HashMap<(ObjectId, ObjectId), u32> = HashMap::new();
    for area in members {
        for ring in area.outer_rings() {
            for pair in ring.nodes.windows(2) {
                if pair[0] == pair[1] {
                    continue;
                }
                let key = (pair[0].min(pair[1]), pair[0].max(pair[1]));
                *edge_use.entry(key).or_insert(0) += 1;
            }
        }
    }

    // Смежность по выжившим рёбрам; BTreeMap ради детерминизма обхода
    let mut adjacency: BTreeMap<ObjectId, Vec<ObjectId>> = BTreeMap::new();
    for (&(a, b), &count) in &edge_use {
        if count == 1 {
            adjacency.entry(a).or_default().push(b);
            adjacency.entry(b).or_default().push(a);
        }
    }
    for neighbors in adjacency.values_mut() {
        neighbors.sort_unstable();
    }

    let mut used: HashSet<(ObjectId, ObjectId)> = HashSet::new();
    let starts: Vec<ObjectId> = adjacency.keys().copied().collect();
    let mut raw_rings: Vec<Vec<ObjectId>> = Vec::new();

    for start in starts {
        loop {
            // обход цикла по неиспользованным рёбрам
            let mut ring = vec![start];
            let mut current = start;
            let closed = loop {
                let next = adjacency.get(&current).and_then(|neighbors| {
                    neighbors.iter().copied().find(|&n| {
                        !used.contains(&(current.min(n), current.max(n)))
                    })
                });
                let Some(next) = next else {
                    break false;
                };
                used.insert((current.min(next), current.max(next)));
                ring.push(next);
                current = next;
                if current == start {
                    break true;
                }
            };

            if closed && ring.len() >= 4 {
                raw_rings.push(ring);
            } else {
                break;
            }
        }
    }

    classify_rings(raw_rings, nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::area_surface;
    use crate::data::{Member, Relation};
    use crate::reader::dataset_from_parts;

    fn node(id: ObjectId, x: f64, y: f64) -> Node {
        Node { id, x, y }
    }

    fn way(id: ObjectId, nodes: &[ObjectId]) -> Way {
        Way {
            id,
            nodes: nodes.to_vec(),
        }
    }

    fn relation(id: ObjectId, level: u8, ways: &[ObjectId]) -> Relation {
        Relation {
            id,
            level,
            name: format!("rel_{id}"),
            members: ways
                .iter()
                .map(|&w| Member {
                    way: w,
                    role: Role::Outer,
                })
                .collect(),
        }
    }

    /// Единичный квадрат из четырёх отдельных линий
    fn unit_square_dataset() -> DataSet {
        dataset_from_parts(
            vec![
                node(1, 0.0, 0.0),
                node(2, 1.0, 0.0),
                node(3, 1.0, 1.0),
                node(4, 0.0, 1.0),
            ],
            vec![
                way(10, &[1, 2]),
                way(11, &[2, 3]),
                way(12, &[3, 4]),
                way(13, &[4, 1]),
            ],
            vec![relation(100, 4, &[10, 11, 12, 13])],
        )
    }

    #[test]
    fn assembles_unit_square() {
        let data = unit_square_dataset();
        let outcome = assemble_territories(&data, 4);

        assert!(outcome.incomplete.is_empty());
        assert_eq!(outcome.areas.len(), 1);
        let area = &outcome.areas[0];
        assert_eq!(area.rings.len(), 1);
        let ring = &area.rings[0];
        assert_eq!(ring.role, Role::Outer);
        assert_eq!(ring.nodes.len(), 5);
        assert!(ring.is_closed());
        assert!((area_surface(area, &data.nodes) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn assembled_rings_are_valid() {
        let data = unit_square_dataset();
        let outcome = assemble_territories(&data, 4);
        for area in &outcome.areas {
            for ring in &area.rings {
                assert!(ring.is_closed());
                let coords = ring_coords(ring, &data.nodes);
                assert!(geometry::signed_area(&coords) != 0.0);
                assert!(!geometry::ring_self_intersects(&coords));
            }
        }
    }

    #[test]
    fn reversed_way_is_matched_undirected() {
        let mut data = unit_square_dataset();
        // линия 11 записана задом наперёд
        data.ways.get_mut(&11).unwrap().nodes = vec![3, 2];
        let outcome = assemble_territories(&data, 4);
        assert_eq!(outcome.areas.len(), 1);
        assert!(outcome.incomplete.is_empty());
        assert!(outcome.areas[0].rings[0].is_closed());
    }

    #[test]
    fn classifies_hole_inside_outer() {
        let data = dataset_from_parts(
            vec![
                node(1, 0.0, 0.0),
                node(2, 4.0, 0.0),
                node(3, 4.0, 4.0),
                node(4, 0.0, 4.0),
                node(5, 1.0, 1.0),
                node(6, 2.0, 1.0),
                node(7, 2.0, 2.0),
                node(8, 1.0, 2.0),
            ],
            vec![way(10, &[1, 2, 3, 4, 1]), way(11, &[5, 6, 7, 8, 5])],
            vec![relation(100, 4, &[10, 11])],
        );
        let outcome = assemble_territories(&data, 4);
        assert_eq!(outcome.areas.len(), 1);
        let area = &outcome.areas[0];
        assert_eq!(area.outer_rings().count(), 1);
        assert_eq!(area.inner_rings().count(), 1);
        // дыры не входят в площадь
        assert!((area_surface(area, &data.nodes) - 15.0).abs() < 1e-12);
        // ориентация нормализована
        let outer = area.outer_rings().next().unwrap();
        let inner = area.inner_rings().next().unwrap();
        assert!(ring_area_of(&data, outer) > 0.0);
        assert!(ring_area_of(&data, inner) < 0.0);
    }

    fn ring_area_of(data: &DataSet, ring: &Ring) -> f64 {
        geometry::signed_area(&ring_coords(ring, &data.nodes))
    }

    #[test]
    fn unclosed_chain_marks_relation_incomplete() {
        let mut data = unit_square_dataset();
        // без линии 12 кольцо не замыкается
        data.ways.remove(&12);
        let outcome = assemble_territories(&data, 4);
        assert_eq!(outcome.incomplete, vec![100]);
        assert!(outcome.areas.is_empty());
    }

    #[test]
    fn closed_rings_survive_incomplete_relation() {
        // замкнутый квадрат плюс оборванный хвост в одном отношении
        let mut data = unit_square_dataset();
        data.nodes.insert(50, node(50, 9.0, 9.0));
        data.nodes.insert(51, node(51, 9.5, 9.0));
        data.ways.insert(20, way(20, &[50, 51]));
        data.relations[0].members.push(Member {
            way: 20,
            role: Role::Outer,
        });
        let outcome = assemble_territories(&data, 4);
        assert_eq!(outcome.incomplete, vec![100]);
        assert_eq!(outcome.areas.len(), 1);
        assert_eq!(outcome.areas[0].rings.len(), 1);
    }

    #[test]
    fn relation_of_other_level_is_ignored() {
        let mut data = unit_square_dataset();
        data.relations[0].level = 6;
        let outcome = assemble_territories(&data, 4);
        assert!(outcome.areas.is_empty());
        assert!(outcome.incomplete.is_empty());
    }

    /// Две смежные территории-квадрата и бонусное отношение,
    /// покрывающее обе
    fn two_squares_with_bonus() -> DataSet {
        let mut data = dataset_from_parts(
            vec![
                node(1, 0.0, 0.0),
                node(2, 1.0, 0.0),
                node(3, 1.0, 1.0),
                node(4, 0.0, 1.0),
                node(5, 2.0, 0.0),
                node(6, 2.0, 1.0),
            ],
            vec![
                way(10, &[1, 2, 3, 4, 1]),
                way(11, &[2, 5, 6, 3, 2]),
                // контур бонусного региона: прямоугольник 2 x 1
                way(12, &[1, 5, 6, 4, 1]),
            ],
            vec![
                relation(100, 4, &[10]),
                relation(101, 4, &[11]),
                relation(200, 2, &[12]),
            ],
        );
        let territories = assemble_territories(&data, 4);
        assert_eq!(territories.areas.len(), 2);
        data.areas = territories.areas;
        data
    }

    #[test]
    fn bonus_area_merges_adjacent_members() {
        let data = two_squares_with_bonus();
        let outcome = assemble_bonus_areas(&data, &[2]);

        assert!(outcome.incomplete.is_empty());
        assert_eq!(outcome.areas.len(), 1);
        let bonus = &outcome.areas[0];
        assert_eq!(bonus.level, 2);
        // общие рёбра сокращены: один контур из шести вершин
        assert_eq!(bonus.rings.len(), 1);
        let ring = &bonus.rings[0];
        assert_eq!(ring.role, Role::Outer);
        assert!(ring.is_closed());
        assert_eq!(ring.nodes.len(), 7);
        // общее ребро 2-3 исчезло из контура объединения
        let interior = ring.nodes.windows(2).any(|w| {
            (w[0] == 2 && w[1] == 3) || (w[0] == 3 && w[1] == 2)
        });
        assert!(!interior);
        assert!((area_surface(bonus, &data.nodes) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn bonus_ids_continue_numbering() {
        let data = two_squares_with_bonus();
        let outcome = assemble_bonus_areas(&data, &[2]);
        let max_existing = data.areas.iter().map(|a| a.id).max().unwrap();
        assert!(outcome.areas[0].id > max_existing);
    }

    #[test]
    fn bonus_without_members_is_incomplete() {
        let mut data = two_squares_with_bonus();
        data.areas.clear();
        let outcome = assemble_bonus_areas(&data, &[2]);
        assert!(outcome.areas.is_empty());
        assert_eq!(outcome.incomplete, vec![200]);
    }

    #[test]
    fn disjoint_members_give_multi_ring_area() {
        // два квадрата без общих рёбер под одним бонусным контуром
        let mut data = dataset_from_parts(
            vec![
                node(1, 0.0, 0.0),
                node(2, 1.0, 0.0),
                node(3, 1.0, 1.0),
                node(4, 0.0, 1.0),
                node(5, 3.0, 0.0),
                node(6, 4.0, 0.0),
                node(7, 4.0, 1.0),
                node(8, 3.0, 1.0),
                node(20, -1.0, -1.0),
                node(21, 5.0, -1.0),
                node(22, 5.0, 2.0),
                node(23, -1.0, 2.0),
            ],
            vec![
                way(10, &[1, 2, 3, 4, 1]),
                way(11, &[5, 6, 7, 8, 5]),
                way(12, &[20, 21, 22, 23, 20]),
            ],
            vec![
                relation(100, 4, &[10]),
                relation(101, 4, &[11]),
                relation(200, 2, &[12]),
            ],
        );
        let territories = assemble_territories(&data, 4);
        data.areas = territories.areas;

        let outcome = assemble_bonus_areas(&data, &[2]);
        assert_eq!(outcome.areas.len(), 1);
        let bonus = &outcome.areas[0];
        // несвязные части — отдельные кольца одной территории
        assert_eq!(bonus.outer_rings().count(), 2);
        assert!((area_surface(bonus, &data.nodes) - 2.0).abs() < 1e-12);
    }
}
