// src/area/filter.rs
//! Фильтр территорий по относительной площади
//!
//! Территория удаляется, если её площадь меньше доли `epsilon` от
//! суммарной площади её компоненты связности. Удаление делает
//! недействительными все рёбра графа соседства, поэтому граф и метки
//! компонент после фильтрации строятся заново — устаревшие метки
//! никогда не переиспользуются.

use crate::area::area_surface;
use crate::area::graph::{AreaRelations, build_area_relations};
use crate::data::DataSet;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Политика починки графа после удаления территории
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FilterPolicy {
    /// Рёбра удалённой территории пропадают; её соседи могут
    /// оказаться в разных компонентах
    #[default]
    DropEdges,
    /// Выжившие соседи кластера удалённых территорий соединяются
    /// друг с другом, сохраняя связность игровой карты
    BridgeNeighbors,
}

/// Итоги фильтрации для отчётности
#[derive(Debug, Clone)]
pub struct FilterReport {
    pub areas_before: usize,
    pub areas_after: usize,
    pub removed: Vec<u32>,
    /// Мосты, добавленные политикой [`FilterPolicy::BridgeNeighbors`];
    /// любая последующая перестройка графа обязана применить их заново
    pub bridges: Vec<(u32, u32)>,
}

/// Удаляет мелкие территории и перестраивает граф соседства
///
/// При `epsilon <= 0` ничего не удаляет и возвращает перестроенный
/// без изменений граф. Возвращает отчёт и согласованный с новым
/// набором территорий граф.
pub fn filter_areas(
    data: &mut DataSet,
    relations: &AreaRelations,
    epsilon: f64,
    policy: FilterPolicy,
) -> (FilterReport, AreaRelations) {
    let areas_before = data.areas.len();
    if epsilon <= 0.0 {
        return (
            FilterReport {
                areas_before,
                areas_after: areas_before,
                removed: Vec::new(),
                bridges: Vec::new(),
            },
            relations.clone(),
        );
    }

    let surfaces: HashMap<u32, f64> = data
        .areas
        .iter()
        .map(|a| (a.id, area_surface(a, &data.nodes)))
        .collect();
    let mut component_totals: HashMap<u32, f64> = HashMap::new();
    for area in &data.areas {
        if let Some(component) = relations.component_of(area.id) {
            *component_totals.entry(component).or_insert(0.0) += surfaces[&area.id];
        }
    }

    let removed: HashSet<u32> = data
        .areas
        .iter()
        .filter(|area| {
            let Some(component) = relations.component_of(area.id) else {
                return false;
            };
            let total = component_totals[&component];
            total > 0.0 && surfaces[&area.id] / total < epsilon
        })
        .map(|area| area.id)
        .collect();

    // мосты вычисляются по старому графу, до удаления
    let bridges = match policy {
        FilterPolicy::DropEdges => Vec::new(),
        FilterPolicy::BridgeNeighbors => bridge_edges(&removed, relations),
    };

    data.areas.retain(|area| !removed.contains(&area.id));

    let mut rebuilt = build_area_relations(&data.areas, &data.nodes);
    for &(a, b) in &bridges {
        rebuilt.add_edge(a, b);
    }
    rebuilt.relabel();

    let mut removed: Vec<u32> = removed.into_iter().collect();
    removed.sort_unstable();
    (
        FilterReport {
            areas_before,
            areas_after: data.areas.len(),
            removed,
            bridges,
        },
        rebuilt,
    )
}

/// Рёбра-мосты между выжившими соседями удалённых территорий
///
/// Смежные удалённые территории образуют кластер; все выжившие
/// соседи кластера соединяются попарно, транзитивно сохраняя
/// существовавшую через кластер связность.
fn bridge_edges(removed: &HashSet<u32>, relations: &AreaRelations) -> Vec<(u32, u32)> {
    let mut visited: HashSet<u32> = HashSet::new();
    let mut edges = Vec::new();

    for &start in removed {
        if visited.contains(&start) {
            continue;
        }
        // обход кластера удалённых территорий
        let mut frontier: Vec<u32> = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited.insert(start);
        while let Some(current) = queue.pop_front() {
            let Some(neighbors) = relations.neighbors_of(current) else {
                continue;
            };
            for &neighbor in neighbors {
                if removed.contains(&neighbor) {
                    if visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                } else if !frontier.contains(&neighbor) {
                    frontier.push(neighbor);
                }
            }
        }

        for (i, &a) in frontier.iter().enumerate() {
            for &b in &frontier[i + 1..] {
                edges.push((a, b));
            }
        }
    }
    edges
}
