// src/reader.rs
//! Чтение набора данных из JSON
//!
//! Разбор исходного формата OSM (.osm/.pbf) выполняет внешний
//! экстрактор; сюда попадает уже извлечённый набор узлов, линий и
//! отношений плюс список отношений, которые экстрактор сам не смог
//! разрешить (он объединяется с диагностикой сборщика).
//!
//! Повреждения отдельных сущностей не фатальны: узлы с
//! недействительными идентификаторами пропускаются, висячие ссылки
//! на узлы записываются в диагностику и вычищаются из линии, линии с
//! менее чем двумя оставшимися узлами отбрасываются с пометкой.
//! Фатален только неразбираемый JSON.

use crate::data::{DataSet, Diagnostics, Node, ObjectId, Relation, Way};
use crate::error::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RawNode {
    id: ObjectId,
    lon: f64,
    lat: f64,
}

#[derive(Debug, Deserialize)]
struct RawDataSet {
    nodes: Vec<RawNode>,
    ways: Vec<Way>,
    relations: Vec<Relation>,
    #[serde(default)]
    incomplete_relations: Vec<ObjectId>,
}

/// Читает набор данных и проверяет ссылочную целостность
pub fn read_dataset(path: &Path) -> Result<DataSet> {
    let contents = fs::read_to_string(path)?;
    let raw: RawDataSet = serde_json::from_str(&contents)?;

    let mut diagnostics = Diagnostics::default();
    for id in raw.incomplete_relations {
        diagnostics.note_incomplete(id);
    }

    let mut nodes: HashMap<ObjectId, Node> = HashMap::with_capacity(raw.nodes.len());
    for n in raw.nodes {
        let node = Node {
            id: n.id,
            x: n.lon,
            y: n.lat,
        };
        // узел-помеха пропускается; линии, ссылающиеся на него,
        // получат диагностику висячей ссылки ниже
        if !node.is_valid() {
            diagnostics.invalid_nodes.push(node.id);
            continue;
        }
        nodes.insert(node.id, node);
    }

    let mut ways: HashMap<ObjectId, Way> = HashMap::with_capacity(raw.ways.len());
    for mut way in raw.ways {
        // Висячие ссылки отмечаем и убираем из линии
        way.nodes.retain(|node_id| {
            let known = nodes.contains_key(node_id);
            if !known {
                diagnostics.dangling_nodes.push((way.id, *node_id));
            }
            known
        });
        if way.nodes.len() < 2 {
            diagnostics.degenerate_ways.push(way.id);
            continue;
        }
        ways.insert(way.id, way);
    }

    let mut relations = raw.relations;
    // Отношение без членов-границ бесполезно для сборки
    for relation in &relations {
        if relation.members.is_empty() {
            diagnostics.note_incomplete(relation.id);
        }
    }
    relations.retain(|r| !r.members.is_empty());

    let mut members = HashMap::new();
    for relation in &relations {
        for member in &relation.members {
            members
                .entry(member.way)
                .or_insert_with(Vec::new)
                .push(relation.id);
        }
    }
    // Члены, чьи линии не дожили до арены, делают отношение незавершённым
    for (way_id, relation_ids) in members {
        if !ways.contains_key(&way_id) {
            for id in relation_ids {
                diagnostics.note_incomplete(id);
            }
        }
    }

    Ok(DataSet {
        nodes,
        ways,
        relations,
        areas: Vec::new(),
        diagnostics,
    })
}

// используется в тестах и для встраивания без файловой системы
/// Собирает набор данных из готовых сущностей, без проверок чтения
#[must_use]
pub fn dataset_from_parts(
    nodes: Vec<Node>,
    ways: Vec<Way>,
    relations: Vec<Relation>,
) -> DataSet {
    DataSet {
        nodes: nodes.into_iter().map(|n| (n.id, n)).collect(),
        ways: ways.into_iter().map(|w| (w.id, w)).collect(),
        relations,
        areas: Vec::new(),
        diagnostics: Diagnostics::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Role;
    use std::io::Write;

    fn sample_json() -> &'static str {
        r#"{
            "nodes": [
                {"id": 1, "lon": 0.0, "lat": 0.0},
                {"id": 2, "lon": 1.0, "lat": 0.0},
                {"id": 0, "lon": 5.0, "lat": 5.0}
            ],
            "ways": [
                {"id": 10, "nodes": [1, 2]},
                {"id": 11, "nodes": [1, 99]},
                {"id": 12, "nodes": [99]},
                {"id": 13, "nodes": [1, 0, 2]}
            ],
            "relations": [
                {"id": 100, "level": 4, "name": "A", "members": [{"way": 10, "role": "outer"}]},
                {"id": 101, "level": 4, "members": []}
            ],
            "incomplete_relations": [500]
        }"#
    }

    #[test]
    fn reads_dataset_and_reports_problems() {
        let mut file = tempfile_path("dataset.json");
        write!(file.1, "{}", sample_json()).unwrap();

        let data = read_dataset(&file.0).unwrap();
        assert_eq!(data.nodes.len(), 2);
        // линии 11 и 12 после чистки висячих ссылок вырождаются
        assert!(data.ways.contains_key(&10));
        assert!(!data.ways.contains_key(&11));
        assert!(!data.ways.contains_key(&12));
        assert!(data.diagnostics.dangling_nodes.contains(&(11, 99)));
        assert!(data.diagnostics.degenerate_ways.contains(&11));
        assert!(data.diagnostics.degenerate_ways.contains(&12));
        // недействительный узел не фатален: он пропущен, линия 13
        // выживает без него с диагностикой висячей ссылки
        assert_eq!(data.diagnostics.invalid_nodes, vec![0]);
        assert_eq!(data.ways[&13].nodes, vec![1, 2]);
        assert!(data.diagnostics.dangling_nodes.contains(&(13, 0)));
        // пустое отношение помечено и отброшено, внешний список объединён
        assert!(data.diagnostics.incomplete_relations.contains(&101));
        assert!(data.diagnostics.incomplete_relations.contains(&500));
        assert_eq!(data.relations.len(), 1);
        assert_eq!(data.relations[0].members[0].role, Role::Outer);
    }

    fn tempfile_path(name: &str) -> (std::path::PathBuf, std::fs::File) {
        let dir = std::env::temp_dir().join(format!("mapmaker-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let file = std::fs::File::create(&path).unwrap();
        (path, file)
    }
}
