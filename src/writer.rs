// src/writer.rs
//! Экспорт собранной карты в JSON-метаданные
//!
//! Выходная структура — контракт с внешним построителем карты:
//! территории с кольцами в пиксельных координатах, соседи,
//! компоненты и накопленная диагностика.

use crate::area::graph::AreaRelations;
use crate::area::png::area_color_hex;
use crate::data::{DataSet, Diagnostics, Role};
use crate::error::Result;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct ExportRing {
    pub role: Role,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Serialize)]
pub struct ExportArea {
    pub id: u32,
    pub name: String,
    pub level: u8,
    pub color: String,
    pub component: Option<u32>,
    pub neighbors: Vec<u32>,
    pub rings: Vec<ExportRing>,
}

#[derive(Debug, Serialize)]
pub struct MapExport {
    pub width: u32,
    pub height: u32,
    pub areas: Vec<ExportArea>,
    pub diagnostics: Diagnostics,
}

/// Собирает экспортную структуру из арены и графа соседства
#[must_use]
pub fn build_export(
    data: &DataSet,
    relations: &AreaRelations,
    width: u32,
    height: u32,
) -> MapExport {
    let areas = data
        .areas
        .iter()
        .map(|area| ExportArea {
            id: area.id,
            name: area.name.clone(),
            level: area.level,
            color: area_color_hex(area.id),
            component: relations.component_of(area.id),
            neighbors: relations
                .neighbors_of(area.id)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default(),
            rings: area
                .rings
                .iter()
                .map(|ring| ExportRing {
                    role: ring.role,
                    points: data.ring_coords(ring),
                })
                .collect(),
        })
        .collect();

    MapExport {
        width,
        height,
        areas,
        diagnostics: data.diagnostics.clone(),
    }
}

/// Записывает метаданные карты в JSON-файл
pub fn write_metadata(path: &Path, export: &MapExport) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), export)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::graph::build_area_relations;
    use crate::data::{Area, Node, Ring};
    use crate::reader::dataset_from_parts;

    #[test]
    fn export_mirrors_relations() {
        let mut data = dataset_from_parts(
            vec![
                Node { id: 1, x: 0.0, y: 0.0 },
                Node { id: 2, x: 1.0, y: 0.0 },
                Node { id: 3, x: 1.0, y: 1.0 },
                Node { id: 4, x: 0.0, y: 1.0 },
            ],
            vec![],
            vec![],
        );
        data.areas = vec![Area {
            id: 0,
            name: "A".to_string(),
            level: 4,
            rings: vec![Ring {
                nodes: vec![1, 2, 3, 4, 1],
                role: Role::Outer,
            }],
            relations: vec![100],
        }];
        let relations = build_area_relations(&data.areas, &data.nodes);
        let export = build_export(&data, &relations, 640, 480);

        assert_eq!(export.width, 640);
        assert_eq!(export.areas.len(), 1);
        let area = &export.areas[0];
        assert_eq!(area.component, Some(0));
        assert!(area.neighbors.is_empty());
        assert_eq!(area.rings[0].points.len(), 5);
        assert!(area.color.starts_with('#'));
        // структура сериализуема
        let json = serde_json::to_string(&export).unwrap();
        assert!(json.contains("\"outer\""));
    }
}
