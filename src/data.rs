// src/data.rs
//! Модель данных: арена узлов, линий, отношений и территорий
//!
//! Все объекты хранятся в арене [`DataSet`] и ссылаются друг на друга
//! по стабильным целочисленным идентификаторам, а не по указателям:
//! - `Way` ссылается на `Node` по id,
//! - `Relation` ссылается на `Way` по id,
//! - `Area` ссылается на `Node` по id (через кольца).
//!
//! Это делает операции «удалить и починить» (чистка после компрессии,
//! фильтр территорий) явными и безопасными: удаление объекта из арены
//! не может оставить повисший указатель, только устранимую по id ссылку.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Идентификатор объекта OSM
///
/// В OSM более двух миллиардов узлов, поэтому нужен 64-битный тип.
/// Сами идентификаторы всегда положительны; значения `<= 0`
/// зарезервированы как недействительные.
pub type ObjectId = i64;

/// Сигнальное значение «недействительный идентификатор»
pub const INVALID_ID: ObjectId = 0;

/// Узел: точка с координатой
///
/// До проекции `x`/`y` — долгота/широта в градусах; проектор
/// переписывает их на месте в пиксельные координаты.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: ObjectId,
    pub x: f64,
    pub y: f64,
}

impl Node {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.id > INVALID_ID
    }
}

/// Линия: упорядоченная последовательность ссылок на узлы
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Way {
    pub id: ObjectId,
    pub nodes: Vec<ObjectId>,
}

impl Way {
    /// Линия замкнута, если первый и последний узлы совпадают
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.nodes.len() > 2 && self.nodes.first() == self.nodes.last()
    }
}

/// Роль линии в отношении или кольца в территории
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Внешняя граница
    Outer,
    /// Дыра (анклав)
    Inner,
}

/// Член отношения: ссылка на линию с ролью
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub way: ObjectId,
    pub role: Role,
}

/// Отношение: группа линий, образующая границу одного admin_level
///
/// После чтения не изменяется.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub id: ObjectId,
    /// Уровень административной иерархии (1..=12)
    pub level: u8,
    #[serde(default)]
    pub name: String,
    pub members: Vec<Member>,
}

/// Кольцо: замкнутый контур из ссылок на узлы
///
/// Валидное кольцо замкнуто (первый id == последний) и содержит
/// не менее трёх различных точек.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ring {
    pub nodes: Vec<ObjectId>,
    pub role: Role,
}

impl Ring {
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.nodes.len() >= 4 && self.nodes.first() == self.nodes.last()
    }
}

/// Территория: собранный многоугольник (возможно, с дырами)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Area {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    pub level: u8,
    pub rings: Vec<Ring>,
    /// Отношения, из которых собрана территория
    pub relations: Vec<ObjectId>,
}

impl Area {
    pub fn outer_rings(&self) -> impl Iterator<Item = &Ring> {
        self.rings.iter().filter(|r| r.role == Role::Outer)
    }

    pub fn inner_rings(&self) -> impl Iterator<Item = &Ring> {
        self.rings.iter().filter(|r| r.role == Role::Inner)
    }
}

/// Накопитель нефатальных проблем входных данных и сборки
///
/// Ошибка одной сущности не прерывает обработку остальных: она
/// записывается сюда и отдаётся вызывающему вместе с результатом.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Отношения, чьи границы не удалось полностью замкнуть
    pub incomplete_relations: Vec<ObjectId>,
    /// Узлы с недействительными идентификаторами (`<= 0`),
    /// пропущенные при чтении
    pub invalid_nodes: Vec<ObjectId>,
    /// Ссылки на отсутствующие узлы: (линия, узел)
    pub dangling_nodes: Vec<(ObjectId, ObjectId)>,
    /// Линии, в которых после чистки осталось меньше двух узлов
    pub degenerate_ways: Vec<ObjectId>,
}

impl Diagnostics {
    /// Отмечает отношение как незавершённое (без дубликатов)
    pub fn note_incomplete(&mut self, relation: ObjectId) {
        if !self.incomplete_relations.contains(&relation) {
            self.incomplete_relations.push(relation);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incomplete_relations.is_empty()
            && self.invalid_nodes.is_empty()
            && self.dangling_nodes.is_empty()
            && self.degenerate_ways.is_empty()
    }
}

/// Арена всех данных конвейера
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    pub nodes: HashMap<ObjectId, Node>,
    pub ways: HashMap<ObjectId, Way>,
    pub relations: Vec<Relation>,
    pub areas: Vec<Area>,
    pub diagnostics: Diagnostics,
}

impl DataSet {
    /// Координата узла по идентификатору
    #[must_use]
    pub fn coord(&self, id: ObjectId) -> Option<(f64, f64)> {
        self.nodes.get(&id).map(|n| (n.x, n.y))
    }

    /// Координаты кольца в порядке обхода
    ///
    /// Ссылки на отсутствующие узлы пропускаются; при валидных данных
    /// (после чтения с диагностикой) таких ссылок не бывает.
    #[must_use]
    pub fn ring_coords(&self, ring: &Ring) -> Vec<(f64, f64)> {
        ring.nodes.iter().filter_map(|id| self.coord(*id)).collect()
    }
}
