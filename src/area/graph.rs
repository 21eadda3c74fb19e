// src/area/graph.rs
//! Граф соседства территорий и его компоненты связности
//!
//! Две территории — соседи, если их границы разделяют узел или ребро.
//! Быстрый путь — совпадение идентификаторов узлов; запасной —
//! геометрическая близость граничных узлов в пределах допуска, для
//! территорий, собранных независимо и не разделяющих идентификаторы.
//! Кандидаты отбираются пространственными корзинами округлённых
//! координат, а не полным перебором пар.
//!
//! Граф — производное, одноразовое состояние: при любом изменении
//! набора территорий он строится заново, метки компонент никогда
//! не чинятся на месте.

use crate::data::{Area, Node, ObjectId};
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Геометрический допуск совпадения граничных узлов (в градусах,
/// порядка сантиметра на экваторе)
pub const ADJACENCY_TOLERANCE: f64 = 1e-7;

/// Граф соседства с метками компонент
#[derive(Debug, Clone)]
pub struct AreaRelations {
    pub graph: UnGraph<u32, ()>,
    pub neighbors: HashMap<u32, BTreeSet<u32>>,
    /// Территория -> компонента связности
    pub components: HashMap<u32, u32>,
    pub component_count: u32,
}

impl AreaRelations {
    #[must_use]
    pub fn neighbors_of(&self, area: u32) -> Option<&BTreeSet<u32>> {
        self.neighbors.get(&area)
    }

    #[must_use]
    pub fn component_of(&self, area: u32) -> Option<u32> {
        self.components.get(&area).copied()
    }

    /// Добавляет ребро между живыми территориями; петли и ссылки на
    /// отсутствующие территории игнорируются
    pub fn add_edge(&mut self, a: u32, b: u32) {
        if a == b {
            return;
        }
        let index_of = |graph: &UnGraph<u32, ()>, id: u32| {
            graph.node_indices().find(|&i| graph[i] == id)
        };
        let (Some(ia), Some(ib)) = (index_of(&self.graph, a), index_of(&self.graph, b)) else {
            return;
        };
        if self.graph.find_edge(ia, ib).is_none() {
            self.graph.add_edge(ia, ib, ());
            self.neighbors.entry(a).or_default().insert(b);
            self.neighbors.entry(b).or_default().insert(a);
        }
    }

    /// Пересчитывает метки компонент с нуля
    pub fn relabel(&mut self) {
        let (components, component_count) = label_components(&self.graph);
        self.components = components;
        self.component_count = component_count;
    }
}

/// Строит граф соседства и метки компонент для набора территорий
#[must_use]
pub fn build_area_relations(areas: &[Area], nodes: &HashMap<ObjectId, Node>) -> AreaRelations {
    let mut graph = UnGraph::new_undirected();
    let mut id_to_index: HashMap<u32, NodeIndex> = HashMap::new();
    for area in areas {
        id_to_index.insert(area.id, graph.add_node(area.id));
    }

    let mut edges: HashSet<(u32, u32)> = HashSet::new();

    // Быстрый путь: общий идентификатор граничного узла
    let mut owners: HashMap<ObjectId, Vec<u32>> = HashMap::new();
    for area in areas {
        for ring in &area.rings {
            for &node_id in &ring.nodes {
                let list = owners.entry(node_id).or_default();
                if list.last() != Some(&area.id) && !list.contains(&area.id) {
                    list.push(area.id);
                }
            }
        }
    }
    for list in owners.values() {
        for (i, &a) in list.iter().enumerate() {
            for &b in &list[i + 1..] {
                edges.insert(ordered(a, b));
            }
        }
    }

    // Запасной путь: пространственные корзины округлённых координат
    let mut buckets: HashMap<(i64, i64), Vec<(u32, f64, f64)>> = HashMap::new();
    for area in areas {
        for ring in &area.rings {
            for node_id in &ring.nodes {
                if let Some(node) = nodes.get(node_id) {
                    let key = bucket_key(node.x, node.y);
                    buckets.entry(key).or_default().push((area.id, node.x, node.y));
                }
            }
        }
    }
    let tolerance_sq = ADJACENCY_TOLERANCE * ADJACENCY_TOLERANCE;
    // соседство корзин покрываем половиной окрестности, чтобы не
    // обрабатывать пары корзин дважды
    const NEIGHBORHOOD: [(i64, i64); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];
    for (&(cx, cy), items) in &buckets {
        for (i, &(a, ax, ay)) in items.iter().enumerate() {
            for &(b, bx, by) in &items[i + 1..] {
                if a != b && near(ax, ay, bx, by, tolerance_sq) {
                    edges.insert(ordered(a, b));
                }
            }
        }
        for (dx, dy) in NEIGHBORHOOD {
            if let Some(other) = buckets.get(&(cx + dx, cy + dy)) {
                for &(a, ax, ay) in items {
                    for &(b, bx, by) in other {
                        if a != b && near(ax, ay, bx, by, tolerance_sq) {
                            edges.insert(ordered(a, b));
                        }
                    }
                }
            }
        }
    }

    for &(a, b) in &edges {
        graph.add_edge(id_to_index[&a], id_to_index[&b], ());
    }

    let mut neighbors: HashMap<u32, BTreeSet<u32>> = HashMap::new();
    for area in areas {
        neighbors.entry(area.id).or_default();
    }
    for &(a, b) in &edges {
        neighbors.entry(a).or_default().insert(b);
        neighbors.entry(b).or_default().insert(a);
    }

    let (components, component_count) = label_components(&graph);
    AreaRelations {
        graph,
        neighbors,
        components,
        component_count,
    }
}

fn ordered(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

fn bucket_key(x: f64, y: f64) -> (i64, i64) {
    (
        (x / ADJACENCY_TOLERANCE).floor() as i64,
        (y / ADJACENCY_TOLERANCE).floor() as i64,
    )
}

fn near(ax: f64, ay: f64, bx: f64, by: f64, tolerance_sq: f64) -> bool {
    let dx = bx - ax;
    let dy = by - ay;
    dx * dx + dy * dy <= tolerance_sq
}

/// Помечает компоненты связности обходом в ширину
///
/// Порядок меток детерминирован: компоненты нумеруются в порядке
/// возрастания идентификаторов территорий.
#[must_use]
pub fn label_components(graph: &UnGraph<u32, ()>) -> (HashMap<u32, u32>, u32) {
    let mut order: Vec<NodeIndex> = graph.node_indices().collect();
    order.sort_by_key(|&i| graph[i]);

    let mut components: HashMap<u32, u32> = HashMap::new();
    let mut count = 0;

    for start in order {
        if components.contains_key(&graph[start]) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        components.insert(graph[start], count);
        while let Some(current) = queue.pop_front() {
            for neighbor in graph.neighbors(current) {
                if !components.contains_key(&graph[neighbor]) {
                    components.insert(graph[neighbor], count);
                    queue.push_back(neighbor);
                }
            }
        }
        count += 1;
    }
    (components, count)
}
