// src/geometry.rs
//! Геометрическое ядро: элементарные операции над точками и кольцами
//!
//! Все функции чистые и работают с координатами `(f64, f64)`.
//! Единицы измерения не фиксированы: до проекции это градусы,
//! после — безразмерные или пиксельные координаты.

/// Двумерная координата (x, y)
pub type Point = (f64, f64);

/// Квадрат евклидова расстояния между двумя точками
#[must_use]
pub fn distance_sq(a: Point, b: Point) -> f64 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    dx * dx + dy * dy
}

/// Евклидово расстояние между двумя точками
#[must_use]
pub fn distance(a: Point, b: Point) -> f64 {
    distance_sq(a, b).sqrt()
}

/// Векторное произведение (a - o) × (b - o)
///
/// Знак определяет ориентацию тройки точек:
/// `> 0` — против часовой стрелки, `< 0` — по часовой, `= 0` — коллинеарны.
#[must_use]
pub fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Проверяет, лежит ли точка `p` на отрезке `[a, b]` (включая концы),
/// в предположении что все три точки коллинеарны
fn on_segment(p: Point, a: Point, b: Point) -> bool {
    p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0) && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}

/// Проверяет пересечение отрезков `[p1, p2]` и `[p3, p4]`
///
/// Учитываются и «правильные» пересечения, и касания концами,
/// и наложение коллинеарных отрезков.
#[must_use]
pub fn segments_intersect(p1: Point, p2: Point, p3: Point, p4: Point) -> bool {
    let d1 = cross(p3, p4, p1);
    let d2 = cross(p3, p4, p2);
    let d3 = cross(p1, p2, p3);
    let d4 = cross(p1, p2, p4);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(p1, p3, p4))
        || (d2 == 0.0 && on_segment(p2, p3, p4))
        || (d3 == 0.0 && on_segment(p3, p1, p2))
        || (d4 == 0.0 && on_segment(p4, p1, p2))
}

/// Расстояние от точки `p` до хорды `[a, b]`
///
/// Для вырожденной хорды (a == b) возвращает расстояние до точки `a`.
#[must_use]
pub fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let len_sq = distance_sq(a, b);
    if len_sq == 0.0 {
        return distance(p, a);
    }
    cross(a, b, p).abs() / len_sq.sqrt()
}

/// Ориентированная площадь кольца по формуле шнуровки
///
/// Положительная — обход против часовой стрелки. Кольцо может быть
/// задано как с дублированной замыкающей точкой, так и без неё:
/// дубликат даёт нулевой вклад в сумму.
#[must_use]
pub fn signed_area(ring: &[Point]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let (x1, y1) = ring[i];
        let (x2, y2) = ring[(i + 1) % ring.len()];
        sum += x1 * y2 - x2 * y1;
    }
    sum / 2.0
}

/// Проверка принадлежности точки многоугольнику (правило чётности луча)
///
/// Точки на границе могут попасть в любую из сторон; для задач сборки
/// территорий этого достаточно, так как опорные точки выбираются внутри.
#[must_use]
pub fn point_in_polygon(p: Point, ring: &[Point]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > p.1) != (yj > p.1) && p.0 < (xj - xi) * (p.1 - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Проверяет кольцо на самопересечение несмежных рёбер
///
/// Смежные рёбра разделяют вершину и пересекаются в ней законно,
/// поэтому сравниваются только несмежные пары. Квадратичная
/// сложность, предназначено для отладочных проверок инвариантов.
#[must_use]
pub fn ring_self_intersects(ring: &[Point]) -> bool {
    // замыкающий дубликат отбрасываем, обход с переносом
    let open = if ring.len() > 1 && ring.first() == ring.last() {
        &ring[..ring.len() - 1]
    } else {
        ring
    };
    let n = open.len();
    if n < 4 {
        return false;
    }
    for i in 0..n {
        for j in (i + 1)..n {
            // пропускаем смежные рёбра (и пару первое-последнее)
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (a1, a2) = (open[i], open[(i + 1) % n]);
            let (b1, b2) = (open[j], open[(j + 1) % n]);
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

/// Ограничивающий прямоугольник
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rectangle {
    /// Пустой прямоугольник, поглощающий первую же добавленную точку
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn expand(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.0);
        self.min_y = self.min_y.min(p.1);
        self.max_x = self.max_x.max(p.0);
        self.max_y = self.max_y.max(p.1);
    }

    #[must_use]
    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Self {
        let mut rect = Self::empty();
        for p in points {
            rect.expand(p);
        }
        rect
    }

    /// Прямоугольник невалиден, пока в него не добавлена хотя бы одна точка
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}
