use clap::Parser;
use mapmaker::area::assemble::{assemble_bonus_areas, assemble_territories};
use mapmaker::area::filter::{FilterPolicy, filter_areas};
use mapmaker::area::graph::build_area_relations;
use mapmaker::area::png::save_preview;
use mapmaker::compress::compress_ways;
use mapmaker::config::MapParams;
use mapmaker::project::{
    IntervalProjection, MercatorProjection, Projector, RadianProjection, UnitProjection,
    resolve_dimensions,
};
use mapmaker::{reader, writer};
use std::path::PathBuf;

/// Генератор игровых карт из административных границ OSM
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Путь к входному набору данных в формате JSON
    input: PathBuf,

    /// Префикс выходных файлов (по умолчанию: имя входного файла)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// admin_level границ, используемых как территории (1..=12)
    #[arg(short, long, default_value_t = 4)]
    territory_level: u8,

    /// admin_level границ, используемых как бонусные регионы
    #[arg(short, long, num_args = 0..)]
    bonus_levels: Vec<u8>,

    /// Ширина карты в пикселях (0 — вычисляется из пропорций)
    #[arg(short, long, default_value_t = 1000)]
    width: u32,

    /// Высота карты в пикселях (0 — вычисляется из пропорций)
    #[arg(long, default_value_t = 0)]
    height: u32,

    /// Допуск компрессии линий (0 — без компрессии)
    #[arg(short, long, default_value_t = 0.0)]
    compression_tolerance: f64,

    /// Допуск фильтра территорий по доле площади (0 — без фильтра)
    #[arg(short, long, default_value_t = 0.0)]
    filter_tolerance: f64,

    /// Политика починки графа соседства после фильтрации
    #[arg(long, value_enum, default_value_t = FilterPolicy::DropEdges)]
    filter_policy: FilterPolicy,

    /// Подробный вывод диагностики
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

impl Cli {
    fn params(&self) -> MapParams {
        MapParams {
            territory_level: self.territory_level,
            bonus_levels: self.bonus_levels.clone(),
            width: self.width,
            height: self.height,
            compression_epsilon: self.compression_tolerance,
            filter_epsilon: self.filter_tolerance,
            filter_policy: self.filter_policy,
            verbose: self.verbose,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let params = cli.params();
    // недопустимая конфигурация отклоняется до запуска конвейера
    params.validate()?;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension(""));

    println!("🔍 Чтение данных из {:?}...", cli.input);
    let mut data = reader::read_dataset(&cli.input)?;
    println!(
        "Прочитано: {} узлов, {} линий, {} отношений.",
        data.nodes.len(),
        data.ways.len(),
        data.relations.len()
    );
    if !data.diagnostics.incomplete_relations.is_empty() {
        eprintln!(
            "Внимание! У {} отношений отсутствует часть линий-членов: {:?}",
            data.diagnostics.incomplete_relations.len(),
            data.diagnostics.incomplete_relations
        );
    }
    if params.verbose && !data.diagnostics.dangling_nodes.is_empty() {
        eprintln!(
            "Висячие ссылки на узлы: {:?}",
            data.diagnostics.dangling_nodes
        );
    }

    // Компрессия линий
    if params.compression_epsilon > 0.0 {
        println!("Компрессия линий...");
        let report = compress_ways(&mut data, params.compression_epsilon);
        println!(
            "Компрессия завершена.\n  Узлов (до):    {}\n  Узлов (после): {}",
            report.nodes_before, report.nodes_after
        );
    }

    // Сборка территорий
    println!(
        "Сборка территорий из отношений уровня {}...",
        params.territory_level
    );
    let outcome = assemble_territories(&data, params.territory_level);
    for id in outcome.incomplete {
        data.diagnostics.note_incomplete(id);
    }
    data.areas = outcome.areas;
    println!("Собрано территорий: {}.", data.areas.len());

    // Граф соседства и компоненты
    println!("Вычисление соседства и компонент связности...");
    let mut relations = build_area_relations(&data.areas, &data.nodes);
    println!(
        "Граф построен: {} рёбер, {} компонент.",
        relations.graph.edge_count(),
        relations.component_count
    );

    // Фильтр территорий
    let mut bridges: Vec<(u32, u32)> = Vec::new();
    if params.filter_epsilon > 0.0 {
        println!("Фильтрация территорий по относительной площади...");
        let (report, rebuilt) = filter_areas(
            &mut data,
            &relations,
            params.filter_epsilon,
            params.filter_policy,
        );
        relations = rebuilt;
        println!(
            "Фильтрация завершена.\n  Территорий (до):    {}\n  Территорий (после): {}",
            report.areas_before, report.areas_after
        );
        if params.verbose && !report.removed.is_empty() {
            println!("Удалены территории: {:?}", report.removed);
        }
        bridges = report.bridges;
    }

    // Бонусные регионы
    if !params.bonus_levels.is_empty() {
        println!(
            "Сборка бонусных регионов уровней {:?}...",
            params.bonus_levels
        );
        let outcome = assemble_bonus_areas(&data, &params.bonus_levels);
        for id in outcome.incomplete {
            data.diagnostics.note_incomplete(id);
        }
        let added = outcome.areas.len();
        data.areas.extend(outcome.areas);
        println!("Собрано бонусных регионов: {added}.");
        // граф обязан оставаться согласованным с набором территорий,
        // а мосты фильтра — пережить перестройку
        relations = build_area_relations(&data.areas, &data.nodes);
        if !bridges.is_empty() {
            for &(a, b) in &bridges {
                relations.add_edge(a, b);
            }
            relations.relabel();
        }
    }

    // Проекции
    println!("Применение проекций...");
    let mut projector = Projector::new(&mut data.nodes);
    projector.apply_projection(&RadianProjection);
    projector.apply_projection(&MercatorProjection);

    // Масштабирование: границы пересчитываются после проекции
    let bounds = projector.bounds();
    let (width, height) = resolve_dimensions(&bounds, params.width, params.height);
    projector.apply_projection(&UnitProjection {
        x: (bounds.min_x, bounds.max_x),
        y: (bounds.min_y, bounds.max_y),
    });
    projector.apply_projection(&IntervalProjection {
        source_x: (0.0, 1.0),
        source_y: (0.0, 1.0),
        target_x: (0.0, f64::from(width)),
        target_y: (0.0, f64::from(height)),
    });
    println!("Карта спроецирована, размер {width}x{height}px.");

    // Экспорт
    let metadata_path = output.with_extension("json");
    let export = writer::build_export(&data, &relations, width, height);
    writer::write_metadata(&metadata_path, &export)?;
    println!("Метаданные записаны в {metadata_path:?}.");

    let preview_path = output.with_extension("preview.png");
    save_preview(
        &data,
        params.territory_level,
        width,
        height,
        preview_path.to_str().ok_or("некорректный путь превью")?,
    )?;
    println!("Превью сохранено в {preview_path:?}.");

    if !data.diagnostics.is_empty() {
        eprintln!(
            "Незавершённых отношений: {}.",
            data.diagnostics.incomplete_relations.len()
        );
    }
    println!("\nГотово!");
    Ok(())
}
