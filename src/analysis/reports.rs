//! The seven fixed report definitions.
//!
//! Each report turns the normalized table into one or more aggregate
//! tables and the charts drawn from them. Reports whose columns are
//! missing are skipped by [`build_reports`].

use crate::analysis::aggregator::{aggregate, AggregateSpec, SortOrder};
use crate::analysis::schema::Capabilities;
use crate::config::{ColumnsConfig, ReportsConfig};
use crate::models::{AggregateTable, ChartKind, ChartSpec, Table};
use tracing::debug;

const VOLUME_AXIS: &str = "Trade volume (kg)";

/// An aggregate table and the CSV name it is saved under (no extension).
#[derive(Debug, Clone)]
pub struct NamedTable {
    pub name: String,
    pub table: AggregateTable,
}

/// Tables and charts produced by one report.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    /// Report identifier, also the chart file prefix ("A", "F2", ...).
    pub id: &'static str,
    pub tables: Vec<NamedTable>,
    pub charts: Vec<ChartSpec>,
}

impl ReportOutput {
    fn new(id: &'static str) -> Self {
        Self {
            id,
            tables: Vec::new(),
            charts: Vec::new(),
        }
    }

    fn table(mut self, name: impl Into<String>, table: AggregateTable) -> Self {
        self.tables.push(NamedTable {
            name: name.into(),
            table,
        });
        self
    }

    fn chart(mut self, chart: ChartSpec) -> Self {
        self.charts.push(chart);
        self
    }
}

/// Shared inputs of every report.
pub struct ReportContext<'a> {
    pub table: &'a Table,
    pub columns: &'a ColumnsConfig,
    pub limits: &'a ReportsConfig,
}

/// Make a label safe to embed in a file name.
pub fn file_label(label: &str) -> String {
    label.replace([' ', '/', '\\'], "_")
}

fn chart(
    file: String,
    kind: ChartKind,
    title: String,
    axes: (&str, &str),
    source: &AggregateTable,
    label_key: usize,
) -> ChartSpec {
    let (labels, values) = source.series(label_key);
    ChartSpec {
        file,
        kind,
        title,
        x_label: axes.0.to_string(),
        y_label: axes.1.to_string(),
        labels,
        values,
    }
}

/// One bar chart per distinct year of a per-year table, in lexicographic year order.
fn per_year_charts<F>(per_year: &AggregateTable, mut build: F) -> Vec<ChartSpec>
where
    F: FnMut(&str, &AggregateTable) -> ChartSpec,
{
    per_year
        .distinct_keys(0)
        .iter()
        .map(|year| build(year, &per_year.filter_key(0, year)))
        .collect()
}

/// A) Total volume per year.
pub fn volume_by_year(ctx: &ReportContext) -> ReportOutput {
    let c = ctx.columns;
    let spec = AggregateSpec::new(&[c.year.as_str()], &c.volume).ordered(SortOrder::Key);
    let per_year = aggregate(ctx.table, &spec);

    let bar = chart(
        "A_trade_volume_by_year.png".to_string(),
        ChartKind::Bar,
        "Volumen exportado por año (kg)".to_string(),
        ("Año", VOLUME_AXIS),
        &per_year,
        0,
    );

    ReportOutput::new("A")
        .table("summary_trade_volume_by_year", per_year)
        .chart(bar)
}

/// B) Share of volume per destination country, all years.
pub fn volume_by_destination(ctx: &ReportContext) -> ReportOutput {
    let c = ctx.columns;
    let n = ctx.limits.pie_countries;
    let spec =
        AggregateSpec::new(&[c.destination.as_str()], &c.volume).with_percentage(&c.percentage);
    let by_country = aggregate(ctx.table, &spec);

    let pie = chart(
        format!("B_destination_country_pie_top{}.png", n),
        ChartKind::Pie,
        format!("Top {} países destino por volumen (%)", n),
        ("", ""),
        &by_country.head(n),
        0,
    );

    ReportOutput::new("B")
        .table("summary_trade_volume_by_destination_country", by_country)
        .chart(pie)
}

/// C) Leading exporters, all years.
pub fn volume_by_exporter(ctx: &ReportContext) -> ReportOutput {
    let c = ctx.columns;
    let n = ctx.limits.top_exporters;
    let spec =
        AggregateSpec::new(&[c.exporter.as_str()], &c.volume).with_percentage(&c.percentage);
    let by_exporter = aggregate(ctx.table, &spec);

    let barh = chart(
        format!("C_exporters_top{}_barh.png", n),
        ChartKind::BarHorizontal,
        format!("Top {} exportadores por volumen (kg)", n),
        (VOLUME_AXIS, "Exportador"),
        &by_exporter.head(n),
        0,
    );

    ReportOutput::new("C")
        .table("summary_trade_volume_by_exporter", by_exporter)
        .chart(barh)
}

/// D) Top importers of each year.
pub fn top_importers_per_year(ctx: &ReportContext) -> ReportOutput {
    let c = ctx.columns;
    let n = ctx.limits.importers_per_year;
    let spec = AggregateSpec::new(&[c.year.as_str(), c.importer.as_str()], &c.volume)
        .ordered(SortOrder::PartitionThenValueDesc)
        .top_per_partition(n);
    let top = aggregate(ctx.table, &spec);

    let charts = per_year_charts(&top, |year, rows| {
        chart(
            format!("D_top{}_importers_{}.png", n, file_label(year)),
            ChartKind::Bar,
            format!("Top {} importadores en {} (kg)", n, year),
            (c.importer.as_str(), VOLUME_AXIS),
            rows,
            1,
        )
    });

    let mut out = ReportOutput::new("D").table(format!("top{}_importers_per_year", n), top);
    out.charts = charts;
    out
}

/// E) Top destination countries of each year.
pub fn top_destinations_per_year(ctx: &ReportContext) -> ReportOutput {
    let c = ctx.columns;
    let n = ctx.limits.countries_per_year;
    let spec = AggregateSpec::new(&[c.year.as_str(), c.destination.as_str()], &c.volume)
        .ordered(SortOrder::PartitionThenValueDesc)
        .top_per_partition(n);
    let top = aggregate(ctx.table, &spec);

    let charts = per_year_charts(&top, |year, rows| {
        chart(
            format!("E_top{}_countries_{}.png", n, file_label(year)),
            ChartKind::Bar,
            format!("Top {} países destino en {} (kg)", n, year),
            ("País de destino", VOLUME_AXIS),
            rows,
            1,
        )
    });

    let mut out =
        ReportOutput::new("E").table(format!("top{}_destination_countries_per_year", n), top);
    out.charts = charts;
    out
}

/// F) Volume per coffee bean type, all years.
pub fn volume_by_bean(ctx: &ReportContext) -> ReportOutput {
    let c = ctx.columns;
    let spec =
        AggregateSpec::new(&[c.bean.as_str()], &c.volume).with_percentage(&c.percentage);
    let beans = aggregate(ctx.table, &spec);

    let barh = chart(
        "F_beans_barh.png".to_string(),
        ChartKind::BarHorizontal,
        "Tipos de café más exportados (por volumen, kg)".to_string(),
        (VOLUME_AXIS, "Tipo de grano"),
        &beans,
        0,
    );

    ReportOutput::new("F")
        .table("summary_trade_volume_by_coffee_bean", beans)
        .chart(barh)
}

/// F2) Leading bean type of each year.
pub fn top_bean_per_year(ctx: &ReportContext) -> ReportOutput {
    let c = ctx.columns;
    let n = ctx.limits.beans_per_year;
    let spec = AggregateSpec::new(&[c.year.as_str(), c.bean.as_str()], &c.volume)
        .ordered(SortOrder::PartitionThenValueDesc)
        .top_per_partition(n);
    let top = aggregate(ctx.table, &spec);

    let charts = per_year_charts(&top, |year, rows| {
        chart(
            format!("F2_top{}_bean_{}.png", n, file_label(year)),
            ChartKind::Bar,
            format!("Grano más exportado en {} (kg)", year),
            (c.bean.as_str(), VOLUME_AXIS),
            rows,
            1,
        )
    });

    let mut out = ReportOutput::new("F2").table(format!("top{}_coffee_bean_per_year", n), top);
    out.charts = charts;
    out
}

/// G) Leading municipalities, all years.
pub fn volume_by_municipality(ctx: &ReportContext) -> ReportOutput {
    let c = ctx.columns;
    let n = ctx.limits.top_municipalities;
    let spec = AggregateSpec::new(&[c.municipality.as_str()], &c.volume);
    let muni = aggregate(ctx.table, &spec);

    let barh = chart(
        format!("G_municipalities_top{}_barh.png", n),
        ChartKind::BarHorizontal,
        format!("Top {} municipios exportadores (kg)", n),
        (VOLUME_AXIS, "Municipio"),
        &muni.head(n),
        0,
    );

    ReportOutput::new("G")
        .table("summary_trade_volume_by_municipality", muni)
        .chart(barh)
}

/// G2) Exporters of the leading municipalities.
///
/// The municipality ranking is recomputed the same way as report G.
pub fn exporters_in_top_municipalities(ctx: &ReportContext) -> ReportOutput {
    let c = ctx.columns;
    let limits = ctx.limits;
    let m = limits.municipalities_with_exporters;

    let ranking_spec = AggregateSpec::new(&[c.municipality.as_str()], &c.volume);
    let ranking = aggregate(ctx.table, &ranking_spec);
    let top_names: Vec<String> = ranking
        .head(limits.top_municipalities.min(m))
        .series(0)
        .0;

    let spec = AggregateSpec::new(&[c.municipality.as_str(), c.exporter.as_str()], &c.volume)
        .ordered(SortOrder::PartitionThenValueDesc);
    let mut muni_exp = aggregate(ctx.table, &spec);
    muni_exp
        .rows
        .retain(|r| r.keys.first().is_some_and(|k| top_names.contains(k)));

    let charts = top_names
        .iter()
        .map(|name| {
            chart(
                format!("G2_exporters_top_{}.png", file_label(name)),
                ChartKind::BarHorizontal,
                format!("Principales exportadores en {} (kg)", name),
                (VOLUME_AXIS, "Exportador"),
                &muni_exp
                    .filter_key(0, name)
                    .head(limits.exporters_per_municipality),
                1,
            )
        })
        .collect();

    let mut out = ReportOutput::new("G2")
        .table(format!("exporters_in_top{}_municipalities", m), muni_exp);
    out.charts = charts;
    out
}

/// Run every report the table supports, in A..G order.
pub fn build_reports(ctx: &ReportContext, caps: &Capabilities) -> Vec<ReportOutput> {
    type ReportFn = fn(&ReportContext) -> ReportOutput;

    let plan: [(&str, bool, ReportFn); 9] = [
        ("A", true, volume_by_year),
        ("B", caps.destination, volume_by_destination),
        ("C", caps.exporter, volume_by_exporter),
        ("D", caps.importer, top_importers_per_year),
        ("E", caps.destination, top_destinations_per_year),
        ("F", caps.bean, volume_by_bean),
        ("F2", caps.bean, top_bean_per_year),
        ("G", caps.municipality, volume_by_municipality),
        ("G2", caps.municipality_exporters(), exporters_in_top_municipalities),
    ];

    plan.into_iter()
        .filter_map(|(id, enabled, report)| {
            if enabled {
                Some(report(ctx))
            } else {
                debug!("Skipping report {}: required column missing", id);
                None
            }
        })
        .collect()
}
