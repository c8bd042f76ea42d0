//! Chart rendering.
//!
//! Charts are drawn as SVG with plotters, then rasterized to PNG with
//! resvg at the configured figure size.

use super::OutputDir;
use crate::config::ChartsConfig;
use crate::models::{ChartKind, ChartSpec};
use anyhow::{Context, Result};
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::Palette;
use resvg::{tiny_skia, usvg};
use std::path::{Path, PathBuf};
use tracing::debug;

const FONT: &str = "sans-serif";
const CAPTION_SIZE: i32 = 30;
const DESC_SIZE: i32 = 20;
const TICK_SIZE: i32 = 16;
const MARGIN: u32 = 20;

/// Single-series bar color.
const BAR_COLOR: RGBColor = RGBColor(31, 119, 180);

/// Draws chart specs into the output directory.
pub struct ChartRenderer {
    options: usvg::Options<'static>,
    bar_size: (u32, u32),
    pie_size: (u32, u32),
}

impl ChartRenderer {
    /// Create a renderer. Loads the system fonts once.
    pub fn new(config: &ChartsConfig) -> Self {
        let mut options = usvg::Options::default();
        options.fontdb_mut().load_system_fonts();
        debug!("Loaded {} font faces for charts", options.fontdb.len());

        Self {
            options,
            bar_size: config.bar_pixels(),
            pie_size: config.pie_pixels(),
        }
    }

    /// Render `spec` to `<output>/<spec.file>`.
    ///
    /// Returns `None` when there is nothing to draw (no values, or a pie
    /// with a zero total).
    pub fn render(&self, out: &OutputDir, spec: &ChartSpec) -> Result<Option<PathBuf>> {
        if !is_drawable(spec) {
            debug!("Skipping empty chart {}", spec.file);
            return Ok(None);
        }

        let svg = self
            .to_svg(spec)
            .with_context(|| format!("Failed to draw chart {}", spec.file))?;
        let path = out.file(&spec.file);
        self.rasterize(&svg, &path)?;

        debug!("Wrote {}", path.display());
        Ok(Some(path))
    }

    /// Draw `spec` as an SVG document.
    pub fn to_svg(&self, spec: &ChartSpec) -> Result<String> {
        match spec.kind {
            ChartKind::Bar => draw_bar(spec, self.bar_size),
            ChartKind::BarHorizontal => draw_barh(spec, self.bar_size),
            ChartKind::Pie => draw_pie(spec, self.pie_size),
        }
    }

    fn rasterize(&self, svg: &str, path: &Path) -> Result<()> {
        let tree = usvg::Tree::from_str(svg, &self.options).context("Failed to parse chart SVG")?;

        let size = tree.size().to_int_size();
        let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
            .context("Chart has a zero-sized canvas")?;
        pixmap.fill(tiny_skia::Color::WHITE);
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        pixmap
            .save_png(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

fn is_drawable(spec: &ChartSpec) -> bool {
    if spec.values.is_empty() {
        return false;
    }
    match spec.kind {
        ChartKind::Pie => spec.values.iter().sum::<f64>() > 0.0,
        _ => true,
    }
}

/// Upper bound of the value axis.
fn axis_max(values: &[f64]) -> f64 {
    let max = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    if max > 0.0 {
        max * 1.05
    } else {
        1.0
    }
}

/// Compact tick label for kilogram amounts.
fn format_axis(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{:.1}G", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.0}k", value / 1e3)
    } else {
        format!("{:.0}", value)
    }
}

fn segment_label(labels: &[String], value: &SegmentValue<u32>) -> String {
    match value {
        SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

/// Segment of the `index`-th of `n` horizontal bars. Segment 0 is drawn at
/// the bottom, so the first value gets the top segment.
fn barh_segment(index: usize, n: u32) -> u32 {
    n - 1 - index as u32
}

fn palette_color(index: usize) -> RGBColor {
    let (r, g, b) = Palette99::COLORS[index % Palette99::COLORS.len()];
    RGBColor(r, g, b)
}

fn draw_bar(spec: &ChartSpec, size: (u32, u32)) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE)?;

        let n = spec.values.len() as u32;
        let labels = &spec.labels;

        let mut chart = ChartBuilder::on(&root)
            .caption(&spec.title, (FONT, CAPTION_SIZE))
            .margin(MARGIN)
            .x_label_area_size(70)
            .y_label_area_size(90)
            .build_cartesian_2d((0u32..n).into_segmented(), 0f64..axis_max(&spec.values))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(labels.len())
            .x_label_formatter(&|v| segment_label(labels, v))
            .y_label_formatter(&|v| format_axis(*v))
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .axis_desc_style((FONT, DESC_SIZE))
            .label_style((FONT, TICK_SIZE))
            .draw()?;

        chart.draw_series(spec.values.iter().enumerate().map(|(i, v)| {
            let i = i as u32;
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *v)],
                BAR_COLOR.filled(),
            );
            bar.set_margin(0, 0, 10, 10);
            bar
        }))?;

        root.present()?;
    }
    Ok(svg)
}

/// Horizontal bars; the first value sits at the top.
fn draw_barh(spec: &ChartSpec, size: (u32, u32)) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE)?;

        let n = spec.values.len() as u32;
        let mut labels = vec![String::new(); spec.labels.len()];
        for (i, label) in spec.labels.iter().enumerate() {
            labels[barh_segment(i, spec.labels.len() as u32) as usize] = label.clone();
        }

        let mut chart = ChartBuilder::on(&root)
            .caption(&spec.title, (FONT, CAPTION_SIZE))
            .margin(MARGIN)
            .x_label_area_size(60)
            .y_label_area_size(260)
            .build_cartesian_2d(0f64..axis_max(&spec.values), (0u32..n).into_segmented())?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(labels.len())
            .y_label_formatter(&|v| segment_label(&labels, v))
            .x_label_formatter(&|v| format_axis(*v))
            .x_desc(spec.x_label.as_str())
            .y_desc(spec.y_label.as_str())
            .axis_desc_style((FONT, DESC_SIZE))
            .label_style((FONT, TICK_SIZE))
            .draw()?;

        chart.draw_series(spec.values.iter().enumerate().map(|(i, v)| {
            let pos = barh_segment(i, n);
            let mut bar = Rectangle::new(
                [(0.0, SegmentValue::Exact(pos)), (*v, SegmentValue::Exact(pos + 1))],
                BAR_COLOR.filled(),
            );
            bar.set_margin(6, 6, 0, 0);
            bar
        }))?;

        root.present()?;
    }
    Ok(svg)
}

/// Pie with percentage labels, starting at 140 degrees.
fn draw_pie(spec: &ChartSpec, size: (u32, u32)) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE)?;
        let area = root.titled(&spec.title, (FONT, CAPTION_SIZE))?;

        let (w, h) = area.dim_in_pixel();
        let center = ((w / 2) as i32, (h / 2) as i32);
        let radius = f64::from(w.min(h)) * 0.32;
        let colors: Vec<RGBColor> = (0..spec.values.len()).map(palette_color).collect();

        let mut pie = Pie::new(&center, &radius, &spec.values, &colors, &spec.labels);
        pie.start_angle(140.0);
        pie.label_style((FONT, DESC_SIZE).into_font().color(&BLACK));
        pie.percentages((FONT, TICK_SIZE).into_font().color(&BLACK));
        area.draw(&pie)?;

        root.present()?;
    }
    Ok(svg)
}
