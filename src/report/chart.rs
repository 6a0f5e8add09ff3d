use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;
use tracing::{info, warn};

use super::BrandMissingBarcodes;
use crate::error::{AnalysisError, Result};

const CHART_SIZE: (u32, u32) = (1600, 960);
const BAR_COLOR: RGBColor = RGBColor(0x30, 0x0D, 0x38);
const TITLE: &str = "Top 5 Brands with Most Missing Barcodes";

fn chart_err<E: std::fmt::Display>(err: E) -> AnalysisError {
    AnalysisError::Chart(err.to_string())
}

/// Upper bound of the count axis, leaving headroom for the value labels
fn y_axis_max(data: &[BrandMissingBarcodes]) -> i64 {
    let max = data.iter().map(|d| d.missing_count).max().unwrap_or(0).max(1);
    max + (max / 10).max(1)
}

/// Draw the missing-barcode counts as a bar chart with the exact count above each bar
pub fn render_missing_barcode_chart(data: &[BrandMissingBarcodes], out_path: &Path) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if data.is_empty() {
        warn!("No brands with missing barcodes; chart will be empty");
    }

    let root = BitMapBackend::new(out_path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let bars = data.len().max(1) as u32;
    let labels: Vec<String> = data.iter().map(|d| d.brand.clone()).collect();

    let mut chart = ChartBuilder::on(&root)
        .caption(TITLE, ("sans-serif", 40).into_font().style(FontStyle::Bold))
        .margin(30)
        .x_label_area_size(80)
        .y_label_area_size(90)
        .build_cartesian_2d((0u32..bars).into_segmented(), 0i64..y_axis_max(data))
        .map_err(chart_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Brand")
        .y_desc("Number of Missing Barcodes")
        .axis_desc_style(("sans-serif", 24))
        .label_style(("sans-serif", 18))
        .x_labels(labels.len().max(1))
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .draw()
        .map_err(chart_err)?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(BAR_COLOR.filled())
                .margin(20)
                .data(data.iter().enumerate().map(|(i, d)| (i as u32, d.missing_count))),
        )
        .map_err(chart_err)?;

    let label_style = TextStyle::from(("sans-serif", 20).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart
        .draw_series(data.iter().enumerate().map(|(i, d)| {
            Text::new(
                d.missing_count.to_string(),
                (SegmentValue::CenterOf(i as u32), d.missing_count),
                label_style.clone(),
            )
        }))
        .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    info!("🖼️  Chart written to {}", out_path.display());
    Ok(())
}
