//! Daily cost chart rendering
//!
//! Draws the current month's cumulative cost per account as stacked areas,
//! with the previous month's total as a dashed line, and encodes it as PNG.
//! The image carries no text; the title and per-account amounts travel with
//! the upload as its comment.

use crate::error::{PacioliError, Result};
use chrono::Datelike;
use pacioli_core::change::percentage_change;
use pacioli_core::series::DailyChartSeries;
use plotters::prelude::*;
use std::io::Cursor;
use tracing::debug;

/// Pixel size of the rendered chart
pub const CHART_SIZE: (u32, u32) = (800, 350);

const PALETTE: [RGBColor; 8] = [
    RGBColor(213, 62, 79),
    RGBColor(244, 109, 67),
    RGBColor(253, 174, 97),
    RGBColor(254, 224, 139),
    RGBColor(230, 245, 152),
    RGBColor(171, 221, 164),
    RGBColor(102, 194, 165),
    RGBColor(50, 136, 189),
];

const PREVIOUS_MONTH_COLOR: RGBColor = RGBColor(128, 128, 128);
const GUIDE_COLOR: RGBColor = RGBColor(225, 225, 225);

/// Upload title, e.g. `AWS Cost 11/14 $122.09 (-8.9%)`
pub fn chart_title(series: &DailyChartSeries) -> String {
    let current = series.current_total();
    let change = percentage_change(current, series.previous_total());
    format!(
        "AWS Cost {}/{} ${:.2} ({:.1}%)",
        series.latest.month(),
        series.latest.day(),
        current,
        change
    )
}

/// One line per account, most expensive first, then the previous month
pub fn chart_legend(series: &DailyChartSeries) -> String {
    let mut lines: Vec<String> = series
        .accounts
        .iter()
        .map(|account| format!("`${:>10.2}` {} ({})", account.total(), account.name, account.id))
        .collect();
    lines.push(format!(
        "`${:>10.2}` previous month",
        series.previous_total()
    ));
    lines.join("\n")
}

fn draw(
    series: &DailyChartSeries,
    pixels: &mut [u8],
    size: (u32, u32),
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::with_buffer(pixels, size).into_drawing_area();
    root.fill(&WHITE)?;

    let days = series.days().max(2);
    let y_max = series.max_value().max(1.0) * 1.1;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(1u32..days, 0f64..y_max)?;

    for step in 1..5 {
        let y = y_max * f64::from(step) / 5.0;
        chart.draw_series(LineSeries::new(vec![(1, y), (days, y)], &GUIDE_COLOR))?;
    }

    // Tallest band first so each lower band paints over it
    let stacked = series.stacked();
    for (index, band) in stacked.iter().enumerate().rev() {
        let color = PALETTE[index % PALETTE.len()];
        let points = band.iter().enumerate().map(|(i, v)| (i as u32 + 1, *v));
        chart.draw_series(AreaSeries::new(points, 0.0, color.mix(0.8).filled()))?;
    }

    if !series.previous_month_total.is_empty() {
        let points: Vec<(u32, f64)> = series
            .previous_month_total
            .iter()
            .enumerate()
            .map(|(i, v)| (i as u32 + 1, *v))
            .collect();
        chart.draw_series(DashedLineSeries::new(
            points,
            10,
            5,
            PREVIOUS_MONTH_COLOR.stroke_width(2),
        ))?;
    }

    root.present()?;
    Ok(())
}

/// Render `series` as a PNG of `size` pixels
pub fn render_daily_chart(series: &DailyChartSeries, size: (u32, u32)) -> Result<Vec<u8>> {
    let (width, height) = size;
    let mut pixels = vec![0u8; width as usize * height as usize * 3];
    draw(series, &mut pixels, size).map_err(|e| PacioliError::Chart(e.to_string()))?;

    let image = image::RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| PacioliError::Chart("pixel buffer does not match chart size".to_string()))?;
    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, image::ImageFormat::Png)
        .map_err(|e| PacioliError::Chart(e.to_string()))?;

    let png = png.into_inner();
    debug!("Rendered {}x{} chart ({} bytes)", width, height, png.len());
    Ok(png)
}
