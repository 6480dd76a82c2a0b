use anyhow::{anyhow, Result};
use plotters::prelude::*;
use std::path::Path;
use vicsek_common::Snapshot;

/// `(step, order parameter)` for every snapshot.
pub fn order_series(snapshots: &[Snapshot]) -> Vec<(f64, f64)> {
    snapshots
        .iter()
        .map(|s| (s.step as f64, s.order_parameter))
        .collect()
}

/// Draws the order parameter over time as a PNG line chart.
pub fn plot_order_parameter(path: &Path, snapshots: &[Snapshot], size: (u32, u32)) -> Result<()> {
    let series = order_series(snapshots);
    let max_step = series.last().map_or(1.0, |&(step, _)| step.max(1.0));

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("chart background: {}", e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Polar order parameter", ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..max_step, 0f64..1.05f64)
        .map_err(|e| anyhow!("chart layout: {}", e))?;

    chart
        .configure_mesh()
        .x_desc("step")
        .y_desc("order")
        .draw()
        .map_err(|e| anyhow!("chart mesh: {}", e))?;

    chart
        .draw_series(LineSeries::new(series, &BLUE))
        .map_err(|e| anyhow!("chart series: {}", e))?;

    root.present().map_err(|e| anyhow!("writing chart to {}: {}", path.display(), e))?;
    Ok(())
}
