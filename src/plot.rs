//! Per-feature distribution images for the witness-function analyzer.
use anyhow::{anyhow, Result};
use plotters::prelude::*;
use std::path::Path;

/// Draw the distribution of frequency-weighted feature responses for each
/// label group as vertical box plots, one segment per group.
pub fn feature_distribution_plot(
    path: &Path,
    title: &str,
    groups: &[(String, Vec<f64>)],
) -> Result<()> {
    let quartiles: Vec<(&str, Quartiles)> = groups
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(name, values)| (name.as_str(), Quartiles::new(values)))
        .collect();
    if quartiles.is_empty() {
        return Err(anyhow!("no group has any values to plot"));
    }

    let names: Vec<&str> = quartiles.iter().map(|(name, _)| *name).collect();
    let y_max = quartiles
        .iter()
        .map(|(_, q)| q.values()[4])
        .fold(f32::MIN, f32::max)
        .max(0.0)
        * 1.1
        + 1e-6;

    let root = BitMapBackend::new(path, (640, 480)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("drawing: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(names[..].into_segmented(), 0f32..y_max)
        .map_err(|e| anyhow!("chart: {e}"))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc("Fraction of response")
        .x_desc("Cohort")
        .draw()
        .map_err(|e| anyhow!("mesh: {e}"))?;

    chart
        .draw_series(
            quartiles
                .iter()
                .map(|(name, q)| Boxplot::new_vertical(SegmentValue::CenterOf(name), q)),
        )
        .map_err(|e| anyhow!("series: {e}"))?;

    root.present().map_err(|e| anyhow!("present: {e}"))?;
    Ok(())
}
