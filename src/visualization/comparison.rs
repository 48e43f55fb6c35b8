//! Cross-experiment comparison chart

use crate::metrics::ComprehensiveResult;
use super::{ensure_font, FONT_FAMILY};
use anyhow::{bail, Result};
use plotters::prelude::*;
use std::path::Path;

const GROUP_WIDTH: f64 = 0.8;

pub struct ComparisonPlotter;

impl ComparisonPlotter {
    /// Plot grouped per-prompt mean latency bars, one colour per experiment
    pub fn plot(combined: &ComprehensiveResult, path: &Path) -> Result<()> {
        let experiments: Vec<_> = combined
            .experiments
            .values()
            .filter(|e| !e.latency.is_empty())
            .collect();
        if experiments.is_empty() {
            bail!("no experiment has successful attempts to compare");
        }

        let num_prompts = experiments
            .iter()
            .flat_map(|e| e.prompts.iter().map(|p| p.prompt.index))
            .max()
            .unwrap_or(1);
        let max_value = experiments
            .iter()
            .flat_map(|e| e.prompts.iter().filter_map(|p| p.latency.mean_ms))
            .fold(0.0_f64, f64::max);
        let bar_width = GROUP_WIDTH / experiments.len() as f64;

        ensure_font()?;
        let root = BitMapBackend::new(path, (1400, 800)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Mean latency by experiment", (FONT_FAMILY, 40))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(
                0.5f64..(num_prompts as f64 + 0.5),
                0f64..(max_value * 1.15).max(1.0),
            )?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(num_prompts)
            .x_desc("Prompt")
            .y_desc("Mean latency (ms)")
            .x_label_formatter(&|x| format!("P{:.0}", x))
            .y_label_formatter(&|y| format!("{:.0}", y))
            .draw()?;

        for (slot, experiment) in experiments.iter().enumerate() {
            let color = Palette99::pick(slot).mix(0.8);
            let offset = -GROUP_WIDTH / 2.0 + slot as f64 * bar_width;

            chart
                .draw_series(experiment.prompts.iter().filter_map(|p| {
                    let mean = p.latency.mean_ms?;
                    let x0 = p.prompt.index as f64 + offset;
                    Some(Rectangle::new([(x0, 0.0), (x0 + bar_width, mean)], color.filled()))
                }))?
                .label(experiment.name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
        Ok(())
    }
}
