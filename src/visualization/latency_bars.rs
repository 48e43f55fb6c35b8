//! Per-prompt latency bars with min/max whiskers

use crate::metrics::{ExperimentResult, PromptResult};
use super::{ensure_font, FONT_FAMILY};
use anyhow::{bail, Result};
use plotters::prelude::*;
use std::path::Path;

const BAR_HALF_WIDTH: f64 = 0.3;
const CAP_HALF_WIDTH: f64 = 0.12;

pub struct LatencyBarPlotter;

/// Mean/min/max of one prompt, prompts without successes dropped
pub(crate) fn bar_points(prompts: &[PromptResult]) -> Vec<(usize, f64, f64, f64)> {
    prompts
        .iter()
        .filter_map(|p| {
            let stats = &p.latency;
            match (stats.mean_ms, stats.min_ms, stats.max_ms) {
                (Some(mean), Some(min), Some(max)) => Some((p.prompt.index, mean, min, max)),
                _ => None,
            }
        })
        .collect()
}

/// Top of the y axis, never collapsed to zero
pub(crate) fn y_upper(max_value: f64) -> f64 {
    (max_value * 1.15).max(1.0)
}

fn whisker(x: f64, min: f64, max: f64) -> [PathElement<(f64, f64)>; 3] {
    let style = BLACK.stroke_width(2);
    [
        PathElement::new(vec![(x, min), (x, max)], style),
        PathElement::new(vec![(x - CAP_HALF_WIDTH, min), (x + CAP_HALF_WIDTH, min)], style),
        PathElement::new(vec![(x - CAP_HALF_WIDTH, max), (x + CAP_HALF_WIDTH, max)], style),
    ]
}

impl LatencyBarPlotter {
    /// Plot mean latency per prompt with min/max whiskers
    pub fn plot(result: &ExperimentResult, path: &Path) -> Result<()> {
        let points = bar_points(&result.prompts);
        if points.is_empty() {
            bail!("no successful attempts to plot for '{}'", result.name);
        }

        let max_value = points
            .iter()
            .map(|(_, _, _, max)| *max)
            .fold(0.0_f64, f64::max);
        let num_prompts = result.prompts.len().max(1) as f64;

        ensure_font()?;
        let root = BitMapBackend::new(path, (1200, 800)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("{} latency per prompt", result.name),
                (FONT_FAMILY, 40),
            )
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(0.5f64..(num_prompts + 0.5), 0f64..y_upper(max_value))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(result.prompts.len().max(1))
            .x_desc("Prompt")
            .y_desc("Latency (ms)")
            .x_label_formatter(&|x| format!("P{:.0}", x))
            .y_label_formatter(&|y| format!("{:.0}", y))
            .draw()?;

        chart.draw_series(points.iter().map(|(idx, mean, _, _)| {
            let x = *idx as f64;
            Rectangle::new(
                [(x - BAR_HALF_WIDTH, 0.0), (x + BAR_HALF_WIDTH, *mean)],
                BLUE.mix(0.6).filled(),
            )
        }))?;

        // Whisker: vertical min..max line with caps at both ends
        chart
            .draw_series(
                points
                    .iter()
                    .flat_map(|(idx, _, min, max)| whisker(*idx as f64, *min, *max)),
            )?
            .label("min / max")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));

        chart
            .draw_series(
                points
                    .iter()
                    .map(|(idx, mean, _, _)| Circle::new((*idx as f64, *mean), 4, RED.filled())),
            )?
            .label("mean")
            .legend(|(x, y)| Circle::new((x + 10, y), 4, RED.filled()));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExperimentConfig;
    use crate::metrics::SearchAttempt;
    use crate::prompts::Prompt;
    use chrono::Utc;
    use tempfile::tempdir;

    fn result_with(latencies: &[f64]) -> ExperimentResult {
        let now = Utc::now();
        let attempts = latencies
            .iter()
            .enumerate()
            .map(|(i, ms)| SearchAttempt::success(1, i + 1, now, *ms))
            .collect();
        ExperimentResult::from_prompt_results(
            "search",
            "mock",
            now,
            ExperimentConfig::immediate(latencies.len()),
            vec![PromptResult::from_attempts(Prompt::new(1, "q"), attempts)],
            10.0,
        )
    }

    #[test]
    fn test_bar_points_skip_prompts_without_successes() {
        let now = Utc::now();
        let ok = PromptResult::from_attempts(
            Prompt::new(1, "a"),
            vec![
                SearchAttempt::success(1, 1, now, 100.0),
                SearchAttempt::success(1, 2, now, 300.0),
            ],
        );
        let failed = PromptResult::from_attempts(
            Prompt::new(2, "b"),
            vec![SearchAttempt::failure(2, 1, now, 5.0, "boom")],
        );

        let points = bar_points(&[ok, failed]);
        assert_eq!(points, vec![(1, 200.0, 100.0, 300.0)]);
    }

    #[test]
    fn test_y_axis_never_collapses() {
        assert_eq!(y_upper(0.0), 1.0);
        assert!((y_upper(200.0) - 230.0).abs() < 1e-9);
    }

    #[test]
    fn test_plot_writes_png_with_labels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latency.png");
        LatencyBarPlotter::plot(&result_with(&[120.0, 180.0, 95.5]), &path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_plot_zero_latencies() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("zero.png");
        LatencyBarPlotter::plot(&result_with(&[0.0, 0.0]), &path).unwrap();
        assert!(path.exists());
    }
}
