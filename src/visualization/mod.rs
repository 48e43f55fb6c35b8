//! Visualization and plotting

pub mod comparison;
pub mod histogram;
pub mod latency_bars;

pub use comparison::ComparisonPlotter;
pub use histogram::HistogramPlotter;
pub use latency_bars::LatencyBarPlotter;

use anyhow::{anyhow, Result};
use plotters::style::{register_font, FontStyle};
use std::sync::OnceLock;

/// Font family every chart draws its text with
pub(crate) const FONT_FAMILY: &str = "sans-serif";

static SANS: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");
static FONT_READY: OnceLock<bool> = OnceLock::new();

/// Register the bundled font with plotters, once per process
pub(crate) fn ensure_font() -> Result<()> {
    let ready = *FONT_READY.get_or_init(|| {
        register_font(FONT_FAMILY, FontStyle::Normal, SANS).is_ok()
            && register_font(FONT_FAMILY, FontStyle::Bold, SANS).is_ok()
    });
    if ready {
        Ok(())
    } else {
        Err(anyhow!("bundled chart font could not be loaded"))
    }
}
