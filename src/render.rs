use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::grid::PopulationSnapshot;

/// Marker colors for races 1..=7; higher labels wrap around.
pub const PALETTE: [&str; 7] = [
    "#0000ff", "#ff0000", "#008000", "#00bfbf", "#bf00bf", "#bfbf00", "#000000",
];

const CELL_PX: f64 = 10.0;
const MARKER_RADIUS_PX: f64 = 3.0;
const TITLE_BAND_PX: f64 = 28.0;
const MARGIN_PX: f64 = 8.0;
const LEGEND_BAND_PX: f64 = 18.0;
const LEGEND_ENTRY_PX: f64 = 56.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("render format error: {0}")]
    Format(#[from] std::fmt::Error),
}

pub trait Renderer {
    fn render(
        &self,
        snapshot: &PopulationSnapshot,
        title: &str,
        target: &Path,
    ) -> Result<(), RenderError>;
}

pub fn race_color(race: u16) -> &'static str {
    PALETTE[(race.max(1) as usize - 1) % PALETTE.len()]
}

/// Scatter plot written as a standalone SVG document.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgRenderer;

impl SvgRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn to_svg(&self, snapshot: &PopulationSnapshot, title: &str) -> Result<String, RenderError> {
        let plot_w = snapshot.width as f64 * CELL_PX;
        let plot_h = snapshot.height as f64 * CELL_PX;
        let legend_w = snapshot.race_count as f64 * LEGEND_ENTRY_PX;
        let total_w = plot_w.max(legend_w) + 2.0 * MARGIN_PX;
        let total_h = plot_h + TITLE_BAND_PX + LEGEND_BAND_PX + MARGIN_PX;
        let left = MARGIN_PX;
        let top = TITLE_BAND_PX;

        let mut svg = String::new();
        writeln!(
            svg,
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{total_w}" height="{total_h}" viewBox="0 0 {total_w} {total_h}">"##
        )?;
        writeln!(
            svg,
            r##"  <rect width="{total_w}" height="{total_h}" fill="#ffffff"/>"##
        )?;
        writeln!(
            svg,
            r##"  <text x="{}" y="{}" text-anchor="middle" font-family="sans-serif" font-size="10" font-weight="bold">{}</text>"##,
            total_w / 2.0,
            TITLE_BAND_PX / 2.0 + 4.0,
            escape(title)
        )?;
        writeln!(
            svg,
            r##"  <rect x="{left}" y="{top}" width="{plot_w}" height="{plot_h}" fill="none" stroke="#000000" stroke-width="1"/>"##
        )?;
        for agent in &snapshot.agents {
            let cx = left + (agent.x as f64 + 0.5) * CELL_PX;
            // y grows upward in plot space.
            let cy = top + plot_h - (agent.y as f64 + 0.5) * CELL_PX;
            writeln!(
                svg,
                r##"  <circle cx="{cx}" cy="{cy}" r="{MARKER_RADIUS_PX}" fill="{}"/>"##,
                race_color(agent.race)
            )?;
        }
        // One swatch per race along the bottom band.
        let legend_y = top + plot_h + LEGEND_BAND_PX / 2.0;
        for race in 1..=snapshot.race_count {
            let x = left + (race - 1) as f64 * LEGEND_ENTRY_PX;
            writeln!(
                svg,
                r##"  <rect class="legend" x="{x}" y="{}" width="8" height="8" fill="{}"/>"##,
                legend_y - 4.0,
                race_color(race)
            )?;
            writeln!(
                svg,
                r##"  <text x="{}" y="{}" font-family="sans-serif" font-size="9">race {race}</text>"##,
                x + 11.0,
                legend_y + 3.0
            )?;
        }
        svg.push_str("</svg>\n");
        Ok(svg)
    }
}

impl Renderer for SvgRenderer {
    fn render(
        &self,
        snapshot: &PopulationSnapshot,
        title: &str,
        target: &Path,
    ) -> Result<(), RenderError> {
        let svg = self.to_svg(snapshot, title)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, svg)?;
        Ok(())
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::AgentPlacement;

    fn snapshot() -> PopulationSnapshot {
        PopulationSnapshot {
            width: 3,
            height: 2,
            race_count: 2,
            agents: vec![
                AgentPlacement { x: 0, y: 0, race: 1 },
                AgentPlacement { x: 2, y: 1, race: 2 },
            ],
        }
    }

    #[test]
    fn palette_wraps_after_seven_races() {
        assert_eq!(race_color(1), "#0000ff");
        assert_eq!(race_color(7), "#000000");
        assert_eq!(race_color(8), race_color(1));
    }

    #[test]
    fn one_marker_per_agent() {
        let svg = SvgRenderer::new().to_svg(&snapshot(), "initial").unwrap();
        assert_eq!(svg.matches("<circle").count(), 2);
        assert!(svg.contains(r##"fill="#0000ff""##));
        assert!(svg.contains(r##"fill="#ff0000""##));
        assert!(svg.contains(">initial</text>"));
    }

    #[test]
    fn origin_is_bottom_left() {
        let svg = SvgRenderer::new().to_svg(&snapshot(), "t").unwrap();
        // Agent (0, 0): cx = 8 + 5, cy = 28 + 20 - 5.
        assert!(svg.contains(r#"cx="13" cy="43""#));
    }

    #[test]
    fn legend_lists_every_race() {
        let mut snapshot = snapshot();
        snapshot.race_count = 4;
        let svg = SvgRenderer::new().to_svg(&snapshot, "t").unwrap();
        assert_eq!(svg.matches(r#"class="legend""#).count(), 4);
        assert!(svg.contains(">race 4</text>"));
        assert!(!svg.contains(">race 5</text>"));
        // Four entries are wider than the 3-cell plot.
        assert!(svg.contains(r#"width="240""#));
    }

    #[test]
    fn title_is_escaped() {
        let svg = SvgRenderer::new()
            .to_svg(&snapshot(), "threshold < 50% & \"rising\"")
            .unwrap();
        assert!(svg.contains("threshold &lt; 50% &amp; &quot;rising&quot;"));
    }
}
