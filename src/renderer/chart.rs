//! Draws a [`Plot`] with `plotters` onto any drawing backend.

use std::error::Error;

use plotters::coord::Shift;
use plotters::prelude::*;

use super::plot::{finite_runs, Plot, SeriesStyle};
use super::RenderError;

const MARGIN: u32 = 15;
const X_LABEL_AREA: u32 = 50;
const Y_LABEL_AREA: u32 = 70;
const LEGEND_SWATCH: i32 = 20;

/// Draw `plot` on `root`: title, axes, series, and the legend when any series
/// carries a label.
pub fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    plot: &Plot,
) -> Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let area = root.titled(&plot.title, ("sans-serif", 28).into_font())?;

    let (w, h) = area.dim_in_pixel();
    let plotting = (
        w.saturating_sub(2 * MARGIN + Y_LABEL_AREA),
        h.saturating_sub(2 * MARGIN + X_LABEL_AREA),
    );
    let (x_range, y_range) = plot.axis_ranges(plotting);

    let mut chart = ChartBuilder::on(&area)
        .margin(MARGIN)
        .x_label_area_size(X_LABEL_AREA)
        .y_label_area_size(Y_LABEL_AREA)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(&plot.x_label)
        .y_desc(&plot.y_label)
        .draw()?;

    let legend = plot.legend_entries();
    let mut unlabelled: Vec<&str> = legend.iter().map(|e| e.label.as_str()).collect();

    for series in plot.series() {
        // Only the first series with a given label gets a legend row.
        let label = series
            .label
            .as_deref()
            .filter(|l| unlabelled.contains(l))
            .map(str::to_string);
        unlabelled.retain(|l| Some(*l) != label.as_deref());

        let color = series.color;
        match series.style {
            SeriesStyle::Line { width } => {
                let style = color.stroke_width(width);
                let drawn = chart.draw_series(finite_runs(&series.points).map(|run| {
                    PathElement::new(run.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>(), style)
                }))?;
                if let Some(label) = label {
                    drawn.label(label).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + LEGEND_SWATCH, y)], style)
                    });
                }
            }
            SeriesStyle::Marker { radius } => {
                let style = color.filled();
                let drawn = chart.draw_series(
                    series
                        .points
                        .iter()
                        .filter(|p| p.is_finite())
                        .map(|p| Circle::new((p.x, p.y), radius, style)),
                )?;
                if let Some(label) = label {
                    drawn.label(label).legend(move |(x, y)| {
                        Circle::new((x + LEGEND_SWATCH / 2, y), radius, style)
                    });
                }
            }
        }
    }

    if !legend.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

/// Render `plot` into a tightly packed RGB buffer of `width` x `height` pixels.
pub fn render_rgb(plot: &Plot, width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::EmptyImage { width, height });
    }
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw_chart(&root, plot).map_err(RenderError::Plot)?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::plot::{orbit_plot, ORBIT_COLOR};
    use glam::DVec2;

    fn circle(n: usize, r: f64) -> Vec<DVec2> {
        (0..n)
            .map(|i| {
                let phi = std::f64::consts::TAU * i as f64 / (n - 1) as f64;
                DVec2::new(r * phi.cos(), r * phi.sin())
            })
            .collect()
    }

    fn non_white(rgb: &[u8]) -> usize {
        rgb.chunks(3).filter(|p| *p != [255, 255, 255]).count()
    }

    #[test]
    fn orbit_plot_renders() {
        let rgb = render_rgb(&orbit_plot(circle(200, 10.0)), 320, 240).unwrap();
        assert_eq!(rgb.len(), 320 * 240 * 3);
        assert!(non_white(&rgb) > 0);
    }

    #[test]
    fn unlabelled_plot_renders_without_legend() {
        let mut plot = Plot::new("circle").with_equal_aspect(true);
        plot.line(circle(50, 1.0), ORBIT_COLOR, None);
        assert!(plot.legend_entries().is_empty());

        let rgb = render_rgb(&plot, 200, 200).unwrap();
        assert!(non_white(&rgb) > 0);
    }

    #[test]
    fn non_finite_points_do_not_break_rendering() {
        let mut path = circle(100, 5.0);
        path[40] = DVec2::NAN;
        path[41] = DVec2::new(f64::INFINITY, 0.0);
        assert!(render_rgb(&orbit_plot(path), 200, 150).is_ok());
        assert!(render_rgb(&orbit_plot(Vec::new()), 200, 150).is_ok());
    }

    #[test]
    fn empty_image_is_rejected() {
        let plot = orbit_plot(circle(10, 1.0));
        assert!(matches!(
            render_rgb(&plot, 0, 100),
            Err(RenderError::EmptyImage { width: 0, height: 100 })
        ));
    }
}
