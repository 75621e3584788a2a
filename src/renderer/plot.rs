//! Description of a 2D line plot, independent of where it is drawn.

use std::ops::Range;

use glam::DVec2;
use plotters::style::{RGBColor, BLACK};

pub const TITLE: &str = "Reissner-Nordström Geodesic Simulation";
pub const ORBIT_LABEL: &str = "Reissner-Nordström Orbit";
pub const BLACK_HOLE_LABEL: &str = "Black Hole";

/// Default line color of the first series (tab:blue).
pub const ORBIT_COLOR: RGBColor = RGBColor(31, 119, 180);

/// Fraction of the data extent left empty on each side.
const DATA_PADDING: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesStyle {
    Line { width: u32 },
    Marker { radius: u32 },
}

#[derive(Debug, Clone)]
pub struct Series {
    pub label: Option<String>,
    pub style: SeriesStyle,
    pub color: RGBColor,
    pub points: Vec<DVec2>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub style: SeriesStyle,
    pub color: RGBColor,
}

#[derive(Debug, Clone, Default)]
pub struct Plot {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub equal_aspect: bool,
    series: Vec<Series>,
}

impl Plot {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn with_axis_labels(mut self, x_label: &str, y_label: &str) -> Self {
        self.x_label = x_label.to_string();
        self.y_label = y_label.to_string();
        self
    }

    pub fn with_equal_aspect(mut self, equal_aspect: bool) -> Self {
        self.equal_aspect = equal_aspect;
        self
    }

    pub fn line(&mut self, points: Vec<DVec2>, color: RGBColor, label: Option<&str>) {
        self.series.push(Series {
            label: label.map(str::to_string),
            style: SeriesStyle::Line { width: 2 },
            color,
            points,
        });
    }

    pub fn marker(&mut self, point: DVec2, color: RGBColor, label: Option<&str>) {
        self.series.push(Series {
            label: label.map(str::to_string),
            style: SeriesStyle::Marker { radius: 5 },
            color,
            points: vec![point],
        });
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Legend built from the series currently on the plot. Unlabelled series
    /// are skipped and a repeated label keeps its first entry, so the result
    /// may be empty.
    pub fn legend_entries(&self) -> Vec<LegendEntry> {
        let mut entries: Vec<LegendEntry> = Vec::new();
        for series in &self.series {
            let Some(label) = series.label.as_deref().filter(|l| !l.is_empty()) else {
                continue;
            };
            if entries.iter().any(|e| e.label == label) {
                continue;
            }
            entries.push(LegendEntry {
                label: label.to_string(),
                style: series.style,
                color: series.color,
            });
        }
        entries
    }

    /// Bounds of all finite points, or a unit box around the origin.
    pub fn data_bounds(&self) -> Bounds {
        Bounds::from_points(self.series.iter().flat_map(|s| s.points.iter().copied()))
            .unwrap_or(Bounds::new(DVec2::splat(-1.0), DVec2::splat(1.0)))
    }

    /// Axis ranges for a plotting area of `pixels`. With equal aspect the
    /// shorter side is widened so both axes use the same units per pixel.
    pub fn axis_ranges(&self, pixels: (u32, u32)) -> (Range<f64>, Range<f64>) {
        let mut bounds = self.data_bounds().padded(DATA_PADDING);
        if self.equal_aspect && pixels.0 > 0 && pixels.1 > 0 {
            bounds = bounds.with_aspect(pixels.0 as f64 / pixels.1 as f64);
        }
        (bounds.min.x..bounds.max.x, bounds.min.y..bounds.max.y)
    }
}

/// The orbit plot: trajectory line plus a marker for the black hole at the origin.
pub fn orbit_plot(path: Vec<DVec2>) -> Plot {
    let mut plot = Plot::new(TITLE)
        .with_axis_labels("x", "y")
        .with_equal_aspect(true);
    plot.line(path, ORBIT_COLOR, Some(ORBIT_LABEL));
    plot.marker(DVec2::ZERO, BLACK, Some(BLACK_HOLE_LABEL));
    plot
}

/// Consecutive runs of finite points long enough to draw as a polyline.
pub fn finite_runs(points: &[DVec2]) -> impl Iterator<Item = &[DVec2]> {
    points
        .split(|p| !p.is_finite())
        .filter(|run| run.len() >= 2)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: DVec2,
    pub max: DVec2,
}

impl Bounds {
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = DVec2>) -> Option<Self> {
        points
            .into_iter()
            .filter(|p| p.is_finite())
            .fold(None, |acc: Option<Bounds>, p| match acc {
                None => Some(Bounds::new(p, p)),
                Some(b) => Some(Bounds::new(b.min.min(p), b.max.max(p))),
            })
    }

    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }

    pub fn center(&self) -> DVec2 {
        0.5 * (self.min + self.max)
    }

    /// Grow each side by `fraction` of the extent. A zero extent becomes one unit.
    pub fn padded(&self, fraction: f64) -> Self {
        let size = self.size();
        let extent = DVec2::new(
            if size.x > 0.0 { size.x } else { 1.0 },
            if size.y > 0.0 { size.y } else { 1.0 },
        );
        let pad = extent * fraction + (extent - size) * 0.5;
        Bounds::new(self.min - pad, self.max + pad)
    }

    /// Smallest box with the same center, containing `self`, whose
    /// width / height equals `aspect`.
    pub fn with_aspect(&self, aspect: f64) -> Self {
        let size = self.size();
        let half = if size.x < size.y * aspect {
            DVec2::new(size.y * aspect, size.y) * 0.5
        } else {
            DVec2::new(size.x, size.x / aspect) * 0.5
        };
        let center = self.center();
        Bounds::new(center - half, center + half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legend_is_collected_from_labelled_series() {
        let plot = orbit_plot(vec![DVec2::new(1.0, 0.0), DVec2::new(0.0, 1.0)]);
        let entries = plot.legend_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].label, ORBIT_LABEL);
        assert!(matches!(entries[0].style, SeriesStyle::Line { .. }));
        assert_eq!(entries[1].label, BLACK_HOLE_LABEL);
        assert_eq!(entries[1].color, BLACK);
    }

    #[test]
    fn unlabelled_plot_has_empty_legend() {
        let mut plot = Plot::new("empty");
        assert!(plot.legend_entries().is_empty());
        plot.line(vec![DVec2::ZERO, DVec2::ONE], ORBIT_COLOR, None);
        plot.marker(DVec2::ZERO, BLACK, Some(""));
        assert!(plot.legend_entries().is_empty());
    }

    #[test]
    fn repeated_labels_appear_once() {
        let mut plot = Plot::new("twice");
        plot.line(vec![DVec2::ZERO, DVec2::ONE], ORBIT_COLOR, Some("orbit"));
        plot.line(vec![DVec2::ONE, DVec2::X], ORBIT_COLOR, Some("orbit"));
        assert_eq!(plot.legend_entries().len(), 1);
    }

    #[test]
    fn bounds_skip_non_finite_points() {
        let mut plot = Plot::new("nan");
        plot.line(
            vec![DVec2::new(-3.0, 1.0), DVec2::NAN, DVec2::new(2.0, 5.0)],
            ORBIT_COLOR,
            None,
        );
        let b = plot.data_bounds();
        assert_eq!(b.min, DVec2::new(-3.0, 1.0));
        assert_eq!(b.max, DVec2::new(2.0, 5.0));
    }

    #[test]
    fn empty_plot_has_unit_bounds() {
        let b = Plot::new("nothing").data_bounds();
        assert_eq!(b.size(), DVec2::splat(2.0));
    }

    #[test]
    fn padding_opens_degenerate_bounds() {
        let b = Bounds::new(DVec2::new(2.0, 0.0), DVec2::new(2.0, 4.0)).padded(0.0);
        assert_eq!(b.min.x, 1.5);
        assert_eq!(b.max.x, 2.5);
        assert_eq!(b.min.y, 0.0);
        assert_eq!(b.max.y, 4.0);
    }

    #[test]
    fn finite_runs_break_at_nan() {
        let points = [
            DVec2::ZERO,
            DVec2::ONE,
            DVec2::NAN,
            DVec2::X,
            DVec2::new(f64::INFINITY, 0.0),
            DVec2::Y,
            DVec2::ONE,
            DVec2::ZERO,
        ];
        let runs: Vec<&[DVec2]> = finite_runs(&points).collect();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].len(), 2);
        assert_eq!(runs[1].len(), 3);
    }

    #[test]
    fn aspect_widens_the_short_side() {
        let b = Bounds::new(DVec2::new(-10.0, -5.0), DVec2::new(10.0, 5.0));

        let square = b.with_aspect(1.0);
        assert_eq!(square.min, DVec2::new(-10.0, -10.0));
        assert_eq!(square.max, DVec2::new(10.0, 10.0));

        let wide = b.with_aspect(4.0);
        assert_eq!(wide.min, DVec2::new(-20.0, -5.0));
        assert_eq!(wide.max, DVec2::new(20.0, 5.0));
    }

    #[test]
    fn equal_aspect_ranges_share_units_per_pixel() {
        let plot = orbit_plot(vec![DVec2::new(-20.0, -3.0), DVec2::new(20.0, 3.0)]);
        let (x, y) = plot.axis_ranges((800, 400));
        let x_per_px = (x.end - x.start) / 800.0;
        let y_per_px = (y.end - y.start) / 400.0;
        assert!((x_per_px - y_per_px).abs() < 1e-12);
        assert!(x.start <= -20.0 && x.end >= 20.0);
        assert!(y.start <= -3.0 && y.end >= 3.0);
        assert!((x.start + x.end).abs() < 1e-12);
    }

    #[test]
    fn free_aspect_ranges_follow_the_data() {
        let mut plot = Plot::new("free");
        plot.line(vec![DVec2::ZERO, DVec2::new(10.0, 1.0)], ORBIT_COLOR, None);
        let (x, y) = plot.axis_ranges((100, 100));
        assert!((x.start + 0.5).abs() < 1e-12 && (x.end - 10.5).abs() < 1e-12);
        assert!((y.start + 0.05).abs() < 1e-12 && (y.end - 1.05).abs() < 1e-12);
    }
}
