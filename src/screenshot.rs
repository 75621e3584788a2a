use std::path::PathBuf;

use plotters::prelude::*;

use crate::renderer::chart;
use crate::renderer::plot::Plot;
use crate::renderer::RenderError;

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenshotConfig {
    pub width: u32,
    pub height: u32,
    pub output: PathBuf,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 960,
            output: PathBuf::from("orbit.png"),
        }
    }
}

/// Render `plot` without a window and write it as a PNG.
pub fn render_screenshot(config: &ScreenshotConfig, plot: &Plot) -> Result<PathBuf, RenderError> {
    if config.width == 0 || config.height == 0 {
        return Err(RenderError::EmptyImage {
            width: config.width,
            height: config.height,
        });
    }

    if let Some(parent) = config.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    {
        let root =
            BitMapBackend::new(&config.output, (config.width, config.height)).into_drawing_area();
        chart::draw_chart(&root, plot).map_err(RenderError::Plot)?;
    }

    log::info!(
        "Wrote {}x{} plot to {}",
        config.width,
        config.height,
        config.output.display()
    );
    Ok(config.output.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::plot::orbit_plot;
    use glam::DVec2;
    use tempfile::TempDir;

    #[test]
    fn writes_png_into_new_directory() {
        let dir = TempDir::new().unwrap();
        let config = ScreenshotConfig {
            width: 320,
            height: 240,
            output: dir.path().join("plots").join("orbit.png"),
        };
        let path = vec![DVec2::new(10.0, 0.0), DVec2::new(0.0, 10.0), DVec2::new(-10.0, 0.0)];

        let written = render_screenshot(&config, &orbit_plot(path)).unwrap();

        assert_eq!(written, config.output);
        let bytes = std::fs::read(&written).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn zero_sized_image_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config = ScreenshotConfig {
            width: 0,
            height: 240,
            output: dir.path().join("orbit.png"),
        };
        let result = render_screenshot(&config, &orbit_plot(Vec::new()));
        assert!(matches!(result, Err(RenderError::EmptyImage { .. })));
        assert!(!config.output.exists());
    }
}
