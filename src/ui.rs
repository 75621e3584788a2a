use crate::integrator::SolverStatus;
use crate::renderer::chart;
use crate::renderer::plot::Plot;
use crate::simulation::Trajectory;

/// Read-only description of a finished run, shown under the plot and logged.
#[derive(Debug, Clone)]
pub struct RunSummary {
    lines: Vec<String>,
}

impl RunSummary {
    pub fn from_trajectory(trajectory: &Trajectory) -> Self {
        let params = trajectory.params;
        let mut lines = vec![format!("M = {}, Q = {}", params.mass, params.charge)];

        lines.push(match (params.outer_horizon(), params.inner_horizon()) {
            (Some(outer), Some(inner)) => format!("horizons: r+ = {:.4}, r- = {:.4}", outer, inner),
            _ => "horizons: none (naked singularity)".to_string(),
        });

        if let Some(first) = trajectory.states.first() {
            lines.push(format!("f(r0) = {:.4}", params.lapse(first.r)));
        }

        lines.push(match &trajectory.status {
            SolverStatus::Completed => format!(
                "solver: completed, {}/{} samples",
                trajectory.len(),
                trajectory.requested_samples
            ),
            SolverStatus::Failed(e) => format!(
                "solver: FAILED ({}), {}/{} samples",
                e,
                trajectory.len(),
                trajectory.requested_samples
            ),
        });

        lines.push(format!(
            "steps: {} accepted, {} rejected, {} evaluations",
            trajectory.stats.accepted_steps,
            trajectory.stats.rejected_steps,
            trajectory.stats.fn_evals
        ));

        if let Some(drift) = trajectory.energy_drift() {
            lines.push(format!("energy drift: {:.3e}", drift));
        }

        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// The plot rasterized at the size it is shown, re-rendered when that size changes.
pub struct PlotView {
    plot: Plot,
    texture: Option<egui::TextureHandle>,
}

impl PlotView {
    pub fn new(plot: Plot) -> Self {
        Self {
            plot,
            texture: None,
        }
    }

    fn show(&mut self, ui: &mut egui::Ui) {
        let size = ui.available_size();
        let ppp = ui.ctx().pixels_per_point();
        let pixels = [
            (size.x * ppp).round() as usize,
            (size.y * ppp).round() as usize,
        ];
        if pixels[0] == 0 || pixels[1] == 0 {
            return;
        }

        if self.texture.as_ref().map(|t| t.size()) != Some(pixels) {
            match chart::render_rgb(&self.plot, pixels[0] as u32, pixels[1] as u32) {
                Ok(rgb) => {
                    let image = egui::ColorImage::from_rgb(pixels, &rgb);
                    self.texture = Some(ui.ctx().load_texture(
                        "orbit_plot",
                        image,
                        egui::TextureOptions::LINEAR,
                    ));
                }
                Err(e) => {
                    log::error!("{}", e);
                    self.texture = None;
                    ui.colored_label(egui::Color32::RED, e.to_string());
                    return;
                }
            }
        }

        if let Some(texture) = &self.texture {
            ui.image((texture.id(), size));
        }
    }
}

pub fn draw_ui(ctx: &egui::Context, view: &mut PlotView, summary: &RunSummary) {
    egui::TopBottomPanel::bottom("run_summary").show(ctx, |ui| {
        ui.horizontal_wrapped(|ui| {
            for (i, line) in summary.lines().iter().enumerate() {
                if i > 0 {
                    ui.separator();
                }
                ui.label(line);
            }
        });
    });

    egui::CentralPanel::default()
        .frame(egui::Frame::default().fill(egui::Color32::WHITE))
        .show(ctx, |ui| view.show(ui));
}
