mod app;
mod config;
mod integrator;
mod metrics;
mod projection;
mod renderer;
mod screenshot;
mod simulation;
mod ui;

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{WindowAttributes, WindowId};

use crate::config::RunConfig;
use crate::renderer::plot::{self, Plot};
use crate::renderer::RenderError;
use crate::ui::RunSummary;

struct OrbitApp {
    app: Option<app::App>,
    plot: Plot,
    summary: RunSummary,
    /// First fatal error raised inside the event loop.
    error: Option<RenderError>,
}

impl OrbitApp {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: RenderError) {
        log::error!("{}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for OrbitApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title(plot::TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(900, 900));

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };
        let view = ui::PlotView::new(self.plot.clone());
        match app::App::new(window, view, self.summary.clone()) {
            Ok(app) => {
                app.request_redraw();
                self.app = Some(app);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        // Drop the app while the window is still alive (avoids Vulkan surface semaphore panic).
        if matches!(&event, WindowEvent::CloseRequested) {
            self.app = None;
            event_loop.exit();
            return;
        }

        let Some(app) = &mut self.app else { return };

        if let WindowEvent::RedrawRequested = event {
            app.render();
            return;
        }

        if app.handle_window_event(&event) {
            app.request_redraw();
        }
    }
}

fn show_window(plot: Plot, summary: RunSummary) -> Result<(), RenderError> {
    let event_loop = EventLoop::new()?;
    // The plot is static; only redraw on events.
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut handler = OrbitApp {
        app: None,
        plot,
        summary,
        error: None,
    };
    event_loop.run_app(&mut handler)?;

    match handler.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn run(config: RunConfig) -> Result<(), Box<dyn std::error::Error>> {
    let params = config.simulation.params;
    if params.is_naked_singularity() {
        log::warn!(
            "Q = {} exceeds M = {}: the singularity is not hidden by a horizon",
            params.charge,
            params.mass
        );
    } else if let Some(r_plus) = params.outer_horizon() {
        if config.simulation.initial.r <= r_plus {
            log::warn!(
                "r0 = {} starts inside the outer horizon r+ = {}",
                config.simulation.initial.r,
                r_plus
            );
        }
    }

    let trajectory = simulation::run(&config.simulation)?;
    let summary = RunSummary::from_trajectory(&trajectory);
    for line in summary.lines() {
        log::info!("{}", line);
    }
    if trajectory.is_empty() {
        log::warn!("no samples to plot");
    }

    let plot = plot::orbit_plot(trajectory.cartesian_path());

    match &config.screenshot {
        Some(shot) => {
            let path = screenshot::render_screenshot(shot, &plot)?;
            println!("Plot saved to {}", path.display());
        }
        None => show_window(plot, summary)?,
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let config = match config::parse_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}\n\n{}", e, config::USAGE);
            std::process::exit(1);
        }
    };
    if config.show_help {
        print!("{}", config::USAGE);
        return;
    }

    if let Err(e) = run(config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
