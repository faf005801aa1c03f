//! Platform layer: windowing & event loop.
//!
//! Owns the winit application: creates the window, builds the GPU state and
//! drives the per-frame sequence (poll input, render, request next redraw).
//! Closing the window or pressing Escape ends the loop; init failures are
//! surfaced as an error from [`run`] rather than a panic.

use std::sync::Arc;

use anyhow::Result;
use renderer::{GpuState, Scene};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

struct ViewerApp {
    title: String,
    width: u32,
    height: u32,
    backends: wgpu::Backends,
    /// Taken on first resume; the scene moves into the GPU state.
    scene: Option<Scene>,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    failure: Option<anyhow::Error>,
}

impl ViewerApp {
    fn fail(&mut self, err: anyhow::Error, event_loop: &ActiveEventLoop) {
        log::error!("Fatal platform error: {err:?}");
        self.failure = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(PhysicalSize::new(self.width, self.height));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.fail(anyhow::anyhow!("Failed to create window: {err}"), event_loop);
                return;
            }
        };
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let Some(scene) = self.scene.take() else {
            return;
        };
        match pollster::block_on(GpuState::new(window.clone(), self.backends, scene)) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(err) => {
                self.fail(err, event_loop);
                return;
            }
        }
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event: key, .. } => {
                if key.state == ElementState::Pressed
                    && key.logical_key == Key::Named(NamedKey::Escape)
                {
                    log::info!("Escape pressed. Exiting event loop.");
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(new_size) => {
                log::info!("Resized: {}x{}", new_size.width, new_size.height);
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                log::info!("Scale factor changed: {:.3}", scale_factor);
                // A Resized event with the new physical size follows.
            }
            WindowEvent::RedrawRequested => {
                let Some(gpu) = self.gpu.as_mut() else {
                    return;
                };
                match gpu.render() {
                    Ok(()) => {}
                    Err(err) if GpuState::is_surface_lost(&err) => {
                        log::warn!("Surface lost/outdated; recreating.");
                        gpu.recreate_surface();
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        self.fail(
                            anyhow::anyhow!("Surface out of memory"),
                            event_loop,
                        );
                    }
                    Err(err) => {
                        log::warn!("Frame error: {err:?}");
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        // Continuous animation: keep redraws coming.
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Run the viewer window with the given scene.
/// Returns when the window is closed or Escape is pressed; returns an error
/// if window or GPU initialization failed.
pub fn run(
    backends: wgpu::Backends,
    title: &str,
    width: u32,
    height: u32,
    scene: Scene,
) -> Result<()> {
    let event_loop: EventLoop<()> =
        EventLoop::new().map_err(|e| anyhow::anyhow!("Failed to create event loop: {e:?}"))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp {
        title: title.to_string(),
        width: width.max(1),
        height: height.max(1),
        backends,
        scene: Some(scene),
        window: None,
        gpu: None,
        failure: None,
    };

    event_loop
        .run_app(&mut app)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;

    match app.failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
