use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, ensure};
use clap::Parser;
use pollster::FutureExt;
use tower_core::{ConfigSource, Controller};
use wgpu::SurfaceError;
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

mod cli;
mod headless;
mod texture;
mod viewer;

use cli::Args;
use viewer::{GpuTower, ViewerState};

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::init();

    ensure!(
        args.scale_factor.is_finite() && args.scale_factor > 0.0,
        "scale_factor must be a positive number (got {})",
        args.scale_factor
    );
    ensure!(
        args.width > 0 && args.height > 0,
        "window size must be non-zero (got {}x{})",
        args.width,
        args.height
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;
    let source = ConfigSource::file(&args.config);
    let timeout = Duration::from_millis(args.config_timeout_ms);

    if args.headless {
        return headless::run(&args, &runtime, &source, timeout);
    }

    let event_loop = EventLoop::new().context("creating winit event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(format!("Tower Viewer - {}", args.config.display()))
            .with_inner_size(LogicalSize::new(args.width, args.height))
            .build(&event_loop)
            .context("creating viewer window")?,
    );

    let surface = GpuTower::new(window, args.resolved_asset_root()).block_on()?;
    let mut controller = Controller::new(surface);
    runtime
        .block_on(controller.start(&source, timeout))
        .with_context(|| format!("starting tower from {}", args.config.display()))?;
    if let Some(floor) = args.start_floor {
        controller
            .snap_to(floor)
            .with_context(|| format!("snapping to --start-floor {floor}"))?;
    }

    let floor_ids: Vec<String> = controller
        .surface()
        .floor_ids()
        .map(|id| id.to_string())
        .collect();
    println!(
        "Tower ready: floors [{}], car on {:?}",
        floor_ids.join(", "),
        controller.current_floor()
    );
    println!("Controls: Up/Down step one floor, Home/End jump to the ends, Esc quits.");

    let mut state = ViewerState::new(controller, Duration::from_millis(args.glide_ms));

    event_loop
        .run(move |event, target| {
            target.set_control_flow(ControlFlow::Wait);

            match event {
                Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key: Key::Named(NamedKey::Escape),
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => target.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key,
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => {
                            if state.handle_key(&logical_key) {
                                state.window().request_redraw();
                            }
                        }
                        WindowEvent::Resized(new_size) => state.resize(new_size),
                        WindowEvent::ScaleFactorChanged { .. } => state.rescale(),
                        WindowEvent::RedrawRequested => match state.render() {
                            Ok(_) => {}
                            Err(SurfaceError::Lost) => state.resize(state.size()),
                            Err(SurfaceError::OutOfMemory) => target.exit(),
                            Err(err) => log::error!("[tower_viewer] render error: {err:?}"),
                        },
                        _ => {}
                    }
                }
                Event::AboutToWait => {
                    if state.is_animating() {
                        state.window().request_redraw();
                    }
                }
                _ => {}
            }
        })
        .context("running viewer application")?;
    Ok(())
}
