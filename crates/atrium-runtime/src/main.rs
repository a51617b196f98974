use std::path::PathBuf;

use clap::Parser;

use atrium_client::cli::CliArgs;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    tracing::info!("Atrium v{}", env!("CARGO_PKG_VERSION"));

    let start_dir = PathBuf::from(&args.project);
    let config_path = match &args.gallery {
        Some(path) => start_dir.join(path),
        None => match atrium_client::config::find_config(&start_dir) {
            Some(path) => path,
            None => {
                eprintln!(
                    "Error: No gallery.yaml found in {} or its parents.",
                    start_dir.display()
                );
                eprintln!("  Pass --gallery <path> or run from a gallery project directory.");
                std::process::exit(1);
            }
        },
    };

    let config = match atrium_client::config::load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Loaded gallery: {}", config.name);

    // Asset paths resolve relative to the config's directory.
    let project_root = config_path
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or(start_dir);

    let event_loop =
        winit::event_loop::EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(winit::event_loop::ControlFlow::Poll);

    let mut engine = atrium_client::engine::Engine::new(args, config, project_root);

    event_loop
        .run_app(&mut engine)
        .expect("Event loop error");
}
