use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use instrument_panel::instruments::standard_set;
use instrument_panel::{
    run_window, KnobInput, Panel, PanelConfig, SimulatedBus, StatusOverlay, VirtualKnobs,
};

/// Bitmap flight instrument panel
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the gauge bitmaps
    #[clap(long, default_value = "bitmaps")]
    assets: PathBuf,

    /// Font for the connection status message
    #[clap(long)]
    font: Option<PathBuf>,

    /// Skip multiply-blended shadow layers
    #[clap(long)]
    no_shadows: bool,

    /// Run without knobs, display only
    #[clap(long)]
    no_knobs: bool,

    /// Frame rate cap
    #[clap(long, default_value_t = 60.0)]
    fps: f64,

    /// Window width in logical pixels
    #[clap(long, default_value_t = 1600)]
    width: usize,

    /// Window height in logical pixels
    #[clap(long, default_value_t = 1000)]
    height: usize,
}

fn main() -> Result<()> {
    let env = env_logger::Env::default()
        .filter_or("PANEL_LOG", "info")
        .write_style_or("PANEL_LOG", "always");
    env_logger::init_from_env(env);

    let args = Args::parse();
    let config = PanelConfig::builder()
        .window_width(args.width)
        .window_height(args.height)
        .max_framerate(args.fps)
        .asset_dir(args.assets)
        .enable_shadows(!args.no_shadows)
        .hardware_knobs(!args.no_knobs)
        .build();

    let mut bus = SimulatedBus::new();
    let mut knobs = config.hardware_knobs.then(VirtualKnobs::new);
    let instruments = standard_set(
        &config,
        &mut bus,
        knobs.as_mut().map(|k| k as &mut dyn KnobInput),
    );
    info!("assets from {:?}", config.asset_dir);

    let mut panel = Panel::new(config, instruments);
    if let Some(path) = &args.font {
        let size = panel.config().status_font_size;
        let color = panel.config().status_color;
        match StatusOverlay::from_file(path, size, color) {
            Ok(overlay) => panel = panel.with_overlay(overlay),
            Err(e) => warn!("no status overlay: {:#}", e),
        }
    }

    run_window("Instrument Panel", panel, bus, knobs)
}
