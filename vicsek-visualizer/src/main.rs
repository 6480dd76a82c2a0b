use anyhow::{Context, Result};
use clap::Parser;
use dashmap::DashMap;
use env_logger::Builder;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn, LevelFilter};
use minimp4::Mp4Muxer;
use openh264::encoder::{BitRate, Encoder, EncoderConfig, FrameRate};
use openh264::formats::YUVBuffer;
use rayon::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Instant;
use vicsek_common::{read_snapshots, SimulationConfig, Snapshot};

mod chart;
mod render;

use render::{draw_frame, generate_color_palette, parse_color, rgb_to_yuv420, Frame, FrameLayout};

/// Renders recorded flock snapshots into an MP4 video.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input snapshot file (.bin, .json or .msgpack)
    #[arg(short, long)]
    input: PathBuf,

    /// Output video file path (.mp4)
    #[arg(short, long, default_value = "vicsek.mp4")]
    output: PathBuf,

    /// Width of the output video in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Height of the output video in pixels (calculated from aspect ratio if not provided)
    #[arg(long)]
    height: Option<u32>,

    /// Frames per second for the output video
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Optional path to the config.toml file to get exact world dimensions
    #[arg(long)]
    config: Option<PathBuf>,

    /// World width (used if config is not provided)
    #[arg(long, default_value_t = 20.0)]
    world_width: f64,

    /// World height (used if config is not provided)
    #[arg(long, default_value_t = 20.0)]
    world_height: f64,

    /// Radius of a drawn particle, in world units
    #[arg(long, default_value_t = 0.15)]
    point_radius: f64,

    /// Particle color - use "palette" for a color per particle, or a color name
    /// (black, white, red, green, blue, yellow, cyan, magenta)
    #[arg(long, default_value = "black")]
    color: String,

    /// Background color name
    #[arg(long, default_value = "white")]
    bg_color: String,

    /// Chunk size for parallel processing
    #[arg(long, default_value_t = 10)]
    chunk_size: usize,

    /// Also write the order parameter over time to this PNG
    #[arg(long)]
    order_plot: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    Builder::from_default_env()
        .filter(None, LevelFilter::Info)
        .init();
    run_with_args(args)
}

fn run_with_args(args: Args) -> Result<()> {
    info!("Starting Vicsek Visualizer...");
    info!("Input file: {}", args.input.display());
    info!("Output video: {}", args.output.display());

    // --- Determine World Dimensions ---
    let (world_width, world_height) = match &args.config {
        Some(config_path) => match SimulationConfig::load(config_path) {
            Ok(config) => {
                info!("Loaded world dimensions from {}", config_path.display());
                (config.universe.width, config.universe.height)
            }
            Err(e) => {
                warn!(
                    "Failed to load config file '{}': {}. Using provided dimensions.",
                    config_path.display(),
                    e
                );
                (args.world_width, args.world_height)
            }
        },
        None => (args.world_width, args.world_height),
    };
    anyhow::ensure!(
        world_width > 0.0 && world_height > 0.0,
        "world dimensions must be positive, got {}x{}",
        world_width,
        world_height
    );
    anyhow::ensure!(args.fps > 0, "fps must be positive");

    let layout = FrameLayout::new(world_width, world_height, args.width, args.height, args.point_radius);
    info!("World size: {:.2} x {:.2}", world_width, world_height);
    info!("Output video dimensions: {}x{} px ({:.3} px per unit)", layout.width, layout.height, layout.pixels_per_unit);

    // --- Load Snapshots ---
    let snapshots = read_snapshots(&args.input)
        .with_context(|| format!("Failed to read snapshots from {}", args.input.display()))?;
    info!("Found {} snapshots in the file", snapshots.len());
    if snapshots.is_empty() {
        warn!("Input file contains no snapshots. Exiting.");
        return Ok(());
    }

    if let Some(plot_path) = &args.order_plot {
        match chart::plot_order_parameter(plot_path, &snapshots, (layout.width.max(640), 480)) {
            Ok(()) => info!("Order parameter chart saved to {}", plot_path.display()),
            Err(e) => error!("Failed to draw order parameter chart: {}", e),
        }
    }

    // --- Set up Colors ---
    let bg_color = parse_color(&args.bg_color);
    let particle_count = snapshots.iter().map(|s| s.positions.len()).max().unwrap_or(0);
    let color_palette: Vec<[u8; 4]> = if args.color.eq_ignore_ascii_case("palette") {
        info!("Using color palette mode for {} particles", particle_count);
        generate_color_palette(particle_count, &mut rand::rng())
    } else {
        let single_color = parse_color(&args.color);
        info!("Using single color for all particles: {:?}", single_color);
        vec![single_color]
    };

    let start_time = Instant::now();
    let frames_map = rasterize_frames(&snapshots, &layout, bg_color, &color_palette, args.chunk_size.max(1));
    let video_bytes = encode_video(frames_map, &layout, args.fps, particle_count)?;

    fs::write(&args.output, &video_bytes)
        .with_context(|| format!("Failed to write video file to {}", args.output.display()))?;

    let duration = start_time.elapsed();
    info!(
        "Video generation completed in {:.2?} ({:.1} frames per second)",
        duration,
        snapshots.len() as f64 / duration.as_secs_f64()
    );
    info!("Output saved to: {}", args.output.display());
    Ok(())
}

/// Draws every snapshot, chunk by chunk in parallel, keyed by frame index.
fn rasterize_frames(
    snapshots: &[Snapshot],
    layout: &FrameLayout,
    bg_color: [u8; 4],
    color_palette: &[[u8; 4]],
    chunk_size: usize,
) -> DashMap<usize, image::RgbaImage> {
    let progress_bar = ProgressBar::new(snapshots.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) [{eta}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let frames_map = DashMap::new();
    snapshots
        .par_chunks(chunk_size)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let start_index = chunk_idx * chunk_size;
            for (offset, snapshot) in chunk.iter().enumerate() {
                let Frame { index, image } =
                    draw_frame(snapshot, start_index + offset, layout, bg_color, color_palette);
                frames_map.insert(index, image);
            }
            progress_bar.inc(chunk.len() as u64);
        });
    progress_bar.finish_with_message("Frames rendered");
    frames_map
}

/// Encodes the frames in index order to H.264 and muxes them into an MP4.
fn encode_video(
    frames_map: DashMap<usize, image::RgbaImage>,
    layout: &FrameLayout,
    fps: u32,
    particle_count: usize,
) -> Result<Vec<u8>> {
    info!("Setting up video encoder...");
    let mut encoder = Encoder::with_api_config(
        openh264::OpenH264API::from_source(),
        EncoderConfig::new()
            .max_frame_rate(FrameRate::from_hz(fps as f32))
            .bitrate(BitRate::from_bps(5_000_000)),
    )
    .context("Failed to initialize H.264 encoder")?;

    let encode_progress = ProgressBar::new(frames_map.len() as u64);
    encode_progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} encoded ({percent}%) [{eta}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut sorted_keys: Vec<usize> = frames_map.iter().map(|entry| *entry.key()).collect();
    sorted_keys.sort_unstable();

    // Convert batches to YUV in parallel, encode sequentially to keep frame order
    const ENCODE_BATCH_SIZE: usize = 30;
    let mut h264_data = Vec::new();
    let mut frame_count = 0usize;
    for batch in sorted_keys.chunks(ENCODE_BATCH_SIZE) {
        let yuv_frames: Vec<(usize, Vec<u8>)> = batch
            .par_iter()
            .filter_map(|&key| frames_map.remove(&key).map(|(_, image)| (key, rgb_to_yuv420(&image))))
            .collect();

        for (key, yuv_data) in yuv_frames {
            let yuv_source = YUVBuffer::from_vec(yuv_data, layout.width as usize, layout.height as usize);
            match encoder.encode(&yuv_source) {
                Ok(bitstream) => {
                    bitstream.write_vec(&mut h264_data);
                    frame_count += 1;
                }
                Err(e) => error!("Error encoding frame {}: {}", key, e),
            }
            encode_progress.inc(1);
        }
    }
    encode_progress.finish_with_message(format!("Encoded {} frames", frame_count));

    info!("Creating MP4 container...");
    let mut video_buffer = Cursor::new(Vec::new());
    {
        let mut mp4muxer = Mp4Muxer::new(&mut video_buffer);
        let description = format!("Vicsek flock - {} particles", particle_count);
        mp4muxer.init_video(layout.width as i32, layout.height as i32, false, &description);
        mp4muxer.write_video_with_fps(&h264_data, fps);
        mp4muxer.close();
    }
    Ok(video_buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_keyed_by_snapshot_index() {
        let snapshots: Vec<Snapshot> = (0..25)
            .map(|step| Snapshot {
                step,
                particle_count: 1,
                order_parameter: 1.0,
                mean_neighbor_count: 1.0,
                positions: vec![(step as f64 * 0.5, 5.0)],
                headings: None,
            })
            .collect();
        let layout = FrameLayout::new(20.0, 20.0, 64, Some(64), 0.2);
        let frames = rasterize_frames(&snapshots, &layout, [255, 255, 255, 255], &[[0, 0, 0, 255]], 4);
        assert_eq!(frames.len(), 25);
        let mut keys: Vec<usize> = frames.iter().map(|e| *e.key()).collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn cli_defaults_parse() {
        let args = Args::try_parse_from(["vicsek-visualizer", "--input", "run_snapshots.bin"]).unwrap();
        assert_eq!(args.output, PathBuf::from("vicsek.mp4"));
        assert_eq!(args.fps, 30);
        assert_eq!(args.width, 800);
        assert!(args.order_plot.is_none());
    }
}
