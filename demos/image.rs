//! Runs face analysis on images and saves copies with the detected regions
//! outlined.
//!
//! ```text
//! cargo run --example image --features rustface -- photos/ -o out
//! ```

mod util;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use image::GenericImageView;
use shore::{ColorSpace, FaceEngineConfig, Frame, ModelType, Recording};
use tracing::{info, warn};

const EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "tif", "png"];

#[derive(Parser, Debug)]
#[command(about = "Run face analysis on images and save the marked results")]
struct Args {
    /// Images, or directories to scan for images
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Where to save marked images; nothing is saved without it
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Image extension looked for in directories
    #[arg(short, long, default_value = "jpg")]
    extension: String,

    /// Face.Front or Face.Profile
    #[arg(long)]
    model: Option<ModelType>,

    /// Engine imageScale parameter
    #[arg(long)]
    scale: Option<f32>,

    /// SeetaFace detector model
    #[arg(long, default_value = util::DEFAULT_DETECTOR)]
    detector: PathBuf,

    /// TOML file with engine parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replay a recorded session instead of running the detector
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Save every processed frame to this file
    #[arg(long)]
    record: Option<PathBuf>,
}

fn collect_inputs(inputs: &[PathBuf], extension: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut found = fs::read_dir(input)
                .with_context(|| format!("cannot list `{}`", input.display()))?
                .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                .filter(|path| path.is_file() && path.extension().map_or(false, |ext| ext == extension))
                .collect::<Vec<_>>();
            found.sort();
            files.extend(found);
        } else if input.is_file() {
            let supported = input
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| EXTENSIONS.contains(&ext.to_lowercase().as_str()));
            if !supported {
                warn!("Input path `{}` does not have a supported image extension", input.display());
            }
            files.push(input.clone());
        } else {
            warn!("Input path `{}` does not exist", input.display());
        }
    }

    Ok(files)
}

fn output_path(output_dir: &Path, input: &Path) -> Option<PathBuf> {
    let name = input.file_name()?.to_str()?;
    let mut path = output_dir.join(format!("processed_{}", name));
    if path.extension().map_or(false, |ext| ext == "tif") {
        path.set_extension("png");
    }
    Some(path)
}

fn main() -> anyhow::Result<()> {
    util::init_logging();
    let args = Args::parse();

    let files = collect_inputs(&args.inputs, &args.extension)?;
    info!("Found {} images to process", files.len());
    if files.is_empty() {
        return Ok(());
    }

    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir).with_context(|| format!("cannot create `{}`", dir.display()))?;
    }

    let mut config = match &args.config {
        Some(path) => FaceEngineConfig::load(path).with_context(|| format!("cannot load `{}`", path.display()))?,
        None => FaceEngineConfig::default(),
    };
    if let Some(model) = args.model {
        config.model_type = model;
    }
    if let Some(scale) = args.scale {
        config.image_scale = scale;
    }

    let mut engine = util::open_engine(&args.detector, args.replay.as_deref(), config)?;
    let mut recording = args.record.as_ref().map(|_| Recording::new());

    for path in &files {
        let image = image::open(path).with_context(|| format!("cannot open `{}`", path.display()))?;
        info!("Processing image `{}` with shape {:?}", path.display(), image.dimensions());

        let gray = image.to_luma8();
        let start = Instant::now();
        let content = engine.process(&Frame::from_luma(&gray)?, ColorSpace::Grayscale)?;
        info!("- Processed image in {:.3} seconds", start.elapsed().as_secs_f32());

        info!("- Content: {}", content);
        for (key, value) in content.infos() {
            info!("  * {}: {}", key, value);
        }

        info!("- Detected {} objects", content.num_objects());
        let mut marked = image.to_rgb8();
        for object in content.objects() {
            info!("{:?}", object);
            if let Some(region) = object.region() {
                util::draw_region(&mut marked, region, util::RED);
            }
            util::draw_markers(&mut marked, object.markers().values(), util::GREEN);
        }

        if let Some(recording) = recording.as_mut() {
            recording.capture(&content)?;
        }

        let out = args
            .output_dir
            .as_deref()
            .and_then(|dir| output_path(dir, path));
        if let Some(out) = out {
            info!("- Saving marked image to `{}`", out.display());
            marked.save(&out).with_context(|| format!("cannot save `{}`", out.display()))?;
        }
    }

    engine.close();

    if let (Some(recording), Some(path)) = (recording, &args.record) {
        recording.write(path)?;
        info!("Recorded {} frames to `{}`", recording.len(), path.display());
    }

    Ok(())
}
