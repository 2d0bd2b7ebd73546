//! Frame-by-frame analysis of a video dumped to an image sequence, with
//! tracking, gender, age and happiness labels drawn onto every frame.
//!
//! There is no camera or video decoder here: extract the frames first (for
//! example with ffmpeg, below). Annotated frames are written to disk rather
//! than shown in a window, so there is no keyboard exit either.
//!
//! ```text
//! ffmpeg -i clip.mp4 frames/%05d.png
//! cargo run --example video --features rustface -- frames --font DejaVuSans.ttf
//! ```

mod util;

use std::fmt::Display;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use shore::{ColorSpace, FaceEngineConfig, Frame, Recording};
use tracing::{debug, info, warn};

const FRAME_RATE: f32 = 30.0;

#[derive(Parser, Debug)]
#[command(about = "Analyse an image sequence frame by frame and save annotated frames")]
struct Args {
    /// Directory holding the frames
    frames: PathBuf,

    /// Frame extension
    #[arg(short, long, default_value = "png")]
    extension: String,

    /// Where to write annotated frames
    #[arg(short, long, default_value = "annotated")]
    output_dir: PathBuf,

    /// SeetaFace detector model
    #[arg(long, default_value = util::DEFAULT_DETECTOR)]
    detector: PathBuf,

    /// TrueType font for labels; labels are skipped without one
    #[arg(long)]
    font: Option<PathBuf>,

    /// Replay a recorded session instead of running the detector
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Save every processed frame to this file
    #[arg(long)]
    record: Option<PathBuf>,
}

fn label<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "None".to_owned(), |value| value.to_string())
}

fn main() -> anyhow::Result<()> {
    util::init_logging();
    let args = Args::parse();

    let mut frames = fs::read_dir(&args.frames)
        .with_context(|| format!("cannot list `{}`", args.frames.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().map_or(false, |ext| ext == args.extension.as_str()))
        .collect::<Vec<_>>();
    frames.sort();
    info!("Found {} frames at {} fps", frames.len(), FRAME_RATE);

    fs::create_dir_all(&args.output_dir).with_context(|| format!("cannot create `{}`", args.output_dir.display()))?;
    let labeler = args.font.as_deref().map(util::Labeler::load).transpose()?;

    let config = FaceEngineConfig {
        time_base: 1.0 / FRAME_RATE,
        track_faces: true,
        analyze_gender: true,
        analyze_age: true,
        analyze_happy: true,
        ..FaceEngineConfig::default()
    };
    let mut engine = util::open_engine(&args.detector, args.replay.as_deref(), config)?;
    let mut recording = args.record.as_ref().map(|_| Recording::new());

    for (index, path) in frames.iter().enumerate() {
        let mut rgb = match image::open(path) {
            Ok(image) => image.to_rgb8(),
            Err(error) => {
                warn!("Cannot get frame `{}`: {}", path.display(), error);
                break;
            }
        };

        let content = engine.process(&Frame::from_rgb(&rgb)?, ColorSpace::Rgb)?;
        debug!(frame = index, objects = content.num_objects(), "processed frame");

        if let Some(labeler) = &labeler {
            let fps = content.infos().get("FrameRate").ok();
            let y = rgb.height() as i32 - 20;
            labeler.draw(&mut rgb, 5, y, &format!("FPS: {}", label(fps)));
        }

        for object in content.objects() {
            let region = match object.region() {
                Some(region) => region,
                None => continue,
            };
            util::draw_region(&mut rgb, region, util::BLUE);

            if let Some(labeler) = &labeler {
                let attributes = object.attributes();
                let ratings = object.ratings();
                let lines = [
                    format!("Id: {}", label(attributes.get("Id").ok())),
                    format!("Gender: {}", label(attributes.get("Gender").ok())),
                    format!("Age: {}", label(ratings.get("Age").ok())),
                    format!("Happy: {}", label(ratings.get("Happy").ok())),
                ];

                let x = region.left() as i32;
                let bottom = region.bottom() as i32;
                for (line, text) in lines.iter().enumerate() {
                    labeler.draw(&mut rgb, x, bottom + 15 * (line as i32 + 1), text);
                }
            }
        }

        if let Some(recording) = recording.as_mut() {
            recording.capture(&content)?;
        }

        let out = args.output_dir.join(format!("{:05}.png", index));
        rgb.save(&out).with_context(|| format!("cannot save `{}`", out.display()))?;
    }

    engine.close();

    if let (Some(recording), Some(path)) = (recording, &args.record) {
        recording.write(path)?;
        info!("Recorded {} frames to `{}`", recording.len(), path.display());
    }

    Ok(())
}
