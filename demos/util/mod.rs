#![allow(dead_code)]

use std::fs;
use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::Context;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use shore::{Engine, FaceEngineConfig, Marker, RawEngine, RecordedEngine, Recording, Region, RustfaceEngine};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_DETECTOR: &str = "demos/seeta_fd_frontal_v1.0.bin";

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Replays `replay` if given, otherwise runs the SeetaFace model at `detector`.
pub fn open_engine(
    detector: &Path,
    replay: Option<&Path>,
    config: FaceEngineConfig,
) -> anyhow::Result<Engine<Box<dyn RawEngine>>> {
    let raw: Box<dyn RawEngine> = match replay {
        Some(path) => {
            let recording =
                Recording::read(path).with_context(|| format!("cannot read recording `{}`", path.display()))?;
            info!("Replaying {} recorded frames from `{}`", recording.len(), path.display());
            Box::new(RecordedEngine::new(recording))
        }
        None => {
            let engine = RustfaceEngine::new(detector, config)
                .with_context(|| format!("cannot load detector model `{}`", detector.display()))?;
            Box::new(engine)
        }
    };
    Ok(Engine::new(raw))
}

/// Outline `region`, three pixels thick.
pub fn draw_region(image: &mut RgbImage, region: Region, color: Rgb<u8>) {
    for grow in 0..3 {
        let left = region.left().round() as i32 - grow;
        let top = region.top().round() as i32 - grow;
        let width = (region.width().round() as i32 + 2 * grow).max(1) as u32;
        let height = (region.height().round() as i32 + 2 * grow).max(1) as u32;
        draw_hollow_rect_mut(image, Rect::at(left, top).of_size(width, height), color);
    }
}

pub fn draw_markers<I: IntoIterator<Item = Marker>>(image: &mut RgbImage, markers: I, color: Rgb<u8>) {
    for marker in markers {
        draw_filled_circle_mut(image, (marker.x().round() as i32, marker.y().round() as i32), 2, color);
    }
}

pub struct Labeler {
    font: FontVec,
    scale: PxScale,
}

impl Labeler {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("cannot read font `{}`", path.display()))?;
        let font = FontVec::try_from_vec(bytes).with_context(|| format!("`{}` is not a usable font", path.display()))?;
        Ok(Self {
            font,
            scale: PxScale::from(14.0),
        })
    }

    pub fn draw(&self, image: &mut RgbImage, x: i32, y: i32, text: &str) {
        draw_text_mut(image, GREEN, x, y, self.scale, &self.font, text);
    }
}
