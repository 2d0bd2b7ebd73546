//! A freely available engine built on `rustface`, the Rust port of the
//! SeetaFace frontal detector.
//!
//! It finds faces only: every detection becomes a `Face` object with a
//! region and a `Score` rating, and each frame carries a `FrameRate` info.

use std::io::Read;
use std::path::Path;
use std::time::Instant;

use image::imageops::{self, FilterType};
use rustface::{Detector, ImageData};
use tracing::{debug, trace};

use crate::raw::{RawContent, RawEngine};
use crate::record::{ContentRecord, InfoRecord, ObjectRecord};
use crate::{ColorSpace, Engine, Error, FaceEngineConfig, Frame, ModelType, Region, Result};

const MIN_FACE_SIZE: u32 = 20;
const DEFAULT_SCORE_THRESH: f64 = 2.0;

/// Open an engine handle around a SeetaFace model file.
pub fn create_face_engine<P: AsRef<Path>>(model: P, config: FaceEngineConfig) -> Result<Engine<RustfaceEngine>> {
    Ok(Engine::new(RustfaceEngine::new(model, config)?))
}

/// Tracks the time between frames the way the engine's `timeBase` and
/// `updateTimeBase` parameters describe.
#[derive(Debug, Clone)]
struct FrameClock {
    time_base: f32,
    update: bool,
    last: Option<Instant>,
}

impl FrameClock {
    fn new(config: &FaceEngineConfig) -> Self {
        Self {
            time_base: config.time_base,
            update: config.update_time_base,
            last: None,
        }
    }

    /// Frames per second at `now`, if anything is known yet.
    fn tick(&mut self, now: Instant) -> Option<f32> {
        let measured = self
            .last
            .replace(now)
            .map(|last| now.duration_since(last).as_secs_f32())
            .filter(|elapsed| *elapsed > 0.0);

        let time_base = match measured {
            Some(elapsed) if self.update || self.time_base == 0.0 => elapsed,
            _ => self.time_base,
        };

        if time_base > 0.0 {
            Some(1.0 / time_base)
        } else {
            None
        }
    }
}

pub struct RustfaceEngine {
    detector: Box<dyn Detector>,
    image_scale: f32,
    clock: FrameClock,
    current: ContentRecord,
}

impl RustfaceEngine {
    pub fn new<P: AsRef<Path>>(model: P, config: FaceEngineConfig) -> Result<Self> {
        let path = model.as_ref();
        let path = path
            .to_str()
            .ok_or_else(|| Error::InvalidArgument(format!("model path {:?} is not valid UTF-8", path)))?;

        Self::check(&config)?;
        let detector = rustface::create_detector(path).map_err(Error::engine)?;
        debug!(model = path, "loaded SeetaFace model");
        Ok(Self::with_detector(detector, config))
    }

    pub fn from_reader<R: Read>(reader: R, config: FaceEngineConfig) -> Result<Self> {
        Self::check(&config)?;
        let model = rustface::read_model(reader).map_err(Error::engine)?;
        Ok(Self::with_detector(rustface::create_detector_with_model(model), config))
    }

    fn check(config: &FaceEngineConfig) -> Result<()> {
        config.validate()?;
        if config.model_type != ModelType::FaceFront {
            return Err(Error::InvalidArgument(format!(
                "rustface only provides a {} model, not {}",
                ModelType::FaceFront,
                config.model_type
            )));
        }
        Ok(())
    }

    fn with_detector(mut detector: Box<dyn Detector>, config: FaceEngineConfig) -> Self {
        let min_face_size = (config.min_face_size.max(0.0) as u32).max(MIN_FACE_SIZE);
        let score_thresh = if config.min_face_score > 0.0 {
            f64::from(config.min_face_score)
        } else {
            DEFAULT_SCORE_THRESH
        };

        detector.set_min_face_size(min_face_size);
        detector.set_score_thresh(score_thresh);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        Self {
            detector,
            image_scale: config.image_scale,
            clock: FrameClock::new(&config),
            current: ContentRecord::new(),
        }
    }
}

impl RawEngine for RustfaceEngine {
    fn process(&mut self, frame: &Frame, color_space: ColorSpace) -> Result<Option<&dyn RawContent>> {
        let scale = self.image_scale;
        let mut luma = frame.to_luma(color_space)?;

        if (scale - 1.0).abs() > f32::EPSILON {
            let width = ((luma.width() as f32 * scale).round() as u32).max(1);
            let height = ((luma.height() as f32 * scale).round() as u32).max(1);
            luma = imageops::resize(&luma, width, height, FilterType::Triangle);
        }

        let faces = self
            .detector
            .detect(&ImageData::new(luma.as_raw(), luma.width(), luma.height()));
        trace!(faces = faces.len(), width = luma.width(), height = luma.height(), "ran detector");

        let mut content = ContentRecord::new();
        for face in &faces {
            let bbox = face.bbox();
            let region = Region::new(
                bbox.x() as f32 / scale,
                bbox.y() as f32 / scale,
                (bbox.x() as f32 + bbox.width() as f32) / scale,
                (bbox.y() as f32 + bbox.height() as f32) / scale,
            );

            content = content.with_object(
                ObjectRecord::new("Face")
                    .with_region(region)
                    .with_rating("Score", face.score() as f32),
            );
        }

        if let Some(rate) = self.clock.tick(Instant::now()) {
            content = content.with_info("FrameRate", InfoRecord::Number(rate));
        }

        self.current = content;
        Ok(Some(&self.current))
    }

    fn release(&mut self) {
        debug!("releasing SeetaFace detector");
        self.current = ContentRecord::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn clock(time_base: f32, update: bool) -> FrameClock {
        let config = FaceEngineConfig {
            time_base,
            update_time_base: update,
            ..FaceEngineConfig::default()
        };
        FrameClock::new(&config)
    }

    #[test]
    fn fixed_time_base() {
        let mut clock = clock(0.04, false);
        let start = Instant::now();

        assert_eq!(clock.tick(start), Some(25.0));
        assert_eq!(clock.tick(start + Duration::from_millis(100)), Some(25.0));
    }

    #[test]
    fn measured_time_base() {
        let mut clock = clock(0.0, true);
        let start = Instant::now();

        assert_eq!(clock.tick(start), None);
        let rate = clock.tick(start + Duration::from_millis(50)).unwrap();
        assert!((rate - 20.0).abs() < 0.01);
    }

    #[test]
    fn configured_until_measured() {
        let mut clock = clock(0.1, true);
        let start = Instant::now();

        assert_eq!(clock.tick(start), Some(10.0));
        let rate = clock.tick(start + Duration::from_millis(25)).unwrap();
        assert!((rate - 40.0).abs() < 0.01);
    }

    #[test]
    fn profile_model_is_unavailable() {
        let config = FaceEngineConfig {
            model_type: ModelType::FaceProfile,
            ..FaceEngineConfig::default()
        };
        assert!(matches!(RustfaceEngine::check(&config), Err(Error::InvalidArgument(_))));
    }
}
