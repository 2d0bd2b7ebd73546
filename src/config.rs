//! Engine construction parameters.
//!
//! Field names serialize in the engine's own camelCase spelling, so a TOML
//! file can be written straight from the engine documentation:
//!
//! ```toml
//! modelType = "Face.Profile"
//! imageScale = 0.5
//! analyzeAge = true
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    #[serde(rename = "Face.Front")]
    FaceFront,
    #[serde(rename = "Face.Profile")]
    FaceProfile,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::FaceFront => "Face.Front",
            ModelType::FaceProfile => "Face.Profile",
        }
    }
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::FaceFront
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "Face.Front" => Ok(ModelType::FaceFront),
            "Face.Profile" => Ok(ModelType::FaceProfile),
            _ => Err(Error::InvalidArgument(format!("unknown model type `{}`", name))),
        }
    }
}

/// Parameters of the face engine factory. Defaults match the engine's own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FaceEngineConfig {
    /// Seconds between frames; 0 lets the engine measure it.
    pub time_base: f32,
    pub update_time_base: bool,
    pub thread_count: u32,
    pub model_type: ModelType,
    pub image_scale: f32,
    pub min_face_size: f32,
    pub min_face_score: f32,
    pub id_memory_length: u32,
    pub id_memory_type: String,
    pub track_faces: bool,
    pub phantom_trap: String,
    pub search_eyes: bool,
    pub search_nose: bool,
    pub search_mouth: bool,
    pub analyze_eyes: bool,
    pub analyze_mouth: bool,
    pub analyze_gender: bool,
    pub analyze_age: bool,
    pub analyze_happy: bool,
    pub analyze_sad: bool,
    #[serde(alias = "analyzeSurprized")]
    pub analyze_surprised: bool,
    pub analyze_angry: bool,
    pub point_locator: String,
}

impl Default for FaceEngineConfig {
    fn default() -> Self {
        Self {
            time_base: 0.0,
            update_time_base: true,
            thread_count: 2,
            model_type: ModelType::FaceFront,
            image_scale: 1.0,
            min_face_size: 0.0,
            min_face_score: 0.0,
            id_memory_length: 0,
            id_memory_type: "Spatial".to_owned(),
            track_faces: true,
            phantom_trap: "Off".to_owned(),
            search_eyes: true,
            search_nose: false,
            search_mouth: false,
            analyze_eyes: false,
            analyze_mouth: false,
            analyze_gender: false,
            analyze_age: false,
            analyze_happy: false,
            analyze_sad: false,
            analyze_surprised: false,
            analyze_angry: false,
            point_locator: "Off".to_owned(),
        }
    }
}

impl FaceEngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.image_scale > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "imageScale must be positive, got {}",
                self.image_scale
            )));
        }
        if self.time_base < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "timeBase must not be negative, got {}",
                self.time_base
            )));
        }
        if self.thread_count == 0 {
            return Err(Error::InvalidArgument("threadCount must be at least 1".to_owned()));
        }
        Ok(())
    }
}

/// Input of the script-driven engine factory: a setup script and the
/// entry point to call in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupScript {
    pub script: String,
    pub call: String,
}

impl SetupScript {
    pub fn new(script: &str, call: &str) -> Self {
        Self {
            script: script.to_owned(),
            call: call.to_owned(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P, call: &str) -> Result<Self> {
        Ok(Self::new(&fs::read_to_string(path)?, call))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine() {
        let config = FaceEngineConfig::default();
        assert_eq!(config.thread_count, 2);
        assert_eq!(config.model_type, ModelType::FaceFront);
        assert_eq!(config.image_scale, 1.0);
        assert_eq!(config.id_memory_type, "Spatial");
        assert!(config.track_faces);
        assert!(config.search_eyes);
        assert!(!config.analyze_age);
        assert_eq!(config.point_locator, "Off");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = FaceEngineConfig::from_toml(
            r#"
            modelType = "Face.Profile"
            imageScale = 0.5
            analyzeAge = true
            "#,
        )
        .unwrap();

        assert_eq!(config.model_type, ModelType::FaceProfile);
        assert_eq!(config.image_scale, 0.5);
        assert!(config.analyze_age);
        assert_eq!(config.thread_count, 2);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(FaceEngineConfig::from_toml("imageScale = 0.0").is_err());
        assert!(FaceEngineConfig::from_toml("timeBase = -1.0").is_err());
        assert!(FaceEngineConfig::from_toml("modelType = \"Face.Side\"").is_err());
    }

    #[test]
    fn model_type_names() {
        assert_eq!("Face.Profile".parse::<ModelType>().unwrap(), ModelType::FaceProfile);
        assert_eq!(ModelType::FaceFront.to_string(), "Face.Front");
        assert!("face.front".parse::<ModelType>().is_err());
    }
}
