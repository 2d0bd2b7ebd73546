//! A typed, borrow-checked face onto a native face-analysis engine.
//!
//! The engine itself (detection, landmarks, demographic and expression
//! analysis) lives behind the [`RawEngine`] trait. This crate wraps whatever
//! implements it in an [`Engine`] handle with guaranteed, single release, and
//! presents each processed frame as a [`Content`] whose collections are read
//! lazily through [`LazyView`]s instead of being copied out up front.
//!
//! ```no_run
//! # fn main() -> shore::Result<()> {
//! use shore::{ColorSpace, Engine, Frame, Recording, RecordedEngine};
//!
//! let recording = Recording::read("session.bin")?;
//! let mut engine = Engine::new(RecordedEngine::new(recording));
//!
//! let pixels = vec![0u8; 640 * 480];
//! let frame = Frame::gray(&pixels, 640, 480)?;
//! let content = engine.process(&frame, ColorSpace::Grayscale)?;
//!
//! for object in content.objects() {
//!     println!("{:?}", object);
//! }
//! # Ok(())
//! # }
//! ```

use std::io;

mod config;
mod content;
mod engine;
mod frame;
mod raw;
mod record;
mod view;

#[cfg(feature = "native")]
pub mod native;
#[cfg(feature = "rustface")]
pub mod rustface_backend;

pub use config::{FaceEngineConfig, ModelType, SetupScript};
pub use content::{
    Attributes, Content, DetectedObject, Infos, Marker, Markers, Parts, Ratings, Region,
    MAX_PART_DEPTH,
};
pub use engine::Engine;
pub use frame::{ColorSpace, Frame};
pub use raw::{Info, RawContent, RawEngine, RawMarker, RawObject, RawRegion};
pub use record::{ContentRecord, InfoRecord, ObjectRecord, RecordedEngine, Recording};
pub use view::{Accessors, Iter, LazyView};

#[cfg(feature = "rustface")]
pub use rustface_backend::RustfaceEngine;

pub type Vector2 = nalgebra::Vector2<f32>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A resource handed to [`Engine::from_resource`] was not an engine.
    #[error("expected an engine resource of type `{expected}`")]
    TypeMismatch { expected: &'static str },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Raised when a keyed lookup on a [`LazyView`] finds nothing.
    #[error("no entry for key `{0}`")]
    KeyNotFound(String),

    #[error("frame layout mismatch: {0}")]
    FrameLayout(String),

    #[error("engine has already been released")]
    Released,

    #[error("object parts nest deeper than {0} levels")]
    PartDepth(usize),

    /// Failure reported by the engine backend, passed through untouched.
    #[error(transparent)]
    Engine(Box<dyn std::error::Error + Send + Sync>),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("invalid engine configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Wraps a backend failure without interpreting it.
    pub fn engine<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Engine(error.into())
    }
}
