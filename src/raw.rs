//! The call contract of the face-analysis engine.
//!
//! Backends (the native shim, the rustface engine, recorded sessions)
//! implement these traits; everything above them only talks through them.
//! Index-based accessors are only ever called with `index < count`.

use std::fmt;

use crate::{ColorSpace, Frame, Result};

/// A frame-level value not tied to any object, such as `FrameRate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Info<'a> {
    Number(f32),
    Text(&'a str),
}

impl<'a> Info<'a> {
    /// Numeric value, parsing text infos if they hold a number.
    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Info::Number(value) => Some(value),
            Info::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl<'a> fmt::Display for Info<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Info::Number(value) => write!(f, "{}", value),
            Info::Text(text) => f.write_str(text),
        }
    }
}

pub trait RawEngine {
    /// Analyse one frame. `Ok(None)` means the engine produced no content,
    /// which callers treat as a frame with nothing in it.
    fn process(&mut self, frame: &Frame, color_space: ColorSpace) -> Result<Option<&dyn RawContent>>;

    /// Free the underlying resource. [`Engine`](crate::Engine) calls this at most once.
    fn release(&mut self);
}

impl<E: RawEngine + ?Sized> RawEngine for Box<E> {
    fn process(&mut self, frame: &Frame, color_space: ColorSpace) -> Result<Option<&dyn RawContent>> {
        (**self).process(frame, color_space)
    }

    fn release(&mut self) {
        (**self).release()
    }
}

pub trait RawContent {
    fn object_count(&self) -> usize;
    fn object(&self, index: usize) -> &dyn RawObject;

    fn info_count(&self) -> usize;
    fn info_key(&self, index: usize) -> &str;
    fn info(&self, index: usize) -> Info;
    fn info_of(&self, key: &str) -> Option<Info>;
}

pub trait RawObject {
    fn kind(&self) -> &str;
    fn region(&self) -> Option<&dyn RawRegion>;

    fn marker_count(&self) -> usize;
    fn marker_key(&self, index: usize) -> &str;
    fn marker(&self, index: usize) -> &dyn RawMarker;
    fn marker_of(&self, key: &str) -> Option<&dyn RawMarker>;

    fn attribute_count(&self) -> usize;
    fn attribute_key(&self, index: usize) -> &str;
    fn attribute(&self, index: usize) -> &str;
    fn attribute_of(&self, key: &str) -> Option<&str>;

    fn rating_count(&self) -> usize;
    fn rating_key(&self, index: usize) -> &str;
    fn rating(&self, index: usize) -> f32;
    fn rating_of(&self, key: &str) -> Option<f32>;

    fn part_count(&self) -> usize;
    fn part_key(&self, index: usize) -> &str;
    fn part(&self, index: usize) -> &dyn RawObject;
    fn part_of(&self, key: &str) -> Option<&dyn RawObject>;
}

pub trait RawRegion {
    fn left(&self) -> f32;
    fn top(&self) -> f32;
    fn right(&self) -> f32;
    fn bottom(&self) -> f32;
}

pub trait RawMarker {
    fn x(&self) -> f32;
    fn y(&self) -> f32;
}
