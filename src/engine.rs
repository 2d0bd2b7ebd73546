use std::any::{self, Any};
use std::time::Instant;

use tracing::{debug, trace};

use crate::content::Content;
use crate::raw::RawEngine;
use crate::{ColorSpace, Error, Frame, Result};

/// Sole owner of one engine resource.
///
/// The resource is released exactly once: by [`Engine::close`] or, failing
/// that, when the handle is dropped. Results returned by
/// [`Engine::process`] borrow the handle, so the engine cannot be used again
/// or closed while they are alive.
pub struct Engine<E: RawEngine> {
    resource: Option<E>,
}

impl<E: RawEngine> Engine<E> {
    pub fn new(resource: E) -> Self {
        debug!(engine = any::type_name::<E>(), "acquired engine");
        Self {
            resource: Some(resource),
        }
    }

    /// Takes ownership of a type-erased resource, checking that it really is
    /// an `E`. Anything else is dropped untouched.
    pub fn from_resource(resource: Box<dyn Any>) -> Result<Self>
    where
        E: 'static,
    {
        match resource.downcast::<E>() {
            Ok(engine) => Ok(Self::new(*engine)),
            Err(_) => Err(Error::TypeMismatch {
                expected: any::type_name::<E>(),
            }),
        }
    }

    /// Run the engine over one frame.
    ///
    /// An engine that hands back no content yields [`Content::empty`].
    pub fn process(&mut self, frame: &Frame, color_space: ColorSpace) -> Result<Content<'_>> {
        let engine = self.resource.as_mut().ok_or(Error::Released)?;
        frame.check(color_space)?;

        let start = Instant::now();
        let raw = engine.process(frame, color_space)?;
        let content = match raw {
            Some(raw) => Content::new(raw),
            None => Content::empty(),
        };

        trace!(
            width = frame.width(),
            height = frame.height(),
            %color_space,
            objects = content.num_objects(),
            infos = content.num_infos(),
            elapsed = ?start.elapsed(),
            "processed frame"
        );

        Ok(content)
    }

    /// Release the resource. Further calls do nothing.
    pub fn close(&mut self) {
        if let Some(mut engine) = self.resource.take() {
            debug!(engine = any::type_name::<E>(), "releasing engine");
            engine.release();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.resource.is_none()
    }

    pub fn get_ref(&self) -> Option<&E> {
        self.resource.as_ref()
    }
}

impl<E: RawEngine> Drop for Engine<E> {
    fn drop(&mut self) {
        self.close();
    }
}
