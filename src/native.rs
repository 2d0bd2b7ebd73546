//! Bindings to the proprietary engine through its C ABI shim (`libshore_c`).
//!
//! The shim exposes one plain C function per engine accessor and hands out
//! borrowed pointers: contents stay valid until the next process call on
//! the same engine, objects/regions/markers as long as their content.
//! Set `SHORE_LIB_DIR` to the directory holding the shim when building with
//! the `native` feature.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_float, c_int, c_long, c_ulong};
use std::ptr::NonNull;

use tracing::{debug, warn};

use crate::raw::{Info, RawContent, RawEngine, RawMarker, RawObject, RawRegion};
use crate::{ColorSpace, Engine, Error, FaceEngineConfig, Frame, Result, SetupScript};

mod ffi {
    use super::*;

    #[repr(C)]
    pub struct Engine {
        _private: [u8; 0],
    }

    #[repr(C)]
    pub struct Content {
        _private: [u8; 0],
    }

    #[repr(C)]
    pub struct Object {
        _private: [u8; 0],
    }

    #[repr(C)]
    pub struct Region {
        _private: [u8; 0],
    }

    #[repr(C)]
    pub struct Marker {
        _private: [u8; 0],
    }

    #[repr(C)]
    pub struct FaceEngineParams {
        pub time_base: c_float,
        pub update_time_base: c_int,
        pub thread_count: c_ulong,
        pub model_type: *const c_char,
        pub image_scale: c_float,
        pub min_face_size: c_float,
        pub min_face_score: c_float,
        pub id_memory_length: c_ulong,
        pub id_memory_type: *const c_char,
        pub track_faces: c_int,
        pub phantom_trap: *const c_char,
        pub search_eyes: c_int,
        pub search_nose: c_int,
        pub search_mouth: c_int,
        pub analyze_eyes: c_int,
        pub analyze_mouth: c_int,
        pub analyze_gender: c_int,
        pub analyze_age: c_int,
        pub analyze_happy: c_int,
        pub analyze_sad: c_int,
        pub analyze_surprised: c_int,
        pub analyze_angry: c_int,
        pub point_locator: *const c_char,
    }

    #[link(name = "shore_c")]
    extern "C" {
        pub fn shore_version() -> *const c_char;
        pub fn shore_last_error() -> *const c_char;

        pub fn shore_create_face_engine(params: *const FaceEngineParams) -> *mut Engine;
        pub fn shore_create_engine(script: *const c_char, call: *const c_char) -> *mut Engine;
        pub fn shore_delete_engine(engine: *mut Engine);
        pub fn shore_engine_process(
            engine: *mut Engine,
            image: *const u8,
            width: c_ulong,
            height: c_ulong,
            planes: c_ulong,
            pixel_feed: c_long,
            line_feed: c_long,
            plane_feed: c_long,
            color_space: *const c_char,
        ) -> *const Content;

        pub fn shore_content_object_count(content: *const Content) -> c_ulong;
        pub fn shore_content_object(content: *const Content, index: c_ulong) -> *const Object;
        pub fn shore_content_info_count(content: *const Content) -> c_ulong;
        pub fn shore_content_info_key(content: *const Content, index: c_ulong) -> *const c_char;
        pub fn shore_content_info(content: *const Content, index: c_ulong) -> *const c_char;
        pub fn shore_content_info_of(content: *const Content, key: *const c_char) -> *const c_char;

        pub fn shore_object_type(object: *const Object) -> *const c_char;
        pub fn shore_object_region(object: *const Object) -> *const Region;

        pub fn shore_object_marker_count(object: *const Object) -> c_ulong;
        pub fn shore_object_marker_key(object: *const Object, index: c_ulong) -> *const c_char;
        pub fn shore_object_marker(object: *const Object, index: c_ulong) -> *const Marker;
        pub fn shore_object_marker_of(object: *const Object, key: *const c_char) -> *const Marker;

        pub fn shore_object_attribute_count(object: *const Object) -> c_ulong;
        pub fn shore_object_attribute_key(object: *const Object, index: c_ulong) -> *const c_char;
        pub fn shore_object_attribute(object: *const Object, index: c_ulong) -> *const c_char;
        pub fn shore_object_attribute_of(object: *const Object, key: *const c_char) -> *const c_char;

        pub fn shore_object_rating_count(object: *const Object) -> c_ulong;
        pub fn shore_object_rating_key(object: *const Object, index: c_ulong) -> *const c_char;
        pub fn shore_object_rating(object: *const Object, index: c_ulong) -> c_float;
        pub fn shore_object_rating_of(object: *const Object, key: *const c_char, rating: *mut c_float) -> c_int;

        pub fn shore_object_part_count(object: *const Object) -> c_ulong;
        pub fn shore_object_part_key(object: *const Object, index: c_ulong) -> *const c_char;
        pub fn shore_object_part(object: *const Object, index: c_ulong) -> *const Object;
        pub fn shore_object_part_of(object: *const Object, key: *const c_char) -> *const Object;

        pub fn shore_region_left(region: *const Region) -> c_float;
        pub fn shore_region_top(region: *const Region) -> c_float;
        pub fn shore_region_right(region: *const Region) -> c_float;
        pub fn shore_region_bottom(region: *const Region) -> c_float;

        pub fn shore_marker_x(marker: *const Marker) -> c_float;
        pub fn shore_marker_y(marker: *const Marker) -> c_float;
    }
}

unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a CStr> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr))
    }
}

/// Keys and values the engine hands back must be UTF-8. Anything else is
/// reported and read as `""`, which can shadow a real empty key.
fn engine_str(value: Option<&CStr>) -> &str {
    match value.map(CStr::to_str) {
        Some(Ok(text)) => text,
        Some(Err(error)) => {
            warn!(%error, "engine returned a string that is not UTF-8");
            ""
        }
        None => {
            warn!("engine returned a null string");
            ""
        }
    }
}

/// Borrow a string owned by the engine.
unsafe fn text<'a>(ptr: *const c_char) -> &'a str {
    engine_str(c_str(ptr))
}

unsafe fn lossy(ptr: *const c_char) -> String {
    c_str(ptr)
        .map(|value| value.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Borrow an object owned by the engine; the engine never hands out null
/// for an in-range index.
unsafe fn borrow<'a, T>(ptr: *const T) -> &'a T {
    debug_assert!(!ptr.is_null());
    &*ptr
}

fn c_string(value: &str) -> Result<CString> {
    CString::new(value).map_err(|_| Error::InvalidArgument(format!("`{}` contains a NUL byte", value)))
}

fn last_error() -> Error {
    let message = unsafe { lossy(ffi::shore_last_error()) };
    if message.is_empty() {
        Error::engine("engine creation failed")
    } else {
        Error::engine(message)
    }
}

/// Version string reported by the engine library.
pub fn version() -> String {
    unsafe { lossy(ffi::shore_version()) }
}

pub fn create_face_engine(config: &FaceEngineConfig) -> Result<Engine<NativeEngine>> {
    config.validate()?;

    let model_type = c_string(config.model_type.as_str())?;
    let id_memory_type = c_string(&config.id_memory_type)?;
    let phantom_trap = c_string(&config.phantom_trap)?;
    let point_locator = c_string(&config.point_locator)?;

    let params = ffi::FaceEngineParams {
        time_base: config.time_base,
        update_time_base: config.update_time_base as c_int,
        thread_count: c_ulong::from(config.thread_count),
        model_type: model_type.as_ptr(),
        image_scale: config.image_scale,
        min_face_size: config.min_face_size,
        min_face_score: config.min_face_score,
        id_memory_length: c_ulong::from(config.id_memory_length),
        id_memory_type: id_memory_type.as_ptr(),
        track_faces: config.track_faces as c_int,
        phantom_trap: phantom_trap.as_ptr(),
        search_eyes: config.search_eyes as c_int,
        search_nose: config.search_nose as c_int,
        search_mouth: config.search_mouth as c_int,
        analyze_eyes: config.analyze_eyes as c_int,
        analyze_mouth: config.analyze_mouth as c_int,
        analyze_gender: config.analyze_gender as c_int,
        analyze_age: config.analyze_age as c_int,
        analyze_happy: config.analyze_happy as c_int,
        analyze_sad: config.analyze_sad as c_int,
        analyze_surprised: config.analyze_surprised as c_int,
        analyze_angry: config.analyze_angry as c_int,
        point_locator: point_locator.as_ptr(),
    };

    let raw = unsafe { ffi::shore_create_face_engine(&params) };
    NonNull::new(raw).map(NativeEngine::new).map(Engine::new).ok_or_else(last_error)
}

pub fn create_engine(setup: &SetupScript) -> Result<Engine<NativeEngine>> {
    let script = c_string(&setup.script)?;
    let call = c_string(&setup.call)?;

    let raw = unsafe { ffi::shore_create_engine(script.as_ptr(), call.as_ptr()) };
    NonNull::new(raw).map(NativeEngine::new).map(Engine::new).ok_or_else(last_error)
}

/// An engine created by the native library. Only [`Engine`] frees it.
pub struct NativeEngine {
    raw: NonNull<ffi::Engine>,
}

impl NativeEngine {
    fn new(raw: NonNull<ffi::Engine>) -> Self {
        debug!(engine = ?raw, "created native engine");
        Self { raw }
    }
}

impl RawEngine for NativeEngine {
    fn process(&mut self, frame: &Frame, color_space: ColorSpace) -> Result<Option<&dyn RawContent>> {
        let tag: &CStr = match color_space {
            ColorSpace::Grayscale => c"GRAYSCALE",
            ColorSpace::Rgb => c"RGB",
            ColorSpace::Bgr => c"BGR",
        };

        let content = unsafe {
            ffi::shore_engine_process(
                self.raw.as_ptr(),
                frame.data().as_ptr(),
                c_ulong::from(frame.width()),
                c_ulong::from(frame.height()),
                c_ulong::from(frame.planes()),
                frame.pixel_feed() as c_long,
                frame.line_feed() as c_long,
                frame.plane_feed() as c_long,
                tag.as_ptr(),
            )
        };

        Ok(unsafe { content.as_ref() }.map(|content| content as &dyn RawContent))
    }

    fn release(&mut self) {
        debug!(engine = ?self.raw, "deleting native engine");
        unsafe { ffi::shore_delete_engine(self.raw.as_ptr()) }
    }
}

impl RawContent for ffi::Content {
    fn object_count(&self) -> usize {
        unsafe { ffi::shore_content_object_count(self) as usize }
    }

    fn object(&self, index: usize) -> &dyn RawObject {
        unsafe { borrow(ffi::shore_content_object(self, index as c_ulong)) }
    }

    fn info_count(&self) -> usize {
        unsafe { ffi::shore_content_info_count(self) as usize }
    }

    fn info_key(&self, index: usize) -> &str {
        unsafe { text(ffi::shore_content_info_key(self, index as c_ulong)) }
    }

    fn info(&self, index: usize) -> Info {
        Info::Text(unsafe { text(ffi::shore_content_info(self, index as c_ulong)) })
    }

    fn info_of(&self, key: &str) -> Option<Info> {
        let key = CString::new(key).ok()?;
        let value = unsafe { ffi::shore_content_info_of(self, key.as_ptr()) };
        if value.is_null() {
            None
        } else {
            Some(Info::Text(unsafe { text(value) }))
        }
    }
}

impl RawObject for ffi::Object {
    fn kind(&self) -> &str {
        unsafe { text(ffi::shore_object_type(self)) }
    }

    fn region(&self) -> Option<&dyn RawRegion> {
        unsafe { ffi::shore_object_region(self).as_ref() }.map(|region| region as &dyn RawRegion)
    }

    fn marker_count(&self) -> usize {
        unsafe { ffi::shore_object_marker_count(self) as usize }
    }

    fn marker_key(&self, index: usize) -> &str {
        unsafe { text(ffi::shore_object_marker_key(self, index as c_ulong)) }
    }

    fn marker(&self, index: usize) -> &dyn RawMarker {
        unsafe { borrow(ffi::shore_object_marker(self, index as c_ulong)) }
    }

    fn marker_of(&self, key: &str) -> Option<&dyn RawMarker> {
        let key = CString::new(key).ok()?;
        unsafe { ffi::shore_object_marker_of(self, key.as_ptr()).as_ref() }.map(|marker| marker as &dyn RawMarker)
    }

    fn attribute_count(&self) -> usize {
        unsafe { ffi::shore_object_attribute_count(self) as usize }
    }

    fn attribute_key(&self, index: usize) -> &str {
        unsafe { text(ffi::shore_object_attribute_key(self, index as c_ulong)) }
    }

    fn attribute(&self, index: usize) -> &str {
        unsafe { text(ffi::shore_object_attribute(self, index as c_ulong)) }
    }

    fn attribute_of(&self, key: &str) -> Option<&str> {
        let key = CString::new(key).ok()?;
        let value = unsafe { ffi::shore_object_attribute_of(self, key.as_ptr()) };
        if value.is_null() {
            None
        } else {
            Some(unsafe { text(value) })
        }
    }

    fn rating_count(&self) -> usize {
        unsafe { ffi::shore_object_rating_count(self) as usize }
    }

    fn rating_key(&self, index: usize) -> &str {
        unsafe { text(ffi::shore_object_rating_key(self, index as c_ulong)) }
    }

    fn rating(&self, index: usize) -> f32 {
        unsafe { ffi::shore_object_rating(self, index as c_ulong) }
    }

    fn rating_of(&self, key: &str) -> Option<f32> {
        let key = CString::new(key).ok()?;
        let mut rating: c_float = 0.0;
        let found = unsafe { ffi::shore_object_rating_of(self, key.as_ptr(), &mut rating) };
        if found != 0 {
            Some(rating)
        } else {
            None
        }
    }

    fn part_count(&self) -> usize {
        unsafe { ffi::shore_object_part_count(self) as usize }
    }

    fn part_key(&self, index: usize) -> &str {
        unsafe { text(ffi::shore_object_part_key(self, index as c_ulong)) }
    }

    fn part(&self, index: usize) -> &dyn RawObject {
        unsafe { borrow(ffi::shore_object_part(self, index as c_ulong)) }
    }

    fn part_of(&self, key: &str) -> Option<&dyn RawObject> {
        let key = CString::new(key).ok()?;
        unsafe { ffi::shore_object_part_of(self, key.as_ptr()).as_ref() }.map(|part| part as &dyn RawObject)
    }
}

impl RawRegion for ffi::Region {
    fn left(&self) -> f32 {
        unsafe { ffi::shore_region_left(self) }
    }

    fn top(&self) -> f32 {
        unsafe { ffi::shore_region_top(self) }
    }

    fn right(&self) -> f32 {
        unsafe { ffi::shore_region_right(self) }
    }

    fn bottom(&self) -> f32 {
        unsafe { ffi::shore_region_bottom(self) }
    }
}

impl RawMarker for ffi::Marker {
    fn x(&self) -> f32 {
        unsafe { ffi::shore_marker_x(self) }
    }

    fn y(&self) -> f32 {
        unsafe { ffi::shore_marker_y(self) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_strings() {
        assert_eq!(engine_str(Some(c"FrameRate")), "FrameRate");
        assert_eq!(engine_str(None), "");

        let broken = CStr::from_bytes_with_nul(b"Face\xff\0").unwrap();
        assert_eq!(engine_str(Some(broken)), "");
        assert_eq!(unsafe { lossy(broken.as_ptr()) }, "Face\u{fffd}");
        assert_eq!(unsafe { lossy(std::ptr::null()) }, "");
    }
}
