use std::fmt;

use serde::{Deserialize, Serialize};

use crate::raw::{Info, RawContent, RawMarker, RawObject, RawRegion};
use crate::record::{ContentRecord, EMPTY_CONTENT};
use crate::view::{Accessors, LazyView};
use crate::{Result, Vector2};

/// How deeply nested parts may be before [`Content::to_record`] gives up.
pub const MAX_PART_DEPTH: usize = 64;

pub type Infos<'a> = LazyView<'a, InfoAccess<'a>, Info<'a>>;
pub type Markers<'a> = LazyView<'a, MarkerAccess<'a>, Marker>;
pub type Attributes<'a> = LazyView<'a, AttributeAccess<'a>, &'a str>;
pub type Ratings<'a> = LazyView<'a, RatingAccess<'a>, f32>;
pub type Parts<'a> = LazyView<'a, PartAccess<'a>, DetectedObject<'a>>;

/// Everything the engine found in one frame.
#[derive(Clone, Copy)]
pub struct Content<'a> {
    raw: &'a dyn RawContent,
    num_objects: usize,
    num_infos: usize,
}

impl<'a> Content<'a> {
    pub fn new(raw: &'a dyn RawContent) -> Self {
        Self {
            raw,
            num_objects: raw.object_count(),
            num_infos: raw.info_count(),
        }
    }

    /// Content for a frame the engine returned nothing for.
    pub fn empty() -> Content<'static> {
        Content::new(&EMPTY_CONTENT)
    }

    pub fn num_objects(&self) -> usize {
        self.num_objects
    }

    pub fn num_infos(&self) -> usize {
        self.num_infos
    }

    /// Objects in engine order, wrapped afresh on every call.
    pub fn objects(&self) -> impl ExactSizeIterator<Item = DetectedObject<'a>> {
        let raw = self.raw;
        (0..self.num_objects).map(move |idx| DetectedObject::new(raw.object(idx)))
    }

    pub fn infos(&self) -> Infos<'a> {
        LazyView::new(self.num_infos, InfoAccess(self.raw))
    }

    /// Copies the whole result tree out of the engine.
    pub fn to_record(&self) -> Result<ContentRecord> {
        ContentRecord::capture(self)
    }
}

impl<'a> fmt::Display for Content<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Content with {} object(s) and {} info(s)",
            self.num_objects, self.num_infos
        )
    }
}

impl<'a> fmt::Debug for Content<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Content")
            .field("num_objects", &self.num_objects)
            .field("infos", &self.infos())
            .finish()
    }
}

/// One detected entity, usually a face, possibly with nested parts.
#[derive(Clone, Copy)]
pub struct DetectedObject<'a> {
    raw: &'a dyn RawObject,
    num_markers: usize,
    num_attributes: usize,
    num_ratings: usize,
    num_parts: usize,
}

impl<'a> DetectedObject<'a> {
    pub fn new(raw: &'a dyn RawObject) -> Self {
        Self {
            raw,
            num_markers: raw.marker_count(),
            num_attributes: raw.attribute_count(),
            num_ratings: raw.rating_count(),
            num_parts: raw.part_count(),
        }
    }

    /// The engine's type tag, e.g. `Face` or `LeftEye`.
    pub fn kind(&self) -> &'a str {
        self.raw.kind()
    }

    pub fn region(&self) -> Option<Region> {
        self.raw.region().map(Region::from_raw)
    }

    pub fn num_markers(&self) -> usize {
        self.num_markers
    }

    pub fn num_attributes(&self) -> usize {
        self.num_attributes
    }

    pub fn num_ratings(&self) -> usize {
        self.num_ratings
    }

    pub fn num_parts(&self) -> usize {
        self.num_parts
    }

    pub fn markers(&self) -> Markers<'a> {
        LazyView::with(self.num_markers, MarkerAccess(self.raw), Marker::from_raw)
    }

    pub fn attributes(&self) -> Attributes<'a> {
        LazyView::new(self.num_attributes, AttributeAccess(self.raw))
    }

    pub fn ratings(&self) -> Ratings<'a> {
        LazyView::new(self.num_ratings, RatingAccess(self.raw))
    }

    pub fn parts(&self) -> Parts<'a> {
        LazyView::with(self.num_parts, PartAccess(self.raw), DetectedObject::new)
    }
}

impl<'a> fmt::Display for DetectedObject<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DetectedObject of type \"{}\"", self.kind())
    }
}

fn write_section<'a, A, V, D>(f: &mut fmt::Formatter, title: &str, view: LazyView<'a, A, V>, show: D) -> fmt::Result
where
    A: Accessors<'a>,
    D: Fn(&V, &mut fmt::Formatter) -> fmt::Result,
{
    if view.is_empty() {
        return write!(f, "\n- {}: None", title);
    }

    write!(f, "\n- {}:", title)?;
    for (key, value) in view {
        write!(f, "\n  * {}: ", key)?;
        show(&value, f)?;
    }
    Ok(())
}

/// Long form: region and every keyed collection, `None` where empty.
/// Parts are listed in their short form.
impl<'a> fmt::Debug for DetectedObject<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)?;
        match self.region() {
            Some(region) => write!(f, "\n- Region: {}", region)?,
            None => write!(f, "\n- Region: None")?,
        }
        write_section(f, "Markers", self.markers(), |marker, f| write!(f, "{}", marker))?;
        write_section(f, "Attributes", self.attributes(), |attribute, f| f.write_str(attribute))?;
        write_section(f, "Ratings", self.ratings(), |rating, f| write!(f, "{}", rating))?;
        write_section(f, "Parts", self.parts(), |part, f| write!(f, "{}", part))
    }
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

impl Region {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_raw(raw: &dyn RawRegion) -> Self {
        Self::new(raw.left(), raw.top(), raw.right(), raw.bottom())
    }

    pub fn left(&self) -> f32 {
        self.left
    }

    pub fn top(&self) -> f32 {
        self.top
    }

    pub fn right(&self) -> f32 {
        self.right
    }

    pub fn bottom(&self) -> f32 {
        self.bottom
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn tl_corner(&self) -> Vector2 {
        Vector2::new(self.left, self.top)
    }

    pub fn br_corner(&self) -> Vector2 {
        Vector2::new(self.right, self.bottom)
    }

    pub fn center(&self) -> Vector2 {
        (self.tl_corner() + self.br_corner()) / 2.0
    }

    /// `[left, top, right, bottom]`, the order rectangle drawing code expects.
    pub fn to_array(&self) -> [f32; 4] {
        [self.left, self.top, self.right, self.bottom]
    }
}

impl RawRegion for Region {
    fn left(&self) -> f32 {
        self.left
    }

    fn top(&self) -> f32 {
        self.top
    }

    fn right(&self) -> f32 {
        self.right
    }

    fn bottom(&self) -> f32 {
        self.bottom
    }
}

impl From<Region> for (f32, f32, f32, f32) {
    fn from(region: Region) -> Self {
        (region.left, region.top, region.right, region.bottom)
    }
}

impl From<Region> for [f32; 4] {
    fn from(region: Region) -> Self {
        region.to_array()
    }
}

impl IntoIterator for Region {
    type Item = f32;
    type IntoIter = std::array::IntoIter<f32, 4>;

    fn into_iter(self) -> Self::IntoIter {
        self.to_array().into_iter()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(({}, {}), ({}, {}))", self.left, self.top, self.right, self.bottom)
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Region {}", self)
    }
}

/// A landmark point in pixel coordinates.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    x: f32,
    y: f32,
}

impl Marker {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn from_raw(raw: &dyn RawMarker) -> Self {
        Self::new(raw.x(), raw.y())
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn position(&self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }

    pub fn to_array(&self) -> [f32; 2] {
        [self.x, self.y]
    }
}

impl RawMarker for Marker {
    fn x(&self) -> f32 {
        self.x
    }

    fn y(&self) -> f32 {
        self.y
    }
}

impl From<Marker> for (f32, f32) {
    fn from(marker: Marker) -> Self {
        (marker.x, marker.y)
    }
}

impl From<Marker> for Vector2 {
    fn from(marker: Marker) -> Self {
        marker.position()
    }
}

impl IntoIterator for Marker {
    type Item = f32;
    type IntoIter = std::array::IntoIter<f32, 2>;

    fn into_iter(self) -> Self::IntoIter {
        self.to_array().into_iter()
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl fmt::Debug for Marker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Marker {}", self)
    }
}

#[derive(Clone, Copy)]
pub struct InfoAccess<'a>(&'a dyn RawContent);

impl<'a> Accessors<'a> for InfoAccess<'a> {
    type Raw = Info<'a>;

    fn key(&self, index: usize) -> &'a str {
        self.0.info_key(index)
    }

    fn value(&self, index: usize) -> Info<'a> {
        self.0.info(index)
    }

    fn value_of(&self, key: &str) -> Option<Info<'a>> {
        self.0.info_of(key)
    }
}

#[derive(Clone, Copy)]
pub struct MarkerAccess<'a>(&'a dyn RawObject);

impl<'a> Accessors<'a> for MarkerAccess<'a> {
    type Raw = &'a dyn RawMarker;

    fn key(&self, index: usize) -> &'a str {
        self.0.marker_key(index)
    }

    fn value(&self, index: usize) -> &'a dyn RawMarker {
        self.0.marker(index)
    }

    fn value_of(&self, key: &str) -> Option<&'a dyn RawMarker> {
        self.0.marker_of(key)
    }
}

#[derive(Clone, Copy)]
pub struct AttributeAccess<'a>(&'a dyn RawObject);

impl<'a> Accessors<'a> for AttributeAccess<'a> {
    type Raw = &'a str;

    fn key(&self, index: usize) -> &'a str {
        self.0.attribute_key(index)
    }

    fn value(&self, index: usize) -> &'a str {
        self.0.attribute(index)
    }

    fn value_of(&self, key: &str) -> Option<&'a str> {
        self.0.attribute_of(key)
    }
}

#[derive(Clone, Copy)]
pub struct RatingAccess<'a>(&'a dyn RawObject);

impl<'a> Accessors<'a> for RatingAccess<'a> {
    type Raw = f32;

    fn key(&self, index: usize) -> &'a str {
        self.0.rating_key(index)
    }

    fn value(&self, index: usize) -> f32 {
        self.0.rating(index)
    }

    fn value_of(&self, key: &str) -> Option<f32> {
        self.0.rating_of(key)
    }
}

#[derive(Clone, Copy)]
pub struct PartAccess<'a>(&'a dyn RawObject);

impl<'a> Accessors<'a> for PartAccess<'a> {
    type Raw = &'a dyn RawObject;

    fn key(&self, index: usize) -> &'a str {
        self.0.part_key(index)
    }

    fn value(&self, index: usize) -> &'a dyn RawObject {
        self.0.part(index)
    }

    fn value_of(&self, key: &str) -> Option<&'a dyn RawObject> {
        self.0.part_of(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{InfoRecord, ObjectRecord};
    use crate::Error;

    fn face() -> ObjectRecord {
        ObjectRecord::new("Face")
            .with_region(Region::new(10.0, 20.0, 50.0, 80.0))
            .with_marker("LeftEye", Marker::new(20.0, 40.0))
            .with_marker("RightEye", Marker::new(40.0, 40.0))
            .with_attribute("Gender", "Female")
            .with_rating("Age", 31.0)
            .with_rating("Happy", 72.5)
            .with_part("LeftEye", ObjectRecord::new("LeftEye").with_region(Region::new(15.0, 35.0, 25.0, 45.0)))
    }

    #[test]
    fn content_counts_and_infos() {
        let record = ContentRecord::new()
            .with_object(face())
            .with_object(ObjectRecord::new("Face"))
            .with_info("FrameRate", InfoRecord::Number(30.0));
        let content = Content::new(&record);

        assert_eq!(content.num_objects(), 2);
        assert_eq!(content.num_infos(), 1);
        assert_eq!(content.objects().len(), 2);
        assert_eq!(
            content.infos().iter().collect::<Vec<_>>(),
            [("FrameRate", Info::Number(30.0))]
        );
        assert_eq!(content.to_string(), "Content with 2 object(s) and 1 info(s)");
    }

    #[test]
    fn empty_content() {
        let content = Content::empty();
        assert_eq!(content.num_objects(), 0);
        assert_eq!(content.objects().count(), 0);
        assert!(content.infos().is_empty());
    }

    #[test]
    fn region_decomposes_in_order() {
        let record = face();
        let object = DetectedObject::new(&record);
        let region = object.region().unwrap();

        assert_eq!(region.into_iter().collect::<Vec<_>>(), [10.0, 20.0, 50.0, 80.0]);
        assert_eq!(<(f32, f32, f32, f32)>::from(region), (10.0, 20.0, 50.0, 80.0));
        assert_eq!(region.width(), 40.0);
        assert_eq!(region.height(), 60.0);
        assert_eq!(region.center(), Vector2::new(30.0, 50.0));
    }

    #[test]
    fn object_collections() {
        let record = face();
        let object = DetectedObject::new(&record);

        assert_eq!(object.kind(), "Face");
        assert_eq!(object.markers().get("RightEye").unwrap(), Marker::new(40.0, 40.0));
        assert_eq!(object.attributes().get("Gender").unwrap(), "Female");
        assert_eq!(object.ratings().values().collect::<Vec<_>>(), [31.0, 72.5]);

        let parts: Vec<_> = object.parts().iter().collect();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].0, "LeftEye");
        assert_eq!(parts[0].1.kind(), "LeftEye");
        assert_eq!(parts[0].1.parts().len(), 0);

        match object.ratings().get("Sad") {
            Err(Error::KeyNotFound(key)) => assert_eq!(key, "Sad"),
            other => panic!("expected KeyNotFound, got {:?}", other),
        }
    }

    #[test]
    fn views_use_the_counts_read_at_construction() {
        let record = face();
        let object = DetectedObject::new(&record);

        assert_eq!(object.markers().len(), object.num_markers());
        assert_eq!(object.attributes().len(), object.num_attributes());
        assert_eq!(object.ratings().len(), object.num_ratings());
        assert_eq!(object.parts().len(), object.num_parts());
        assert_eq!((object.num_markers(), object.num_ratings(), object.num_parts()), (2, 2, 1));
    }

    #[test]
    fn object_without_parts_has_empty_mapping() {
        let record = ObjectRecord::new("Face");
        let object = DetectedObject::new(&record);

        let parts = object.parts();
        assert_eq!(parts.len(), 0);
        assert_eq!(parts.iter().count(), 0);
        assert!(object.region().is_none());
    }

    #[test]
    fn long_form_rendering() {
        let record = ObjectRecord::new("Face")
            .with_region(Region::new(1.0, 2.0, 3.0, 4.0))
            .with_rating("Age", 30.0);
        let object = DetectedObject::new(&record);

        assert_eq!(object.to_string(), "DetectedObject of type \"Face\"");
        assert_eq!(
            format!("{:?}", object),
            "DetectedObject of type \"Face\"\n\
             - Region: ((1, 2), (3, 4))\n\
             - Markers: None\n\
             - Attributes: None\n\
             - Ratings:\n  \
             * Age: 30\n\
             - Parts: None"
        );
    }

    #[test]
    fn marker_rendering() {
        let marker = Marker::new(1.5, 2.0);
        assert_eq!(marker.to_string(), "(1.5, 2)");
        assert_eq!(format!("{:?}", marker), "Marker (1.5, 2)");
        assert_eq!(<(f32, f32)>::from(marker), (1.5, 2.0));
    }
}
