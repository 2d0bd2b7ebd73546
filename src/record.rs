//! Owned copies of engine results.
//!
//! Records are what a [`Content`] looks like once it has been copied out of
//! the engine: plain data that can be stored with `bincode`, compared in
//! tests, and fed back through [`RecordedEngine`], which implements the raw
//! traits so a replayed frame is wrapped exactly like a live one.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::content::{Content, DetectedObject, Marker, Region, MAX_PART_DEPTH};
use crate::raw::{Info, RawContent, RawEngine, RawMarker, RawObject, RawRegion};
use crate::{ColorSpace, Error, Frame, Result};

pub(crate) static EMPTY_CONTENT: ContentRecord = ContentRecord {
    objects: Vec::new(),
    infos: Vec::new(),
};

fn lookup<'r, T>(entries: &'r [(String, T)], key: &str) -> Option<&'r T> {
    entries.iter().find(|(k, _)| k == key).map(|(_, value)| value)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InfoRecord {
    Number(f32),
    Text(String),
}

impl InfoRecord {
    pub fn as_info(&self) -> Info {
        match self {
            InfoRecord::Number(value) => Info::Number(*value),
            InfoRecord::Text(text) => Info::Text(text),
        }
    }
}

impl<'a> From<Info<'a>> for InfoRecord {
    fn from(info: Info<'a>) -> Self {
        match info {
            Info::Number(value) => InfoRecord::Number(value),
            Info::Text(text) => InfoRecord::Text(text.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub objects: Vec<ObjectRecord>,
    pub infos: Vec<(String, InfoRecord)>,
}

impl ContentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, object: ObjectRecord) -> Self {
        self.objects.push(object);
        self
    }

    pub fn with_info(mut self, key: &str, info: InfoRecord) -> Self {
        self.infos.push((key.to_owned(), info));
        self
    }

    pub fn capture(content: &Content) -> Result<Self> {
        let objects = content
            .objects()
            .map(|object| ObjectRecord::capture(&object))
            .collect::<Result<Vec<_>>>()?;

        let infos = content
            .infos()
            .iter()
            .map(|(key, info)| (key.to_owned(), InfoRecord::from(info)))
            .collect();

        Ok(Self { objects, infos })
    }
}

impl RawContent for ContentRecord {
    fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn object(&self, index: usize) -> &dyn RawObject {
        &self.objects[index]
    }

    fn info_count(&self) -> usize {
        self.infos.len()
    }

    fn info_key(&self, index: usize) -> &str {
        &self.infos[index].0
    }

    fn info(&self, index: usize) -> Info {
        self.infos[index].1.as_info()
    }

    fn info_of(&self, key: &str) -> Option<Info> {
        lookup(&self.infos, key).map(InfoRecord::as_info)
    }
}

/// Keyed collections keep engine order and may repeat keys; by-key lookups
/// return the first match.
///
/// On disk the part tree is stored as a flat node list, so reading a
/// recording never recurses and never builds a tree deeper than
/// [`MAX_PART_DEPTH`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "PartTree", try_from = "PartTree")]
pub struct ObjectRecord {
    pub kind: String,
    pub region: Option<Region>,
    pub markers: Vec<(String, Marker)>,
    pub attributes: Vec<(String, String)>,
    pub ratings: Vec<(String, f32)>,
    pub parts: Vec<(String, ObjectRecord)>,
}

impl ObjectRecord {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            region: None,
            markers: Vec::new(),
            attributes: Vec::new(),
            ratings: Vec::new(),
            parts: Vec::new(),
        }
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_marker(mut self, key: &str, marker: Marker) -> Self {
        self.markers.push((key.to_owned(), marker));
        self
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.push((key.to_owned(), value.to_owned()));
        self
    }

    pub fn with_rating(mut self, key: &str, value: f32) -> Self {
        self.ratings.push((key.to_owned(), value));
        self
    }

    pub fn with_part(mut self, key: &str, part: ObjectRecord) -> Self {
        self.parts.push((key.to_owned(), part));
        self
    }

    pub fn capture(object: &DetectedObject) -> Result<Self> {
        Self::capture_at(object, 0)
    }

    fn capture_at(object: &DetectedObject, depth: usize) -> Result<Self> {
        if depth > MAX_PART_DEPTH {
            return Err(Error::PartDepth(MAX_PART_DEPTH));
        }

        let parts = object
            .parts()
            .iter()
            .map(|(key, part)| Ok((key.to_owned(), Self::capture_at(&part, depth + 1)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            kind: object.kind().to_owned(),
            region: object.region(),
            markers: object.markers().iter().map(|(key, marker)| (key.to_owned(), marker)).collect(),
            attributes: object
                .attributes()
                .iter()
                .map(|(key, value)| (key.to_owned(), value.to_owned()))
                .collect(),
            ratings: object.ratings().iter().map(|(key, value)| (key.to_owned(), value)).collect(),
            parts,
        })
    }
}

/// One object of a part tree, pointing at its parent by position.
#[derive(Serialize, Deserialize)]
struct PartNode {
    parent: Option<u32>,
    key: String,
    kind: String,
    region: Option<Region>,
    markers: Vec<(String, Marker)>,
    attributes: Vec<(String, String)>,
    ratings: Vec<(String, f32)>,
}

/// A part tree in pre-order. The root comes first with no parent; every
/// other node names a parent that precedes it.
#[derive(Serialize, Deserialize)]
struct PartTree {
    nodes: Vec<PartNode>,
}

impl From<ObjectRecord> for PartTree {
    fn from(root: ObjectRecord) -> Self {
        let mut nodes = Vec::new();
        let mut pending = vec![(None, String::new(), root)];

        while let Some((parent, key, object)) = pending.pop() {
            let index = nodes.len() as u32;
            let ObjectRecord {
                kind,
                region,
                markers,
                attributes,
                ratings,
                parts,
            } = object;

            nodes.push(PartNode {
                parent,
                key,
                kind,
                region,
                markers,
                attributes,
                ratings,
            });
            pending.extend(parts.into_iter().rev().map(|(key, part)| (Some(index), key, part)));
        }

        PartTree { nodes }
    }
}

impl TryFrom<PartTree> for ObjectRecord {
    type Error = Error;

    fn try_from(tree: PartTree) -> Result<Self> {
        let mut parents = Vec::with_capacity(tree.nodes.len());
        let mut depths: Vec<usize> = Vec::with_capacity(tree.nodes.len());
        let mut objects = Vec::with_capacity(tree.nodes.len());

        for (index, node) in tree.nodes.into_iter().enumerate() {
            let (parent, depth) = match node.parent.map(|parent| parent as usize) {
                None if index == 0 => (0, 0),
                Some(parent) if parent < index => (parent, depths[parent] + 1),
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "part tree node {} has a bad parent",
                        index
                    )))
                }
            };
            if depth > MAX_PART_DEPTH {
                return Err(Error::PartDepth(MAX_PART_DEPTH));
            }

            parents.push(parent);
            depths.push(depth);
            objects.push(Some((
                node.key,
                ObjectRecord {
                    kind: node.kind,
                    region: node.region,
                    markers: node.markers,
                    attributes: node.attributes,
                    ratings: node.ratings,
                    parts: Vec::new(),
                },
            )));
        }

        // Children always follow their parent, so walking backwards finishes
        // every node before it is moved into its parent.
        for index in (1..objects.len()).rev() {
            if let Some((key, mut object)) = objects[index].take() {
                object.parts.reverse();
                if let Some((_, parent)) = objects[parents[index]].as_mut() {
                    parent.parts.push((key, object));
                }
            }
        }

        match objects.first_mut().and_then(Option::take) {
            Some((_, mut root)) => {
                root.parts.reverse();
                Ok(root)
            }
            None => Err(Error::InvalidArgument("empty part tree".to_owned())),
        }
    }
}

impl RawObject for ObjectRecord {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn region(&self) -> Option<&dyn RawRegion> {
        self.region.as_ref().map(|region| region as &dyn RawRegion)
    }

    fn marker_count(&self) -> usize {
        self.markers.len()
    }

    fn marker_key(&self, index: usize) -> &str {
        &self.markers[index].0
    }

    fn marker(&self, index: usize) -> &dyn RawMarker {
        &self.markers[index].1
    }

    fn marker_of(&self, key: &str) -> Option<&dyn RawMarker> {
        lookup(&self.markers, key).map(|marker| marker as &dyn RawMarker)
    }

    fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    fn attribute_key(&self, index: usize) -> &str {
        &self.attributes[index].0
    }

    fn attribute(&self, index: usize) -> &str {
        &self.attributes[index].1
    }

    fn attribute_of(&self, key: &str) -> Option<&str> {
        lookup(&self.attributes, key).map(String::as_str)
    }

    fn rating_count(&self) -> usize {
        self.ratings.len()
    }

    fn rating_key(&self, index: usize) -> &str {
        &self.ratings[index].0
    }

    fn rating(&self, index: usize) -> f32 {
        self.ratings[index].1
    }

    fn rating_of(&self, key: &str) -> Option<f32> {
        lookup(&self.ratings, key).copied()
    }

    fn part_count(&self) -> usize {
        self.parts.len()
    }

    fn part_key(&self, index: usize) -> &str {
        &self.parts[index].0
    }

    fn part(&self, index: usize) -> &dyn RawObject {
        &self.parts[index].1
    }

    fn part_of(&self, key: &str) -> Option<&dyn RawObject> {
        lookup(&self.parts, key).map(|part| part as &dyn RawObject)
    }
}

/// A sequence of processed frames. `None` marks a frame the engine
/// returned no content for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub frames: Vec<Option<ContentRecord>>,
}

impl Recording {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push(&mut self, frame: Option<ContentRecord>) {
        self.frames.push(frame);
    }

    /// Copy `content` out of the engine and append it.
    pub fn capture(&mut self, content: &Content) -> Result<()> {
        let record = content.to_record()?;
        self.frames.push(Some(record));
        Ok(())
    }

    /// Serialize the recording to a file.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, self)?;
        Ok(())
    }

    /// Deserialize a recording from a file.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let recording = bincode::deserialize_from(&mut reader)?;
        Ok(recording)
    }
}

/// Replays a [`Recording`] one frame per `process` call, then reports no
/// content once it runs out.
pub struct RecordedEngine {
    frames: std::vec::IntoIter<Option<ContentRecord>>,
    current: Option<ContentRecord>,
    processed: usize,
}

impl RecordedEngine {
    pub fn new(recording: Recording) -> Self {
        Self {
            frames: recording.frames.into_iter(),
            current: None,
            processed: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn processed(&self) -> usize {
        self.processed
    }
}

impl RawEngine for RecordedEngine {
    fn process(&mut self, frame: &Frame, color_space: ColorSpace) -> Result<Option<&dyn RawContent>> {
        self.current = self.frames.next().flatten();
        self.processed += 1;

        trace!(
            frame = self.processed,
            width = frame.width(),
            height = frame.height(),
            %color_space,
            replayed = self.current.is_some(),
            "replaying recorded frame"
        );

        Ok(self.current.as_ref().map(|content| content as &dyn RawContent))
    }

    fn release(&mut self) {
        debug!(processed = self.processed, remaining = self.frames.len(), "releasing recorded engine");
        self.frames = Vec::new().into_iter();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested(depth: usize) -> ObjectRecord {
        let mut object = ObjectRecord::new("Leaf");
        for _ in 0..depth {
            object = ObjectRecord::new("Node").with_part("child", object);
        }
        object
    }

    #[test]
    fn capture_copies_the_whole_tree() {
        let original = ContentRecord::new()
            .with_object(
                ObjectRecord::new("Face")
                    .with_region(Region::new(1.0, 2.0, 3.0, 4.0))
                    .with_marker("Nose", Marker::new(2.0, 3.0))
                    .with_attribute("Id", "7")
                    .with_rating("Score", 9.5)
                    .with_part("Mouth", ObjectRecord::new("Mouth")),
            )
            .with_info("FrameRate", InfoRecord::Text("29.97".to_owned()));

        let copy = Content::new(&original).to_record().unwrap();
        assert_eq!(copy, original);
    }

    #[test]
    fn capture_refuses_runaway_nesting() {
        let shallow = nested(MAX_PART_DEPTH);
        assert!(ObjectRecord::capture(&DetectedObject::new(&shallow)).is_ok());

        let deep = nested(MAX_PART_DEPTH + 1);
        match ObjectRecord::capture(&DetectedObject::new(&deep)) {
            Err(Error::PartDepth(limit)) => assert_eq!(limit, MAX_PART_DEPTH),
            other => panic!("expected PartDepth, got {:?}", other.map(|_| ())),
        }
    }

    fn chain(depth: usize) -> PartTree {
        let node = |parent: Option<u32>| PartNode {
            parent,
            key: "child".to_owned(),
            kind: "Node".to_owned(),
            region: None,
            markers: Vec::new(),
            attributes: Vec::new(),
            ratings: Vec::new(),
        };
        PartTree {
            nodes: (0..=depth).map(|index| node(index.checked_sub(1).map(|parent| parent as u32))).collect(),
        }
    }

    fn write_raw<T: Serialize>(path: &Path, value: &T) {
        let mut file = File::create(path).unwrap();
        bincode::serialize_into(&mut file, value).unwrap();
    }

    #[test]
    fn part_trees_keep_order_on_disk() {
        let object = ObjectRecord::new("Face")
            .with_region(Region::new(0.0, 0.0, 8.0, 8.0))
            .with_part("LeftEye", ObjectRecord::new("Eye").with_part("Pupil", ObjectRecord::new("Pupil")))
            .with_part("RightEye", ObjectRecord::new("Eye"))
            .with_part("Mouth", ObjectRecord::new("Mouth").with_rating("Open", 3.0));

        let bytes = bincode::serialize(&object).unwrap();
        let copy: ObjectRecord = bincode::deserialize(&bytes).unwrap();
        assert_eq!(copy, object);

        let deep = nested(MAX_PART_DEPTH);
        let bytes = bincode::serialize(&deep).unwrap();
        assert_eq!(bincode::deserialize::<ObjectRecord>(&bytes).unwrap(), deep);
    }

    #[test]
    fn reading_refuses_runaway_nesting() {
        let dir = tempfile::tempdir().unwrap();
        let frame = |tree: PartTree| vec![Some((vec![tree], Vec::<(String, InfoRecord)>::new()))];

        let shallow = dir.path().join("shallow.bin");
        write_raw(&shallow, &frame(chain(3)));
        let recording = Recording::read(&shallow).unwrap();
        let object = &recording.frames[0].as_ref().unwrap().objects[0];
        assert_eq!(object.parts[0].1.parts[0].1.parts[0].1.parts.len(), 0);

        let deep = dir.path().join("deep.bin");
        write_raw(&deep, &frame(chain(200_000)));
        match Recording::read(&deep) {
            Err(Error::Serialization(error)) => assert!(error.to_string().contains("deeper than")),
            other => panic!("expected a serialization error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn reading_refuses_orphan_parts() {
        let mut tree = chain(2);
        tree.nodes[1].parent = Some(2);

        let bytes = bincode::serialize(&tree).unwrap();
        assert!(bincode::deserialize::<ObjectRecord>(&bytes).is_err());
    }

    #[test]
    fn lookups_return_first_match() {
        let object = ObjectRecord::new("Face")
            .with_rating("Age", 20.0)
            .with_rating("Age", 40.0);

        assert_eq!(object.rating_of("Age"), Some(20.0));
        assert_eq!(object.rating(1), 40.0);
        assert_eq!(object.rating_of("Sad"), None);
    }

    #[test]
    fn recording_round_trips_through_a_file() {
        let mut recording = Recording::new();
        recording.push(Some(ContentRecord::new().with_object(ObjectRecord::new("Face"))));
        recording.push(None);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.bin");
        recording.write(&path).unwrap();

        assert_eq!(Recording::read(&path).unwrap(), recording);
    }

    #[test]
    fn recorded_engine_replays_then_runs_dry() {
        let mut recording = Recording::new();
        recording.push(Some(ContentRecord::new().with_object(ObjectRecord::new("Face"))));
        recording.push(None);

        let mut engine = RecordedEngine::new(recording);
        let pixels = [0u8; 4];
        let frame = Frame::gray(&pixels, 2, 2).unwrap();

        let first = engine.process(&frame, ColorSpace::Grayscale).unwrap();
        assert_eq!(first.map(|content| content.object_count()), Some(1));
        assert!(engine.process(&frame, ColorSpace::Grayscale).unwrap().is_none());
        assert!(engine.process(&frame, ColorSpace::Grayscale).unwrap().is_none());
        assert_eq!(engine.processed(), 3);
        assert_eq!(engine.remaining(), 0);
    }
}
