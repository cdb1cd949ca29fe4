//! COCO detection dataset model.
//!
//! These types serialize to the COCO detection schema directly (field names
//! and top-level key order match the files the tools read and write), so a
//! dataset loaded for splitting or resizing is written back without a lossy
//! trip through an intermediate form. Fields this crate does not interpret
//! are kept in `extra` and round-trip untouched.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use super::bbox::{BBoxXYXY, Pixel};
use super::ids::{AnnotationId, CategoryId, ImageId};

/// A complete COCO detection dataset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub info: Info,

    /// License records, carried through verbatim.
    #[serde(default)]
    pub licenses: Vec<Value>,

    pub images: Vec<Image>,

    pub annotations: Vec<Annotation>,

    pub categories: Vec<Category>,
}

/// The `info` block.
///
/// Datasets produced here store a plain string. COCO files from elsewhere
/// usually carry an object; that is kept as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Info {
    Text(String),
    Other(Value),
}

impl Default for Info {
    fn default() -> Self {
        Info::Text(String::new())
    }
}

impl Info {
    /// Returns a copy of this info with `suffix` appended.
    ///
    /// For an object, the suffix goes onto its `description` string.
    pub fn with_suffix(&self, suffix: &str) -> Info {
        match self {
            Info::Text(text) => Info::Text(format!("{}{}", text, suffix)),
            Info::Other(Value::Object(map)) => {
                let mut map: Map<String, Value> = map.clone();
                let description = match map.get("description") {
                    Some(Value::String(existing)) => format!("{}{}", existing, suffix),
                    _ => suffix.trim_start().to_string(),
                };
                map.insert("description".to_string(), Value::String(description));
                Info::Other(Value::Object(map))
            }
            Info::Other(_) => Info::Text(suffix.trim_start().to_string()),
        }
    }
}

/// An image record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,

    pub width: u32,

    pub height: u32,

    pub file_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flickr_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coco_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_captured: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Image {
    pub fn new(id: impl Into<ImageId>, file_name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            file_name: file_name.into(),
            license: None,
            flickr_url: None,
            coco_url: None,
            date_captured: None,
            extra: BTreeMap::new(),
        }
    }
}

/// COCO segmentation payload.
///
/// Produced annotations always use a single polygon. On input a flat
/// polygon list is also accepted, and anything else (RLE masks) is passed
/// through.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segmentation {
    Polygons(Vec<Vec<f64>>),
    Flat(Vec<f64>),
    Other(Value),
}

impl Default for Segmentation {
    fn default() -> Self {
        Segmentation::Polygons(Vec::new())
    }
}

impl Segmentation {
    /// The degenerate quadrilateral traced by a box's corners.
    pub fn from_box(bbox: &BBoxXYXY<Pixel>) -> Self {
        Segmentation::Polygons(vec![bbox.corner_polygon().to_vec()])
    }
}

/// An annotation record.
///
/// Geometry is held as `f64`. Once [`Annotation::snap_box`] has put it on
/// whole pixels, bbox, area and segmentation are written as JSON integers.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,

    pub image_id: ImageId,

    pub category_id: CategoryId,

    #[serde(default)]
    pub segmentation: Segmentation,

    #[serde(default)]
    pub area: f64,

    /// `[x, y, width, height]` in pixels.
    pub bbox: [f64; 4],

    #[serde(default)]
    pub iscrowd: u8,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,

    #[serde(skip)]
    pub whole_pixels: bool,
}

impl Annotation {
    /// Builds an annotation whose bbox, area and segmentation all derive
    /// from the same pixel box.
    pub fn from_box(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        bbox: BBoxXYXY<Pixel>,
    ) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            segmentation: Segmentation::from_box(&bbox),
            area: bbox.area(),
            bbox: bbox.to_xywh(),
            iscrowd: 0,
            extra: BTreeMap::new(),
            whole_pixels: false,
        }
    }

    /// The bbox as XYXY corners.
    pub fn pixel_box(&self) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_xywh(self.bbox)
    }

    /// Rewrites bbox, area and segmentation together.
    pub fn set_box(&mut self, bbox: BBoxXYXY<Pixel>) {
        self.segmentation = Segmentation::from_box(&bbox);
        self.area = bbox.area();
        self.bbox = bbox.to_xywh();
    }

    /// Like [`Annotation::set_box`] for a box already truncated to whole
    /// pixels; the geometry is then written as integers.
    pub fn snap_box(&mut self, bbox: BBoxXYXY<Pixel>) {
        self.set_box(bbox);
        self.whole_pixels = true;
    }
}

/// One geometry number on the way out.
struct Coord {
    value: f64,
    whole: bool,
}

impl Serialize for Coord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.value;
        if self.whole && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
            serializer.serialize_i64(v as i64)
        } else {
            serializer.serialize_f64(v)
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum SegmentationOut<'a> {
    Polygons(Vec<Vec<Coord>>),
    Flat(Vec<Coord>),
    Other(&'a Value),
}

#[derive(Serialize)]
struct AnnotationOut<'a> {
    id: AnnotationId,
    image_id: ImageId,
    category_id: CategoryId,
    segmentation: SegmentationOut<'a>,
    area: Coord,
    bbox: [Coord; 4],
    iscrowd: u8,
    #[serde(flatten)]
    extra: &'a BTreeMap<String, Value>,
}

impl Serialize for Annotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let whole = self.whole_pixels;
        let coord = move |value: f64| Coord { value, whole };
        let segmentation = match &self.segmentation {
            Segmentation::Polygons(polys) => SegmentationOut::Polygons(
                polys
                    .iter()
                    .map(|poly| poly.iter().copied().map(coord).collect::<Vec<_>>())
                    .collect(),
            ),
            Segmentation::Flat(flat) => {
                SegmentationOut::Flat(flat.iter().copied().map(coord).collect())
            }
            Segmentation::Other(value) => SegmentationOut::Other(value),
        };
        AnnotationOut {
            id: self.id,
            image_id: self.image_id,
            category_id: self.category_id,
            segmentation,
            area: coord(self.area),
            bbox: self.bbox.map(coord),
            iscrowd: self.iscrowd,
            extra: &self.extra,
        }
        .serialize(serializer)
    }
}

/// A category record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Category {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supercategory: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_supercategory(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        supercategory: impl Into<String>,
    ) -> Self {
        Self {
            supercategory: Some(supercategory.into()),
            ..Self::new(id, name)
        }
    }
}

// Lookup tables over a loaded dataset.
impl Dataset {
    /// `file_name -> image id`.
    pub fn image_ids_by_file_name(&self) -> HashMap<&str, ImageId> {
        self.images
            .iter()
            .map(|img| (img.file_name.as_str(), img.id))
            .collect()
    }

    /// `image id -> image`.
    pub fn images_by_id(&self) -> HashMap<ImageId, &Image> {
        self.images.iter().map(|img| (img.id, img)).collect()
    }

    /// `image id -> annotations`, each group in stored order.
    pub fn annotations_by_image(&self) -> BTreeMap<ImageId, Vec<&Annotation>> {
        let mut grouped: BTreeMap<ImageId, Vec<&Annotation>> = BTreeMap::new();
        for ann in &self.annotations {
            grouped.entry(ann.image_id).or_default().push(ann);
        }
        grouped
    }
}
