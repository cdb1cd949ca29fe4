//! Dataset model and format readers/writers.
//!
//! The model is the COCO detection schema itself: every pathway (conversion,
//! split, resize) consumes and produces [`Dataset`] values that serialize
//! straight to COCO JSON. Open Images rows are a separate input type,
//! [`SourceRow`], that only the conversion pathway reads.
//!
//! # Example
//!
//! ```
//! use oicoco::ir::{Annotation, BBoxXYXY, Category, Dataset, Image, Info};
//!
//! let dataset = Dataset {
//!     info: Info::Text("hand made".into()),
//!     images: vec![Image::new(1u64, "image.jpg", 640, 480)],
//!     categories: vec![Category::with_supercategory(1u64, "Person", "object")],
//!     annotations: vec![Annotation::from_box(
//!         1u64,
//!         1u64,
//!         1u64,
//!         BBoxXYXY::from_xyxy(10.0, 20.0, 100.0, 200.0),
//!     )],
//!     ..Default::default()
//! };
//! assert_eq!(dataset.annotations[0].bbox, [10.0, 20.0, 90.0, 180.0]);
//! ```

mod bbox;
mod ids;
pub mod io_class_ids;
pub mod io_coco_json;
pub mod io_open_images_csv;
mod model;

pub use bbox::{BBoxXYXY, Normalized, Pixel};
pub use ids::{AnnotationId, CategoryId, ImageId};
pub use io_open_images_csv::SourceRow;
pub use model::{Annotation, Category, Dataset, Image, Info, Segmentation};
