#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use oicoco::ir::{Annotation, BBoxXYXY, Category, CategoryId, Dataset, Image, ImageId, Pixel, SourceRow};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// An annotation described without ids.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnSem {
    pub image_file: String,
    pub category: String,
    pub bbox: [f64; 4],
}

pub fn ann_semantics(dataset: &Dataset) -> Result<Vec<AnnSem>, String> {
    let image_by_id: BTreeMap<ImageId, String> = dataset
        .images
        .iter()
        .map(|img| (img.id, img.file_name.clone()))
        .collect();
    let category_by_id: BTreeMap<CategoryId, String> = dataset
        .categories
        .iter()
        .map(|cat| (cat.id, cat.name.clone()))
        .collect();

    let mut out = Vec::with_capacity(dataset.annotations.len());
    for ann in &dataset.annotations {
        let image_file = image_by_id.get(&ann.image_id).ok_or_else(|| {
            format!(
                "annotation {} references missing image_id {}",
                ann.id.as_u64(),
                ann.image_id.as_u64()
            )
        })?;
        let category = category_by_id.get(&ann.category_id).ok_or_else(|| {
            format!(
                "annotation {} references missing category_id {}",
                ann.id.as_u64(),
                ann.category_id.as_u64()
            )
        })?;

        out.push(AnnSem {
            image_file: image_file.clone(),
            category: category.clone(),
            bbox: ann.bbox,
        });
    }

    out.sort_by(ann_sem_cmp);
    Ok(out)
}

pub fn file_names(dataset: &Dataset) -> BTreeSet<String> {
    dataset.images.iter().map(|img| img.file_name.clone()).collect()
}

pub fn assert_valid_references(dataset: &Dataset) -> Result<(), String> {
    let image_ids: BTreeSet<ImageId> = dataset.images.iter().map(|img| img.id).collect();
    let category_ids: BTreeSet<CategoryId> = dataset.categories.iter().map(|cat| cat.id).collect();

    for ann in &dataset.annotations {
        if !image_ids.contains(&ann.image_id) {
            return Err(format!(
                "annotation {} references missing image_id {}",
                ann.id.as_u64(),
                ann.image_id.as_u64()
            ));
        }
        if !category_ids.contains(&ann.category_id) {
            return Err(format!(
                "annotation {} references missing category_id {}",
                ann.id.as_u64(),
                ann.category_id.as_u64()
            ));
        }
    }

    Ok(())
}

/// Image and annotation ids read `base, base + 1, ...` in stored order.
pub fn assert_dense_ids(dataset: &Dataset, base: u64) -> Result<(), String> {
    for (img, expected) in dataset.images.iter().zip(base..) {
        if img.id.as_u64() != expected {
            return Err(format!("image id {} where {} was expected", img.id, expected));
        }
    }
    for (ann, expected) in dataset.annotations.iter().zip(base..) {
        if ann.id.as_u64() != expected {
            return Err(format!("annotation id {} where {} was expected", ann.id, expected));
        }
    }
    Ok(())
}

/// A dataset with unique file names, ids that are unique but sparse and
/// unordered, and annotations that all point at existing records.
pub fn arb_dataset(max_images: usize, max_cats: usize, max_anns: usize) -> BoxedStrategy<Dataset> {
    assert!(max_images > 0, "max_images must be > 0");
    assert!(max_cats > 0, "max_cats must be > 0");

    (1usize..=max_images, 1usize..=max_cats, 0usize..=max_anns)
        .prop_flat_map(|(image_count, category_count, ann_count)| {
            (
                proptest::collection::hash_map(
                    image_file_name_strategy(),
                    (2u32..=4096, 2u32..=4096),
                    image_count..=image_count,
                ),
                proptest::collection::hash_set(
                    category_name_strategy(),
                    category_count..=category_count,
                ),
                proptest::collection::vec(ann_seed_strategy(), ann_count..=ann_count),
                any::<u64>(),
            )
                .prop_map(|(images, categories, ann_seeds, id_salt)| {
                    build_dataset(images, categories, ann_seeds, id_salt)
                })
        })
        .boxed()
}

/// Open Images rows over a handful of images, plus the images' sizes and a
/// MID to name table covering every row.
#[derive(Clone, Debug)]
pub struct RowFixture {
    pub rows: Vec<SourceRow>,
    pub sizes: HashMap<String, (u32, u32)>,
    pub mid_to_name: HashMap<String, String>,
}

pub const FIXTURE_CLASSES: [&str; 4] = ["Cat", "Dog", "Car", "Tree"];

pub fn arb_rows(max_images: usize, max_rows: usize) -> BoxedStrategy<RowFixture> {
    assert!(max_images > 0, "max_images must be > 0");

    (1usize..=max_images, 0usize..=max_rows)
        .prop_flat_map(|(image_count, row_count)| {
            (
                proptest::collection::vec((0u32..=2000, 0u32..=2000), image_count..=image_count),
                proptest::collection::vec(
                    (
                        any::<u16>(),
                        0usize..FIXTURE_CLASSES.len(),
                        normalized_pair(),
                        normalized_pair(),
                    ),
                    row_count..=row_count,
                ),
            )
        })
        .prop_map(|(sizes, row_seeds)| {
            let names: Vec<String> = (0..sizes.len()).map(|i| format!("{:08x}", i * 7919)).collect();
            let rows = row_seeds
                .into_iter()
                .map(|(image_seed, class, (x0, x1), (y0, y1))| {
                    let image = &names[image_seed as usize % names.len()];
                    SourceRow::new(
                        image.clone(),
                        format!("/m/{}", class),
                        BBoxXYXY::from_xyxy(x0, y0, x1, y1),
                    )
                })
                .collect();
            let sizes = names
                .iter()
                .zip(sizes)
                .map(|(name, size)| (format!("{}.jpg", name), size))
                .collect();
            let mid_to_name = FIXTURE_CLASSES
                .iter()
                .enumerate()
                .map(|(i, name)| (format!("/m/{}", i), name.to_string()))
                .collect();
            RowFixture {
                rows,
                sizes,
                mid_to_name,
            }
        })
        .boxed()
}

/// Ordered pair in [0, 1] on a 1/1000 grid.
fn normalized_pair() -> impl Strategy<Value = (f64, f64)> {
    (0u16..=1000, 0u16..=1000).prop_map(|(a, b)| {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        (lo as f64 / 1000.0, hi as f64 / 1000.0)
    })
}

type AnnSeed = (u16, u16, u32, u32, u32, u32);

fn ann_seed_strategy() -> impl Strategy<Value = AnnSeed> {
    (
        any::<u16>(),
        any::<u16>(),
        any::<u32>(),
        any::<u32>(),
        any::<u32>(),
        any::<u32>(),
    )
}

fn image_file_name_strategy() -> BoxedStrategy<String> {
    proptest::string::string_regex("[a-z0-9_]{1,12}\\.jpg")
        .expect("valid filename regex")
        .boxed()
}

fn category_name_strategy() -> BoxedStrategy<String> {
    proptest::string::string_regex("[a-z]{1,20}")
        .expect("valid category name regex")
        .boxed()
}

fn build_dataset(
    image_data: HashMap<String, (u32, u32)>,
    category_names: HashSet<String>,
    ann_seeds: Vec<AnnSeed>,
    id_salt: u64,
) -> Dataset {
    let mut image_rows: Vec<(String, (u32, u32))> = image_data.into_iter().collect();
    image_rows.sort_by(|a, b| a.0.cmp(&b.0));

    let mut category_rows: Vec<String> = category_names.into_iter().collect();
    category_rows.sort();

    // distinct ids that are neither dense nor increasing
    let sparse_id = |idx: usize| 1000 + (idx as u64 * 37 + id_salt % 31) * 3 + (idx as u64 % 2) * 5000;

    let images: Vec<Image> = image_rows
        .iter()
        .enumerate()
        .map(|(idx, (file_name, (width, height)))| {
            Image::new(sparse_id(idx), file_name.clone(), *width, *height)
        })
        .collect();

    let categories: Vec<Category> = category_rows
        .iter()
        .enumerate()
        .map(|(idx, name)| Category::new((idx * 2 + 1) as u64, name.clone()))
        .collect();

    let annotations: Vec<Annotation> = ann_seeds
        .into_iter()
        .enumerate()
        .map(|(idx, seed)| {
            let (image_seed, category_seed, sx, sy, sw, sh) = seed;
            let image = &images[image_seed as usize % images.len()];
            let category = &categories[category_seed as usize % categories.len()];
            let bbox = bbox_from_seed(image.width, image.height, sx, sy, sw, sh);

            Annotation::from_box(sparse_id(idx) + 1, image.id, category.id, bbox)
        })
        .collect();

    Dataset {
        images,
        categories,
        annotations,
        ..Default::default()
    }
}

fn bbox_from_seed(width: u32, height: u32, sx: u32, sy: u32, sw: u32, sh: u32) -> BBoxXYXY<Pixel> {
    let xmin = sx % (width - 1);
    let ymin = sy % (height - 1);
    let xmax = xmin + 1 + (sw % (width - xmin));
    let ymax = ymin + 1 + (sh % (height - ymin));

    BBoxXYXY::from_xyxy(xmin as f64, ymin as f64, xmax as f64, ymax as f64)
}

fn ann_sem_cmp(a: &AnnSem, b: &AnnSem) -> std::cmp::Ordering {
    a.image_file
        .cmp(&b.image_file)
        .then_with(|| a.category.cmp(&b.category))
        .then_with(|| a.bbox[0].total_cmp(&b.bbox[0]))
        .then_with(|| a.bbox[1].total_cmp(&b.bbox[1]))
        .then_with(|| a.bbox[2].total_cmp(&b.bbox[2]))
        .then_with(|| a.bbox[3].total_cmp(&b.bbox[3]))
}
