//! Dense identifier renumbering.
//!
//! Every pathway that filters or partitions records ends with the same step:
//! walk the surviving records in order, give each the id
//! `base + position`, and remember `old -> new` so references held by
//! other records (an annotation's `image_id`) can be rewritten through it.
//!
//! The order of the input slice is the order of the output ids. Callers
//! decide which order matters (first appearance, row order, stored order).
//! Old ids are assumed unique within one call.

use std::collections::HashMap;
use std::hash::Hash;

use crate::ir::{Annotation, AnnotationId, Image, ImageId};

/// First id handed out by a renumbering pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdBase {
    /// Split outputs start at 0.
    Zero,
    /// Converted outputs start at 1.
    One,
}

impl IdBase {
    pub fn as_u64(self) -> u64 {
        match self {
            IdBase::Zero => 0,
            IdBase::One => 1,
        }
    }
}

/// A record that carries its own id.
pub trait Renumber {
    type Id: Copy + Eq + Hash + From<u64>;

    fn id(&self) -> Self::Id;
    fn set_id(&mut self, id: Self::Id);
}

impl Renumber for Image {
    type Id = ImageId;

    fn id(&self) -> ImageId {
        self.id
    }

    fn set_id(&mut self, id: ImageId) {
        self.id = id;
    }
}

impl Renumber for Annotation {
    type Id = AnnotationId;

    fn id(&self) -> AnnotationId {
        self.id
    }

    fn set_id(&mut self, id: AnnotationId) {
        self.id = id;
    }
}

/// Old id to new id, as produced by [`renumber`].
#[derive(Clone, Debug)]
pub struct IdMap<K> {
    map: HashMap<K, K>,
}

impl<K: Copy + Eq + Hash> IdMap<K> {
    pub fn get(&self, old: K) -> Option<K> {
        self.map.get(&old).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Renumbers `items` densely from `base`, in input order.
pub fn renumber<T: Renumber>(items: Vec<T>, base: IdBase) -> (Vec<T>, IdMap<T::Id>) {
    let start = base.as_u64();
    let mut map = HashMap::with_capacity(items.len());
    let items = items
        .into_iter()
        .zip(start..)
        .map(|(mut item, new)| {
            let new = T::Id::from(new);
            map.insert(item.id(), new);
            item.set_id(new);
            item
        })
        .collect();
    (items, IdMap { map })
}

/// Renumbers images and annotations of one dataset together.
///
/// Images are renumbered first; each annotation then gets a fresh id and
/// its `image_id` is rewritten through the image map. Returns the first
/// annotation whose parent image is not among `images` as `Err`.
pub fn renumber_images_and_annotations(
    images: Vec<Image>,
    annotations: Vec<Annotation>,
    base: IdBase,
) -> Result<(Vec<Image>, Vec<Annotation>), ImageId> {
    let (images, image_map) = renumber(images, base);
    let (mut annotations, _) = renumber(annotations, base);
    for ann in &mut annotations {
        ann.image_id = image_map.get(ann.image_id).ok_or(ann.image_id)?;
    }
    Ok((images, annotations))
}
