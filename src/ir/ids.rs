//! Newtype IDs for the three kinds of COCO records.
//!
//! Image, annotation and category ids all serialize as bare integers, but
//! they live in separate id spaces: a renumbering pass rewrites image ids
//! and annotation ids independently, and category ids are never renumbered.
//! Keeping them as distinct types stops an image id from being looked up in
//! an annotation remap table.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! coco_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            #[inline]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            #[inline]
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

coco_id!(
    /// Identifier of an image within one dataset.
    ImageId
);

coco_id!(
    /// Identifier of an annotation within one dataset.
    AnnotationId
);

coco_id!(
    /// Identifier of a category. Assigned by the caller's class mapping and
    /// stable across a conversion run.
    CategoryId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&ImageId(7)).unwrap();
        assert_eq!(json, "7");
        let back: AnnotationId = serde_json::from_str("12").unwrap();
        assert_eq!(back, AnnotationId(12));
    }

    #[test]
    fn debug_names_the_id_space() {
        assert_eq!(format!("{:?}", ImageId(3)), "ImageId(3)");
        assert_eq!(format!("{:?}", CategoryId(4)), "CategoryId(4)");
        assert_eq!(format!("{}", AnnotationId(5)), "5");
    }

    #[test]
    fn test_id_hash() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(AnnotationId(1));
        set.insert(AnnotationId(2));
        set.insert(AnnotationId(1)); // duplicate
        assert_eq!(set.len(), 2);
    }
}
