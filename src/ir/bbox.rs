//! Bounding boxes tagged with the coordinate space they live in.
//!
//! Open Images rows carry boxes as normalized `XMin/XMax/YMin/YMax`; COCO
//! stores absolute-pixel `[x, y, width, height]`. Both are held here as
//! XYXY corners with a marker type, so a normalized box cannot be written
//! into a COCO annotation without going through [`BBoxXYXY::to_pixel`].

use std::fmt;
use std::marker::PhantomData;

/// Marker for absolute pixel coordinates, origin at the top-left pixel.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker for coordinates expressed as fractions of the image size.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

/// An axis-aligned box in XYXY form.
///
/// Construction never reorders corners: an inverted source box yields a
/// negative width or height, and that sign is carried through to the
/// emitted annotation unchanged.
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYXY<TSpace> {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            _space: PhantomData,
        }
    }

    #[inline]
    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    #[inline]
    pub fn ymin(&self) -> f64 {
        self.ymin
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.ymax
    }

    /// Width of the box. Negative when `xmax < xmin`.
    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Height of the box. Negative when `ymax < ymin`.
    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.xmin.is_finite()
            && self.ymin.is_finite()
            && self.xmax.is_finite()
            && self.ymax.is_finite()
    }
}

impl BBoxXYXY<Normalized> {
    /// Projects a normalized box onto an image of the given pixel size.
    pub fn to_pixel(&self, image_width: f64, image_height: f64) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_xyxy(
            self.xmin * image_width,
            self.ymin * image_height,
            self.xmax * image_width,
            self.ymax * image_height,
        )
    }
}

impl BBoxXYXY<Pixel> {
    /// Builds a pixel box from COCO `[x, y, width, height]`.
    #[inline]
    pub fn from_xywh([x, y, w, h]: [f64; 4]) -> Self {
        Self::from_xyxy(x, y, x + w, y + h)
    }

    /// COCO `[x, y, width, height]` form.
    #[inline]
    pub fn to_xywh(&self) -> [f64; 4] {
        [self.xmin, self.ymin, self.width(), self.height()]
    }

    /// The four corners as a flat polygon, clockwise from the top-left:
    /// `[xmin,ymin, xmin,ymax, xmax,ymax, xmax,ymin]`.
    pub fn corner_polygon(&self) -> [f64; 8] {
        [
            self.xmin, self.ymin, self.xmin, self.ymax, self.xmax, self.ymax, self.xmax,
            self.ymin,
        ]
    }
}

impl<TSpace> fmt::Debug for BBoxXYXY<TSpace> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("xmin", &self.xmin)
            .field("ymin", &self.ymin)
            .field("xmax", &self.xmax)
            .field("ymax", &self.ymax)
            .finish()
    }
}
