mod sam;

pub use sam::{SamModel, preprocess, transform_point, SAM_INPUT_SIZE};

use crate::{Error, Result};
use image::{GrayImage, Luma, RgbImage};
use serde::{Deserialize, Serialize};

/// A click on the image, in source pixel coordinates. Always a foreground prompt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f32; 2]", into = "[f32; 2]")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Parses the `"[x, y]"` form field sent by the map client.
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl TryFrom<[f32; 2]> for Point {
    type Error = String;

    fn try_from([x, y]: [f32; 2]) -> std::result::Result<Self, Self::Error> {
        if !x.is_finite() || !y.is_finite() {
            return Err(format!("coordinates must be finite numbers, got [{}, {}]", x, y));
        }
        Ok(Self { x, y })
    }
}

impl From<Point> for [f32; 2] {
    fn from(point: Point) -> Self {
        [point.x, point.y]
    }
}

/// Binary segmentation result with the same dimensions as the source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    pub fn new(width: u32, height: u32, data: Vec<bool>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(Error::model(format!(
                "mask of {}x{} needs {} cells, got {}",
                width,
                height,
                width as usize * height as usize,
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.data[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        if x < self.width && y < self.height {
            self.data[(y * self.width + x) as usize] = value;
        }
    }

    pub fn area(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// 0/255 grayscale image, the form contour tracing works on.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.get(x, y) { Luma([255]) } else { Luma([0]) }
        })
    }
}

/// Produces the single best mask for a foreground click.
///
/// Implementations must be usable from several requests at once; any
/// per-image context has to live inside one call.
pub trait MaskPredictor: Send + Sync {
    fn predict_mask(&self, image: &RgbImage, point: Point) -> Result<Mask>;

    /// Name of the accelerator the model runs on, for status reporting.
    fn device(&self) -> &str {
        "cpu"
    }
}
