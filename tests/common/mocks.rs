use image::RgbImage;
use std::sync::{Arc, Mutex};
use vexeei_engine::{
    Error, Result,
    segmentation::{Mask, MaskPredictor, Point},
};

/// Records every click it sees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedCall {
    pub width: u32,
    pub height: u32,
    pub point: Point,
}

/// Mock mask model for testing
///
/// Returns the disc of `radius` pixels centred on the click, or a fixed
/// error when configured to fail.
#[derive(Debug)]
pub struct MockMaskPredictor {
    pub radius: f32,
    pub calls: Arc<Mutex<Vec<RecordedCall>>>,
    pub error: Option<String>,
}

impl MockMaskPredictor {
    pub fn new() -> Self {
        Self {
            radius: 8.0,
            calls: Arc::new(Mutex::new(Vec::new())),
            error: None,
        }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }

    pub fn get_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl MaskPredictor for MockMaskPredictor {
    fn predict_mask(&self, image: &RgbImage, point: Point) -> Result<Mask> {
        self.calls.lock().unwrap().push(RecordedCall {
            width: image.width(),
            height: image.height(),
            point,
        });

        if let Some(ref error) = self.error {
            return Err(Error::model(error.clone()));
        }

        let r2 = self.radius * self.radius;
        Ok(Mask::from_fn(image.width(), image.height(), |x, y| {
            let dx = x as f32 - point.x;
            let dy = y as f32 - point.y;
            dx * dx + dy * dy <= r2
        }))
    }
}

impl Default for MockMaskPredictor {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock that returns the same mask for every click
#[derive(Debug, Clone)]
pub struct FixedMaskPredictor {
    pub mask: Mask,
}

impl MaskPredictor for FixedMaskPredictor {
    fn predict_mask(&self, _image: &RgbImage, _point: Point) -> Result<Mask> {
        Ok(self.mask.clone())
    }

    fn device(&self) -> &str {
        "mock"
    }
}
