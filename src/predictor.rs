use crate::{
    Result,
    config::Config,
    polygon::{self, Polygon},
    segmentation::{MaskPredictor, Point, SamModel},
};
use image::{DynamicImage, RgbImage};
use std::sync::Arc;
use tracing::{debug, info};

/// Decodes uploaded bytes (PNG, JPEG, ...) into an RGB pixel grid.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage> {
    let image = image::load_from_memory(bytes)?;
    debug!(
        "Decoded {}x{} image ({:?})",
        image.width(),
        image.height(),
        image.color()
    );
    Ok(to_rgb(image))
}

/// The model expects RGB channel order; grayscale, alpha and 16-bit inputs are converted.
pub fn to_rgb(image: DynamicImage) -> RgbImage {
    match image {
        DynamicImage::ImageRgb8(rgb) => rgb,
        other => other.to_rgb8(),
    }
}

/// Turns a click into a polygon: model mask, largest outer contour, simplification.
#[derive(Clone)]
pub struct Predictor {
    model: Arc<dyn MaskPredictor>,
    epsilon_ratio: f64,
}

impl Predictor {
    pub fn new(model: Arc<dyn MaskPredictor>, epsilon_ratio: f64) -> Self {
        Self {
            model,
            epsilon_ratio,
        }
    }

    /// Picks the accelerator once and loads the SAM model onto it.
    pub fn load(config: &Config) -> Result<Self> {
        let model = SamModel::load(&config.model)?;
        info!("Predictor ready on {}", model.device());
        Ok(Self::new(Arc::new(model), config.polygon.epsilon_ratio))
    }

    pub fn device(&self) -> &str {
        self.model.device()
    }

    pub fn predict(&self, image: &RgbImage, point: Point) -> Result<Polygon> {
        let mask = self.model.predict_mask(image, point)?;
        debug!(
            "Mask for ({}, {}) covers {} pixels",
            point.x,
            point.y,
            mask.area()
        );

        Ok(polygon::mask_to_polygon(&mask, self.epsilon_ratio))
    }

    /// Decode and predict in one go, the path the HTTP handler takes.
    pub fn predict_bytes(&self, bytes: &[u8], point: Point) -> Result<Polygon> {
        let image = decode_image(bytes)?;
        self.predict(&image, point)
    }
}
