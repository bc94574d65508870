//! Segment Anything (ViT-B) running on ONNX Runtime.
//!
//! The model is exported as two graphs: an image encoder that turns a
//! 1024x1024 normalized image into an embedding, and a prompt decoder that
//! combines the embedding with point prompts and returns mask logits at the
//! original image resolution.

use super::{Mask, MaskPredictor, Point};
use crate::{
    Error, Result,
    config::ModelConfig,
    device::{self, Device},
};
use image::{RgbImage, imageops::FilterType};
use ndarray::{Array1, Array2, Array3, Array4, ArrayD, ArrayViewD};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Side length of the square encoder input.
pub const SAM_INPUT_SIZE: u32 = 1024;

const PIXEL_MEAN: [f32; 3] = [123.675, 116.28, 103.53];
const PIXEL_STD: [f32; 3] = [58.395, 57.12, 57.375];

/// Low resolution mask prompt expected by the decoder, unused for clicks.
const MASK_INPUT_SIZE: usize = 256;

const FOREGROUND_LABEL: f32 = 1.0;
/// Label of the padding point the decoder needs when no box is supplied.
const PADDING_LABEL: f32 = -1.0;

pub struct SamModel {
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    encoder_input: String,
    device: Device,
    mask_threshold: f32,
}

impl SamModel {
    /// Loads encoder and decoder on the first device in `config.devices`
    /// whose sessions build, falling back to CPU.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        for path in [&config.encoder_path, &config.decoder_path] {
            if !Path::new(path).exists() {
                return Err(Error::model(format!("Model file not found: {}", path)));
            }
        }

        let (device, model) =
            device::select_with(&config.devices, |device| Self::load_on(config, device))?;
        debug!("SAM model bound to {}", device);
        Ok(model)
    }

    pub fn load_on(config: &ModelConfig, device: Device) -> Result<Self> {
        info!(
            "Loading SAM encoder {} and decoder {} on {}",
            config.encoder_path, config.decoder_path, device
        );

        let encoder = build_session(&config.encoder_path, device, config.intra_threads)?;
        let decoder = build_session(&config.decoder_path, device, config.intra_threads)?;

        let encoder_input = encoder
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input_image".to_string());

        debug!("SAM encoder input: {}", encoder_input);
        info!("SAM model loaded and ready on {}", device);

        Ok(Self {
            encoder: Mutex::new(encoder),
            decoder: Mutex::new(decoder),
            encoder_input,
            device,
            mask_threshold: config.mask_threshold,
        })
    }

    /// Runs the image encoder. The returned embedding belongs to the caller.
    pub fn embed(&self, image: &RgbImage) -> Result<ArrayD<f32>> {
        let input = Value::from_array(preprocess(image))?;

        let mut encoder = self
            .encoder
            .lock()
            .map_err(|e| Error::internal(format!("Encoder lock poisoned: {e}")))?;
        let outputs = encoder
            .run(ort::inputs![self.encoder_input.as_str() => input])
            .map_err(|e| Error::model(format!("Encoder inference failed: {}", e)))?;

        let embedding = outputs[0].try_extract_array::<f32>()?.to_owned();
        debug!("Image embedding shape: {:?}", embedding.shape());

        Ok(embedding)
    }

    /// Decodes one mask for a single foreground click against a precomputed embedding.
    pub fn decode(
        &self,
        embedding: ArrayD<f32>,
        point: Point,
        width: u32,
        height: u32,
    ) -> Result<Mask> {
        let inputs = decoder_inputs(point, width, height)?;

        let mut decoder = self
            .decoder
            .lock()
            .map_err(|e| Error::internal(format!("Decoder lock poisoned: {e}")))?;
        let outputs = decoder
            .run(ort::inputs![
                "image_embeddings" => Value::from_array(embedding)?,
                "point_coords" => Value::from_array(inputs.point_coords)?,
                "point_labels" => Value::from_array(inputs.point_labels)?,
                "mask_input" => Value::from_array(inputs.mask_input)?,
                "has_mask_input" => Value::from_array(inputs.has_mask_input)?,
                "orig_im_size" => Value::from_array(inputs.orig_im_size)?
            ])
            .map_err(|e| Error::model(format!("Decoder inference failed: {}", e)))?;

        let logits = outputs["masks"].try_extract_array::<f32>()?;
        mask_from_logits(&logits, width, height, self.mask_threshold)
    }
}

/// Prompt tensors for one foreground click, no box and no previous mask.
#[derive(Debug)]
pub struct DecoderInputs {
    /// `1 x 2 x 2`: the click in encoder space, then the padding point.
    pub point_coords: Array3<f32>,
    /// `1 x 2`: foreground, then padding.
    pub point_labels: Array2<f32>,
    pub mask_input: Array4<f32>,
    pub has_mask_input: Array1<f32>,
    /// Original `[height, width]`, so logits come back at source resolution.
    pub orig_im_size: Array1<f32>,
}

pub fn decoder_inputs(point: Point, width: u32, height: u32) -> Result<DecoderInputs> {
    let (x, y) = transform_point(point, width, height);

    Ok(DecoderInputs {
        point_coords: Array3::from_shape_vec((1, 2, 2), vec![x, y, 0.0, 0.0])?,
        point_labels: Array2::from_shape_vec((1, 2), vec![FOREGROUND_LABEL, PADDING_LABEL])?,
        mask_input: Array4::zeros((1, 1, MASK_INPUT_SIZE, MASK_INPUT_SIZE)),
        has_mask_input: Array1::from_vec(vec![0.0]),
        orig_im_size: Array1::from_vec(vec![height as f32, width as f32]),
    })
}

/// Binarizes the first `1 x 1 x H x W` mask. Logits equal to the threshold are background.
pub fn mask_from_logits(
    logits: &ArrayViewD<'_, f32>,
    width: u32,
    height: u32,
    threshold: f32,
) -> Result<Mask> {
    let shape = logits.shape();
    if shape.len() != 4
        || shape[0] == 0
        || shape[1] == 0
        || shape[2] != height as usize
        || shape[3] != width as usize
    {
        return Err(Error::model(format!(
            "Unexpected mask shape {:?} for a {}x{} image",
            shape, width, height
        )));
    }

    Mask::new(
        width,
        height,
        logits
            .iter()
            .take(width as usize * height as usize)
            .map(|&logit| logit > threshold)
            .collect(),
    )
}

impl MaskPredictor for SamModel {
    fn predict_mask(&self, image: &RgbImage, point: Point) -> Result<Mask> {
        let embedding = self.embed(image)?;
        self.decode(embedding, point, image.width(), image.height())
    }

    fn device(&self) -> &str {
        self.device.as_str()
    }
}

fn build_session(path: &str, device: Device, intra_threads: usize) -> Result<Session> {
    if !Path::new(path).exists() {
        return Err(Error::model(format!("Model file not found: {}", path)));
    }

    Session::builder()
        .map_err(|e| Error::model(format!("Failed to create session builder: {}", e)))?
        .with_execution_providers([device.execution_provider()])
        .map_err(|e| Error::model(format!("Failed to register {} provider: {}", device, e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| Error::model(format!("Failed to set optimization level: {}", e)))?
        .with_intra_threads(intra_threads)
        .map_err(|e| Error::model(format!("Failed to set intra threads: {}", e)))?
        .commit_from_file(path)
        .map_err(|e| Error::model(format!("Failed to load model from {}: {}", path, e)))
}

/// Size of the image after scaling its longest side to [`SAM_INPUT_SIZE`].
fn resized_dims(width: u32, height: u32) -> (u32, u32) {
    let scale = SAM_INPUT_SIZE as f64 / width.max(height).max(1) as f64;
    let new_w = (width as f64 * scale + 0.5) as u32;
    let new_h = (height as f64 * scale + 0.5) as u32;
    (new_w.max(1), new_h.max(1))
}

/// Builds the encoder input: longest side scaled to 1024, channels
/// normalized, NCHW layout, zero padded on the right and bottom.
pub fn preprocess(image: &RgbImage) -> Array4<f32> {
    let (new_w, new_h) = resized_dims(image.width(), image.height());
    let resized = image::imageops::resize(image, new_w, new_h, FilterType::Triangle);

    let size = SAM_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 - PIXEL_MEAN[c]) / PIXEL_STD[c];
        }
    }
    tensor
}

/// Maps a click from source pixels into the resized encoder frame.
pub fn transform_point(point: Point, width: u32, height: u32) -> (f32, f32) {
    let (new_w, new_h) = resized_dims(width, height);
    (
        point.x * (new_w as f32 / width.max(1) as f32),
        point.y * (new_h as f32 / height.max(1) as f32),
    )
}
