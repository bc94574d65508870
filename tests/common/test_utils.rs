use axum::{Router, body::Body, http::Request};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::Arc;
use vexeei_engine::{
    config::ServerConfig,
    predictor::Predictor,
    segmentation::{Mask, MaskPredictor},
    server,
};

pub const BOUNDARY: &str = "vexeei-test-boundary";

/// Build the real router around a mock model
pub fn create_test_app(model: Arc<dyn MaskPredictor>) -> Router {
    let predictor = Predictor::new(model, 0.005);
    server::router(Arc::new(predictor), &ServerConfig::default()).unwrap()
}

/// Encode an RGB image of the given size as PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::new(width, height));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// Parts of a multipart/form-data body
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a [u8]),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"tile.png\"\r\n\
                         Content-Type: image/png\r\n\r\n",
                        name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn segment_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/segment")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// Mask with filled axis-aligned rectangles, corners inclusive
pub fn rect_mask(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> Mask {
    Mask::from_fn(width, height, |x, y| {
        rects
            .iter()
            .any(|&(x0, y0, x1, y1)| x >= x0 && x <= x1 && y >= y0 && y <= y1)
    })
}
