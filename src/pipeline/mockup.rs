// Product mockup compositing
//
// Places the generated artwork onto a fixed-size flat canvas at a
// product-specific size/position, then applies a uniform contrast boost.
// No real product template art is composited in this version; the canvas is
// a plain light-gray background.

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::debug;

/// Product type used when the requested one has no table entry
pub const DEFAULT_PRODUCT_TYPE: &str = "tee";

/// The six products mocked up for every job, in processing order
pub const PRODUCT_TYPES: [&str; 6] = ["tee", "hoodie", "mug", "tote", "case", "poster"];

/// Canvas background fill (light gray)
const CANVAS_FILL: Rgb<u8> = Rgb([240, 240, 240]);

/// Uniform contrast multiplier applied to the finished canvas
const CONTRAST_FACTOR: f32 = 1.1;

/// Geometry for one product type. Table invariant (not runtime-checked):
/// `offset + render_size` fits inside `canvas` for every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockupSpec {
    /// Size the artwork is resized to before placement
    pub render_size: (u32, u32),
    /// Top-left placement of the artwork on the canvas
    pub offset: (u32, u32),
    /// Output canvas dimensions
    pub canvas: (u32, u32),
}

static MOCKUP_SPECS: Lazy<HashMap<&'static str, MockupSpec>> = Lazy::new(|| {
    HashMap::from([
        ("tee", MockupSpec { render_size: (600, 600), offset: (150, 200), canvas: (900, 1000) }),
        ("hoodie", MockupSpec { render_size: (560, 560), offset: (170, 250), canvas: (900, 1000) }),
        ("mug", MockupSpec { render_size: (400, 300), offset: (250, 300), canvas: (900, 800) }),
        ("tote", MockupSpec { render_size: (500, 500), offset: (200, 400), canvas: (900, 1000) }),
        ("case", MockupSpec { render_size: (360, 640), offset: (270, 120), canvas: (900, 900) }),
        ("poster", MockupSpec { render_size: (800, 600), offset: (50, 150), canvas: (900, 900) }),
    ])
});

/// Look up the mockup geometry for a product type, falling back to the
/// "tee" entry for unknown identifiers.
pub fn spec_for(product_type: &str) -> MockupSpec {
    MOCKUP_SPECS
        .get(product_type)
        .copied()
        .unwrap_or(MOCKUP_SPECS[DEFAULT_PRODUCT_TYPE])
}

/// Compose one product mockup from the generated artwork.
pub fn create_product_mockup(ai_image: &DynamicImage, product_type: &str) -> RgbImage {
    let spec = spec_for(product_type);
    debug!(product_type, ?spec, "Compositing mockup");

    let (canvas_w, canvas_h) = spec.canvas;
    let mut canvas = RgbImage::from_pixel(canvas_w, canvas_h, CANVAS_FILL);

    // Lanczos avoids visible aliasing when downscaling the artwork
    let (render_w, render_h) = spec.render_size;
    let resized = ai_image
        .resize_exact(render_w, render_h, FilterType::Lanczos3)
        .to_rgb8();

    let (x, y) = spec.offset;
    imageops::overlay(&mut canvas, &resized, x as i64, y as i64);

    crate::utils::boost_contrast(&canvas, CONTRAST_FACTOR)
}

/// Composite and JPEG-encode a mockup off the async runtime.
///
/// Resize + encode is CPU-heavy, so the whole step runs in one
/// spawn_blocking task.
pub async fn compose_mockup_async(ai_image: DynamicImage, product_type: &str) -> Result<Vec<u8>> {
    let product_type = product_type.to_string();
    tokio::task::spawn_blocking(move || {
        let mockup = create_product_mockup(&ai_image, &product_type);
        crate::utils::encode_jpeg_sync(&DynamicImage::ImageRgb8(mockup))
    })
    .await
    .context("Failed to spawn blocking task for mockup compositing")?
}
