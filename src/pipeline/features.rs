// Coarse pet feature extraction
//
// This is a deliberate stand-in for a real vision model: it yields a generic
// description plus the dominant color of the photo. It must never fail the
// pipeline; when no dominant color can be extracted it degrades to an empty
// color clause.

use image::DynamicImage;
use std::collections::HashMap;
use tracing::debug;

use crate::core::types::PetFeatures;

/// Upper bound on distinct RGB triples tracked by the histogram. An 8-bit
/// RGB image cannot exceed this, so real photos always get a color clause;
/// the empty-clause path is a theoretical degradation only.
const MAX_DISTINCT_COLORS: usize = 256 * 256 * 256;

/// Derive a lightweight feature summary from a source photo.
pub fn analyze_pet_features(image: &DynamicImage) -> PetFeatures {
    let color_info = match dominant_color(image) {
        Some((r, g, b)) => format!("with predominant colors RGB({}, {}, {})", r, g, b),
        None => String::new(),
    };

    debug!(color_info = %color_info, "Analyzed pet features");

    PetFeatures {
        description: "adorable pet".to_string(),
        color_info,
        composition: "well-composed portrait".to_string(),
    }
}

/// Most frequent exact RGB triple, or None when the histogram overflows.
/// Tie-break between equally frequent colors is unspecified.
fn dominant_color(image: &DynamicImage) -> Option<(u8, u8, u8)> {
    let rgb = image.to_rgb8();
    let mut histogram: HashMap<[u8; 3], u32> = HashMap::new();

    for pixel in rgb.pixels() {
        *histogram.entry(pixel.0).or_insert(0) += 1;
        if histogram.len() > MAX_DISTINCT_COLORS {
            return None;
        }
    }

    histogram
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|([r, g, b], _)| (r, g, b))
}
