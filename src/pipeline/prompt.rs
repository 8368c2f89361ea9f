// Style table and prompt construction
//
// The style table is process-wide read-only configuration; unknown style
// identifiers resolve to the default entry rather than erroring.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::core::types::{PetFeatures, PromptPair};

/// Style identifier used when the requested style has no table entry
pub const DEFAULT_STYLE: &str = "ROYAL";

/// Prompt text pair for one named artistic treatment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDescriptor {
    pub prompt_suffix: &'static str,
    pub negative_prompt: &'static str,
}

static STYLE_PROMPTS: Lazy<HashMap<&'static str, StyleDescriptor>> = Lazy::new(|| {
    HashMap::from([
        (
            "ROYAL",
            StyleDescriptor {
                prompt_suffix: "as a regal royal portrait, wearing elaborate renaissance clothing with crown and jewels, ornate background with rich fabrics and golden details, classical oil painting style, dramatic lighting, noble pose, high-resolution masterpiece",
                negative_prompt: "modern, casual, simple, low quality, blurry, pixelated",
            },
        ),
        (
            "KNIGHT",
            StyleDescriptor {
                prompt_suffix: "as a noble knight in shining armor, medieval warrior with sword and shield, castle background, epic fantasy style, dramatic lighting, heroic pose, detailed metalwork, high-resolution masterpiece",
                negative_prompt: "modern, casual, simple, low quality, blurry, pixelated",
            },
        ),
        (
            "SUPERHERO",
            StyleDescriptor {
                prompt_suffix: "as a powerful superhero with cape and costume, dynamic action pose, city skyline background, comic book style with dramatic lighting, heroic expression, high-resolution masterpiece",
                negative_prompt: "boring, static, simple, low quality, blurry, pixelated",
            },
        ),
    ])
});

/// Look up a style descriptor, falling back to the default entry for
/// unknown identifiers.
pub fn style_for(style: &str) -> &'static StyleDescriptor {
    STYLE_PROMPTS
        .get(style)
        .unwrap_or_else(|| &STYLE_PROMPTS[DEFAULT_STYLE])
}

/// Build the positive/negative prompt pair for a feature summary and style.
pub fn generate_prompt(features: &PetFeatures, style: &str) -> PromptPair {
    let descriptor = style_for(style);

    let mut base_prompt = format!(
        "High-quality artistic rendering of an {}",
        features.description
    );
    if !features.color_info.is_empty() {
        base_prompt.push(' ');
        base_prompt.push_str(&features.color_info);
    }

    PromptPair {
        positive: format!(
            "{}, {}, highly detailed, professional artwork, masterpiece quality",
            base_prompt, descriptor.prompt_suffix
        ),
        negative: descriptor.negative_prompt.to_string(),
    }
}
