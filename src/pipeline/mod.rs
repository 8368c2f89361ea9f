pub mod features;
pub mod mockup;
pub mod prompt;

// Re-export commonly used items
pub use features::analyze_pet_features;
pub use mockup::{compose_mockup_async, create_product_mockup, spec_for, MockupSpec, PRODUCT_TYPES};
pub use prompt::{generate_prompt, style_for, StyleDescriptor, DEFAULT_STYLE};
