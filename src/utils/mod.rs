pub mod image_ops;

// Re-export commonly used items
pub use image_ops::{
    boost_contrast, encode_jpeg_async, encode_jpeg_sync, load_image_from_memory_async,
    JPEG_QUALITY,
};
