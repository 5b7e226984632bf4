pub mod crop;
pub mod image_io;

pub use crop::CropRect;
pub use image_io::{is_supported_image, load_raster, SUPPORTED_EXTENSIONS};
