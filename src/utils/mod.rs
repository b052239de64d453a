pub mod error;
pub mod validation;
pub mod formats;
pub mod fs;

pub use error::{ConverterError, ConverterResult, PathError, ValidationError};
pub use validation::{validate_input_path, validate_output_dir, validate_settings};
pub use formats::{
    OutputFormat,
    format_bytes,
    is_raster_image_type,
    media_type_from_name,
    output_file_name,
    unique_name,
};
pub use fs::{read_source_file, write_output};
