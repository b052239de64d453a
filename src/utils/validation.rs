use std::path::Path;
use crate::core::BatchSettings;
use crate::utils::{ConverterResult, ValidationError};

/// Validates the input file path before it is read
pub fn validate_input_path(path: &Path) -> ConverterResult<()> {
    if !path.exists() {
        return Err(ValidationError::path_not_found(path).into());
    }

    if !path.is_file() {
        return Err(ValidationError::not_a_file(path).into());
    }

    Ok(())
}

/// Validates the directory results are written into
pub fn validate_output_dir(path: &Path) -> ConverterResult<()> {
    if path.exists() && !path.is_dir() {
        return Err(ValidationError::settings(
            format!("Output path is not a directory: {}", path.display())
        ).into());
    }
    Ok(())
}

/// Validates batch settings
pub fn validate_settings(settings: &BatchSettings) -> ConverterResult<()> {
    if !(0.0..=1.0).contains(&settings.quality) || settings.quality.is_nan() {
        return Err(ValidationError::settings(
            format!("Invalid quality value: {}. Must be between 0 and 1", settings.quality)
        ).into());
    }

    if let Some(width) = settings.width {
        if width == 0 {
            return Err(ValidationError::settings("Width cannot be 0").into());
        }
    }

    if let Some(height) = settings.height {
        if height == 0 {
            return Err(ValidationError::settings("Height cannot be 0").into());
        }
    }

    Ok(())
}
