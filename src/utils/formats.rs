use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Output formats the converter can negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    WebP,
    PNG,
}

impl OutputFormat {
    /// WebP when the encoder probe succeeded, PNG otherwise.
    pub fn negotiate(supports_webp: bool) -> Self {
        if supports_webp { Self::WebP } else { Self::PNG }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::WebP => "image/webp",
            Self::PNG => "image/png",
        }
    }

    /// Extension including the leading dot, as appended to download names.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::WebP => ".webp",
            Self::PNG => ".png",
        }
    }
}

/// Whether a declared media type names a raster image the decoder may accept.
pub fn is_raster_image_type(mime: &str) -> bool {
    mime.starts_with("image/") && !mime.eq_ignore_ascii_case("image/svg+xml")
}

/// Declared media type for a file name, derived from its extension.
pub fn media_type_from_name(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "jpg" | "jpeg" | "jfif" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// Download name for a converted entry: the original name with its last
/// extension stripped, followed by the negotiated extension.
pub fn output_file_name(original_name: &str, extension: &str) -> String {
    let stem = match original_name.rfind('.') {
        Some(idx) if idx + 1 < original_name.len() => &original_name[..idx],
        _ => original_name,
    };
    format!("{stem}{extension}")
}

/// Returns `name`, or `name` with a ` (n)` suffix before its extension when
/// `used` already holds it. The returned name is added to `used`.
pub fn unique_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let (stem, extension) = match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    };
    let mut n = 1;
    loop {
        let candidate = format!("{stem} ({n}){extension}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Formats a byte count with 1024-based units and one decimal place,
/// trailing `.0` dropped (`1536` -> `"1.5 KB"`, `1024` -> `"1 KB"`).
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut unit = 0;
    while unit + 1 < SIZE_UNITS.len() && bytes >= 1u64 << (10 * (unit + 1)) {
        unit += 1;
    }

    let value = bytes as f64 / 1024f64.powi(unit as i32);
    let rounded = (value * 10.0).round() / 10.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_bytes_like_the_stats_labels() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024 + 300 * 1024), "5.3 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn huge_counts_stay_in_gigabytes() {
        assert_eq!(format_bytes(2048 * 1024 * 1024 * 1024), "2048 GB");
    }

    #[test]
    fn output_names_replace_only_the_last_extension() {
        assert_eq!(output_file_name("photo.jpg", ".webp"), "photo.webp");
        assert_eq!(output_file_name("archive.tar.png", ".png"), "archive.tar.png");
        assert_eq!(output_file_name("noext", ".webp"), "noext.webp");
        assert_eq!(output_file_name("trailing.", ".webp"), "trailing..webp");
        assert_eq!(output_file_name(".hidden", ".png"), ".png");
    }

    #[test]
    fn negotiation_falls_back_to_png() {
        assert_eq!(OutputFormat::negotiate(true).extension(), ".webp");
        assert_eq!(OutputFormat::negotiate(false).extension(), ".png");
        assert_eq!(OutputFormat::negotiate(false).mime_type(), "image/png");
    }

    #[test]
    fn media_types_from_names() {
        assert_eq!(media_type_from_name("a.JPG"), "image/jpeg");
        assert_eq!(media_type_from_name("notes.txt"), "application/octet-stream");
        assert!(is_raster_image_type(media_type_from_name("b.webp")));
        assert!(!is_raster_image_type("text/plain"));
    }

    #[test]
    fn vector_images_are_not_raster() {
        assert!(!is_raster_image_type(media_type_from_name("logo.svg")));
        assert!(!is_raster_image_type("IMAGE/SVG+XML"));
        assert!(is_raster_image_type("image/gif"));
    }

    #[test]
    fn duplicate_names_are_suffixed() {
        let mut used = HashSet::new();
        assert_eq!(unique_name("a.webp", &mut used), "a.webp");
        assert_eq!(unique_name("a.webp", &mut used), "a (1).webp");
        assert_eq!(unique_name("a.webp", &mut used), "a (2).webp");
        assert_eq!(unique_name("README", &mut used), "README");
        assert_eq!(unique_name("README", &mut used), "README (1)");
    }
}
