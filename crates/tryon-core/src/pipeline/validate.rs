//! Input validation before raster decode.

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Validates encoded image bytes before they reach the decoder.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Quick checks before a full decode.
    ///
    /// Checks:
    /// - Payload is within the size limit
    /// - Payload starts with known image magic bytes
    pub fn validate(&self, bytes: &[u8]) -> Result<(), PipelineError> {
        let size = bytes.len() as u64;
        if size > self.limits.max_input_bytes {
            return Err(PipelineError::InputTooLarge {
                size_bytes: size,
                max_bytes: self.limits.max_input_bytes,
            });
        }

        if bytes.len() < 4 {
            return Err(PipelineError::processing(
                "validate",
                "Payload too small to be a valid image",
            ));
        }

        if !Self::is_valid_image_header(bytes) {
            return Err(PipelineError::processing(
                "validate",
                "Unrecognized image format (invalid magic bytes)",
            ));
        }

        Ok(())
    }

    /// Check if the header bytes match a format the decoder is built with.
    fn is_valid_image_header(header: &[u8]) -> bool {
        if header.len() < 4 {
            return false;
        }

        // JPEG: FF D8 FF
        if header[0] == 0xFF && header[1] == 0xD8 && header[2] == 0xFF {
            return true;
        }

        // PNG: 89 50 4E 47
        if header[0] == 0x89 && header[1] == b'P' && header[2] == b'N' && header[3] == b'G' {
            return true;
        }

        // GIF: GIF8
        if header.starts_with(b"GIF8") {
            return true;
        }

        // WebP: RIFF....WEBP
        if header.starts_with(b"RIFF") {
            return header.len() >= 12 && &header[8..12] == b"WEBP";
        }

        // BMP: BM
        header[0] == b'B' && header[1] == b'M'
    }
}
