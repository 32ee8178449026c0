//! Garment preparation: compress, then optionally crop to the detected subject.

use crate::config::{CompressionConfig, LimitsConfig};
use crate::error::PipelineResult;
use crate::types::{ImageMetadata, PreparedImage};

use super::compress::Compressor;
use super::crop::{CropRegion, Cropper};
use super::detect::SubjectDetector;

/// Output of garment preparation.
#[derive(Debug, Clone)]
pub struct PreparedGarment {
    /// Bytes to upload
    pub image: PreparedImage,
    /// The region applied, if the image was cropped
    pub region: Option<CropRegion>,
}

/// Runs compress -> detect -> crop on garment images.
///
/// Only compression can fail. A detection miss or a crop failure falls back
/// to the compressed bytes.
#[derive(Clone)]
pub struct GarmentPreparer {
    compressor: Compressor,
    cropper: Cropper,
    detector: SubjectDetector,
}

impl GarmentPreparer {
    pub fn new(
        compression: CompressionConfig,
        limits: LimitsConfig,
        detector: SubjectDetector,
    ) -> Self {
        Self {
            cropper: Cropper::new(&compression, limits.clone()),
            compressor: Compressor::new(compression, limits),
            detector,
        }
    }

    pub async fn prepare(&self, bytes: Vec<u8>, skip_crop: bool) -> PipelineResult<PreparedGarment> {
        let compressed = self.compressor.compress(bytes).await?;
        if skip_crop || !self.detector.is_enabled() {
            return Ok(Self::uncropped(compressed));
        }

        let Some(region) = self.detector.detect(&compressed.bytes).await else {
            tracing::debug!("No subject region, using compressed garment");
            return Ok(Self::uncropped(compressed));
        };

        match self.cropper.crop(compressed.bytes.clone(), region).await {
            Ok(cropped) => {
                let metadata = ImageMetadata::new(
                    compressed.metadata.original_size,
                    cropped.bytes.len() as u64,
                    cropped.metadata.width,
                    cropped.metadata.height,
                );
                Ok(PreparedGarment {
                    image: PreparedImage {
                        bytes: cropped.bytes,
                        metadata,
                    },
                    region: Some(region),
                })
            }
            Err(e) => {
                tracing::warn!("Crop failed, using compressed garment: {e}");
                Ok(Self::uncropped(compressed))
            }
        }
    }

    fn uncropped(image: PreparedImage) -> PreparedGarment {
        PreparedGarment {
            image,
            region: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::pipeline::detect::tests::MockVision;
    use crate::pipeline::test_support::png_fixture;
    use std::sync::atomic::Ordering;

    fn preparer(detector: SubjectDetector) -> GarmentPreparer {
        GarmentPreparer::new(CompressionConfig::default(), LimitsConfig::default(), detector)
    }

    fn compressed_reference(input: &[u8]) -> Vec<u8> {
        Compressor::new(CompressionConfig::default(), LimitsConfig::default())
            .compress_sync(input)
            .unwrap()
            .bytes
    }

    #[tokio::test]
    async fn test_malformed_vision_answer_keeps_compressed_bytes() {
        let input = png_fixture(1200, 900);
        let vision = MockVision::answering("Sure! The shirt is in the middle.");
        let out = preparer(SubjectDetector::new(vision.clone()))
            .prepare(input.clone(), false)
            .await
            .unwrap();

        assert_eq!(vision.calls.load(Ordering::SeqCst), 1);
        assert!(out.region.is_none());
        assert_eq!(out.image.bytes, compressed_reference(&input));
    }

    #[tokio::test]
    async fn test_detected_region_is_cropped() {
        let input = png_fixture(1000, 1000);
        let vision = MockVision::answering(r#"{"left":0.25,"top":0.25,"width":0.5,"height":0.5}"#);
        let out = preparer(SubjectDetector::new(vision))
            .prepare(input.clone(), false)
            .await
            .unwrap();

        assert_eq!(out.region, Some(CropRegion::new(0.25, 0.25, 0.5, 0.5)));
        assert_eq!((out.image.metadata.width, out.image.metadata.height), (500, 500));
        assert_eq!(out.image.metadata.original_size, input.len() as u64);
    }

    #[tokio::test]
    async fn test_empty_region_falls_back() {
        let input = png_fixture(200, 200);
        let vision = MockVision::answering(r#"{"left":1,"top":1,"width":0.5,"height":0.5}"#);
        let out = preparer(SubjectDetector::new(vision))
            .prepare(input.clone(), false)
            .await
            .unwrap();
        assert!(out.region.is_none());
        assert_eq!(out.image.bytes, compressed_reference(&input));
    }

    #[tokio::test]
    async fn test_skip_crop_makes_no_vision_call() {
        let vision = MockVision::answering(r#"{"left":0,"top":0,"width":1,"height":1}"#);
        preparer(SubjectDetector::new(vision.clone()))
            .prepare(png_fixture(64, 64), true)
            .await
            .unwrap();
        assert_eq!(vision.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_compression_failure_is_fatal() {
        let err = preparer(SubjectDetector::disabled())
            .prepare(b"not an image at all".to_vec(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Processing { .. }));
    }
}
