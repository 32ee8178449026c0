//! Try-on pipeline stages.
//!
//! - **input**: Normalize image inputs to canonical base64
//! - **validate**: Magic-byte and size checks before decode
//! - **decode**: In-memory decode and JPEG encode
//! - **compress**: Bounded-dimension compression
//! - **detect**: Vision-assisted subject detection (soft-fail)
//! - **crop**: Relative-region cropping
//! - **prepare**: Garment compress -> detect -> crop
//! - **submit**: Create the generation job
//! - **processor**: Orchestrates the full pipeline

pub mod compress;
pub mod crop;
pub mod decode;
pub mod detect;
pub mod input;
pub mod prepare;
pub mod processor;
pub mod submit;
#[cfg(test)]
pub(crate) mod test_support;
pub mod validate;

pub use compress::{fit_within, Compressor};
pub use crop::{CropRegion, Cropper, PixelRect};
pub use decode::{DecodedImage, ImageDecoder};
pub use detect::{parse_crop_region, SubjectDetector};
pub use input::{ImageInput, Normalizer};
pub use prepare::{GarmentPreparer, PreparedGarment};
pub use processor::{GenerateOptions, TryOnPipeline};
pub use submit::{JobSubmitter, Submission};
pub use validate::Validator;
