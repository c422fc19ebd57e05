use super::asset::PlanImage;
use super::blob::BlobRegistry;
use crate::generation::{Generation, GenerationCounter};
use crate::prelude::DecodeError;
use image::ImageFormat;
use log::{debug, warn};
use std::future::Future;
use std::io;

/// Completion of one decode request, tagged with the generation it was
/// issued under.
#[derive(Debug, Clone)]
pub struct DecodeOutcome {
    pub generation: Generation,
    pub result: Result<PlanImage, DecodeError>,
}

/// Resolves a file extension to an image format and its media type.
pub fn media_type_for(extension: &str) -> Result<(ImageFormat, &'static str), DecodeError> {
    let normalized = extension.trim().trim_start_matches('.').to_ascii_lowercase();
    ImageFormat::from_extension(&normalized)
        .map(|format| (format, format.to_mime_type()))
        .ok_or_else(|| DecodeError::UnknownFormat(extension.to_string()))
}

/// Decodes floor-plan blobs off the event loop.
///
/// Every call is tagged with a fresh generation; only the latest one is
/// current, so callers can discard completions that arrive after a newer
/// request was made.
#[derive(Debug, Clone, Default)]
pub struct PlanDecoder {
    generations: GenerationCounter,
    blobs: BlobRegistry,
}

impl PlanDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blobs(&self) -> &BlobRegistry {
        &self.blobs
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.generations.is_latest(generation)
    }

    /// Marks every in-flight decode as stale without starting a new one.
    pub fn supersede(&self) -> Generation {
        self.generations.issue()
    }

    /// Starts decoding `bytes`. The returned future must run on a tokio
    /// runtime; the staged blob URL is revoked whether decoding succeeds,
    /// fails or the future is dropped.
    pub fn decode(
        &self,
        bytes: Vec<u8>,
        extension: &str,
    ) -> (Generation, impl Future<Output = DecodeOutcome> + Send + 'static) {
        let generation = self.generations.issue();
        let blobs = self.blobs.clone();
        let extension = extension.to_string();

        let task = async move {
            let result = decode_staged(&blobs, bytes, &extension).await;
            match &result {
                Ok(image) => debug!(
                    "decode {} finished: {}x{}",
                    generation.value(),
                    image.width,
                    image.height
                ),
                Err(err) => warn!("decode {} failed: {}", generation.value(), err),
            }
            DecodeOutcome { generation, result }
        };

        (generation, task)
    }
}

async fn decode_staged(
    blobs: &BlobRegistry,
    bytes: Vec<u8>,
    extension: &str,
) -> Result<PlanImage, DecodeError> {
    let (format, media_type) = media_type_for(extension)?;
    let url = blobs.create(bytes, media_type);
    let (_, staged) = blobs
        .resolve(url.as_str())
        .ok_or_else(|| io_failure(io::ErrorKind::NotFound, "staged blob vanished"))?;

    let decoded = tokio::task::spawn_blocking(move || {
        image::load_from_memory_with_format(&staged, format).map(PlanImage::from_dynamic)
    })
    .await;
    drop(url);

    match decoded {
        Ok(result) => Ok(result?),
        Err(join) => Err(io_failure(io::ErrorKind::Other, &join.to_string())),
    }
}

fn io_failure(kind: io::ErrorKind, message: &str) -> DecodeError {
    image::ImageError::IoError(io::Error::new(kind, message.to_string())).into()
}
