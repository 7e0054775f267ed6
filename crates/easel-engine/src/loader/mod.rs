//! Asynchronous resource loading.
//!
//! [`ResourceLoader::load_all`] issues every request at once and joins them:
//! it resolves with a complete [`ResourceSet`] only when all requests resolved,
//! and fails with the first error otherwise. Requests still in flight at that
//! point are dropped; their transfers are not aborted, their results are
//! simply never looked at.

mod request;
mod transport;

pub use request::{DecodedImage, Resource, ResourceKind, ResourceRequest, ResourceSet};
pub use transport::{FetchResponse, FileTransport, MemoryTransport, Transport, STATUS_OK};

use crate::error::LoadError;

/// Fetches and decodes resources through a [`Transport`].
#[derive(Debug, Clone, Default)]
pub struct ResourceLoader<T> {
    transport: T,
}

impl<T: Transport> ResourceLoader<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Loads every request concurrently; fails fast on the first failure.
    pub async fn load_all(&self, requests: &[ResourceRequest]) -> Result<ResourceSet, LoadError> {
        let pending = requests.iter().map(|request| self.load_one(request));
        let resources = futures::future::try_join_all(pending).await?;

        Ok(ResourceSet::new(
            requests.iter().cloned().zip(resources).collect(),
        ))
    }

    async fn load_one(&self, request: &ResourceRequest) -> Result<Resource, LoadError> {
        let locator = request.locator();
        let response = self.transport.fetch(locator).await?;

        // Completion alone is not success: the body is only trusted on 200.
        if response.status != STATUS_OK {
            return Err(LoadError::Status {
                locator: locator.to_string(),
                status: response.status,
            });
        }

        match request.kind() {
            ResourceKind::Text => {
                let text = String::from_utf8(response.body).map_err(|source| LoadError::Utf8 {
                    locator: locator.to_string(),
                    source,
                })?;
                log::info!("{}\n{}", request.basename(), text);
                Ok(Resource::Text(text))
            }
            ResourceKind::Image => {
                let image =
                    DecodedImage::decode(&response.body).map_err(|source| LoadError::Decode {
                        locator: locator.to_string(),
                        source,
                    })?;
                log::debug!(
                    "decoded {} ({}x{})",
                    request.basename(),
                    image.width(),
                    image.height()
                );
                Ok(Resource::Image(image))
            }
        }
    }
}

/// Encodes a solid RGBA image as PNG bytes.
#[cfg(test)]
pub(crate) fn encode_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}
