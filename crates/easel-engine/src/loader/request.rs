/// Kind of payload a request resolves to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    /// UTF-8 text (shader source).
    Text,
    /// Encoded image, decoded to RGBA8 on arrival.
    Image,
}

/// One resource to fetch. Immutable once built.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ResourceRequest {
    kind: ResourceKind,
    locator: String,
}

impl ResourceRequest {
    pub fn text(locator: impl Into<String>) -> Self {
        Self { kind: ResourceKind::Text, locator: locator.into() }
    }

    pub fn image(locator: impl Into<String>) -> Self {
        Self { kind: ResourceKind::Image, locator: locator.into() }
    }

    #[inline]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    #[inline]
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Last path segment of the locator.
    pub fn basename(&self) -> &str {
        self.locator.rsplit('/').next().unwrap_or(&self.locator)
    }
}

/// Decoded image in tightly packed, non-premultiplied RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecodedImage {
    /// Wraps raw RGBA8 pixels. The caller guarantees `pixels.len() == w * h * 4`;
    /// texture creation re-checks it.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self { width, height, pixels }
    }

    /// Decodes any format enabled on the `image` crate into RGBA8.
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self { width, height, pixels: rgba.into_raw() })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// Resolved payload of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Text(String),
    Image(DecodedImage),
}

/// Complete set of resolved resources, in request order.
///
/// Only built once every request has resolved.
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    entries: Vec<(ResourceRequest, Resource)>,
}

impl ResourceSet {
    pub(crate) fn new(entries: Vec<(ResourceRequest, Resource)>) -> Self {
        Self { entries }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, request: &ResourceRequest) -> Option<&Resource> {
        self.entries
            .iter()
            .find(|(r, _)| r == request)
            .map(|(_, resource)| resource)
    }

    pub fn text(&self, locator: &str) -> Option<&str> {
        match self.get(&ResourceRequest::text(locator))? {
            Resource::Text(text) => Some(text),
            Resource::Image(_) => None,
        }
    }

    pub fn image(&self, locator: &str) -> Option<&DecodedImage> {
        match self.get(&ResourceRequest::image(locator))? {
            Resource::Image(image) => Some(image),
            Resource::Text(_) => None,
        }
    }

    /// Images in request order.
    pub fn images(&self) -> impl Iterator<Item = &DecodedImage> {
        self.entries.iter().filter_map(|(_, resource)| match resource {
            Resource::Image(image) => Some(image),
            Resource::Text(_) => None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceRequest, &Resource)> {
        self.entries.iter().map(|(r, resource)| (r, resource))
    }
}
