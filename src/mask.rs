//! The mask returned by the segmentation service.
//!
//! A [`MaskResource`] owns the response bytes and, in the browser, the object
//! URL that the download link and preview point at. The URL is revoked when the
//! resource is released, either explicitly or on drop.

use image::ImageFormat;

/// A mask image received from the backend.
#[derive(Debug)]
pub struct MaskResource {
    bytes: Vec<u8>,
    format: Option<ImageFormat>,
    file_name: String,
    #[cfg(target_arch = "wasm32")]
    object_url: Option<String>,
    released: bool,
}

impl MaskResource {
    /// Wrap response bytes. `base_name` gets the extension of the detected format.
    pub fn new(bytes: Vec<u8>, base_name: &str) -> Self {
        let format = image::guess_format(&bytes).ok();
        let extension = format
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or("png");
        Self {
            bytes,
            format,
            file_name: format!("{}.{}", base_name, extension),
            #[cfg(target_arch = "wasm32")]
            object_url: None,
            released: false,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    /// Suggested download file name, e.g. `mask.png`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &'static str {
        self.format
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream")
    }

    /// Dimensions of the mask, if its header can be read.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let format = self.format?;
        image::ImageReader::with_format(std::io::Cursor::new(self.bytes.as_slice()), format)
            .into_dimensions()
            .ok()
    }

    #[cfg(test)]
    fn is_released(&self) -> bool {
        self.released
    }

    /// Write the mask to disk.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self, path: &std::path::Path) -> std::io::Result<()> {
        std::fs::write(path, &self.bytes)?;
        log::info!("Saved mask ({} bytes) to {:?}", self.bytes.len(), path);
        Ok(())
    }

    /// Object URL for display and download, created on first use.
    #[cfg(target_arch = "wasm32")]
    pub fn object_url(&mut self) -> Result<&str, wasm_bindgen::JsValue> {
        if self.object_url.is_none() {
            let array = js_sys::Uint8Array::from(self.bytes.as_slice());
            let parts = js_sys::Array::of1(&array);
            let options = web_sys::BlobPropertyBag::new();
            options.set_type(self.mime_type());
            let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
            let url = web_sys::Url::create_object_url_with_blob(&blob)?;
            log::debug!("Created object URL {}", url);
            self.object_url = Some(url);
            self.released = false;
        }
        Ok(self.object_url.as_deref().unwrap_or_default())
    }

    /// Release platform resources held for this mask. Safe to call repeatedly.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        #[cfg(target_arch = "wasm32")]
        {
            if let Some(url) = self.object_url.take() {
                if let Err(e) = web_sys::Url::revoke_object_url(&url) {
                    log::warn!("Failed to revoke object URL {}: {:?}", url, e);
                }
            }
        }
        self.released = true;
        log::debug!("Released mask '{}'", self.file_name);
    }
}

impl Drop for MaskResource {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_source::tests::png_bytes;

    #[test]
    fn test_png_mask_metadata() {
        let mask = MaskResource::new(png_bytes(8, 4), "mask");
        assert_eq!(mask.format(), Some(ImageFormat::Png));
        assert_eq!(mask.file_name(), "mask.png");
        assert_eq!(mask.mime_type(), "image/png");
        assert_eq!(mask.dimensions(), Some((8, 4)));
    }

    #[test]
    fn test_unknown_bytes_default_to_png_name() {
        let mask = MaskResource::new(vec![1, 2, 3], "result");
        assert_eq!(mask.format(), None);
        assert_eq!(mask.file_name(), "result.png");
        assert_eq!(mask.mime_type(), "application/octet-stream");
        assert_eq!(mask.dimensions(), None);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut mask = MaskResource::new(png_bytes(2, 2), "mask");
        assert!(!mask.is_released());
        mask.release();
        assert!(mask.is_released());
        mask.release();
        assert!(mask.is_released());
    }
}
