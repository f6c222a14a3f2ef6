//! The user's image: original file bytes plus natural and display sizes.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{ImageFormat, ImageReader, RgbaImage};

use crate::error::LoadError;
use crate::geometry::{ScaleFactor, Size};

/// A file picked by the user, not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// File name as supplied by the picker or path
    pub name: String,
    /// Raw file contents, uploaded unchanged
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read an image file from disk.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn read(path: &std::path::Path) -> Result<Self, LoadError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self { name, bytes })
    }
}

/// How a loaded image is placed on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Width of the viewport the image is shown in
    pub viewport_width: u32,
    /// Space kept free beside the image
    pub viewport_margin: u32,
    /// Files larger than this are refused
    pub max_upload_bytes: u64,
}

/// A decoded image ready for selection.
///
/// Natural size is fixed at load time. The display size is chosen once from
/// the viewport width and kept for the rest of the session.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    file: ImageFile,
    format: Option<ImageFormat>,
    natural: Size,
    display: Size,
    /// Bitmap resampled to the display size, used for drawing.
    preview: RgbaImage,
}

impl LoadedImage {
    /// Decode `file` and fit it into the viewport.
    pub fn decode(file: ImageFile, options: &LoadOptions) -> Result<Self, LoadError> {
        let size = file.bytes.len() as u64;
        if size > options.max_upload_bytes {
            return Err(LoadError::TooLarge {
                name: file.name,
                size,
                limit: options.max_upload_bytes,
            });
        }

        let reader = ImageReader::new(Cursor::new(file.bytes.as_slice()))
            .with_guessed_format()
            .map_err(|e| LoadError::decode(&file.name, e))?;
        let format = reader.format();
        let decoded = reader
            .decode()
            .map_err(|e| LoadError::decode(&file.name, e))?;

        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(LoadError::decode(&file.name, "image has no pixels"));
        }

        let natural = Size::new(decoded.width(), decoded.height());
        let available = options
            .viewport_width
            .saturating_sub(options.viewport_margin);
        let display = natural.fit_to_width(available);

        let rgba = decoded.to_rgba8();
        let preview = if display == natural {
            rgba
        } else {
            image::imageops::resize(&rgba, display.width, display.height, FilterType::Triangle)
        };

        log::info!(
            "Loaded '{}' ({:?}): natural {}x{}, display {}x{}",
            file.name,
            format,
            natural.width,
            natural.height,
            display.width,
            display.height
        );

        Ok(Self {
            file,
            format,
            natural,
            display,
            preview,
        })
    }

    /// The original file, as it will be uploaded.
    pub fn file(&self) -> &ImageFile {
        &self.file
    }

    /// Detected container format, if any.
    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    /// MIME type for the upload part.
    pub fn mime_type(&self) -> &'static str {
        self.format
            .map(|f| f.to_mime_type())
            .unwrap_or("application/octet-stream")
    }

    /// Original pixel dimensions.
    pub fn natural(&self) -> Size {
        self.natural
    }

    /// On-screen dimensions.
    pub fn display(&self) -> Size {
        self.display
    }

    /// Current natural/display ratio. Computed on every call.
    pub fn scale_factor(&self) -> ScaleFactor {
        ScaleFactor::between(self.natural, self.display)
    }

    /// The bitmap resampled to display size.
    pub fn preview(&self) -> &RgbaImage {
        &self.preview
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    /// Encode a solid test image as PNG bytes.
    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([40, 80, 120, 255]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .expect("encode png");
        out
    }

    pub(crate) fn options(viewport_width: u32) -> LoadOptions {
        LoadOptions {
            viewport_width,
            viewport_margin: 32,
            max_upload_bytes: 1024 * 1024,
        }
    }

    #[test]
    fn test_decode_fits_viewport() {
        let file = ImageFile::new("wide.png", png_bytes(1000, 500));
        let img = LoadedImage::decode(file, &options(532)).unwrap();

        assert_eq!(img.natural(), Size::new(1000, 500));
        assert_eq!(img.display(), Size::new(500, 250));
        assert_eq!(img.preview().dimensions(), (500, 250));
        assert_eq!(img.format(), Some(ImageFormat::Png));
        assert_eq!(img.mime_type(), "image/png");
    }

    #[test]
    fn test_small_image_keeps_natural_size() {
        let file = ImageFile::new("small.png", png_bytes(40, 30));
        let img = LoadedImage::decode(file, &options(800)).unwrap();
        assert_eq!(img.display(), Size::new(40, 30));
        let s = img.scale_factor();
        assert_eq!((s.x, s.y), (1.0, 1.0));
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        let file = ImageFile::new("notes.txt", b"definitely not an image".to_vec());
        let err = LoadedImage::decode(file, &options(800)).unwrap_err();
        assert!(matches!(err, LoadError::Decode { ref name, .. } if name == "notes.txt"));
    }

    #[test]
    fn test_oversized_file_rejected() {
        let file = ImageFile::new("big.png", png_bytes(64, 64));
        let mut opts = options(800);
        opts.max_upload_bytes = 16;
        let err = LoadedImage::decode(file, &opts).unwrap_err();
        assert!(matches!(err, LoadError::TooLarge { limit: 16, .. }));
    }
}
