//! Binary payloads exchanged with the products backend.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use shopfront_core::types::product::DEFAULT_IMAGE_TYPE;

/// Image bytes returned by `GET /product/{id}/image`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ProductImage {
    /// Wrap raw bytes, defaulting the content type to JPEG.
    #[must_use]
    pub fn new(content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_IMAGE_TYPE)
            .to_string();
        Self {
            content_type,
            bytes,
        }
    }

    /// Normalize to a `data:` URI suitable for an `<img src>`.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            BASE64.encode(&self.bytes)
        )
    }
}

/// An image file uploaded through the admin form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Build an upload, guessing the MIME type from the file extension when
    /// the browser did not send one.
    #[must_use]
    pub fn new(file_name: impl Into<String>, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type
            .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
            .map_or_else(|| guess_image_mime(&file_name).to_string(), str::to_string);
        Self {
            file_name,
            content_type,
            bytes,
        }
    }
}

/// MIME type for common image extensions.
#[must_use]
pub fn guess_image_mime(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        _ => DEFAULT_IMAGE_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri() {
        let image = ProductImage::new(Some("image/png"), b"hi".to_vec());
        assert_eq!(image.to_data_uri(), "data:image/png;base64,aGk=");
    }

    #[test]
    fn test_data_uri_defaults_to_jpeg() {
        let image = ProductImage::new(None, vec![0xff]);
        assert_eq!(image.to_data_uri(), "data:image/jpeg;base64,/w==");
        let image = ProductImage::new(Some("  "), vec![0xff]);
        assert_eq!(image.content_type, "image/jpeg");
    }

    #[test]
    fn test_upload_guesses_mime() {
        let upload = ImageUpload::new("photo.PNG", None, vec![1]);
        assert_eq!(upload.content_type, "image/png");
        let upload = ImageUpload::new("photo.webp", Some("application/octet-stream"), vec![1]);
        assert_eq!(upload.content_type, "image/webp");
        let upload = ImageUpload::new("noext", Some("image/gif"), vec![1]);
        assert_eq!(upload.content_type, "image/gif");
        assert_eq!(guess_image_mime("noext"), "image/jpeg");
    }
}
