//! Page image → base64 PNG `ImageData` for the vision model.
//!
//! PNG keeps glyph edges crisp; JPEG artefacts around small print are a
//! common cause of misread digits in dates of birth.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rendered page as a high-detail base64 PNG attachment.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded {}x{} page → {} bytes base64", img.width(), img.height(), b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, GrayImage};

    #[test]
    fn encodes_grayscale_scan() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 60, Luma([250])));
        let data = encode_page(&img).expect("encode should succeed");
        assert_eq!(data.mime_type, "image/png");
        let png = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(&png[1..4], b"PNG");
    }
}
