// ============================================================================
// CLIPBOARD INGESTION — paste an image from the OS clipboard (via arboard)
// ============================================================================

use std::path::Path;

use crate::error::{RedactError, Result};
use crate::io::{DecodedImage, load_image_file};

/// Convert arboard's RGBA image data. `None` if the byte count does not
/// match the reported size.
pub fn decoded_from_image_data(data: arboard::ImageData<'_>) -> Option<DecodedImage> {
    let width = u32::try_from(data.width).ok()?;
    let height = u32::try_from(data.height).ok()?;
    let rgba = data.bytes.into_owned();
    if width == 0 || height == 0 || rgba.len() != width as usize * height as usize * 4 {
        return None;
    }
    Some(DecodedImage { width, height, rgba })
}

/// Try to read an image from the system clipboard. `Ok(None)` when nothing
/// usable is there. Handles two cases:
///   1. Raw image data (screenshots, images copied from other programs).
///   2. Clipboard text that is the path of an image file.
pub fn get_from_system_clipboard() -> Result<Option<DecodedImage>> {
    let mut clip = match arboard::Clipboard::new() {
        Ok(c) => c,
        Err(e) => {
            log::warn!("Clipboard unavailable: {}", e);
            return Ok(None);
        }
    };

    if let Ok(img_data) = clip.get_image() {
        if let Some(decoded) = decoded_from_image_data(img_data) {
            return Ok(Some(decoded));
        }
    }

    if let Ok(text) = clip.get_text() {
        let path = Path::new(text.trim());
        if path.is_file() {
            return match load_image_file(path) {
                Ok(decoded) => Ok(Some(decoded)),
                // Pasting the path of some other file is not an image paste
                Err(RedactError::InputRejected(_)) => Ok(None),
                Err(e) => Err(e),
            };
        }
    }

    Ok(None)
}
