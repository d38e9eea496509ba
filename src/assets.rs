// Image loading for <image> elements and feImage primitives

use crate::error::{RenderError, Result};
use data_url::DataUrl;
use skia_safe::{Data, Image};

/// Loads raster images referenced by `href`
pub trait AssetLoader {
    fn load_image(&self, href: &str) -> Result<Image>;
}

/// Loader for `data:` URLs and local file paths. Remote URLs are not fetched.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalAssetLoader;

impl AssetLoader for LocalAssetLoader {
    fn load_image(&self, href: &str) -> Result<Image> {
        let bytes = if href.starts_with("data:") {
            decode_data_url(href)?
        } else {
            let path = href.strip_prefix("file://").unwrap_or(href);
            std::fs::read(path).map_err(|source| RenderError::FileRead {
                path: path.to_string(),
                source,
            })?
        };
        decode_image(&bytes)
    }
}

/// Decode the payload of a `data:` URL (base64 or percent-encoded)
pub fn decode_data_url(href: &str) -> Result<Vec<u8>> {
    let url = DataUrl::process(href).map_err(|e| RenderError::InvalidDataUrl(format!("{e:?}")))?;
    let (body, _fragment) = url
        .decode_to_vec()
        .map_err(|e| RenderError::InvalidDataUrl(format!("{e:?}")))?;
    Ok(body)
}

fn decode_image(bytes: &[u8]) -> Result<Image> {
    Image::from_encoded(Data::new_copy(bytes))
        .ok_or_else(|| RenderError::ImageDecode(format!("{} bytes of unrecognized data", bytes.len())))
}
