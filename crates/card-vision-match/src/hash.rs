use card_vision_core::GrayImage;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig, ImageHash};

/// Perceptual hash of a gray raster, base64 encoded.
///
/// `None` if the raster cannot be converted to an image buffer.
pub fn perceptual_hash(img: &GrayImage) -> Option<String> {
    let luma = img.to_luma()?;
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::DoubleGradient)
        .hash_size(8, 8)
        .to_hasher();

    let hash = hasher.hash_image(&DynamicImage::ImageLuma8(luma));
    Some(hash.to_base64())
}

/// Hamming distance between two encoded hashes; `u32::MAX` if either fails to decode.
pub fn hash_distance(lhs: &str, rhs: &str) -> u32 {
    let Ok(h1) = ImageHash::<Vec<u8>>::from_base64(lhs) else {
        return u32::MAX;
    };
    let Ok(h2) = ImageHash::<Vec<u8>>::from_base64(rhs) else {
        return u32::MAX;
    };
    h1.dist(&h2)
}
