//! Conversion entre les octets envoyés par le client et les tenseurs des modèles.
//!
//! - générateurs: `1×256×256×3`, valeurs dans [-1, 1]
//! - classifieur: `1×150×150×3`, valeurs dans [0, 1]

use image::{imageops::FilterType, DynamicImage, ImageFormat, RgbImage};
use ndarray::Array4;
use std::io::Cursor;
use tokio::task;

use crate::infrastructure::{
    error::{invalid_input, AppError, AppResult},
    models::ImageTensor,
};

pub const GENERATOR_SIZE: u32 = 256;
pub const CLASSIFIER_SIZE: u32 = 150;

/// Décode un PNG ou un JPEG. Tout autre contenu est une entrée invalide.
pub fn decode(bytes: &[u8]) -> AppResult<DynamicImage> {
    if bytes.is_empty() {
        return Err(invalid_input("Uploaded file is empty"));
    }

    let format = image::guess_format(bytes)
        .map_err(|_| invalid_input("Uploaded file is not a recognized image"))?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
        return Err(invalid_input(format!(
            "Unsupported image format {:?}, expected PNG or JPEG",
            format
        )));
    }

    image::load_from_memory_with_format(bytes, format)
        .map_err(|e| invalid_input(format!("Could not decode image: {}", e)))
}

/// Tenseurs d'entrée des modèles, calculés une fois par soumission
#[derive(Debug, Clone)]
pub struct PreparedInputs {
    pub classifier: ImageTensor,
    pub generator: ImageTensor,
}

/// Décode puis redimensionne pour le classifieur et le générateur
pub fn prepare(bytes: &[u8]) -> AppResult<PreparedInputs> {
    let image = decode(bytes)?;
    Ok(PreparedInputs {
        classifier: classifier_input(&image),
        generator: generator_input(&image),
    })
}

/// `prepare` sur le pool bloquant
pub async fn prepare_blocking(bytes: Vec<u8>) -> AppResult<PreparedInputs> {
    task::spawn_blocking(move || prepare(&bytes)).await?
}

/// `tensor_to_png` sur le pool bloquant
pub async fn encode_png_blocking(tensor: ImageTensor) -> AppResult<Vec<u8>> {
    task::spawn_blocking(move || tensor_to_png(&tensor)).await?
}

/// Entrée des générateurs: RGB 256×256 normalisé dans [-1, 1]
pub fn generator_input(image: &DynamicImage) -> ImageTensor {
    to_tensor(image, GENERATOR_SIZE, |v| v as f32 / 127.5 - 1.0)
}

/// Entrée du classifieur: RGB 150×150 normalisé dans [0, 1]
pub fn classifier_input(image: &DynamicImage) -> ImageTensor {
    to_tensor(image, CLASSIFIER_SIZE, |v| v as f32 / 255.0)
}

fn to_tensor(image: &DynamicImage, size: u32, scale: impl Fn(u8) -> f32) -> ImageTensor {
    let rgb = image
        .resize_exact(size, size, FilterType::Triangle)
        .to_rgb8();

    Array4::from_shape_fn((1, size as usize, size as usize, 3), |(_, y, x, c)| {
        scale(rgb.get_pixel(x as u32, y as u32)[c])
    })
}

/// Sortie d'un générateur (`1×H×W×3` dans [-1, 1]) encodée en PNG
pub fn tensor_to_png(tensor: &ImageTensor) -> AppResult<Vec<u8>> {
    let &[batch, height, width, channels] = tensor.shape() else {
        return Err(AppError::Model("Generator output is not rank 4".to_string()));
    };
    if batch != 1 || channels != 3 || height == 0 || width == 0 {
        return Err(AppError::Model(format!(
            "Unexpected generator output shape {:?}",
            tensor.shape()
        )));
    }

    let rgb = RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let pixel = |c: usize| {
            let v = tensor[[0, y as usize, x as usize, c]];
            let v = if v.is_nan() { -1.0 } else { v.clamp(-1.0, 1.0) };
            ((v + 1.0) * 127.5).round() as u8
        };
        image::Rgb([pixel(0), pixel(1), pixel(2)])
    });

    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(rgb)
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| AppError::Internal(format!("PNG encoding failed: {}", e)))?;
    Ok(buffer.into_inner())
}


#[cfg(test)]
mod tests {
    use super::testing::png_bytes;
    use super::*;

    #[test]
    fn test_decode_rejects_non_images() {
        assert!(matches!(decode(b""), Err(AppError::InvalidInput(_))));
        assert!(matches!(decode(b"hello world"), Err(AppError::InvalidInput(_))));
        // en-tête GIF valide mais format non accepté
        assert!(matches!(decode(b"GIF89a\x01\x00\x01\x00"), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_input_tensors_are_normalized() {
        let image = decode(&png_bytes(40, 30, 255)).unwrap();

        let generator = generator_input(&image);
        assert_eq!(generator.shape(), &[1, 256, 256, 3]);
        assert!(generator.iter().all(|v| (*v - 1.0).abs() < 1e-6));

        let classifier = classifier_input(&image);
        assert_eq!(classifier.shape(), &[1, 150, 150, 3]);
        assert!(classifier.iter().all(|v| (*v - 1.0).abs() < 1e-6));

        let black = decode(&png_bytes(8, 8, 0)).unwrap();
        assert!(generator_input(&black).iter().all(|v| (*v + 1.0).abs() < 1e-6));
    }

    #[tokio::test]
    async fn test_prepare_blocking_builds_both_tensors() {
        let inputs = prepare_blocking(png_bytes(20, 10, 0)).await.unwrap();
        assert_eq!(inputs.classifier.shape(), &[1, 150, 150, 3]);
        assert_eq!(inputs.generator.shape(), &[1, 256, 256, 3]);

        let err = prepare_blocking(b"not an image".to_vec()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let png = encode_png_blocking(inputs.generator).await.unwrap();
        assert!(png.starts_with(b"\x89PNG"));
    }

    #[test]
    fn test_tensor_to_png() {
        let tensor = Array4::from_elem((1, 4, 6, 3), 1.0);
        let png = tensor_to_png(&tensor).unwrap();

        let decoded = decode(&png).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (6, 4));
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_bad_output_shape_is_model_error() {
        let tensor = Array4::zeros((1, 4, 4, 1));
        assert!(matches!(tensor_to_png(&tensor), Err(AppError::Model(_))));
    }
}
