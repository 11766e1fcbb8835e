//! Backend ONNX Runtime de la passerelle des modèles

use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use std::sync::Mutex;

use super::{ImageModel, ImageTensor, ModelError};

/// Marqueurs des erreurs d'allocation renvoyées par le runtime
const EXHAUSTION_MARKERS: [&str; 3] = ["out of memory", "failed to allocate", "bad_alloc"];

/// Session ONNX chargée depuis un fichier `.onnx`.
///
/// `Session::run` demande `&mut self`, d'où le `Mutex`.
pub struct OnnxModel {
    session: Mutex<Session>,
}

impl OnnxModel {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let session = Session::builder()
            .map_err(|e: ort::Error| ModelError::Runtime(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e: ort::Error| ModelError::Runtime(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e: ort::Error| ModelError::Runtime(format!("ONNX load failed: {e}")))?;

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl ImageModel for OnnxModel {
    fn infer(&self, input: &ImageTensor) -> Result<ImageTensor, ModelError> {
        let tensor = TensorRef::from_array_view(input).map_err(|e| classify_error(&e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::Runtime("Session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| classify_error(&format!("ONNX inference failed: {e}")))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::Runtime(format!("Output extraction: {e}")))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        to_nhwc(&dims, data.to_vec())
    }
}

/// Les sorties de rang 4 sont gardées telles quelles; un score scalaire ou
/// un vecteur `[1, n]` devient `[1, 1, 1, n]`.
fn to_nhwc(dims: &[usize], data: Vec<f32>) -> Result<ImageTensor, ModelError> {
    let shape = match dims {
        [n, h, w, c] => (*n, *h, *w, *c),
        _ => (1, 1, 1, data.len()),
    };
    Array4::from_shape_vec(shape, data)
        .map_err(|e| ModelError::Runtime(format!("Unexpected output shape {dims:?}: {e}")))
}

fn classify_error(message: &str) -> ModelError {
    let lowered = message.to_lowercase();
    if EXHAUSTION_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        ModelError::ResourceExhausted(message.to_string())
    } else {
        ModelError::Runtime(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_failures_are_exhaustion() {
        assert!(matches!(
            classify_error("Failed to allocate memory for requested buffer of size 1073741824"),
            ModelError::ResourceExhausted(_)
        ));
        assert!(matches!(
            classify_error("CUDA error: out of memory"),
            ModelError::ResourceExhausted(_)
        ));
        assert!(matches!(
            classify_error("Invalid input name: x"),
            ModelError::Runtime(_)
        ));
    }

    #[test]
    fn test_scalar_output_is_reshaped() {
        let tensor = to_nhwc(&[1, 1], vec![0.8]).unwrap();
        assert_eq!(tensor.shape(), &[1, 1, 1, 1]);
        assert_eq!(tensor[[0, 0, 0, 0]], 0.8);
    }

    #[test]
    fn test_missing_file_fails_to_load() {
        assert!(OnnxModel::load(Path::new("/nonexistent/model.onnx")).is_err());
    }
}
