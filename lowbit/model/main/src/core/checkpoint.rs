//! Memory-mapped SafeTensors checkpoints, possibly sharded over several files.

use crate::api::error::{ModelError, ModelResult};
use memmap2::{Mmap, MmapOptions};
use safetensors::{Dtype, SafeTensors};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Borrowed bytes of one tensor inside a mapped file.
pub struct RawTensor<'a> {
    pub dtype: Dtype,
    pub shape: Vec<usize>,
    pub data: &'a [u8],
}

/// A set of mapped SafeTensors files with a name -> file index.
pub struct Checkpoint {
    files: Vec<(PathBuf, Mmap)>,
    index: HashMap<String, usize>,
}

impl Checkpoint {
    pub fn open(paths: &[PathBuf]) -> ModelResult<Self> {
        let mut files = Vec::with_capacity(paths.len());
        let mut index = HashMap::new();

        for (file_idx, path) in paths.iter().enumerate() {
            let file = File::open(path)?;
            // SAFETY: The file is opened read-only and the map lives as long as
            // the Checkpoint. Weight files are read-only assets; the contract is
            // that no other process truncates them while mapped.
            let mmap = unsafe { MmapOptions::new().map(&file)? };
            {
                let st = SafeTensors::deserialize(&mmap[..])?;
                for name in st.names() {
                    index.insert(name.to_string(), file_idx);
                }
            }
            log::debug!("mapped {} ({} bytes)", path.display(), mmap.len());
            files.push((path.clone(), mmap));
        }

        Ok(Self { files, index })
    }

    pub fn open_file(path: &Path) -> ModelResult<Self> {
        Self::open(&[path.to_path_buf()])
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Raw dtype, shape and bytes of a tensor.
    pub fn raw(&self, name: &str) -> ModelResult<RawTensor<'_>> {
        let file_idx = *self
            .index
            .get(name)
            .ok_or_else(|| ModelError::MissingTensor(name.to_string()))?;
        let (_, mmap) = &self.files[file_idx];
        let st = SafeTensors::deserialize(&mmap[..])?;
        let view = st.tensor(name)?;
        Ok(RawTensor {
            dtype: view.dtype(),
            shape: view.shape().to_vec(),
            data: view.data(),
        })
    }

    /// Tensor converted to f32, checked against `expected` shape.
    pub fn tensor_f32(&self, name: &str, expected: &[usize]) -> ModelResult<Vec<f32>> {
        let raw = self.raw(name)?;
        if raw.shape != expected {
            return Err(ModelError::ShapeMismatch {
                name: name.to_string(),
                expected: expected.to_vec(),
                actual: raw.shape,
            });
        }
        bytes_to_f32(name, raw.dtype, raw.data)
    }
}

/// Decode little-endian F32, F16 or BF16 bytes to f32.
pub fn bytes_to_f32(name: &str, dtype: Dtype, bytes: &[u8]) -> ModelResult<Vec<f32>> {
    match dtype {
        Dtype::F32 => Ok(bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()),
        Dtype::F16 => Ok(bytes
            .chunks_exact(2)
            .map(|c| half::f16::from_le_bytes([c[0], c[1]]).to_f32())
            .collect()),
        Dtype::BF16 => Ok(bytes
            .chunks_exact(2)
            .map(|c| half::bf16::from_le_bytes([c[0], c[1]]).to_f32())
            .collect()),
        other => Err(ModelError::Unsupported(format!(
            "dtype {:?} for tensor {}",
            other, name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safetensors::tensor::TensorView;

    fn write_file(path: &Path, tensors: &[(&str, Dtype, Vec<usize>, Vec<u8>)]) {
        let views: Vec<(&str, TensorView)> = tensors
            .iter()
            .map(|(n, d, s, b)| (*n, TensorView::new(*d, s.clone(), b).unwrap()))
            .collect();
        let refs: Vec<(&str, &TensorView)> = views.iter().map(|(n, v)| (*n, v)).collect();
        safetensors::serialize_to_file(refs, &None, path).unwrap();
    }

    #[test]
    fn test_sharded_lookup_and_dtypes() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.safetensors");
        let b = dir.path().join("b.safetensors");

        let f32_bytes: Vec<u8> = [1.0f32, -2.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        let bf16_bytes: Vec<u8> = [0.5f32, 4.0]
            .iter()
            .flat_map(|&v| half::bf16::from_f32(v).to_le_bytes())
            .collect();
        write_file(&a, &[("x", Dtype::F32, vec![2], f32_bytes)]);
        write_file(&b, &[("y", Dtype::BF16, vec![1, 2], bf16_bytes)]);

        let ckpt = Checkpoint::open(&[a, b]).unwrap();
        assert_eq!(ckpt.len(), 2);
        assert_eq!(ckpt.tensor_f32("x", &[2]).unwrap(), vec![1.0, -2.0]);
        assert_eq!(ckpt.tensor_f32("y", &[1, 2]).unwrap(), vec![0.5, 4.0]);
    }

    #[test]
    fn test_shape_and_missing_errors() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.safetensors");
        let bytes: Vec<u8> = [0.0f32; 4].iter().flat_map(|v| v.to_le_bytes()).collect();
        write_file(&a, &[("w", Dtype::F32, vec![2, 2], bytes)]);

        let ckpt = Checkpoint::open_file(&a).unwrap();
        assert!(matches!(
            ckpt.tensor_f32("w", &[4]),
            Err(ModelError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            ckpt.tensor_f32("missing", &[1]),
            Err(ModelError::MissingTensor(_))
        ));
    }
}
