//! Reader for the IDX format MNIST is distributed in.
//!
//! A file is two zero bytes, a type code, the number of dimensions, one
//! big-endian `u32` per dimension and then the data in row-major order. Only
//! unsigned byte data (type `0x08`) is supported.
use super::{InMemoryDataset, Sample};
use crate::error::{PgdError, Result};
use crate::tensorshape::TensorShape;
use crate::PgdFloat;
use log::debug;
use ndarray::Array1;
use std::fs;
use std::path::Path;

const UNSIGNED_BYTE: u8 = 0x08;

/// Dimensions and raw bytes of an IDX file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdxArray {
    pub dims: Vec<usize>,
    pub data: Vec<u8>,
}

/// # Errors
/// If the header is malformed, the type is not unsigned byte, or the data
/// length does not match the header's dimensions
pub fn parse_idx(bytes: &[u8]) -> Result<IdxArray> {
    if bytes.len() < 4 {
        return Err(PgdError::MalformedIdx(format!(
            "header truncated at {} bytes",
            bytes.len()
        )));
    }
    if bytes[0] != 0 || bytes[1] != 0 {
        return Err(PgdError::MalformedIdx(format!(
            "bad magic {:02x}{:02x}",
            bytes[0], bytes[1]
        )));
    }
    if bytes[2] != UNSIGNED_BYTE {
        return Err(PgdError::MalformedIdx(format!(
            "unsupported data type 0x{:02x}",
            bytes[2]
        )));
    }
    let ndims = bytes[3] as usize;
    let header_len = 4 + 4 * ndims;
    if bytes.len() < header_len {
        return Err(PgdError::MalformedIdx(format!(
            "expected {} dimensions but header is {} bytes",
            ndims,
            bytes.len()
        )));
    }
    let dims: Vec<usize> = bytes[4..header_len]
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]) as usize)
        .collect();
    let expected = dims
        .iter()
        .try_fold(1_usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| PgdError::MalformedIdx(format!("dimensions {:?} overflow", dims)))?;
    let data = &bytes[header_len..];
    if data.len() != expected {
        return Err(PgdError::MalformedIdx(format!(
            "dimensions {:?} need {} bytes of data, found {}",
            dims,
            expected,
            data.len()
        )));
    }
    Ok(IdxArray {
        dims,
        data: data.to_vec(),
    })
}

/// # Errors
/// If the file cannot be read or fails [`parse_idx`]
pub fn read_idx<P: AsRef<Path>>(path: P) -> Result<IdxArray> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| PgdError::io(path, e))?;
    let arr = parse_idx(&bytes)?;
    debug!("Read IDX {} with dims {:?}", path.display(), arr.dims);
    Ok(arr)
}

/// Builds a dataset from parsed image (`[n, rows, cols]`) and label (`[n]`) arrays,
/// scaling pixels to `[0, 1]`.
///
/// # Errors
/// If the arrays have the wrong rank or disagree on the sample count
pub fn mnist_from_idx(
    images: &IdxArray,
    labels: &IdxArray,
    limit: Option<usize>,
) -> Result<InMemoryDataset> {
    let (n, rows, cols) = match images.dims[..] {
        [n, rows, cols] => (n, rows, cols),
        _ => {
            return Err(PgdError::MalformedIdx(format!(
                "image file must have 3 dimensions, found {:?}",
                images.dims
            )))
        }
    };
    if labels.dims.len() != 1 {
        return Err(PgdError::MalformedIdx(format!(
            "label file must have 1 dimension, found {:?}",
            labels.dims
        )));
    }
    if labels.dims[0] != n {
        return Err(PgdError::MalformedIdx(format!(
            "{} images but {} labels",
            n, labels.dims[0]
        )));
    }
    let pixels = rows * cols;
    let take = limit.map_or(n, |l| l.min(n));
    let samples = images
        .data
        .chunks_exact(pixels.max(1))
        .zip(labels.data.iter())
        .take(take)
        .map(|(img, &label)| {
            Sample::new(
                img.iter().map(|&p| PgdFloat::from(p) / 255.).collect::<Array1<_>>(),
                label as usize,
            )
        })
        .collect();
    InMemoryDataset::new(TensorShape::image(rows, cols, 1), samples)
}

/// Loads an MNIST image/label file pair, keeping at most `limit` samples
///
/// # Errors
/// If either file is unreadable or malformed, or their counts disagree
pub fn load_mnist<P: AsRef<Path>, Q: AsRef<Path>>(
    images_path: P,
    labels_path: Q,
    limit: Option<usize>,
) -> Result<InMemoryDataset> {
    let images = read_idx(images_path)?;
    let labels = read_idx(labels_path)?;
    mnist_from_idx(&images, &labels, limit)
}
