use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// Shape of a tensor that is stored flattened in row-major order.
///
/// Images use `[height, width, channels]`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct TensorShape {
	dims: Vec<usize>,
}

impl TensorShape {
	pub fn new(dims: Vec<usize>) -> Self {
		Self { dims }
	}

	/// Convenience constructor for `[height, width, channels]` image shapes
	pub fn image(height: usize, width: usize, channels: usize) -> Self {
		Self::new(vec![height, width, channels])
	}

	/// Number of elements in the flattened tensor
	pub fn dims(&self) -> usize {
		self.dims.iter().product()
	}

	/// Interprets the shape as `[height, width, channels]`, treating a rank 2
	/// shape as single channel.
	pub fn as_hwc(&self) -> Option<(usize, usize, usize)> {
		match *self.dims.as_slice() {
			[h, w] => Some((h, w, 1)),
			[h, w, c] => Some((h, w, c)),
			_ => None,
		}
	}
}

impl Index<usize> for TensorShape {
	type Output = usize;

	fn index(&self, idx: usize) -> &usize {
		&self.dims[idx]
	}
}

impl fmt::Display for TensorShape {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let dims: Vec<String> = self.dims.iter().map(ToString::to_string).collect();
		write!(f, "({})", dims.join(", "))
	}
}
