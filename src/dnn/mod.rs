//! Frozen sequential networks supporting inference and input gradients.
pub mod conv;
pub mod dense;
pub mod dnn;
pub mod dropout;
pub mod layer;
pub mod log_softmax;
pub mod maxpool;
pub mod relu;

pub use conv::Conv;
pub use dense::Dense;
pub use dnn::DNN;
pub use dropout::Dropout;
pub use layer::{Layer, Operation};
pub use log_softmax::LogSoftmax;
pub use maxpool::MaxPool;
pub use relu::ReLU;
