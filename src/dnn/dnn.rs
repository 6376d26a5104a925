use crate::classifier::{Classifier, LossGradient};
use crate::dnn::{Layer, Operation};
use crate::error::{PgdError, Result};
use crate::loss::{cross_entropy, cross_entropy_grad};
use crate::PgdFloat;
use log::{debug, trace};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Serialized form of a network: just its layers, in order
#[derive(Clone, Debug, Deserialize, Serialize)]
struct Sequential {
    layers: Vec<Layer>,
}

/// A frozen feed-forward network, run in evaluation mode.
///
/// Supports the forward pass and the gradient of a loss with respect to the
/// network input. Deserialization validates the layer chain, so a corrupt
/// weights file is rejected when it is loaded rather than on first use.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(try_from = "Sequential", into = "Sequential")]
pub struct DNN {
    layers: Vec<Layer>,
    input_dims: usize,
    output_dims: usize,
}

impl DNN {
    /// # Errors
    /// If a layer is malformed or consecutive layers disagree on their sizes
    pub fn new(layers: Vec<Layer>) -> Result<Self> {
        let input_dims = layers
            .iter()
            .find_map(Operation::input_dims)
            .ok_or_else(|| PgdError::InvalidNetwork("cannot infer the input size".to_string()))?;
        let mut dims = input_dims;
        for (idx, layer) in layers.iter().enumerate() {
            layer.validate()?;
            if let Some(expected) = layer.input_dims() {
                if expected != dims {
                    return Err(PgdError::InvalidNetwork(format!(
                        "layer {} ({}) expects {} inputs but receives {}",
                        idx, layer, expected, dims
                    )));
                }
            }
            dims = layer.output_dims(dims);
        }
        if dims == 0 {
            return Err(PgdError::InvalidNetwork("network has no outputs".to_string()));
        }
        Ok(Self {
            layers,
            input_dims,
            output_dims: dims,
        })
    }

    /// Reads a network serialized as JSON
    ///
    /// # Errors
    /// If the file cannot be read, is not valid JSON, or describes an invalid network
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PgdError::io(path, e))?;
        let dnn: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| PgdError::json(path, e))?;
        debug!("Loaded network from {}: {}", path.display(), dnn);
        Ok(dnn)
    }

    /// # Errors
    /// If the file cannot be written
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| PgdError::io(path, e))?;
        serde_json::to_writer(BufWriter::new(file), self).map_err(|e| PgdError::json(path, e))
    }

    pub const fn output_dims(&self) -> usize {
        self.output_dims
    }

    /// # Errors
    /// If the input has the wrong length
    pub fn forward1(&self, input: &ArrayView1<PgdFloat>) -> Result<Array1<PgdFloat>> {
        self.check_input(input)?;
        Ok(self
            .layers
            .iter()
            .fold(input.to_owned(), |x, layer| layer.forward1(&x.view())))
    }

    /// The input of every layer followed by the network output.
    ///
    /// The returned activations are the only state a backward pass needs, and
    /// they live only as long as the caller holds them.
    fn activations(&self, input: &ArrayView1<PgdFloat>) -> Vec<Array1<PgdFloat>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.to_owned());
        for layer in &self.layers {
            let next = layer.forward1(&activations[activations.len() - 1].view());
            activations.push(next);
        }
        activations
    }

    /// Pulls `grad_output` back through every layer to the network input
    fn backward(
        &self,
        activations: &[Array1<PgdFloat>],
        grad_output: Array1<PgdFloat>,
    ) -> Array1<PgdFloat> {
        self.layers
            .iter()
            .zip(activations)
            .rev()
            .fold(grad_output, |grad, (layer, input)| {
                trace!("backward through {}", layer);
                layer.backward1(&input.view(), &grad.view())
            })
    }

    /// Gradient of `<grad_output, f(input)>` with respect to `input`
    ///
    /// # Errors
    /// If either vector has the wrong length
    pub fn input_gradient(
        &self,
        input: &ArrayView1<PgdFloat>,
        grad_output: &ArrayView1<PgdFloat>,
    ) -> Result<Array1<PgdFloat>> {
        self.check_input(input)?;
        if grad_output.len() != self.output_dims {
            return Err(PgdError::ShapeMismatch {
                context: "output gradient",
                expected: self.output_dims,
                actual: grad_output.len(),
            });
        }
        let activations = self.activations(input);
        Ok(self.backward(&activations, grad_output.to_owned()))
    }
}

impl Classifier for DNN {
    fn input_dims(&self) -> usize {
        self.input_dims
    }

    fn num_classes(&self) -> usize {
        self.output_dims
    }

    fn forward(&self, input: &ArrayView1<PgdFloat>) -> Result<Array1<PgdFloat>> {
        self.forward1(input)
    }

    fn loss_gradient(&self, input: &ArrayView1<PgdFloat>, label: usize) -> Result<LossGradient> {
        self.check_input(input)?;
        self.check_label(label)?;
        let activations = self.activations(input);
        let scores = activations[activations.len() - 1].clone();
        let loss = cross_entropy(&scores.view(), label);
        let gradient = self.backward(&activations, cross_entropy_grad(&scores.view(), label));
        Ok(LossGradient {
            loss,
            scores,
            gradient,
        })
    }
}

impl TryFrom<Sequential> for DNN {
    type Error = PgdError;

    fn try_from(seq: Sequential) -> Result<Self> {
        Self::new(seq.layers)
    }
}

impl From<DNN> for Sequential {
    fn from(dnn: DNN) -> Self {
        Self { layers: dnn.layers }
    }
}

impl fmt::Display for DNN {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let layers: Vec<String> = self.layers.iter().map(|x| format!("{}", x)).collect();
        write!(f, "Input {} => {}", self.input_dims, layers.join(" => "))
    }
}
