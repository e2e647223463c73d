//! TorchScript policy/value network via `tch`.
//!
//! The module is expected to take a `[batch, planes, size, size]` float tensor and return
//! a `(policy_logits [batch, squares + 1], value [batch] or [batch, 1])` tuple.

use std::path::Path;
use std::sync::Mutex;

use tch::{CModule, Device, IValue, Kind, Tensor};

use crate::neural::evaluator::{Evaluation, Evaluator, EvaluatorError};
use crate::neural::features::BoardTensor;

/// `CModule` is not `Sync`; inference is serialized behind a mutex.
pub struct TchEvaluator {
    module: Mutex<CModule>,
    device: Device,
}

impl TchEvaluator {
    pub fn load(path: impl AsRef<Path>, device: Device) -> Result<Self, EvaluatorError> {
        let path = path.as_ref();
        log::info!("🧠 Loading TorchScript model from {} on {:?}", path.display(), device);
        let module = CModule::load_on_device(path, device)
            .map_err(|e| EvaluatorError::Backend(format!("loading {}: {e}", path.display())))?;
        Ok(Self {
            module: Mutex::new(module),
            device,
        })
    }

    fn to_input(&self, batch: &[BoardTensor]) -> Tensor {
        let first = &batch[0];
        let mut flat = Vec::with_capacity(batch.len() * first.data.len());
        for t in batch {
            flat.extend_from_slice(&t.data);
        }
        Tensor::from_slice(&flat)
            .view([
                batch.len() as i64,
                first.planes as i64,
                first.size as i64,
                first.size as i64,
            ])
            .to_device(self.device)
    }
}

fn backend(e: tch::TchError) -> EvaluatorError {
    EvaluatorError::Backend(e.to_string())
}

impl Evaluator for TchEvaluator {
    fn evaluate_batch(&self, batch: &[BoardTensor]) -> Result<Vec<Evaluation>, EvaluatorError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let input = self.to_input(batch);
        let output = {
            let module = self
                .module
                .lock()
                .map_err(|_| EvaluatorError::Backend("model mutex poisoned".to_string()))?;
            tch::no_grad(|| module.forward_is(&[IValue::Tensor(input)])).map_err(backend)?
        };

        let (logits, values) = match output {
            IValue::Tuple(mut items) if items.len() == 2 => {
                let v = items.pop();
                let p = items.pop();
                match (p, v) {
                    (Some(IValue::Tensor(p)), Some(IValue::Tensor(v))) => (p, v),
                    _ => {
                        return Err(EvaluatorError::Backend(
                            "model output is not a (policy, value) tensor pair".to_string(),
                        ))
                    }
                }
            }
            _ => {
                return Err(EvaluatorError::Backend(
                    "model output is not a 2-tuple".to_string(),
                ))
            }
        };

        let actions = batch[0].size * batch[0].size + 1;
        let probs = logits
            .softmax(-1, Kind::Float)
            .to_device(Device::Cpu)
            .reshape([-1]);
        let probs = Vec::<f32>::try_from(&probs).map_err(backend)?;
        let values = values.to_kind(Kind::Float).to_device(Device::Cpu).reshape([-1]);
        let values = Vec::<f32>::try_from(&values).map_err(backend)?;

        if probs.len() != batch.len() * actions {
            return Err(EvaluatorError::PolicyLength {
                index: 0,
                expected: actions,
                got: probs.len() / batch.len().max(1),
            });
        }

        Ok(probs
            .chunks(actions)
            .zip(values)
            .map(|(p, v)| Evaluation {
                move_probs: p.to_vec(),
                value: v,
            })
            .collect())
    }
}
