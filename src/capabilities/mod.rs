//! Background-removal capabilities
//!
//! [`KeyColorRemover`] is always available. [`OnnxRemover`] needs the `onnx`
//! feature and a model file.

pub mod key_color;
pub mod mask;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use key_color::KeyColorRemover;
pub use mask::AlphaMask;
#[cfg(feature = "onnx")]
pub use onnx::{ExecutionProvider, OnnxConfig, OnnxRemover};

use crate::{
    error::{BatchError, Result},
    invoker::RemovalCapability,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Capability implementations selectable at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapabilityKind {
    /// Border-colour keying, no model required
    #[default]
    KeyColor,
    /// ONNX segmentation model
    Onnx,
}

impl CapabilityKind {
    /// Kinds compiled into this build
    #[must_use]
    pub fn available() -> Vec<Self> {
        let mut kinds = vec![Self::KeyColor];
        if cfg!(feature = "onnx") {
            kinds.push(Self::Onnx);
        }
        kinds
    }
}

/// Options used when constructing a capability
#[derive(Debug, Clone, Default)]
pub struct CapabilityOptions {
    /// Model file for [`CapabilityKind::Onnx`]
    pub model_path: Option<PathBuf>,
    /// Colour tolerance for [`CapabilityKind::KeyColor`]
    pub tolerance: Option<f32>,
    /// Edge ramp width for [`CapabilityKind::KeyColor`]
    pub feather: Option<f32>,
}

/// Construct the capability selected by `kind`
///
/// # Errors
/// - Invalid options for the selected kind
/// - Kind not compiled into this build
/// - Model loading failures
pub fn create_capability(
    kind: CapabilityKind,
    options: &CapabilityOptions,
) -> Result<Arc<dyn RemovalCapability>> {
    match kind {
        CapabilityKind::KeyColor => {
            let mut remover = KeyColorRemover::new();
            if let Some(tolerance) = options.tolerance {
                remover = remover.with_tolerance(tolerance)?;
            }
            if let Some(feather) = options.feather {
                remover = remover.with_feather(feather)?;
            }
            Ok(Arc::new(remover))
        },
        CapabilityKind::Onnx => create_onnx(options),
    }
}

#[cfg(feature = "onnx")]
fn create_onnx(options: &CapabilityOptions) -> Result<Arc<dyn RemovalCapability>> {
    let model_path = options
        .model_path
        .clone()
        .ok_or_else(|| BatchError::invalid_config("The onnx capability requires a model path"))?;
    Ok(Arc::new(OnnxRemover::new(OnnxConfig::new(model_path))?))
}

#[cfg(not(feature = "onnx"))]
fn create_onnx(_options: &CapabilityOptions) -> Result<Arc<dyn RemovalCapability>> {
    Err(BatchError::invalid_config(
        "ONNX capability not available in this build. Rebuild with --features onnx.",
    ))
}
