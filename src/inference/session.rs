//! ONNX Runtime session construction and execution provider selection.

use crate::config::InferenceDevice;
use crate::error::{Error, Result};
use ort::execution_providers::{
    CUDAExecutionProvider, ExecutionProvider, ExecutionProviderDispatch,
};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use std::fmt::Display;
use std::path::Path;
use tracing::{debug, info, warn};

/// Options shared by every session built for a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Requested inference device.
    pub device: InferenceDevice,
    /// Intra-op thread count (ONNX Runtime default when `None`).
    pub intra_threads: Option<usize>,
}

/// Build an ONNX Runtime session for a model file.
///
/// `role` names the model in log messages (e.g. "detector").
pub fn build_session(model_path: &Path, options: &SessionOptions, role: &str) -> Result<Session> {
    if !model_path.exists() {
        return Err(Error::ModelFileNotFound {
            path: model_path.to_path_buf(),
        });
    }

    let load_error = |e: &dyn Display| Error::ModelLoad {
        path: model_path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut builder = Session::builder()
        .map_err(|e| load_error(&e))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| load_error(&e))?;

    if let Some(threads) = options.intra_threads {
        builder = builder
            .with_intra_threads(threads)
            .map_err(|e| load_error(&e))?;
    }

    let (providers, device_msg) = select_execution_providers(options.device);
    if !providers.is_empty() {
        builder = builder
            .with_execution_providers(providers)
            .map_err(|e| load_error(&e))?;
    }

    let session = builder
        .commit_from_file(model_path)
        .map_err(|e| load_error(&e))?;

    info!(
        "Loaded {role}: {}, device: {device_msg}",
        model_path.display()
    );

    Ok(session)
}

/// Whether the CUDA execution provider can be used in this process.
pub fn cuda_available() -> bool {
    CUDAExecutionProvider::default()
        .is_available()
        .unwrap_or(false)
}

/// Pick execution providers for a device, returning them with a description for logging.
fn select_execution_providers(
    device: InferenceDevice,
) -> (Vec<ExecutionProviderDispatch>, &'static str) {
    match device {
        InferenceDevice::Cpu => {
            debug!("Requested device: CPU");
            (Vec::new(), "CPU")
        }
        InferenceDevice::Auto => {
            // Auto mode: ONNX Runtime falls back to CPU silently if CUDA fails at load time
            if cuda_available() {
                debug!("Auto mode: CUDA available, attempting GPU");
                (vec![CUDAExecutionProvider::default().build()], "CUDA")
            } else {
                debug!("Auto mode: No GPU providers available, using CPU");
                (Vec::new(), "Auto (CPU)")
            }
        }
        InferenceDevice::Gpu => {
            if cuda_available() {
                (vec![CUDAExecutionProvider::default().build()], "CUDA")
            } else {
                warn!("--gpu requested but CUDA is not available, using CPU");
                (Vec::new(), "GPU (fallback to CPU)")
            }
        }
    }
}

/// Convert any ONNX Runtime failure during a run into an inference error.
pub(crate) fn inference_error(e: impl Display) -> Error {
    Error::Inference {
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_not_found() {
        let err = build_session(
            Path::new("/nonexistent/md_v5a.onnx"),
            &SessionOptions::default(),
            "detector",
        )
        .err();
        assert!(matches!(err, Some(Error::ModelFileNotFound { .. })));
    }

    #[test]
    fn test_cpu_selects_no_providers() {
        let (providers, msg) = select_execution_providers(InferenceDevice::Cpu);
        assert!(providers.is_empty());
        assert_eq!(msg, "CPU");
    }
}
