//! ONNX Runtime segmentation capability
//!
//! Runs a user-supplied salient-object segmentation model (U²-Net style: one
//! NCHW RGB input, a single-channel saliency map as the first output). The
//! input is letterboxed onto a square white canvas, normalised with the
//! configured mean and std, and the predicted map is min-max normalised and
//! mapped back onto the original pixels as an alpha mask.

use super::mask::{apply_alpha_mask, decode_input, encode_png, AlphaMask};
use crate::{
    error::{BatchError, Result},
    invoker::RemovalCapability,
};
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageBuffer, Rgb};
use ndarray::Array4;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Execution provider preference for the ONNX session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionProvider {
    /// CUDA, then CoreML, then CPU, whichever is available
    #[default]
    Auto,
    Cpu,
    Cuda,
    CoreMl,
}

/// Settings for [`OnnxRemover`]
#[derive(Debug, Clone)]
pub struct OnnxConfig {
    pub model_path: PathBuf,
    /// Side length of the square model input
    pub input_size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub execution_provider: ExecutionProvider,
    /// Intra-op threads (0 = all cores)
    pub intra_threads: usize,
}

impl OnnxConfig {
    /// Defaults for a 320×320 ImageNet-normalised model at `model_path`
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: model_path.into(),
            input_size: 320,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            execution_provider: ExecutionProvider::Auto,
            intra_threads: 0,
        }
    }
}

/// Letterbox geometry used to map the model output back to the input
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    scale: f32,
    offset_x: u32,
    offset_y: u32,
    scaled_width: u32,
    scaled_height: u32,
}

impl Letterbox {
    fn fit(original: (u32, u32), target: u32) -> Self {
        let (width, height) = original;
        let target_f32 = target as f32;
        let scale = (target_f32 / width as f32).min(target_f32 / height as f32);
        let scaled_width = ((width as f32 * scale).round() as u32).clamp(1, target);
        let scaled_height = ((height as f32 * scale).round() as u32).clamp(1, target);
        Self {
            scale,
            offset_x: (target - scaled_width) / 2,
            offset_y: (target - scaled_height) / 2,
            scaled_width,
            scaled_height,
        }
    }
}

/// Background removal through an ONNX segmentation model
///
/// The session is not reentrant, so calls are serialised on an internal
/// lock. Run with more than one worker only if the session is cheap to wait on.
pub struct OnnxRemover {
    session: Mutex<Session>,
    config: OnnxConfig,
}

impl OnnxRemover {
    /// Load the model and create the session
    ///
    /// # Errors
    /// - Invalid configuration
    /// - Model file missing or not a valid ONNX graph
    /// - Session creation failures
    pub fn new(config: OnnxConfig) -> Result<Self> {
        if config.input_size == 0 {
            return Err(BatchError::config_value_error("input_size", 0, "> 0"));
        }
        if config.std.iter().any(|&s| s == 0.0) {
            return Err(BatchError::invalid_config("Normalisation std must be non-zero"));
        }
        if !config.model_path.is_file() {
            return Err(BatchError::invalid_config(format!(
                "Model file not found: {}",
                config.model_path.display()
            )));
        }

        let load_start = Instant::now();
        let builder = Session::builder()
            .map_err(|e| BatchError::capability(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| BatchError::capability(format!("Failed to set optimization level: {e}")))?;

        let builder = match config.execution_provider {
            ExecutionProvider::Cpu => {
                log::info!("Using CPU execution provider");
                builder
            },
            ExecutionProvider::Auto | ExecutionProvider::Cuda | ExecutionProvider::CoreMl => {
                let providers = Self::available_providers(config.execution_provider);
                if providers.is_empty() {
                    log::warn!("⚠️ No hardware acceleration available, falling back to CPU");
                    builder
                } else {
                    builder.with_execution_providers(providers).map_err(|e| {
                        BatchError::capability(format!("Failed to set execution providers: {e}"))
                    })?
                }
            },
        };

        let intra_threads = if config.intra_threads > 0 {
            config.intra_threads
        } else {
            std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(4)
        };

        let session = builder
            .with_intra_threads(intra_threads)
            .map_err(|e| BatchError::capability(format!("Failed to set intra threads: {e}")))?
            .commit_from_file(&config.model_path)
            .map_err(|e| {
                BatchError::capability(format!(
                    "Failed to load model '{}': {e}",
                    config.model_path.display()
                ))
            })?;

        log::info!(
            "📊 Model loaded from {} in {:.0}ms",
            config.model_path.display(),
            load_start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Self {
            session: Mutex::new(session),
            config,
        })
    }

    fn available_providers(
        preference: ExecutionProvider,
    ) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
        let mut providers = Vec::new();

        if matches!(preference, ExecutionProvider::Auto | ExecutionProvider::Cuda) {
            let cuda = CUDAExecutionProvider::default();
            if OrtExecutionProvider::is_available(&cuda).unwrap_or(false) {
                log::info!("🚀 CUDA execution provider is available and will be used");
                providers.push(cuda.build());
            } else if preference == ExecutionProvider::Cuda {
                log::warn!("CUDA execution provider requested but not available, falling back to CPU");
            }
        }

        if matches!(preference, ExecutionProvider::Auto | ExecutionProvider::CoreMl) {
            let coreml = CoreMLExecutionProvider::default();
            if OrtExecutionProvider::is_available(&coreml).unwrap_or(false) {
                log::info!("🍎 CoreML execution provider is available and will be used");
                providers.push(CoreMLExecutionProvider::default().with_subgraphs(true).build());
            } else if preference == ExecutionProvider::CoreMl {
                log::warn!("CoreML execution provider requested but not available, falling back to CPU");
            }
        }

        providers
    }

    #[must_use]
    pub fn config(&self) -> &OnnxConfig {
        &self.config
    }

    fn infer(&self, input: Array4<f32>) -> Result<Array4<f32>> {
        let input_value = Value::from_array(input)
            .map_err(|e| BatchError::capability(format!("Failed to convert input tensor: {e}")))?;

        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| BatchError::capability(format!("ONNX inference failed: {e}")))?;

        let first_key = outputs
            .keys()
            .next()
            .ok_or_else(|| BatchError::capability("No output tensors found"))?;
        let output = outputs
            .get(first_key)
            .ok_or_else(|| BatchError::capability("First output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| BatchError::capability(format!("Failed to extract output tensor: {e}")))?;

        let shape = output.shape().to_vec();
        if shape.len() != 4 || shape.get(1).copied().unwrap_or(0) != 1 {
            return Err(BatchError::capability(format!(
                "Expected a [N, 1, H, W] output tensor, got {:?}",
                shape
            )));
        }

        Array4::from_shape_vec(
            (
                shape.first().copied().unwrap_or(1),
                1,
                shape.get(2).copied().unwrap_or(1),
                shape.get(3).copied().unwrap_or(1),
            ),
            output.iter().copied().collect(),
        )
        .map_err(|e| BatchError::capability(format!("Failed to reshape output tensor: {e}")))
    }
}

impl RemovalCapability for OnnxRemover {
    fn name(&self) -> &str {
        "onnx"
    }

    fn remove_background(&self, input: &[u8]) -> Result<Vec<u8>> {
        let image = decode_input(input)?;
        if image.width() == 0 || image.height() == 0 {
            return Err(BatchError::capability("Image has zero width or height"));
        }

        let (tensor, letterbox) = preprocess(&image, &self.config);
        let started = Instant::now();
        let prediction = self.infer(tensor)?;
        log::debug!(
            "⚡ Inference: {:.2}ms",
            started.elapsed().as_secs_f64() * 1000.0
        );

        let mask = prediction_to_mask(&prediction, image.dimensions(), &letterbox)?;
        encode_png(&apply_alpha_mask(&image, &mask))
    }
}

/// Letterbox `image` onto a white square canvas and normalise into NCHW
fn preprocess(image: &DynamicImage, config: &OnnxConfig) -> (Array4<f32>, Letterbox) {
    let target = config.input_size;
    let letterbox = Letterbox::fit(image.dimensions(), target);

    let resized = image::imageops::resize(
        &image.to_rgb8(),
        letterbox.scaled_width,
        letterbox.scaled_height,
        FilterType::Triangle,
    );
    let mut canvas = ImageBuffer::from_pixel(target, target, Rgb([255u8, 255, 255]));
    image::imageops::replace(
        &mut canvas,
        &resized,
        i64::from(letterbox.offset_x),
        i64::from(letterbox.offset_y),
    );

    let size = target as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        for channel in 0..3 {
            let value = f32::from(pixel.0.get(channel).copied().unwrap_or(0)) / 255.0;
            let normalised = (value - config.mean.get(channel).copied().unwrap_or(0.0))
                / config.std.get(channel).copied().unwrap_or(1.0);
            if let Some(slot) = tensor.get_mut([0, channel, y as usize, x as usize]) {
                *slot = normalised;
            }
        }
    }

    (tensor, letterbox)
}

/// Min-max normalise the prediction and sample it at every original pixel
fn prediction_to_mask(
    prediction: &Array4<f32>,
    original: (u32, u32),
    letterbox: &Letterbox,
) -> Result<AlphaMask> {
    let (_, _, mask_height, mask_width) = prediction.dim();
    let (min, max) = prediction
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = if max > min { max - min } else { 1.0 };

    let (width, height) = original;
    let mut data = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            let tx = ((x as f32 * letterbox.scale).round() as u32 + letterbox.offset_x) as usize;
            let ty = ((y as f32 * letterbox.scale).round() as u32 + letterbox.offset_y) as usize;
            let value = if tx < mask_width && ty < mask_height {
                prediction.get([0, 0, ty, tx]).copied().unwrap_or(min)
            } else {
                min
            };
            data.push((((value - min) / range).clamp(0.0, 1.0) * 255.0) as u8);
        }
    }

    AlphaMask::new(data, original)
}
