//! Noise reduction abstraction.
//!
//! The `NoiseReducer` trait decouples the batch pipeline from any specific
//! reduction algorithm. [`reduce`] is the adapter the pipeline calls: it
//! picks profile-guided or blind reduction and checks the length contract,
//! nothing else.
//!
//! `&mut self` on `reduce` lets backends keep FFT plans and scratch buffers
//! between files. All mutation is serialised through `ReducerHandle`'s
//! `parking_lot::Mutex`.

pub mod spectral;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{NoisRemoverError, Result};

/// Contract for noise reduction backends.
pub trait NoiseReducer: Send + 'static {
    /// Reduce background noise in a mono f32 signal.
    ///
    /// # Parameters
    /// - `signal`: mono samples, approximately in [-1.0, 1.0].
    /// - `sample_rate`: rate of `signal` in Hz.
    /// - `noise`: optional reference recording of pure background noise at
    ///   the same `sample_rate`. `None` requests blind reduction, where the
    ///   noise signature is inferred from `signal` itself.
    ///
    /// # Returns
    /// The cleaned signal. Must be exactly `signal.len()` samples long.
    fn reduce(&mut self, signal: &[f32], sample_rate: u32, noise: Option<&[f32]>)
        -> Result<Vec<f32>>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Thread-safe reference-counted handle to any `NoiseReducer` implementor.
#[derive(Clone)]
pub struct ReducerHandle(pub Arc<Mutex<dyn NoiseReducer>>);

impl ReducerHandle {
    /// Wrap any `NoiseReducer` in a `ReducerHandle`.
    pub fn new<R: NoiseReducer>(reducer: R) -> Self {
        Self(Arc::new(Mutex::new(reducer)))
    }

    pub fn name(&self) -> &'static str {
        self.0.lock().name()
    }
}

impl std::fmt::Debug for ReducerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReducerHandle").finish_non_exhaustive()
    }
}

/// Denoise `signal`, guided by `noise` when a profile is present.
///
/// # Errors
/// Returns `NoisRemoverError::Denoise` when the backend fails or breaks the
/// length contract. The caller tags it with the file name.
pub fn reduce(
    reducer: &ReducerHandle,
    signal: &[f32],
    sample_rate: u32,
    noise: Option<&[f32]>,
) -> Result<Vec<f32>> {
    let mut backend = reducer.0.lock();
    debug!(
        backend = backend.name(),
        samples = signal.len(),
        sample_rate,
        profile_guided = noise.is_some(),
        "denoise"
    );

    let out = backend.reduce(signal, sample_rate, noise)?;

    if out.len() != signal.len() {
        return Err(NoisRemoverError::Denoise(format!(
            "{} returned {} samples for a {}-sample input",
            backend.name(),
            out.len(),
            signal.len()
        )));
    }
    Ok(out)
}
