//! Progress reporting and cooperative cancellation.

use crate::float_types::Real;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared flag asking a running operation to stop.
///
/// Clones share the flag, so a token can be handed to a run on another thread
/// and cancelled from here. The run checks it between meshes, faces and plane
/// groups; it never interrupts a BVH build or a single clip.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Marker returned by every unit of work once the run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cancelled;

/// Advisory progress callback, `(ratio in 0..=1, stage label)`.
pub type ProgressCallback<'a> = Box<dyn FnMut(Real, &str) + 'a>;

/// Progress callback and cancellation token of one run.
#[derive(Default)]
pub(crate) struct Progress<'a> {
    callback: Option<ProgressCallback<'a>>,
    token: Option<CancellationToken>,
}

impl<'a> Progress<'a> {
    pub(crate) fn new(callback: Option<ProgressCallback<'a>>, token: Option<CancellationToken>) -> Self {
        Progress { callback, token }
    }

    /// Hand the callback back once the run is over.
    pub(crate) fn into_callback(self) -> Option<ProgressCallback<'a>> {
        self.callback
    }

    pub(crate) fn report(&mut self, ratio: Real, label: &str) {
        if let Some(callback) = self.callback.as_mut() {
            callback(ratio.clamp(0.0, 1.0), label);
        }
    }

    pub(crate) fn check(&self) -> Result<(), Cancelled> {
        match &self.token {
            Some(token) if token.is_cancelled() => Err(Cancelled),
            _ => Ok(()),
        }
    }
}
