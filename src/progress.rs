//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to observe a run
//! as it walks the input directory. The CLI uses it to drive an `indicatif`
//! bar; a library caller might forward events to a channel or a database.
//!
//! # Example
//!
//! ```rust
//! use medrename::{BatchConfig, BatchProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl BatchProgressCallback for Counter {
//!     fn on_document_resolved(&self, _index: usize, _total: usize, _file: &str, _target: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = BatchConfig::builder()
//!     .input_dir("PDFs2")
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch driver as it processes each document.
///
/// Documents are processed one at a time, so events arrive in order. All
/// methods default to no-ops. `index` is 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once, after the input directory has been listed.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called before text extraction for a document begins.
    fn on_document_start(&self, index: usize, total: usize, file: &str) {
        let _ = (index, total, file);
    }

    /// Called when a document received a target name.
    ///
    /// `target` is the final file name after collision suffixing.
    fn on_document_resolved(&self, index: usize, total: usize, file: &str, target: &str) {
        let _ = (index, total, file, target);
    }

    /// Called when a document ended up on the unresolved list.
    ///
    /// `reason` is a short human-readable explanation.
    fn on_document_unresolved(&self, index: usize, total: usize, file: &str, reason: &str) {
        let _ = (index, total, file, reason);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total_documents: usize, resolved: usize) {
        let _ = (total_documents, resolved);
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// The type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
