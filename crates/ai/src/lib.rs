//! QueryStream AI - provider stream classification and recording.
//!
//! This crate sits between a streaming query provider and the fragment store.
//! It classifies provider events into typed chunks, splits them to fit the
//! store's row limit and appends the fragments while forwarding live
//! `StreamEvent`s to the consumer.
//!
//! # Architecture
//!
//! - `wire`: Adapts the provider's envelope into the classifier's input shape
//! - `classifier`: Event → chunk rules and the per-message sequence cursor
//! - `chart`: Chart normalization seam and the default Vega-Lite validator
//! - `document_links`: Document references found in insight text
//! - `recorder`: Classify, split and append for one message
//! - `stream`: One recording task per stream, exposed as a `BoxStream`
//! - `env`: Environment abstraction for the store and chart normalizer
//! - `types`: Live events and recording reports
//!
//! # Example
//!
//! ```ignore
//! use querystream_ai::{StreamConfig, StreamService};
//!
//! let service = StreamService::new(Arc::new(env), StreamConfig::default());
//! let mut live = service.start(&message_id, provider_events);
//!
//! while let Some(event) = live.next().await {
//!     if let StreamEvent::Done { report, .. } = event {
//!         println!("stored {} fragments", report.fragments_stored);
//!     }
//! }
//! ```

pub mod chart;
pub mod classifier;
pub mod document_links;
pub mod env;
pub mod error;
pub mod recorder;
pub mod stream;
pub mod types;
pub mod wire;

pub use chart::{ChartNormalizationError, ChartNormalizerTrait, VegaLiteChartNormalizer};
pub use classifier::{MessageStreamClassifier, SequenceCursor};
pub use document_links::extract_document_references;
pub use env::StreamEnvironment;
pub use error::StreamError;
pub use recorder::StreamRecorder;
pub use stream::{StreamConfig, StreamService};
pub use types::{
    FragmentFailure, RawProviderEvent, RecordedChunk, RecordingReport, StreamEvent,
};
pub use wire::adapt_event;
