//! Stream service - runs one recording task per provider stream.

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use log::{debug, error, info};
use std::sync::Arc;
use tokio::sync::mpsc;

use querystream_core::{ChunkSizeSplitter, FragmentLimits};

use crate::classifier::MessageStreamClassifier;
use crate::env::StreamEnvironment;
use crate::error::StreamError;
use crate::recorder::StreamRecorder;
use crate::types::{RawProviderEvent, StreamEvent};

/// Configuration for the stream service.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub limits: FragmentLimits,
    /// Buffered live events before the recording task waits on the consumer.
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            limits: FragmentLimits::default(),
            channel_capacity: 100,
        }
    }
}

pub struct StreamService<E: StreamEnvironment> {
    env: Arc<E>,
    config: StreamConfig,
}

impl<E: StreamEnvironment + 'static> StreamService<E> {
    pub fn new(env: Arc<E>, config: StreamConfig) -> Self {
        Self { env, config }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Start recording `events` under `message_id`.
    ///
    /// Emits `Started`, one `Chunk` per classified event (after its fragments
    /// were appended), an `Error` if the provider fails, and `Done` last.
    /// Dropping the returned stream stops the task from pulling further
    /// provider events; fragments already appended stay stored.
    pub fn start<S>(&self, message_id: &str, events: S) -> BoxStream<'static, StreamEvent>
    where
        S: Stream<Item = Result<RawProviderEvent, StreamError>> + Send + 'static,
    {
        let capacity = self.config.channel_capacity.max(1);
        let (tx, rx) = mpsc::channel::<StreamEvent>(capacity);

        let recorder = StreamRecorder::new(
            message_id,
            self.env.chunk_store(),
            MessageStreamClassifier::new(self.env.chart_normalizer()),
            ChunkSizeSplitter::new(self.config.limits),
        );

        tokio::spawn(run_stream(recorder, events, tx));

        let stream = tokio_stream::wrappers::ReceiverStream::new(rx);
        Box::pin(stream)
    }
}

async fn run_stream<S>(mut recorder: StreamRecorder, events: S, tx: mpsc::Sender<StreamEvent>)
where
    S: Stream<Item = Result<RawProviderEvent, StreamError>> + Send + 'static,
{
    let message_id = recorder.message_id().to_string();
    info!("Recording stream for message {}", message_id);

    if tx.send(StreamEvent::started(&message_id)).await.is_err() {
        debug!("Consumer of message {} gone before start", message_id);
        return;
    }

    let mut events = Box::pin(events);
    let mut consumer_gone = false;

    loop {
        if tx.is_closed() {
            consumer_gone = true;
            break;
        }
        let Some(next) = events.next().await else {
            break;
        };

        match next {
            Ok(event) => {
                let Some(recorded) = recorder.record(&event).await else {
                    continue;
                };
                if tx
                    .send(StreamEvent::chunk(&message_id, recorded))
                    .await
                    .is_err()
                {
                    consumer_gone = true;
                    break;
                }
            }
            Err(e) => {
                error!("Provider stream for message {} failed: {}", message_id, e);
                if tx
                    .send(StreamEvent::error(&message_id, e.code(), &e.to_string()))
                    .await
                    .is_err()
                {
                    consumer_gone = true;
                }
                break;
            }
        }
    }

    let report = recorder.finish();
    if consumer_gone {
        info!(
            "Consumer of message {} disconnected after {} chunks",
            message_id, report.chunks_classified
        );
        return;
    }

    info!(
        "Finished message {}: {} chunks, {} fragments stored, {} failed",
        message_id,
        report.chunks_classified,
        report.fragments_stored,
        report.fragment_failures.len()
    );
    let _ = tx.send(StreamEvent::done(&message_id, report)).await;
}
