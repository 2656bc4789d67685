use async_trait::async_trait;
use image::RgbImage;
use moodlens_core::{Analysis, Pipeline, PipelineError};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Pipeline(#[from] PipelineError),
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Anything that can turn a decoded image into an [`Analysis`].
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, image: RgbImage) -> Result<Analysis, EngineError>;
}

/// Messages sent from HTTP handlers to the engine thread.
struct AnalyzeRequest {
    image: RgbImage,
    reply: oneshot::Sender<Result<Analysis, EngineError>>,
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<AnalyzeRequest>,
}

#[async_trait]
impl Analyzer for EngineHandle {
    async fn analyze(&self, image: RgbImage) -> Result<Analysis, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(AnalyzeRequest {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// Loads both ONNX models synchronously so startup fails fast when either is
/// missing, then serves analysis requests one at a time.
pub fn spawn_engine(detector_path: &str, classifier_path: &str) -> Result<EngineHandle, EngineError> {
    let mut pipeline = Pipeline::load(detector_path, classifier_path)?;
    tracing::info!(
        detector = detector_path,
        classifier = classifier_path,
        "emotion pipeline loaded"
    );

    let (tx, mut rx) = mpsc::channel::<AnalyzeRequest>(4);

    std::thread::Builder::new()
        .name("moodlens-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(AnalyzeRequest { image, reply }) = rx.blocking_recv() {
                let started = std::time::Instant::now();
                let result = pipeline.analyze(&image).map_err(EngineError::from);
                tracing::debug!(
                    width = image.width(),
                    height = image.height(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    ok = result.is_ok(),
                    "analysis finished"
                );
                let _ = reply.send(result);
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok(EngineHandle { tx })
}
