//! Upload and landmark retrieval.
//!
//! One upload, then the three landmark fetches launched together and joined
//! fail-fast: either all three texts arrive and the sink gets a complete
//! bundle, or the sink is not called at all.

use std::rc::Rc;

use tracing::{debug, info};

use stickframes_common::landmarks::{LandmarkBundle, LandmarkKind};

use crate::backend::Backend;
use crate::error::Result;
use crate::media::VideoBlob;
use crate::session::{SessionTicket, SessionTracker};
use crate::sink::LandmarkSink;

/// What became of a finished `process` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The bundle was handed to the sink.
    Delivered(LandmarkBundle),
    /// The owning session was superseded while the request was in flight;
    /// the result was dropped.
    Discarded,
}

pub struct Orchestrator {
    backend: Rc<dyn Backend>,
    sink: Rc<dyn LandmarkSink>,
    sessions: SessionTracker,
}

impl Orchestrator {
    pub fn new(backend: Rc<dyn Backend>, sink: Rc<dyn LandmarkSink>) -> Self {
        Orchestrator {
            backend,
            sink,
            sessions: SessionTracker::new(),
        }
    }

    /// Tracker shared by every capture path feeding this orchestrator.
    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    /// Upload `video` for session `ticket` and deliver its landmarks.
    ///
    /// No retries.  Results (and errors) of a session that is no longer
    /// active when they arrive are discarded.
    pub async fn process(&self, ticket: SessionTicket, video: &VideoBlob) -> Result<Delivery> {
        let uploaded = self.backend.upload(video).await;
        if !self.sessions.is_active(ticket) {
            debug!("Upload for superseded {ticket:?} finished – discarding");
            return Ok(Delivery::Discarded);
        }
        let locators = uploaded?;
        debug!("Upload accepted: {locators:?}");

        let backend = self.backend.as_ref();
        let fetched = tokio::try_join!(
            backend.fetch_landmarks(LandmarkKind::Body, locators.locator(LandmarkKind::Body)),
            backend.fetch_landmarks(LandmarkKind::LeftHand, locators.locator(LandmarkKind::LeftHand)),
            backend.fetch_landmarks(LandmarkKind::RightHand, locators.locator(LandmarkKind::RightHand)),
        );
        if !self.sessions.is_active(ticket) {
            debug!("Landmarks for superseded {ticket:?} arrived – discarding");
            return Ok(Delivery::Discarded);
        }
        let (body, left_hand, right_hand) = fetched?;

        let bundle = LandmarkBundle::complete(body, left_hand, right_hand);
        self.sink.on_landmarks_received(&bundle);
        info!("Landmarks delivered for {}", video.file_name);
        Ok(Delivery::Delivered(bundle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PipelineError, RetrievalError, UploadError};
    use crate::testing::{FakeBackend, RecordingSink};

    fn setup() -> (Rc<FakeBackend>, Rc<RecordingSink>, Orchestrator) {
        let backend = Rc::new(FakeBackend::new());
        let sink = Rc::new(RecordingSink::default());
        let orch = Orchestrator::new(backend.clone(), sink.clone());
        (backend, sink, orch)
    }

    fn video(name: &str, size: usize) -> VideoBlob {
        VideoBlob::new(vec![7u8; size], "video/mp4", name)
    }

    #[tokio::test]
    async fn test_successful_process_delivers_complete_bundle() {
        let (backend, sink, orch) = setup();
        backend.serve("clip", "pose-data", "left-hand-data", "right-hand-data");

        let ticket = orch.sessions().begin();
        let delivery = orch.process(ticket, &video("clip.mp4", 10 * 1024 * 1024)).await.unwrap();

        let expected = LandmarkBundle::complete(
            "pose-data".into(),
            "left-hand-data".into(),
            "right-hand-data".into(),
        );
        assert_eq!(delivery, Delivery::Delivered(expected.clone()));
        assert_eq!(sink.received(), vec![expected]);
        assert_eq!(backend.uploads(), vec![("clip.mp4".to_string(), 10 * 1024 * 1024)]);
        assert_eq!(backend.fetches(), 3);
    }

    #[tokio::test]
    async fn test_upload_status_failure_skips_fetches() {
        let (backend, sink, orch) = setup();
        backend.serve("clip", "a", "b", "c");
        backend.fail_uploads_with("503 Service Unavailable");

        let ticket = orch.sessions().begin();
        let err = orch.process(ticket, &video("clip.mp4", 1)).await.unwrap_err();

        assert!(matches!(err, PipelineError::Upload(UploadError::Status(ref s)) if s.starts_with("503")));
        assert_eq!(backend.fetches(), 0);
        assert!(sink.received().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_upload_response() {
        let (backend, sink, orch) = setup();
        backend.answer_malformed();

        let ticket = orch.sessions().begin();
        let err = orch.process(ticket, &video("clip.mp4", 1)).await.unwrap_err();
        assert!(matches!(err, PipelineError::Upload(UploadError::Malformed(_))));
        assert!(sink.received().is_empty());
    }

    #[tokio::test]
    async fn test_one_failed_fetch_fails_everything() {
        let (backend, sink, orch) = setup();
        backend.serve("clip", "pose-data", "left-hand-data", "right-hand-data");
        backend.remove(&FakeBackend::locators_for("clip").left_hand_landmarks);

        let ticket = orch.sessions().begin();
        let err = orch.process(ticket, &video("clip.mp4", 1)).await.unwrap_err();

        match err {
            PipelineError::Retrieval(ref e @ RetrievalError::Status { .. }) => {
                assert_eq!(e.kind(), LandmarkKind::LeftHand);
            }
            other => panic!("expected retrieval error, got {other:?}"),
        }
        assert!(sink.received().is_empty());
    }

    #[tokio::test]
    async fn test_superseded_session_is_never_delivered() {
        let (backend, sink, orch) = setup();
        backend.serve("first", "pose-1", "left-1", "right-1");
        backend.serve("second", "pose-2", "left-2", "right-2");
        let gate = backend.hold_upload("first.webm");

        let first_ticket = orch.sessions().begin();
        let first_video = video("first.webm", 4);
        let second_video = video("second.webm", 4);

        let first = orch.process(first_ticket, &first_video);
        let second = async {
            // Let the first upload get in flight before the user moves on.
            tokio::task::yield_now().await;
            let ticket = orch.sessions().begin();
            let delivery = orch.process(ticket, &second_video).await;
            gate.notify_one();
            delivery
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap(), Delivery::Discarded);
        let expected = LandmarkBundle::complete("pose-2".into(), "left-2".into(), "right-2".into());
        assert_eq!(second.unwrap(), Delivery::Delivered(expected.clone()));
        assert_eq!(sink.received(), vec![expected]);
    }

    #[tokio::test]
    async fn test_superseded_failure_is_discarded_too() {
        let (backend, sink, orch) = setup();
        backend.fail_uploads_with("500 Internal Server Error");

        let stale = orch.sessions().begin();
        orch.sessions().begin();
        let delivery = orch.process(stale, &video("clip.mp4", 1)).await.unwrap();
        assert_eq!(delivery, Delivery::Discarded);
        assert!(sink.received().is_empty());
    }
}
