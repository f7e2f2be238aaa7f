//! Diagnostic player that logs instead of playing audio

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::playback::task::PlaybackTask;

pub struct TestPlayer;

impl TestPlayer {
    pub fn task(
        &self,
        payload: &str,
        args: Vec<String>,
        kwargs: Vec<(String, String)>,
    ) -> Arc<dyn PlaybackTask> {
        Arc::new(TestTask {
            payload: payload.to_string(),
            args,
            kwargs,
        })
    }
}

pub struct TestTask {
    payload: String,
    args: Vec<String>,
    kwargs: Vec<(String, String)>,
}

#[async_trait]
impl PlaybackTask for TestTask {
    fn describe(&self) -> String {
        format!("<Test {:?}>", self.payload)
    }

    async fn play(&self) {
        info!(
            "test task: payload={:?} args={:?} kwargs={:?}",
            self.payload, self.args, self.kwargs
        );
    }
}
