use std::{
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::future::{self, BoxFuture, FutureExt};
use thiserror::Error;

use crate::id_type;

id_type!(HandleId, PartialOrd, Ord);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayError {
    #[error("playback was blocked by the autoplay policy")]
    NotAllowed,

    #[error("play request was interrupted by a pause")]
    Aborted,

    #[error("media element was detached before playback started")]
    Detached,

    #[error("video handle {0} is not registered")]
    Unregistered(HandleId),
}

// Implementations must not call back into the registry from `play` or `pause`.
pub trait VideoHandle: Send + Sync + fmt::Debug {
    fn id(&self) -> HandleId;

    fn play(&self) -> BoxFuture<'static, Result<(), PlayError>>;

    fn pause(&self);
}

#[must_use = "play requests should be awaited or detached"]
pub struct PlayRequest {
    handle: HandleId,
    inner: BoxFuture<'static, Result<(), PlayError>>,
}

impl PlayRequest {
    pub fn new(handle: HandleId, inner: BoxFuture<'static, Result<(), PlayError>>) -> Self {
        Self { handle, inner }
    }

    pub fn rejected(handle: HandleId, err: PlayError) -> Self {
        Self::new(handle, future::ready(Err(err)).boxed())
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    pub fn detach(self) {
        tokio::spawn(async move {
            let handle = self.handle();
            if let Err(err) = self.await {
                log::debug!("Play request for video {handle} was rejected: {err}");
            }
        });
    }
}

impl Future for PlayRequest {
    type Output = Result<(), PlayError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl fmt::Debug for PlayRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayRequest")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}
