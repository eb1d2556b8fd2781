use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, Weak};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::internal::PeerConnectionInner;
use crate::peer_connection::sdp::{RTCSdpType, RTCSessionDescription};
use shared::error::{Error, Result};

type DescriptionSender = oneshot::Sender<Result<String>>;

/// Outstanding `create_offer`/`create_answer` requests of one connection.
#[derive(Default)]
pub(crate) struct PendingOperations {
    next_id: u64,
    senders: HashMap<u64, DescriptionSender>,
    aborted: bool,
}

impl PendingOperations {
    pub(crate) fn register(&mut self) -> Result<(u64, oneshot::Receiver<Result<String>>)> {
        if self.aborted {
            return Err(Error::ErrConnectionClosed);
        }
        let (tx, rx) = oneshot::channel();
        self.next_id += 1;
        self.senders.insert(self.next_id, tx);
        Ok((self.next_id, rx))
    }

    /// Settles request `id`. Returns `false` if it was already settled or aborted.
    pub(crate) fn complete(&mut self, id: u64, result: Result<String>) -> bool {
        match self.senders.remove(&id) {
            // the caller may have dropped its future, that is fine
            Some(tx) => {
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    /// Resolves every outstanding request with `ErrOperationAborted` and refuses new ones.
    pub(crate) fn abort_all(&mut self) -> usize {
        self.aborted = true;
        let senders: Vec<DescriptionSender> = self.senders.drain().map(|(_, tx)| tx).collect();
        let n = senders.len();
        for tx in senders {
            let _ = tx.send(Err(Error::ErrOperationAborted));
        }
        n
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.senders.len()
    }
}

/// A description the engine is still synthesizing.
///
/// Await it from async code, or call [`PendingDescription::wait`] from a plain thread. It
/// resolves with [`Error::ErrOperationAborted`] if the connection is closed first; a
/// description produced after close is never handed out.
#[must_use = "a pending description does nothing unless awaited or waited on"]
pub struct PendingDescription {
    rx: oneshot::Receiver<Result<String>>,
    sdp_type: RTCSdpType,
    inner: Weak<PeerConnectionInner>,
}

impl PendingDescription {
    pub(crate) fn new(
        rx: oneshot::Receiver<Result<String>>,
        sdp_type: RTCSdpType,
        inner: &Arc<PeerConnectionInner>,
    ) -> Self {
        Self {
            rx,
            sdp_type,
            inner: Arc::downgrade(inner),
        }
    }

    pub fn sdp_type(&self) -> RTCSdpType {
        self.sdp_type
    }

    /// Blocks the current thread until the engine answers.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context; `.await` the
    /// description there instead.
    pub fn wait(self) -> Result<RTCSessionDescription> {
        let PendingDescription {
            rx,
            sdp_type,
            inner,
        } = self;
        let received = rx.blocking_recv();
        finish(&inner, sdp_type, received)
    }
}

impl Future for PendingDescription {
    type Output = Result<RTCSessionDescription>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(received) => Poll::Ready(finish(&self.inner, self.sdp_type, received)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl fmt::Debug for PendingDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingDescription")
            .field("sdp_type", &self.sdp_type)
            .finish()
    }
}

fn finish(
    inner: &Weak<PeerConnectionInner>,
    sdp_type: RTCSdpType,
    received: std::result::Result<Result<String>, oneshot::error::RecvError>,
) -> Result<RTCSessionDescription> {
    // a sender dropped without a value only happens when the connection went away
    let sdp = received.map_err(|_| Error::ErrOperationAborted)??;
    let inner = inner.upgrade().ok_or(Error::ErrOperationAborted)?;

    let mut core = inner.core.lock().unwrap_or_else(PoisonError::into_inner);
    if core.is_closed {
        return Err(Error::ErrOperationAborted);
    }
    let description = RTCSessionDescription::local(sdp_type, sdp)?;
    match sdp_type {
        RTCSdpType::Offer => core.last_offer.clone_from(&description.sdp),
        _ => core.last_answer.clone_from(&description.sdp),
    }
    Ok(description)
}
