use std::collections::HashMap;
use std::sync::Mutex;

use ironvnc_pdu::geometry::Rectangle;
use tokio::sync::oneshot;

use crate::session::FramebufferRegion;
use crate::{SessionErrorKind, SessionResult};

/// Correlates framebuffer update requests with the server's responses.
///
/// Registration happens before the request bytes are written, so a reply can
/// never arrive while nobody is waiting for it. Keys are the exact
/// `(x, y, width, height)` of the requested rectangle.
#[derive(Debug, Default)]
pub(crate) struct PendingUpdates {
    map: Mutex<HashMap<u64, oneshot::Sender<FramebufferRegion>>>,
}

impl PendingUpdates {
    /// Registers a pending request for `rect`.
    ///
    /// A second registration for the same rectangle while the first is still
    /// pending is refused rather than silently dropping either waiter.
    pub(crate) fn register(&self, rect: Rectangle) -> SessionResult<oneshot::Receiver<FramebufferRegion>> {
        let mut map = self.map.lock().map_err(|_| general_err!("pending map lock poisoned"))?;

        if map.contains_key(&rect.key()) {
            return Err(crate::SessionError::new(
                "register update request",
                SessionErrorKind::UpdateConflict,
            ));
        }

        let (tx, rx) = oneshot::channel();
        map.insert(rect.key(), tx);

        Ok(rx)
    }

    /// Completes the pending request for `rect`, if any.
    ///
    /// Returns whether a waiter existed. A send failure only means the waiter
    /// gave up; the payload is dropped either way.
    pub(crate) fn resolve(&self, rect: Rectangle, region: FramebufferRegion) -> bool {
        let Ok(mut map) = self.map.lock() else {
            return false;
        };

        match map.remove(&rect.key()) {
            Some(tx) => {
                let _ = tx.send(region);
                true
            }
            None => false,
        }
    }

    /// Forgets a registration, used when the request bytes were never sent.
    pub(crate) fn forget(&self, rect: Rectangle) {
        if let Ok(mut map) = self.map.lock() {
            map.remove(&rect.key());
        }
    }

    /// Drops every pending sender, waking all waiters with a closed error.
    pub(crate) fn fail_all(&self) {
        if let Ok(mut map) = self.map.lock() {
            map.clear();
        }
    }
}
