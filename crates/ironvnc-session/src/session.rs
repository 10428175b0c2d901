use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::BytesMut;
use ironvnc_connector::{ClientConnector, Config, ConnectionResult, DesktopSize};
use ironvnc_core::{Encode, encode_vec};
use ironvnc_pdu::Encoding;
use ironvnc_pdu::client::{ClientCutText, FramebufferUpdateRequest, KeyEvent, PointerButtons, SetEncodings, SetPixelFormat};
use ironvnc_pdu::geometry::Rectangle;
use ironvnc_pdu::handshake::{PixelFormat, ProtocolVersion};
use ironvnc_tokio::TokioFramed;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::pending::PendingUpdates;
use crate::{SessionError, SessionErrorExt as _, SessionErrorKind, SessionResult};

pub(crate) type ReadFramed = TokioFramed<Box<dyn AsyncRead + Send + Unpin>>;
pub(crate) type WriteFramed = TokioFramed<Box<dyn AsyncWrite + Send + Unpin>>;

/// Receives session events.
///
/// Callbacks run on the task that produced the event (the dispatcher for
/// server-driven events, the caller for `on_close` via `end`), so they should
/// return promptly. All have no-op defaults except `on_error`, which logs;
/// the error also reaches the caller through the dispatcher join handle.
pub trait SessionEventHandler: Send + Sync + 'static {
    fn on_connected(&self, result: &ConnectionResult) {
        let _ = result;
    }

    fn on_close(&self) {}

    fn on_error(&self, error: &SessionError) {
        error!(error = %error.report(), "Session error");
    }

    fn on_resize(&self, size: DesktopSize) {
        let _ = size;
    }

    fn on_clipboard(&self, text: &[u8]) {
        let _ = text;
    }

    fn on_bell(&self) {}
}

/// A decoded framebuffer rectangle, RGBA, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferRegion {
    pub rect: Rectangle,
    pub rgba: Vec<u8>,
}

/// A pending framebuffer update request.
///
/// Resolves when the server replies with the exact requested rectangle.
/// There is no implicit timeout; wrap [`UpdateRequest::wait`] in
/// `tokio::time::timeout` to impose a deadline.
#[derive(Debug)]
pub struct UpdateRequest {
    rect: Rectangle,
    rx: oneshot::Receiver<FramebufferRegion>,
}

impl UpdateRequest {
    pub fn rect(&self) -> Rectangle {
        self.rect
    }

    pub async fn wait(self) -> SessionResult<FramebufferRegion> {
        self.rx
            .await
            .map_err(|_| SessionError::new("wait for update", SessionErrorKind::Closed))
    }
}

pub(crate) struct SessionInner {
    pub(crate) writer: tokio::sync::Mutex<Option<WriteFramed>>,
    pub(crate) pending: PendingUpdates,
    pub(crate) handler: Arc<dyn SessionEventHandler>,
    pub(crate) open: AtomicBool,
    pub(crate) cancel: CancellationToken,
    pub(crate) pixel_format: PixelFormat,
    close_fired: AtomicBool,
    desktop_size: Mutex<DesktopSize>,
    version: ProtocolVersion,
    server_name: String,
    buttons: Mutex<PointerButtons>,
}

impl SessionInner {
    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Invokes `on_close` the first time only, no matter how many paths race here.
    pub(crate) fn fire_close(&self) {
        if !self.close_fired.swap(true, Ordering::SeqCst) {
            self.handler.on_close();
        }
    }

    /// Marks the session unusable after a fatal dispatcher error.
    pub(crate) fn abort(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.cancel.cancel();
        self.pending.fail_all();
    }

    pub(crate) fn set_desktop_size(&self, size: DesktopSize) {
        match self.desktop_size.lock() {
            Ok(mut guard) => *guard = size,
            Err(e) => *e.into_inner() = size,
        }
    }
}

/// Handle over an established RFB session.
///
/// Cloneable and shareable across tasks; outbound messages are serialized
/// internally so concurrent callers never interleave bytes on the wire.
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

impl Session {
    /// Connects over TCP, runs the connection sequence and spawns the session.
    pub async fn connect(
        host: &str,
        port: u16,
        config: Config,
        handler: Arc<dyn SessionEventHandler>,
    ) -> SessionResult<(Self, JoinHandle<SessionResult<()>>)> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| custom_err!("connect to server", e))?;

        let mut framed = TokioFramed::new(stream);
        let connector = ClientConnector::new(config);

        let result = ironvnc_async::connect(&mut framed, connector)
            .await
            .map_err(|e| custom_err!("connection sequence", e))?;

        let (stream, leftover) = framed.into_inner();

        Ok(Self::spawn_with_leftover(stream, leftover, result, handler))
    }

    /// Spawns the dispatcher task over an already-negotiated stream.
    ///
    /// `on_connected` fires once the handle exists, before any server message
    /// is processed. The join handle yields the dispatcher's terminal result.
    pub fn spawn<S>(
        stream: S,
        result: ConnectionResult,
        handler: Arc<dyn SessionEventHandler>,
    ) -> (Self, JoinHandle<SessionResult<()>>)
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        Self::spawn_with_leftover(stream, BytesMut::new(), result, handler)
    }

    /// Same as [`Session::spawn`], preserving bytes already read past the handshake.
    pub fn spawn_with_leftover<S>(
        stream: S,
        leftover: BytesMut,
        result: ConnectionResult,
        handler: Arc<dyn SessionEventHandler>,
    ) -> (Self, JoinHandle<SessionResult<()>>)
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);

        let reader: ReadFramed = TokioFramed::from_parts(Box::new(read_half), leftover);
        let writer: WriteFramed = TokioFramed::new(Box::new(write_half));

        let inner = Arc::new(SessionInner {
            writer: tokio::sync::Mutex::new(Some(writer)),
            pending: PendingUpdates::default(),
            handler: Arc::clone(&handler),
            open: AtomicBool::new(true),
            cancel: CancellationToken::new(),
            pixel_format: result.pixel_format,
            close_fired: AtomicBool::new(false),
            desktop_size: Mutex::new(result.desktop_size),
            version: result.version,
            server_name: result.server_name.clone(),
            buttons: Mutex::new(PointerButtons::empty()),
        });

        let session = Self {
            inner: Arc::clone(&inner),
        };

        handler.on_connected(&result);

        let task = tokio::spawn(crate::dispatcher::run(reader, inner));

        (session, task)
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    /// Current framebuffer dimensions; updated when the server resizes.
    pub fn desktop_size(&self) -> DesktopSize {
        match self.inner.desktop_size.lock() {
            Ok(guard) => *guard,
            Err(e) => *e.into_inner(),
        }
    }

    pub fn server_name(&self) -> &str {
        &self.inner.server_name
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.inner.pixel_format
    }

    pub fn version(&self) -> ProtocolVersion {
        self.inner.version
    }

    /// Encodes the message, then writes it while holding the writer lock so
    /// concurrent sends never interleave.
    pub(crate) async fn send<T>(&self, msg: &T) -> SessionResult<()>
    where
        T: Encode + ?Sized,
    {
        let payload = encode_vec(msg).map_err(SessionError::encode)?;

        let mut writer = self.inner.writer.lock().await;
        let framed = writer
            .as_mut()
            .ok_or_else(|| SessionError::new("send message", SessionErrorKind::Closed))?;

        framed
            .write_all(&payload)
            .await
            .map_err(|e| custom_err!("send message", e))
    }

    pub async fn set_pixel_format(&self, pixel_format: PixelFormat) -> SessionResult<()> {
        self.send(&SetPixelFormat { pixel_format }).await
    }

    /// Declares the encodings this client decodes.
    pub async fn set_encodings(&self) -> SessionResult<()> {
        self.send(&SetEncodings {
            encodings: vec![Encoding::RAW, Encoding::DESKTOP_SIZE],
        })
        .await
    }

    /// Requests a full (non-incremental) update of the rectangle spanned by
    /// two corner points, in any order.
    ///
    /// The pending entry is registered before the request bytes are written,
    /// so the reply cannot race the waiter. The returned handle resolves when
    /// the server replies with the exact same rectangle; it never resolves if
    /// the server stays silent.
    pub async fn request_update(&self, corner_a: (u16, u16), corner_b: (u16, u16)) -> SessionResult<UpdateRequest> {
        if !self.is_open() {
            return Err(SessionError::new("request update", SessionErrorKind::Closed));
        }

        let rect = Rectangle::from_corners(corner_a.0, corner_a.1, corner_b.0, corner_b.1);

        let rx = self.inner.pending.register(rect)?;

        let request = FramebufferUpdateRequest {
            incremental: false,
            rect,
        };

        if let Err(e) = self.send(&request).await {
            self.inner.pending.forget(rect);
            return Err(e);
        }

        trace!(?rect, "Update requested");

        Ok(UpdateRequest { rect, rx })
    }

    pub async fn key_event(&self, key: u32, down: bool) -> SessionResult<()> {
        self.send(&KeyEvent { down, key }).await
    }

    /// Sends the client clipboard content to the server.
    pub async fn clipboard_update(&self, text: &str) -> SessionResult<()> {
        self.send(&ClientCutText { text: text.to_owned() }).await
    }

    /// Updates the persistent button mask and returns the full new state.
    pub(crate) fn update_buttons(&self, button: PointerButtons, down: bool) -> PointerButtons {
        let mut guard = match self.inner.buttons.lock() {
            Ok(guard) => guard,
            Err(e) => e.into_inner(),
        };

        if down {
            guard.insert(button);
        } else {
            guard.remove(button);
        }

        *guard
    }

    /// Closes the session: drops the write half, stops the dispatcher, fails
    /// pending update requests and fires `on_close` exactly once.
    ///
    /// Idempotent, and safe to call concurrently with in-flight requests.
    pub async fn end(&self) {
        if self.inner.open.swap(false, Ordering::SeqCst) {
            debug!("Ending session");
            self.inner.cancel.cancel();
            *self.inner.writer.lock().await = None;
        }

        self.inner.pending.fail_all();
        self.inner.fire_close();
    }
}
