use std::io;
use std::sync::Arc;

use ironvnc_connector::DesktopSize;
use ironvnc_core::{DecodeError, DecodeErrorKind, ReadCursor};
use ironvnc_graphics::{RawDecodeError, decode_raw};
use ironvnc_pdu::server::{RectanglePayload, ServerMessage, ServerMessageHint};

use crate::session::{FramebufferRegion, ReadFramed, SessionInner};
use crate::{SessionError, SessionErrorExt as _, SessionErrorKind, SessionResult};

/// Reads and routes server messages until the session ends or the stream
/// becomes unusable.
///
/// Runs as a dedicated task; every inbound message goes through here, so the
/// waiting side of update correlation never races another reader.
#[instrument(skip_all)]
pub(crate) async fn run(mut framed: ReadFramed, inner: Arc<SessionInner>) -> SessionResult<()> {
    let hint = ServerMessageHint {
        bytes_per_pixel: inner.pixel_format.bytes_per_pixel(),
    };

    debug!("Dispatcher started");

    loop {
        let frame = tokio::select! {
            () = inner.cancel.cancelled() => {
                debug!("Dispatcher stopped");
                return Ok(());
            }
            frame = framed.read_by_hint(&hint) => frame,
        };

        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                if !inner.is_open() {
                    // The session ended while the read was in flight.
                    debug!("Dispatcher stopped");
                    return Ok(());
                }

                return Err(fatal(&inner, map_read_error(e)));
            }
        };

        if let Err(e) = process_message(&inner, &frame) {
            return Err(fatal(&inner, e));
        }
    }
}

/// Reports the error to the handler and tears the session down.
///
/// `on_close` is not fired here; error and orderly shutdown are distinct
/// notifications.
fn fatal(inner: &SessionInner, error: SessionError) -> SessionError {
    inner.handler.on_error(&error);
    inner.abort();
    error
}

fn process_message(inner: &SessionInner, frame: &[u8]) -> SessionResult<()> {
    let mut cursor = ReadCursor::new(frame);
    let message =
        ServerMessage::decode(&mut cursor, inner.pixel_format.bytes_per_pixel()).map_err(SessionError::decode)?;

    match message {
        ServerMessage::FramebufferUpdate(rectangles) => {
            trace!(count = rectangles.len(), "Framebuffer update");

            for update in rectangles {
                let rect = update.rect;

                match update.payload {
                    RectanglePayload::Raw { pixels } => {
                        let rgba =
                            decode_raw(&pixels, &inner.pixel_format, rect.width, rect.height).map_err(map_raw_error)?;

                        if !inner.pending.resolve(rect, FramebufferRegion { rect, rgba }) {
                            // Nothing waits for it; servers may push updates
                            // we never asked for.
                            warn!(?rect, "Discarding unsolicited rectangle");
                        }
                    }
                    RectanglePayload::DesktopResize => {
                        let size = DesktopSize {
                            width: rect.width,
                            height: rect.height,
                        };

                        debug!(?size, "Desktop resized");

                        inner.set_desktop_size(size);
                        inner.handler.on_resize(size);
                    }
                }
            }
        }
        ServerMessage::SetColorMapEntries { first_color, colors_count } => {
            // Consumed for stream alignment only.
            debug!(first_color, colors_count, "Ignoring color map entries");
        }
        ServerMessage::Bell => inner.handler.on_bell(),
        ServerMessage::ServerCutText(text) => inner.handler.on_clipboard(text.as_bytes()),
    }

    Ok(())
}

/// Maps a framing error back to a session error.
///
/// The hint reports an unknown rectangle encoding through the read error, and
/// that case deserves its own kind: the message length is unknowable, so the
/// stream cannot be realigned.
fn map_read_error(e: io::Error) -> SessionError {
    if let Some(decode) = e.get_ref().and_then(|source| source.downcast_ref::<DecodeError>()) {
        if let DecodeErrorKind::UnsupportedValue { name: "encoding", value } = decode.kind() {
            if let Ok(encoding) = value.parse::<i32>() {
                return SessionError::new("read server message", SessionErrorKind::UnsupportedEncoding(encoding));
            }
        }
    }

    custom_err!("read server message", e)
}

fn map_raw_error(e: RawDecodeError) -> SessionError {
    match e {
        RawDecodeError::UnsupportedPixelFormat { bits_per_pixel } => SessionError::new(
            "decode rectangle",
            SessionErrorKind::UnsupportedPixelFormat { bits_per_pixel },
        ),
        e @ RawDecodeError::InvalidPayloadSize { .. } => custom_err!("decode rectangle", e),
    }
}
