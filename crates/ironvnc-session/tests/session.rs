use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ironvnc_core::encode_vec;
use ironvnc_pdu::geometry::Rectangle;
use ironvnc_pdu::handshake::{PixelFormat, ProtocolVersion};
use ironvnc_pdu::server::{RectanglePayload, ServerMessage, UpdateRectangle};
use ironvnc_session::{
    Config, ConnectionResult, DesktopSize, PointerButtons, Session, SessionError, SessionErrorKind,
    SessionEventHandler, keys,
};
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _, DuplexStream};

fn rgb32() -> PixelFormat {
    PixelFormat {
        bits_per_pixel: 32,
        depth: 24,
        big_endian: false,
        true_color: true,
        red_max: 255,
        green_max: 255,
        blue_max: 255,
        red_shift: 16,
        green_shift: 8,
        blue_shift: 0,
    }
}

fn connection_result() -> ConnectionResult {
    ConnectionResult {
        version: ProtocolVersion::RFB_3_8,
        desktop_size: DesktopSize { width: 800, height: 600 },
        pixel_format: rgb32(),
        server_name: "test server".to_owned(),
    }
}

#[derive(Default)]
struct Recording {
    connected: Mutex<Vec<String>>,
    closes: AtomicUsize,
    errors: Mutex<Vec<String>>,
    resizes: Mutex<Vec<DesktopSize>>,
    clipboard: Mutex<Vec<Vec<u8>>>,
    bells: AtomicUsize,
}

impl SessionEventHandler for Recording {
    fn on_connected(&self, result: &ConnectionResult) {
        self.connected.lock().unwrap().push(result.server_name.clone());
    }

    fn on_close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_error(&self, error: &SessionError) {
        self.errors.lock().unwrap().push(error.to_string());
    }

    fn on_resize(&self, size: DesktopSize) {
        self.resizes.lock().unwrap().push(size);
    }

    fn on_clipboard(&self, text: &[u8]) {
        self.clipboard.lock().unwrap().push(text.to_vec());
    }

    fn on_bell(&self) {
        self.bells.fetch_add(1, Ordering::SeqCst);
    }
}

fn spawn_session() -> (Session, tokio::task::JoinHandle<ironvnc_session::SessionResult<()>>, DuplexStream, Arc<Recording>) {
    let (client, server) = tokio::io::duplex(1 << 20);
    let recording = Arc::new(Recording::default());
    let (session, task) = Session::spawn(client, connection_result(), recording.clone());

    (session, task, server, recording)
}

async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn update_request_resolves_with_decoded_pixels() {
    let (session, _task, mut server, _recording) = spawn_session();

    // Corners in any order; the wire rectangle is normalized.
    let request = session.request_update((140, 70), (20, 20)).await.unwrap();

    let expected_rect = Rectangle {
        x: 20,
        y: 20,
        width: 120,
        height: 50,
    };
    assert_eq!(request.rect(), expected_rect);

    let mut wire = [0u8; 10];
    server.read_exact(&mut wire).await.unwrap();
    assert_eq!(wire, [3, 0, 0, 20, 0, 20, 0, 120, 0, 50]);

    // Little endian 0x11223344 per pixel: rgba (0x22, 0x33, 0x44, 0x11).
    let pixels: Vec<u8> = [0x44, 0x33, 0x22, 0x11].repeat(120 * 50);
    let reply = ServerMessage::FramebufferUpdate(vec![UpdateRectangle {
        rect: expected_rect,
        payload: RectanglePayload::Raw { pixels },
    }]);
    server.write_all(&encode_vec(&reply).unwrap()).await.unwrap();

    let region = request.wait().await.unwrap();

    assert_eq!(region.rect, expected_rect);
    assert_eq!(region.rgba.len(), 120 * 50 * 4);
    assert_eq!(&region.rgba[..4], [0x22, 0x33, 0x44, 0x11]);
}

#[tokio::test]
async fn duplicate_update_request_is_refused() {
    let (session, _task, _server, _recording) = spawn_session();

    let _pending = session.request_update((0, 0), (100, 100)).await.unwrap();
    let err = session.request_update((0, 0), (100, 100)).await.unwrap_err();

    assert!(matches!(err.kind(), SessionErrorKind::UpdateConflict));
}

#[tokio::test]
async fn unsolicited_rectangles_are_discarded() {
    let (session, _task, mut server, recording) = spawn_session();

    let unsolicited = ServerMessage::FramebufferUpdate(vec![UpdateRectangle {
        rect: Rectangle {
            x: 5,
            y: 5,
            width: 1,
            height: 1,
        },
        payload: RectanglePayload::Raw { pixels: vec![0; 4] },
    }]);
    server.write_all(&encode_vec(&unsolicited).unwrap()).await.unwrap();
    server.write_all(&[2]).await.unwrap(); // Bell

    let request = session.request_update((0, 0), (2, 2)).await.unwrap();

    let mut wire = [0u8; 10];
    server.read_exact(&mut wire).await.unwrap();

    let reply = ServerMessage::FramebufferUpdate(vec![UpdateRectangle {
        rect: request.rect(),
        payload: RectanglePayload::Raw { pixels: vec![0xff; 16] },
    }]);
    server.write_all(&encode_vec(&reply).unwrap()).await.unwrap();

    let region = request.wait().await.unwrap();

    // The solicited rectangle arrived intact and the unsolicited one was
    // consumed without disturbing the stream.
    assert_eq!(region.rgba, vec![0xff; 16]);
    assert_eq!(recording.bells.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pointer_transitions_accumulate_buttons() {
    let (session, _task, mut server, _recording) = spawn_session();

    session.pointer_down(10, 20, PointerButtons::LEFT).await.unwrap();
    session.pointer_down(10, 20, PointerButtons::RIGHT).await.unwrap();
    session.pointer_up(10, 20, PointerButtons::LEFT).await.unwrap();

    let mut wire = [0u8; 18];
    server.read_exact(&mut wire).await.unwrap();

    assert_eq!(
        wire,
        [
            5, 0x01, 0, 10, 0, 20, // left pressed
            5, 0x05, 0, 10, 0, 20, // right joins it
            5, 0x04, 0, 10, 0, 20, // left released, right still held
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn key_combination_paces_transitions() {
    let (session, _task, mut server, _recording) = spawn_session();

    let start = tokio::time::Instant::now();
    session.key("a", &[keys::CONTROL_LEFT]).await.unwrap();

    // Four transitions, each followed by the standard pause.
    assert_eq!(start.elapsed(), Duration::from_millis(200));

    let mut wire = [0u8; 32];
    server.read_exact(&mut wire).await.unwrap();

    assert_eq!(
        wire,
        [
            4, 1, 0, 0, 0x00, 0x00, 0xff, 0xe3, // control down
            4, 1, 0, 0, 0x00, 0x00, 0x00, 0x61, // 'a' down
            4, 0, 0, 0, 0x00, 0x00, 0x00, 0x61, // 'a' up
            4, 0, 0, 0, 0x00, 0x00, 0xff, 0xe3, // control up
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn double_click_pause_is_configurable() {
    let (session, _task, mut server, _recording) = spawn_session();

    let start = tokio::time::Instant::now();
    session.double_click(8, 9, PointerButtons::LEFT).await.unwrap();
    assert_eq!(start.elapsed(), Duration::from_millis(180));

    let start = tokio::time::Instant::now();
    session
        .double_click_with_delay(8, 9, PointerButtons::LEFT, Duration::from_millis(30))
        .await
        .unwrap();
    assert_eq!(start.elapsed(), Duration::from_millis(30));

    // Two double clicks, four pointer transitions each.
    let mut wire = [0u8; 48];
    server.read_exact(&mut wire).await.unwrap();

    for click in wire.chunks_exact(12) {
        assert_eq!(
            click,
            [
                5, 0x01, 0, 8, 0, 9, // pressed
                5, 0x00, 0, 8, 0, 9, // released
            ]
        );
    }
}

#[tokio::test]
async fn key_rejects_multi_character_strings() {
    let (session, _task, _server, _recording) = spawn_session();

    let err = session.key("ab", &[]).await.unwrap_err();

    assert!(matches!(err.kind(), SessionErrorKind::InvalidArgument(_)));
}

#[tokio::test]
async fn end_is_idempotent_and_fails_pending_requests() {
    let (session, task, _server, recording) = spawn_session();

    let request = session.request_update((0, 0), (10, 10)).await.unwrap();

    session.end().await;
    session.end().await;

    assert!(!session.is_open());
    assert_eq!(recording.closes.load(Ordering::SeqCst), 1);

    let err = request.wait().await.unwrap_err();
    assert!(matches!(err.kind(), SessionErrorKind::Closed));

    let err = session.key_event(keys::RETURN, true).await.unwrap_err();
    assert!(matches!(err.kind(), SessionErrorKind::Closed));

    // The dispatcher exits cleanly on an orderly shutdown.
    assert!(task.await.unwrap().is_ok());
}

#[tokio::test]
async fn server_events_are_routed() {
    let (session, _task, mut server, recording) = spawn_session();

    let resize = ServerMessage::FramebufferUpdate(vec![UpdateRectangle {
        rect: Rectangle {
            x: 0,
            y: 0,
            width: 1024,
            height: 768,
        },
        payload: RectanglePayload::DesktopResize,
    }]);
    server.write_all(&encode_vec(&resize).unwrap()).await.unwrap();

    let cut_text = ServerMessage::ServerCutText("clip".to_owned());
    server.write_all(&encode_vec(&cut_text).unwrap()).await.unwrap();

    server.write_all(&[2]).await.unwrap(); // Bell

    wait_until(|| recording.bells.load(Ordering::SeqCst) == 1).await;

    let expected = DesktopSize {
        width: 1024,
        height: 768,
    };
    assert_eq!(*recording.resizes.lock().unwrap(), vec![expected]);
    assert_eq!(session.desktop_size(), expected);
    assert_eq!(*recording.clipboard.lock().unwrap(), vec![b"clip".to_vec()]);
}

#[tokio::test]
async fn unknown_encoding_is_fatal() {
    let (session, task, mut server, recording) = spawn_session();

    let mut wire = vec![0u8, 0, 0, 1]; // FramebufferUpdate, one rectangle
    wire.extend_from_slice(&[0, 0, 0, 0, 0, 1, 0, 1]); // 1x1 at the origin
    wire.extend_from_slice(&7i32.to_be_bytes()); // an encoding we never declared
    server.write_all(&wire).await.unwrap();

    let err = task.await.unwrap().unwrap_err();

    assert!(matches!(err.kind(), SessionErrorKind::UnsupportedEncoding(7)));
    assert_eq!(recording.errors.lock().unwrap().len(), 1);
    assert!(!session.is_open());
}

#[tokio::test]
async fn server_disconnect_surfaces_an_error() {
    let (session, task, server, recording) = spawn_session();

    let request = session.request_update((0, 0), (10, 10)).await.unwrap();

    drop(server);

    assert!(task.await.unwrap().is_err());
    assert_eq!(recording.errors.lock().unwrap().len(), 1);

    // Error and orderly shutdown are distinct; no close notification here.
    assert_eq!(recording.closes.load(Ordering::SeqCst), 0);
    assert!(!session.is_open());

    let err = request.wait().await.unwrap_err();
    assert!(matches!(err.kind(), SessionErrorKind::Closed));
}

#[tokio::test]
async fn handshake_leftover_reaches_the_dispatcher() {
    let (client, mut server) = tokio::io::duplex(1 << 16);

    let server_task = tokio::spawn(async move {
        server.write_all(b"RFB 003.008\n").await.unwrap();

        let mut version = [0u8; 12];
        server.read_exact(&mut version).await.unwrap();
        assert_eq!(&version, b"RFB 003.008\n");

        server.write_all(&[1, 1]).await.unwrap(); // one type: None

        let mut chosen = [0u8; 1];
        server.read_exact(&mut chosen).await.unwrap();
        assert_eq!(chosen, [1]);

        server.write_all(&[0, 0, 0, 0]).await.unwrap(); // SecurityResult OK

        let mut client_init = [0u8; 1];
        server.read_exact(&mut client_init).await.unwrap();
        assert_eq!(client_init, [1]);

        // ServerInit with a Bell appended in the same write, so the session
        // starts with leftover bytes past the handshake.
        let mut tail = Vec::new();
        tail.extend_from_slice(&800u16.to_be_bytes());
        tail.extend_from_slice(&600u16.to_be_bytes());
        tail.extend_from_slice(&[32, 24, 0, 1]);
        tail.extend_from_slice(&255u16.to_be_bytes());
        tail.extend_from_slice(&255u16.to_be_bytes());
        tail.extend_from_slice(&255u16.to_be_bytes());
        tail.extend_from_slice(&[16, 8, 0, 0, 0, 0]);
        tail.extend_from_slice(&4u32.to_be_bytes());
        tail.extend_from_slice(b"test");
        tail.push(2); // Bell
        server.write_all(&tail).await.unwrap();

        server
    });

    let mut framed = ironvnc_tokio::TokioFramed::new(client);
    let connector = ironvnc_connector::ClientConnector::new(Config::default());

    let result = ironvnc_async::connect(&mut framed, connector).await.unwrap();
    let (client, leftover) = framed.into_inner();

    let recording = Arc::new(Recording::default());
    let (session, _task) = Session::spawn_with_leftover(client, leftover, result, recording.clone());

    wait_until(|| recording.bells.load(Ordering::SeqCst) == 1).await;

    assert_eq!(*recording.connected.lock().unwrap(), vec!["test".to_owned()]);
    assert_eq!(session.server_name(), "test");
    assert_eq!(session.desktop_size(), DesktopSize { width: 800, height: 600 });
    assert_eq!(session.version(), ProtocolVersion::RFB_3_8);

    let _server = server_task.await.unwrap();
}
