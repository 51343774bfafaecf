//! Integration tests for the command session
//!
//! Drives `CommandSession` end to end through a scripted mock device and
//! through the in-memory transport.

use bytes::Bytes;
use dm_bridge::codec::{decode_basic, decode_extended, encode_basic, encode_extended, ProtocolVariant};
use dm_bridge::commands::{self, opcode, Command};
use dm_bridge::error::Error;
use dm_bridge::pixel::{self, Animation, Raster, Rgb};
use dm_bridge::session::{CommandSession, CorrelatorState, SessionConfig};
use dm_bridge::transport::memory::{NAME_UUID, NOTIFY_UUID, WRITE_UUID};
use dm_bridge::transport::{Characteristic, MemoryTransport, Properties, Transport};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// =============================================================================
// Mock Transport
// =============================================================================

const MOCK_WRITE: &str = "mock-write";
const MOCK_NOTIFY: &str = "mock-notify";
const MOCK_SERIAL: &str = "mock-serial";
const MOCK_FIRMWARE: &str = "mock-firmware";

/// Scripted device: answers a fixed set of opcodes, records all I/O
#[derive(Clone, Default)]
struct MockDevice {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    reads: Arc<Mutex<Vec<String>>>,
    notify: Arc<Mutex<Option<mpsc::Sender<Bytes>>>>,
    pending: Arc<Mutex<Vec<u8>>>,
    /// Answer with these (opcode → payload) once a full frame arrives
    answers: Arc<Mutex<Vec<(u8, Vec<u8>)>>>,
}

impl MockDevice {
    fn answer(&self, opcode: u8, payload: &[u8]) {
        self.answers.lock().unwrap().push((opcode, payload.to_vec()));
    }

    fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }

    /// Reassemble chunks; reply once a complete Basic frame is buffered
    fn on_chunk(&self, data: &[u8]) {
        let reply = {
            let mut pending = self.pending.lock().unwrap();
            pending.extend_from_slice(data);
            // start byte + length field + counted bytes + end byte
            let complete = pending.len() >= 3
                && pending.len() == u16::from_le_bytes([pending[1], pending[2]]) as usize + 4;
            if !complete {
                return;
            }
            let request = match decode_basic(&pending) {
                Ok(request) => request,
                Err(_) => return,
            };
            pending.clear();

            let answers = self.answers.lock().unwrap();
            answers
                .iter()
                .find(|(op, _)| *op == request.opcode)
                .map(|(op, payload)| encode_basic(*op, payload).unwrap())
        };

        if let Some(reply) = reply {
            if let Some(tx) = self.notify.lock().unwrap().as_ref() {
                let _ = tx.try_send(Bytes::from(reply));
            }
        }
    }
}

impl Transport for MockDevice {
    async fn connect(&self) -> dm_bridge::Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> dm_bridge::Result<()> {
        self.notify.lock().unwrap().take();
        Ok(())
    }

    fn characteristics(&self) -> Vec<Characteristic> {
        let readable = Properties {
            read: true,
            ..Default::default()
        };
        vec![
            Characteristic::new(MOCK_SERIAL, readable),
            Characteristic::new(
                MOCK_WRITE,
                Properties {
                    write_without_response: true,
                    ..Default::default()
                },
            ),
            Characteristic::new(
                MOCK_NOTIFY,
                Properties {
                    notify: true,
                    ..Default::default()
                },
            ),
            Characteristic::new(MOCK_FIRMWARE, readable),
        ]
    }

    async fn write(&self, uuid: &str, data: &[u8]) -> dm_bridge::Result<()> {
        assert_eq!(uuid, MOCK_WRITE);
        self.writes.lock().unwrap().push(data.to_vec());
        self.on_chunk(data);
        Ok(())
    }

    async fn read(&self, uuid: &str) -> dm_bridge::Result<Bytes> {
        self.reads.lock().unwrap().push(uuid.to_string());
        Ok(Bytes::from(uuid.as_bytes().to_vec()))
    }

    async fn subscribe(&self, uuid: &str) -> dm_bridge::Result<mpsc::Receiver<Bytes>> {
        assert_eq!(uuid, MOCK_NOTIFY);
        let (tx, rx) = mpsc::channel(16);
        *self.notify.lock().unwrap() = Some(tx);
        Ok(rx)
    }
}

fn config(chunk_size: usize) -> SessionConfig {
    SessionConfig {
        chunk_size,
        write_pause: Duration::from_millis(1),
        ..Default::default()
    }
}

// =============================================================================
// Mock device tests
// =============================================================================

#[tokio::test]
async fn test_session_picks_endpoints_by_capability() {
    let device = MockDevice::default();
    let session = CommandSession::open(device, config(200)).await.unwrap();

    assert_eq!(session.endpoints().write, MOCK_WRITE);
    assert_eq!(session.endpoints().notify, MOCK_NOTIFY);
    assert_eq!(
        session.readable_characteristics(),
        vec![MOCK_SERIAL, MOCK_FIRMWARE]
    );
}

#[tokio::test]
async fn test_request_through_chunked_writes() {
    let device = MockDevice::default();
    device.answer(opcode::SET_IMAGE, &[0x01]);
    let session = CommandSession::open(device.clone(), config(8)).await.unwrap();

    let args: Vec<u8> = (0..20).collect();
    let payload = session
        .send_and_wait(&Command::new(opcode::SET_IMAGE, args.clone()), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(payload.as_ref(), &[0x01]);

    // 27-byte frame in chunks of 8, written in order
    let writes = device.writes();
    let sizes: Vec<usize> = writes.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![8, 8, 8, 3]);
    assert_eq!(writes.concat(), encode_basic(opcode::SET_IMAGE, &args).unwrap());
}

#[tokio::test]
async fn test_get_view_timeout_reads_every_readable_characteristic() {
    let device = MockDevice::default();
    let session = CommandSession::open(device.clone(), config(200)).await.unwrap();

    let start = tokio::time::Instant::now();
    let err = session
        .send_and_wait(&commands::get_view(), Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(start.elapsed() >= Duration::from_secs(1));
    assert!(matches!(
        err,
        Error::Timeout {
            opcode: 0x46,
            after
        } if after == Duration::from_secs(1)
    ));
    assert_eq!(device.reads(), vec![MOCK_SERIAL, MOCK_FIRMWARE]);
    assert_eq!(session.state(), CorrelatorState::Idle);
}

#[tokio::test]
async fn test_get_view_returns_channel_and_brightness() {
    let device = MockDevice::default();
    device.answer(opcode::GET_VIEW, &[0x04, 0x2A, 0x55, 0x03, 0x50, 0x00]);
    let session = CommandSession::open(device, config(200)).await.unwrap();

    let payload = session.request(&commands::get_view()).await.unwrap();
    assert_eq!(payload.as_ref(), &[0x03, 0x50]);
}

#[tokio::test]
async fn test_unanswered_opcode_still_times_out_after_other_replies() {
    let device = MockDevice::default();
    device.answer(opcode::GET_VOLUME, &[0x09]);
    let session = CommandSession::open(device.clone(), config(200)).await.unwrap();

    assert_eq!(
        session.request(&commands::get_volume()).await.unwrap().as_ref(),
        &[0x09]
    );
    let err = session
        .send_and_wait(&commands::set_brightness(40), Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(session.stats().matched, 1);
    assert_eq!(session.stats().timeouts, 1);
}

// =============================================================================
// Memory transport tests
// =============================================================================

#[tokio::test]
async fn test_extended_session_end_to_end() {
    let device = MemoryTransport::standard();
    device.set_responder(|frame| {
        let request = decode_extended(frame).ok()?;
        encode_extended(request.opcode, &[0x0F], request.packet_number?).ok()
    });
    let session = CommandSession::open(
        device.clone(),
        SessionConfig {
            protocol: ProtocolVariant::Extended,
            write_pause: Duration::ZERO,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    session.send(&commands::set_volume(3)).await.unwrap();
    let payload = session.request(&commands::get_volume()).await.unwrap();
    assert_eq!(payload.as_ref(), &[0x0F]);

    let packets: Vec<Option<u32>> = device
        .writes()
        .iter()
        .map(|(_, data)| decode_extended(data).unwrap().packet_number)
        .collect();
    assert_eq!(packets, vec![Some(0), Some(1)]);
}

#[tokio::test]
async fn test_write_failure_is_transport_error() {
    let device = MemoryTransport::standard();
    let session = CommandSession::open(device.clone(), SessionConfig::default())
        .await
        .unwrap();
    device.fail_writes(true);

    let err = session
        .send_and_wait(&commands::get_volume(), Duration::from_secs(5))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport { .. }));
    assert_eq!(session.state(), CorrelatorState::Idle);
}

#[tokio::test]
async fn test_notifications_from_device_feed_correlator() {
    let device = MemoryTransport::standard();
    let session = CommandSession::open(device.clone(), SessionConfig::default())
        .await
        .unwrap();

    // Unsolicited and malformed traffic before the request is ignored
    assert!(device.notify(NOTIFY_UUID, encode_basic(0x0B, &[1]).unwrap()));
    assert!(device.notify(NOTIFY_UUID, vec![0xFF, 0x00]));

    let pusher = device.clone();
    let responder = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        pusher.notify(NOTIFY_UUID, encode_basic(0x09, &[0x05]).unwrap())
    });

    let payload = session
        .send_and_wait(&commands::get_volume(), Duration::from_secs(1))
        .await
        .unwrap();
    assert!(responder.await.unwrap());
    assert_eq!(payload.as_ref(), &[0x05]);

    let stats = session.stats();
    assert_eq!(stats.notifications, 3);
    assert_eq!(stats.dropped, 1);
    assert!(device.reads().iter().all(|uuid| uuid != NAME_UUID));
}

#[tokio::test]
async fn test_image_upload_frame() {
    let device = MemoryTransport::standard();
    let session = CommandSession::open(
        device.clone(),
        SessionConfig {
            write_pause: Duration::ZERO,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let mut raster = Raster::filled(16, 16, Rgb::BLACK);
    raster.set(0, 0, Rgb::new(255, 0, 0));
    raster.set(15, 15, Rgb::new(0, 255, 0));
    session.show_image(&raster).await.unwrap();

    let frame = decode_basic(&device.written_bytes(WRITE_UUID)).unwrap();
    assert_eq!(frame.opcode, opcode::SET_IMAGE);
    assert!(frame.checksum_valid());

    let payload = pixel::encode_static(&raster).unwrap();
    // three colors → 2 bits per pixel → 64 bytes of indices
    assert_eq!(payload.len(), 7 + 9 + 64);
    assert_eq!(&frame.payload[5..], payload.as_slice());
}

#[tokio::test]
async fn test_animation_parts_reassemble() {
    let device = MemoryTransport::standard();
    let session = CommandSession::open(
        device.clone(),
        SessionConfig {
            write_pause: Duration::ZERO,
            frame_part_size: 50,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let mut animation = Animation::new();
    for color in [Rgb::new(255, 0, 0), Rgb::new(0, 255, 0), Rgb::new(0, 0, 255)] {
        animation.push(Raster::filled(16, 16, color), 200);
    }
    session.show_animation(&animation).await.unwrap();

    let mut stream = Vec::new();
    for (_, data) in device.writes() {
        let frame = decode_basic(&data).unwrap();
        assert_eq!(frame.opcode, opcode::SET_ANIMATION_FRAME);
        stream.extend_from_slice(&frame.payload[5..]);
    }
    let expected = pixel::encode_animation(&animation).unwrap().concat();
    assert_eq!(stream, expected);
}

#[tokio::test]
async fn test_wrong_panel_size_is_rejected_before_writing() {
    let device = MemoryTransport::standard();
    let session = CommandSession::open(device.clone(), SessionConfig::default())
        .await
        .unwrap();

    let err = session.show_image(&Raster::new(32, 32)).await.unwrap_err();
    assert!(matches!(err, Error::Encoding(_)));
    assert!(device.writes().is_empty());
}
