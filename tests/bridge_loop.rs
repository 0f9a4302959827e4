//! Bridge loop over in-memory and loopback TCP transports

mod common;

use approx::assert_abs_diff_eq;
use common::{Call, Recorder};
use hasta_bridge::Error;
use hasta_bridge::bridge::{self, Bridge, ConnectionState};
use hasta_bridge::config::{Config, EgressMode};
use hasta_bridge::core::{ColorSpace, ImageFrame, Limb, Resolution, Vec3};
use hasta_bridge::devices::mock::create_mock_device;
use hasta_bridge::session::ActuatorSession;
use hasta_bridge::streaming::{Framing, IMAGE_TAG, MockTransport};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

fn test_config(egress: EgressMode) -> Config {
    let mut config = Config::default();
    config.bridge.egress = egress;
    config.bridge.tick_ms = 1;
    config.bridge.move_ack = false;
    config
}

fn test_frame() -> ImageFrame {
    ImageFrame {
        width: 2,
        height: 2,
        color_space: ColorSpace::Rgb,
        data: (0u8..12).collect(),
    }
}

/// Connected bridge plus an open session on a recording robot
fn connected(config: &Config, recorder: &Recorder) -> (Bridge, ActuatorSession) {
    let camera = (config.bridge.egress == EgressMode::Image).then_some(&config.camera);
    let session = ActuatorSession::open(recorder.device(), &config.session, camera).unwrap();
    recorder.clear();

    let mut bridge = Bridge::new(config, Arc::new(AtomicBool::new(true)));
    bridge.attach("test-peer").unwrap();
    (bridge, session)
}

#[test]
fn test_idle_step_keeps_connection() {
    let config = test_config(EgressMode::Off);
    let recorder = Recorder::new();
    let (mut bridge, mut session) = connected(&config, &recorder);
    let mut transport = MockTransport::new();

    for _ in 0..5 {
        bridge.step(&mut transport, &mut session).unwrap();
    }
    assert_eq!(bridge.state(), ConnectionState::Connected);
    assert!(recorder.calls().is_empty());
    assert!(transport.sent_messages().is_empty());
}

#[test]
fn test_disconnect_closes_connection() {
    let config = test_config(EgressMode::Off);
    let recorder = Recorder::new();
    let (mut bridge, mut session) = connected(&config, &recorder);
    let mut transport = MockTransport::new();
    transport.inject_read(b"SAY|bye\nDISCONNECT\nSAY|never\n");

    bridge.step(&mut transport, &mut session).unwrap();
    assert_eq!(bridge.state(), ConnectionState::Closed);
    assert_eq!(recorder.spoken(), vec!["bye".to_string()]);

    // Closed is terminal
    assert!(matches!(
        bridge.step(&mut transport, &mut session),
        Err(Error::InvalidState(_))
    ));
}

#[test]
fn test_peer_close_closes_connection() {
    let config = test_config(EgressMode::Off);
    let recorder = Recorder::new();
    let (mut bridge, mut session) = connected(&config, &recorder);
    let mut transport = MockTransport::new();
    transport.inject_read(b"SAY|last words\n");
    transport.close_peer();

    bridge.step(&mut transport, &mut session).unwrap();
    assert_eq!(bridge.state(), ConnectionState::Connected);
    bridge.step(&mut transport, &mut session).unwrap();
    assert_eq!(bridge.state(), ConnectionState::Closed);
    assert_eq!(recorder.spoken(), vec!["last words".to_string()]);
}

#[test]
fn test_image_egress_each_tick() {
    let config = test_config(EgressMode::Image);
    let recorder = Recorder::new();
    recorder.set_frame(test_frame());
    let (mut bridge, mut session) = connected(&config, &recorder);
    let mut transport = MockTransport::new();

    bridge.step(&mut transport, &mut session).unwrap();
    bridge.step(&mut transport, &mut session).unwrap();

    let sent = transport.sent_messages();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].starts_with(IMAGE_TAG.as_bytes()));
    assert_eq!(&sent[0][IMAGE_TAG.len()..], test_frame().data.as_slice());
    assert_eq!(bridge.sent(), 2);
    assert_eq!(recorder.count(|c| *c == Call::ReleaseFrame), 2);
}

#[test]
fn test_length_prefixed_image() {
    let mut config = test_config(EgressMode::Image);
    config.bridge.framing = Framing::LengthPrefixed;
    let recorder = Recorder::new();
    recorder.set_frame(test_frame());
    let (mut bridge, mut session) = connected(&config, &recorder);
    let mut transport = MockTransport::new();

    bridge.step(&mut transport, &mut session).unwrap();

    let message = &transport.sent_messages()[0];
    let expected_len = (IMAGE_TAG.len() + 12) as u32;
    assert_eq!(&message[..4], &expected_len.to_be_bytes());
    assert_eq!(&message[4..8], IMAGE_TAG.as_bytes());
    assert_eq!(message.len(), 4 + expected_len as usize);
}

#[test]
fn test_refused_sends_are_dropped() {
    let config = test_config(EgressMode::Image);
    let recorder = Recorder::new();
    recorder.set_frame(test_frame());
    let (mut bridge, mut session) = connected(&config, &recorder);
    let mut transport = MockTransport::new();
    transport.refuse_sends(true);

    for _ in 0..3 {
        bridge.step(&mut transport, &mut session).unwrap();
    }
    assert_eq!(bridge.state(), ConnectionState::Connected);
    assert_eq!(bridge.dropped(), 3);
    assert_eq!(bridge.sent(), 0);
    assert_eq!(transport.rejected_sends(), 3);
    // Frames are still handed back
    assert_eq!(recorder.count(|c| *c == Call::ReleaseFrame), 3);
}

#[test]
fn test_no_frame_no_message() {
    let config = test_config(EgressMode::Image);
    let recorder = Recorder::new();
    let (mut bridge, mut session) = connected(&config, &recorder);
    let mut transport = MockTransport::new();

    bridge.step(&mut transport, &mut session).unwrap();
    assert!(transport.sent_messages().is_empty());
    assert_eq!(recorder.count(|c| *c == Call::ReleaseFrame), 0);
}

#[test]
fn test_telemetry_egress() {
    let mut config = test_config(EgressMode::Telemetry);
    config.bridge.telemetry_limb = Limb::LeftArm;
    let recorder = Recorder::new();
    recorder.set_references(Vec3::new(0.5, -0.25, 1.0), Vec3::zero());
    let (mut bridge, mut session) = connected(&config, &recorder);
    let mut transport = MockTransport::new();

    bridge.step(&mut transport, &mut session).unwrap();

    assert_eq!(
        transport.sent_messages(),
        vec![b"LARM|0.5,-0.25,1,0,0,0\n".to_vec()]
    );
    // Telemetry never touches the camera
    assert_eq!(recorder.count(|c| *c == Call::GetFrame), 0);
}

#[test]
fn test_run_until_disconnect() {
    let config = test_config(EgressMode::Off);
    let recorder = Recorder::new();
    let (mut bridge, mut session) = connected(&config, &recorder);
    let mut transport = MockTransport::new();
    transport.inject_read(b"MOVE|RArm|(0,0,0)\n");
    transport.inject_read(b"DISCONNECT\n");

    bridge.run(&mut transport, &mut session).unwrap();
    assert_eq!(bridge.state(), ConnectionState::Closed);
    assert_eq!(recorder.moves().len(), 1);
}

#[test]
fn test_run_stops_on_shutdown_flag() {
    let config = test_config(EgressMode::Off);
    let recorder = Recorder::new();
    let session_config = config.session.clone();
    let mut session = ActuatorSession::open(recorder.device(), &session_config, None).unwrap();

    let mut bridge = Bridge::new(&config, Arc::new(AtomicBool::new(false)));
    bridge.attach("test-peer").unwrap();
    let mut transport = MockTransport::new();
    transport.inject_read(b"SAY|unheard\n");

    bridge.run(&mut transport, &mut session).unwrap();
    assert_eq!(bridge.state(), ConnectionState::Closed);
    assert!(!recorder.spoken().contains(&"unheard".to_string()));
}

#[test]
fn test_greeting_uses_say_path() {
    let config = test_config(EgressMode::Off);
    let recorder = Recorder::new();
    let (mut bridge, mut session) = connected(&config, &recorder);

    bridge.greet("Connected to robot", &mut session);
    bridge.greet("", &mut session);
    assert_eq!(recorder.spoken(), vec!["Connected to robot".to_string()]);
}

#[test]
fn test_move_split_across_reads() {
    let mut config = test_config(EgressMode::Off);
    config.network.recv_buffer_size = 24;
    let recorder = Recorder::new();
    let (mut bridge, mut session) = connected(&config, &recorder);
    let mut transport = MockTransport::new();
    transport.inject_read(b"MOVE|LArm|(0.10,0.00,0.05)\n");

    bridge.step(&mut transport, &mut session).unwrap();
    assert!(recorder.moves().is_empty());
    bridge.step(&mut transport, &mut session).unwrap();

    let moves = recorder.moves();
    assert_eq!(moves.len(), 1);
    let (_, target, _) = moves[0];
    assert_abs_diff_eq!(target.x, 0.0105, epsilon = 1e-6);
    assert_abs_diff_eq!(target.y, -0.021, epsilon = 1e-6);
    assert_abs_diff_eq!(target.z, 0.0, epsilon = 1e-6);
}

#[test]
fn test_disconnect_split_across_reads() {
    let mut config = test_config(EgressMode::Off);
    config.network.recv_buffer_size = 5;
    let recorder = Recorder::new();
    let (mut bridge, mut session) = connected(&config, &recorder);
    let mut transport = MockTransport::new();
    transport.inject_read(b"DISCONNECT\n");

    for _ in 0..2 {
        bridge.step(&mut transport, &mut session).unwrap();
        assert_eq!(bridge.state(), ConnectionState::Connected);
    }
    bridge.step(&mut transport, &mut session).unwrap();
    assert_eq!(bridge.state(), ConnectionState::Closed);
}

#[test]
fn test_multibyte_text_split_across_reads() {
    let mut config = test_config(EgressMode::Off);
    config.network.recv_buffer_size = 7;
    let recorder = Recorder::new();
    let (mut bridge, mut session) = connected(&config, &recorder);
    let mut transport = MockTransport::new();
    // Byte 7 falls inside "ü"
    transport.inject_read("SAY|grüß dich\n".as_bytes());

    for _ in 0..3 {
        bridge.step(&mut transport, &mut session).unwrap();
    }
    assert_eq!(recorder.spoken(), vec!["grüß dich".to_string()]);
}

#[test]
fn test_unterminated_line_runs_on_peer_close() {
    let config = test_config(EgressMode::Off);
    let recorder = Recorder::new();
    let (mut bridge, mut session) = connected(&config, &recorder);
    let mut transport = MockTransport::new();
    transport.inject_read(b"SAY|one\nSAY|two");
    transport.close_peer();

    bridge.step(&mut transport, &mut session).unwrap();
    assert_eq!(recorder.spoken(), vec!["one".to_string()]);
    bridge.step(&mut transport, &mut session).unwrap();
    assert_eq!(bridge.state(), ConnectionState::Closed);
    assert_eq!(recorder.spoken(), vec!["one".to_string(), "two".to_string()]);
}

#[test]
fn test_receive_error_closes_and_releases_robot() {
    let config = test_config(EgressMode::Image);
    let recorder = Recorder::new();
    let mut bridge = Bridge::new(&config, Arc::new(AtomicBool::new(true)));
    bridge.attach("test-peer").unwrap();
    let mut transport = MockTransport::new();
    transport.fail_receive(true);

    let result =
        bridge::serve_connection(&mut bridge, &mut transport, recorder.device(), &config);
    assert!(matches!(result, Err(Error::Io(_))));
    assert_eq!(bridge.state(), ConnectionState::Closed);

    let teardown: Vec<Call> = recorder
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Unsubscribe | Call::Rest))
        .collect();
    assert_eq!(teardown, vec![Call::Unsubscribe, Call::Rest]);
}

#[test]
fn test_flush_failure_is_not_a_drop() {
    let config = test_config(EgressMode::Image);
    let recorder = Recorder::new();
    recorder.set_frame(test_frame());
    let (mut bridge, mut session) = connected(&config, &recorder);
    let mut transport = MockTransport::new();
    transport.fail_flush(true);

    bridge.step(&mut transport, &mut session).unwrap();
    assert_eq!(bridge.sent(), 1);
    assert_eq!(bridge.dropped(), 0);
    assert_eq!(bridge.flush_errors(), 1);
    assert_eq!(bridge.state(), ConnectionState::Connected);
}

#[test]
fn test_serve_loopback_with_mock_robot() {
    let mut config = test_config(EgressMode::Image);
    config.bridge.tick_ms = 5;
    config.camera.resolution = Resolution::Qqvga;
    config.device.simulation.random_seed = 11;

    let (device, inspector) = create_mock_device(&config.device).unwrap();
    let listener = bridge::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let running = Arc::new(AtomicBool::new(true));

    let server = {
        let config = config.clone();
        let running = Arc::clone(&running);
        thread::spawn(move || bridge::serve(listener, device, &config, running))
    };

    let mut client = TcpStream::connect(addr).unwrap();
    client
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    client.write_all(b"SAY|hi\n").unwrap();

    // First image means the loop is running
    let mut head = [0u8; 4];
    client.read_exact(&mut head).unwrap();
    assert_eq!(&head, IMAGE_TAG.as_bytes());

    client.write_all(b"DISCONNECT\n").unwrap();
    let mut rest = Vec::new();
    // Server shutdown ends the stream; a reset is also acceptable here
    let _ = client.read_to_end(&mut rest);

    server.join().unwrap().unwrap();

    let spoken = inspector.spoken();
    assert_eq!(spoken[0], "Connected to robot");
    assert!(spoken.contains(&"hi".to_string()));
    assert!(!inspector.is_awake());
    assert_eq!(inspector.posture(), "Crouch");
}
