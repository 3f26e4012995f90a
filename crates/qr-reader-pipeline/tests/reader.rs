mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::{
    events, frame, scripted_engine, Event, MockCamera, ScriptedSource, BLANK, CORRUPT, HELLO,
    THREE_SYMBOLS,
};
use qr_reader_pipeline::{
    CameraConfig, CameraPins, DataType, ExecutionContext, FrameBuffer, FrameSize, LoopState,
    PixelFormat, QrCodeReader, ReaderError, ReaderParams, Recognition, SetupError,
    PAYLOAD_CAPACITY,
};

const WAIT: Duration = Duration::from_secs(2);

fn fast_params() -> ReaderParams {
    ReaderParams {
        frame_interval_ms: 2,
        ..ReaderParams::default()
    }
}

fn reader_with(frames: Vec<FrameBuffer>, params: ReaderParams) -> (QrCodeReader, common::EventLog) {
    let (factory, _) = scripted_engine();
    let (source, log) = ScriptedSource::new(frames);
    let reader = QrCodeReader::builder()
        .params(params)
        .engine(factory)
        .frame_source(source)
        .build();
    (reader, log)
}

fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    done()
}

fn expect_symbol(item: Option<Recognition>) -> qr_reader_pipeline::DecodedSymbol {
    item.expect("result before timeout")
        .into_symbol()
        .expect("symbol, not degraded")
}

#[test]
fn hello_frame_is_decoded_end_to_end() {
    let (mut reader, _) = reader_with(vec![frame(HELLO)], fast_params());
    reader.start().expect("start");

    let symbol = expect_symbol(reader.receive_result(Duration::from_millis(1000)));
    assert!(symbol.is_valid());
    assert_eq!(symbol.payload(), b"HELLO");
    assert_eq!(symbol.payload_len(), 5);
    assert_eq!(symbol.data_type(), Some(DataType::Alphanumeric));
    assert_eq!(symbol.raw_payload()[5], 0);

    reader.stop();
}

#[test]
fn corrupted_frame_reports_invalid_symbol_with_reason() {
    let (mut reader, _) = reader_with(vec![frame(CORRUPT)], fast_params());
    reader.start().expect("start");

    let symbol = expect_symbol(reader.receive_result(Duration::from_millis(1000)));
    assert!(!symbol.is_valid());
    assert!(symbol.payload_len() > 0);
    assert!(symbol.payload_len() < PAYLOAD_CAPACITY);
    assert_eq!(symbol.payload_str(), Some("ECC failure"));
    assert_eq!(symbol.raw_payload()[symbol.payload_len()], 0);
}

#[test]
fn empty_frame_leaves_no_stale_result() {
    let (mut reader, log) = reader_with(vec![frame(HELLO), frame(BLANK)], fast_params());
    reader.start().expect("start");

    let first = expect_symbol(reader.receive_result(WAIT));
    assert_eq!(first.payload(), b"HELLO");

    assert!(wait_until(|| events(&log).contains(&Event::Released(2))));
    assert!(reader.receive_result(Duration::from_millis(50)).is_none());
}

#[test]
fn only_the_first_of_several_symbols_is_published() {
    let (mut reader, log) = reader_with(vec![frame(THREE_SYMBOLS)], fast_params());
    reader.start().expect("start");

    let symbol = expect_symbol(reader.receive_result(WAIT));
    assert_eq!(symbol.payload(), b"1");
    assert!(wait_until(|| events(&log).contains(&Event::Released(1))));
    assert!(reader.receive_result(Duration::from_millis(50)).is_none());
}

#[test]
fn max_symbols_param_publishes_every_symbol_in_order() {
    let params = ReaderParams {
        max_symbols_per_frame: 4,
        ..fast_params()
    };
    let (mut reader, _) = reader_with(vec![frame(THREE_SYMBOLS)], params);
    reader.start().expect("start");

    let payloads: Vec<Vec<u8>> = (0..3)
        .map(|_| expect_symbol(reader.receive_result(WAIT)).payload().to_vec())
        .collect();
    assert_eq!(payloads, vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);
}

#[test]
fn start_and_stop_are_idempotent() {
    let (mut reader, log) = reader_with(vec![frame(HELLO)], fast_params());

    reader.stop();
    assert_eq!(reader.state(), LoopState::NotStarted);

    reader.start().expect("first start");
    reader.start().expect("second start");
    assert!(reader.is_started());

    assert!(reader.receive_result(WAIT).is_some());
    assert!(reader.receive_result(Duration::from_millis(50)).is_none());
    assert_eq!(
        events(&log)
            .iter()
            .filter(|e| matches!(e, Event::Acquired(_)))
            .count(),
        1
    );

    reader.stop();
    reader.stop();
    assert_eq!(reader.state(), LoopState::Stopped);
}

#[test]
fn restart_reuses_decoder_without_resizing() {
    let (factory, resizes) = scripted_engine();
    let (source, _) = ScriptedSource::new(vec![frame(HELLO), frame(HELLO)]);
    let mut reader = QrCodeReader::builder()
        .params(fast_params())
        .engine(factory)
        .frame_source(source)
        .build();

    reader.start().expect("start");
    assert!(reader.receive_result(WAIT).is_some());
    reader.stop();
    assert!(!reader.is_started());

    reader
        .start_on(&ExecutionContext::default().with_name("restart"))
        .expect("restart");
    assert!(reader.is_started());
    assert!(wait_until(|| reader.mailbox_stats().published == 2));
    reader.stop();

    assert_eq!(resizes.load(Ordering::SeqCst), 1);
}

#[test]
fn same_sized_frames_resize_once() {
    let (factory, resizes) = scripted_engine();
    let (source, log) = ScriptedSource::new(vec![frame(HELLO), frame(BLANK), frame(HELLO)]);
    let mut reader = QrCodeReader::builder()
        .params(fast_params())
        .engine(factory)
        .frame_source(source)
        .build();
    reader.start().expect("start");

    assert!(reader.receive_result(WAIT).is_some());
    assert!(reader.receive_result(WAIT).is_some());
    assert!(wait_until(|| events(&log).contains(&Event::Released(3))));
    assert_eq!(resizes.load(Ordering::SeqCst), 1);
}

#[test]
fn competing_consumers_split_results() {
    const N: usize = 10;
    let frames = (0..N).map(|_| frame(HELLO)).collect();
    let (mut reader, _) = reader_with(frames, fast_params());

    let consumers: Vec<_> = (0..2)
        .map(|_| {
            let receiver = reader.receiver();
            thread::spawn(move || {
                let mut got = 0usize;
                while receiver.receive(Duration::from_millis(300)).is_some() {
                    got += 1;
                }
                got
            })
        })
        .collect();

    reader.start().expect("start");
    let total: usize = consumers
        .into_iter()
        .map(|c| c.join().expect("consumer"))
        .sum();
    assert_eq!(total, N);
    assert_eq!(reader.mailbox_stats().dropped, 0);
}

#[test]
fn full_mailbox_drops_new_results() {
    let params = ReaderParams {
        queue_capacity: 1,
        ..fast_params()
    };
    let frames = vec![frame(HELLO), frame(CORRUPT), frame(CORRUPT)];
    let (mut reader, log) = reader_with(frames, params);
    reader.start().expect("start");

    assert!(wait_until(|| events(&log).contains(&Event::Released(3))));
    reader.stop();

    let stats = reader.mailbox_stats();
    assert_eq!(stats.published, 1);
    assert_eq!(stats.dropped, 2);
    let kept = expect_symbol(reader.receiver().try_receive());
    assert_eq!(kept.payload(), b"HELLO");
}

#[test]
fn short_frame_is_reported_as_degraded() {
    let short = FrameBuffer::new(16, 16, vec![0; 10]);
    let (mut reader, log) = reader_with(vec![short, frame(HELLO)], fast_params());
    reader.start().expect("start");

    match reader.receive_result(WAIT).expect("degraded item") {
        Recognition::Degraded {
            width,
            height,
            reason,
        } => {
            assert_eq!((width, height), (16, 16));
            assert!(reason.contains("too short"));
        }
        other => panic!("expected degraded result, got {other:?}"),
    }
    assert!(events(&log).contains(&Event::Released(1)));

    let symbol = expect_symbol(reader.receive_result(WAIT));
    assert_eq!(symbol.payload(), b"HELLO");
}

#[test]
fn observer_sees_each_frame_before_release() {
    let (factory, _) = scripted_engine();
    let (source, log) = ScriptedSource::new(vec![frame(HELLO), frame(BLANK)]);
    let observed = Arc::clone(&log);
    let mut reader = QrCodeReader::builder()
        .params(fast_params())
        .engine(factory)
        .frame_source(source)
        .on_frame(move |frame| {
            let view = frame.view().expect("frame view");
            assert_eq!((view.width, view.height), (16, 16));
            assert_eq!(view.pixels().len(), 256);
            observed
                .lock()
                .expect("event log")
                .push(Event::Observed(frame.sequence));
        })
        .build();
    reader.start().expect("start");

    assert!(wait_until(|| events(&log).contains(&Event::Released(2))));
    reader.stop();
    assert_eq!(
        events(&log),
        vec![
            Event::Acquired(1),
            Event::Observed(1),
            Event::Released(1),
            Event::Acquired(2),
            Event::Observed(2),
            Event::Released(2),
        ]
    );
}

#[test]
fn debug_toggle_does_not_change_results() {
    let (mut reader, _) = reader_with(vec![frame(HELLO), frame(HELLO)], fast_params());
    reader.set_debug(true);
    reader.start().expect("start");
    assert_eq!(expect_symbol(reader.receive_result(WAIT)).payload(), b"HELLO");
    reader.set_debug(false);
    assert_eq!(expect_symbol(reader.receive_result(WAIT)).payload(), b"HELLO");
}

#[test]
fn setup_applies_camera_config_and_feeds_the_loop() {
    let (factory, _) = scripted_engine();
    let config = CameraConfig::new(CameraPins::WROVER_KIT, FrameSize::Vga).with_jpeg_quality(12);
    let mut reader = QrCodeReader::builder()
        .params(fast_params())
        .camera_config(config.clone())
        .engine(factory)
        .build();

    let mut camera = MockCamera {
        frames: vec![frame(HELLO)],
        ..MockCamera::default()
    };
    reader.setup(&mut camera).expect("setup");
    assert_eq!(camera.applied, Some(config));
    assert_eq!(reader.setup(&mut camera), Err(SetupError::AlreadySetUp));

    reader.start().expect("start");
    assert_eq!(expect_symbol(reader.receive_result(WAIT)).payload(), b"HELLO");
}

#[test]
fn setup_failures_leave_reader_unstartable() {
    let mut reader = QrCodeReader::new();
    let mut camera = MockCamera {
        no_external_memory: true,
        ..MockCamera::default()
    };
    assert_eq!(reader.setup(&mut camera), Err(SetupError::NoExternalMemory));
    assert!(camera.applied.is_none());
    assert!(matches!(reader.start(), Err(ReaderError::NotSetUp)));

    let mut camera = MockCamera {
        init_error: Some("sensor not detected".into()),
        ..MockCamera::default()
    };
    let err = reader.setup(&mut camera).unwrap_err();
    assert!(matches!(err, SetupError::CameraInit(_)));
    assert!(err.to_string().contains("sensor not detected"));
    assert!(matches!(reader.start(), Err(ReaderError::NotSetUp)));
}

#[test]
fn oversized_or_colour_frames_are_rejected_at_setup() {
    let mut camera = MockCamera::default();

    let mut reader = QrCodeReader::builder().frame_size(FrameSize::Uxga).build();
    assert_eq!(
        reader.setup(&mut camera),
        Err(SetupError::UnsupportedFrameSize {
            requested: FrameSize::Uxga,
            max: FrameSize::Svga,
        })
    );

    let mut reader = QrCodeReader::builder()
        .camera_config(CameraConfig::default().with_pixel_format(PixelFormat::Jpeg))
        .build();
    assert_eq!(
        reader.setup(&mut camera),
        Err(SetupError::UnsupportedPixelFormat(PixelFormat::Jpeg))
    );
    assert!(camera.applied.is_none());
}

#[test]
fn receive_times_out_when_nothing_arrives() {
    let (mut reader, _) = reader_with(Vec::new(), fast_params());
    reader.start().expect("start");
    let started = Instant::now();
    assert!(reader.receive_result(Duration::from_millis(40)).is_none());
    assert!(started.elapsed() >= Duration::from_millis(35));
}

#[test]
fn receiver_handle_drains_the_reader_mailbox() {
    let frames = (0..6).map(|_| frame(HELLO)).collect();
    let (mut reader, _) = reader_with(frames, fast_params());
    reader.start().expect("start");

    let receiver = reader.receiver();
    for _ in 0..6 {
        let item = receiver.receive(WAIT).expect("result");
        assert!(item.symbol().is_some_and(|s| s.is_valid()));
    }
    assert!(receiver.receive(Duration::from_millis(50)).is_none());
    assert_eq!(receiver.stats().published, 6);
}
