//! End-to-end sessions through the offline backend

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use heron_core::{
    BitDepth, EngineError, EqualizerSettings, FrameQueue, OfflineBackend, SessionSettings,
    SourceLoader, StreamController, StreamOutcome, StreamState, WavRecordingWriter,
    WavSourceLoader,
};

fn write_input(path: &Path, sample_rate: u32, channels: u16, frames: usize) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames {
        let t = i as f64 / sample_rate as f64;
        let value = ((2.0 * std::f64::consts::PI * 440.0 * t).sin() * 8000.0) as i16;
        for _ in 0..channels {
            writer.write_sample(value).unwrap();
        }
    }
    writer.finalize().unwrap();
}

fn session_for(dir: &Path, sample_rate: u32, channels: u16) -> Arc<SessionSettings> {
    let session = SessionSettings::new();
    session.set_sampling_rate(sample_rate).unwrap();
    session.set_channels(channels).unwrap();
    session.set_bit_depth(16).unwrap();
    session.set_frame_size(300).unwrap();
    session.set_directory(dir).unwrap();
    session.set_file_name("take.wav").unwrap();
    Arc::new(session)
}

#[test]
fn test_flat_session_records_input_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.wav");
    write_input(&input, 48000, 2, 4800);

    let source = WavSourceLoader.load(&input).unwrap();
    let expected = source.samples.clone();
    let session = session_for(dir.path(), 48000, 2);

    let backend = OfflineBackend::new().with_capture();
    let played = backend.played().unwrap();
    let mut controller = StreamController::new(
        Box::new(backend),
        source,
        session,
        Arc::new(EqualizerSettings::flat()),
        Arc::new(FrameQueue::new()),
    )
    .unwrap()
    .with_poll_interval(Duration::from_millis(1));

    controller.start_stream().unwrap();
    assert_eq!(controller.streaming(), StreamOutcome::Completed);
    assert_eq!(*played.lock(), expected);

    let path = controller.save_recording(&WavRecordingWriter).unwrap();
    assert_eq!(path, dir.path().join("take.wav"));

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.spec().sample_rate, 48000);
    assert_eq!(reader.spec().channels, 2);
    assert_eq!(reader.spec().bits_per_sample, 16);
    let recorded: Vec<i32> = reader.into_samples::<i32>().map(|s| s.unwrap()).collect();
    assert_eq!(recorded, expected);

    // The queue was drained by the save
    assert!(controller.queue().is_empty());
}

#[test]
fn test_equalized_session_matches_playback() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.wav");
    write_input(&input, 44100, 1, 44100 / 2);

    let source = WavSourceLoader.load(&input).unwrap();
    let session = session_for(dir.path(), 44100, 1);

    let eq = Arc::new(EqualizerSettings::flat());
    eq.add_or_update_band(1, 440.0, -6.0, 1.0).unwrap();
    eq.add_or_update_band(2, 4000.0, 3.0, 1.0).unwrap();

    let backend = OfflineBackend::new().with_capture();
    let played = backend.played().unwrap();
    let mut controller =
        StreamController::new(Box::new(backend), source, session, eq, Arc::new(FrameQueue::new()))
            .unwrap()
            .with_poll_interval(Duration::from_millis(1));

    controller.start_stream().unwrap();
    assert!(controller.streaming().is_completed());

    let path = controller.save_recording(&WavRecordingWriter).unwrap();
    let recorded: Vec<i32> = hound::WavReader::open(&path)
        .unwrap()
        .into_samples::<i32>()
        .map(|s| s.unwrap())
        .collect();

    assert_eq!(recorded.len(), 44100 / 2);
    assert_eq!(recorded, *played.lock());
    assert!(recorded
        .iter()
        .all(|&s| (BitDepth::Sixteen.min_sample()..=BitDepth::Sixteen.max_sample()).contains(&s)));
}

#[test]
fn test_interrupt_from_another_thread_keeps_partial_recording() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("long.wav");
    write_input(&input, 48000, 1, 48000 * 30);

    let source = WavSourceLoader.load(&input).unwrap();
    let session = session_for(dir.path(), 48000, 1);

    let mut controller = StreamController::new(
        Box::new(OfflineBackend::realtime()),
        source,
        session,
        Arc::new(EqualizerSettings::flat()),
        Arc::new(FrameQueue::new()),
    )
    .unwrap()
    .with_poll_interval(Duration::from_millis(5));

    let interrupt = controller.interrupt_handle();
    controller.start_stream().unwrap();

    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        interrupt.store(true, Ordering::Release);
    });

    assert_eq!(controller.streaming(), StreamOutcome::Interrupted);
    trigger.join().unwrap();
    assert_eq!(controller.state(), StreamState::Stopped);

    let queued = controller.queue().sample_count();
    assert!(queued > 0);
    assert!(queued < 48000 * 30);

    let path = controller.save_recording(&WavRecordingWriter).unwrap();
    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.len() as usize, queued);
}

#[test]
fn test_mid_stream_band_failure_flushes_partial_recording() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.wav");
    write_input(&input, 48000, 1, 48000 * 10);

    let source = WavSourceLoader.load(&input).unwrap();
    let session = session_for(dir.path(), 48000, 1);
    let eq = Arc::new(EqualizerSettings::flat());

    let mut controller = StreamController::new(
        Box::new(OfflineBackend::realtime()),
        source,
        session,
        Arc::clone(&eq),
        Arc::new(FrameQueue::new()),
    )
    .unwrap()
    .with_poll_interval(Duration::from_millis(2));

    controller.start_stream().unwrap();
    thread::sleep(Duration::from_millis(30));

    // Edges of a q=0.1 band at 4 kHz fall outside (0, nyquist)
    eq.add_or_update_band(9, 4000.0, 0.0, 0.1).unwrap();

    let outcome = controller.streaming();
    assert!(matches!(outcome, StreamOutcome::Failed(_)), "{outcome:?}");
    assert_eq!(controller.state(), StreamState::Stopped);

    let queued = controller.queue().sample_count();
    assert!(queued > 0);
    let path = controller.save_recording(&WavRecordingWriter).unwrap();
    assert_eq!(hound::WavReader::open(&path).unwrap().len() as usize, queued);
}

#[test]
fn test_device_error_then_teardown() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.wav");
    write_input(&input, 48000, 1, 1000);

    let source = WavSourceLoader.load(&input).unwrap();
    let session = session_for(dir.path(), 48000, 1);

    let mut controller = StreamController::new(
        Box::new(OfflineBackend::failing("device busy")),
        source,
        session,
        Arc::new(EqualizerSettings::flat()),
        Arc::new(FrameQueue::new()),
    )
    .unwrap();

    let err = controller.start_stream().unwrap_err();
    assert!(matches!(err, EngineError::Device(ref m) if m.contains("device busy")));
    assert_eq!(controller.state(), StreamState::Idle);
    assert!(controller.queue().is_empty());

    controller.stop_stream().unwrap();
    controller.stop_stream().unwrap();
    assert_eq!(controller.state(), StreamState::Stopped);
}

#[test]
fn test_rate_mismatch_rejected_before_start() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.wav");
    write_input(&input, 44100, 2, 100);

    let source = WavSourceLoader.load(&input).unwrap();
    let session = session_for(dir.path(), 48000, 2);

    let result = StreamController::new(
        Box::new(OfflineBackend::new()),
        source,
        session,
        Arc::new(EqualizerSettings::flat()),
        Arc::new(FrameQueue::new()),
    );
    match result {
        Err(e) => assert!(e.is_config_error(), "{e}"),
        Ok(_) => panic!("rate mismatch should be rejected"),
    }
}
