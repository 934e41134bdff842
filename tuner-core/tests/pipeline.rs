use approx::assert_relative_eq;
use std::f32::consts::PI;
use tuner_core::{
    IterSource, PitchDetector, PitchStream, TargetString, TunerConfig, TunerSession, TuningStatus,
    fft,
};

const SAMPLE_RATE: u32 = 44100;
const BLOCK_SIZE: usize = 8192;

fn sine_block(freq: f32, amplitude: f32) -> Vec<f32> {
    (0..BLOCK_SIZE)
        .map(|i| amplitude * (2.0 * PI * freq * i as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

#[test]
fn transform_round_trip_restores_signal() {
    let signal: Vec<f32> = (0..512)
        .map(|i| ((i * 7919) % 113) as f32 / 113.0 - 0.5)
        .collect();

    let mut real = signal.clone();
    let mut imag = vec![0.0; signal.len()];
    fft::transform(&mut real, &mut imag).unwrap();
    fft::inverse_transform(&mut real, &mut imag).unwrap();

    for (restored, original) in real.iter().zip(&signal) {
        assert_relative_eq!(*restored, *original, epsilon = 1e-4);
    }
}

#[test]
fn recovers_string_frequencies_within_one_bin() {
    let detector = PitchDetector::default();
    let bin_width = SAMPLE_RATE as f32 / BLOCK_SIZE as f32;
    for freq in [196.0, 293.66, 440.0, 659.26] {
        let estimate = detector.detect(&sine_block(freq, 0.5), SAMPLE_RATE).unwrap();
        assert!(
            (estimate.frequency - freq).abs() <= bin_width,
            "{freq} Hz detected as {}",
            estimate.frequency
        );
        assert!(detector.is_valid(&estimate));
    }
}

#[test]
fn g_string_in_tune() {
    let mut session = TunerSession::default();
    let reading = session
        .process_block(&sine_block(196.0, 0.5), SAMPLE_RATE, &TargetString::standard(), None)
        .unwrap();

    assert!(reading.is_active);
    assert_eq!(reading.note, "G");
    assert_eq!(reading.target_frequency, 196.0);
    assert!((reading.frequency - 196.0).abs() < 1.0);
    assert!(reading.cents.abs() < 5.0);
    assert_eq!(reading.status, TuningStatus::InTune);
}

#[test]
fn sharp_g_string_is_very_sharp() {
    let mut session = TunerSession::default();
    let reading = session
        .process_block(&sine_block(200.0, 0.5), SAMPLE_RATE, &TargetString::standard(), None)
        .unwrap();

    let expected = 1200.0 * (200.0_f32 / 196.0).log2();
    assert_eq!(reading.note, "G");
    assert!((reading.cents - expected).abs() < 3.0, "cents {}", reading.cents);
    assert_eq!(reading.status, TuningStatus::VerySharp);
}

#[test]
fn silence_between_notes_resets_smoothing() {
    let mut session = TunerSession::default();
    let targets = TargetString::standard();
    let blocks = vec![
        sine_block(440.0, 0.5),
        sine_block(440.0, 0.5),
        vec![0.0; BLOCK_SIZE],
        sine_block(293.66, 0.5),
    ];

    let stream = PitchStream::new(IterSource(blocks.into_iter()), PitchDetector::default(), SAMPLE_RATE);
    let readings: Vec<_> = stream
        .map(|estimate| session.process(&estimate.unwrap(), &targets, None))
        .collect();

    assert_eq!(readings[0].note, "A");
    assert_eq!(readings[1].note, "A");
    assert_eq!(readings[2].status, TuningStatus::NoSignal);
    // Without the reset the 440 Hz history would drag this reading upwards
    assert_eq!(readings[3].note, "D");
    assert!((readings[3].frequency - 293.66).abs() < 1.0);
    assert_eq!(session.smoothing().len(), 1);
}

#[test]
fn manual_selection_overrides_matching() {
    let mut session = TunerSession::default();
    let reading = session
        .process_block(
            &sine_block(440.0, 0.5),
            SAMPLE_RATE,
            &TargetString::standard(),
            Some("D"),
        )
        .unwrap();
    assert_eq!(reading.note, "D");
    assert_eq!(reading.status, TuningStatus::VerySharp);
    assert_relative_eq!(reading.cents, 700.0, epsilon = 5.0);
}

#[test]
fn config_survives_a_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tuner.json");

    let mut config = TunerConfig::default();
    config.targets = vec![
        TargetString::new("C", 130.81),
        TargetString::new("G", 196.0),
        TargetString::new("D", 293.66),
        TargetString::new("A", 440.0),
    ];
    config.detector.min_frequency = 100.0;
    config.save(&path).unwrap();

    let loaded = TunerConfig::load(&path).unwrap();
    assert_eq!(loaded, config);

    let mut session = TunerSession::from_config(&loaded);
    let reading = session.update(Some(131.0), &loaded.targets, None);
    assert_eq!(reading.note, "C");
}

#[test]
fn invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tuner.json");
    std::fs::write(&path, r#"{ "block_size": 3000 }"#).unwrap();
    assert!(TunerConfig::load(&path).is_err());

    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(
        TunerConfig::load(&path),
        Err(tuner_core::TunerError::Json(_))
    ));
}
