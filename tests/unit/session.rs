use std::path::Path;

use chrono::TimeZone as _;

use super::*;
use crate::foundation::error::DailiesError;

const CONFIG: &str = r#"{
    "globals": {
        "input_image_formats": ["png"],
        "output_codec": "mjpeg",
        "width": 8,
        "height": 4,
        "movie_location": "renders",
        "movie_append_codec": false
    },
    "dailies_profiles": {
        "review": {
            "text_elements": {
                "datetime": { "box": [0.0, 0.0, 1.0, 0.1], "datetime_format": "%d/%m/%Y" }
            }
        }
    },
    "output_codecs": {
        "mjpeg": { "name": "mjpeg" },
        "h264": { "name": "h264", "codec": "libx264" }
    },
    "ocio_profiles": {
        "grade": { "ociocolorconvert": ["linear", "sRGB"] }
    }
}"#;

fn config() -> DailiesConfig {
    DailiesConfig::from_json_str(CONFIG).unwrap()
}

fn now() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
}

fn write_frames(dir: &Path, numbers: &[i64]) {
    for n in numbers {
        image::RgbImage::from_pixel(16, 8, image::Rgb([90, 90, 90]))
            .save(dir.join(format!("plate.{n}.png")))
            .unwrap();
    }
}

#[test]
fn codec_key_prefers_request_then_globals_then_default() {
    let cfg = config();
    assert_eq!(select_codec_key(&cfg, Some("h264")), "h264");
    assert_eq!(select_codec_key(&cfg, Some("  ")), "mjpeg");
    assert_eq!(select_codec_key(&cfg, None), "mjpeg");
    assert_eq!(select_codec_key(&DailiesConfig::default(), None), DEFAULT_CODEC);
}

#[test]
fn explicit_unknown_profile_is_an_error_but_missing_default_is_not() {
    let cfg = config();
    assert!(select_profile(&cfg, Some("review")).unwrap().is_some());
    let err = select_profile(&cfg, Some("nope")).unwrap_err();
    assert!(matches!(err, DailiesError::Configuration(_)));
    assert!(err.to_string().contains("review"));

    assert!(select_profile(&cfg, None).unwrap().is_none());
}

#[test]
fn datetime_uses_the_element_format_and_overrides_are_parsed() {
    let cfg = config();
    let profile = cfg.dailies_profiles.get("review");
    let values = text_values(Some("artist: jo | shot: sh010"), profile, now());
    assert_eq!(values.get("artist").map(String::as_str), Some("jo"));
    assert_eq!(values.get("shot").map(String::as_str), Some("sh010"));
    assert_eq!(values.get(DATETIME).map(String::as_str), Some("09/03/2024"));
}

#[test]
fn datetime_defaults_to_iso_seconds() {
    let values = text_values(None, None, now());
    assert_eq!(values.get(DATETIME).map(String::as_str), Some("2024-03-09T14:05:07"));
    assert_eq!(values.len(), 1);
}

#[test]
fn invalid_datetime_format_falls_back_to_iso() {
    assert_eq!(format_datetime(now(), Some("%Q")), "2024-03-09T14:05:07");
    assert_eq!(format_datetime(now(), Some("%H:%M")), "14:05");
}

#[test]
fn unknown_codec_or_transform_stops_before_discovery() {
    let cfg = config();
    let request = InvocationRequest {
        input: "/definitely/not/here".into(),
        codec: Some("prores".into()),
        ..InvocationRequest::default()
    };
    let err = run_with_config(&cfg, &request, now()).unwrap_err();
    assert!(matches!(err, DailiesError::Configuration(_)));
    assert!(err.to_string().contains("h264, mjpeg"));

    let request = InvocationRequest {
        input: "/definitely/not/here".into(),
        color_transform: Some("bogus".into()),
        ..InvocationRequest::default()
    };
    let err = run_with_config(&cfg, &request, now()).unwrap_err();
    assert!(err.to_string().contains("grade"));
}

#[test]
fn debug_invocation_renders_stills_and_a_run_log() {
    let tmp = tempfile::tempdir().unwrap();
    write_frames(tmp.path(), &[11, 12, 13]);
    let request = InvocationRequest {
        input: tmp.path().to_path_buf(),
        debug: true,
        ..InvocationRequest::default()
    };

    let reports = run_with_config(&config(), &request, now()).unwrap();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert!(!report.is_failure(), "{report:?}");
    assert_eq!(exit_code(&reports), 0);

    let stats = report.outcome.as_ref().unwrap();
    assert_eq!(stats.frames_delivered, 3);
    let movie = report.movie_path.as_ref().unwrap();
    assert_eq!(movie.file_name().unwrap(), "plate.mov");

    let renders = tmp.path().canonicalize().unwrap().join("renders");
    for i in 1..=3 {
        let still = renders.join(format!("plate.{i:05}.jpg"));
        let img = image::open(&still).unwrap();
        assert_eq!((img.width(), img.height()), (8, 4));
    }
    let log = std::fs::read_to_string(renders.join("plate.log")).unwrap();
    assert!(log.contains("processing frame"), "{log}");
}

#[test]
fn no_sequence_is_a_discovery_error() {
    let tmp = tempfile::tempdir().unwrap();
    let request = InvocationRequest {
        input: tmp.path().to_path_buf(),
        debug: true,
        ..InvocationRequest::default()
    };
    let err = run_with_config(&config(), &request, now()).unwrap_err();
    assert!(matches!(err, DailiesError::Discovery(_)));
}

#[test]
fn failed_or_degraded_reports_set_the_exit_code() {
    let ok = SequenceReport {
        sequence: "a".into(),
        movie_path: None,
        outcome: Ok(RenderStats::default()),
    };
    let degraded = SequenceReport {
        sequence: "b".into(),
        movie_path: None,
        outcome: Ok(RenderStats {
            degraded: true,
            ..RenderStats::default()
        }),
    };
    let failed = SequenceReport {
        sequence: "c".into(),
        movie_path: None,
        outcome: Err(DailiesError::delivery("ffmpeg missing")),
    };
    assert_eq!(exit_code(&[]), 0);
    assert_eq!(exit_code(std::slice::from_ref(&ok)), 0);
    assert_eq!(exit_code(&[ok, degraded]), 1);
    assert_eq!(exit_code(&[failed]), 1);
}
