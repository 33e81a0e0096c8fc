use super::*;
use crate::sequence::discover::discover_sequences;

fn settings(width: Option<u32>, height: Option<u32>) -> OutputSettings {
    OutputSettings {
        width,
        height,
        ..OutputSettings::default()
    }
}

#[test]
fn empty_codec_value_never_clobbers_global_default() {
    let merged = merge_output_settings(&settings(Some(1920), None), &settings(None, None));
    assert_eq!(merged.width, Some(1920));

    let merged = merge_output_settings(&settings(Some(1920), None), &settings(Some(0), None));
    assert_eq!(merged.width, Some(1920));
}

#[test]
fn non_empty_codec_value_wins() {
    let globals = OutputSettings {
        width: Some(1920),
        movie_ext: Some("mov".into()),
        filter: Some("lanczos3".into()),
        fit: Some(true),
        ..OutputSettings::default()
    };
    let codec = OutputSettings {
        width: Some(2048),
        movie_ext: Some(String::new()),
        filter: Some("  ".into()),
        fit: Some(false),
        ..OutputSettings::default()
    };
    let merged = merge_output_settings(&globals, &codec);
    assert_eq!(merged.width, Some(2048));
    assert_eq!(merged.movie_ext.as_deref(), Some("mov"));
    assert_eq!(merged.filter.as_deref(), Some("lanczos3"));
    assert_eq!(merged.fit, Some(false));
}

#[test]
fn empty_global_values_become_unset() {
    let globals = OutputSettings {
        movie_location: Some(String::new()),
        ..OutputSettings::default()
    };
    let merged = merge_output_settings(&globals, &OutputSettings::default());
    assert_eq!(merged.movie_location, None);
}

#[test]
fn resolution_is_taken_from_native_frame_only_when_missing() {
    let r = resolve_resolution(Some(1920), Some(1080), || panic!("must not open frame")).unwrap();
    assert_eq!(r, Resolution::new(1920, 1080).unwrap());

    let r = resolve_resolution(Some(1920), None, || Ok((2048, 1024))).unwrap();
    assert_eq!(r, Resolution::new(1920, 960).unwrap());

    let r = resolve_resolution(None, Some(540), || Ok((1920, 1080))).unwrap();
    assert_eq!(r, Resolution::new(960, 540).unwrap());

    let r = resolve_resolution(None, None, || Ok((640, 480))).unwrap();
    assert_eq!(r, Resolution::new(640, 480).unwrap());

    assert!(resolve_resolution(None, None, || Ok((0, 480))).is_err());
}

#[test]
fn movie_file_name_appends_codec_when_enabled() {
    assert_eq!(movie_file_name("shot", "avchq", true, "mov"), "shot_avchq.mov");
    assert_eq!(movie_file_name("shot", "avchq", false, ".mov"), "shot.mov");
    assert_eq!(movie_file_name("shot", "", true, "mp4"), "shot.mp4");
}

#[test]
fn movie_path_has_three_resolution_rules() {
    let seq_dir = Path::new("/shows/abc/plates/shot010");
    let home = Some(PathBuf::from("/home/artist"));

    assert_eq!(
        resolve_movie_path("/mnt/dailies", seq_dir, "a.mov", home.clone()),
        PathBuf::from("/mnt/dailies/a.mov")
    );
    assert_eq!(
        resolve_movie_path("~/dailies", seq_dir, "a.mov", home.clone()),
        PathBuf::from("/home/artist/dailies/a.mov")
    );
    assert_eq!(
        resolve_movie_path("../../dailies/./today", seq_dir, "a.mov", home),
        PathBuf::from("/shows/abc/dailies/today/a.mov")
    );
}

#[test]
fn normalize_path_folds_dot_segments() {
    assert_eq!(normalize_path(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
    assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
    assert_eq!(normalize_path(Path::new("/..")), PathBuf::from("/"));
}

#[test]
fn resolve_run_freezes_resolution_and_creates_movie_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let plates = tmp.path().join("plates");
    std::fs::create_dir_all(&plates).unwrap();
    for n in [1001, 1002] {
        image::RgbImage::new(64, 32)
            .save(plates.join(format!("shot.{n}.jpg")))
            .unwrap();
    }

    let cfg = DailiesConfig::from_json_str(
        r#"{
          "globals": { "input_image_formats": ["jpg"], "width": 32, "movie_location": "../movies",
                       "framerate": 24 },
          "output_codecs": { "avchq": { "name": "h264", "bitdepth": 10 } }
        }"#,
    )
    .unwrap();
    let seqs = discover_sequences(&plates, &cfg.allowed_extensions()).unwrap();
    let request = RunRequest {
        codec_key: "avchq",
        output_dir: None,
        debug: false,
    };
    let run = resolve_run(&cfg, &request, &seqs[0]).unwrap();

    assert_eq!(run.resolution, Resolution::new(32, 16).unwrap());
    assert_eq!(run.codec_name, "h264");
    assert_eq!(run.bitdepth, 10);
    assert_eq!(run.start_timecode.to_string(), "00:00:41:17");
    assert_eq!(run.movie_path.file_name().unwrap(), "shot_h264.mov");
    assert!(run.movie_path.parent().unwrap().is_dir());
    assert_eq!(run.log_path().file_name().unwrap(), "shot_h264.log");
    assert!(!run.is_jpeg_container());
}

#[test]
fn resolve_run_rejects_unknown_codec() {
    let tmp = tempfile::tempdir().unwrap();
    for n in [1, 2] {
        image::RgbImage::new(8, 8)
            .save(tmp.path().join(format!("a.{n:04}.png")))
            .unwrap();
    }
    let cfg = DailiesConfig::from_json_str(r#"{ "globals": { "input_image_formats": ["png"] } }"#)
        .unwrap();
    let seqs = discover_sequences(tmp.path(), &cfg.allowed_extensions()).unwrap();
    let request = RunRequest {
        codec_key: "nope",
        ..RunRequest::default()
    };
    assert!(matches!(
        resolve_run(&cfg, &request, &seqs[0]),
        Err(DailiesError::Configuration(_))
    ));
}
