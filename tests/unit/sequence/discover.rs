use super::*;

fn exts(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"").unwrap();
    path
}

#[test]
fn frame_name_splits_on_last_digit_run() {
    let name = FrameName::parse("shot_v001.1001.exr").unwrap();
    assert_eq!(name.head, "shot_v001.");
    assert_eq!(name.digits, "1001");
    assert_eq!(name.extension, "exr");

    let name = FrameName::parse("plate0042.JPG").unwrap();
    assert_eq!(name.head, "plate");
    assert_eq!(name.digits, "0042");
    assert_eq!(name.extension, "JPG");

    assert!(FrameName::parse("notes.txt").is_none());
    assert!(FrameName::parse("1001").is_none());
}

#[test]
fn sequence_patterns_parse_printf_and_hash_forms() {
    let p = SequencePattern::parse("shot.%05d.exr").unwrap();
    assert_eq!((p.head.as_str(), p.padding, p.extension.as_str()), ("shot.", Some(5), "exr"));

    let p = SequencePattern::parse("shot.%d.exr").unwrap();
    assert_eq!(p.padding, None);

    let p = SequencePattern::parse("shot_####.tif").unwrap();
    assert_eq!((p.head.as_str(), p.padding), ("shot_", Some(4)));

    assert!(SequencePattern::parse("shot.1001.exr").is_none());
}

#[test]
fn n_frames_in_a_directory_form_one_sequence_of_length_n() {
    let tmp = tempfile::tempdir().unwrap();
    for n in 1001..=1010 {
        touch(tmp.path(), &format!("shot.{n}.exr"));
    }

    let seqs = discover_sequences(tmp.path(), &exts(&["exr"])).unwrap();
    assert_eq!(seqs.len(), 1);
    assert_eq!(seqs[0].len(), 10);
    assert_eq!(seqs[0].frame_numbers(), (1001..=1010).collect::<Vec<_>>());
    assert_eq!(seqs[0].head, "shot.");
    assert_eq!(seqs[0].padding, 4);
    assert_eq!(seqs[0].basename(), "shot");
    assert_eq!(seqs[0].pattern(), "shot.%04d.exr");
    assert!(seqs[0].frames().iter().all(|f| f.path.is_absolute()));
}

#[test]
fn gaps_in_numbering_are_kept_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    for n in [3, 1, 7] {
        touch(tmp.path(), &format!("a_{n:03}.png"));
    }
    let seqs = discover_sequences(tmp.path(), &exts(&["png"])).unwrap();
    assert_eq!(seqs[0].frame_numbers(), vec![1, 3, 7]);
    assert_eq!(seqs[0].basename(), "a");
}

#[test]
fn exr_wins_over_jpg_with_the_same_basename() {
    let tmp = tempfile::tempdir().unwrap();
    for n in 1..=3 {
        touch(tmp.path(), &format!("shot.{n:04}.exr"));
        touch(tmp.path(), &format!("shot.{n:04}.jpg"));
    }
    let seqs = discover_sequences(tmp.path(), &exts(&["exr", "jpg"])).unwrap();
    assert_eq!(seqs.len(), 1);
    assert_eq!(seqs[0].extension, "exr");
}

#[test]
fn disallowed_extensions_are_filtered_case_insensitively() {
    let tmp = tempfile::tempdir().unwrap();
    for n in 1..=3 {
        touch(tmp.path(), &format!("shot.{n:04}.JPG"));
        touch(tmp.path(), &format!("shot.{n:04}.dpx"));
    }
    let seqs = discover_sequences(tmp.path(), &exts(&["jpg"])).unwrap();
    assert_eq!(seqs.len(), 1);
    assert_eq!(seqs[0].extension, "JPG");
}

#[test]
fn single_top_level_image_is_not_a_sequence_but_subdirectories_are() {
    let tmp = tempfile::tempdir().unwrap();
    touch(tmp.path(), "poster.0001.jpg");
    let sub = tmp.path().join("plates");
    std::fs::create_dir(&sub).unwrap();
    touch(&sub, "bg.0001.jpg");

    let seqs = discover_sequences(tmp.path(), &exts(&["jpg"])).unwrap();
    assert_eq!(seqs.len(), 1);
    assert_eq!(seqs[0].head, "bg.");
    assert!(seqs[0].directory.ends_with("plates"));
}

#[test]
fn a_single_frame_path_yields_its_whole_sequence() {
    let tmp = tempfile::tempdir().unwrap();
    let mut second = PathBuf::new();
    for n in 1..=4 {
        let p = touch(tmp.path(), &format!("shot.{n:04}.exr"));
        if n == 2 {
            second = p;
        }
    }
    touch(tmp.path(), "other.0001.exr");

    let seqs = discover_sequences(&second, &exts(&["exr"])).unwrap();
    assert_eq!(seqs.len(), 1);
    assert_eq!(seqs[0].head, "shot.");
    assert_eq!(seqs[0].len(), 4);
}

#[test]
fn a_pattern_path_matches_head_extension_and_padding() {
    let tmp = tempfile::tempdir().unwrap();
    for n in 1..=3 {
        touch(tmp.path(), &format!("shot.{n:04}.exr"));
    }

    let seqs = discover_sequences(&tmp.path().join("shot.%04d.exr"), &exts(&["exr"])).unwrap();
    assert_eq!(seqs[0].len(), 3);

    let seqs = discover_sequences(&tmp.path().join("shot.####.exr"), &exts(&["exr"])).unwrap();
    assert_eq!(seqs[0].len(), 3);

    let err = discover_sequences(&tmp.path().join("shot.%06d.exr"), &exts(&["exr"])).unwrap_err();
    assert!(matches!(err, DailiesError::Discovery(_)));
}

#[test]
fn duplicate_frame_numbers_keep_one_file() {
    let tmp = tempfile::tempdir().unwrap();
    touch(tmp.path(), "shot.1.exr");
    touch(tmp.path(), "shot.001.exr");
    touch(tmp.path(), "shot.002.exr");

    let seqs = discover_sequences(tmp.path(), &exts(&["exr"])).unwrap();
    assert_eq!(seqs[0].frame_numbers(), vec![1, 2]);
    assert_eq!(seqs[0].frames()[0].path.file_name().unwrap(), "shot.001.exr");
}

#[test]
fn nothing_found_is_a_discovery_error() {
    let tmp = tempfile::tempdir().unwrap();
    touch(tmp.path(), "readme.txt");
    let err = discover_sequences(tmp.path(), &exts(&["exr"])).unwrap_err();
    assert!(matches!(err, DailiesError::Discovery(_)));

    let err = discover_sequences(&tmp.path().join("missing/dir"), &exts(&["exr"])).unwrap_err();
    assert!(matches!(err, DailiesError::Discovery(_)));
}
