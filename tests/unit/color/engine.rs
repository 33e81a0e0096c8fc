use super::*;

fn gray(v: f32) -> Rgb32FImage {
    Rgb32FImage::from_pixel(2, 2, image::Rgb([v, v, v]))
}

#[test]
fn names_resolve_case_insensitively() {
    assert_eq!(TransferCurve::from_name("scene_linear"), Some(TransferCurve::Linear));
    assert_eq!(TransferCurve::from_name("sRGB"), Some(TransferCurve::Srgb));
    assert_eq!(TransferCurve::from_name("Rec.709"), Some(TransferCurve::Rec709));
    assert_eq!(TransferCurve::from_name("Gamma 2.4"), Some(TransferCurve::Gamma24));
    assert_eq!(TransferCurve::from_name("raw"), Some(TransferCurve::Raw));
    assert_eq!(TransferCurve::from_name("ACES - ACEScct"), None);
}

#[test]
fn curves_round_trip_through_linear() {
    for curve in [
        TransferCurve::Srgb,
        TransferCurve::Rec709,
        TransferCurve::Gamma22,
        TransferCurve::Gamma24,
    ] {
        for v in [0.0f32, 0.01, 0.18, 0.5, 1.0] {
            let back = curve.decode(curve.encode(v));
            assert!((back - v).abs() < 1e-4, "{curve:?} {v} -> {back}");
        }
    }
}

#[test]
fn linear_mid_gray_encodes_to_srgb() {
    let engine = TransferCurveEngine::new();
    let mut img = gray(0.18);
    engine.convert(&mut img, "scene_linear", "sRGB").unwrap();
    let v = img.get_pixel(0, 0).0[0];
    assert!((v - 0.4613).abs() < 1e-3, "got {v}");
}

#[test]
fn raw_and_identity_conversions_leave_pixels_alone() {
    let engine = TransferCurveEngine::new();
    let mut img = gray(0.3);
    engine.convert(&mut img, "raw", "sRGB").unwrap();
    engine.convert(&mut img, "srgb", "sRGB").unwrap();
    assert_eq!(img.get_pixel(1, 1).0, [0.3, 0.3, 0.3]);
}

#[test]
fn unknown_colorspace_is_reported_as_an_error_string() {
    let engine = TransferCurveEngine::new();
    let mut img = gray(0.5);
    let err = engine.convert(&mut img, "scene_linear", "Film (ARRI)").unwrap_err();
    assert!(err.contains("Film (ARRI)"));
}

#[test]
fn set_config_requires_an_existing_file() {
    let mut engine = TransferCurveEngine::new();
    assert!(engine.set_config(Some(Path::new("/nonexistent/config.ocio"))).is_err());
    assert!(engine.config().is_none());

    let tmp = tempfile::NamedTempFile::new().unwrap();
    engine.set_config(Some(tmp.path())).unwrap();
    assert_eq!(engine.config(), Some(tmp.path()));

    engine.set_config(None).unwrap();
    assert!(engine.config().is_none());
}
