use super::*;

fn solid(w: u32, h: u32, v: f32) -> Rgb32FImage {
    Rgb32FImage::from_pixel(w, h, Rgb([v, v, v]))
}

#[test]
fn filter_names_and_aliases_resolve() {
    for name in ResizeFilter::NAMES {
        assert!(ResizeFilter::from_name(name).is_some(), "{name}");
    }
    assert_eq!(ResizeFilter::from_name("Lanczos"), Some(ResizeFilter::Lanczos3));
    assert_eq!(ResizeFilter::from_name("blackman-harris"), Some(ResizeFilter::Gaussian));
    assert_eq!(ResizeFilter::from_name("sinc"), None);
}

#[test]
fn default_filter_depends_on_scale_direction() {
    assert_eq!(ResizeFilter::for_scale(true), ResizeFilter::Lanczos3);
    assert_eq!(ResizeFilter::for_scale(false), ResizeFilter::Gaussian);
}

#[test]
fn crop_trims_symmetrically() {
    let mut img = solid(10, 8, 0.0);
    img.put_pixel(1, 1, Rgb([1.0, 1.0, 1.0]));
    let out = crop_frame(img, Some(CropAmount::Pixels(2)), Some(CropAmount::Percent(25.0)));
    assert_eq!(out.dimensions(), (8, 6));
    assert_eq!(out.get_pixel(0, 0).0, [1.0, 1.0, 1.0]);
}

#[test]
fn matching_size_is_passed_through() {
    let out = resize_frame(solid(4, 2, 0.5), Resolution::new(4, 2).unwrap(), false, None).unwrap();
    assert_eq!(out.dimensions(), (4, 2));
    assert_eq!(out.get_pixel(3, 1).0, [0.5, 0.5, 0.5]);
}

#[test]
fn resize_without_fit_hits_exact_size() {
    let target = Resolution::new(16, 16).unwrap();
    let out = resize_frame(solid(8, 4, 0.25), target, false, None).unwrap();
    assert_eq!(out.dimensions(), (16, 16));
}

#[test]
fn fit_pads_wider_sources_with_black_bars() {
    let target = Resolution::new(8, 8).unwrap();
    let out = resize_frame(solid(16, 8, 1.0), target, true, Some(ResizeFilter::Nearest)).unwrap();
    assert_eq!(out.dimensions(), (8, 8));
    assert_eq!(out.get_pixel(4, 0).0, [0.0, 0.0, 0.0]);
    assert_eq!(out.get_pixel(4, 4).0, [1.0, 1.0, 1.0]);
    assert_eq!(out.get_pixel(4, 7).0, [0.0, 0.0, 0.0]);
}

#[test]
fn fit_crops_taller_sources_to_the_middle() {
    let mut src = solid(4, 8, 0.0);
    for x in 0..4 {
        for y in 2..6 {
            src.put_pixel(x, y, Rgb([1.0, 1.0, 1.0]));
        }
    }
    let target = Resolution::new(4, 4).unwrap();
    let out = resize_frame(src, target, true, None).unwrap();
    assert_eq!(out.dimensions(), (4, 4));
    assert!(out.pixels().all(|p| p.0 == [1.0, 1.0, 1.0]));
}

#[test]
fn quantization_clamps_out_of_range_values() {
    let mut img = solid(2, 1, 2.0);
    img.put_pixel(1, 0, Rgb([-1.0, 0.5, 1.0]));
    assert_eq!(to_rgb24(&img), vec![255, 255, 255, 0, 128, 255]);
    assert_eq!(to_rgb8(&img).get_pixel(1, 0).0, [0, 128, 255]);

    let wide = to_rgb48le(&img);
    assert_eq!(wide.len(), 12);
    assert_eq!(&wide[6..8], &[0, 0]);
    assert_eq!(&wide[10..12], &0xffffu16.to_le_bytes());
}

#[test]
fn unreadable_file_is_a_message_not_a_panic() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("broken.0001.exr");
    std::fs::write(&path, b"not an exr").unwrap();
    let err = load_frame(&path).unwrap_err();
    assert!(err.contains("broken.0001.exr"));
}
