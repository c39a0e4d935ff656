use image::Rgb;
use redactfe::canvas::{DisplayPoint, DisplaySize, PixelBuffer, Region};
use redactfe::components::tools::Tool;
use redactfe::error::RedactError;
use redactfe::io::{DecodedImage, ExportFormat, decode_image_bytes};
use redactfe::ops::redact::RegionTransform;
use redactfe::session::EditSession;

fn gradient(width: u32, height: u32) -> DecodedImage {
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            rgba.extend_from_slice(&[x as u8, y as u8, (x * 2 + y) as u8, 255]);
        }
    }
    DecodedImage { width, height, rgba }
}

fn loaded(width: u32, height: u32) -> EditSession {
    let mut session = EditSession::default();
    session.load_decoded(gradient(width, height), Some("gradient.png".into())).unwrap();
    session
}

fn buffer(session: &EditSession) -> &PixelBuffer {
    session.buffer().unwrap()
}

#[test]
fn pixelate_restore_fill_export() {
    let mut session = loaded(100, 100);
    let original = buffer(&session).clone();

    let label = session
        .apply_transform(Region::new(10, 10, 40, 40), RegionTransform::Pixelate { block_size: 10 })
        .unwrap();
    assert_eq!(label.as_deref(), Some("Pixelate (Size 10)"));

    // Each 10x10 cell takes the color of its center sample
    let buf = buffer(&session);
    for cell_y in 0..4 {
        for cell_x in 0..4 {
            let (ox, oy) = (10 + cell_x * 10, 10 + cell_y * 10);
            let sample = original.pixel(ox + 5, oy + 5);
            for y in oy..oy + 10 {
                for x in ox..ox + 10 {
                    assert_eq!(buf.pixel(x, y), sample, "pixel ({}, {})", x, y);
                }
            }
        }
    }
    // Outside the region nothing moved
    assert_eq!(buf.pixel(9, 9), original.pixel(9, 9));
    assert_eq!(buf.pixel(50, 50), original.pixel(50, 50));

    session.restore(0).unwrap();
    assert_eq!(buffer(&session), &original);
    assert_eq!(session.history().cursor(), Some(0));

    let label = session
        .apply_transform(Region::new(0, 0, 10, 10), RegionTransform::ColorFill { color: Rgb([255, 0, 0]) })
        .unwrap();
    assert_eq!(label.as_deref(), Some("Color Bar (#ff0000)"));
    assert_eq!(session.history().len(), 2);

    let png = session.export(ExportFormat::Png).unwrap().unwrap();
    let decoded = decode_image_bytes(&png).unwrap();
    assert_eq!((decoded.width, decoded.height), (100, 100));
    assert_eq!(decoded.rgba, buffer(&session).as_raw());
    assert_eq!(buffer(&session).pixel(3, 7), [255, 0, 0, 255]);
    assert_eq!(buffer(&session).pixel(10, 10), original.pixel(10, 10));
}

#[test]
fn editing_after_restore_discards_redo_entries() {
    let mut session = loaded(30, 30);
    for i in 0..3 {
        session
            .apply_transform(Region::new(i * 5, 0, 5, 5), RegionTransform::ColorFill { color: Rgb([9, 9, 9]) })
            .unwrap();
    }
    assert_eq!(session.history().len(), 4);

    session.restore(0).unwrap();
    session
        .apply_transform(Region::new(0, 10, 8, 8), RegionTransform::Pixelate { block_size: 4 })
        .unwrap();

    let items = session.history_items();
    assert_eq!(items.len(), 2);
    assert_eq!(session.history().cursor(), Some(1));
    assert_eq!(items[1].label, "Pixelate (Size 4)");
    assert!(items[1].is_current);
}

#[test]
fn drag_applies_active_tool_through_display_scaling() {
    let mut session = loaded(200, 100);
    session.select_tool(Some(Tool::ColorFill));
    session.tool_settings_mut().fill_color = Rgb([0, 0, 255]);

    // Shown at half size
    let displayed = DisplaySize::new(100.0, 50.0);
    assert!(session.pointer_down(DisplayPoint::new(10.0, 5.0), displayed));
    session.pointer_move(DisplayPoint::new(20.0, 15.0), displayed);
    let label = session.pointer_up(DisplayPoint::new(30.0, 25.0), displayed).unwrap();
    assert_eq!(label.as_deref(), Some("Color Bar (#0000ff)"));

    let buf = buffer(&session);
    assert_eq!(buf.pixel(20, 10), [0, 0, 255, 255]);
    assert_eq!(buf.pixel(59, 49), [0, 0, 255, 255]);
    assert_ne!(buf.pixel(60, 50), [0, 0, 255, 255]);
    assert_ne!(buf.pixel(19, 9), [0, 0, 255, 255]);
}

#[test]
fn tiny_drag_adds_no_history() {
    let mut session = loaded(50, 50);
    session.select_tool(Some(Tool::Pixelate));
    let before = buffer(&session).clone();
    let displayed = DisplaySize::new(50.0, 50.0);

    assert!(session.pointer_down(DisplayPoint::new(10.0, 10.0), displayed));
    let applied = session.pointer_up(DisplayPoint::new(11.0, 30.0), displayed).unwrap();
    assert_eq!(applied, None);
    assert_eq!(session.history().len(), 1);
    assert_eq!(buffer(&session), &before);
}

#[test]
fn selection_past_the_edge_is_clamped() {
    let mut session = loaded(40, 40);
    session.select_tool(Some(Tool::ColorFill));
    let displayed = DisplaySize::new(40.0, 40.0);

    session.pointer_down(DisplayPoint::new(30.0, 30.0), displayed);
    session.pointer_up(DisplayPoint::new(45.0, 45.0), displayed).unwrap();
    assert_eq!(buffer(&session).pixel(39, 39), [0, 0, 0, 255]);
    assert_eq!(buffer(&session).pixel(29, 29), gradient_pixel(29, 29));
}

fn gradient_pixel(x: u32, y: u32) -> [u8; 4] {
    [x as u8, y as u8, (x * 2 + y) as u8, 255]
}

#[test]
fn restore_out_of_range_is_an_error() {
    let mut session = loaded(8, 8);
    assert!(matches!(
        session.restore(3),
        Err(RedactError::IndexOutOfRange { index: 3, len: 1 })
    ));
    assert_eq!(session.history().cursor(), Some(0));
}

#[test]
fn non_image_bytes_are_rejected() {
    let mut session = EditSession::default();
    let err = session.load_bytes(b"hello, world", None).unwrap_err();
    assert!(matches!(err, RedactError::InputRejected(_)));
    assert!(!session.has_image());
}

#[test]
fn loading_again_starts_a_fresh_timeline() {
    let mut session = loaded(16, 16);
    session
        .apply_transform(Region::new(0, 0, 4, 4), RegionTransform::ColorFill { color: Rgb([1, 1, 1]) })
        .unwrap();
    let png = session.export(ExportFormat::Png).unwrap().unwrap();

    session.load_bytes(&png, Some("again.png".into())).unwrap();
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.name(), Some("again.png"));
    assert_eq!(buffer(&session).pixel(0, 0), [1, 1, 1, 255]);
}

#[test]
fn hundred_pixel_scenario() {
    let mut session = loaded(100, 100);
    let original = buffer(&session).clone();

    session
        .apply_transform(Region::new(10, 10, 20, 20), RegionTransform::Pixelate { block_size: 10 })
        .unwrap();
    for (ox, oy) in [(10, 10), (20, 10), (10, 20), (20, 20)] {
        let block = buffer(&session).read_region(Region::new(ox, oy, 10, 10)).unwrap();
        assert!(block.chunks_exact(4).all(|p| p == original.pixel(ox + 5, oy + 5)));
    }

    session.restore(0).unwrap();
    assert_eq!(buffer(&session), &original);

    session
        .apply_transform(Region::new(0, 0, 50, 50), RegionTransform::ColorFill { color: Rgb([255, 0, 0]) })
        .unwrap();
    let png = session.export(ExportFormat::Png).unwrap().unwrap();
    let exported = decode_image_bytes(&png).unwrap().into_buffer().unwrap();
    assert_eq!(exported.pixel(0, 0), [255, 0, 0, 255]);
    assert_eq!(exported.pixel(60, 60), original.pixel(60, 60));
}
