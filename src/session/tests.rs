//! State machine and run loop tests, driven with an in-memory decoder and a
//! recording presenter.

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;

use super::*;
use crate::brightness::BrightnessDirection;
use crate::error::SessionError;
use crate::format::AnnotationMap;
use crate::model::{CropWindow, Point, Roi, ShapeKind};
use crate::test_utils::{MapDecoder, RecordingPresenter, ramp};
use tempfile::tempdir;

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn decoder_for(images: &[&str]) -> MapDecoder {
    images
        .iter()
        .fold(MapDecoder::default(), |decoder, image| {
            decoder.with(*image, ramp(60, 80))
        })
}

fn session_for(
    config: SessionConfig,
    decoder: MapDecoder,
) -> (Session<MapDecoder, RecordingPresenter>, RecordingPresenter) {
    let presenter = RecordingPresenter::default();
    let session = Session::new(config, decoder, presenter.clone()).unwrap();
    (session, presenter)
}

fn boxed(x: i64, y: i64, width: i64, height: i64) -> Roi {
    Roi::Box {
        x,
        y,
        width,
        height,
    }
}

// ============================================================================
// Traversal
// ============================================================================

#[test]
fn test_two_image_scenario_saves_on_exhaustion() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().to_path_buf();
    let destination = dir.join("markings.json");
    let images = ["a.tif", "b.tif"];

    let config = SessionConfig::new(images).save_to(&destination);
    let (mut session, presenter) = session_for(config, decoder_for(&images));

    session.start().unwrap();
    assert_eq!(session.phase(), Phase::Annotating(0));
    assert_eq!(session.current_identifier(), Some("a.tif"));

    session.select_shape(p(10.0, 10.0), p(50.0, 40.0));
    assert_eq!(session.markings().get("a.tif"), Some(&[boxed(10, 10, 40, 30)][..]));

    session.next_image().unwrap();
    assert_eq!(session.current_identifier(), Some("b.tif"));

    session.next_image().unwrap();
    assert_eq!(session.phase(), Phase::Terminal(TerminalReason::Exhausted));
    assert_eq!(session.index(), Some(2));

    assert_eq!(
        std::fs::read_to_string(&destination).unwrap(),
        r#"{"a.tif":[[10,10,40,30]],"b.tif":[]}"#
    );
    assert_eq!(presenter.log.borrow().completions, vec![Some(destination)]);
}

#[test]
fn test_landing_shows_title_and_image() {
    let images = ["a.tif"];
    let (mut session, presenter) = session_for(SessionConfig::new(images), decoder_for(&images));

    session.start().unwrap();

    let log = presenter.log.borrow();
    assert_eq!(log.titles, vec!["a.tif".to_string()]);
    assert_eq!(log.images.len(), 1);
    assert_eq!(log.clears, 1);
    assert!(log.images[0].iter().all(|&v| (0.0..=1.0).contains(&v)));
}

#[test]
fn test_annotated_images_are_skipped() {
    let images = ["a.tif", "b.tif"];
    let mut old = AnnotationMap::new();
    old.insert("a.tif", vec![boxed(1, 1, 1, 1)]);

    let config = SessionConfig::new(images).markings(MarkingsSource::Map(old));
    let (mut session, _) = session_for(config, decoder_for(&images));

    session.start().unwrap();
    assert_eq!(session.current_identifier(), Some("b.tif"));
    assert_eq!(*session.decoder().decoded.borrow(), vec![PathBuf::from("b.tif")]);

    // The skipped entry survives untouched
    assert_eq!(session.markings().get("a.tif"), Some(&[boxed(1, 1, 1, 1)][..]));
}

#[test]
fn test_nothing_eligible_terminates_at_start() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().to_path_buf();
    let destination = dir.join("markings.json");
    let images = ["a.tif"];
    let mut old = AnnotationMap::new();
    old.insert("a.tif", Vec::new());

    let config = SessionConfig::new(images)
        .save_to(&destination)
        .markings(MarkingsSource::Map(old));
    let (mut session, presenter) = session_for(config, decoder_for(&images));

    session.start().unwrap();
    assert_eq!(session.phase(), Phase::Terminal(TerminalReason::Exhausted));
    assert!(session.decoder().decoded.borrow().is_empty());
    assert!(destination.exists());
    assert_eq!(presenter.log.borrow().completions.len(), 1);
}

#[test]
fn test_reselect_by_parent_directory() {
    let images = ["/data/keep/a.tif", "/data/skip/b.tif", "/data/keep/c.tif"];
    let mut old = AnnotationMap::new();
    for image in images {
        old.insert(image, vec![boxed(0, 0, 5, 5)]);
    }

    let config = SessionConfig::new(images)
        .markings(MarkingsSource::Map(old))
        .reselect(["keep"]);
    let (mut session, _) = session_for(config, decoder_for(&images));

    session.start().unwrap();
    assert_eq!(session.current_identifier(), Some("/data/keep/a.tif"));
    // Landing starts the list over
    assert_eq!(session.markings().get("/data/keep/a.tif"), Some(&[][..]));

    session.next_image().unwrap();
    assert_eq!(session.current_identifier(), Some("/data/keep/c.tif"));
    assert_eq!(
        session.markings().get("/data/skip/b.tif"),
        Some(&[boxed(0, 0, 5, 5)][..])
    );

    session.next_image().unwrap();
    assert!(session.is_finished());
}

#[test]
fn test_reselect_by_identifier() {
    let images = ["/data/x/a.tif", "/data/x/b.tif"];
    let mut old = AnnotationMap::new();
    for image in images {
        old.insert(image, Vec::new());
    }

    let config = SessionConfig::new(images)
        .markings(MarkingsSource::Map(old))
        .reselect(["/data/x/b.tif"]);
    let (mut session, _) = session_for(config, decoder_for(&images));

    session.start().unwrap();
    assert_eq!(session.current_identifier(), Some("/data/x/b.tif"));
}

#[test]
fn test_index_is_monotonic() {
    let images = ["a.tif", "b.tif", "c.tif", "d.tif"];
    let mut old = AnnotationMap::new();
    old.insert("b.tif", Vec::new());

    let config = SessionConfig::new(images).markings(MarkingsSource::Map(old));
    let (mut session, _) = session_for(config, decoder_for(&images));

    let mut seen = Vec::new();
    session.start().unwrap();
    for _ in 0..6 {
        seen.push(session.index());
        session.next_image().unwrap();
    }
    seen.push(session.index());

    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last(), Some(&Some(images.len())));
    assert!(!seen.contains(&Some(1)));
    assert_eq!(session.decoder().decoded.borrow().len(), 3);
}

#[test]
fn test_decode_error_is_fatal() {
    let decoder = MapDecoder::default().with("a.tif", ramp(4, 4));
    let config = SessionConfig::new(["a.tif", "broken.tif"]);
    let (mut session, _) = session_for(config, decoder);

    session.start().unwrap();
    let err = session.next_image().unwrap_err();
    assert!(matches!(err, SessionError::Decode(ref e) if e.to_string().contains("broken.tif")));
}

#[test]
fn test_decode_error_leaves_state_untouched() {
    let images = ["/d/keep/a.tif"];
    let mut old = AnnotationMap::new();
    old.insert("/d/keep/a.tif", vec![boxed(1, 2, 3, 4)]);

    let config = SessionConfig::new(images)
        .markings(MarkingsSource::Map(old))
        .reselect(["keep"]);
    let (mut session, presenter) = session_for(config, MapDecoder::default());

    assert!(matches!(session.start(), Err(SessionError::Decode(_))));
    assert_eq!(session.phase(), Phase::NotStarted);
    assert_eq!(session.index(), None);
    assert_eq!(
        session.markings().get("/d/keep/a.tif"),
        Some(&[boxed(1, 2, 3, 4)][..])
    );
    assert!(presenter.log.borrow().titles.is_empty());
}

#[test]
fn test_invalid_base_directory_fails_construction() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().to_path_buf();
    let config = SessionConfig::new(["a.tif"]).relative_to(dir.join("nope"));

    let result = Session::new(config, MapDecoder::default(), RecordingPresenter::default());
    assert!(matches!(result, Err(SessionError::Config(_))));
}

// ============================================================================
// Selections and Undo
// ============================================================================

#[test]
fn test_undo_pops_selections_in_reverse() {
    let images = ["a.tif"];
    let (mut session, presenter) = session_for(SessionConfig::new(images), decoder_for(&images));
    session.start().unwrap();

    let k = 3;
    for i in 0..k {
        let offset = i as f64 * 10.0;
        session.select_shape(p(offset, offset), p(offset + 5.0, offset + 5.0));
    }
    assert_eq!(presenter.log.borrow().highlights.len(), k);
    assert_eq!(session.current_marking(), Some(("a.tif", boxed(20, 20, 5, 5))));

    session.undo();
    assert_eq!(session.current_marking(), Some(("a.tif", boxed(10, 10, 5, 5))));
    for _ in 1..k {
        session.undo();
    }
    assert_eq!(session.markings().get("a.tif"), Some(&[][..]));
    assert!(presenter.log.borrow().highlights.is_empty());

    // One more is a no-op
    session.undo();
    assert_eq!(session.markings().get("a.tif"), Some(&[][..]));
    assert_eq!(session.current_marking(), None);
}

#[test]
fn test_arrow_selections_keep_direction_without_highlight() {
    let images = ["a.tif"];
    let config = SessionConfig::new(images).shape_kind(ShapeKind::Arrow);
    let (mut session, presenter) = session_for(config, decoder_for(&images));
    session.start().unwrap();

    session.select_shape(p(30.0, 20.0), p(10.5, 5.0));
    assert_eq!(
        session.current_marking(),
        Some((
            "a.tif",
            Roi::Arrow {
                x1: 30.0,
                y1: 20.0,
                x2: 10.5,
                y2: 5.0
            }
        ))
    );
    assert!(presenter.log.borrow().highlights.is_empty());

    session.undo();
    assert_eq!(session.markings().get("a.tif"), Some(&[][..]));
}

#[test]
fn test_commands_before_start_are_noops() {
    let images = ["a.tif"];
    let (mut session, presenter) = session_for(SessionConfig::new(images), decoder_for(&images));

    session.select_shape(p(0.0, 0.0), p(4.0, 4.0));
    session.undo();
    session.adjust_brightness(BrightnessDirection::MaxUp);

    assert!(session.markings().is_empty());
    assert_eq!(session.brightness().max_level(), 1.0);
    assert!(presenter.log.borrow().images.is_empty());
}

#[test]
fn test_highlights_cleared_between_images() {
    let images = ["a.tif", "b.tif"];
    let (mut session, presenter) = session_for(SessionConfig::new(images), decoder_for(&images));
    session.start().unwrap();
    session.select_shape(p(0.0, 0.0), p(4.0, 4.0));

    session.next_image().unwrap();
    let log = presenter.log.borrow();
    assert!(log.highlights.is_empty());
    assert_eq!(log.clears, 2);
}

// ============================================================================
// Brightness, Viewport and Saving
// ============================================================================

#[test]
fn test_brightness_redraws_without_touching_markings() {
    let images = ["a.tif"];
    let (mut session, presenter) = session_for(SessionConfig::new(images), decoder_for(&images));
    session.start().unwrap();
    session.select_shape(p(0.0, 0.0), p(4.0, 4.0));
    let before = session.markings().clone();

    session.dispatch(Command::BrightnessDown).unwrap();
    session.dispatch(Command::MinUp).unwrap();

    assert_eq!(session.markings(), &before);
    assert_eq!(presenter.log.borrow().images.len(), 3);
    assert!((session.brightness().max_level() - 0.7).abs() < 1e-6);
    assert!((session.brightness().min_level() - 0.2).abs() < 1e-6);
}

#[test]
fn test_crop_window_sets_viewport() {
    let images = ["a.tif", "b.tif"];
    let crop = CropWindow::new(5.0, 5.0, 20.0, 10.0);
    let config = SessionConfig::new(images).crop("b.tif", crop);
    let (mut session, presenter) = session_for(config, decoder_for(&images));

    session.start().unwrap();
    assert!(presenter.log.borrow().viewports.is_empty());

    session.next_image().unwrap();
    assert_eq!(presenter.log.borrow().viewports, vec![crop]);
}

#[test]
fn test_save_without_destination_is_noop() {
    let images = ["a.tif"];
    let (mut session, _) = session_for(SessionConfig::new(images), decoder_for(&images));
    session.start().unwrap();

    assert!(!session.save().unwrap());

    let tmp = tempdir().unwrap();

    let dir = tmp.path().to_path_buf();
    session.set_save_destination(Some(dir.join("m.json")));
    assert!(session.save().unwrap());
    assert!(dir.join("m.json").exists());
}

#[test]
fn test_close_saves_without_notification() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().to_path_buf();
    let destination = dir.join("markings.json");
    let images = ["a.tif", "b.tif"];
    let exits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&exits);

    let config = SessionConfig::new(images).save_to(&destination);
    let (session, presenter) = session_for(config, decoder_for(&images));
    let mut session = session.with_exit_callback(move || counter.set(counter.get() + 1));

    session.start().unwrap();
    session.select_shape(p(1.0, 1.0), p(3.0, 3.0));
    session.dispatch(Command::Close).unwrap();

    assert_eq!(session.phase(), Phase::Terminal(TerminalReason::Closed));
    assert_eq!(
        std::fs::read_to_string(&destination).unwrap(),
        r#"{"a.tif":[[1,1,2,2]]}"#
    );
    assert!(presenter.log.borrow().completions.is_empty());
    assert_eq!(exits.get(), 1);

    // Terminal sessions ignore further commands
    session.dispatch(Command::NextImage).unwrap();
    session.dispatch(Command::Close).unwrap();
    assert_eq!(session.phase(), Phase::Terminal(TerminalReason::Closed));
    assert_eq!(exits.get(), 1);
    assert_eq!(session.decoder().decoded.borrow().len(), 1);
}

#[test]
fn test_failed_save_still_runs_exit_callback() {
    let tmp = tempdir().unwrap();
    let destination = tmp.path().join("missing").join("markings.json");
    let images = ["a.tif"];
    let exits = Rc::new(Cell::new(0));
    let counter = Rc::clone(&exits);

    let config = SessionConfig::new(images).save_to(&destination);
    let (session, presenter) = session_for(config, decoder_for(&images));
    let mut session = session.with_exit_callback(move || counter.set(counter.get() + 1));

    session.start().unwrap();
    let err = session.next_image().unwrap_err();

    assert!(matches!(err, SessionError::Format(_)));
    assert_eq!(session.phase(), Phase::Terminal(TerminalReason::Exhausted));
    assert_eq!(exits.get(), 1);
    assert!(presenter.log.borrow().completions.is_empty());

    session.request_close().unwrap();
    assert_eq!(exits.get(), 1);
}

// ============================================================================
// Host Events and Run Loop
// ============================================================================

#[test]
fn test_pointer_gesture_selects_shape() {
    let images = ["a.tif"];
    let (mut session, presenter) = session_for(SessionConfig::new(images), decoder_for(&images));
    session.start().unwrap();

    session.handle_pointer(PointerEvent::Press(Some(p(50.0, 40.0))));
    session.handle_pointer(PointerEvent::Drag(Some(p(20.0, 20.0))));
    session.handle_pointer(PointerEvent::Release(Some(p(10.0, 10.0))));

    assert_eq!(session.current_marking(), Some(("a.tif", boxed(10, 10, 40, 30))));
    let log = presenter.log.borrow();
    assert_eq!(log.previews.len(), 2);
    assert_eq!(log.previews.last(), Some(&None));
}

#[test]
fn test_release_off_canvas_selects_nothing() {
    let images = ["a.tif"];
    let (mut session, _) = session_for(SessionConfig::new(images), decoder_for(&images));
    session.start().unwrap();

    session.handle_pointer(PointerEvent::Press(Some(p(5.0, 5.0))));
    session.handle_pointer(PointerEvent::Release(None));
    session.handle_pointer(PointerEvent::Press(None));
    session.handle_pointer(PointerEvent::Release(Some(p(9.0, 9.0))));

    assert_eq!(session.markings().get("a.tif"), Some(&[][..]));
}

#[test]
fn test_run_with_scripted_events() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().to_path_buf();
    let destination = dir.join("markings.json");
    let images = ["a.tif", "b.tif"];

    let mut events = ScriptedEvents::new()
        .gesture((10.0, 10.0), (50.0, 40.0))
        .gesture((0.0, 0.0), (2.0, 2.0))
        .then(HostEvent::key("ctrl+z"))
        .then(HostEvent::key("x"))
        .then(HostEvent::key("n"))
        .then(HostEvent::key("n"))
        .then(HostEvent::key("n"));

    let config = SessionConfig::new(images).save_to(&destination);
    let (mut session, presenter) = session_for(config, decoder_for(&images));
    let result = session.run(&mut events).unwrap();

    assert_eq!(result.get("a.tif"), Some(&[boxed(10, 10, 40, 30)][..]));
    assert_eq!(result.get("b.tif"), Some(&[][..]));
    assert_eq!(session.phase(), Phase::Terminal(TerminalReason::Exhausted));
    // The session ended before the last key
    assert_eq!(events.remaining(), 1);
    assert_eq!(presenter.log.borrow().completions.len(), 1);
}

#[test]
fn test_run_closes_when_source_disconnects() {
    let images = ["a.tif", "b.tif"];
    let mut events = ScriptedEvents::new().gesture((0.0, 0.0), (3.0, 3.0));

    let (mut session, presenter) = session_for(SessionConfig::new(images), decoder_for(&images));
    let result = session.run(&mut events).unwrap();

    assert_eq!(session.phase(), Phase::Terminal(TerminalReason::Closed));
    assert_eq!(result.get("a.tif"), Some(&[boxed(0, 0, 3, 3)][..]));
    assert!(!result.contains("b.tif"));
    assert!(presenter.log.borrow().completions.is_empty());
}

#[test]
fn test_run_window_closed_event() {
    let images = ["a.tif"];
    let mut events = ScriptedEvents::new()
        .then(HostEvent::WindowClosed)
        .then(HostEvent::key("n"));

    let (mut session, _) = session_for(SessionConfig::new(images), decoder_for(&images));
    session.run(&mut events).unwrap();

    assert_eq!(session.phase(), Phase::Terminal(TerminalReason::Closed));
    assert_eq!(events.remaining(), 1);
}

#[test]
fn test_run_returns_relative_view() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().to_path_buf();
    let image = dir.join("sub").join("a.tif");
    let destination = dir.join("markings.json");

    let decoder = MapDecoder::default().with(&image, ramp(10, 10));
    let config = SessionConfig::new([&image])
        .save_to(&destination)
        .relative_to(&dir);
    let (mut session, _) = session_for(config, decoder);

    let mut events = ScriptedEvents::new()
        .gesture((1.0, 1.0), (4.0, 4.0))
        .then(HostEvent::key("n"));
    let result = session.run(&mut events).unwrap();

    let relative = format!("sub{}a.tif", std::path::MAIN_SEPARATOR);
    assert_eq!(result.get(&relative), Some(&[boxed(1, 1, 3, 3)][..]));
    // The internal map keeps full identifiers
    assert!(session.markings().contains(&image.to_string_lossy()));

    let reloaded = AnnotationMap::import(
        &destination,
        ShapeKind::Box,
        &crate::format::ImportOptions::new().relative_to(&dir),
    )
    .unwrap();
    assert_eq!(reloaded, *session.markings());
}

#[test]
fn test_run_resumes_from_default_location() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().to_path_buf();
    let destination = dir.join("markings.json");
    let images = ["a.tif", "b.tif"];
    std::fs::write(&destination, r#"{"a.tif":[[1,2,3,4]]}"#).unwrap();

    let config = SessionConfig::new(images)
        .save_to(&destination)
        .markings(MarkingsSource::DefaultLocation);
    let (mut session, _) = session_for(config, decoder_for(&images));

    let mut events = ScriptedEvents::new().then(HostEvent::key("n"));
    session.run(&mut events).unwrap();

    assert_eq!(*session.decoder().decoded.borrow(), vec![PathBuf::from("b.tif")]);
    assert_eq!(
        std::fs::read_to_string(&destination).unwrap(),
        r#"{"a.tif":[[1,2,3,4]],"b.tif":[]}"#
    );
}

#[test]
fn test_resume_with_relative_images_and_absolute_base() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().to_path_buf();
    let destination = dir.join("markings.json");
    let images = ["imgs/a.tif"];

    let config = SessionConfig::new(images)
        .save_to(&destination)
        .relative_to(&dir);
    let (mut session, _) = session_for(config, decoder_for(&images));
    let mut events = ScriptedEvents::new()
        .gesture((0.0, 0.0), (4.0, 4.0))
        .then(HostEvent::key("n"));
    session.run(&mut events).unwrap();
    let first = std::fs::read_to_string(&destination).unwrap();
    assert!(!first.contains("\"imgs/a.tif\""));

    let config = SessionConfig::new(images)
        .save_to(&destination)
        .relative_to(&dir)
        .markings(MarkingsSource::DefaultLocation);
    let (mut session, _) = session_for(config, decoder_for(&images));
    session.start().unwrap();

    assert_eq!(session.phase(), Phase::Terminal(TerminalReason::Exhausted));
    assert!(session.decoder().decoded.borrow().is_empty());
    assert_eq!(session.markings().total_rois(), 1);
    assert_eq!(std::fs::read_to_string(&destination).unwrap(), first);
}

#[test]
fn test_drop_identifier_export_view() {
    let images = ["/data/run1/a.tif", "/data/run1/b.tif"];
    let config = SessionConfig::new(images).drop_identifier(true);
    let (mut session, _) = session_for(config, decoder_for(&images));

    session.start().unwrap();
    session.select_shape(p(0.0, 0.0), p(2.0, 2.0));
    session.next_image().unwrap();
    session.select_shape(p(5.0, 5.0), p(6.0, 6.0));

    let view = session.export_view();
    assert_eq!(view.len(), 1);
    assert_eq!(
        view.get("/data/run1"),
        Some(&[boxed(0, 0, 2, 2), boxed(5, 5, 1, 1)][..])
    );
}

#[test]
fn test_custom_keybindings() {
    let images = ["a.tif", "b.tif"];
    let mut bindings = crate::keybindings::KeyBindings::new();
    bindings.set_key(crate::keybindings::KeyAction::NextImage, "right");

    let (session, _) = session_for(SessionConfig::new(images), decoder_for(&images));
    let mut session = session.with_keybindings(bindings);
    session.start().unwrap();

    session.handle_key("n").unwrap();
    assert_eq!(session.current_identifier(), Some("a.tif"));
    session.handle_key("right").unwrap();
    assert_eq!(session.current_identifier(), Some("b.tif"));
}

#[test]
fn test_conflicting_keybindings_resolve_to_first_action() {
    let images = ["a.tif"];
    let mut bindings = crate::keybindings::KeyBindings::new();
    bindings.set_key(crate::keybindings::KeyAction::Undo, "w");

    let (session, _) = session_for(SessionConfig::new(images), decoder_for(&images));
    let mut session = session.with_keybindings(bindings);
    session.start().unwrap();
    session.select_shape(p(0.0, 0.0), p(2.0, 2.0));

    session.handle_key("w").unwrap();
    assert_eq!(session.markings().get("a.tif"), Some(&[boxed(0, 0, 2, 2)][..]));
}
