use animplay_core::{
    AnimError, Animation, AnimationEvent, CelAnimation, Offset, Settings, Tattoo,
    BACKGROUND_TRACK_TITLE, DEFAULT_CEL_DURATION, DEFAULT_TRACK_TITLE,
};
use animplay_test_fixtures::{EventLog, MockImage};

fn mk_image() -> (MockImage, Tattoo, Tattoo) {
    let mut img = MockImage::new(8, 6);
    let bg = img.add_layer("Background", [255, 255, 255, 255]);
    let ink = img.add_layer("Ink", [0, 0, 0, 255]);
    (img, bg, ink)
}

fn titles(anim: &CelAnimation) -> Vec<&str> {
    anim.tracks().iter().map(|t| t.title()).collect()
}

#[test]
fn defaults_fill_the_background_track() {
    let (img, bg, _) = mk_image();
    let anim = CelAnimation::new(&img, &Settings::default());

    assert_eq!(anim.duration(), DEFAULT_CEL_DURATION);
    assert_eq!(titles(&anim), vec![BACKGROUND_TRACK_TITLE, DEFAULT_TRACK_TITLE]);
    assert_eq!(anim.get_layers(0, 0).unwrap(), &[bg]);
    assert_eq!(anim.get_layers(0, 239).unwrap(), &[bg]);
    assert!(anim.get_layers(1, 0).unwrap().is_empty());

    let pb = anim.playback();
    assert_eq!((pb.position, pb.start, pb.stop), (0, 0, 239));
    assert!(anim.is_loaded());
}

#[test]
fn defaults_without_background_layer_leave_tracks_empty() {
    let mut img = MockImage::new(8, 6);
    img.add_layer("Sketch", [0, 0, 0, 255]);
    let anim = CelAnimation::new(&img, &Settings::default());

    assert_eq!(anim.track_count(), 2);
    assert!(anim.tracks()[0].frames().is_empty());
    assert!(anim.get_layers(0, 100).unwrap().is_empty());
}

/// it should shift the track and grow the animation when a duplicated cel
/// pushes the track past the end
#[test]
fn cel_add_with_duplicate_grows_duration() {
    let (img, bg, ink) = mk_image();
    let mut anim = CelAnimation::new(&img, &Settings::default());
    anim.set_duration(10);
    anim.set_layers(0, 5, vec![ink]).unwrap();
    assert_eq!(anim.tracks()[0].frames().len(), 10);

    let log = EventLog::new();
    anim.subscribe(log.listener());
    anim.cel_add(0, 5, true).unwrap();

    assert_eq!(anim.tracks()[0].frames().len(), 11);
    assert_eq!(anim.duration(), 11);
    assert_eq!(anim.get_layers(0, 5).unwrap(), &[bg]);
    assert_eq!(anim.get_layers(0, 6).unwrap(), &[ink]);
    assert_eq!(anim.get_layers(0, 10).unwrap(), &[bg]);

    assert!(log.contains(&AnimationEvent::DurationChanged { duration: 11 }));
    assert_eq!(
        log.frames_changed(),
        vec![(6, 1), (7, 1), (8, 1), (9, 1), (10, 1)]
    );
}

#[test]
fn cel_add_without_duplicate_inserts_empty_slot() {
    let (img, bg, _) = mk_image();
    let mut anim = CelAnimation::new(&img, &Settings::default());
    anim.set_duration(4);

    let log = EventLog::new();
    anim.subscribe(log.listener());
    anim.cel_add(0, 0, false).unwrap();

    assert!(anim.get_layers(0, 0).unwrap().is_empty());
    assert_eq!(anim.get_layers(0, 4).unwrap(), &[bg]);
    assert_eq!(anim.duration(), 5);
    assert_eq!(log.frames_changed().first(), Some(&(0, 1)));
}

#[test]
fn cel_add_pads_short_tracks_and_rejects_far_positions() {
    let (img, _, _) = mk_image();
    let mut anim = CelAnimation::new(&img, &Settings::default());
    anim.set_duration(6);

    assert!(matches!(
        anim.cel_add(1, 7, false),
        Err(AnimError::OutOfRange { .. })
    ));
    anim.cel_add(1, 6, false).unwrap();
    assert_eq!(anim.tracks()[1].frames().len(), 7);
    assert_eq!(anim.duration(), 7);
}

#[test]
fn cel_delete_shifts_the_rest_of_the_track() {
    let (img, bg, ink) = mk_image();
    let mut anim = CelAnimation::new(&img, &Settings::default());
    anim.set_duration(10);
    anim.set_layers(0, 4, vec![ink]).unwrap();

    let log = EventLog::new();
    anim.subscribe(log.listener());
    anim.cel_delete(0, 3).unwrap();

    assert_eq!(anim.tracks()[0].frames().len(), 9);
    assert_eq!(anim.get_layers(0, 3).unwrap(), &[ink]);
    assert_eq!(anim.get_layers(0, 4).unwrap(), &[bg]);
    assert!(anim.get_layers(0, 9).unwrap().is_empty());
    assert_eq!(anim.duration(), 10);
    let changed: Vec<usize> = log.frames_changed().into_iter().map(|(p, _)| p).collect();
    assert_eq!(changed, (3..10).collect::<Vec<_>>());

    assert!(anim.cel_delete(1, 0).is_err());
    assert!(anim.cel_delete(7, 0).is_err());
}

#[test]
fn sole_track_cannot_be_deleted() {
    let (img, _, _) = mk_image();
    let mut anim = CelAnimation::new(&img, &Settings::default());

    anim.level_delete(1).unwrap();
    assert_eq!(anim.level_delete(0), Err(AnimError::LastTrack));
    assert_eq!(titles(&anim), vec![BACKGROUND_TRACK_TITLE]);
    assert!(anim.level_delete(3).is_err());
}

#[test]
fn levels_move_add_and_rename() {
    let (img, _, _) = mk_image();
    let mut anim = CelAnimation::new(&img, &Settings::default());

    anim.level_add(2).unwrap();
    anim.set_track_title(2, "FX").unwrap();
    assert!(anim.level_add(4).is_err());

    assert_eq!(anim.level_up(2), Ok(1));
    assert_eq!(titles(&anim), vec!["Background", "FX", "Name me"]);
    assert!(anim.level_up(0).is_err());
    assert!(anim.level_down(2).is_err());

    let log = EventLog::new();
    anim.subscribe(log.listener());
    assert_eq!(anim.level_down(0), Ok(1));
    assert_eq!(titles(&anim), vec!["FX", "Background", "Name me"]);
    // Every non-empty frame of the moved background track is recomposited.
    assert_eq!(log.frames_changed().len(), DEFAULT_CEL_DURATION);

    assert_eq!(anim.track_title(0), Some("FX"));
    assert_eq!(anim.track_title(3), None);
    assert!(anim.set_track_title(3, "x").is_err());
}

#[test]
fn comments_are_set_cleared_and_bounded() {
    let (img, _, _) = mk_image();
    let mut anim = CelAnimation::new(&img, &Settings::default());

    anim.set_comment(3, "hello").unwrap();
    assert_eq!(anim.get_comment(3).unwrap(), Some("hello"));
    assert_eq!(anim.get_comment(4).unwrap(), None);

    anim.set_comment(3, "").unwrap();
    assert_eq!(anim.get_comment(3).unwrap(), None);

    assert_eq!(
        anim.get_comment(240),
        Err(AnimError::out_of_range("frame", 240, 240))
    );
    assert!(anim.set_comment(240, "late").is_err());
}

#[test]
fn shrinking_drops_frames_comments_and_keyframes() {
    let (img, _, ink) = mk_image();
    let mut anim = CelAnimation::new(&img, &Settings::default());
    anim.set_layers(1, 200, vec![ink]).unwrap();
    anim.set_comment(200, "late").unwrap();
    anim.set_camera_keyframe(200, Offset::new(3, 3)).unwrap();

    let log = EventLog::new();
    anim.subscribe(log.listener());
    anim.set_duration(100);

    assert_eq!(anim.duration(), 100);
    assert_eq!(anim.tracks()[0].frames().len(), 100);
    assert!(anim.tracks()[1].frames().len() <= 100);
    assert!(anim.get_comment(200).is_err());
    assert!(!anim.camera().has_keyframe(200));
    assert_eq!(
        log.events(),
        vec![
            AnimationEvent::DurationChanged { duration: 100 },
            AnimationEvent::PlaybackRange {
                start: 0,
                stop: 99,
                min: 0,
                max: 99
            },
        ]
    );

    // Growing back does not resurrect anything.
    anim.set_duration(240);
    assert!(anim.get_layers(1, 200).unwrap().is_empty());
    assert_eq!(anim.get_comment(200).unwrap(), None);
}

#[test]
fn layer_edits_are_bounded_and_notify() {
    let (img, _, ink) = mk_image();
    let mut anim = CelAnimation::new(&img, &Settings::default());
    let log = EventLog::new();
    anim.subscribe(log.listener());

    anim.set_layers(1, 7, vec![ink]).unwrap();
    assert_eq!(log.frames_changed(), vec![(7, 1)]);

    assert_eq!(
        anim.set_layers(5, 0, vec![ink]),
        Err(AnimError::out_of_range("track", 5, 2))
    );
    assert!(anim.set_layers(1, 240, vec![ink]).is_err());
    assert!(anim.get_layers(1, 240).is_err());
}

#[test]
fn play_range_and_jumps() {
    let (img, _, _) = mk_image();
    let mut anim = CelAnimation::new(&img, &Settings::default());
    let log = EventLog::new();
    let id = anim.subscribe(log.listener());

    assert!(anim.jump(50));
    assert!(!anim.jump(240));
    anim.set_playback_start(60);
    assert_eq!(anim.playback().position, 60);
    anim.set_playback_stop(100);
    assert_eq!((anim.playback().start, anim.playback().stop), (60, 100));

    assert_eq!(
        log.take(),
        vec![
            AnimationEvent::JumpRequested { position: 50 },
            AnimationEvent::PlaybackRange {
                start: 60,
                stop: 239,
                min: 0,
                max: 239
            },
            AnimationEvent::JumpRequested { position: 60 },
            AnimationEvent::PlaybackRange {
                start: 60,
                stop: 100,
                min: 0,
                max: 239
            },
        ]
    );

    assert!(anim.unsubscribe(id));
    anim.jump(10);
    assert!(log.events().is_empty());
}

#[test]
fn framerate_is_validated() {
    let (img, _, _) = mk_image();
    let mut anim = CelAnimation::new(&img, &Settings::default());

    assert!(matches!(
        anim.set_framerate(0.0),
        Err(AnimError::InvalidFramerate { .. })
    ));
    assert!(anim.set_framerate(f64::NAN).is_err());
    anim.set_framerate(1000.0).unwrap();
    assert_eq!(anim.framerate(), 300.0);
    anim.set_framerate(12.5).unwrap();
    assert_eq!(anim.framerate(), 12.5);
}

#[test]
fn cel_delete_undoes_cel_add() {
    let (img, bg, ink) = mk_image();
    let mut anim = CelAnimation::new(&img, &Settings::default());
    anim.set_layers(1, 2, vec![ink]).unwrap();
    anim.set_layers(1, 3, vec![bg, ink]).unwrap();
    let before = anim.tracks()[1].clone();

    for dup in [false, true] {
        anim.cel_add(1, 3, dup).unwrap();
        anim.cel_delete(1, 3).unwrap();
        assert_eq!(anim.tracks()[1], before);
    }
    assert_eq!(anim.duration(), DEFAULT_CEL_DURATION);
}
