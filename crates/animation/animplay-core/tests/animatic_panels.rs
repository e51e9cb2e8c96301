use animplay_core::{
    AnimError, Animatic, Animation, AnimationEvent, Settings, Tattoo, DEFAULT_PANEL_DURATION,
};
use animplay_test_fixtures::{solid, EventLog, MockImage};
use image::Rgba;

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

/// Layers added bottom first, so panel order matches insertion order.
fn mk_storyboard() -> (MockImage, [Tattoo; 3]) {
    let mut img = MockImage::new(4, 4);
    let a = img.add_layer("A (500ms)", RED);
    let b = img.add_layer_with("B(combine)", solid(2, 2, GREEN), (0, 0));
    let c = img.add_layer_with("C", solid(1, 1, BLUE), (0, 0));
    (img, [a, b, c])
}

fn durations(anim: &Animatic) -> Vec<usize> {
    anim.panels().iter().map(|p| p.duration()).collect()
}

#[test]
fn panels_come_from_layer_names() {
    let (img, tattoos) = mk_storyboard();
    let anim = Animatic::new(&img, &Settings::default()).unwrap();

    assert_eq!(anim.panel_count(), 3);
    assert_eq!(durations(&anim), vec![12, DEFAULT_PANEL_DURATION, DEFAULT_PANEL_DURATION]);
    let combine: Vec<bool> = anim.panels().iter().map(|p| p.combine()).collect();
    assert_eq!(combine, vec![false, true, false]);
    assert_eq!(anim.length(), 24);
    assert_eq!(anim.duration(), 24);

    let order: Vec<Tattoo> = anim.panels().iter().map(|p| p.tattoo()).collect();
    assert_eq!(order, tattoos.to_vec());
    assert_eq!(anim.get_comment(1).unwrap(), Some("A (500ms)"));

    let pb = anim.playback();
    assert_eq!((pb.position, pb.start, pb.stop), (1, 1, 24));
}

#[test]
fn durations_follow_the_framerate() {
    let (img, _) = mk_storyboard();
    let settings = Settings {
        framerate: 12.0,
        ..Settings::default()
    };
    let anim = Animatic::new(&img, &settings).unwrap();
    assert_eq!(anim.get_duration(1).unwrap(), 6);
}

#[test]
fn positions_map_to_panels() {
    let (img, _) = mk_storyboard();
    let anim = Animatic::new(&img, &Settings::default()).unwrap();

    assert_eq!(anim.get_panel(0), None);
    assert_eq!(anim.get_panel(1), Some(1));
    assert_eq!(anim.get_panel(12), Some(1));
    assert_eq!(anim.get_panel(13), Some(2));
    assert_eq!(anim.get_panel(18), Some(2));
    assert_eq!(anim.get_panel(19), Some(3));
    assert_eq!(anim.get_panel(24), Some(3));
    assert_eq!(anim.get_panel(25), None);

    let panels: Vec<usize> = (1..=24).filter_map(|p| anim.get_panel(p)).collect();
    assert_eq!(panels.len(), 24);
    assert!(panels.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn zero_length_panels_are_never_shown() {
    let (img, _) = mk_storyboard();
    let mut anim = Animatic::new(&img, &Settings::default()).unwrap();
    anim.set_duration(2, 0).unwrap();

    assert_eq!(anim.get_panel(13), Some(3));
    assert!((1..=anim.length()).all(|p| anim.get_panel(p) != Some(2)));
    assert_eq!(anim.jump_panel(2), Ok(true));
    assert_eq!(anim.playback().position, 13);
}

#[test]
fn combined_panel_is_drawn_over_the_previous_one() {
    let (img, _) = mk_storyboard();
    let mut anim = Animatic::new(&img, &Settings::default()).unwrap();

    let second = anim.frame(13).expect("panel 2 preview");
    assert_eq!(second.get_pixel(0, 0), &Rgba(GREEN));
    assert_eq!(second.get_pixel(3, 3), &Rgba(RED));

    let third = anim.frame(20).expect("panel 3 preview");
    assert_eq!(third.get_pixel(0, 0), &Rgba(BLUE));
    assert_eq!(third.get_pixel(3, 3)[3], 0);

    anim.set_combine(&img, 2, false).unwrap();
    assert!(!anim.get_combine(2).unwrap());
    let second = anim.frame(13).unwrap();
    assert_eq!(second.get_pixel(3, 3)[3], 0);
}

#[test]
fn recache_walks_the_combine_chain() {
    let (img, _) = mk_storyboard();
    let mut anim = Animatic::new(&img, &Settings::default()).unwrap();
    anim.set_combine(&img, 3, true).unwrap();
    let third = anim.frame(20).unwrap();
    assert_eq!(third.get_pixel(1, 1), &Rgba(GREEN));
    assert_eq!(third.get_pixel(3, 3), &Rgba(RED));

    // Breaking the chain at panel 2 must refresh panel 3 as well.
    anim.set_combine(&img, 2, false).unwrap();
    let third = anim.frame(20).unwrap();
    assert_eq!(third.get_pixel(1, 1), &Rgba(GREEN));
    assert_eq!(third.get_pixel(3, 3)[3], 0);
}

#[test]
fn frame_hash_includes_the_combine_chain() {
    let (img, [a, b, c]) = mk_storyboard();
    let anim = Animatic::new(&img, &Settings::default()).unwrap();

    assert_eq!(anim.frame_hash(1), Some(format!("{a};")));
    assert_eq!(anim.frame_hash(13), Some(format!("{b};{a};")));
    assert_eq!(anim.frame_hash(19), Some(format!("{c};")));
    assert_eq!(anim.frame_hash(25), None);

    assert!(anim.same(13, 18));
    assert!(!anim.same(12, 13));
}

/// it should refit the play range and move the cursor back inside when a
/// panel gets shorter
#[test]
fn set_duration_refits_play_range() {
    let (img, _) = mk_storyboard();
    let mut anim = Animatic::new(&img, &Settings::default()).unwrap();
    let log = EventLog::new();
    anim.subscribe(log.listener());

    anim.set_duration(3, 2).unwrap();
    assert_eq!(anim.length(), 20);
    assert_eq!(
        log.take(),
        vec![
            AnimationEvent::PanelDurationChanged {
                panel: 3,
                duration: 2
            },
            AnimationEvent::DurationChanged { duration: 20 },
            AnimationEvent::PlaybackRange {
                start: 1,
                stop: 20,
                min: 1,
                max: 20
            },
        ]
    );

    assert!(anim.jump(20));
    log.take();
    anim.set_duration(3, 0).unwrap();
    assert_eq!(anim.playback().position, 18);
    assert!(log.contains(&AnimationEvent::JumpRequested { position: 18 }));

    assert_eq!(
        anim.set_duration(4, 1),
        Err(AnimError::out_of_range("panel", 4, 3))
    );
    assert!(anim.set_duration(0, 1).is_err());
}

#[test]
fn lengthening_keeps_an_inner_stop() {
    let (img, _) = mk_storyboard();
    let mut anim = Animatic::new(&img, &Settings::default()).unwrap();
    anim.set_playback_stop(10);

    anim.set_duration(1, 20).unwrap();
    assert_eq!(anim.length(), 32);
    assert_eq!(anim.playback().stop, 10);
    assert!(!anim.playback().stop_at_end);
}

#[test]
fn jump_panel_goes_to_first_frame() {
    let (img, _) = mk_storyboard();
    let mut anim = Animatic::new(&img, &Settings::default()).unwrap();

    assert_eq!(anim.jump_panel(3), Ok(true));
    assert_eq!(anim.playback().position, 19);
    assert_eq!(anim.jump_panel(1), Ok(true));
    assert_eq!(anim.playback().position, 1);
    assert!(anim.jump_panel(4).is_err());
    assert!(anim.jump_panel(0).is_err());

    anim.set_duration(3, 0).unwrap();
    assert_eq!(anim.jump_panel(3), Ok(false));
}

#[test]
fn comments_are_per_panel() {
    let (img, _) = mk_storyboard();
    let mut anim = Animatic::new(&img, &Settings::default()).unwrap();

    anim.set_comment(2, "wide shot").unwrap();
    assert_eq!(anim.get_comment(2).unwrap(), Some("wide shot"));
    anim.set_comment(2, "").unwrap();
    assert_eq!(anim.get_comment(2).unwrap(), None);
    assert!(anim.set_comment(9, "x").is_err());
}

#[test]
fn reload_reports_progress() {
    let (img, _) = mk_storyboard();
    let mut anim = Animatic::new(&img, &Settings::default()).unwrap();
    let log = EventLog::new();
    anim.subscribe(log.listener());

    anim.reset_defaults(&img).unwrap();

    let fractions: Vec<f64> = log
        .events()
        .iter()
        .filter_map(|ev| match ev {
            AnimationEvent::Loading { fraction } => Some(*fraction),
            _ => None,
        })
        .collect();
    assert_eq!(fractions.len(), 3);
    assert!((fractions[2] - 1.0).abs() < 1e-9);
    assert!(log.contains(&AnimationEvent::Loaded));
    assert!(log.contains(&AnimationEvent::DurationChanged { duration: 24 }));
}

#[test]
fn deleted_layer_leaves_an_empty_preview() {
    let (mut img, [_, _, c]) = mk_storyboard();
    let mut anim = Animatic::new(&img, &Settings::default()).unwrap();
    img.remove_layer(c);

    anim.set_proxy(&img, 1.0).unwrap();
    assert!(anim.frame(20).is_none());
    assert!(anim.get_frame(&img, 13).is_some());
}

#[test]
fn proxy_ratio_rebuilds_previews() {
    let (img, _) = mk_storyboard();
    let mut anim = Animatic::new(&img, &Settings::default()).unwrap();

    anim.set_proxy(&img, 0.5).unwrap();
    assert_eq!(anim.frame(1).unwrap().dimensions(), (2, 2));
    assert!(matches!(
        anim.set_proxy(&img, 0.0),
        Err(AnimError::InvalidProxyRatio { .. })
    ));
    assert!(anim.set_proxy(&img, 1.5).is_err());
}

#[test]
fn empty_image_gives_empty_animatic() {
    let img = MockImage::new(4, 4);
    let anim = Animatic::new(&img, &Settings::default()).unwrap();
    assert_eq!(anim.panel_count(), 0);
    assert_eq!(anim.length(), 0);
    assert_eq!(anim.get_panel(1), None);
    assert!(anim.frame(1).is_none());
}

#[test]
fn position_of_sums_earlier_durations() {
    let (img, _) = mk_storyboard();
    let mut anim = Animatic::new(&img, &Settings::default()).unwrap();

    assert_eq!(anim.position_of(1), Ok(1));
    assert_eq!(anim.position_of(2), Ok(13));
    assert_eq!(anim.position_of(3), Ok(19));
    assert!(anim.position_of(0).is_err());
    assert!(anim.position_of(4).is_err());

    anim.set_duration(2, 0).unwrap();
    assert_eq!(anim.position_of(3), Ok(13));
    assert_eq!(anim.get_panel(anim.position_of(3).unwrap()), Some(3));
}

/// it should carry duration, blend mode and comment along with the moved
/// panel and recomposite the span it crossed
#[test]
fn move_panel_reorders_and_recomposites() {
    let (img, [a, b, c]) = mk_storyboard();
    let mut anim = Animatic::new(&img, &Settings::default()).unwrap();
    anim.set_comment(3, "close-up").unwrap();
    let log = EventLog::new();
    anim.subscribe(log.listener());

    anim.move_panel(&img, 3, 1).unwrap();

    let order: Vec<Tattoo> = anim.panels().iter().map(|p| p.tattoo()).collect();
    assert_eq!(order, vec![c, a, b]);
    assert_eq!(durations(&anim), vec![6, 12, 6]);
    assert_eq!(anim.get_comment(1).unwrap(), Some("close-up"));
    assert!(anim.get_combine(3).unwrap());
    assert_eq!(log.frames_changed(), vec![(1, 24)]);

    let first = anim.frame(1).unwrap();
    assert_eq!(first.get_pixel(0, 0), &Rgba(BLUE));
    assert_eq!(first.get_pixel(3, 3)[3], 0);
    let last = anim.frame(19).unwrap();
    assert_eq!(last.get_pixel(0, 0), &Rgba(GREEN));
    assert_eq!(last.get_pixel(3, 3), &Rgba(RED));
}

#[test]
fn move_panel_down_shifts_the_span_between() {
    let (img, [a, b, c]) = mk_storyboard();
    let mut anim = Animatic::new(&img, &Settings::default()).unwrap();
    let log = EventLog::new();
    anim.subscribe(log.listener());

    anim.move_panel(&img, 1, 2).unwrap();
    let order: Vec<Tattoo> = anim.panels().iter().map(|p| p.tattoo()).collect();
    assert_eq!(order, vec![b, a, c]);
    assert_eq!(log.frames_changed(), vec![(1, 18)]);
    // A combined panel at the bottom has nothing to draw over.
    assert_eq!(anim.frame(1).unwrap().get_pixel(3, 3)[3], 0);

    log.take();
    anim.move_panel(&img, 2, 2).unwrap();
    assert!(log.events().is_empty());
    assert!(anim.move_panel(&img, 4, 1).is_err());
    assert!(anim.move_panel(&img, 1, 0).is_err());
}

#[test]
fn stepping_wraps_around_the_play_range() {
    let (img, _) = mk_storyboard();
    let mut anim = Animatic::new(&img, &Settings::default()).unwrap();
    anim.set_playback_start(18);
    anim.set_playback_stop(20);

    let log = EventLog::new();
    anim.subscribe(log.listener());
    assert_eq!(anim.next_frame(), 19);
    assert_eq!(anim.next_frame(), 20);
    assert_eq!(anim.next_frame(), 18);
    assert_eq!(anim.prev_frame(), 20);
    assert!(log.contains(&AnimationEvent::JumpRequested { position: 18 }));
}

#[test]
fn restoring_a_document_builds_previews_once() {
    let (img, _) = mk_storyboard();
    let mut anim = Animatic::new(&img, &Settings::default()).unwrap();
    let written = anim.serialize(&anim.playback().to_xml());
    let log = EventLog::new();
    anim.subscribe(log.listener());

    anim.deserialize(&img, &written).unwrap();
    let loading = log
        .events()
        .iter()
        .filter(|ev| matches!(ev, AnimationEvent::Loading { .. }))
        .count();
    assert_eq!(loading, anim.panel_count());
    assert!(log.contains(&AnimationEvent::Loaded));
}
