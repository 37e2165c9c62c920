use super::*;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::avatar::test_helpers::dummy_avatar;
use crate::avatar::AvatarUpsert;
use crate::geom::Vec2;
use crate::presence::{NudgeConfig, PresenceStore};
use crate::room::test_helpers::{rect_room, test_catalog};

fn profile(falloff: Falloff, isolation: f64) -> AudioProfile {
    AudioProfile { falloff, min_distance: 1.0, max_distance: 20.0, isolation }
}

/// Two identical rooms except for isolation: an open hall and a muffled den.
fn iso_catalog() -> RoomCatalog {
    let mut hall = rect_room("hall", Vec2::ZERO, Vec2::new(12.0, 12.0));
    hall.audio_profile = profile(Falloff::Linear, 0.0);
    let mut den = rect_room("den", Vec2::new(0.0, 12.0), Vec2::new(12.0, 12.0));
    den.audio_profile = profile(Falloff::Linear, 0.6);
    RoomCatalog::new(vec![hall, den], "hall").unwrap()
}

// =============================================================================
// MOCK TRACK
// =============================================================================

#[derive(Clone, Default)]
struct MockTrack {
    writes: Arc<AtomicUsize>,
    last: Arc<Mutex<f64>>,
    fail_next: Arc<AtomicBool>,
}

impl MockTrack {
    fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn last_volume(&self) -> f64 {
        *self.last.lock().unwrap()
    }
}

impl AudioTrack for MockTrack {
    fn set_volume(&self, volume: f64) -> Result<(), TrackError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(TrackError::NotReady);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = volume;
        Ok(())
    }
}

// =============================================================================
// FALLOFF
// =============================================================================

#[test]
fn falloff_is_non_increasing_in_distance() {
    for falloff in [Falloff::Linear, Falloff::Logarithmic] {
        let p = profile(falloff, 0.0);
        let mut previous = f64::INFINITY;
        for step in 0..=60 {
            let distance = f64::from(step) * 0.4;
            let gain = falloff_gain(&p, distance);
            assert!(gain <= previous + 1e-12, "gain rose at distance {distance}");
            previous = gain;
        }
    }
}

#[test]
fn falloff_saturates_at_min_and_max_distance() {
    let p = profile(Falloff::Logarithmic, 0.0);
    assert!((falloff_gain(&p, 0.0) - 1.0).abs() < 1e-12);
    assert!((falloff_gain(&p, 1.0) - 1.0).abs() < 1e-12);
    assert!(falloff_gain(&p, 20.0).abs() < 1e-12);
    assert!(falloff_gain(&p, 500.0).abs() < 1e-12);
}

#[test]
fn logarithmic_falls_steeper_than_linear() {
    let lin = profile(Falloff::Linear, 0.0);
    let log = profile(Falloff::Logarithmic, 0.0);
    for distance in [5.0, 10.0, 15.0] {
        assert!(falloff_gain(&log, distance) < falloff_gain(&lin, distance));
    }
}

// =============================================================================
// ISOLATION & VOLUME
// =============================================================================

#[test]
fn shared_room_has_no_isolation() {
    let catalog = iso_catalog();
    let a = dummy_avatar("a", "den", Vec2::ZERO);
    let b = dummy_avatar("b", "den", Vec2::new(2.0, 0.0));
    assert!((isolation_factor(&a, &b, &catalog) - 1.0).abs() < 1e-12);
}

#[test]
fn cross_room_takes_the_stronger_isolation() {
    let catalog = iso_catalog();
    let open = dummy_avatar("a", "hall", Vec2::ZERO);
    let muffled = dummy_avatar("b", "den", Vec2::new(0.0, 8.0));
    // max(0.0, 0.6) = 0.6 -> factor 0.4.
    assert!((isolation_factor(&open, &muffled, &catalog) - 0.4).abs() < 1e-12);
}

#[test]
fn full_isolation_blocks_all_bleed() {
    let mut vault = rect_room("vault", Vec2::new(30.0, 0.0), Vec2::new(8.0, 8.0));
    vault.audio_profile = profile(Falloff::Linear, 1.0);
    let mut hall = rect_room("hall", Vec2::ZERO, Vec2::new(12.0, 12.0));
    hall.audio_profile = profile(Falloff::Linear, 0.0);
    let catalog = RoomCatalog::new(vec![hall, vault], "hall").unwrap();

    let local = dummy_avatar("a", "hall", Vec2::ZERO);
    let remote = dummy_avatar("b", "vault", Vec2::new(2.0, 0.0));
    assert_eq!(compute_volume(&local, &remote, &catalog, true, 0.02), 0.0);
}

#[test]
fn moving_into_an_isolated_room_lowers_volume() {
    let catalog = iso_catalog();
    let local = dummy_avatar("a", "hall", Vec2::ZERO);
    let pos = Vec2::new(0.0, 8.0);

    let in_hall = compute_volume(&local, &dummy_avatar("b", "hall", pos), &catalog, true, 0.02);
    let in_den = compute_volume(&local, &dummy_avatar("b", "den", pos), &catalog, true, 0.02);
    assert!(in_den < in_hall, "den {in_den} should be quieter than hall {in_hall}");
    assert!(in_den > 0.0);
}

#[test]
fn positive_volume_is_floored_at_min_audible() {
    let catalog = iso_catalog();
    let local = dummy_avatar("a", "hall", Vec2::ZERO);
    // Just inside max_distance: raw gain well below the floor.
    let remote = dummy_avatar("b", "hall", Vec2::new(19.9, 0.0));
    let volume = compute_volume(&local, &remote, &catalog, true, 0.02);
    assert!((volume - 0.02).abs() < 1e-12);
}

#[test]
fn speaker_switch_silences_everything() {
    let catalog = iso_catalog();
    let local = dummy_avatar("a", "hall", Vec2::ZERO);
    let remote = dummy_avatar("b", "hall", Vec2::new(1.0, 0.0));
    assert_eq!(compute_volume(&local, &remote, &catalog, false, 0.02), 0.0);
}

// =============================================================================
// ROUTER
// =============================================================================

fn router_store() -> PresenceStore {
    let mut store = PresenceStore::with_nudge_config(test_catalog(), NudgeConfig::default());
    store.upsert_avatar(AvatarUpsert {
        id: "zoe".into(),
        display_name: "zoe".into(),
        is_local: true,
        position: Some(Vec2::ZERO),
        ..AvatarUpsert::default()
    });
    store.upsert_avatar(AvatarUpsert {
        id: "bob".into(),
        display_name: "bob".into(),
        position: Some(Vec2::new(0.0, 2.0)),
        ..AvatarUpsert::default()
    });
    store
}

#[test]
fn route_applies_and_then_skips_unchanged_state() {
    let mut store = router_store();
    let mut router = AudioRouter::new(AudioConfig::default());
    let track = MockTrack::default();
    router.register_track("bob", Box::new(track.clone()));

    assert_eq!(router.route(&store), 1);
    assert!(track.last_volume() > 0.0);

    // Same revision, no track events: the pass is skipped entirely.
    assert_eq!(router.route(&store), 0);
    assert_eq!(track.write_count(), 1);

    // A real move far enough to matter triggers one more write.
    store.set_avatar_position("bob", Vec2::new(4.0, 4.0), crate::avatar::PositionOptions::default());
    assert_eq!(router.route(&store), 1);
    assert_eq!(track.write_count(), 2);
}

#[test]
fn tiny_volume_changes_are_suppressed() {
    let mut store = router_store();
    let mut router = AudioRouter::new(AudioConfig::default());
    let track = MockTrack::default();
    router.register_track("bob", Box::new(track.clone()));
    router.route(&store);

    // Nudge bob by a hair: revision moves, but the volume delta is < epsilon.
    store.set_avatar_position("bob", Vec2::new(0.005, 2.0), crate::avatar::PositionOptions::default());
    assert_eq!(router.route(&store), 0);
    assert_eq!(track.write_count(), 1);
}

#[test]
fn failed_write_retries_on_next_pass() {
    let store = router_store();
    let mut router = AudioRouter::new(AudioConfig::default());
    let track = MockTrack::default();
    track.fail_next.store(true, Ordering::SeqCst);
    router.register_track("bob", Box::new(track.clone()));

    // First pass: the track is not ready; nothing is cached.
    assert_eq!(router.route(&store), 0);
    assert_eq!(track.write_count(), 0);

    // Same revision, but the failure left the router dirty: retried and applied.
    assert_eq!(router.route(&store), 1);
    assert_eq!(track.write_count(), 1);
}

#[test]
fn track_events_force_a_recompute() {
    let store = router_store();
    let mut router = AudioRouter::new(AudioConfig::default());
    let track = MockTrack::default();
    router.register_track("bob", Box::new(track.clone()));
    router.route(&store);

    // Re-subscribe invalidates the cache; the same volume is re-applied.
    router.handle_track_event("bob", TrackEvent::Subscribed);
    assert_eq!(router.route(&store), 1);
    assert_eq!(track.write_count(), 2);
}

#[test]
fn speaker_toggle_drives_volume_to_zero() {
    let mut store = router_store();
    let mut router = AudioRouter::new(AudioConfig::default());
    let track = MockTrack::default();
    router.register_track("bob", Box::new(track.clone()));
    router.route(&store);
    assert!(track.last_volume() > 0.0);

    store.set_speaker_enabled(false);
    assert_eq!(router.route(&store), 1);
    assert_eq!(track.last_volume(), 0.0);
}

#[test]
fn no_local_avatar_defers_routing() {
    let catalog = test_catalog();
    let mut store = PresenceStore::with_nudge_config(catalog, NudgeConfig::default());
    store.upsert_avatar(AvatarUpsert {
        id: "bob".into(),
        display_name: "bob".into(),
        position: Some(Vec2::new(0.0, 2.0)),
        ..AvatarUpsert::default()
    });

    let mut router = AudioRouter::new(AudioConfig::default());
    let track = MockTrack::default();
    router.register_track("bob", Box::new(track.clone()));
    assert_eq!(router.route(&store), 0);

    // Once a local anchor exists the deferred pass applies.
    store.upsert_avatar(AvatarUpsert {
        id: "zoe".into(),
        display_name: "zoe".into(),
        is_local: true,
        position: Some(Vec2::ZERO),
        ..AvatarUpsert::default()
    });
    assert_eq!(router.route(&store), 1);
    assert_eq!(track.write_count(), 1);
}

#[test]
fn removed_track_is_not_routed() {
    let store = router_store();
    let mut router = AudioRouter::new(AudioConfig::default());
    let track = MockTrack::default();
    router.register_track("bob", Box::new(track.clone()));
    router.remove_track("bob");

    assert_eq!(router.route(&store), 0);
    assert_eq!(router.track_count(), 0);
    assert_eq!(track.write_count(), 0);
}
