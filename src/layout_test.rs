use super::*;

use crate::avatar::test_helpers::dummy_avatar;
use crate::room::test_helpers::test_catalog;

fn occupants(room_id: &str, n: usize) -> HashMap<String, AvatarState> {
    (0..n)
        .map(|i| {
            let id = format!("avatar-{i:02}");
            (id.clone(), dummy_avatar(&id, room_id, Vec2::ZERO))
        })
        .collect()
}

#[test]
fn no_duplicate_coordinates_in_rect_room() {
    let catalog = test_catalog();
    for n in 2..=10 {
        let avatars = occupants("hall", n);
        let placed = compute_room_layout(&catalog, &avatars);
        assert_eq!(placed.len(), n);
        let mut seen: Vec<Vec2> = Vec::new();
        for pos in placed.values() {
            assert!(
                seen.iter().all(|p| p.distance(*pos) > 1e-9),
                "duplicate slot {pos:?} with {n} occupants"
            );
            seen.push(*pos);
        }
    }
}

#[test]
fn no_duplicate_coordinates_in_circle_room() {
    let catalog = test_catalog();
    for n in 2..=10 {
        let avatars = occupants("pod", n);
        let placed = compute_room_layout(&catalog, &avatars);
        assert_eq!(placed.len(), n);
        let mut seen: Vec<Vec2> = Vec::new();
        for pos in placed.values() {
            assert!(seen.iter().all(|p| p.distance(*pos) > 1e-9));
            seen.push(*pos);
        }
    }
}

#[test]
fn rect_slots_stay_inside_half_extents() {
    let catalog = test_catalog();
    // hall: 10x10 centered at origin.
    for n in 1..=12 {
        let placed = compute_room_layout(&catalog, &occupants("hall", n));
        for pos in placed.values() {
            assert!(pos.x.abs() < 5.0, "x {pos:?} outside hall with {n} occupants");
            assert!(pos.y.abs() < 5.0, "y {pos:?} outside hall with {n} occupants");
        }
    }
}

#[test]
fn circle_slots_ring_geometry() {
    let catalog = test_catalog();
    let center = Vec2::new(20.0, 0.0);

    // Lone occupant sits at the center.
    let placed = compute_room_layout(&catalog, &occupants("pod", 1));
    assert_eq!(placed.values().next().copied(), Some(center));

    // Groups sit on a ring: within 0.75r of center, strictly off-center.
    for n in 2..=8 {
        let placed = compute_room_layout(&catalog, &occupants("pod", n));
        for pos in placed.values() {
            let dist = pos.distance(center);
            assert!(dist <= 4.0 * 0.75 + 1e-9, "ring too wide: {dist}");
            assert!(dist > 0.5, "occupant crowded the center: {dist}");
        }
    }
}

#[test]
fn local_avatar_is_never_reassigned() {
    let catalog = test_catalog();
    let mut avatars = occupants("hall", 3);
    let local = avatars.get_mut("avatar-00").unwrap();
    local.is_local = true;
    local.position = Vec2::new(2.5, -2.5);

    let placed = compute_room_layout(&catalog, &avatars);
    assert!(!placed.contains_key("avatar-00"));
    assert_eq!(placed.len(), 2);
}

#[test]
fn layout_is_deterministic_and_name_ordered() {
    let catalog = test_catalog();
    let avatars = occupants("hall", 5);
    let first = compute_room_layout(&catalog, &avatars);
    let second = compute_room_layout(&catalog, &avatars);
    assert_eq!(first, second);
}

#[test]
fn occupants_of_unknown_rooms_are_skipped() {
    let catalog = test_catalog();
    let avatars = occupants("demolished-wing", 3);
    assert!(compute_room_layout(&catalog, &avatars).is_empty());
}

#[test]
fn empty_avatar_set_yields_empty_layout() {
    let catalog = test_catalog();
    assert!(compute_room_layout(&catalog, &HashMap::new()).is_empty());
}
