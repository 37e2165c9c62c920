//! Presence store — the canonical mutable state of the campus scene.
//!
//! DESIGN
//! ======
//! `PresenceStore` is an explicit, owned state container injected into the
//! hosting application; it is the sole source of truth for avatars, join
//! nudges, waypoints, and operator preferences. Every semantic mutation
//! bumps a monotonic `revision`; semantic no-ops leave it untouched. The
//! audio router and renderer poll the revision instead of subscribing, so a
//! collapsed no-op roster sync costs nothing downstream.
//!
//! Join nudges are cooldown-gated per avatar id, with an independent stamp
//! per id so simultaneous entrants do not suppress one another. Time enters
//! through `Instant` parameters on the `_at` variants, keeping the cooldown
//! logic deterministic under test.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tracing::debug;
use uuid::Uuid;

use crate::avatar::{now_ms, AvatarState, AvatarUpsert, CameraMode, JoinNudge, ParticipantInfo, PositionOptions, QualityLevel};
use crate::geom::Vec2;
use crate::layout::compute_room_layout;
use crate::room::RoomCatalog;

const DEFAULT_NUDGE_COOLDOWN_MS: u64 = 45_000;

/// Displacements below this do not re-aim the heading.
pub(crate) const HEADING_EPSILON: f64 = 1e-4;

/// Cooldown tuning for join nudges, loaded from environment variables.
#[derive(Debug, Clone, Copy)]
pub struct NudgeConfig {
    /// Minimum gap between two nudges for the same avatar id.
    pub cooldown: Duration,
}

impl NudgeConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let cooldown_ms = crate::env_parse("CAMPUS_NUDGE_COOLDOWN_MS", DEFAULT_NUDGE_COOLDOWN_MS);
        Self { cooldown: Duration::from_millis(cooldown_ms) }
    }
}

impl Default for NudgeConfig {
    fn default() -> Self {
        Self { cooldown: Duration::from_millis(DEFAULT_NUDGE_COOLDOWN_MS) }
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Canonical scene state: avatar roster, nudge queue, waypoints, preferences.
pub struct PresenceStore {
    catalog: RoomCatalog,
    avatars: HashMap<String, AvatarState>,
    local_id: Option<String>,
    nudges: VecDeque<JoinNudge>,
    /// Last time a nudge was emitted, per avatar id.
    last_nudge_at: HashMap<String, Instant>,
    waypoints: HashMap<String, Vec2>,
    camera_mode: CameraMode,
    quality: QualityLevel,
    speaker_enabled: bool,
    revision: u64,
    nudge_config: NudgeConfig,
}

impl PresenceStore {
    #[must_use]
    pub fn new(catalog: RoomCatalog) -> Self {
        Self::with_nudge_config(catalog, NudgeConfig::from_env())
    }

    #[must_use]
    pub fn with_nudge_config(catalog: RoomCatalog, nudge_config: NudgeConfig) -> Self {
        Self {
            catalog,
            avatars: HashMap::new(),
            local_id: None,
            nudges: VecDeque::new(),
            last_nudge_at: HashMap::new(),
            waypoints: HashMap::new(),
            camera_mode: CameraMode::default(),
            quality: QualityLevel::default(),
            speaker_enabled: true,
            revision: 0,
            nudge_config,
        }
    }

    // =========================================================================
    // READ SURFACE
    // =========================================================================

    #[must_use]
    pub fn catalog(&self) -> &RoomCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn avatars(&self) -> &HashMap<String, AvatarState> {
        &self.avatars
    }

    #[must_use]
    pub fn avatar(&self, id: &str) -> Option<&AvatarState> {
        self.avatars.get(id)
    }

    #[must_use]
    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    #[must_use]
    pub fn local_avatar(&self) -> Option<&AvatarState> {
        self.local_id.as_deref().and_then(|id| self.avatars.get(id))
    }

    /// Monotonic change counter. Unchanged across semantic no-ops, so
    /// consumers can skip recomputation by comparing revisions.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn waypoint(&self, avatar_id: &str) -> Option<Vec2> {
        self.waypoints.get(avatar_id).copied()
    }

    #[must_use]
    pub fn camera_mode(&self) -> CameraMode {
        self.camera_mode
    }

    #[must_use]
    pub fn quality(&self) -> QualityLevel {
        self.quality
    }

    #[must_use]
    pub fn speaker_enabled(&self) -> bool {
        self.speaker_enabled
    }

    // =========================================================================
    // PREFERENCES
    // =========================================================================

    pub fn set_camera_mode(&mut self, mode: CameraMode) {
        if self.camera_mode != mode {
            self.camera_mode = mode;
            self.revision += 1;
        }
    }

    pub fn set_quality(&mut self, quality: QualityLevel) {
        if self.quality != quality {
            self.quality = quality;
            self.revision += 1;
        }
    }

    pub fn set_speaker_enabled(&mut self, enabled: bool) {
        if self.speaker_enabled != enabled {
            self.speaker_enabled = enabled;
            self.revision += 1;
        }
    }

    // =========================================================================
    // AVATAR MUTATIONS
    // =========================================================================

    /// Create-or-merge an avatar by id. Returns whether anything changed;
    /// an identical update is a complete no-op (revision untouched).
    pub fn upsert_avatar(&mut self, input: AvatarUpsert) -> bool {
        self.upsert_avatar_at(input, Instant::now())
    }

    pub(crate) fn upsert_avatar_at(&mut self, input: AvatarUpsert, now: Instant) -> bool {
        // First avatar claiming local wins; later claims are ignored.
        let mut next_local = self.local_id.clone();
        if input.is_local && next_local.is_none() {
            next_local = Some(input.id.clone());
        }

        let existing = self.avatars.get(&input.id);
        let (position, room_id) = match (input.position, existing) {
            (Some(pos), _) => {
                let clamped = self.catalog.clamp_to_campus(pos);
                let room = self.catalog.resolve_room(clamped).to_string();
                (clamped, room)
            }
            (None, Some(existing)) => (existing.position, existing.room_id.clone()),
            (None, None) => {
                let fallback = self.catalog.fallback_id().to_string();
                let spawn = self
                    .catalog
                    .room(&fallback)
                    .map_or(Vec2::ZERO, |room| room.boundary.center());
                (spawn, fallback)
            }
        };

        let next = AvatarState {
            id: input.id.clone(),
            display_name: input.display_name,
            room_id,
            position,
            heading: existing.map_or(0.0, |a| a.heading),
            status: input.status,
            is_local: next_local.as_deref() == Some(input.id.as_str()),
            avatar_url: input.avatar_url,
            last_active_ms: existing.map_or(0, |a| a.last_active_ms),
        };

        if existing == Some(&next) && next_local == self.local_id {
            return false;
        }

        let previous_room = existing.map(|a| a.room_id.clone());
        let mut committed = next;
        committed.last_active_ms = now_ms();
        self.local_id = next_local;
        self.avatars.insert(input.id.clone(), committed);
        self.revision += 1;

        if previous_room.as_deref() != Some(self.avatars[&input.id].room_id.as_str()) {
            self.maybe_nudge_at(&input.id, now);
        }
        true
    }

    /// Full roster reconciliation against the session transport's feed.
    ///
    /// Known avatars keep their position and room; new ones spawn in
    /// `fallback_room_id`; absentees are dropped along with their waypoint
    /// and nudge cooldown stamp. Collapses to a complete no-op when the
    /// computed next state matches the current one.
    pub fn sync_roster(&mut self, participants: &[ParticipantInfo], fallback_room_id: &str, explicit_local_id: Option<&str>) -> bool {
        self.sync_roster_at(participants, fallback_room_id, explicit_local_id, Instant::now())
    }

    pub(crate) fn sync_roster_at(
        &mut self,
        participants: &[ParticipantInfo],
        fallback_room_id: &str,
        explicit_local_id: Option<&str>,
        now: Instant,
    ) -> bool {
        let in_roster = |id: &str| participants.iter().any(|p| p.id == id);

        // Local-id resolution: roster flag > explicit parameter > stored id.
        let next_local: Option<String> = participants
            .iter()
            .find(|p| p.is_local == Some(true))
            .map(|p| p.id.clone())
            .or_else(|| explicit_local_id.filter(|id| in_roster(id)).map(String::from))
            .or_else(|| self.local_id.clone().filter(|id| in_roster(id)));

        let fallback_room = self
            .catalog
            .room(fallback_room_id)
            .map_or_else(|| self.catalog.fallback_id().to_string(), |room| room.id.clone());
        let spawn = self
            .catalog
            .room(&fallback_room)
            .map_or(Vec2::ZERO, |room| room.boundary.center());

        let mut next: HashMap<String, AvatarState> = HashMap::with_capacity(participants.len());
        for p in participants {
            let existing = self.avatars.get(&p.id);
            next.insert(
                p.id.clone(),
                AvatarState {
                    id: p.id.clone(),
                    display_name: p.display_name.clone(),
                    room_id: existing.map_or_else(|| fallback_room.clone(), |a| a.room_id.clone()),
                    position: existing.map_or(spawn, |a| a.position),
                    heading: existing.map_or(0.0, |a| a.heading),
                    status: p.status,
                    is_local: next_local.as_deref() == Some(p.id.as_str()),
                    avatar_url: p.avatar_url.clone(),
                    last_active_ms: existing.map_or_else(now_ms, |a| a.last_active_ms),
                },
            );
        }

        // Deterministic placement for every remote occupant.
        for (id, slot) in compute_room_layout(&self.catalog, &next) {
            if let Some(avatar) = next.get_mut(&id) {
                avatar.position = slot;
            }
        }

        if next == self.avatars && next_local == self.local_id {
            return false;
        }

        // Entrants into the local room, judged against pre-sync rooms.
        let mut entrants: Vec<String> = Vec::new();
        if let Some(local_room) = next_local
            .as_deref()
            .and_then(|id| next.get(id))
            .map(|local| local.room_id.clone())
        {
            for (id, avatar) in &next {
                if avatar.is_local || avatar.room_id != local_room {
                    continue;
                }
                let previous_room = self.avatars.get(id).map(|a| a.room_id.as_str());
                if previous_room != Some(avatar.room_id.as_str()) {
                    entrants.push(id.clone());
                }
            }
        }

        // Purge per-avatar bookkeeping for dropped ids.
        self.waypoints.retain(|id, _| next.contains_key(id));
        self.last_nudge_at.retain(|id, _| next.contains_key(id));

        self.avatars = next;
        self.local_id = next_local;
        self.revision += 1;

        entrants.sort();
        for id in entrants {
            self.maybe_nudge_at(&id, now);
        }
        true
    }

    /// Move an avatar, clamping to campus bounds and re-resolving its room.
    ///
    /// Heading follows the movement delta (`atan2(dx, dy)`) when the
    /// displacement exceeds `HEADING_EPSILON`, unless `opts.heading` pins it.
    pub fn set_avatar_position(&mut self, id: &str, position: Vec2, opts: PositionOptions) -> bool {
        self.set_avatar_position_at(id, position, opts, Instant::now())
    }

    pub(crate) fn set_avatar_position_at(&mut self, id: &str, position: Vec2, opts: PositionOptions, now: Instant) -> bool {
        let Some(avatar) = self.avatars.get(id) else {
            return false;
        };
        let (prev_position, prev_heading, prev_room) = (avatar.position, avatar.heading, avatar.room_id.clone());

        let clamped = self.catalog.clamp_to_campus(position);
        let delta = clamped - prev_position;
        let heading = opts.heading.unwrap_or_else(|| {
            if delta.length() > HEADING_EPSILON {
                delta.x.atan2(delta.y)
            } else {
                prev_heading
            }
        });
        let room_id = self.catalog.resolve_room(clamped).to_string();

        if clamped == prev_position && heading == prev_heading && room_id == prev_room {
            return false;
        }

        let room_changed = room_id != prev_room;
        if let Some(avatar) = self.avatars.get_mut(id) {
            avatar.position = clamped;
            avatar.heading = heading;
            avatar.room_id = room_id;
            avatar.last_active_ms = now_ms();
        }
        self.revision += 1;

        if room_changed {
            self.maybe_nudge_at(id, now);
        }
        true
    }

    /// Remove an avatar and purge its waypoint and cooldown stamp, then
    /// re-place the remaining remote occupants of the vacated room. Rooms
    /// the removal did not touch keep their positions as-is.
    pub fn remove_avatar(&mut self, id: &str) -> bool {
        let Some(removed) = self.avatars.remove(id) else {
            return false;
        };
        self.waypoints.remove(id);
        self.last_nudge_at.remove(id);
        if self.local_id.as_deref() == Some(id) {
            self.local_id = None;
        }
        for (placed_id, slot) in compute_room_layout(&self.catalog, &self.avatars) {
            if let Some(avatar) = self.avatars.get_mut(&placed_id) {
                if avatar.room_id == removed.room_id {
                    avatar.position = slot;
                }
            }
        }
        self.revision += 1;
        true
    }

    // =========================================================================
    // JOIN NUDGES
    // =========================================================================

    /// Dequeue the oldest pending nudge (single-consumer notification UI).
    pub fn pop_join_nudge(&mut self) -> Option<JoinNudge> {
        self.nudges.pop_front()
    }

    pub fn clear_join_nudges(&mut self) {
        self.nudges.clear();
    }

    #[must_use]
    pub fn pending_nudges(&self) -> usize {
        self.nudges.len()
    }

    /// Enqueue a nudge for `avatar_id` iff it is remote, shares the local
    /// avatar's room, a local avatar exists, and its cooldown has elapsed.
    fn maybe_nudge_at(&mut self, avatar_id: &str, now: Instant) {
        let Some(local_room) = self.local_avatar().map(|a| a.room_id.clone()) else {
            return;
        };
        let Some(avatar) = self.avatars.get(avatar_id) else {
            return;
        };
        if avatar.is_local || avatar.room_id != local_room {
            return;
        }
        if let Some(&last) = self.last_nudge_at.get(avatar_id) {
            if now.duration_since(last) < self.nudge_config.cooldown {
                debug!(avatar_id, "join nudge suppressed by cooldown");
                return;
            }
        }

        let nudge = JoinNudge {
            id: Uuid::new_v4(),
            avatar_id: avatar.id.clone(),
            room_id: avatar.room_id.clone(),
            display_name: avatar.display_name.clone(),
            ts_ms: now_ms(),
        };
        debug!(avatar_id, room_id = %nudge.room_id, "join nudge queued");
        self.last_nudge_at.insert(avatar_id.to_string(), now);
        self.nudges.push_back(nudge);
    }

    // =========================================================================
    // WAYPOINTS
    // =========================================================================

    /// Store or clear a navigation target for an avatar. The rendering layer
    /// reads these for minimap-driven navigation.
    pub fn mark_waypoint(&mut self, avatar_id: &str, point: Option<Vec2>) {
        let changed = match point {
            Some(p) => self.waypoints.insert(avatar_id.to_string(), p) != Some(p),
            None => self.waypoints.remove(avatar_id).is_some(),
        };
        if changed {
            self.revision += 1;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;
