/*!
Root motion: velocity contributed by animation or by programmatic sources.

Sources are prepared once per `perform_movement` call and folded into the velocity every
substep, either replacing it (override) or stacking on top of it (additive).

Notes
- Animation root motion wins: while it plays, every source is dropped.
- Only the highest-priority override source applies; additive sources all stack.
- Additive velocity is removed again at the start of each substep (`restore_pre_additive`)
  so it never compounds.
*/

use serde::{Deserialize, Serialize};

use crate::bitmask_flags::BitmaskFlags;
use crate::constants::{KINDA_SMALL_NUMBER, MOVE_TO_SPEED_SLACK, ROOT_MOTION_COMPONENT_CUTOFF, SMALL_NUMBER};
use crate::math::{Quat, Vec3, lerp_vec, planar, safe_normal, up};

use super::callbacks::MoveContext;
use super::solver::MovementSolver;
use super::state::MovementState;

// IgnoreZAccumulate: keep the incoming vertical velocity; the source drives the planar part.
// UseSensitiveLiftoffCheck: any upward root motion lifts a grounded character off.
// DisablePartialEndTick: simulate the full tick even when it runs past the duration.
crate::define_bitmask_flags!(RootMotionSettingsFlag, u8, {
    IgnoreZAccumulate,
    UseSensitiveLiftoffCheck,
    DisablePartialEndTick,
});

crate::define_bitmask_flags!(RootMotionStatusFlag, u8, {
    Prepared,
    Finished,
    MarkedForRemoval,
});

pub type RootMotionSettings = BitmaskFlags<u8>;
pub type RootMotionStatus = BitmaskFlags<u8>;

/// Handle returned by `apply_root_motion_source`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RootMotionSourceId(pub u16);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccumulateMode {
    #[default]
    Override,
    Additive,
}

/// What happens to the character's velocity when a source ends.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum FinishVelocity {
    /// Keep whatever velocity the source left behind.
    #[default]
    MaintainLastRootMotionVelocity,
    SetVelocity(Vec3),
    /// Clamp planar speed and upward speed to this value (meters per second).
    ClampVelocity(f32),
}

/// Piecewise-linear curve over `(time, value)` keys, clamped at both ends.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    keys: Vec<(f32, f32)>,
}

impl Curve {
    pub fn new(mut keys: Vec<(f32, f32)>) -> Self {
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    /// Curve through `(0, from)` and `(1, to)`.
    pub fn linear(from: f32, to: f32) -> Self {
        Self::new(vec![(0.0, from), (1.0, to)])
    }

    pub fn evaluate(&self, t: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };
        if t <= first.0 {
            return first.1;
        }
        if t >= last.0 {
            return last.1;
        }
        for pair in self.keys.windows(2) {
            let ((t0, v0), (t1, v1)) = (pair[0], pair[1]);
            if t <= t1 {
                let span = t1 - t0;
                if span <= SMALL_NUMBER {
                    return v1;
                }
                return v0 + (v1 - v0) * ((t - t0) / span);
            }
        }
        last.1
    }
}

/// The motion a source produces.
#[derive(Clone, Debug, PartialEq)]
pub enum RootMotionForce {
    /// Constant velocity, optionally scaled over the source's normalized time.
    ConstantForce {
        force: Vec3,
        strength_over_time: Option<Curve>,
    },
    /// Pull toward (or push away from) a point inside `radius`.
    RadialForce {
        location: Vec3,
        radius: f32,
        strength: f32,
        is_push: bool,
        no_z_force: bool,
        strength_distance_falloff: Option<Curve>,
        strength_over_time: Option<Curve>,
        /// Always push along this direction instead of toward the point.
        fixed_world_direction: Option<Vec3>,
    },
    /// Reach `target_location` from `start_location` over the source's duration.
    MoveToForce {
        start_location: Vec3,
        target_location: Vec3,
        restrict_speed_to_expected: bool,
    },
    /// Parabolic jump along `direction`.
    JumpForce {
        /// Planar direction of travel.
        direction: Vec3,
        distance: f32,
        height: f32,
        time_mapping: Option<Curve>,
        /// Keep running past the duration until the character lands.
        finish_on_landed: bool,
    },
}

/// Velocity and rotation a prepared source contributes this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RootMotionParams {
    pub velocity: Vec3,
    pub rotation: Quat,
}

impl Default for RootMotionParams {
    fn default() -> Self {
        Self {
            velocity: Vec3::zeros(),
            rotation: Quat::identity(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RootMotionSource {
    pub name: String,
    pub priority: u16,
    pub accumulate_mode: AccumulateMode,
    pub settings: RootMotionSettings,
    /// Seconds; negative runs until removed.
    pub duration: f32,
    /// Rotate the produced velocity by the character's rotation.
    pub local_space: bool,
    pub finish_velocity: FinishVelocity,
    pub force: RootMotionForce,
    pub(crate) id: RootMotionSourceId,
    pub(crate) status: RootMotionStatus,
    pub(crate) time: f32,
    pub(crate) params: RootMotionParams,
}

impl RootMotionSource {
    pub fn new(name: impl Into<String>, force: RootMotionForce) -> Self {
        let mut settings = RootMotionSettings::default();
        if matches!(force, RootMotionForce::JumpForce { .. }) {
            settings.add(RootMotionSettingsFlag::DisablePartialEndTick);
        }
        Self {
            name: name.into(),
            priority: 0,
            accumulate_mode: AccumulateMode::Override,
            settings,
            duration: -1.0,
            local_space: false,
            finish_velocity: FinishVelocity::default(),
            force,
            id: RootMotionSourceId(0),
            status: RootMotionStatus::default(),
            time: 0.0,
            params: RootMotionParams::default(),
        }
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_mode(mut self, mode: AccumulateMode) -> Self {
        self.accumulate_mode = mode;
        self
    }

    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_setting(mut self, flag: RootMotionSettingsFlag) -> Self {
        self.settings.add(flag);
        self
    }

    pub fn with_finish_velocity(mut self, finish: FinishVelocity) -> Self {
        self.finish_velocity = finish;
        self
    }

    pub fn in_local_space(mut self) -> Self {
        self.local_space = true;
        self
    }

    #[inline]
    pub fn id(&self) -> RootMotionSourceId {
        self.id
    }

    #[inline]
    pub fn time(&self) -> f32 {
        self.time
    }

    #[inline]
    pub fn params(&self) -> RootMotionParams {
        self.params
    }

    #[inline]
    pub fn has_status(&self, flag: RootMotionStatusFlag) -> bool {
        self.status.has(flag)
    }

    #[inline]
    fn is_done(&self) -> bool {
        self.status
            .has_any(&[RootMotionStatusFlag::Finished, RootMotionStatusFlag::MarkedForRemoval])
    }

    fn is_time_out_enabled(&self) -> bool {
        !matches!(
            self.force,
            RootMotionForce::JumpForce {
                finish_on_landed: true,
                ..
            }
        )
    }

    fn set_time(&mut self, time: f32) {
        self.time = time;
        if self.is_time_out_enabled() && self.duration >= 0.0 && self.time >= self.duration {
            self.status.add(RootMotionStatusFlag::Finished);
        }
    }

    /// Normalized time for strength curves: `time / duration` when the source has a duration.
    #[inline]
    fn curve_time(&self) -> f32 {
        if self.duration > 0.0 {
            (self.time / self.duration).clamp(0.0, 1.0)
        } else {
            self.time
        }
    }

    /// Compute this tick's velocity and advance the source's time.
    ///
    /// `sim_time` is the part of the tick the source is alive for; `move_time` is the whole
    /// tick. Velocity is scaled by their ratio so a source ending mid-tick moves the right
    /// distance.
    fn prepare(&mut self, sim_time: f32, move_time: f32, location: Vec3) {
        let ratio = if (sim_time - move_time).abs() > SMALL_NUMBER && move_time > SMALL_NUMBER {
            sim_time / move_time
        } else {
            1.0
        };

        let velocity = match &self.force {
            RootMotionForce::ConstantForce {
                force,
                strength_over_time,
            } => {
                let strength = strength_over_time
                    .as_ref()
                    .map_or(1.0, |c| c.evaluate(self.curve_time()));
                *force * strength * ratio
            }
            RootMotionForce::RadialForce {
                location: center,
                radius,
                strength,
                is_push,
                no_z_force,
                strength_distance_falloff,
                strength_over_time,
                fixed_world_direction,
            } => {
                let to_center = center - location;
                let dist = to_center.norm();
                let mut force = Vec3::zeros();
                if dist < *radius {
                    let mut strength = *strength;
                    let falloff = strength_distance_falloff
                        .as_ref()
                        .map_or(1.0, |c| c.evaluate((dist / radius).clamp(0.0, 1.0)));
                    let over_time = strength_over_time
                        .as_ref()
                        .map_or(1.0, |c| c.evaluate(self.curve_time()));
                    let factor = (1.0 - (1.0 - falloff) - (1.0 - over_time)).clamp(0.0, 1.0);
                    strength *= factor;

                    force = match fixed_world_direction {
                        Some(dir) => safe_normal(*dir) * strength,
                        None => {
                            let dir = safe_normal(to_center) * strength;
                            if *is_push { -dir } else { dir }
                        }
                    };
                    if *no_z_force {
                        force.y = 0.0;
                    }
                }
                force * ratio
            }
            RootMotionForce::MoveToForce {
                start_location,
                target_location,
                restrict_speed_to_expected,
            } => {
                let mut force = Vec3::zeros();
                if self.duration > SMALL_NUMBER && move_time > SMALL_NUMBER {
                    let fraction = (self.time + sim_time) / self.duration;
                    let target = lerp_vec(*start_location, *target_location, fraction);
                    force = (target - location) / move_time;

                    if *restrict_speed_to_expected && force.norm() > KINDA_SMALL_NUMBER {
                        let previous =
                            lerp_vec(*start_location, *target_location, self.time / self.duration);
                        let expected_speed = ((target - previous) / move_time).norm();
                        let cutoff = expected_speed + MOVE_TO_SPEED_SLACK;
                        if force.norm_squared() > cutoff * cutoff {
                            force = safe_normal(force) * expected_speed;
                        }
                    }
                }
                force
            }
            RootMotionForce::JumpForce {
                direction,
                distance,
                height,
                time_mapping,
                ..
            } => {
                let mut force = Vec3::zeros();
                if self.duration > SMALL_NUMBER && move_time > SMALL_NUMBER {
                    let mut current = self.time / self.duration;
                    let mut target = (self.time + sim_time) / self.duration;
                    if target > 1.0 {
                        let overflow = target - 1.0;
                        current -= overflow;
                        target -= overflow;
                    }
                    if let Some(curve) = time_mapping {
                        current = curve.evaluate(current);
                        target = curve.evaluate(target);
                    }
                    let forward = safe_normal(planar(*direction));
                    let relative = |f: f32| {
                        let arc = -(2.0 * f - 1.0).powi(2) + 1.0;
                        forward * (distance * f) + up() * (arc * height)
                    };
                    force = (relative(target) - relative(current)) / move_time;
                }
                force
            }
        };

        self.params = RootMotionParams {
            velocity,
            rotation: Quat::identity(),
        };
        self.set_time(self.time + sim_time);
    }
}

/// Active root-motion sources of one character.
#[derive(Clone, Debug, Default)]
pub struct RootMotionSourceGroup {
    sources: Vec<RootMotionSource>,
    pending: Vec<RootMotionSource>,
    next_id: u16,
    has_override: bool,
    has_override_ignore_z: bool,
    has_additive: bool,
    pub(crate) is_additive_velocity_applied: bool,
    pub(crate) last_pre_additive_velocity: Vec3,
    last_accumulated_settings: RootMotionSettings,
}

impl RootMotionSourceGroup {
    /// Queue a source; it joins the active set on the next prepare.
    pub fn apply(&mut self, mut source: RootMotionSource) -> RootMotionSourceId {
        self.next_id = self.next_id.wrapping_add(1).max(1);
        source.id = RootMotionSourceId(self.next_id);
        source.status.clear();
        source.time = 0.0;
        let id = source.id;
        self.pending.push(source);
        id
    }

    /// Mark a source for removal; it is cleaned up (with its finish velocity) next tick.
    pub fn remove(&mut self, id: RootMotionSourceId) {
        for source in self.sources.iter_mut().chain(self.pending.iter_mut()) {
            if source.id == id {
                source.status.add(RootMotionStatusFlag::MarkedForRemoval);
            }
        }
    }

    pub fn remove_by_name(&mut self, name: &str) {
        for source in self.sources.iter_mut().chain(self.pending.iter_mut()) {
            if source.name == name {
                source.status.add(RootMotionStatusFlag::MarkedForRemoval);
            }
        }
    }

    pub fn get(&self, id: RootMotionSourceId) -> Option<&RootMotionSource> {
        self.sources
            .iter()
            .chain(self.pending.iter())
            .find(|s| s.id == id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&RootMotionSource> {
        self.sources
            .iter()
            .chain(self.pending.iter())
            .find(|s| s.name == name)
    }

    #[inline]
    pub fn has_active_sources(&self) -> bool {
        !self.sources.is_empty() || !self.pending.is_empty()
    }

    #[inline]
    pub fn has_override_velocity(&self) -> bool {
        self.has_override
    }

    #[inline]
    pub fn has_override_velocity_ignore_z(&self) -> bool {
        self.has_override_ignore_z
    }

    #[inline]
    pub fn has_additive_velocity(&self) -> bool {
        self.has_additive
    }

    #[inline]
    pub fn has_velocity(&self) -> bool {
        self.has_override || self.has_additive
    }

    #[inline]
    pub fn last_accumulated_settings(&self) -> RootMotionSettings {
        self.last_accumulated_settings
    }

    pub fn sources(&self) -> impl Iterator<Item = &RootMotionSource> {
        self.sources.iter()
    }

    /// Drop every source without applying finish velocities.
    pub fn clear(&mut self) {
        self.sources.clear();
        self.pending.clear();
        self.has_override = false;
        self.has_override_ignore_z = false;
        self.has_additive = false;
        self.is_additive_velocity_applied = false;
        self.last_accumulated_settings.clear();
    }

    /// End sources that finished or were marked, applying their finish velocity.
    ///
    /// Survivors lose `Prepared` so the next prepare recomputes them.
    pub fn clean_up_invalid(&mut self, velocity: &mut Vec3) {
        let mut kept = Vec::with_capacity(self.sources.len());
        for mut source in self.sources.drain(..) {
            if !source.is_done() {
                source.status.remove(RootMotionStatusFlag::Prepared);
                kept.push(source);
                continue;
            }

            if source.accumulate_mode == AccumulateMode::Additive
                && self.is_additive_velocity_applied
            {
                self.last_pre_additive_velocity += source.params.velocity;
            }

            match source.finish_velocity {
                FinishVelocity::MaintainLastRootMotionVelocity => {}
                FinishVelocity::SetVelocity(v) => {
                    *velocity = v;
                    if self.is_additive_velocity_applied {
                        self.last_pre_additive_velocity = v;
                    }
                }
                FinishVelocity::ClampVelocity(limit) => {
                    *velocity = clamp_finish_velocity(*velocity, limit);
                    if self.is_additive_velocity_applied {
                        self.last_pre_additive_velocity =
                            clamp_finish_velocity(self.last_pre_additive_velocity, limit);
                    }
                }
            }
            log::debug!("root motion source `{}` ended", source.name);
        }
        self.sources = kept;
        self.pending.retain(|s| !s.is_done());
    }

    /// Activate pending sources and compute every source's contribution for a tick of `dt`.
    pub fn prepare(&mut self, dt: f32, location: Vec3) {
        self.sources.append(&mut self.pending);
        // Stable: equal priorities keep the order they were applied in.
        self.sources
            .sort_by_key(|s| std::cmp::Reverse(s.priority));

        self.has_override = false;
        self.has_override_ignore_z = false;
        self.has_additive = false;
        self.last_accumulated_settings.clear();

        for source in &mut self.sources {
            if source.status.has(RootMotionStatusFlag::MarkedForRemoval) {
                continue;
            }
            if !source.status.has(RootMotionStatusFlag::Prepared) {
                let mut sim_time = dt;
                if !source.settings.has(RootMotionSettingsFlag::DisablePartialEndTick)
                    && source.is_time_out_enabled()
                    && source.duration >= 0.0
                {
                    sim_time = (source.duration - source.time).clamp(0.0, dt);
                }
                source.prepare(sim_time, dt, location);
                source.status.add(RootMotionStatusFlag::Prepared);
            }

            self.last_accumulated_settings.merge(source.settings);
            match source.accumulate_mode {
                AccumulateMode::Override => {
                    self.has_override = true;
                    if source.settings.has(RootMotionSettingsFlag::IgnoreZAccumulate) {
                        self.has_override_ignore_z = true;
                    }
                }
                AccumulateMode::Additive => self.has_additive = true,
            }
        }
    }

    /// Fold prepared sources of `mode` into `velocity`.
    ///
    /// Override stops at the highest-priority source; additive sources all stack.
    pub fn accumulate(&self, mode: AccumulateMode, rotation: Quat, velocity: &mut Vec3) {
        for source in &self.sources {
            if source.accumulate_mode != mode
                || !source.status.has(RootMotionStatusFlag::Prepared)
                || source.status.has(RootMotionStatusFlag::MarkedForRemoval)
            {
                continue;
            }
            let mut rm_velocity = source.params.velocity;
            if source.local_space {
                rm_velocity = rotation * rm_velocity;
            }
            let input = *velocity;
            match mode {
                AccumulateMode::Override => *velocity = rm_velocity,
                AccumulateMode::Additive => *velocity += rm_velocity,
            }
            if source.settings.has(RootMotionSettingsFlag::IgnoreZAccumulate) {
                velocity.y = input.y;
            }
            if mode == AccumulateMode::Override {
                break;
            }
        }
    }

    /// Rotation of the winning override source, when it rotates at all.
    pub fn override_rotation(&self) -> Option<Quat> {
        self.sources
            .iter()
            .find(|s| {
                s.accumulate_mode == AccumulateMode::Override
                    && s.status.has(RootMotionStatusFlag::Prepared)
                    && !s.status.has(RootMotionStatusFlag::MarkedForRemoval)
            })
            .map(|s| s.params.rotation)
            .filter(|r| r.angle() > SMALL_NUMBER)
    }

    /// End jump sources that wait for landing.
    pub(crate) fn finish_on_landed(&mut self) {
        for source in &mut self.sources {
            if let RootMotionForce::JumpForce {
                finish_on_landed: true,
                ..
            } = source.force
            {
                source.status.add(RootMotionStatusFlag::Finished);
            }
        }
    }
}

fn clamp_finish_velocity(velocity: Vec3, limit: f32) -> Vec3 {
    let flat = planar(velocity);
    let flat = if flat.norm() > limit {
        safe_normal(flat) * limit
    } else {
        flat
    };
    Vec3::new(flat.x, velocity.y.min(limit), flat.z)
}

/// Montage playback state that accompanies animation root motion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MontageState {
    pub position: f32,
    pub length: f32,
    pub blend_in: f32,
    pub blend_out: f32,
}

/// Root motion extracted from the pose for one tick, in the character's local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationRootMotion {
    pub translation: Vec3,
    pub rotation: Quat,
    pub montage: Option<MontageState>,
}

impl MovementSolver {
    pub fn apply_root_motion_source(&mut self, source: RootMotionSource) -> RootMotionSourceId {
        self.root_motion.apply(source)
    }

    pub fn remove_root_motion_source(&mut self, id: RootMotionSourceId) {
        self.root_motion.remove(id);
    }

    pub fn remove_root_motion_source_by_name(&mut self, name: &str) {
        self.root_motion.remove_by_name(name);
    }

    #[inline]
    pub fn root_motion(&self) -> &RootMotionSourceGroup {
        &self.root_motion
    }

    #[inline]
    pub fn has_anim_root_motion(&self) -> bool {
        self.anim_root_motion.is_some()
    }

    #[inline]
    pub(crate) fn has_root_motion_override(&self) -> bool {
        self.has_anim_root_motion() || self.root_motion.has_override_velocity()
    }

    pub(crate) fn should_discard_root_motion(&self, root_motion: &AnimationRootMotion) -> bool {
        let Some(montage) = root_motion.montage else {
            return false;
        };
        if !self.settings.apply_root_motion_during_blend_in && montage.position <= montage.blend_in
        {
            return true;
        }
        if !self.settings.apply_root_motion_during_blend_out
            && montage.position >= montage.length - montage.blend_out
        {
            return true;
        }
        false
    }

    /// Root motion delta to velocity, dropping components too small to matter.
    pub(crate) fn calc_root_motion_velocity(delta: Vec3, dt: f32, current: Vec3) -> Vec3 {
        if dt <= 0.0 {
            return current;
        }
        let delta = delta.map(|c| if c.abs() <= ROOT_MOTION_COMPONENT_CUTOFF { 0.0 } else { c });
        delta / dt
    }

    /// World-space translation and rotation delta of this tick's animation root motion.
    pub(crate) fn anim_root_motion_world(&self) -> Option<(Vec3, Quat)> {
        self.anim_root_motion.map(|rm| {
            let translation = self.rotation * rm.translation;
            let rotation = self.rotation * rm.rotation * self.rotation.inverse();
            (translation, rotation)
        })
    }

    /// Velocity set once before the substeps run when root motion drives movement.
    pub(crate) fn init_apply_root_motion_to_velocity(&mut self, ctx: &mut MoveContext<'_>, dt: f32) {
        if let Some((translation, _)) = self.anim_root_motion_world() {
            self.root_motion.clear();
            if dt > 0.0 {
                self.velocity = Self::calc_root_motion_velocity(translation, dt, self.velocity);
            }
        } else if dt > 0.0 {
            let mut velocity = self.velocity;
            self.root_motion
                .accumulate(AccumulateMode::Override, self.rotation, &mut velocity);
            if self.is_falling() {
                velocity += self.former_base_velocity_for_root_motion();
            }
            self.velocity = velocity;
        }
        self.velocity = ctx.callbacks.post_process_root_motion_velocity(self.velocity, dt);
    }

    /// Fold root motion into the velocity for one substep.
    pub(crate) fn apply_root_motion_to_velocity(&mut self, ctx: &mut MoveContext<'_>, dt: f32) {
        if self.has_anim_root_motion() && dt > 0.0 {
            if self.is_falling() {
                self.velocity += self.former_base_velocity_for_root_motion();
            }
            return;
        }

        let old_velocity = self.velocity;
        let mut applied = false;

        if self.root_motion.has_override_velocity() {
            self.root_motion
                .accumulate(AccumulateMode::Override, self.rotation, &mut self.velocity);
            self.velocity = ctx.callbacks.post_process_root_motion_velocity(self.velocity, dt);
            if self.is_falling() {
                self.velocity += self.former_base_velocity_for_root_motion();
            }
            applied = true;
        }

        if self.root_motion.has_additive_velocity() {
            self.root_motion.last_pre_additive_velocity = self.velocity;
            self.root_motion
                .accumulate(AccumulateMode::Additive, self.rotation, &mut self.velocity);
            self.root_motion.is_additive_velocity_applied = true;
            applied = true;
        }

        let lift = (self.velocity - old_velocity).dot(&up());
        if applied && lift != 0.0 && self.is_moving_on_ground() {
            let liftoff_bound = if self
                .root_motion
                .last_accumulated_settings()
                .has(RootMotionSettingsFlag::UseSensitiveLiftoffCheck)
            {
                SMALL_NUMBER
            } else {
                (self.gravity_magnitude() * dt).max(SMALL_NUMBER)
            };
            if lift > liftoff_bound {
                self.set_state(ctx, MovementState::Falling);
            }
        }
    }

    /// Undo last substep's additive root motion so it does not compound.
    pub(crate) fn restore_pre_additive_root_motion_velocity(&mut self) {
        if self.root_motion.is_additive_velocity_applied {
            self.velocity = self.root_motion.last_pre_additive_velocity;
            self.root_motion.is_additive_velocity_applied = false;
        }
    }

    /// Former base velocity carried while airborne; planar only when the override keeps Z.
    fn former_base_velocity_for_root_motion(&self) -> Vec3 {
        if self.root_motion.has_override_velocity_ignore_z() {
            planar(self.decaying_former_base_velocity)
        } else {
            self.decaying_former_base_velocity
        }
    }
}
