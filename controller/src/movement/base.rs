use nalgebra as na;

use crate::collision::{BodyId, BodyState, CollisionWorld, QueryFilter};
use crate::constants::{KINDA_SMALL_NUMBER, SMALL_NUMBER};
use crate::math::{Iso, Vec3, is_nearly_zero, planar, up};

use super::callbacks::MoveContext;
use super::solver::MovementSolver;

impl MovementSolver {
    /// Body the character currently stands on and follows.
    #[inline]
    pub fn movement_base(&self) -> Option<BodyId> {
        self.based.base
    }

    pub(crate) fn set_base(&mut self, world: &dyn CollisionWorld, base: Option<BodyId>) {
        if self.based.base == base {
            return;
        }
        log::debug!("movement base {:?} -> {:?}", self.based.base, base);
        self.based.clear();
        self.based.base = base;
        self.save_base_location(world);
    }

    /// Base on the current floor when it is walkable and allows it.
    pub(crate) fn set_base_from_floor(&mut self, world: &dyn CollisionWorld) {
        let base = if self.current_floor.is_walkable_floor() {
            self.current_floor.hit.body.filter(|id| {
                world
                    .body_state(*id)
                    .is_none_or(|b| b.surface.can_be_based_on)
            })
        } else {
            None
        };
        self.set_base(world, base);
    }

    /// Current base when it can move.
    fn movable_base(&self, world: &dyn CollisionWorld) -> Option<BodyState> {
        self.based
            .base
            .and_then(|id| world.body_state(id))
            .filter(|b| b.kind.is_movable())
    }

    /// Velocity the base hands to the character when it leaves it.
    pub fn imparted_base_velocity(&self, world: &dyn CollisionWorld) -> Vec3 {
        if !self.settings.move_with_base {
            return Vec3::zeros();
        }
        let Some(base) = self.movable_base(world) else {
            return Vec3::zeros();
        };

        let base_velocity = if self.settings.impart_base_angular_velocity {
            let foot = self.location - up() * self.capsule().total_half_height();
            base.velocity_at_point(foot)
        } else {
            base.linear_velocity
        };

        let mut imparted = Vec3::zeros();
        if self.settings.impart_base_velocity_planar {
            imparted += planar(base_velocity);
        }
        if self.settings.impart_base_velocity_vertical {
            imparted += up() * base_velocity.dot(&up());
        }
        imparted
    }

    /// Fade the velocity carried off a former base.
    pub(crate) fn decay_former_base_velocity(&mut self, dt: f32) {
        if !self.settings.move_with_base {
            return;
        }
        let half_life = self.settings.former_base_velocity_decay_half_life;
        if half_life == 0.0 {
            self.decaying_former_base_velocity = Vec3::zeros();
        } else if half_life > 0.0 {
            self.decaying_former_base_velocity *= (-dt / half_life).exp2();
        }
    }

    /// Remember where the base is so the next update can follow its motion.
    pub(crate) fn save_base_location(&mut self, world: &dyn CollisionWorld) {
        let Some(state) = self.based.base.and_then(|id| world.body_state(id)) else {
            return;
        };
        self.based.base_location = state.pose.translation.vector;
        self.based.base_rotation = state.pose.rotation;
    }

    /// Carry the character along with its base's motion since the last save.
    ///
    /// Notes
    /// - The foot point keeps its position in the base's frame.
    /// - A base that only moved vertically never drags the character sideways.
    /// - The follow move ignores the base itself, so a rising platform cannot block it.
    pub(crate) fn update_based_movement(&mut self, ctx: &mut MoveContext<'_>) {
        if !self.settings.move_with_base {
            return;
        }
        let Some(base_id) = self.based.base else {
            return;
        };
        let Some(base) = ctx.world.body_state(base_id) else {
            log::warn!("movement base {base_id} no longer exists");
            self.set_base(ctx.world, None);
            return;
        };
        if !base.kind.is_movable() {
            return;
        }

        let old_location = self.based.base_location;
        let old_rotation = self.based.base_rotation;
        let new_location = base.pose.translation.vector;
        let new_rotation = base.pose.rotation;

        let delta_rotation = new_rotation * old_rotation.inverse();
        let rotation_changed = delta_rotation.angle() > SMALL_NUMBER;
        let location_changed = old_location != new_location;
        if !rotation_changed && !location_changed {
            return;
        }

        let mut final_rotation = self.rotation;
        if rotation_changed && !self.settings.ignore_base_rotation {
            final_rotation = delta_rotation * self.rotation;
        }

        let foot_offset = up() * self.capsule().total_half_height();
        let old_base = Iso::from_parts(na::Translation3::from(old_location), old_rotation);
        let new_base = Iso::from_parts(na::Translation3::from(new_location), new_rotation);
        let local_foot = old_base.inverse_transform_point(&na::Point3::from(self.location - foot_offset));
        let new_world = new_base.transform_point(&local_foot).coords + foot_offset;
        let mut delta = new_world - self.location;

        if !rotation_changed {
            let base_move = new_location - old_location;
            if is_nearly_zero(planar(base_move), SMALL_NUMBER) {
                delta.x = 0.0;
                delta.z = 0.0;
            }
        }

        let start = self.location;
        let previous_filter = self.move_filter;
        self.move_filter = QueryFilter::excluding(base_id);
        let hit = self.move_updated(ctx.world, delta, final_rotation);
        self.move_filter = previous_filter;

        if !is_nearly_zero(self.location - (start + delta), KINDA_SMALL_NUMBER) {
            log::warn!(
                "unable to follow base {base_id}: wanted {:?}, blocked by {:?}",
                delta,
                hit.body
            );
        }
    }
}
