/*!
The movement solver: one character's kinematic state and its per-update entry point.

`perform_movement` runs once per host update:
1) Skip when movement is disabled or the character is simulated by physics.
2) Follow the moving base.
3) Retire finished root-motion sources, apply queued impulses, forces and launches.
4) Tick the pose for animation root motion and prepare root-motion sources.
5) Run the sub-stepped tick of the current state (`tick.rs`).
6) Rotate (animation root motion, then an override source, then the host callback).
7) Save the base location and the last-update snapshot.

Notes
- The solver never owns the collision world or the host callbacks; both are borrowed per
  call through `MoveContext`.
- State transitions go through `set_state`, which keeps the floor, the base and the
  accumulated forces consistent with the new state.
*/

use crate::collision::{BodyId, CapsuleSpec, CollisionWorld, QueryFilter};
use crate::constants::GRAVITY_MPS2;
use crate::math::{Quat, Vec3, plane_project, safe_normal, up};

use super::callbacks::{MoveContext, MovementCallbacks};
use super::floor::GroundingStatus;
use super::forces::PhysicsInteraction;
use super::root_motion::{AnimationRootMotion, RootMotionSourceGroup};
use super::settings::{MovementSettings, StabilityOrientation};
use super::state::{BasedMovementInfo, MovementState};

pub struct MovementSolver {
    pub(crate) settings: MovementSettings,

    pub(crate) location: Vec3,
    pub(crate) rotation: Quat,
    pub(crate) velocity: Vec3,
    pub(crate) acceleration: Vec3,
    /// Acceleration the host is asking for; only used to aim physics pushes.
    pub(crate) input_acceleration: Vec3,
    pub(crate) state: MovementState,

    pub(crate) current_floor: GroundingStatus,
    pub(crate) force_next_floor_check: bool,
    pub(crate) just_teleported: bool,
    pub(crate) can_move: bool,
    /// Set while an external physics body drives the character.
    pub(crate) simulated_velocity: Option<Vec3>,

    pub(crate) based: BasedMovementInfo,
    pub(crate) decaying_former_base_velocity: Vec3,
    pub(crate) move_filter: QueryFilter,

    pub(crate) pending_impulse: Vec3,
    pub(crate) pending_force: Vec3,
    pub(crate) pending_launch: Vec3,
    pub(crate) physics_outbox: Vec<PhysicsInteraction>,

    pub(crate) root_motion: RootMotionSourceGroup,
    pub(crate) anim_root_motion: Option<AnimationRootMotion>,

    pub(crate) last_update_location: Vec3,
    pub(crate) last_update_rotation: Quat,
    pub(crate) last_update_velocity: Vec3,
}

impl MovementSolver {
    /// A solver at `location`, falling until its first update finds a floor.
    pub fn new(settings: MovementSettings, location: Vec3, rotation: Quat) -> Self {
        Self {
            settings,
            location,
            rotation,
            velocity: Vec3::zeros(),
            acceleration: Vec3::zeros(),
            input_acceleration: Vec3::zeros(),
            state: MovementState::Falling,
            current_floor: GroundingStatus::default(),
            force_next_floor_check: true,
            just_teleported: false,
            can_move: true,
            simulated_velocity: None,
            based: BasedMovementInfo::default(),
            decaying_former_base_velocity: Vec3::zeros(),
            move_filter: QueryFilter::default(),
            pending_impulse: Vec3::zeros(),
            pending_force: Vec3::zeros(),
            pending_launch: Vec3::zeros(),
            physics_outbox: Vec::new(),
            root_motion: RootMotionSourceGroup::default(),
            anim_root_motion: None,
            last_update_location: location,
            last_update_rotation: rotation,
            last_update_velocity: Vec3::zeros(),
        }
    }

    #[inline]
    pub fn settings(&self) -> &MovementSettings {
        &self.settings
    }

    #[inline]
    pub fn location(&self) -> Vec3 {
        self.location
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Velocity change over the last update divided by its length.
    #[inline]
    pub fn acceleration(&self) -> Vec3 {
        self.acceleration
    }

    #[inline]
    pub fn movement_state(&self) -> MovementState {
        self.state
    }

    #[inline]
    pub fn is_falling(&self) -> bool {
        self.state == MovementState::Falling
    }

    #[inline]
    pub fn is_moving_on_ground(&self) -> bool {
        self.state == MovementState::Grounded
    }

    #[inline]
    pub fn current_floor(&self) -> &GroundingStatus {
        &self.current_floor
    }

    /// Ignore `body` in every movement sweep (usually the host's own collider).
    pub fn set_ignored_body(&mut self, body: Option<BodyId>) {
        self.move_filter = QueryFilter { exclude_body: body };
    }

    /// Teleport. The next update re-probes the floor.
    pub fn set_location(&mut self, location: Vec3) {
        self.location = location;
        self.force_next_floor_check = true;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }

    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    pub fn set_input_acceleration(&mut self, acceleration: Vec3) {
        self.input_acceleration = acceleration;
    }

    pub fn set_can_move(&mut self, can_move: bool) {
        self.can_move = can_move;
    }

    /// Hand the character to an external physics body (`Some(velocity)` every update) or take
    /// it back (`None`).
    pub fn set_simulated_velocity(&mut self, velocity: Option<Vec3>) {
        self.simulated_velocity = velocity;
    }

    #[inline]
    pub(crate) fn capsule(&self) -> CapsuleSpec {
        self.settings.capsule()
    }

    /// Gravity acceleration for this character.
    #[inline]
    pub fn gravity(&self) -> Vec3 {
        -up() * self.gravity_magnitude()
    }

    /// Reference up axis for floor stability, per `stability_orientation`.
    pub fn stability_up(&self) -> Vec3 {
        match self.settings.stability_orientation {
            StabilityOrientation::Gravity => safe_normal(-self.gravity()),
            StabilityOrientation::CapsuleUp => self.rotation * Vec3::y(),
        }
    }

    #[inline]
    pub fn gravity_magnitude(&self) -> f32 {
        GRAVITY_MPS2 * self.settings.gravity_scale
    }

    pub fn set_movement_state(
        &mut self,
        world: &dyn CollisionWorld,
        callbacks: &mut dyn MovementCallbacks,
        state: MovementState,
    ) {
        let mut ctx = MoveContext::new(world, callbacks);
        self.set_state(&mut ctx, state);
    }

    /// Stop moving entirely; `perform_movement` becomes a no-op until re-enabled.
    pub fn disable_movement(&mut self, world: &dyn CollisionWorld, callbacks: &mut dyn MovementCallbacks) {
        self.set_movement_state(world, callbacks, MovementState::None);
    }

    /// Resume on the ground, or falling when there is no floor.
    pub fn enable_movement(&mut self, world: &dyn CollisionWorld, callbacks: &mut dyn MovementCallbacks) {
        self.set_movement_state(world, callbacks, MovementState::Grounded);
    }

    pub(crate) fn set_state(&mut self, ctx: &mut MoveContext<'_>, state: MovementState) {
        if self.state == state {
            return;
        }
        let previous = self.state;
        self.state = state;
        self.on_movement_state_changed(ctx, previous);
    }

    fn on_movement_state_changed(&mut self, ctx: &mut MoveContext<'_>, previous: MovementState) {
        match self.state {
            MovementState::Grounded => {
                let location = self.location;
                self.current_floor = self.find_floor(ctx.world, location, false, None);
                if !self.current_floor.is_walkable_floor() {
                    log::debug!("no walkable floor under {location:?}; falling instead");
                    self.state = previous;
                    self.set_state(ctx, MovementState::Falling);
                    return;
                }
                self.adjust_floor_height(ctx.world);
                self.set_base_from_floor(ctx.world);
                if previous == MovementState::Falling {
                    self.velocity = plane_project(self.velocity, self.current_floor.hit.impact_normal);
                }
            }
            MovementState::Falling => {
                self.decaying_former_base_velocity = self.imparted_base_velocity(ctx.world);
                self.velocity += self.decaying_former_base_velocity;
                self.current_floor.clear();
                self.set_base(ctx.world, None);
            }
            MovementState::General => {
                self.current_floor.clear();
                self.set_base(ctx.world, None);
            }
            MovementState::None => {
                self.current_floor.clear();
                self.set_base(ctx.world, None);
                self.root_motion.clear();
                self.clear_accumulated_forces();
            }
        }

        log::debug!("movement state {previous:?} -> {:?}", self.state);
        ctx.callbacks.on_movement_state_changed(previous, self.state);
    }

    /// Advance the character by `dt` seconds.
    pub fn perform_movement(&mut self, world: &dyn CollisionWorld, callbacks: &mut dyn MovementCallbacks, dt: f32) {
        let mut ctx = MoveContext::new(world, callbacks);
        if !self.pre_movement_update(&mut ctx, dt) {
            return;
        }

        let initial_velocity = self.velocity;

        self.update_based_movement(&mut ctx);

        self.root_motion.clean_up_invalid(&mut self.velocity);

        self.apply_accumulated_forces(&mut ctx, dt);
        let launched = self.handle_pending_launch(&mut ctx);
        self.clear_accumulated_forces();
        if launched && self.root_motion.is_additive_velocity_applied {
            // A launch replaces the velocity the additive sources were layered on.
            self.root_motion.last_pre_additive_velocity = self.velocity;
        }

        let pose_root_motion = ctx.callbacks.tick_pose(dt);
        self.anim_root_motion = pose_root_motion.filter(|rm| !self.should_discard_root_motion(rm));

        if self.root_motion.has_active_sources() {
            let location = self.location;
            self.root_motion.prepare(dt, location);
        }

        if self.has_root_motion_override() {
            self.init_apply_root_motion_to_velocity(&mut ctx, dt);
        }

        debug_assert!(
            self.velocity.iter().all(|c| c.is_finite()),
            "velocity is not finite before the tick: {:?}",
            self.velocity
        );

        self.start_movement_tick(&mut ctx, dt, 0);

        self.update_rotation(&mut ctx, dt);
        self.anim_root_motion = None;

        self.save_base_location(ctx.world);
        self.last_update_location = self.location;
        self.last_update_rotation = self.rotation;
        self.last_update_velocity = self.velocity;

        if self.settings.enable_physics_interaction && self.is_moving_on_ground() {
            self.apply_downward_force(ctx.world);
        }

        if dt > 0.0 {
            self.acceleration = (self.velocity - initial_velocity) / dt;
        }
    }

    /// Returns false when this update must not move the character.
    fn pre_movement_update(&mut self, ctx: &mut MoveContext<'_>, dt: f32) -> bool {
        if !self.can_move || self.simulated_velocity.is_some() || !self.state.is_active() {
            // Keep the pose ticking, but drop anything it would have moved us by.
            let _ = ctx.callbacks.tick_pose(dt);
            self.root_motion.clear();
            self.clear_accumulated_forces();
            if let Some(velocity) = self.simulated_velocity {
                self.velocity = velocity;
            }
            self.acceleration = Vec3::zeros();
            return false;
        }

        if self.is_moving_on_ground() && self.location != self.last_update_location {
            self.force_next_floor_check = true;
        }

        if self.root_motion.is_additive_velocity_applied {
            // The host changed the velocity between updates; carry that into the snapshot.
            let adjustment = self.velocity - self.last_update_velocity;
            self.root_motion.last_pre_additive_velocity += adjustment;
        }
        true
    }

    fn update_rotation(&mut self, ctx: &mut MoveContext<'_>, dt: f32) {
        let rotation = if let Some((_, delta)) = self.anim_root_motion_world() {
            Some(ctx.callbacks.post_process_root_motion_rotation(delta * self.rotation, dt))
        } else if let Some(delta) = self.root_motion.override_rotation() {
            Some(ctx.callbacks.post_process_root_motion_rotation(delta * self.rotation, dt))
        } else {
            ctx.callbacks.update_rotation(self.rotation, self.velocity, dt)
        };

        if let Some(rotation) = rotation {
            self.move_updated(ctx.world, Vec3::zeros(), rotation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{BodyKind, KinematicWorld, SweepHit, cuboid_def, plane_def};
    use crate::constants::{MAX_FLOOR_DIST, MIN_FLOOR_DIST};
    use crate::movement::{RootMotionForce, RootMotionSource, VelocityContext};

    const DT: f32 = 1.0 / 60.0;

    fn ground() -> KinematicWorld {
        KinematicWorld::build(vec![plane_def(1, Quat::identity(), Vec3::zeros())])
    }

    fn step_world(step_height: f32) -> KinematicWorld {
        KinematicWorld::build(vec![
            plane_def(1, Quat::identity(), Vec3::zeros()),
            cuboid_def(
                2,
                Vec3::new(2.0, step_height * 0.5, 2.0),
                Vec3::new(3.0, step_height * 0.5, 0.0),
                Quat::identity(),
            ),
        ])
    }

    /// Walk at `desired` on the ground, fall under gravity in the air.
    fn walker(desired: Vec3) -> impl FnMut(&mut VelocityContext) {
        move |ctx: &mut VelocityContext| match ctx.state {
            MovementState::Grounded => ctx.velocity = desired,
            MovementState::Falling => ctx.velocity += ctx.gravity * ctx.dt,
            _ => {}
        }
    }

    fn standing_solver(world: &KinematicWorld) -> MovementSolver {
        let mut solver = MovementSolver::new(
            MovementSettings::default(),
            Vec3::new(0.0, 0.9215, 0.0),
            Quat::identity(),
        );
        let mut idle = |_: &mut VelocityContext| {};
        solver.set_movement_state(world, &mut idle, MovementState::Grounded);
        assert!(solver.is_moving_on_ground());
        solver
    }

    #[test]
    fn falling_character_lands_within_floor_band() {
        let world = ground();
        let mut solver = MovementSolver::new(MovementSettings::default(), Vec3::new(0.0, 3.0, 0.0), Quat::identity());
        let mut callbacks = walker(Vec3::zeros());

        for _ in 0..120 {
            solver.perform_movement(&world, &mut callbacks, DT);
            assert!(!(solver.is_falling() && solver.is_moving_on_ground()));
        }

        assert!(solver.is_moving_on_ground());
        let bottom = solver.location().y - 0.9;
        assert!(bottom >= MIN_FLOOR_DIST - 0.005, "bottom {bottom}");
        assert!(bottom <= MAX_FLOOR_DIST + 0.005, "bottom {bottom}");
        assert!(solver.velocity().norm() < 1.0e-3);
        assert_eq!(solver.movement_base(), Some(1));
    }

    #[test]
    fn walking_up_a_low_step_never_spikes_or_gains_speed() {
        let world = step_world(0.3);
        let mut solver = standing_solver(&world);
        let mut callbacks = walker(Vec3::new(2.0, 0.0, 0.0));

        for _ in 0..90 {
            solver.perform_movement(&world, &mut callbacks, DT);
            assert!(solver.velocity().norm() <= 2.0 + 1.0e-3);
            if solver.is_moving_on_ground() {
                assert!(solver.velocity().y.abs() < 1.0e-3, "v {:?}", solver.velocity());
            }
        }

        assert!(solver.is_moving_on_ground());
        assert!(solver.location().x > 2.5);
        assert!((solver.location().y - (0.3 + 0.9215)).abs() < 0.05);
    }

    #[test]
    fn wall_taller_than_step_height_blocks() {
        let world = step_world(0.6);
        let mut solver = standing_solver(&world);
        let mut callbacks = walker(Vec3::new(2.0, 0.0, 0.0));

        for _ in 0..60 {
            solver.perform_movement(&world, &mut callbacks, DT);
        }

        assert!(solver.is_moving_on_ground());
        assert!(solver.location().x < 0.66);
        assert!((solver.location().y - 0.9215).abs() < 0.01);
    }

    #[test]
    fn grounded_without_floor_falls_back_to_falling() {
        let world = KinematicWorld::build(Vec::new());
        let mut solver = MovementSolver::new(MovementSettings::default(), Vec3::new(0.0, 5.0, 0.0), Quat::identity());
        let mut transitions = Vec::new();

        struct Recorder<'a>(&'a mut Vec<(MovementState, MovementState)>);
        impl MovementCallbacks for Recorder<'_> {
            fn calculate_velocity(&mut self, _ctx: &mut VelocityContext) {}
            fn on_movement_state_changed(&mut self, previous: MovementState, current: MovementState) {
                self.0.push((previous, current));
            }
        }

        solver.set_movement_state(&world, &mut Recorder(&mut transitions), MovementState::Grounded);
        assert!(solver.is_falling());
        assert!(transitions.is_empty());

        solver.set_movement_state(&world, &mut Recorder(&mut transitions), MovementState::General);
        assert_eq!(transitions, vec![(MovementState::Falling, MovementState::General)]);
    }

    #[test]
    fn override_source_drives_airborne_velocity() {
        let world = KinematicWorld::build(Vec::new());
        let mut solver = MovementSolver::new(MovementSettings::default(), Vec3::new(0.0, 5.0, 0.0), Quat::identity());
        solver.apply_root_motion_source(
            RootMotionSource::new(
                "dash",
                RootMotionForce::ConstantForce {
                    force: Vec3::new(3.0, 0.0, 0.0),
                    strength_over_time: None,
                },
            )
            .with_duration(1.0),
        );

        let mut callbacks = walker(Vec3::zeros());
        solver.perform_movement(&world, &mut callbacks, 0.1);

        assert!((solver.location().x - 0.3).abs() < 1.0e-3);
        assert!((solver.location().y - 5.0).abs() < 1.0e-4);
        assert!(solver.is_falling());
    }

    #[test]
    fn disabled_solver_does_not_move() {
        let world = ground();
        let mut solver = standing_solver(&world);
        let mut callbacks = walker(Vec3::new(2.0, 0.0, 0.0));
        solver.disable_movement(&world, &mut callbacks);
        let before = solver.location();

        solver.perform_movement(&world, &mut callbacks, DT);
        assert_eq!(solver.location(), before);
        assert_eq!(solver.movement_state(), MovementState::None);

        solver.enable_movement(&world, &mut callbacks);
        assert!(solver.is_moving_on_ground());
    }

    #[test]
    fn character_rides_moving_platform() {
        let mut world = KinematicWorld::build(vec![
            cuboid_def(7, Vec3::new(2.0, 0.1, 2.0), Vec3::new(0.0, -0.1, 0.0), Quat::identity())
                .with_kind(BodyKind::Kinematic),
        ]);
        world.set_body_velocity(7, Vec3::new(1.0, 0.0, 0.0), Vec3::zeros());
        let mut solver = standing_solver(&world);
        assert_eq!(solver.movement_base(), Some(7));
        let mut callbacks = walker(Vec3::zeros());

        for _ in 0..30 {
            world.step(DT);
            solver.perform_movement(&world, &mut callbacks, DT);
        }

        assert!(solver.is_moving_on_ground());
        assert!((solver.location().x - 0.5).abs() < 0.02, "x {}", solver.location().x);
    }

    #[test]
    fn launch_lifts_character_off_the_ground() {
        let world = ground();
        let mut solver = standing_solver(&world);
        let mut callbacks = walker(Vec3::zeros());

        solver.launch(Vec3::new(0.0, 6.0, 0.0));
        solver.perform_movement(&world, &mut callbacks, DT);

        assert!(solver.is_falling());
        assert!(solver.location().y > 0.9215);
    }

    #[test]
    fn landing_notifies_host() {
        struct Landing {
            landed: Option<SweepHit>,
        }
        impl MovementCallbacks for Landing {
            fn calculate_velocity(&mut self, ctx: &mut VelocityContext) {
                if ctx.state == MovementState::Falling {
                    ctx.velocity += ctx.gravity * ctx.dt;
                }
            }
            fn on_landed(&mut self, hit: &SweepHit) {
                self.landed = Some(*hit);
            }
        }

        let world = ground();
        let mut solver = MovementSolver::new(MovementSettings::default(), Vec3::new(0.0, 1.5, 0.0), Quat::identity());
        let mut callbacks = Landing { landed: None };
        for _ in 0..60 {
            solver.perform_movement(&world, &mut callbacks, DT);
        }

        let hit = callbacks.landed.expect("never landed");
        assert_eq!(hit.body, Some(1));
        assert!(hit.impact_normal.y > 0.99);
    }
}
