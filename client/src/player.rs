use bevy::prelude::*;
use controller::{
    FinishVelocity, MovementCallbacks, MovementSolver, MovementState, RootMotionForce,
    RootMotionSettingsFlag, RootMotionSource, VelocityContext,
};
use leafwing_input_manager::prelude::ActionState;
use nalgebra as na;

use crate::{
    ControllerSettings,
    input::{BufferedInput, InputAction, PlayerAction, PlayerActions},
    world::{PhysicsWorld, drive_platforms, quat_to_bevy, to_bevy, to_na},
};

const SPAWN: Vec3 = Vec3::new(0.0, 2.0, 0.0);
const WALK_SPEED: f32 = 5.0;
const GROUND_ACCELERATION: f32 = 40.0;
const AIR_ACCELERATION: f32 = 12.0;
const JUMP_SPEED: f32 = 7.0;
const DASH_SPEED: f32 = 14.0;
const DASH_SECONDS: f32 = 0.2;
const TURN_RATE: f32 = 12.0;
const RENDER_DECAY_RATE: f32 = 24.0;

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<PlayerIntent>();
    app.add_systems(Startup, spawn_player);
    app.add_systems(Update, (read_intent, interpolate).chain());
    app.add_systems(FixedUpdate, move_player.after(drive_platforms));
}

#[derive(Component)]
pub struct LocalPlayer;

/// Kinematic state of the player, advanced on the fixed schedule.
#[derive(Component)]
pub struct CharacterMotor(pub MovementSolver);

/// Latest solver pose; the render `Transform` eases toward it.
#[derive(Component, Default)]
struct SimTransform {
    translation: Vec3,
    rotation: Quat,
}

/// What the player wants this fixed step, in world space.
#[derive(Resource, Default)]
struct PlayerIntent {
    desired_velocity: Vec3,
    jump: bool,
    dash: bool,
}

fn spawn_player(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    settings: Res<ControllerSettings>,
) {
    let movement = settings.0.movement.clone();
    let radius = movement.capsule_radius;
    let half_length = movement.capsule_half_height;
    let solver = MovementSolver::new(movement, to_na(SPAWN), na::UnitQuaternion::identity());

    commands
        .spawn((
            Name::new("Player"),
            LocalPlayer,
            Mesh3d(meshes.add(Mesh::from(Capsule3d { radius, half_length }))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: Color::linear_rgb(0.2, 0.9, 0.8),
                ..default()
            })),
            Transform::from_translation(SPAWN),
            SimTransform {
                translation: SPAWN,
                rotation: Quat::IDENTITY,
            },
            CharacterMotor(solver),
        ))
        .with_children(|parent| {
            // Eyes mark the facing (+Z is forward).
            let eye_mesh = meshes.add(Mesh::from(Sphere { radius: 0.08 }));
            let eye_mat = materials.add(StandardMaterial {
                base_color: Color::srgb(1.0, 1.0, 1.0),
                ..default()
            });
            for x in [-0.12, 0.12] {
                parent.spawn((
                    Mesh3d(eye_mesh.clone()),
                    MeshMaterial3d(eye_mat.clone()),
                    Transform::from_xyz(x, half_length, radius),
                ));
            }
        });
}

/// Camera looks along +Z, so stick right is world -X.
fn stick_to_world(stick: Vec2) -> Vec3 {
    Vec3::new(-stick.x, 0.0, stick.y)
}

fn read_intent(
    actions: Res<ActionState<InputAction>>,
    queued: Res<PlayerActions>,
    buffer: Option<ResMut<BufferedInput>>,
    player: Single<&CharacterMotor, With<LocalPlayer>>,
    mut intent: ResMut<PlayerIntent>,
) {
    let stick = actions.axis_pair(&InputAction::Move).clamp_length_max(1.0);
    intent.desired_velocity = stick_to_world(stick) * WALK_SPEED;

    for action in queued.drain() {
        match action {
            PlayerAction::Jump => intent.jump = true,
            PlayerAction::Dash => intent.dash = true,
            PlayerAction::Attack => debug!("attack"),
        }
    }

    // Player-relative gestures classify the stick against the facing, in stick space.
    if let Some(mut buffer) = buffer {
        let forward = quat_to_bevy(player.0.rotation()) * Vec3::Z;
        buffer
            .0
            .set_facing(controller::Vec2::new(-forward.x, forward.z));
    }
}

fn approach(current: na::Vector3<f32>, target: na::Vector3<f32>, max_change: f32) -> na::Vector3<f32> {
    let change = target - current;
    let len = change.norm();
    if len > max_change && len > 0.0 {
        current + change * (max_change / len)
    } else {
        target
    }
}

/// Velocity and rotation policy for the player.
struct PlayerCallbacks {
    desired: na::Vector3<f32>,
    jump: bool,
}

impl MovementCallbacks for PlayerCallbacks {
    fn calculate_velocity(&mut self, ctx: &mut VelocityContext) {
        let planar = na::Vector3::new(ctx.velocity.x, 0.0, ctx.velocity.z);
        match ctx.state {
            MovementState::Grounded => {
                ctx.velocity = approach(planar, self.desired, GROUND_ACCELERATION * ctx.dt);
                if std::mem::take(&mut self.jump) {
                    ctx.velocity.y = JUMP_SPEED;
                    ctx.requested_state = Some(MovementState::Falling);
                }
            }
            MovementState::Falling => {
                let steered = approach(planar, self.desired, AIR_ACCELERATION * ctx.dt);
                ctx.velocity = na::Vector3::new(steered.x, ctx.velocity.y, steered.z) + ctx.gravity * ctx.dt;
            }
            MovementState::General | MovementState::None => {}
        }
    }

    fn update_rotation(
        &mut self,
        rotation: na::UnitQuaternion<f32>,
        velocity: na::Vector3<f32>,
        dt: f32,
    ) -> Option<na::UnitQuaternion<f32>> {
        let planar = na::Vector3::new(velocity.x, 0.0, velocity.z);
        if planar.norm_squared() < 0.01 {
            return None;
        }
        let target = na::UnitQuaternion::face_towards(&planar, &na::Vector3::y());
        Some(
            rotation
                .try_slerp(&target, (TURN_RATE * dt).min(1.0), 1.0e-6)
                .unwrap_or(target),
        )
    }

    fn on_landed(&mut self, hit: &controller::SweepHit) {
        debug!("landed on {:?}", hit.body);
    }

    fn on_stuck_in_geometry(&mut self, hit: &controller::SweepHit) {
        warn!("player stuck at {:?}", hit.location);
    }
}

fn move_player(
    time: Res<Time<Fixed>>,
    mut world: ResMut<PhysicsWorld>,
    mut intent: ResMut<PlayerIntent>,
    mut player: Single<(&mut CharacterMotor, &mut SimTransform), With<LocalPlayer>>,
) {
    let dt = time.delta_secs();
    let (motor, sim) = &mut *player;
    let solver = &mut motor.0;

    if std::mem::take(&mut intent.dash) {
        let forward = solver.rotation() * na::Vector3::z();
        solver.apply_root_motion_source(
            RootMotionSource::new(
                "dash",
                RootMotionForce::ConstantForce {
                    force: forward * DASH_SPEED,
                    strength_over_time: None,
                },
            )
            .with_duration(DASH_SECONDS)
            .with_setting(RootMotionSettingsFlag::IgnoreZAccumulate)
            .with_finish_velocity(FinishVelocity::ClampVelocity(WALK_SPEED)),
        );
    }

    let mut callbacks = PlayerCallbacks {
        desired: to_na(intent.desired_velocity),
        jump: std::mem::take(&mut intent.jump),
    };
    solver.perform_movement(&world.0, &mut callbacks, dt);

    for interaction in solver.drain_physics_interactions() {
        interaction.apply(&mut world.0);
    }

    // Fell off the level.
    if solver.location().y < -20.0 {
        solver.set_location(to_na(SPAWN));
        solver.set_velocity(na::Vector3::zeros());
    }

    sim.translation = to_bevy(solver.location());
    sim.rotation = quat_to_bevy(solver.rotation());
}

fn interpolate(time: Res<Time>, mut query: Query<(&mut Transform, &SimTransform)>) {
    let dt = time.delta_secs();
    for (mut transform, sim) in &mut query {
        transform
            .translation
            .smooth_nudge(&sim.translation, RENDER_DECAY_RATE, dt);
        transform.rotation.smooth_nudge(&sim.rotation, RENDER_DECAY_RATE, dt);
    }
}
