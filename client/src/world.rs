use bevy::prelude::*;
use controller::{BodyId, BodyKind, CollisionWorld, KinematicWorld, WorldBodyDef, cuboid_def, plane_def};
use nalgebra as na;

pub(super) fn plugin(app: &mut App) {
    app.insert_resource(PhysicsWorld(KinematicWorld::build(level_bodies())));
    app.add_systems(Startup, setup);
    app.add_systems(FixedUpdate, drive_platforms);
    app.add_systems(Update, sync_platform_transforms);
}

/// Collision world the player moves through.
#[derive(Resource)]
pub struct PhysicsWorld(pub KinematicWorld);

/// Platform that moves back and forth along `axis`.
#[derive(Component)]
pub struct MovingPlatform {
    pub body: BodyId,
    pub origin: Vec3,
    pub axis: Vec3,
    pub amplitude: f32,
    pub period: f32,
}

const GROUND: BodyId = 1;
const STAIRS: BodyId = 10;
const STAIR_COUNT: u32 = 6;
const STAIR_RISE: f32 = 0.2;
const STAIR_RUN: f32 = 0.4;
const RAMP: BodyId = 20;
const LEDGE: BodyId = 30;
const WALL: BodyId = 40;
const PLATFORM: BodyId = 50;

const PLATFORM_ORIGIN: Vec3 = Vec3::new(-6.0, 0.2, 6.0);
const PLATFORM_HALF: Vec3 = Vec3::new(1.5, 0.1, 1.5);

pub(crate) fn to_bevy(v: na::Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub(crate) fn to_na(v: Vec3) -> na::Vector3<f32> {
    na::Vector3::new(v.x, v.y, v.z)
}

pub(crate) fn quat_to_bevy(q: na::UnitQuaternion<f32>) -> Quat {
    Quat::from_xyzw(q.i, q.j, q.k, q.w)
}

pub(crate) fn quat_to_na(q: Quat) -> na::UnitQuaternion<f32> {
    na::UnitQuaternion::new_normalize(na::Quaternion::new(q.w, q.x, q.y, q.z))
}

/// One static cuboid of the level: half extents, center and rotation.
struct Block {
    id: BodyId,
    half: Vec3,
    center: Vec3,
    rotation: Quat,
    color: Color,
}

fn blocks() -> Vec<Block> {
    let mut blocks = Vec::new();

    for i in 0..STAIR_COUNT {
        let height = STAIR_RISE * (i + 1) as f32;
        blocks.push(Block {
            id: STAIRS + i,
            half: Vec3::new(1.5, height * 0.5, STAIR_RUN * 0.5),
            center: Vec3::new(6.0, height * 0.5, 3.0 + STAIR_RUN * i as f32),
            rotation: Quat::IDENTITY,
            color: Color::srgb_u8(124, 144, 255),
        });
    }

    // 25 degree ramp.
    blocks.push(Block {
        id: RAMP,
        half: Vec3::new(1.5, 0.1, 4.0),
        center: Vec3::new(0.0, 1.2, 8.0),
        rotation: Quat::from_rotation_x(-25f32.to_radians()),
        color: Color::srgb_u8(200, 170, 110),
    });

    // Landing at the top of the stairs; its far edge is a drop.
    blocks.push(Block {
        id: LEDGE,
        half: Vec3::new(1.5, 0.6, 1.0),
        center: Vec3::new(6.0, 0.6, 3.0 + STAIR_RUN * (STAIR_COUNT as f32 - 0.5) + 1.0),
        rotation: Quat::IDENTITY,
        color: Color::srgb_u8(150, 110, 180),
    });

    // Wall taller than any step.
    blocks.push(Block {
        id: WALL,
        half: Vec3::new(4.0, 1.5, 0.25),
        center: Vec3::new(0.0, 1.5, -8.0),
        rotation: Quat::IDENTITY,
        color: Color::srgb_u8(120, 120, 120),
    });

    blocks
}

fn level_bodies() -> Vec<WorldBodyDef> {
    let mut defs = vec![plane_def(GROUND, na::UnitQuaternion::identity(), na::Vector3::zeros())];
    defs.extend(
        blocks()
            .into_iter()
            .map(|b| cuboid_def(b.id, to_na(b.half), to_na(b.center), quat_to_na(b.rotation))),
    );
    defs.push(
        cuboid_def(
            PLATFORM,
            to_na(PLATFORM_HALF),
            to_na(PLATFORM_ORIGIN),
            na::UnitQuaternion::identity(),
        )
        .with_kind(BodyKind::Kinematic),
    );
    defs
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    info!("World setup");

    commands.spawn((
        Name::new("Ground"),
        Transform::from_xyz(0., 0., 0.),
        Mesh3d(meshes.add(Plane3d::default().mesh().size(50., 50.).build())),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::linear_rgb(0.2, 0.3, 0.25),
            perceptual_roughness: 1.0,
            metallic: 0.0,
            ..default()
        })),
    ));

    for block in blocks() {
        commands.spawn((
            Mesh3d(meshes.add(Cuboid::from_size(block.half * 2.0))),
            MeshMaterial3d(materials.add(block.color)),
            Transform::from_translation(block.center).with_rotation(block.rotation),
        ));
    }

    commands.spawn((
        Name::new("MovingPlatform"),
        Mesh3d(meshes.add(Cuboid::from_size(PLATFORM_HALF * 2.0))),
        MeshMaterial3d(materials.add(Color::srgb_u8(230, 120, 80))),
        Transform::from_translation(PLATFORM_ORIGIN),
        MovingPlatform {
            body: PLATFORM,
            origin: PLATFORM_ORIGIN,
            axis: Vec3::X,
            amplitude: 4.0,
            period: 6.0,
        },
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 10_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 12.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

/// Set platform velocities for this fixed step and integrate the world.
pub(crate) fn drive_platforms(
    time: Res<Time<Fixed>>,
    platforms: Query<&MovingPlatform>,
    mut world: ResMut<PhysicsWorld>,
) {
    let dt = time.delta_secs();
    let t = time.elapsed_secs();
    for platform in &platforms {
        let omega = std::f32::consts::TAU / platform.period;
        let target = platform.origin + platform.axis * platform.amplitude * (omega * t).sin();
        let Some(state) = world.0.body_state(platform.body) else {
            continue;
        };
        // Velocity that lands exactly on the target at the end of the step.
        let velocity = if dt > 0.0 {
            (target - to_bevy(state.pose.translation.vector)) / dt
        } else {
            Vec3::ZERO
        };
        world
            .0
            .set_body_velocity(platform.body, to_na(velocity), na::Vector3::zeros());
    }
    world.0.step(dt);
}

fn sync_platform_transforms(
    world: Res<PhysicsWorld>,
    mut platforms: Query<(&MovingPlatform, &mut Transform)>,
) {
    for (platform, mut transform) in &mut platforms {
        let Some(state) = world.0.body_state(platform.body) else {
            continue;
        };
        transform.translation = to_bevy(state.pose.translation.vector);
        transform.rotation = quat_to_bevy(state.pose.rotation);
    }
}
