use crate::player::LocalPlayer;
use bevy::{camera::Exposure, prelude::*};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Startup, add_camera);
    app.add_systems(PostUpdate, follow_player);
}

// Behind the player, looking along +Z.
const CAMERA_OFFSET_GLOBAL: Vec3 = Vec3::new(0.0, 9.0, -12.0);
const CAMERA_DECAY_RATE: f32 = 12.0;

fn add_camera(mut commands: Commands) {
    commands.spawn((
        Exposure { ev100: 13.0 },
        bevy::core_pipeline::tonemapping::Tonemapping::AcesFitted,
        Camera3d::default(),
        Transform::from_translation(CAMERA_OFFSET_GLOBAL).looking_at(Vec3::ZERO, Vec3::Y),
        DistanceFog {
            color: Color::srgba(0.35, 0.48, 0.66, 1.0),
            directional_light_color: Color::srgba(1.0, 0.95, 0.85, 0.5),
            directional_light_exponent: 30.0,
            falloff: FogFalloff::from_visibility_colors(
                200.0,
                Color::srgb(0.35, 0.5, 0.66),
                Color::srgb(0.8, 0.8, 0.7),
            ),
        },
    ));
}

fn follow_player(
    mut camera: Single<&mut Transform, With<Camera3d>>,
    player: Single<&Transform, (With<LocalPlayer>, Without<Camera3d>)>,
    time: Res<Time>,
) {
    let target = player.translation + CAMERA_OFFSET_GLOBAL;
    camera
        .translation
        .smooth_nudge(&target, CAMERA_DECAY_RATE, time.delta_secs());
}
