//! Debug tooling for native dev builds: perf overlay plus a text readout of
//! the movement solver and the input buffer.

use bevy::diagnostic::{
    EntityCountDiagnosticsPlugin, FrameTimeDiagnosticsPlugin, SystemInformationDiagnosticsPlugin,
};
use bevy::prelude::*;
use bevy::render::diagnostic::RenderDiagnosticsPlugin;
use iyes_perf_ui::prelude::*;

use crate::input::BufferedInput;
use crate::player::{CharacterMotor, LocalPlayer};

pub(super) fn plugin(app: &mut App) {
    app.add_plugins((
        FrameTimeDiagnosticsPlugin::default(),
        EntityCountDiagnosticsPlugin::default(),
        SystemInformationDiagnosticsPlugin::default(),
        RenderDiagnosticsPlugin,
        PerfUiPlugin,
    ));

    app.add_systems(Startup, (spawn_perf_ui, spawn_controller_readout));
    app.add_systems(Update, update_controller_readout);
}

#[derive(Component)]
struct ControllerReadout;

fn spawn_perf_ui(mut commands: Commands) {
    commands.spawn(PerfUiAllEntries::default());
}

fn spawn_controller_readout(mut commands: Commands) {
    commands.spawn((
        Name::new("ControllerReadout"),
        ControllerReadout,
        Text::default(),
        TextFont {
            font_size: 13.0,
            ..default()
        },
        Node {
            position_type: PositionType::Absolute,
            bottom: Val::Px(8.0),
            left: Val::Px(8.0),
            ..default()
        },
    ));
}

fn update_controller_readout(
    mut readout: Single<&mut Text, With<ControllerReadout>>,
    player: Option<Single<&CharacterMotor, With<LocalPlayer>>>,
    buffer: Option<Res<BufferedInput>>,
) {
    let mut lines = String::new();
    if let Some(player) = player {
        lines.push_str(&player.0.debug_display());
    }
    if let Some(buffer) = buffer {
        if !lines.is_empty() {
            lines.push('\n');
        }
        lines.push_str(&buffer.0.debug_display());
    }
    readout.0 = lines;
}
