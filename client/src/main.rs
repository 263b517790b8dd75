// Support configuring Bevy lints within code.
#![cfg_attr(bevy_lint, feature(register_tool), register_tool(bevy))]
// Disable console on Windows for non-dev builds.
#![cfg_attr(not(feature = "dev"), windows_subsystem = "windows")]

#[cfg(feature = "dev_native")]
mod debug_tools;

mod camera;
mod input;
mod player;
mod world;

use bevy::prelude::*;
use controller::{
    ControllerConfig, Direction, InputMap, MotionActionDef, MotionMode, InputId,
};

/// Optional tuning file; the built-in defaults apply when it is missing.
const CONFIG_PATH: &str = "assets/controller.json";

/// Movement solver and input buffer runs at a fixed rate independent of rendering.
const FIXED_HZ: f64 = 60.0;

fn main() -> AppExit {
    App::new().add_plugins(AppPlugin).run()
}

/// Controller configuration shared by the player and input plugins.
#[derive(Resource, Clone, Debug)]
pub struct ControllerSettings(pub ControllerConfig);

pub struct AppPlugin;
impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Window {
                title: "Character Controller".to_string(),
                fit_canvas_to_parent: true,
                ..default()
            }
            .into(),
            ..default()
        }));

        app.insert_resource(Time::<Fixed>::from_hz(FIXED_HZ));
        app.insert_resource(ControllerSettings(load_config()));

        app.add_plugins((world::plugin, player::plugin, camera::plugin, input::plugin));

        #[cfg(feature = "dev_native")]
        app.add_plugins(debug_tools::plugin);
    }
}

fn load_config() -> ControllerConfig {
    let text = match std::fs::read_to_string(CONFIG_PATH) {
        Ok(text) => text,
        Err(err) => {
            info!("no {CONFIG_PATH} ({err}), using built-in controller config");
            return default_config();
        }
    };
    match ControllerConfig::from_json(&text) {
        Ok(config) => config,
        Err(err) => {
            error!("{CONFIG_PATH} rejected: {err}; using built-in controller config");
            default_config()
        }
    }
}

fn default_config() -> ControllerConfig {
    ControllerConfig {
        input_map: InputMap::default()
            .with_button(input::JUMP)
            .with_button(input::ATTACK)
            .with_axis(input::MOVE)
            .with_directional(MotionActionDef {
                id: InputId::new(input::QUARTER_CIRCLE),
                axis: InputId::new(input::MOVE),
                relative_to_player: false,
                mode: MotionMode::Sequence {
                    steps: vec![Direction::Back, Direction::Right, Direction::Forward],
                },
            }),
        ..default()
    }
}
