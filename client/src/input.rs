use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use controller::{
    Delegate, InputBuffer, InputId, InputValue, SequenceOrder, TriggerEvent,
};
use leafwing_input_manager::prelude::*;

use crate::ControllerSettings;

#[derive(Reflect, Actionlike, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputAction {
    #[actionlike(DualAxis)]
    Move,
    Jump,
    Attack,
}

impl InputAction {
    /// Buffer channel fed by this action.
    fn channel(self) -> &'static str {
        match self {
            InputAction::Move => MOVE,
            InputAction::Jump => JUMP,
            InputAction::Attack => ATTACK,
        }
    }
}

pub const MOVE: &str = "move";
pub const JUMP: &str = "jump";
pub const ATTACK: &str = "attack";
/// Quarter circle forward on the move stick.
pub const QUARTER_CIRCLE: &str = "quarter_circle";

/// What the buffered bindings asked the player to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerAction {
    Jump,
    Attack,
    Dash,
}

/// Queue the binding delegates push into; drained by the player systems.
#[derive(Resource, Clone, Default)]
pub struct PlayerActions(pub Arc<Mutex<Vec<PlayerAction>>>);

impl PlayerActions {
    fn push(&self, action: PlayerAction) {
        match self.0.lock() {
            Ok(mut queue) => queue.push(action),
            Err(err) => error!("player action queue poisoned: {err}"),
        }
    }

    pub fn drain(&self) -> Vec<PlayerAction> {
        match self.0.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => Vec::new(),
        }
    }
}

#[derive(Resource)]
pub struct BufferedInput(pub InputBuffer);

pub(super) fn plugin(app: &mut App) {
    app.add_plugins(InputManagerPlugin::<InputAction>::default());

    app.register_type::<InputAction>();

    let input_map = InputMap::<InputAction>::default()
        .with_dual_axis(InputAction::Move, VirtualDPad::wasd())
        .with_dual_axis(InputAction::Move, GamepadStick::LEFT)
        .with(InputAction::Jump, KeyCode::Space)
        .with(InputAction::Jump, GamepadButton::South)
        .with(InputAction::Attack, MouseButton::Left)
        .with(InputAction::Attack, GamepadButton::West);
    app.insert_resource(input_map);
    app.insert_resource(ActionState::<InputAction>::default());
    app.init_resource::<PlayerActions>();

    app.add_systems(Startup, setup_input_buffer);
    app.add_systems(PreUpdate, feed_input_buffer.after(InputManagerSystem::Update));
}

fn setup_input_buffer(
    mut commands: Commands,
    settings: Res<ControllerSettings>,
    actions: Res<PlayerActions>,
) {
    let config = &settings.0;
    let mut buffer = match InputBuffer::new(&config.input_map, config.input_settings) {
        Ok(buffer) => buffer,
        Err(err) => {
            error!("invalid input configuration, input buffer disabled: {err}");
            return;
        }
    };

    let queue = actions.clone();
    buffer.bind_action(
        InputId::new(JUMP),
        TriggerEvent::Press,
        true,
        0,
        Delegate::action(move |_, _| queue.push(PlayerAction::Jump)),
    );

    let queue = actions.clone();
    buffer.bind_action(
        InputId::new(ATTACK),
        TriggerEvent::Press,
        true,
        0,
        Delegate::action(move |_, _| queue.push(PlayerAction::Attack)),
    );

    // Higher priority so the gesture combo wins over a plain attack.
    let queue = actions.clone();
    buffer.bind_directional_action_sequence(
        InputId::new(ATTACK),
        InputId::new(QUARTER_CIRCLE),
        SequenceOrder::DirectionalFirst,
        true,
        10,
        Delegate::action(move |_, _| queue.push(PlayerAction::Dash)),
    );

    commands.insert_resource(BufferedInput(buffer));
}

/// Forward this frame's action state to the buffer and run its cadence.
fn feed_input_buffer(
    actions: Res<ActionState<InputAction>>,
    buffer: Option<ResMut<BufferedInput>>,
    time: Res<Time>,
) {
    let Some(mut buffer) = buffer else {
        return;
    };
    let buffer = &mut buffer.0;

    for action in [InputAction::Jump, InputAction::Attack] {
        let id = InputId::new(action.channel());
        if actions.pressed(&action) {
            let held = actions.current_duration(&action).as_secs_f32();
            buffer.trigger_input(&id, InputValue::pressed(), held);
        } else if actions.just_released(&action) {
            buffer.complete_input(&id);
        }
    }

    let stick = actions.axis_pair(&InputAction::Move);
    let id = InputId::new(InputAction::Move.channel());
    if stick.length_squared() > 0.0 {
        buffer.trigger_input(&id, InputValue::axis(stick.x, stick.y), 0.0);
    } else {
        buffer.complete_input(&id);
    }

    buffer.tick(time.delta_secs());
}
