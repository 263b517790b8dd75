/*!
Input buffer engine.

Raw per-channel samples pushed by the host are resolved into a fixed-size ring of frames at a
fixed rate. Bindings (single buttons, two-button sequences, directional gestures and
gesture+button combos) are evaluated against the valid frames every engine frame.

Conventions
- Frame age 0 is the newest frame.
- Buttons and axes are frame-state columns; gestures read one axis column.
- Consuming a press hides it (and the hold it started) from every later evaluation.
*/

pub mod bindings;
pub mod buffer;
pub mod channel;
mod debug;
mod dispatch;
pub mod frame_state;
pub mod motion;
pub mod ring_buffer;

pub use bindings::{
    ActionFn, BindingHandle, Delegate, DirectionalFn, SequenceFn, SequenceOrder, TriggerEvent,
    UnbindPolicy,
};
pub use buffer::{InputBuffer, InputBufferSettings};
pub use channel::{InputId, InputMap, InputValue};
pub use motion::{Direction, MotionActionDef, MotionMode, TurnDirection};
