use std::fmt::Write;

use super::buffer::InputBuffer;

/// Rows printed by `debug_display`.
const DEBUG_ROWS: usize = 12;

impl InputBuffer {
    /// Per-channel hold-time table of the newest frames.
    ///
    /// Cells show `hold_time`; `*` marks a used frame, `P`/`R` the recorded press and release.
    /// Gesture rows list the frame each directional gesture last completed at.
    pub fn debug_display(&self) -> String {
        let mut out = String::new();
        let width = self
            .channel_ids()
            .iter()
            .map(|id| id.as_str().len())
            .max()
            .unwrap_or(0)
            .max(6);

        let _ = write!(out, "{:>4} ", "age");
        for id in self.channel_ids() {
            let _ = write!(out, "{:>width$} ", id.as_str());
        }
        out.push('\n');

        let rows = DEBUG_ROWS.min(self.frames.len());
        for age in 0..rows {
            let Some(frame) = self.frame(age) else {
                continue;
            };
            let _ = write!(out, "{age:>4} ");
            for (slot, state) in frame.states.iter().enumerate() {
                let valid = self.button_frames[slot];
                let mut marker = String::new();
                if valid.press.older == Some(age) || valid.press.newer == Some(age) {
                    marker.push('P');
                }
                if valid.release.older == Some(age) || valid.release.newer == Some(age) {
                    marker.push('R');
                }
                if state.used {
                    marker.push('*');
                }
                let cell = format!("{}{}", state.hold_time, marker);
                let _ = write!(out, "{cell:>width$} ");
            }
            out.push('\n');
        }

        for (index, (def, _)) in self.channels.directionals.iter().enumerate() {
            match self.directional_frames[index] {
                Some(age) => {
                    let _ = writeln!(out, "{}: frame {age}", def.id);
                }
                None => {
                    let _ = writeln!(out, "{}: -", def.id);
                }
            }
        }
        let _ = writeln!(out, "bindings: {}", self.binding_count());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::buffer::InputBufferSettings;
    use crate::input::channel::{InputMap, InputValue};

    #[test]
    fn table_marks_press_and_used() {
        let map = InputMap::default().with_button("Jump").with_axis("Move");
        let mut buffer = InputBuffer::new(&map, InputBufferSettings::default()).expect("valid");
        buffer.trigger_input(&"Jump".into(), InputValue::pressed(), 0.0);
        buffer.update_buffer();

        let text = buffer.debug_display();
        assert!(text.contains("Jump"));
        assert!(text.contains("1P"));

        buffer.consume_button_input(&"Jump".into(), false);
        let text = buffer.debug_display();
        assert!(text.contains("1*"));
        assert!(text.contains("bindings: 0"));
    }
}
