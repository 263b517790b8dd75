/*!
Controller configuration loaded from JSON.

Every section falls back to its `Default`, so a document only lists what it changes:

```json
{
  "movement": { "max_step_height": 0.3 },
  "input_settings": { "button_frame_window": 12 },
  "input_map": { "buttons": ["jump", "attack"], "axes": ["move"] }
}
```
*/

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;
use crate::input::{InputBufferSettings, InputMap};
use crate::movement::MovementSettings;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub movement: MovementSettings,
    pub input_settings: InputBufferSettings,
    pub input_map: InputMap,
}

impl ControllerConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.movement.validate()?;
        self.input_settings.validate()?;
        self.input_map.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::input::{Direction, InputId, MotionMode};

    #[test]
    fn partial_document_fills_in_defaults() {
        let config = ControllerConfig::from_json(
            r#"{
                "movement": { "max_step_height": 0.3 },
                "input_map": { "buttons": ["jump"], "axes": ["move"] }
            }"#,
        )
        .unwrap();

        assert!((config.movement.max_step_height - 0.3).abs() < 1.0e-6);
        assert_eq!(config.movement.capsule_radius, MovementSettings::default().capsule_radius);
        assert_eq!(config.input_settings, InputBufferSettings::default());
        assert_eq!(config.input_map.buttons, vec![InputId::new("jump")]);
    }

    #[test]
    fn directional_gestures_parse_with_tagged_mode() {
        let config = ControllerConfig::from_json(
            r#"{
                "input_map": {
                    "axes": ["move"],
                    "directionals": [{
                        "id": "fireball",
                        "axis": "move",
                        "mode": { "kind": "Sequence", "steps": ["Back", "Right", "Forward"] }
                    }]
                }
            }"#,
        )
        .unwrap();

        let gesture = &config.input_map.directionals[0];
        assert!(!gesture.relative_to_player);
        assert_eq!(
            gesture.mode,
            MotionMode::Sequence {
                steps: vec![Direction::Back, Direction::Right, Direction::Forward]
            }
        );
    }

    #[test]
    fn invalid_sections_are_rejected() {
        let err = ControllerConfig::from_json(r#"{ "input_settings": { "button_frame_window": 99 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWindow { button: 99, full: 40 }));

        let err = ControllerConfig::from_json(r#"{ "input_map": { "buttons": ["a", "a"] } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateChannel(ref id) if id == "a"));

        let err = ControllerConfig::from_json(r#"{ "movement": { "capsule_radius": -1.0 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { name: "capsule_radius", .. }));

        let err = ControllerConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn default_config_survives_a_json_round_trip() {
        let text = ControllerConfig::default().to_json_pretty().unwrap();
        let parsed = ControllerConfig::from_json(&text).unwrap();
        assert_eq!(parsed.movement, MovementSettings::default());
    }
}
