//! Spring parameters and the named-preset registry.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};

/// Parameters of the damped spring driving every leaf of an animation.
///
/// Stiffness and damping are the coefficients of the spring and damper
/// forces (unit mass). Precision is the window around the target inside
/// which the integrator snaps to exact rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringConfig {
    pub stiffness: f64,
    pub damping: f64,
    pub precision: f64,
}

/// The default spring, also available under the preset name `"noWobble"`.
pub const NO_WOBBLE: SpringConfig = SpringConfig::new(170., 26.);
/// Soft spring with a slight overshoot; preset name `"gentle"`.
pub const GENTLE: SpringConfig = SpringConfig::new(120., 14.);
/// Underdamped, visibly bouncy spring; preset name `"wobbly"`.
pub const WOBBLY: SpringConfig = SpringConfig::new(180., 12.);
/// Fast spring with little overshoot; preset name `"stiff"`.
pub const STIFF: SpringConfig = SpringConfig::new(210., 20.);

impl SpringConfig {
    /// Creates a config with the given stiffness and damping and the
    /// standard precision of `0.01`.
    pub const fn new(stiffness: f64, damping: f64) -> Self {
        Self {
            stiffness,
            damping,
            precision: 0.01,
        }
    }

    /// Same config with a different precision window.
    pub const fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    /// Checks the caller contract: stiffness and precision must be positive,
    /// damping non-negative. Anything else would feed NaN or a divergent
    /// trajectory into the integrator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.stiffness > 0.) {
            return Err(ConfigError::InvalidStiffness(self.stiffness));
        }
        if !(self.damping >= 0.) {
            return Err(ConfigError::InvalidDamping(self.damping));
        }
        if !(self.precision > 0.) {
            return Err(ConfigError::InvalidPrecision(self.precision));
        }
        Ok(())
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        NO_WOBBLE
    }
}

/// Contract violations surfaced at configuration-resolution time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("spring stiffness must be positive, got {0}")]
    InvalidStiffness(f64),
    #[error("spring damping must be non-negative, got {0}")]
    InvalidDamping(f64),
    #[error("spring precision must be positive, got {0}")]
    InvalidPrecision(f64),
    #[error("unknown spring preset: {0:?}")]
    UnknownPreset(String),
}

/// A spring selection: an explicit config, or the name of a registry preset.
///
/// Named selections are looked up anew on every frame, so replacing a preset
/// in the registry takes effect on the next frame even for animations
/// already in flight.
#[derive(Debug, Clone, PartialEq)]
pub enum SpringDesc {
    Config(SpringConfig),
    Named(String),
}

impl SpringDesc {
    /// Resolves to a concrete, validated config.
    pub fn resolve(&self) -> Result<SpringConfig, ConfigError> {
        let config = match self {
            SpringDesc::Config(config) => *config,
            SpringDesc::Named(name) => {
                preset(name).ok_or_else(|| ConfigError::UnknownPreset(name.clone()))?
            }
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for SpringDesc {
    fn default() -> Self {
        SpringDesc::Config(NO_WOBBLE)
    }
}

impl From<SpringConfig> for SpringDesc {
    fn from(config: SpringConfig) -> Self {
        SpringDesc::Config(config)
    }
}

impl From<&str> for SpringDesc {
    fn from(name: &str) -> Self {
        SpringDesc::Named(name.to_owned())
    }
}

impl From<String> for SpringDesc {
    fn from(name: String) -> Self {
        SpringDesc::Named(name)
    }
}

fn registry() -> &'static Mutex<HashMap<String, SpringConfig>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, SpringConfig>>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert(String::from("noWobble"), NO_WOBBLE);
        map.insert(String::from("gentle"), GENTLE);
        map.insert(String::from("wobbly"), WOBBLY);
        map.insert(String::from("stiff"), STIFF);
        Mutex::new(map)
    })
}

/// Looks up a named preset.
pub fn preset(name: &str) -> Option<SpringConfig> {
    registry().lock().unwrap().get(name).copied()
}

/// Adds or replaces a named preset.
///
/// The config is validated first; an invalid config never enters the
/// registry. Replacing a built-in name is allowed.
pub fn register_preset(name: impl Into<String>, config: SpringConfig) -> Result<(), ConfigError> {
    config.validate()?;
    let name = name.into();
    debug!("registering spring preset {name:?}: {config:?}");
    registry().lock().unwrap().insert(name, config);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_presets() {
        assert_eq!(preset("noWobble"), Some(NO_WOBBLE));
        assert_eq!(preset("gentle"), Some(GENTLE));
        assert_eq!(preset("wobbly"), Some(WOBBLY));
        assert_eq!(preset("stiff"), Some(STIFF));
        assert_eq!(preset("bogus"), None);

        assert_eq!(NO_WOBBLE.stiffness, 170.);
        assert_eq!(NO_WOBBLE.damping, 26.);
        assert_eq!(NO_WOBBLE.precision, 0.01);
    }

    #[test]
    fn custom_preset_roundtrip() {
        let config = SpringConfig::new(300., 40.).with_precision(0.001);
        register_preset("custom-roundtrip", config).unwrap();
        assert_eq!(preset("custom-roundtrip"), Some(config));

        let desc = SpringDesc::from("custom-roundtrip");
        assert_eq!(desc.resolve().unwrap(), config);
    }

    #[test]
    fn invalid_configs_rejected() {
        assert!(matches!(
            SpringConfig::new(0., 26.).validate(),
            Err(ConfigError::InvalidStiffness(_))
        ));
        assert!(matches!(
            SpringConfig::new(170., -1.).validate(),
            Err(ConfigError::InvalidDamping(_))
        ));
        assert!(matches!(
            SpringConfig::new(170., 26.).with_precision(0.).validate(),
            Err(ConfigError::InvalidPrecision(_))
        ));
        // NaN fails every check.
        assert!(SpringConfig::new(f64::NAN, 26.).validate().is_err());

        assert!(register_preset("invalid", SpringConfig::new(-5., 26.)).is_err());
        assert_eq!(preset("invalid"), None);
    }

    #[test]
    fn unknown_preset_fails_resolution() {
        let desc = SpringDesc::from("no-such-preset");
        assert_eq!(
            desc.resolve(),
            Err(ConfigError::UnknownPreset(String::from("no-such-preset")))
        );
    }

    #[test]
    fn config_serde() {
        let json = r#"{ "stiffness": 180, "damping": 12, "precision": 0.01 }"#;
        let config: SpringConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config, WOBBLY);

        let back = serde_json::to_string(&config).unwrap();
        let again: SpringConfig = serde_json::from_str(&back).unwrap();
        assert_eq!(again, config);
    }
}
