use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to parse profile table: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid profile table: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Desktop,
    Android,
    Ios,
    Mobile,
}

impl DeviceClass {
    pub fn key(&self) -> &'static str {
        match self {
            DeviceClass::Desktop => "desktop",
            DeviceClass::Android => "android",
            DeviceClass::Ios => "ios",
            DeviceClass::Mobile => "mobile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Browser {
    Firefox,
    Chromium,
    Safari,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub device: DeviceClass,
    pub browser: Browser,
}

impl Capabilities {
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();

        let device = if ua.contains("android") {
            DeviceClass::Android
        } else if ua.contains("iphone") || ua.contains("ipad") || ua.contains("ipod") {
            DeviceClass::Ios
        } else if ua.contains("mobile") || ua.contains("blackberry") || ua.contains("webos") {
            DeviceClass::Mobile
        } else {
            // iPadOS masquerading as desktop Safari lands here on purpose.
            DeviceClass::Desktop
        };

        let browser = if ua.contains("firefox") || ua.contains("fxios") {
            Browser::Firefox
        } else if ua.contains("chrome") || ua.contains("chromium") || ua.contains("crios") {
            Browser::Chromium
        } else if ua.contains("safari") {
            Browser::Safari
        } else {
            Browser::Other
        };

        Self { device, browser }
    }

    pub fn is_mobile(&self) -> bool {
        !matches!(self.device, DeviceClass::Desktop)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfileSet {
    pub version: u32,
    #[serde(default)]
    pub defaults: TuningDefaults,
    #[serde(default)]
    pub classes: BTreeMap<String, TuningOverrides>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TuningDefaults {
    #[serde(default = "default_scrub_smoothing")]
    pub scrub_smoothing: f64,
    #[serde(default = "default_progress_epsilon")]
    pub progress_epsilon: f64,
    #[serde(default = "default_frames_before_end")]
    pub frames_before_end: f64,
    #[serde(default = "default_frame_rate")]
    pub standard_frame_rate: f64,
    #[serde(default = "default_wheel_sensitivity")]
    pub wheel_sensitivity: f64,
    #[serde(default = "default_swipe_threshold")]
    pub swipe_threshold: f64,
    #[serde(
        default = "default_gesture_cooldown",
        deserialize_with = "deserialize_duration"
    )]
    pub gesture_cooldown: Duration,
    #[serde(
        default = "default_activation_fallback",
        deserialize_with = "deserialize_duration"
    )]
    pub activation_fallback: Duration,
    #[serde(
        default = "default_preload_ramp",
        deserialize_with = "deserialize_duration"
    )]
    pub preload_ramp: Duration,
    #[serde(
        default = "default_preload_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub preload_timeout: Duration,
    #[serde(
        default = "default_preload_grace",
        deserialize_with = "deserialize_duration"
    )]
    pub preload_grace: Duration,
}

impl Default for TuningDefaults {
    fn default() -> Self {
        Self {
            scrub_smoothing: default_scrub_smoothing(),
            progress_epsilon: default_progress_epsilon(),
            frames_before_end: default_frames_before_end(),
            standard_frame_rate: default_frame_rate(),
            wheel_sensitivity: default_wheel_sensitivity(),
            swipe_threshold: default_swipe_threshold(),
            gesture_cooldown: default_gesture_cooldown(),
            activation_fallback: default_activation_fallback(),
            preload_ramp: default_preload_ramp(),
            preload_timeout: default_preload_timeout(),
            preload_grace: default_preload_grace(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TuningOverrides {
    #[serde(default)]
    pub scrub_smoothing: Option<f64>,
    #[serde(default)]
    pub progress_epsilon: Option<f64>,
    #[serde(default)]
    pub frames_before_end: Option<f64>,
    #[serde(default)]
    pub standard_frame_rate: Option<f64>,
    #[serde(default)]
    pub wheel_sensitivity: Option<f64>,
    #[serde(default)]
    pub swipe_threshold: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub gesture_cooldown: Option<Duration>,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub activation_fallback: Option<Duration>,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub preload_ramp: Option<Duration>,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub preload_timeout: Option<Duration>,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub preload_grace: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceProfile {
    pub scrub_smoothing: f64,
    pub progress_epsilon: f64,
    pub frames_before_end: f64,
    pub standard_frame_rate: f64,
    pub wheel_sensitivity: f64,
    pub swipe_threshold: f64,
    pub gesture_cooldown: Duration,
    pub activation_fallback: Duration,
    pub preload_ramp: Duration,
    pub preload_timeout: Duration,
    pub preload_grace: Duration,
}

const CLASS_KEYS: [&str; 4] = ["desktop", "android", "ios", "mobile"];

/// Shipped tuning table. Values carried over from field testing: iOS is
/// allowed closer to the true media end, touch devices get heavier scrub
/// smoothing to hide frame stalls.
pub const BUILTIN_PROFILES: &str = r#"
version = 1

[defaults]
scrub_smoothing = 1
progress_epsilon = 0.001
frames_before_end = 3
standard_frame_rate = 30
wheel_sensitivity = 30
swipe_threshold = 50
gesture_cooldown = "700ms"
activation_fallback = "300ms"
preload_ramp = "4s"
preload_timeout = "8s"
preload_grace = "400ms"

[classes.android]
scrub_smoothing = 4
frames_before_end = 4

[classes.ios]
scrub_smoothing = 3
frames_before_end = 1

[classes.mobile]
scrub_smoothing = 3
"#;

fn default_scrub_smoothing() -> f64 {
    1.0
}

fn default_progress_epsilon() -> f64 {
    0.001
}

fn default_frames_before_end() -> f64 {
    3.0
}

fn default_frame_rate() -> f64 {
    30.0
}

fn default_wheel_sensitivity() -> f64 {
    30.0
}

fn default_swipe_threshold() -> f64 {
    50.0
}

fn default_gesture_cooldown() -> Duration {
    Duration::from_millis(700)
}

fn default_activation_fallback() -> Duration {
    Duration::from_millis(300)
}

fn default_preload_ramp() -> Duration {
    Duration::from_secs(4)
}

fn default_preload_timeout() -> Duration {
    Duration::from_secs(8)
}

fn default_preload_grace() -> Duration {
    Duration::from_millis(400)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_duration_opt(deserializer).map(|d| d.unwrap_or_else(|| Duration::from_secs(0)))
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be a non-negative finite number"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl ProfileSet {
    pub fn from_toml_str(input: &str) -> Result<Self, ProfileError> {
        let raw: ProfileSet = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn builtin() -> Result<Self, ProfileError> {
        Self::from_toml_str(BUILTIN_PROFILES)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.version != 1 {
            return Err(ProfileError::Invalid(format!(
                "unsupported profile table version {}; expected 1",
                self.version
            )));
        }

        for key in self.classes.keys() {
            if !CLASS_KEYS.contains(&key.as_str()) {
                return Err(ProfileError::Invalid(format!(
                    "unknown device class '{key}'; expected one of {CLASS_KEYS:?}"
                )));
            }
        }

        for class in [
            DeviceClass::Desktop,
            DeviceClass::Android,
            DeviceClass::Ios,
            DeviceClass::Mobile,
        ] {
            let profile = self.resolve(class);
            let key = class.key();

            if profile.scrub_smoothing < 1.0 {
                return Err(ProfileError::Invalid(format!(
                    "class '{key}' scrub_smoothing must be at least 1"
                )));
            }
            if profile.progress_epsilon <= 0.0 {
                return Err(ProfileError::Invalid(format!(
                    "class '{key}' progress_epsilon must be greater than zero"
                )));
            }
            if profile.frames_before_end <= 0.0 {
                return Err(ProfileError::Invalid(format!(
                    "class '{key}' frames_before_end must be greater than zero"
                )));
            }
            if profile.standard_frame_rate <= 0.0 {
                return Err(ProfileError::Invalid(format!(
                    "class '{key}' standard_frame_rate must be greater than zero"
                )));
            }
            if profile.wheel_sensitivity <= 0.0 {
                return Err(ProfileError::Invalid(format!(
                    "class '{key}' wheel_sensitivity must be greater than zero"
                )));
            }
            if profile.swipe_threshold <= 0.0 {
                return Err(ProfileError::Invalid(format!(
                    "class '{key}' swipe_threshold must be greater than zero"
                )));
            }
            if profile.preload_ramp > profile.preload_timeout {
                return Err(ProfileError::Invalid(format!(
                    "class '{key}' preload_ramp must not exceed preload_timeout"
                )));
            }
        }

        Ok(())
    }

    pub fn resolve(&self, class: DeviceClass) -> DeviceProfile {
        let overrides = self.classes.get(class.key());
        let defaults = &self.defaults;

        let pick_f64 = |field: fn(&TuningOverrides) -> Option<f64>, base: f64| {
            overrides.and_then(field).unwrap_or(base)
        };
        let pick_duration = |field: fn(&TuningOverrides) -> Option<Duration>, base: Duration| {
            overrides.and_then(field).unwrap_or(base)
        };

        DeviceProfile {
            scrub_smoothing: pick_f64(|o| o.scrub_smoothing, defaults.scrub_smoothing),
            progress_epsilon: pick_f64(|o| o.progress_epsilon, defaults.progress_epsilon),
            frames_before_end: pick_f64(|o| o.frames_before_end, defaults.frames_before_end),
            standard_frame_rate: pick_f64(|o| o.standard_frame_rate, defaults.standard_frame_rate),
            wheel_sensitivity: pick_f64(|o| o.wheel_sensitivity, defaults.wheel_sensitivity),
            swipe_threshold: pick_f64(|o| o.swipe_threshold, defaults.swipe_threshold),
            gesture_cooldown: pick_duration(|o| o.gesture_cooldown, defaults.gesture_cooldown),
            activation_fallback: pick_duration(
                |o| o.activation_fallback,
                defaults.activation_fallback,
            ),
            preload_ramp: pick_duration(|o| o.preload_ramp, defaults.preload_ramp),
            preload_timeout: pick_duration(|o| o.preload_timeout, defaults.preload_timeout),
            preload_grace: pick_duration(|o| o.preload_grace, defaults.preload_grace),
        }
    }

    pub fn resolve_for(&self, capabilities: &Capabilities) -> DeviceProfile {
        self.resolve(capabilities.device)
    }
}
