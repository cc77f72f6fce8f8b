//! Episode records handed to the evaluation logger.
use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::fmt;

/// An observed camera frame.
pub type Frame = image::RgbImage;

/// A value supplied by the caller along with an episode.
///
/// Only numbers, booleans and strings are accepted. When forwarded to a
/// metrics logger, numbers become scalars, booleans become `0`/`1` and
/// strings are kept as text.
///
/// JSON has no NaN nor infinity, so non-finite floats are serialized as the
/// strings `"NaN"`, `"inf"` and `"-inf"`, and these strings are read back as
/// floats.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawExtraValue")]
pub enum ExtraValue {
    /// A boolean flag.
    Bool(bool),

    /// An integer.
    Int(i64),

    /// A floating-point number.
    Float(f64),

    /// A text value.
    String(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawExtraValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<RawExtraValue> for ExtraValue {
    fn from(v: RawExtraValue) -> Self {
        match v {
            RawExtraValue::Bool(b) => ExtraValue::Bool(b),
            RawExtraValue::Int(i) => ExtraValue::Int(i),
            RawExtraValue::Float(f) => ExtraValue::Float(f),
            RawExtraValue::String(s) => match s.as_str() {
                "NaN" => ExtraValue::Float(f64::NAN),
                "inf" => ExtraValue::Float(f64::INFINITY),
                "-inf" => ExtraValue::Float(f64::NEG_INFINITY),
                _ => ExtraValue::String(s),
            },
        }
    }
}

impl Serialize for ExtraValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ExtraValue::Bool(b) => serializer.serialize_bool(*b),
            ExtraValue::Int(i) => serializer.serialize_i64(*i),
            ExtraValue::Float(f) if f.is_nan() => serializer.serialize_str("NaN"),
            ExtraValue::Float(f) if f.is_infinite() => {
                serializer.serialize_str(if *f > 0.0 { "inf" } else { "-inf" })
            }
            ExtraValue::Float(f) => serializer.serialize_f64(*f),
            ExtraValue::String(s) => serializer.serialize_str(s),
        }
    }
}

impl ExtraValue {
    /// Returns the value as a scalar, if it is numeric or boolean.
    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            ExtraValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ExtraValue::Int(i) => Some(*i as f32),
            ExtraValue::Float(f) => Some(*f as f32),
            ExtraValue::String(_) => None,
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ExtraValue {
                fn from(v: $t) -> Self {
                    ExtraValue::Int(v as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, usize);

impl From<f32> for ExtraValue {
    fn from(v: f32) -> Self {
        ExtraValue::Float(v as f64)
    }
}

impl From<f64> for ExtraValue {
    fn from(v: f64) -> Self {
        ExtraValue::Float(v)
    }
}

impl From<bool> for ExtraValue {
    fn from(v: bool) -> Self {
        ExtraValue::Bool(v)
    }
}

impl From<&str> for ExtraValue {
    fn from(v: &str) -> Self {
        ExtraValue::String(v.to_string())
    }
}

impl From<String> for ExtraValue {
    fn from(v: String) -> Self {
        ExtraValue::String(v)
    }
}

/// Named values attached to an episode, kept in insertion order.
///
/// Inserting an existing key replaces its value without moving it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extras(Vec<(String, ExtraValue)>);

impl Extras {
    /// Creates an empty set of extras.
    pub fn new() -> Self {
        Self(vec![])
    }

    /// Inserts a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ExtraValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Gets the value of `key`.
    pub fn get(&self, key: &str) -> Option<&ExtraValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtraValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Extras {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in self.0.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct ExtrasVisitor;

impl<'de> Visitor<'de> for ExtrasVisitor {
    type Value = Extras;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a map of numbers, booleans or strings")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Extras, A::Error> {
        let mut extras = Extras::new();
        while let Some((k, v)) = access.next_entry::<String, ExtraValue>()? {
            extras.insert(k, v);
        }
        Ok(extras)
    }
}

impl<'de> Deserialize<'de> for Extras {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ExtrasVisitor)
    }
}

/// Everything observed during one evaluation episode.
///
/// ```rust
/// use eval_logger_core::EpisodeRecord;
/// use image::RgbImage;
///
/// let frames = vec![RgbImage::new(64, 64); 3];
/// let episode = EpisodeRecord::new(0, "pick up cup", true, frames)
///     .extra("eval_rollout_steps", 20)
///     .extra("experienced_motor_failure", false);
/// assert_eq!(episode.extras.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct EpisodeRecord {
    /// Index of the episode in the evaluation.
    pub episode_index: usize,

    /// Label under which metrics are grouped, typically the task instruction.
    pub logging_prefix: String,

    /// Whether the episode succeeded.
    pub success: bool,

    /// Observed frames in temporal order.
    pub frames: Vec<Frame>,

    /// Caller-supplied values.
    pub extras: Extras,

    /// Actions taken at each step.
    pub actions: Vec<Vec<f32>>,

    /// Proprioceptive state at each step.
    pub proprio: Vec<Vec<f32>>,

    /// Partial credit towards success, in `[0, 1]`.
    pub partial_success: Option<f32>,

    /// Free-form feedback from the evaluator.
    pub language_feedback: Option<String>,

    /// Wall time of the episode in seconds.
    pub eval_duration_secs: Option<f32>,
}

impl EpisodeRecord {
    /// Creates a record without extras or optional trajectory data.
    pub fn new(
        episode_index: usize,
        logging_prefix: impl Into<String>,
        success: bool,
        frames: Vec<Frame>,
    ) -> Self {
        Self {
            episode_index,
            logging_prefix: logging_prefix.into(),
            success,
            frames,
            extras: Extras::new(),
            actions: vec![],
            proprio: vec![],
            partial_success: None,
            language_feedback: None,
            eval_duration_secs: None,
        }
    }

    /// Adds a named value.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<ExtraValue>) -> Self {
        self.extras.insert(key, value);
        self
    }

    /// Sets the actions of the episode.
    pub fn actions(mut self, actions: Vec<Vec<f32>>) -> Self {
        self.actions = actions;
        self
    }

    /// Sets the proprioceptive states of the episode.
    pub fn proprio(mut self, proprio: Vec<Vec<f32>>) -> Self {
        self.proprio = proprio;
        self
    }

    /// Sets partial credit towards success.
    pub fn partial_success(mut self, v: f32) -> Self {
        self.partial_success = Some(v);
        self
    }

    /// Sets feedback from the evaluator.
    pub fn language_feedback(mut self, v: impl Into<String>) -> Self {
        self.language_feedback = Some(v.into());
        self
    }

    /// Sets the wall time of the episode.
    pub fn eval_duration_secs(mut self, v: f32) -> Self {
        self.eval_duration_secs = Some(v);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extras_keep_insertion_order_and_replace_in_place() {
        let mut extras = Extras::new();
        extras.insert("b", 1);
        extras.insert("a", "text");
        extras.insert("b", 2.5);

        let keys: Vec<_> = extras.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(extras.get("b"), Some(&ExtraValue::Float(2.5)));
    }

    #[test]
    fn test_extras_json_preserves_order_and_types() -> anyhow::Result<()> {
        let mut extras = Extras::new();
        extras.insert("zeta", true);
        extras.insert("alpha", 3);
        extras.insert("mid", 0.25);
        extras.insert("name", "widowx");

        let json = serde_json::to_string(&extras)?;
        assert_eq!(
            json,
            r#"{"zeta":true,"alpha":3,"mid":0.25,"name":"widowx"}"#
        );
        let back: Extras = serde_json::from_str(&json)?;
        assert_eq!(back, extras);
        Ok(())
    }

    #[test]
    fn test_non_finite_floats_survive_json() -> anyhow::Result<()> {
        let mut extras = Extras::new();
        extras.insert("loss", f64::NAN);
        extras.insert("ratio", f64::INFINITY);
        extras.insert("log_prob", f32::NEG_INFINITY);

        let json = serde_json::to_string(&extras)?;
        assert_eq!(json, r#"{"loss":"NaN","ratio":"inf","log_prob":"-inf"}"#);

        let back: Extras = serde_json::from_str(&json)?;
        assert!(matches!(back.get("loss"), Some(ExtraValue::Float(f)) if f.is_nan()));
        assert_eq!(back.get("ratio"), Some(&ExtraValue::Float(f64::INFINITY)));
        assert_eq!(back.get("log_prob"), Some(&ExtraValue::Float(f64::NEG_INFINITY)));
        Ok(())
    }

    #[test]
    fn test_scalar_coercion() {
        assert_eq!(ExtraValue::from(true).as_scalar(), Some(1.0));
        assert_eq!(ExtraValue::from(false).as_scalar(), Some(0.0));
        assert_eq!(ExtraValue::from(7usize).as_scalar(), Some(7.0));
        assert_eq!(ExtraValue::from("x").as_scalar(), None);
    }
}
