//! Base implementation of records for logging.
//!
//! A [`Record`] is what the evaluation logger hands to a metrics logger
//! after each episode or each batch of control steps: success statistics,
//! caller-supplied extras and visual artifacts, keyed by name.

use crate::{episode::Frame, error::EvalLoggerError};
use std::{
    collections::{hash_map::Iter, HashMap},
    convert::Into,
};

/// Represents possible types of values that can be stored in a [`Record`].
///
/// # Variants
///
/// * `Scalar(f32)` - A single floating-point value, like a success rate
/// * `String(String)` - A text value
/// * `Image(Frame)` - An RGB image, like a filmstrip of an episode
/// * `Video { frames, fps }` - A sequence of RGB images played at `fps`
#[derive(Debug, Clone)]
pub enum RecordValue {
    /// A single floating-point value, typically used for metrics like success rates.
    Scalar(f32),

    /// A text value, useful for storing labels or descriptions.
    String(String),

    /// An RGB image.
    Image(Frame),

    /// A short clip of RGB images.
    Video {
        /// Frames of the clip, all with the same size.
        frames: Vec<Frame>,

        /// Playback rate in frames per second.
        fps: u32,
    },
}

impl RecordValue {
    /// Returns the name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RecordValue::Scalar(_) => "Scalar",
            RecordValue::String(_) => "String",
            RecordValue::Image(_) => "Image",
            RecordValue::Video { .. } => "Video",
        }
    }
}

/// A container for storing key-value pairs of various data types.
///
/// # Examples
///
/// ```rust
/// use eval_logger_core::record::{Record, RecordValue};
///
/// let mut record = Record::from_scalar("pick up cup/episode_success", 1.0);
/// record.insert("pick up cup/recent_success_rate", RecordValue::Scalar(0.5));
///
/// let rate = record.get_scalar("pick up cup/recent_success_rate").unwrap();
/// assert_eq!(rate, 0.5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Record(HashMap<String, RecordValue>);

impl Record {
    /// Creates an empty record.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Creates a record containing a single scalar value.
    pub fn from_scalar(name: impl Into<String>, value: f32) -> Self {
        Self(HashMap::from([(name.into(), RecordValue::Scalar(value))]))
    }

    /// Creates a record from a slice of key-value pairs.
    pub fn from_slice<K: Into<String> + Clone>(s: &[(K, RecordValue)]) -> Self {
        Self(
            s.iter()
                .map(|(k, v)| (k.clone().into(), v.clone()))
                .collect(),
        )
    }

    /// Inserts a key-value pair into the record.
    pub fn insert(&mut self, k: impl Into<String>, v: RecordValue) {
        self.0.insert(k.into(), v);
    }

    /// Returns an iterator over the key-value pairs in the record.
    pub fn iter(&self) -> Iter<'_, String, RecordValue> {
        self.0.iter()
    }

    /// Gets a reference to the value associated with the given key.
    pub fn get(&self, k: &str) -> Option<&RecordValue> {
        self.0.get(k)
    }

    /// Returns `true` if the record has a value for `k`.
    pub fn contains_key(&self, k: &str) -> bool {
        self.0.contains_key(k)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Merges two records, consuming both.
    ///
    /// If both records contain the same key, the value from the second record
    /// will overwrite the value from the first record.
    pub fn merge(self, record: Record) -> Self {
        Record(self.0.into_iter().chain(record.0).collect())
    }

    /// Gets a scalar value from the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not exist or the value is not a scalar.
    pub fn get_scalar(&self, k: &str) -> Result<f32, EvalLoggerError> {
        match self.0.get(k) {
            Some(RecordValue::Scalar(v)) => Ok(*v),
            Some(v) => Err(EvalLoggerError::RecordValueTypeError(format!(
                "expected Scalar for {}, found {}",
                k,
                v.kind()
            ))),
            None => Err(EvalLoggerError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets a string value from the record.
    pub fn get_string(&self, k: &str) -> Result<String, EvalLoggerError> {
        match self.0.get(k) {
            Some(RecordValue::String(s)) => Ok(s.clone()),
            Some(v) => Err(EvalLoggerError::RecordValueTypeError(format!(
                "expected String for {}, found {}",
                k,
                v.kind()
            ))),
            None => Err(EvalLoggerError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets an image from the record.
    pub fn get_image(&self, k: &str) -> Result<&Frame, EvalLoggerError> {
        match self.0.get(k) {
            Some(RecordValue::Image(img)) => Ok(img),
            Some(v) => Err(EvalLoggerError::RecordValueTypeError(format!(
                "expected Image for {}, found {}",
                k,
                v.kind()
            ))),
            None => Err(EvalLoggerError::RecordKeyError(k.to_string())),
        }
    }

    /// Gets the frames of a video from the record.
    pub fn get_video(&self, k: &str) -> Result<(&[Frame], u32), EvalLoggerError> {
        match self.0.get(k) {
            Some(RecordValue::Video { frames, fps }) => Ok((frames.as_slice(), *fps)),
            Some(v) => Err(EvalLoggerError::RecordValueTypeError(format!(
                "expected Video for {}, found {}",
                k,
                v.kind()
            ))),
            None => Err(EvalLoggerError::RecordKeyError(k.to_string())),
        }
    }

    /// Checks if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_merge_overwrites_with_right_hand_side() {
        let a = Record::from_slice(&[
            ("x", RecordValue::Scalar(1.0)),
            ("y", RecordValue::String("a".to_string())),
        ]);
        let b = Record::from_scalar("x", 2.0);
        let merged = a.merge(b);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get_scalar("x").unwrap(), 2.0);
        assert_eq!(merged.get_string("y").unwrap(), "a");
    }

    #[test]
    fn test_typed_accessors_report_errors() {
        let mut record = Record::empty();
        record.insert("img", RecordValue::Image(RgbImage::new(2, 2)));

        assert!(record.get_image("img").is_ok());
        assert!(matches!(
            record.get_scalar("img"),
            Err(EvalLoggerError::RecordValueTypeError(_))
        ));
        assert!(matches!(
            record.get_scalar("missing"),
            Err(EvalLoggerError::RecordKeyError(_))
        ));
    }
}
