//! Metadata of an evaluation session.
use crate::error::EvalLoggerError;
use anyhow::Result;
use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    fs::File,
    io::{BufReader, Write},
    path::Path,
    str::FromStr,
};
use xxhash_rust::xxh3::xxh3_64;

/// Kind of robot under evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RobotType {
    /// Franka Emika Panda.
    Franka,

    /// Trossen WidowX.
    Widowx,
}

impl RobotType {
    /// Name of the robot type as written to disk.
    pub fn as_str(&self) -> &'static str {
        match self {
            RobotType::Franka => "franka",
            RobotType::Widowx => "widowx",
        }
    }
}

impl fmt::Display for RobotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RobotType {
    type Err = EvalLoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "franka" => Ok(RobotType::Franka),
            "widowx" => Ok(RobotType::Widowx),
            _ => Err(EvalLoggerError::UnknownRobotType(s.to_string())),
        }
    }
}

/// Identifier of an evaluation session.
///
/// It names the directory under which the data of the session is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvalId(String);

impl EvalId {
    /// Derives an id from the start time of the session, the robot type and
    /// an optional custom name.
    pub fn create(
        time: &DateTime<Local>,
        robot_type: Option<RobotType>,
        custom_name: Option<&str>,
    ) -> Self {
        let input = format!(
            "{}{}{}",
            time.to_rfc3339_opts(SecondsFormat::Micros, true),
            robot_type.map(|r| r.as_str()).unwrap_or(""),
            custom_name.unwrap_or("")
        );
        Self(xxh3_64(input.as_bytes()).to_string())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EvalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata of an evaluation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalMetadata {
    /// Identifier of the session.
    pub eval_id: EvalId,

    /// Where the evaluation takes place.
    pub location: String,

    /// Name of the robot.
    pub robot_name: String,

    /// Kind of the robot.
    pub robot_type: RobotType,

    /// Start time of the session.
    pub time: DateTime<Local>,

    /// Who runs the evaluation.
    pub evaluator_name: String,

    /// Optional name of the evaluation.
    #[serde(default)]
    pub eval_name: Option<String>,
}

impl EvalMetadata {
    /// Creates metadata stamped with the current time.
    pub fn new(
        location: impl Into<String>,
        robot_name: impl Into<String>,
        robot_type: RobotType,
        evaluator_name: impl Into<String>,
        eval_name: Option<&str>,
    ) -> Self {
        let time = Local::now();
        Self {
            eval_id: EvalId::create(&time, Some(robot_type), eval_name),
            location: location.into(),
            robot_name: robot_name.into(),
            robot_type,
            time,
            evaluator_name: evaluator_name.into(),
            eval_name: eval_name.map(|s| s.to_string()),
        }
    }

    /// Saves the metadata as a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;
        Ok(())
    }

    /// Loads metadata from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let metadata = serde_json::from_reader(rdr)?;
        Ok(metadata)
    }
}
