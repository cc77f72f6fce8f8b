//! A metrics logger writing TFRecord event files for TensorBoard.
use anyhow::Result;
use eval_logger_core::{
    error::EvalLoggerError,
    record::{Record, RecordValue},
    Frame, MetricsLogger,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    convert::TryFrom,
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};
use tensorboard_rs::summary_writer::SummaryWriter;

/// Configuration of [`TensorboardMetricsLogger`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TensorboardConfig {
    /// Directory of the event files.
    pub logdir: PathBuf,

    /// Fails on values TensorBoard can not show instead of skipping them.
    #[serde(default)]
    pub check_unsupported_value: bool,
}

impl TensorboardConfig {
    /// Constructs [`TensorboardConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TensorboardConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Write records to TFRecord.
pub struct TensorboardMetricsLogger {
    writer: SummaryWriter,
    ignore_unsupported_value: bool,
}

impl TensorboardMetricsLogger {
    /// Construct a [`TensorboardMetricsLogger`].
    ///
    /// TFRecord will be stored in `logdir`.
    pub fn new<P: AsRef<Path>>(logdir: P) -> Self {
        info!("TensorBoard logs written to {:?}", logdir.as_ref());
        Self {
            writer: SummaryWriter::new(logdir),
            ignore_unsupported_value: true,
        }
    }

    /// Construct a [`TensorboardMetricsLogger`] with checking unsupported record value.
    ///
    /// TFRecord will be stored in `logdir`.
    pub fn new_with_check_unsupported_value<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            ignore_unsupported_value: false,
            ..Self::new(logdir)
        }
    }

    /// Construct a [`TensorboardMetricsLogger`] from its configuration.
    pub fn build(config: &TensorboardConfig) -> Self {
        match config.check_unsupported_value {
            true => Self::new_with_check_unsupported_value(&config.logdir),
            false => Self::new(&config.logdir),
        }
    }
}

/// Channel-first layout of an RGB frame.
fn to_chw(frame: &Frame) -> (Vec<u8>, [usize; 3]) {
    let (w, h) = frame.dimensions();
    let plane = (w * h) as usize;
    let mut data = vec![0u8; 3 * plane];
    for (i, p) in frame.pixels().enumerate() {
        data[i] = p[0];
        data[plane + i] = p[1];
        data[2 * plane + i] = p[2];
    }
    (data, [3, h as usize, w as usize])
}

impl MetricsLogger for TensorboardMetricsLogger {
    /// Write a given [Record] into a TFRecord.
    ///
    /// This method handles [RecordValue::Scalar] and [RecordValue::Image] in the [Record].
    /// Other variants will be ignored.
    fn write(&mut self, record: Record, step: i64) -> Result<()> {
        let step = usize::try_from(step)?;

        for (k, v) in record.iter() {
            match v {
                RecordValue::Scalar(v) => self.writer.add_scalar(k, *v, step),
                RecordValue::Image(frame) => {
                    let (data, shape) = to_chw(frame);
                    self.writer.add_image(k, data.as_slice(), &shape, step)
                }
                _ => {
                    if !self.ignore_unsupported_value {
                        return Err(EvalLoggerError::RecordValueTypeError(format!(
                            "{} of {} is not supported by TensorBoard",
                            v.kind(),
                            k
                        ))
                        .into());
                    }
                }
            };
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::fs;
    use tempdir::TempDir;

    #[test]
    fn test_chw_layout() {
        let mut frame = Frame::new(2, 1);
        frame.put_pixel(0, 0, Rgb([1, 2, 3]));
        frame.put_pixel(1, 0, Rgb([4, 5, 6]));
        let (data, shape) = to_chw(&frame);
        assert_eq!(shape, [3, 1, 2]);
        assert_eq!(data, vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_write_event_file() -> Result<()> {
        let dir = TempDir::new("tensorboard")?;
        let mut logger = TensorboardMetricsLogger::new(dir.path());
        let mut record = Record::from_scalar("pick up cup/overall_success_rate", 0.5);
        record.insert("pick up cup/frames", RecordValue::Image(Frame::new(8, 4)));
        record.insert("pick up cup/note", RecordValue::String("ok".to_string()));
        logger.write(record, 3)?;
        logger.flush()?;

        assert!(fs::read_dir(dir.path())?.count() > 0);
        Ok(())
    }

    #[test]
    fn test_unsupported_value_is_rejected_when_checked() -> Result<()> {
        let dir = TempDir::new("tensorboard")?;
        let config = TensorboardConfig {
            logdir: dir.path().to_path_buf(),
            check_unsupported_value: true,
        };
        let mut logger = TensorboardMetricsLogger::build(&config);
        let record = Record::from_slice(&[(
            "task/video",
            RecordValue::Video {
                frames: vec![Frame::new(4, 4)],
                fps: 10,
            },
        )]);
        assert!(logger.write(record, 0).is_err());
        assert!(logger.write(Record::from_scalar("x", 1.0), -1).is_err());
        Ok(())
    }
}
