use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::trainer::TrainStep;

/// Receives the summary of every training step.
pub trait TrainingReporter {
    fn report(&mut self, step: &TrainStep);
}

/// Logs each step at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl TrainingReporter for LogReporter {
    fn report(&mut self, step: &TrainStep) {
        info!(
            "Batch {batch_num}: Loss: {total:.4}, Value Loss: {value:.4}, Policy Loss: {policy:.4}, Reg Loss: {reg:.6}",
            batch_num = step.batch_num,
            total = step.loss.total,
            value = step.loss.value,
            policy = step.loss.policy,
            reg = step.loss.regularization
        );
        info!(
            "Diagnostic Loss: {diagnostic:.4} over {sample_size} samples",
            diagnostic = step.diagnostic_loss,
            sample_size = step.sample_size
        );
    }
}

/// Appends one JSON object per step to a file.
pub struct JsonLinesReporter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonLinesReporter {
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    fn write(&mut self, step: &TrainStep) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, step)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl TrainingReporter for JsonLinesReporter {
    fn report(&mut self, step: &TrainStep) {
        if let Err(err) = self.write(step) {
            warn!("Failed to write summary to {:?}: {}", self.path, err);
        }
    }
}
