//! Detector backed by an external program.
//!
//! The program is invoked once per image as
//!
//! ```text
//! <program> [args...] --image <path> --prompt <prompt> \
//!     --box-threshold <f> --text-threshold <f>
//! ```
//!
//! and must print a JSON object `{"boxes": [[x1,y1,x2,y2], ...],
//! "scores": [...], "labels": [...]}` on stdout. A non-zero exit status is a
//! detector failure.

use std::path::Path;
use std::process::Command;

use super::{DetectionRequest, Detections, Detector};
use crate::error::PrelabelError;

#[derive(Clone, Debug)]
pub struct CommandDetector {
    program: String,
    args: Vec<String>,
}

impl CommandDetector {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Adds fixed arguments placed before the per-image flags.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn failure(&self, message: impl Into<String>) -> PrelabelError {
        PrelabelError::DetectorFailed {
            program: self.program.clone(),
            message: message.into(),
        }
    }
}

impl Detector for CommandDetector {
    fn predict(
        &mut self,
        image: &Path,
        request: &DetectionRequest,
    ) -> Result<Detections, PrelabelError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg("--image")
            .arg(image)
            .arg("--prompt")
            .arg(request.prompt())
            .arg("--box-threshold")
            .arg(request.box_threshold().to_string())
            .arg("--text-threshold")
            .arg(request.text_threshold().to_string())
            .output()
            .map_err(|err| self.failure(format!("could not start: {err}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failure(format!("{}: {}", output.status, stderr.trim())));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|err| self.failure(format!("unreadable output: {err}")))
    }
}
