//! The interface to the inference pipeline.
//!
//! Frame capture, palm detection and landmark regression are performed by an external
//! collaborator (eg. a camera with an on-board neural accelerator). An [`InferenceBackend`]
//! exposes the three blocking requests the tracker needs, one cycle at a time.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
    time::{Duration, Instant},
};

use serde::Deserialize;

use crate::hand::{detection::PalmDetection, landmark::RawLandmarks};
use crate::roi::Roi;

/// The inference collaborator is unavailable, terminating the tracking session.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// The frame source has no more frames.
    #[error("frame source exhausted")]
    Exhausted,

    /// A detection or regression request failed.
    #[error("inference request failed: {0}")]
    Inference(#[source] crate::Error),
}

/// Blocking access to the frame source and the two neural networks.
///
/// Every cycle starts with [`InferenceBackend::next_frame`], followed by at most one call to
/// each of the other methods, all referring to that frame. Implementations must not retry on
/// their own account beyond whatever their own reconnection policy is: any error they return
/// ends the session.
pub trait InferenceBackend {
    /// Advances to the next frame and returns the instant it was captured at.
    fn next_frame(&mut self) -> Result<Instant, UpstreamError>;

    /// Runs palm detection on the whole current frame.
    fn detect_palm(&mut self) -> Result<PalmDetection, UpstreamError>;

    /// Runs landmark regression on the part of the current frame covered by `roi`.
    fn regress_landmarks(&mut self, roi: &Roi) -> Result<RawLandmarks, UpstreamError>;
}

impl<B: InferenceBackend + ?Sized> InferenceBackend for &mut B {
    fn next_frame(&mut self) -> Result<Instant, UpstreamError> {
        (**self).next_frame()
    }

    fn detect_palm(&mut self) -> Result<PalmDetection, UpstreamError> {
        (**self).detect_palm()
    }

    fn regress_landmarks(&mut self, roi: &Roi) -> Result<RawLandmarks, UpstreamError> {
        (**self).regress_landmarks(roi)
    }
}

/// One recorded frame of a [`Replay`].
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayFrame {
    /// Capture time in seconds, relative to the start of the recording.
    pub t: f64,
    /// The palm detector's result, if it was run on this frame.
    #[serde(default)]
    pub detection: Option<PalmDetection>,
    /// The landmark regressor's result, if it was run on this frame.
    #[serde(default)]
    pub landmarks: Option<RawLandmarks>,
}

/// An [`InferenceBackend`] that plays back recorded inference results.
///
/// The recording is in JSON Lines format, one [`ReplayFrame`] per line. Blank lines are skipped.
/// Since the results were recorded, the ROI passed to [`InferenceBackend::regress_landmarks`] is
/// ignored. A network that was not recorded for a frame reports no hand.
pub struct Replay<R> {
    lines: io::Lines<R>,
    line_no: usize,
    epoch: Instant,
    current: Option<ReplayFrame>,
}

impl Replay<BufReader<File>> {
    /// Opens a recording stored at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Replay<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            epoch: Instant::now(),
            current: None,
        }
    }

    fn current(&self) -> Result<&ReplayFrame, UpstreamError> {
        self.current
            .as_ref()
            .ok_or_else(|| UpstreamError::Inference("no frame has been read yet".into()))
    }
}

impl<R: BufRead> InferenceBackend for Replay<R> {
    fn next_frame(&mut self) -> Result<Instant, UpstreamError> {
        loop {
            let line = match self.lines.next() {
                Some(line) => line.map_err(|e| UpstreamError::Inference(e.into()))?,
                None => return Err(UpstreamError::Exhausted),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }

            let frame: ReplayFrame = serde_json::from_str(&line).map_err(|e| {
                UpstreamError::Inference(format!("line {}: {e}", self.line_no).into())
            })?;
            let offset = Duration::try_from_secs_f64(frame.t).map_err(|e| {
                UpstreamError::Inference(format!("line {}: {e}", self.line_no).into())
            })?;
            self.current = Some(frame);
            return Ok(self.epoch + offset);
        }
    }

    fn detect_palm(&mut self) -> Result<PalmDetection, UpstreamError> {
        Ok(self
            .current()?
            .detection
            .clone()
            .unwrap_or_else(PalmDetection::absent))
    }

    fn regress_landmarks(&mut self, _roi: &Roi) -> Result<RawLandmarks, UpstreamError> {
        Ok(self
            .current()?
            .landmarks
            .clone()
            .unwrap_or_else(RawLandmarks::absent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_frames() {
        let data = r#"
{"t": 0.0, "detection": {"score": 0.9, "x_center": 0.5, "y_center": 0.5, "size": 0.2, "wrist": {"x": 0.5, "y": 0.6}, "middle_finger": {"x": 0.5, "y": 0.4}}}

{"t": 0.5}
"#;
        let mut replay = Replay::new(data.as_bytes());
        let t0 = replay.next_frame().unwrap();
        assert_eq!(replay.detect_palm().unwrap().score, 0.9);
        let roi = Roi::new(0.5, 0.5, 0.5, 0.0);
        assert_eq!(replay.regress_landmarks(&roi).unwrap().score, 0.0);

        let t1 = replay.next_frame().unwrap();
        assert_eq!(t1 - t0, Duration::from_millis(500));
        assert_eq!(replay.detect_palm().unwrap().score, 0.0);

        assert!(matches!(replay.next_frame(), Err(UpstreamError::Exhausted)));
    }

    #[test]
    fn malformed_line() {
        let mut replay = Replay::new("{\"t\": \"soon\"}\n".as_bytes());
        match replay.next_frame() {
            Err(UpstreamError::Inference(e)) => assert!(e.to_string().contains("line 1")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn negative_timestamp() {
        let mut replay = Replay::new("{\"t\": -1.0}\n".as_bytes());
        assert!(matches!(
            replay.next_frame(),
            Err(UpstreamError::Inference(_))
        ));
    }
}
