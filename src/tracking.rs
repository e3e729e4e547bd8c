//! Per-frame input from the face tracker.
//!
//! The tracker itself is an external collaborator; this module only defines
//! what it hands to the control loop each tick, plus a deterministic
//! synthetic source used by the binary and the benchmarks.

use crate::constants::{BLENDSHAPE_COUNT, DEFAULT_INPUT_HEIGHT, DEFAULT_INPUT_WIDTH};
use crate::event_trigger::Blendshape;

/// One tracker result
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingFrame {
    /// Head coordinate pair in tracker input-frame pixels
    pub head: [f32; 2],
    /// Nose tip position in tracker input-frame pixels
    pub nose_tip: [f32; 2],
    /// Pitch and yaw in degrees, when the tracker reports them
    pub pitch_yaw: Option<[f32; 2]>,
    /// Expression scores indexed by tracker blendshape index
    pub blendshapes: Vec<f32>,
    pub is_face_visible: bool,
    /// Frames elapsed since the previous result (at least 1)
    pub gap_frames: u32,
}

impl TrackingFrame {
    /// A frame with the face visible, neutral scores and the given pose
    pub fn new(head: [f32; 2], nose_tip: [f32; 2]) -> Self {
        Self {
            head,
            nose_tip,
            pitch_yaw: None,
            blendshapes: vec![0.0; BLENDSHAPE_COUNT],
            is_face_visible: true,
            gap_frames: 1,
        }
    }

    /// A frame reporting that no face was found
    pub fn lost() -> Self {
        Self {
            head: [0.0, 0.0],
            nose_tip: [0.0, 0.0],
            pitch_yaw: None,
            blendshapes: Vec::new(),
            is_face_visible: false,
            gap_frames: 1,
        }
    }

    #[must_use]
    pub fn with_pitch_yaw(mut self, pitch: f32, yaw: f32) -> Self {
        self.pitch_yaw = Some([pitch, yaw]);
        self
    }

    /// Set a single blendshape score; virtual blendshapes are ignored
    #[must_use]
    pub fn with_score(mut self, blendshape: Blendshape, score: f32) -> Self {
        if let Some(i) = blendshape.index() {
            if self.blendshapes.len() <= i {
                self.blendshapes.resize(i + 1, 0.0);
            }
            self.blendshapes[i] = score;
        }
        self
    }
}

/// Scripted tracker that sweeps the head in a slow figure and opens the
/// mouth periodically.
pub struct SyntheticTracker {
    frame: u64,
    width: f32,
    height: f32,
    /// Frames between mouth-open pulses; 0 disables them
    pulse_every: u64,
    pulse_len: u64,
}

impl SyntheticTracker {
    pub fn new(pulse_every: u64) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self {
            frame: 0,
            width: DEFAULT_INPUT_WIDTH as f32,
            height: DEFAULT_INPUT_HEIGHT as f32,
            pulse_every,
            pulse_len: 6,
        }
    }

    /// Produce the next frame
    #[allow(clippy::cast_precision_loss)]
    pub fn next_frame(&mut self) -> TrackingFrame {
        let t = self.frame as f32 / 60.0;
        self.frame += 1;

        let cx = self.width / 2.0;
        let cy = self.height / 2.0;
        let head = [cx + 0.25 * self.width * (0.7 * t).sin(), cy + 0.2 * self.height * (1.1 * t).sin()];
        let nose_tip = [head[0] + 4.0 * (3.0 * t).cos(), head[1] + 3.0 * (2.0 * t).sin()];
        let yaw = 20.0 * (0.7 * t).sin();
        let pitch = 12.0 * (1.1 * t).sin();

        let mouth = if self.pulse_every > 0 && self.frame % self.pulse_every < self.pulse_len {
            0.9
        } else {
            0.05
        };

        TrackingFrame::new(head, nose_tip)
            .with_pitch_yaw(pitch, yaw)
            .with_score(Blendshape::OpenMouth, mouth)
    }
}

impl Iterator for SyntheticTracker {
    type Item = TrackingFrame;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_frame())
    }
}
