// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Video frame sampling for the camera stream
//!
//! The sampler selects every Nth frame of a live stream for detection;
//! the aggregate keeps a rolling summary of what the session has seen.

use serde::{Deserialize, Serialize};

/// Stride-based frame sampling policy
#[derive(Debug, Clone)]
pub struct FrameSampler {
    stride: u32,
    seen: u64,
}

impl FrameSampler {
    /// Sampler processing every `stride`-th frame (first frame included)
    pub fn new(stride: u32) -> Self {
        Self {
            stride: stride.max(1),
            seen: 0,
        }
    }

    /// Register an incoming frame; returns true when it should be processed
    pub fn should_process(&mut self) -> bool {
        let process = self.seen % self.stride as u64 == 0;
        self.seen += 1;
        process
    }

    pub fn frames_seen(&self) -> u64 {
        self.seen
    }
}

/// Rolling summary over one camera-stream session
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamAggregate {
    pub frames_seen: u64,
    pub frames_processed: u64,
    pub total_detections: u64,
    /// Frames in which at least one sick individual was flagged
    pub sick_frames: u64,
    /// Worst sick count observed in a single frame
    pub max_sick_in_frame: u64,
}

impl StreamAggregate {
    /// Record a skipped (unsampled) frame
    pub fn observe_skip(&mut self) {
        self.frames_seen += 1;
    }

    /// Record a processed frame's detection counts
    pub fn observe_frame(&mut self, total: usize, sick: usize) {
        self.frames_seen += 1;
        self.frames_processed += 1;
        self.total_detections += total as u64;
        if sick > 0 {
            self.sick_frames += 1;
            self.max_sick_in_frame = self.max_sick_in_frame.max(sick as u64);
        }
    }
}
