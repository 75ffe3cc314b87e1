// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Frame sampling policy over a simulated camera stream

use flocksense::vision::{FrameSampler, StreamAggregate};

#[test]
fn test_sampling_rate_over_long_stream() {
    let mut sampler = FrameSampler::new(5);
    let processed = (0..100).filter(|_| sampler.should_process()).count();
    assert_eq!(processed, 20);
    assert_eq!(sampler.frames_seen(), 100);
}

#[test]
fn test_simulated_stream_session() {
    let mut sampler = FrameSampler::new(3);
    let mut aggregate = StreamAggregate::default();

    // 30-frame stream: a sick bird shows up in the middle third
    for frame in 0..30u64 {
        if !sampler.should_process() {
            aggregate.observe_skip();
            continue;
        }
        let sick = if (10..20).contains(&frame) { 1 } else { 0 };
        aggregate.observe_frame(4, sick);
    }

    assert_eq!(aggregate.frames_seen, 30);
    assert_eq!(aggregate.frames_processed, 10);
    // Processed frames 12, 15, 18 fall in the sick window
    assert_eq!(aggregate.sick_frames, 3);
    assert_eq!(aggregate.max_sick_in_frame, 1);
    assert_eq!(aggregate.total_detections, 40);
}

#[test]
fn test_fresh_sampler_processes_first_frame() {
    let mut sampler = FrameSampler::new(30);
    assert!(sampler.should_process());
    assert!(!sampler.should_process());
}
