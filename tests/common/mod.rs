//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use laser_recon::PointCloudBuffer;
use crossbeam_channel::Receiver;
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_secs(2)
}

/// Receive `n` clouds or panic after the test timeout
pub fn recv_clouds(rx: &Receiver<PointCloudBuffer>, n: usize) -> Vec<PointCloudBuffer> {
    (0..n)
        .map(|i| {
            rx.recv_timeout(test_timeout())
                .unwrap_or_else(|_| panic!("timed out waiting for cloud {}", i))
        })
        .collect()
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
