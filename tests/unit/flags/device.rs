use super::*;
use crate::env::probe::{HeadlessProbe, StaticProbe};
use crate::foundation::error::WobblazError;

struct BrokenProbe;

impl DeviceProbe for BrokenProbe {
    fn hardware_concurrency(&self) -> WobblazResult<Option<u32>> {
        Err(WobblazError::probe("navigator unavailable"))
    }

    fn gpu_renderer(&self) -> WobblazResult<Option<String>> {
        Err(WobblazError::probe("webgl context lost"))
    }

    fn device_memory_gb(&self) -> WobblazResult<Option<f64>> {
        Ok(Some(2.0))
    }
}

#[test]
fn headless_probe_is_optimistic() {
    let d = DeviceCapabilities::probe(&HeadlessProbe);
    assert_eq!(d, DeviceCapabilities::default());
    assert!(!d.is_low_end());
    assert_eq!(d.base_quality(), Quality::High);
}

#[test]
fn failed_reads_fall_back_per_signal() {
    let d = DeviceCapabilities::probe(&BrokenProbe);
    assert_eq!(d.cpu_cores, 8);
    assert_eq!(d.gpu_tier, GpuTier::Unknown);
    assert_eq!(d.memory_gb, 2.0);
    assert!(d.is_low_end());
}

#[test]
fn renderer_classification() {
    assert_eq!(
        GpuTier::from_renderer("Google SwiftShader"),
        GpuTier::Software
    );
    assert_eq!(
        GpuTier::from_renderer("llvmpipe (LLVM 15.0.7, 256 bits)"),
        GpuTier::Software
    );
    assert_eq!(
        GpuTier::from_renderer("ANGLE (Apple, Apple M2, OpenGL 4.1)"),
        GpuTier::Hardware
    );
    assert_eq!(GpuTier::from_renderer("  "), GpuTier::Unknown);
}

#[test]
fn low_end_classification() {
    let tiny = DeviceCapabilities::probe(&StaticProbe::default().cores(1).memory_gb(1.0));
    assert!(tiny.is_low_end());
    assert_eq!(tiny.base_quality(), Quality::Low);

    let soft = DeviceCapabilities::probe(
        &StaticProbe::default()
            .cores(4)
            .memory_gb(8.0)
            .renderer("SwiftShader"),
    );
    assert!(soft.is_low_end());
    assert!(!soft.has_good_gpu());
}

#[test]
fn medium_when_cpu_or_gpu_is_modest() {
    let soft_big = DeviceCapabilities::probe(
        &StaticProbe::default()
            .cores(16)
            .memory_gb(16.0)
            .renderer("llvmpipe"),
    );
    assert!(!soft_big.is_low_end());
    assert_eq!(soft_big.base_quality(), Quality::Medium);

    let three_cores = DeviceCapabilities::probe(&StaticProbe::default().cores(3).memory_gb(8.0));
    assert_eq!(three_cores.base_quality(), Quality::Medium);
}

#[test]
fn touch_hover_and_motion_signals() {
    let d = DeviceCapabilities::probe(
        &StaticProbe::default()
            .touch_points(5)
            .hover(false)
            .reduced_motion(true)
            .pixel_ratio(3.0),
    );
    assert!(d.touch);
    assert!(!d.hover);
    assert!(d.reduced_motion);
    assert_eq!(d.pixel_ratio, 3.0);
}

#[test]
fn nonsense_readings_are_sanitized() {
    let d = DeviceCapabilities::probe(
        &StaticProbe::default()
            .cores(0)
            .memory_gb(f64::NAN)
            .pixel_ratio(-1.0),
    );
    assert_eq!(d.cpu_cores, 1);
    assert_eq!(d.memory_gb, 8.0);
    assert_eq!(d.pixel_ratio, 1.0);
}
