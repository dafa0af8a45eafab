use crate::env::probe::DeviceProbe;
use crate::foundation::core::Quality;
use crate::foundation::error::WobblazResult;

// Renderer substrings that indicate software rasterization.
const SOFTWARE_RENDERERS: [&str; 6] = [
    "swiftshader",
    "llvmpipe",
    "softpipe",
    "software",
    "basic render",
    "mesa offscreen",
];

/// Coarse GPU classification from the renderer string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuTier {
    /// Software rasterizer.
    Software,
    /// Hardware-accelerated renderer.
    Hardware,
    /// Renderer not exposed; treated as hardware.
    #[default]
    Unknown,
}

impl GpuTier {
    /// Classify an unmasked renderer string.
    pub fn from_renderer(renderer: &str) -> Self {
        let r = renderer.to_ascii_lowercase();
        if r.trim().is_empty() {
            Self::Unknown
        } else if SOFTWARE_RENDERERS.iter().any(|s| r.contains(s)) {
            Self::Software
        } else {
            Self::Hardware
        }
    }
}

/// One-time snapshot of the device's animation-relevant capabilities.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DeviceCapabilities {
    /// Logical cores.
    pub cpu_cores: u32,
    /// Device memory in GiB.
    pub memory_gb: f64,
    /// GPU classification.
    pub gpu_tier: GpuTier,
    /// Raw renderer string, when exposed.
    pub gpu_renderer: Option<String>,
    /// Touch input present.
    pub touch: bool,
    /// Primary pointer can hover.
    pub hover: bool,
    /// `prefers-reduced-motion: reduce` is active.
    pub reduced_motion: bool,
    /// Device pixel ratio.
    pub pixel_ratio: f64,
}

impl Default for DeviceCapabilities {
    /// The optimistic "capable modern device" profile.
    fn default() -> Self {
        Self {
            cpu_cores: 8,
            memory_gb: 8.0,
            gpu_tier: GpuTier::Unknown,
            gpu_renderer: None,
            touch: false,
            hover: true,
            reduced_motion: false,
            pixel_ratio: 1.0,
        }
    }
}

fn read_or<T>(name: &str, read: WobblazResult<Option<T>>, fallback: T) -> T {
    match read {
        Ok(Some(v)) => v,
        Ok(None) => fallback,
        Err(e) => {
            tracing::warn!(
                signal = name,
                error = %e,
                "device probe failed; assuming capable device"
            );
            fallback
        }
    }
}

impl DeviceCapabilities {
    /// Read every signal from `probe`, falling back to [`Default`] per signal.
    pub fn probe(probe: &dyn DeviceProbe) -> Self {
        let d = Self::default();
        let gpu_renderer = read_or("gpu_renderer", probe.gpu_renderer().map(Some), None);
        let gpu_tier = gpu_renderer
            .as_deref()
            .map(GpuTier::from_renderer)
            .unwrap_or(d.gpu_tier);
        let cpu_cores = read_or(
            "hardware_concurrency",
            probe.hardware_concurrency(),
            d.cpu_cores,
        );
        let memory_gb = read_or("device_memory", probe.device_memory_gb(), d.memory_gb);
        let pixel_ratio = read_or(
            "device_pixel_ratio",
            probe.device_pixel_ratio(),
            d.pixel_ratio,
        );
        let reduced_motion = read_or(
            "reduced_motion",
            probe.prefers_reduced_motion(),
            d.reduced_motion,
        );

        Self {
            cpu_cores: cpu_cores.max(1),
            memory_gb: if memory_gb.is_finite() && memory_gb > 0.0 {
                memory_gb
            } else {
                d.memory_gb
            },
            gpu_tier,
            gpu_renderer,
            touch: read_or("max_touch_points", probe.max_touch_points(), 0) > 0,
            hover: read_or("hover", probe.hover_capable(), d.hover),
            reduced_motion,
            pixel_ratio: if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
                pixel_ratio
            } else {
                d.pixel_ratio
            },
        }
    }

    /// Few cores, little memory, or a software GPU on a modest CPU.
    pub fn is_low_end(&self) -> bool {
        self.cpu_cores <= 2
            || self.memory_gb <= 2.0
            || (self.gpu_tier == GpuTier::Software && self.cpu_cores <= 4)
    }

    /// Anything but a software rasterizer.
    pub fn has_good_gpu(&self) -> bool {
        self.gpu_tier != GpuTier::Software
    }

    /// At least four cores and four GiB.
    pub fn has_good_cpu(&self) -> bool {
        self.cpu_cores >= 4 && self.memory_gb >= 4.0
    }

    /// Starting quality tier before per-category adjustments.
    pub fn base_quality(&self) -> Quality {
        if self.is_low_end() {
            Quality::Low
        } else if self.has_good_gpu() && self.has_good_cpu() {
            Quality::High
        } else {
            Quality::Medium
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/flags/device.rs"]
mod tests;
