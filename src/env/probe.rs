use crate::foundation::error::WobblazResult;

/// Read-only access to the hardware signals used for capability classification.
///
/// Every read may be unsupported (`Ok(None)`) or fail outright (`Err`); callers fall back to
/// an optimistic default in both cases. All methods default to "unsupported", which is also
/// what a server-side render with no window sees.
pub trait DeviceProbe {
    /// Logical CPU core count (`navigator.hardwareConcurrency`).
    fn hardware_concurrency(&self) -> WobblazResult<Option<u32>> {
        Ok(None)
    }

    /// Approximate device memory in GiB (`navigator.deviceMemory`).
    fn device_memory_gb(&self) -> WobblazResult<Option<f64>> {
        Ok(None)
    }

    /// Unmasked GPU renderer string.
    fn gpu_renderer(&self) -> WobblazResult<Option<String>> {
        Ok(None)
    }

    /// Maximum simultaneous touch points.
    fn max_touch_points(&self) -> WobblazResult<Option<u32>> {
        Ok(None)
    }

    /// Whether the primary pointer can hover.
    fn hover_capable(&self) -> WobblazResult<Option<bool>> {
        Ok(None)
    }

    /// Current `prefers-reduced-motion: reduce` state.
    fn prefers_reduced_motion(&self) -> WobblazResult<Option<bool>> {
        Ok(None)
    }

    /// Device pixel ratio.
    fn device_pixel_ratio(&self) -> WobblazResult<Option<f64>> {
        Ok(None)
    }
}

/// Probe for contexts with no window at all; every read is unsupported.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessProbe;

impl DeviceProbe for HeadlessProbe {}

/// Probe answering from fixed values, for hosts that gather signals up front.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaticProbe {
    /// See [`DeviceProbe::hardware_concurrency`].
    pub hardware_concurrency: Option<u32>,
    /// See [`DeviceProbe::device_memory_gb`].
    pub device_memory_gb: Option<f64>,
    /// See [`DeviceProbe::gpu_renderer`].
    pub gpu_renderer: Option<String>,
    /// See [`DeviceProbe::max_touch_points`].
    pub max_touch_points: Option<u32>,
    /// See [`DeviceProbe::hover_capable`].
    pub hover_capable: Option<bool>,
    /// See [`DeviceProbe::prefers_reduced_motion`].
    pub prefers_reduced_motion: Option<bool>,
    /// See [`DeviceProbe::device_pixel_ratio`].
    pub device_pixel_ratio: Option<f64>,
}

impl StaticProbe {
    /// Set the core count.
    pub fn cores(mut self, n: u32) -> Self {
        self.hardware_concurrency = Some(n);
        self
    }

    /// Set device memory in GiB.
    pub fn memory_gb(mut self, gb: f64) -> Self {
        self.device_memory_gb = Some(gb);
        self
    }

    /// Set the GPU renderer string.
    pub fn renderer(mut self, renderer: impl Into<String>) -> Self {
        self.gpu_renderer = Some(renderer.into());
        self
    }

    /// Set touch points.
    pub fn touch_points(mut self, n: u32) -> Self {
        self.max_touch_points = Some(n);
        self
    }

    /// Set hover capability.
    pub fn hover(mut self, hover: bool) -> Self {
        self.hover_capable = Some(hover);
        self
    }

    /// Set the reduced-motion preference.
    pub fn reduced_motion(mut self, reduce: bool) -> Self {
        self.prefers_reduced_motion = Some(reduce);
        self
    }

    /// Set the device pixel ratio.
    pub fn pixel_ratio(mut self, dpr: f64) -> Self {
        self.device_pixel_ratio = Some(dpr);
        self
    }
}

impl DeviceProbe for StaticProbe {
    fn hardware_concurrency(&self) -> WobblazResult<Option<u32>> {
        Ok(self.hardware_concurrency)
    }

    fn device_memory_gb(&self) -> WobblazResult<Option<f64>> {
        Ok(self.device_memory_gb)
    }

    fn gpu_renderer(&self) -> WobblazResult<Option<String>> {
        Ok(self.gpu_renderer.clone())
    }

    fn max_touch_points(&self) -> WobblazResult<Option<u32>> {
        Ok(self.max_touch_points)
    }

    fn hover_capable(&self) -> WobblazResult<Option<bool>> {
        Ok(self.hover_capable)
    }

    fn prefers_reduced_motion(&self) -> WobblazResult<Option<bool>> {
        Ok(self.prefers_reduced_motion)
    }

    fn device_pixel_ratio(&self) -> WobblazResult<Option<f64>> {
        Ok(self.device_pixel_ratio)
    }
}
