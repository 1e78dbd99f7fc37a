// SPDX-License-Identifier: GPL-3.0-only

//! GPU initialization utilities for the analysis pipeline.
//!
//! The pipeline renders into offscreen targets only, so no surface is
//! requested. Callers embedding the pipeline in an existing renderer pass
//! their own device and queue through `RenderSurfaceConfig` instead.

use crate::errors::SpectrumError;
use std::sync::Arc;
use tracing::{debug, info};

/// Re-export wgpu for use throughout the crate
pub use wgpu_compute as wgpu;

/// Information about the created GPU device
#[derive(Debug, Clone)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, Metal, DX12, etc.)
    pub backend: wgpu::Backend,
    /// Largest 2D texture edge the device accepts
    pub max_texture_dimension: u32,
}

/// Create a wgpu device and queue for offscreen analysis.
///
/// # Arguments
///
/// * `label` - A label for the device (for debugging)
///
/// # Returns
///
/// A tuple of (Device, Queue, GpuDeviceInfo)
pub async fn create_analysis_device(
    label: &str,
) -> Result<(Arc<wgpu::Device>, Arc<wgpu::Queue>, GpuDeviceInfo), SpectrumError> {
    info!(label = label, "Creating GPU device for spectrum analysis");

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::VULKAN,
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| SpectrumError::NoAdapter(e.to_string()))?;

    let adapter_info = adapter.get_info();
    let adapter_limits = adapter.limits();

    info!(
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        "GPU adapter selected for analysis"
    );

    debug!(
        max_texture_dimension = adapter_limits.max_texture_dimension_2d,
        "Adapter limits"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits: adapter_limits.clone(),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await
        .map_err(|e| SpectrumError::DeviceRequest(e.to_string()))?;

    let info = GpuDeviceInfo {
        adapter_name: adapter_info.name.clone(),
        backend: adapter_info.backend,
        max_texture_dimension: adapter_limits.max_texture_dimension_2d,
    };

    Ok((Arc::new(device), Arc::new(queue), info))
}
