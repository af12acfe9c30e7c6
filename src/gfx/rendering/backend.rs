//! Backend selection
//!
//! Probing never fails: anything that goes wrong while looking for a
//! hardware adapter results in [`RenderBackend::CpuFallback`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{GpuRenderer, Renderer, SoftwareRenderer};

/// Identifies the adapter a hardware renderer runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterSummary {
    pub name: String,
    pub backend: String,
    pub device_type: String,
}

impl From<wgpu::AdapterInfo> for AdapterSummary {
    fn from(info: wgpu::AdapterInfo) -> Self {
        Self {
            name: info.name,
            backend: format!("{:?}", info.backend),
            device_type: format!("{:?}", info.device_type),
        }
    }
}

/// Outcome of [`probe_backend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderBackend {
    Accelerated(AdapterSummary),
    CpuFallback,
}

impl fmt::Display for RenderBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderBackend::Accelerated(a) => {
                write!(f, "GPU '{}' ({}, {})", a.name, a.backend, a.device_type)
            }
            RenderBackend::CpuFallback => write!(f, "CPU rasterizer"),
        }
    }
}

/// Which backend the caller would like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BackendPreference {
    /// Use a GPU when one is present.
    #[default]
    Auto,
    /// Same as `auto`, but warn when falling back.
    Gpu,
    /// Never touch the GPU.
    Cpu,
}

pub(crate) fn new_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

/// Highest performance adapter that is not itself a software rasterizer.
pub(crate) fn request_hardware_adapter(instance: &wgpu::Instance) -> Option<wgpu::Adapter> {
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .ok()?;

    if adapter.get_info().device_type == wgpu::DeviceType::Cpu {
        log::debug!("ignoring software adapter '{}'", adapter.get_info().name);
        return None;
    }
    Some(adapter)
}

/// Looks for a hardware adapter according to `preference`.
pub fn probe_backend(preference: BackendPreference) -> RenderBackend {
    if preference == BackendPreference::Cpu {
        return RenderBackend::CpuFallback;
    }

    match request_hardware_adapter(&new_instance()) {
        Some(adapter) => RenderBackend::Accelerated(adapter.get_info().into()),
        None => {
            if preference == BackendPreference::Gpu {
                log::warn!("no hardware GPU adapter found, falling back to the CPU rasterizer");
            }
            RenderBackend::CpuFallback
        }
    }
}

/// Probes once and builds the renderer for the chosen backend.
///
/// A GPU that is found but fails to initialize also degrades to the CPU
/// rasterizer.
pub fn create_renderer(preference: BackendPreference) -> Box<dyn Renderer> {
    let backend = probe_backend(preference);
    let renderer: Box<dyn Renderer> = match backend {
        RenderBackend::Accelerated(summary) => match GpuRenderer::new(summary) {
            Ok(gpu) => Box::new(gpu),
            Err(err) => {
                log::warn!("GPU initialization failed ({err}), falling back to the CPU rasterizer");
                Box::new(SoftwareRenderer::new())
            }
        },
        RenderBackend::CpuFallback => Box::new(SoftwareRenderer::new()),
    };
    log::info!("render backend: {}", renderer.backend());
    renderer
}
