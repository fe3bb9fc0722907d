use std::sync::Arc;

use crossbeam_channel::Receiver;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::SetupError;

/// Instance, surface and device for one lightning component.
pub(crate) struct GpuContext {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub adapter_name: String,
    lost: Receiver<String>,
    _instance: wgpu::Instance,
}

impl GpuContext {
    pub(crate) fn new<W>(target: Arc<W>, width: u32, height: u32) -> Result<Self, SetupError>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let surface = instance
            .create_surface(target)
            .map_err(|err| SetupError::Unsupported(format!("failed to create rendering surface: {err}")))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| SetupError::Unsupported(format!("no suitable GPU adapter: {err}")))?;

        let info = adapter.get_info();
        tracing::debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            "selected GPU adapter"
        );

        let limits = adapter.limits();
        let max_dimension = limits.max_texture_dimension_2d;
        let (width, height) = (width.clamp(1, max_dimension), height.clamp(1, max_dimension));

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("boltpage device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| SetupError::Unsupported(format!("failed to create GPU device: {err}")))?;

        let (lost_tx, lost) = crossbeam_channel::bounded(1);
        device.set_device_lost_callback(move |reason, message| {
            let _ = lost_tx.try_send(format!("{reason:?}: {message}"));
        });

        let caps = surface.get_capabilities(&adapter);
        let Some(&fallback) = caps.formats.first() else {
            return Err(SetupError::Unsupported(
                "surface reports no supported formats".to_string(),
            ));
        };
        // Shader output is display-referred; keep the swapchain non-sRGB when possible.
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .unwrap_or(fallback);
        let present_mode = if caps.present_modes.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            caps.present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo)
        };
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        tracing::debug!(?format, ?present_mode, width, height, "configured surface");

        Ok(Self {
            surface,
            device,
            queue,
            config,
            adapter_name: info.name,
            lost,
            _instance: instance,
        })
    }

    pub(crate) fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub(crate) fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Reconfigures the swapchain; returns whether the size actually changed.
    pub(crate) fn resize(&mut self, width: u32, height: u32) -> bool {
        let max_dimension = self.device.limits().max_texture_dimension_2d;
        let width = width.clamp(1, max_dimension);
        let height = height.clamp(1, max_dimension);
        if (width, height) == self.size() {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        true
    }

    /// Re-applies the current configuration after `Outdated`/`Lost`.
    pub(crate) fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Reason reported by the device-lost callback, if it fired.
    pub(crate) fn poll_lost(&self) -> Option<String> {
        self.lost.try_recv().ok()
    }
}
