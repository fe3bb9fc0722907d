use bytemuck::{Pod, Zeroable};
use wgpu::naga;

use crate::types::LightningConfig;

/// Values pushed to the shader every frame, laid out like the std140 block.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct LightningUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub hue: f32,
    pub x_offset: f32,
    pub speed: f32,
    pub intensity: f32,
    pub size: f32,
}

impl LightningUniforms {
    pub fn from_config(config: &LightningConfig) -> Self {
        Self {
            resolution: [1.0, 1.0],
            time: 0.0,
            hue: config.hue,
            x_offset: config.x_offset,
            speed: config.speed,
            intensity: config.intensity,
            size: config.size,
        }
    }

    fn field(&self, field: UniformField) -> &[f32] {
        match field {
            UniformField::Resolution => &self.resolution,
            UniformField::Time => std::slice::from_ref(&self.time),
            UniformField::Hue => std::slice::from_ref(&self.hue),
            UniformField::XOffset => std::slice::from_ref(&self.x_offset),
            UniformField::Speed => std::slice::from_ref(&self.speed),
            UniformField::Intensity => std::slice::from_ref(&self.intensity),
            UniformField::Size => std::slice::from_ref(&self.size),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformField {
    Resolution,
    Time,
    Hue,
    XOffset,
    Speed,
    Intensity,
    Size,
}

impl UniformField {
    pub const ALL: [UniformField; 7] = [
        UniformField::Resolution,
        UniformField::Time,
        UniformField::Hue,
        UniformField::XOffset,
        UniformField::Speed,
        UniformField::Intensity,
        UniformField::Size,
    ];

    /// Member name inside the uniform block.
    pub fn member_name(self) -> &'static str {
        match self {
            UniformField::Resolution => "_iResolution",
            UniformField::Time => "_iTime",
            UniformField::Hue => "_uHue",
            UniformField::XOffset => "_uXOffset",
            UniformField::Speed => "_uSpeed",
            UniformField::Intensity => "_uIntensity",
            UniformField::Size => "_uSize",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Byte offsets of the uniforms a compiled program actually declares.
///
/// Fields the program does not declare have no offset and are never written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformLayout {
    block_size: u32,
    offsets: [Option<u32>; 7],
}

impl UniformLayout {
    /// Layout of [`LightningUniforms`] itself.
    pub fn packed() -> Self {
        let offsets = [
            std::mem::offset_of!(LightningUniforms, resolution),
            std::mem::offset_of!(LightningUniforms, time),
            std::mem::offset_of!(LightningUniforms, hue),
            std::mem::offset_of!(LightningUniforms, x_offset),
            std::mem::offset_of!(LightningUniforms, speed),
            std::mem::offset_of!(LightningUniforms, intensity),
            std::mem::offset_of!(LightningUniforms, size),
        ];
        Self {
            block_size: std::mem::size_of::<LightningUniforms>() as u32,
            offsets: offsets.map(|offset| Some(offset as u32)),
        }
    }

    /// Layout of a program without a uniform block; nothing is ever written.
    pub fn empty() -> Self {
        Self {
            block_size: 0,
            offsets: [None; 7],
        }
    }

    /// Resolves member offsets of the uniform block named `block` in `module`, falling back
    /// to the first uniform block declaring any known member.
    ///
    /// Returns `None` when the module declares no such block.
    pub fn reflect(module: &naga::Module, block: &str) -> Option<Self> {
        let candidates: Vec<(Option<&str>, Self)> = module
            .global_variables
            .iter()
            .filter(|(_, var)| var.space == naga::AddressSpace::Uniform)
            .filter_map(|(_, var)| {
                let ty = &module.types[var.ty];
                let naga::TypeInner::Struct { members, span } = &ty.inner else {
                    return None;
                };
                let mut offsets = [None; 7];
                for field in UniformField::ALL {
                    offsets[field.index()] = members
                        .iter()
                        .find(|member| member.name.as_deref() == Some(field.member_name()))
                        .map(|member| member.offset);
                }
                let layout = Self {
                    block_size: *span,
                    offsets,
                };
                Some((ty.name.as_deref(), layout))
            })
            .collect();

        let named = candidates
            .iter()
            .position(|(name, _)| *name == Some(block));
        let index = named.or_else(|| {
            candidates
                .iter()
                .position(|(_, layout)| layout.offsets.iter().any(Option::is_some))
        })?;
        candidates.into_iter().nth(index).map(|(_, layout)| layout)
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn offset(&self, field: UniformField) -> Option<u32> {
        self.offsets[field.index()]
    }

    pub fn present(&self) -> impl Iterator<Item = UniformField> + '_ {
        UniformField::ALL
            .into_iter()
            .filter(|field| self.offset(*field).is_some())
    }

    /// Uniform buffer size, rounded up to a 16-byte multiple.
    pub fn buffer_size(&self) -> u64 {
        (u64::from(self.block_size.max(16)) + 15) & !15
    }

    /// Writes every present field of `values` into `out` at its reflected offset.
    pub fn write(&self, values: &LightningUniforms, out: &mut [u8]) {
        for field in self.present() {
            let Some(offset) = self.offset(field) else {
                continue;
            };
            let bytes: &[u8] = bytemuck::cast_slice(values.field(field));
            let start = offset as usize;
            if let Some(slot) = out.get_mut(start..start + bytes.len()) {
                slot.copy_from_slice(bytes);
            }
        }
    }
}
