//! GLSL sources for the lightning and overlay programs and their ahead-of-time check.
//!
//! wgpu reports shader problems through error scopes without the source context, so both
//! stages are first run through naga's GLSL front end and validator. That gives a readable
//! diagnostic and the IR the uniform layout is reflected from.

use wgpu::naga;
use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

/// Name of the uniform block declared by [`FRAGMENT_SHADER_GLSL`].
pub const UNIFORM_BLOCK: &str = "LightningParams";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile:\n{diagnostic}")]
    Compile {
        stage: &'static str,
        diagnostic: String,
    },
    #[error("render pipeline failed to link: {0}")]
    Link(String),
}

/// Parses and validates GLSL, returning the naga module.
pub fn check_glsl(stage: naga::ShaderStage, source: &str) -> Result<naga::Module, ShaderError> {
    let label = stage_label(stage);
    let mut frontend = glsl::Frontend::default();
    let module = frontend
        .parse(&glsl::Options::from(stage), source)
        .map_err(|errors| ShaderError::Compile {
            stage: label,
            diagnostic: errors.emit_to_string(source),
        })?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|error| ShaderError::Compile {
            stage: label,
            diagnostic: error.emit_to_string(source),
        })?;

    tracing::trace!(
        stage = label,
        globals = module.global_variables.len(),
        functions = module.functions.len(),
        "validated GLSL stage"
    );
    Ok(module)
}

pub(crate) fn stage_label(stage: naga::ShaderStage) -> &'static str {
    match stage {
        naga::ShaderStage::Vertex => "vertex",
        naga::ShaderStage::Fragment => "fragment",
        _ => "compute",
    }
}

/// Full-viewport quad; `v_uv` has its origin at the bottom-left corner.
pub const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 0) out vec2 v_uv;

void main() {
    v_uv = a_position * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Vertical animated lightning beam.
///
/// Pixel coordinates are rebuilt from `v_uv` so they match the drawing-buffer resolution
/// even when the viewport is scaled.
pub const FRAGMENT_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform LightningParams {
    vec2 _iResolution;
    float _iTime;
    float _uHue;
    float _uXOffset;
    float _uSpeed;
    float _uIntensity;
    float _uSize;
} params;

#define iResolution params._iResolution
#define iTime params._iTime
#define uHue params._uHue
#define uXOffset params._uXOffset
#define uSpeed params._uSpeed
#define uIntensity params._uIntensity
#define uSize params._uSize

#define OCTAVE_COUNT 10

vec3 hsv2rgb(vec3 c) {
    vec3 k = mod(vec3(c.x * 6.0) + vec3(0.0, 4.0, 2.0), vec3(6.0));
    vec3 rgb = clamp(abs(k - vec3(3.0)) - vec3(1.0), vec3(0.0), vec3(1.0));
    return c.z * mix(vec3(1.0), rgb, vec3(c.y));
}

float hash11(float p) {
    p = fract(p * 0.1031);
    p *= p + 33.33;
    p *= p + p;
    return fract(p);
}

float hash12(vec2 p) {
    vec3 p3 = fract(vec3(p.x, p.y, p.x) * 0.1031);
    p3 += vec3(dot(p3, p3.yzx + vec3(33.33)));
    return fract((p3.x + p3.y) * p3.z);
}

vec2 rotate(vec2 p, float theta) {
    float c = cos(theta);
    float s = sin(theta);
    return vec2(c * p.x - s * p.y, s * p.x + c * p.y);
}

float valueNoise(vec2 p) {
    vec2 ip = floor(p);
    vec2 fp = fract(p);
    float a = hash12(ip);
    float b = hash12(ip + vec2(1.0, 0.0));
    float c = hash12(ip + vec2(0.0, 1.0));
    float d = hash12(ip + vec2(1.0, 1.0));
    vec2 t = smoothstep(vec2(0.0), vec2(1.0), fp);
    return mix(mix(a, b, t.x), mix(c, d, t.x), t.y);
}

float fbm(vec2 p) {
    float value = 0.0;
    float amplitude = 0.5;
    for (int i = 0; i < OCTAVE_COUNT; ++i) {
        value += amplitude * valueNoise(p);
        p = rotate(p, 0.45) * 2.0;
        amplitude *= 0.5;
    }
    return value;
}

vec3 lightning(vec2 fragCoord) {
    vec2 uv = fragCoord / iResolution;
    uv = 2.0 * uv - vec2(1.0);
    uv.x *= iResolution.x / iResolution.y;
    uv.x += uXOffset;

    float warp = fbm(uv * uSize + vec2(0.8 * iTime * uSpeed));
    uv.x += (warp - 0.5) * 0.35;

    float dist = abs(uv.x);
    float h = fract(uHue / 360.0 + 0.05 * iTime);
    vec3 baseColor = hsv2rgb(vec3(h, 0.75, 1.0));

    float core = 0.020 / (dist * dist + 0.0008);
    float halo = 0.009 / (dist + 0.020);
    float flicker = mix(0.85, 1.15, hash11(iTime * uSpeed * 3.0));
    vec3 col = baseColor * ((core + halo) * flicker * uIntensity);
    return clamp(col, vec3(0.0), vec3(1.0));
}

void main() {
    outColor = vec4(lightning(v_uv * iResolution), 1.0);
}
";

/// Same quad as [`VERTEX_SHADER_GLSL`], with `v_uv` flipped so row 0 of a texture is the top.
pub const OVERLAY_VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 0) out vec2 v_uv;

void main() {
    v_uv = vec2(a_position.x * 0.5 + 0.5, 0.5 - a_position.y * 0.5);
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Tints a coverage texture; alpha comes from the red channel.
pub const OVERLAY_FRAGMENT_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(set = 0, binding = 0) uniform texture2D coverageTexture;
layout(set = 0, binding = 1) uniform sampler coverageSampler;
layout(std140, set = 0, binding = 2) uniform OverlayParams {
    vec4 tint;
} params;

void main() {
    float coverage = texture(sampler2D(coverageTexture, coverageSampler), v_uv).r;
    outColor = vec4(params.tint.rgb, coverage * params.tint.a);
}
";
