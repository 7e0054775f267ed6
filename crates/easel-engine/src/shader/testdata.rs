//! WGSL sources shared by the test-suite.

pub(crate) const SHAPE_VS: &str = r#"
@group(0) @binding(0) var<uniform> u_resolution: vec2<f32>;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) alpha: f32,
};

@vertex
fn vs_main(@location(0) a_position: vec2<f32>, @location(1) a_alpha: f32) -> VertexOutput {
    let clip = a_position / u_resolution * 2.0 - vec2<f32>(1.0, 1.0);
    var out: VertexOutput;
    out.position = vec4<f32>(clip.x, -clip.y, 0.0, 1.0);
    out.alpha = a_alpha;
    return out;
}
"#;

pub(crate) const SHAPE_FS: &str = r#"
@fragment
fn fs_main(@location(0) alpha: f32) -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.5, 0.2, alpha);
}
"#;

pub(crate) const TEXTURE_VS: &str = r#"
@group(0) @binding(0) var<uniform> u_resolution: vec2<f32>;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) tex_coord: vec2<f32>,
};

@vertex
fn vs_main(@location(0) a_position: vec2<f32>, @location(1) a_texCoord: vec2<f32>) -> VertexOutput {
    let clip = a_position / u_resolution * 2.0 - vec2<f32>(1.0, 1.0);
    var out: VertexOutput;
    out.position = vec4<f32>(clip.x, -clip.y, 0.0, 1.0);
    out.tex_coord = a_texCoord;
    return out;
}
"#;

pub(crate) const TEXTURE_FS: &str = r#"
@group(1) @binding(0) var u_image0: texture_2d<f32>;
@group(1) @binding(1) var u_sampler0: sampler;
@group(1) @binding(2) var u_image1: texture_2d<f32>;
@group(1) @binding(3) var u_sampler1: sampler;

@fragment
fn fs_main(@location(0) tex_coord: vec2<f32>) -> @location(0) vec4<f32> {
    let a = textureSample(u_image0, u_sampler0, tex_coord);
    let b = textureSample(u_image1, u_sampler1, tex_coord);
    return mix(a, b, 0.5);
}
"#;

/// Missing semicolon after the return expression.
pub(crate) const BROKEN_FS: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 0.0, 0.0, 1.0)
}
"#;

/// Reads a varying at a location no vertex stage here writes.
pub(crate) const MISMATCHED_FS: &str = r#"
@fragment
fn fs_main(@location(3) tint: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(tint, 1.0);
}
"#;
