use bytemuck::{Pod, Zeroable};

/// Floors and the car are unit quads placed by a per-instance rect given in
/// logical pixels. The camera uniform carries the stack translation and the
/// device pixel ratio so row edges land on whole physical pixels.
pub(super) const TOWER_SHADER_SOURCE: &str = r#"
struct Camera {
    viewport: vec2<f32>,
    translate_y: f32,
    scale: f32,
};

@group(1) @binding(0)
var<uniform> camera: Camera;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
};

struct InstanceInput {
    @location(2) rect: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

fn snap(value: f32) -> f32 {
    return floor(value * camera.scale + 0.5) / camera.scale;
}

@vertex
fn vs_main(input: VertexInput, placement: InstanceInput) -> VertexOutput {
    let local = placement.rect.xy + input.position * placement.rect.zw;
    let x = snap(local.x);
    let y = snap(local.y + camera.translate_y);
    var out: VertexOutput;
    out.position = vec4<f32>(
        x / camera.viewport.x * 2.0 - 1.0,
        1.0 - y / camera.viewport.y * 2.0,
        0.0,
        1.0
    );
    out.uv = input.uv;
    return out;
}

@group(0) @binding(0)
var floor_texture: texture_2d<f32>;
@group(0) @binding(1)
var floor_sampler: sampler;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let uv = clamp(input.uv, vec2<f32>(0.0, 0.0), vec2<f32>(1.0, 1.0));
    return textureSample(floor_texture, floor_sampler, uv);
}
"#;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

/// Unit square with its origin at the top-left corner, y pointing down.
pub(super) const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex {
        position: [0.0, 0.0],
        uv: [0.0, 0.0],
    },
    QuadVertex {
        position: [1.0, 0.0],
        uv: [1.0, 0.0],
    },
    QuadVertex {
        position: [0.0, 1.0],
        uv: [0.0, 1.0],
    },
    QuadVertex {
        position: [1.0, 1.0],
        uv: [1.0, 1.0],
    },
];

pub(super) const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

/// Placement of one quad: `[x, y, width, height]` in logical pixels, with
/// `y` measured from the top of the stack.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(super) struct QuadInstance {
    pub rect: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(super) struct CameraUniform {
    pub viewport: [f32; 2],
    pub translate_y: f32,
    pub scale: f32,
}
