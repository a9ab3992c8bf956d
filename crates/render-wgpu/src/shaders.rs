/// Lit, normal and flat meshes plus the procedural water surface.
///
/// `object.emissive.w` selects the mesh mode: 0 standard, 1 normal, 2 basic.
pub const SCENE_SHADER: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    camera: vec4<f32>,
    ambient: vec4<f32>,
    light0_dir: vec4<f32>,
    light0_color: vec4<f32>,
    light1_dir: vec4<f32>,
    light1_color: vec4<f32>,
};

struct Object {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    color: vec4<f32>,
    emissive: vec4<f32>,
    surface: vec4<f32>,
    flow: vec4<f32>,
    config: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

@group(1) @binding(0)
var<uniform> object: Object;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let world = object.model * vec4<f32>(vertex.position, 1.0);
    var out: VertexOutput;
    out.clip_position = globals.view_proj * world;
    out.world_position = world.xyz;
    out.world_normal = normalize((object.normal_matrix * vec4<f32>(vertex.normal, 0.0)).xyz);
    out.uv = vertex.uv;
    return out;
}

fn shade(n: vec3<f32>, v: vec3<f32>, dir: vec4<f32>, color: vec4<f32>) -> vec3<f32> {
    if dir.w < 0.5 {
        return vec3<f32>(0.0);
    }
    let l = normalize(dir.xyz);
    let n_dot_l = max(dot(n, l), 0.0);
    let h = normalize(l + v);
    let roughness = clamp(object.surface.x, 0.04, 1.0);
    let metalness = object.surface.y;
    let shininess = mix(128.0, 2.0, roughness);
    let specular = pow(max(dot(n, h), 0.0), shininess) * (1.0 - roughness * 0.9);
    let diffuse_color = object.color.rgb * (1.0 - metalness);
    let specular_color = mix(vec3<f32>(0.04), object.color.rgb, metalness);
    return color.rgb * n_dot_l * (diffuse_color + specular_color * specular);
}

@fragment
fn fs_mesh(in: VertexOutput) -> @location(0) vec4<f32> {
    let mode = u32(round(object.emissive.w));
    let n = normalize(in.world_normal);
    if mode == 1u {
        return vec4<f32>(n * 0.5 + 0.5, 1.0);
    }
    if mode == 2u {
        return vec4<f32>(object.color.rgb, 1.0);
    }
    let v = normalize(globals.camera.xyz - in.world_position);
    var lit = globals.ambient.rgb * object.color.rgb;
    lit += shade(n, v, globals.light0_dir, globals.light0_color);
    lit += shade(n, v, globals.light1_dir, globals.light1_color);
    return vec4<f32>(lit + object.emissive.rgb, 1.0);
}

fn hash(p: vec2<f32>) -> f32 {
    return fract(sin(dot(p, vec2<f32>(127.1, 311.7))) * 43758.5453);
}

fn value_noise(p: vec2<f32>) -> f32 {
    let i = floor(p);
    let f = fract(p);
    let u = f * f * (3.0 - 2.0 * f);
    let a = hash(i);
    let b = hash(i + vec2<f32>(1.0, 0.0));
    let c = hash(i + vec2<f32>(0.0, 1.0));
    let d = hash(i + vec2<f32>(1.0, 1.0));
    return mix(mix(a, b, u.x), mix(c, d, u.x), u.y);
}

fn ripples(p: vec2<f32>) -> f32 {
    var sum = 0.0;
    var amplitude = 0.5;
    var q = p;
    for (var octave = 0; octave < 4; octave++) {
        sum += value_noise(q) * amplitude;
        q = q * 2.03 + vec2<f32>(17.0, 9.0);
        amplitude *= 0.5;
    }
    return sum;
}

fn ripple_normal(p: vec2<f32>) -> vec3<f32> {
    let e = 0.05;
    let dx = ripples(p + vec2<f32>(e, 0.0)) - ripples(p - vec2<f32>(e, 0.0));
    let dy = ripples(p + vec2<f32>(0.0, e)) - ripples(p - vec2<f32>(0.0, e));
    return normalize(vec3<f32>(-dx, -dy, 0.4));
}

@fragment
fn fs_water(in: VertexOutput) -> @location(0) vec4<f32> {
    let flow = object.flow.xy;
    let offset0 = object.config.x;
    let offset1 = object.config.y;
    let half_cycle = object.config.z;
    let scale = object.config.w;

    // Two phases of the flowing pattern, half a cycle apart, cross-faded.
    let p = in.uv * scale * 8.0;
    let n0 = ripple_normal(p + flow * offset0 * 8.0);
    let n1 = ripple_normal(p + flow * offset1 * 8.0);
    let flow_lerp = abs(half_cycle - offset0) / half_cycle;
    let tangent_normal = normalize(mix(n0, n1, flow_lerp));

    // Plane geometry lies in local XY; rotate the ripple normal into world space.
    let base_normal = normalize(in.world_normal);
    let up = select(vec3<f32>(0.0, 0.0, 1.0), vec3<f32>(0.0, 1.0, 0.0), abs(base_normal.y) < 0.99);
    let tangent = normalize(cross(up, base_normal));
    let bitangent = cross(base_normal, tangent);
    let n = normalize(tangent * tangent_normal.x + bitangent * tangent_normal.y + base_normal * tangent_normal.z);

    let v = normalize(globals.camera.xyz - in.world_position);
    let cos_theta = clamp(dot(n, v), 0.0, 1.0);
    let reflectivity = 0.02;
    let fresnel = reflectivity + (1.0 - reflectivity) * pow(1.0 - cos_theta, 5.0);

    let r = reflect(-v, n);
    let horizon = vec3<f32>(0.55, 0.65, 0.75);
    let zenith = vec3<f32>(0.15, 0.3, 0.55);
    let reflection = mix(horizon, zenith, clamp(r.y, 0.0, 1.0));
    let refraction = vec3<f32>(0.05, 0.18, 0.22) * (globals.ambient.rgb + 0.5);

    var color = object.color.rgb * mix(refraction, reflection, fresnel);
    if globals.light0_dir.w > 0.5 {
        let l = normalize(globals.light0_dir.xyz);
        let h = normalize(l + v);
        color += globals.light0_color.rgb * pow(max(dot(n, h), 0.0), 200.0);
    }
    return vec4<f32>(color, 1.0);
}
"#;

/// Oversized triangle covering the viewport; shared by every post pass.
const FULLSCREEN_VERTEX: &str = r#"
struct FullscreenOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_fullscreen(@builtin(vertex_index) index: u32) -> FullscreenOutput {
    let x = f32((index << 1u) & 2u);
    let y = f32(index & 2u);
    var out: FullscreenOutput;
    out.position = vec4<f32>(x * 2.0 - 1.0, 1.0 - y * 2.0, 0.0, 1.0);
    out.uv = vec2<f32>(x, y);
    return out;
}
"#;

/// Keeps texels brighter than the threshold, blacks out the rest.
const HIGH_PASS_FRAGMENT: &str = r#"
struct HighPass {
    threshold: f32,
    smooth_width: f32,
    _pad: vec2<f32>,
};

@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;
@group(0) @binding(2) var<uniform> params: HighPass;

@fragment
fn fs_main(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let texel = textureSampleLevel(source, source_sampler, in.uv, 0.0);
    let luminance = dot(texel.rgb, vec3<f32>(0.299, 0.587, 0.114));
    let alpha = smoothstep(params.threshold, params.threshold + params.smooth_width, luminance);
    return mix(vec4<f32>(0.0), texel, alpha);
}
"#;

/// One direction of a separable gaussian; sigma equals the kernel radius.
const BLUR_FRAGMENT: &str = r#"
struct Blur {
    inv_size: vec2<f32>,
    direction: vec2<f32>,
    kernel_radius: f32,
    _pad0: f32,
    _pad1: vec2<f32>,
};

@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;
@group(0) @binding(2) var<uniform> params: Blur;

fn gaussian(x: f32, sigma: f32) -> f32 {
    return 0.39894 * exp(-0.5 * x * x / (sigma * sigma)) / sigma;
}

@fragment
fn fs_main(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let sigma = params.kernel_radius;
    var weight_sum = gaussian(0.0, sigma);
    var sum = textureSampleLevel(source, source_sampler, in.uv, 0.0).rgb * weight_sum;
    let radius = i32(params.kernel_radius);
    for (var i = 1; i < radius; i++) {
        let x = f32(i);
        let w = gaussian(x, sigma);
        let offset = params.direction * params.inv_size * x;
        let a = textureSampleLevel(source, source_sampler, in.uv + offset, 0.0).rgb;
        let b = textureSampleLevel(source, source_sampler, in.uv - offset, 0.0).rgb;
        sum += (a + b) * w;
        weight_sum += 2.0 * w;
    }
    return vec4<f32>(sum / weight_sum, 1.0);
}
"#;

/// Weighted sum of the five blurred mips, added onto the bloom target.
const BLOOM_COMPOSITE_FRAGMENT: &str = r#"
struct Composite {
    factors0: vec4<f32>,
    factors1: vec4<f32>,
    strength: f32,
    radius: f32,
    _pad: vec2<f32>,
};

@group(0) @binding(0) var mip0: texture_2d<f32>;
@group(0) @binding(1) var mip1: texture_2d<f32>;
@group(0) @binding(2) var mip2: texture_2d<f32>;
@group(0) @binding(3) var mip3: texture_2d<f32>;
@group(0) @binding(4) var mip4: texture_2d<f32>;
@group(0) @binding(5) var mip_sampler: sampler;
@group(0) @binding(6) var<uniform> params: Composite;

fn lerp_factor(factor: f32) -> f32 {
    return mix(factor, 1.2 - factor, params.radius);
}

@fragment
fn fs_main(in: FullscreenOutput) -> @location(0) vec4<f32> {
    var sum = lerp_factor(params.factors0.x) * textureSampleLevel(mip0, mip_sampler, in.uv, 0.0).rgb;
    sum += lerp_factor(params.factors0.y) * textureSampleLevel(mip1, mip_sampler, in.uv, 0.0).rgb;
    sum += lerp_factor(params.factors0.z) * textureSampleLevel(mip2, mip_sampler, in.uv, 0.0).rgb;
    sum += lerp_factor(params.factors0.w) * textureSampleLevel(mip3, mip_sampler, in.uv, 0.0).rgb;
    sum += lerp_factor(params.factors1.x) * textureSampleLevel(mip4, mip_sampler, in.uv, 0.0).rgb;
    return vec4<f32>(sum * params.strength, 1.0);
}
"#;

/// Base scene plus bloom, exposure, Reinhard tone mapping.
const FINAL_FRAGMENT: &str = r#"
struct FinalParams {
    exposure: f32,
    bloom_mix: f32,
    _pad: vec2<f32>,
};

@group(0) @binding(0) var base: texture_2d<f32>;
@group(0) @binding(1) var bloom: texture_2d<f32>;
@group(0) @binding(2) var target_sampler: sampler;
@group(0) @binding(3) var<uniform> params: FinalParams;

@fragment
fn fs_main(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let base_color = textureSampleLevel(base, target_sampler, in.uv, 0.0).rgb;
    let bloom_color = textureSampleLevel(bloom, target_sampler, in.uv, 0.0).rgb;
    let hdr = (base_color + bloom_color * params.bloom_mix) * params.exposure;
    return vec4<f32>(hdr / (vec3<f32>(1.0) + hdr), 1.0);
}
"#;

/// Post pass source: the fullscreen vertex stage followed by `fragment`.
fn post(fragment: &str) -> String {
    format!("{FULLSCREEN_VERTEX}\n{fragment}")
}

pub fn high_pass() -> String {
    post(HIGH_PASS_FRAGMENT)
}

pub fn blur() -> String {
    post(BLUR_FRAGMENT)
}

pub fn bloom_composite() -> String {
    post(BLOOM_COMPOSITE_FRAGMENT)
}

pub fn final_composite() -> String {
    post(FINAL_FRAGMENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_shaders_carry_both_stages() {
        for source in [high_pass(), blur(), bloom_composite(), final_composite()] {
            assert!(source.contains("fn vs_fullscreen"));
            assert!(source.contains("fn fs_main"));
        }
    }

    #[test]
    fn scene_shader_entry_points() {
        for entry in ["fn vs_main", "fn fs_mesh", "fn fs_water"] {
            assert!(SCENE_SHADER.contains(entry), "{entry}");
        }
    }
}
