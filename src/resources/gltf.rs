//! glTF model loading.
//!
//! The loader fetches the model file, every external buffer and every image,
//! then flattens the default scene into a list of meshes. Node transforms are
//! baked into the vertices so the whole model can be drawn with a single
//! instance transform. The result is plain CPU data ([`ModelData`]) which the
//! frame loop uploads to the GPU once it arrives.

use anyhow::{Context, bail, ensure};
use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Vector3, Vector4};
use image::RgbaImage;

use crate::{
    data_structures::model::ModelVertex,
    resources::{AssetLocation, load_binary, texture::decode_image},
};

/// A decoded model, ready for upload.
#[derive(Debug, Default)]
pub struct ModelData {
    pub name: String,
    pub meshes: Vec<MeshData>,
    pub materials: Vec<MaterialData>,
}

#[derive(Debug, Default)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

/// How the alpha channel of a material's base colour is used.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum AlphaMode {
    /// Alpha is ignored.
    #[default]
    Opaque,
    /// Fragments with alpha below `cutoff` are discarded, the rest are opaque.
    Mask { cutoff: f32 },
    /// Alpha blended over what is behind.
    Blend,
}

impl From<::gltf::material::AlphaMode> for AlphaMode {
    fn from(mode: ::gltf::material::AlphaMode) -> Self {
        match mode {
            ::gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
            ::gltf::material::AlphaMode::Mask => AlphaMode::Mask {
                cutoff: DEFAULT_ALPHA_CUTOFF,
            },
            ::gltf::material::AlphaMode::Blend => AlphaMode::Blend,
        }
    }
}

const DEFAULT_ALPHA_CUTOFF: f32 = 0.5;

#[derive(Clone, Debug)]
pub struct MaterialData {
    pub name: String,
    /// Linear RGBA.
    pub base_colour: [f32; 4],
    pub base_colour_texture: Option<RgbaImage>,
    pub alpha_mode: AlphaMode,
    /// Drawn without back-face culling.
    pub double_sided: bool,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            name: "default material".into(),
            base_colour: [1.0; 4],
            base_colour_texture: None,
            alpha_mode: AlphaMode::Opaque,
            double_sided: false,
        }
    }
}

impl MaterialData {
    /// The base colour as sRGB bytes.
    pub fn base_colour_rgba8(&self) -> [u8; 4] {
        let [r, g, b, a] = self.base_colour;
        let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [
            to_u8(linear_to_srgb(r)),
            to_u8(linear_to_srgb(g)),
            to_u8(linear_to_srgb(b)),
            to_u8(a),
        ]
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

pub async fn load_model_gltf(location: &str) -> anyhow::Result<ModelData> {
    let location = AssetLocation::parse(location)?;
    let bytes = load_binary(&location).await?;
    model_from_bytes(&bytes, &location).await
}

/// Parse a `.gltf` or `.glb` file. External buffers and images are resolved
/// relative to `location`.
pub async fn model_from_bytes(bytes: &[u8], location: &AssetLocation) -> anyhow::Result<ModelData> {
    let gltf = ::gltf::Gltf::from_slice(bytes)
        .with_context(|| format!("{} is not a valid glTF file", location))?;

    let buffers = load_buffers(&gltf, location).await?;
    let images = load_images(&gltf, location, &buffers).await;

    let materials = gltf
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            let base_colour_texture = pbr.base_color_texture().and_then(|info| {
                images
                    .get(info.texture().source().index())
                    .cloned()
                    .flatten()
            });
            let alpha_mode = match AlphaMode::from(material.alpha_mode()) {
                AlphaMode::Mask { .. } => AlphaMode::Mask {
                    cutoff: material.alpha_cutoff().unwrap_or(DEFAULT_ALPHA_CUTOFF),
                },
                mode => mode,
            };
            MaterialData {
                name: material.name().unwrap_or("material").to_string(),
                base_colour: pbr.base_color_factor(),
                base_colour_texture,
                alpha_mode,
                double_sided: material.double_sided(),
            }
        })
        .collect();

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .context("The glTF file contains no scene")?;
    let mut meshes = Vec::new();
    for node in scene.nodes() {
        collect_meshes(&node, Matrix4::identity(), &buffers, &mut meshes);
    }
    ensure!(!meshes.is_empty(), "{} contains no triangle meshes", location);

    let vertex_count: usize = meshes.iter().map(|m| m.vertices.len()).sum();
    log::info!(
        "Loaded {}: {} meshes, {} vertices",
        location,
        meshes.len(),
        vertex_count
    );

    Ok(ModelData {
        name: location.to_string(),
        meshes,
        materials,
    })
}

async fn load_buffers(
    gltf: &::gltf::Gltf,
    location: &AssetLocation,
) -> anyhow::Result<Vec<Vec<u8>>> {
    let buffers = gltf.buffers().map(|buffer| async move {
        let data = match buffer.source() {
            ::gltf::buffer::Source::Bin => match gltf.blob.as_deref() {
                Some(blob) => blob.to_vec(),
                None => bail!("Buffer {} refers to a missing GLB chunk", buffer.index()),
            },
            ::gltf::buffer::Source::Uri(uri) => load_binary(&location.join(uri)?).await?,
        };
        ensure!(
            data.len() >= buffer.length(),
            "Buffer {} is {} bytes, expected {}",
            buffer.index(),
            data.len(),
            buffer.length()
        );
        Ok::<_, anyhow::Error>(data)
    });
    futures::future::try_join_all(buffers).await
}

/// Images that fail to load are logged and left out; materials using them
/// fall back to their base colour.
async fn load_images(
    gltf: &::gltf::Gltf,
    location: &AssetLocation,
    buffers: &[Vec<u8>],
) -> Vec<Option<RgbaImage>> {
    let images = gltf.images().map(|image| async move {
        let decoded = match image.source() {
            ::gltf::image::Source::View { view, .. } => {
                let start = view.offset();
                let end = start + view.length();
                buffers
                    .get(view.buffer().index())
                    .and_then(|buffer| buffer.get(start..end))
                    .context("Image view is out of bounds")
                    .and_then(decode_image)
            }
            ::gltf::image::Source::Uri { uri, .. } => match location.join(uri) {
                Ok(image_location) => match load_binary(&image_location).await {
                    Ok(data) => decode_image(&data),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            },
        };
        match decoded {
            Ok(img) => Some(img),
            Err(e) => {
                log::warn!("Skipping image {} of {}: {:#}", image.index(), location, e);
                None
            }
        }
    });
    futures::future::join_all(images).await
}

fn collect_meshes(
    node: &::gltf::Node,
    parent: Matrix4<f32>,
    buffers: &[Vec<u8>],
    out: &mut Vec<MeshData>,
) {
    let world = parent * Matrix4::from(node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != ::gltf::mesh::Mode::Triangles {
                log::debug!(
                    "Skipping primitive {} of mesh {:?}: {:?} is not supported",
                    primitive.index(),
                    mesh.name(),
                    primitive.mode()
                );
                continue;
            }
            let name = mesh.name().unwrap_or("unknown_mesh");
            if let Some(data) = primitive_data(name, &primitive, world, buffers) {
                out.push(data);
            }
        }
    }
    for child in node.children() {
        collect_meshes(&child, world, buffers, out);
    }
}

fn primitive_data(
    name: &str,
    primitive: &::gltf::Primitive,
    world: Matrix4<f32>,
    buffers: &[Vec<u8>],
) -> Option<MeshData> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let mut vertices: Vec<ModelVertex> = reader
        .read_positions()?
        .map(|position| {
            let p = world * Vector4::new(position[0], position[1], position[2], 1.0);
            ModelVertex {
                position: [p.x, p.y, p.z],
                ..Default::default()
            }
        })
        .collect();

    if let Some(tex_coords) = reader.read_tex_coords(0) {
        vertices
            .iter_mut()
            .zip(tex_coords.into_f32())
            .for_each(|(vertex, uv)| vertex.tex_coords = uv);
    }

    let mut indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    indices.truncate(indices.len() - indices.len() % 3);
    if indices.iter().any(|&i| i as usize >= vertices.len()) {
        log::warn!("Mesh {} references vertices that don't exist", name);
        return None;
    }

    let upper = Matrix3::from_cols(
        world.x.truncate(),
        world.y.truncate(),
        world.z.truncate(),
    );
    // Mirroring transforms flip the winding order
    if upper.determinant() < 0.0 {
        indices.chunks_exact_mut(3).for_each(|tri| tri.swap(1, 2));
    }

    match reader.read_normals() {
        Some(normals) => {
            let normal_matrix = upper.invert().map(|m| m.transpose()).unwrap_or(upper);
            vertices
                .iter_mut()
                .zip(normals)
                .for_each(|(vertex, normal)| {
                    let n = normal_matrix * Vector3::from(normal);
                    vertex.normal = safe_normalize(n).into();
                });
        }
        None => compute_normals(&mut vertices, &indices),
    }

    Some(MeshData {
        name: name.to_string(),
        vertices,
        indices,
        material: primitive.material().index(),
    })
}

/// Smooth normals from the (already transformed) triangle faces.
fn compute_normals(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut sums = vec![Vector3::new(0.0f32, 0.0, 0.0); vertices.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let p0 = Vector3::from(vertices[a].position);
        let p1 = Vector3::from(vertices[b].position);
        let p2 = Vector3::from(vertices[c].position);
        let face = (p1 - p0).cross(p2 - p0);
        sums[a] += face;
        sums[b] += face;
        sums[c] += face;
    }
    for (vertex, sum) in vertices.iter_mut().zip(sums) {
        vertex.normal = safe_normalize(sum).into();
    }
}

fn safe_normalize(v: Vector3<f32>) -> Vector3<f32> {
    if v.magnitude2() > 0.0 {
        v.normalize()
    } else {
        Vector3::unit_y()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: &str = r#"{"name": "red", "pbrMetallicRoughness": {"baseColorFactor": [1.0, 0.0, 0.0, 1.0]}}"#;

    fn triangle_glb() -> Vec<u8> {
        triangle_glb_with_material(RED)
    }

    /// One triangle in the xy plane, moved one unit along x by its node.
    fn triangle_glb_with_material(material: &str) -> Vec<u8> {
        let json = r#"{
            "asset": {"version": "2.0"},
            "scene": 0,
            "scenes": [{"nodes": [0]}],
            "nodes": [{"mesh": 0, "translation": [1.0, 0.0, 0.0]}],
            "meshes": [{"name": "tri", "primitives": [{"attributes": {"POSITION": 0}, "indices": 1, "material": 0}]}],
            "materials": [MATERIAL],
            "buffers": [{"byteLength": 44}],
            "bufferViews": [
                {"buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962},
                {"buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963}
            ],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
                {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
            ]
        }"#;

        let mut bin: Vec<u8> = Vec::new();
        for p in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            bin.extend_from_slice(bytemuck::cast_slice(&p));
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        bin.extend_from_slice(&[0, 0]);

        let mut json = json.replace("MATERIAL", material).into_bytes();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::new();
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(&bin);
        glb
    }

    fn location() -> AssetLocation {
        AssetLocation::parse("https://example.com/tri.glb").unwrap()
    }

    #[test]
    fn loads_triangle_with_baked_transform() {
        let model =
            futures::executor::block_on(model_from_bytes(&triangle_glb(), &location())).unwrap();
        assert_eq!(model.meshes.len(), 1);
        let mesh = &model.meshes[0];
        assert_eq!(mesh.name, "tri");
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.material, Some(0));
        let positions: Vec<[f32; 3]> = mesh.vertices.iter().map(|v| v.position).collect();
        assert_eq!(
            positions,
            vec![[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [1.0, 1.0, 0.0]]
        );
        // no normals in the file: computed from the counter clockwise face
        for vertex in &mesh.vertices {
            assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn reads_material_base_colour() {
        let model =
            futures::executor::block_on(model_from_bytes(&triangle_glb(), &location())).unwrap();
        assert_eq!(model.materials.len(), 1);
        let material = &model.materials[0];
        assert_eq!(material.name, "red");
        assert!(material.base_colour_texture.is_none());
        assert_eq!(material.base_colour_rgba8(), [255, 0, 0, 255]);
        assert_eq!(material.alpha_mode, AlphaMode::Opaque);
        assert!(!material.double_sided);
    }

    fn load_material(material: &str) -> MaterialData {
        let glb = triangle_glb_with_material(material);
        let mut model = futures::executor::block_on(model_from_bytes(&glb, &location())).unwrap();
        model.materials.remove(0)
    }

    #[test]
    fn reads_double_sided_masked_material() {
        let material = load_material(
            r#"{"name": "decal", "doubleSided": true, "alphaMode": "MASK", "alphaCutoff": 0.25}"#,
        );
        assert!(material.double_sided);
        assert_eq!(material.alpha_mode, AlphaMode::Mask { cutoff: 0.25 });
    }

    #[test]
    fn mask_without_cutoff_uses_one_half() {
        let material = load_material(r#"{"name": "decal", "alphaMode": "MASK"}"#);
        assert_eq!(material.alpha_mode, AlphaMode::Mask { cutoff: 0.5 });
        assert!(!material.double_sided);
    }

    #[test]
    fn reads_blended_material() {
        let material = load_material(r#"{"name": "glass", "alphaMode": "BLEND"}"#);
        assert_eq!(material.alpha_mode, AlphaMode::Blend);
    }

    #[test]
    fn rejects_garbage() {
        let result = futures::executor::block_on(model_from_bytes(b"{ not gltf", &location()));
        assert!(result.is_err());
    }

    #[test]
    fn default_material_is_white() {
        assert_eq!(MaterialData::default().base_colour_rgba8(), [255; 4]);
    }
}
