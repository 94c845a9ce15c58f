//! glTF/GLB model bundles with PBR materials
//!
//! Supports glTF 2.0 (.gltf with embedded buffers) and GLB containers:
//! mesh primitives with positions, normals, UVs, materials, embedded
//! textures, and the scene node hierarchy. Animations, skinning and morph
//! targets are not supported.

use crate::loader::LoadError;
use crate::texture::{TexelFormat, TextureAsset, TextureMapping};

/// Well-known node name carrying a model's "usable" material. When a query
/// resolves a model whose scene contains this node, the node's material is
/// returned instead of the raw bundle.
pub const MATERIAL_NODE: &str = "pbr_node";

/// Vertex layout for model primitives
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Alpha blending mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlphaMode {
    Opaque,
    Mask,
    Blend,
}

/// PBR metallic-roughness material parameters
#[derive(Clone, Debug)]
pub struct PbrMaterial {
    pub name: String,
    /// Base color factor (RGBA)
    pub base_color_factor: [f32; 4],
    /// Metallic factor (0.0 = dielectric, 1.0 = metal)
    pub metallic_factor: f32,
    /// Roughness factor (0.0 = smooth, 1.0 = rough)
    pub roughness_factor: f32,
    /// Emissive color factor (RGB)
    pub emissive_factor: [f32; 3],
    pub alpha_mode: AlphaMode,
    /// Alpha cutoff for masked mode
    pub alpha_cutoff: f32,
    pub double_sided: bool,
    /// Index into `ModelAsset::textures` for base color, or None
    pub base_color_texture: Option<usize>,
    /// Index for the combined metallic-roughness texture
    pub metallic_roughness_texture: Option<usize>,
    /// Index for the normal map
    pub normal_texture: Option<usize>,
    /// Index for the emissive texture
    pub emissive_texture: Option<usize>,
}

impl Default for PbrMaterial {
    fn default() -> Self {
        Self {
            name: String::new(),
            base_color_factor: [1.0, 1.0, 1.0, 1.0],
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            emissive_factor: [0.0, 0.0, 0.0],
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
            base_color_texture: None,
            metallic_roughness_texture: None,
            normal_texture: None,
            emissive_texture: None,
        }
    }
}

/// Axis-aligned bounding box
#[derive(Clone, Debug, Default)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Bounds {
    fn from_vertices(vertices: &[ModelVertex]) -> Self {
        if vertices.is_empty() {
            return Self::default();
        }

        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for v in vertices {
            for i in 0..3 {
                min[i] = min[i].min(v.position[i]);
                max[i] = max[i].max(v.position[i]);
            }
        }
        Bounds { min, max }
    }
}

/// A mesh primitive with its material reference
#[derive(Clone, Debug)]
pub struct ModelPrimitive {
    pub vertices: Vec<ModelVertex>,
    /// Triangle indices
    pub indices: Vec<u32>,
    /// Material index (into `ModelAsset::materials`)
    pub material_index: Option<usize>,
    pub bounds: Bounds,
}

/// A mesh containing one or more primitives
#[derive(Clone, Debug)]
pub struct ModelMesh {
    pub name: String,
    pub primitives: Vec<ModelPrimitive>,
}

/// A scene node with transform
#[derive(Clone, Debug)]
pub struct ModelNode {
    pub name: String,
    /// Local transform matrix (column-major)
    pub transform: [[f32; 4]; 4],
    /// Index into `ModelAsset::meshes`, or None
    pub mesh_index: Option<usize>,
    /// Child node indices
    pub children: Vec<usize>,
}

/// Complete decoded model bundle
#[derive(Clone, Debug)]
pub struct ModelAsset {
    pub meshes: Vec<ModelMesh>,
    pub materials: Vec<PbrMaterial>,
    /// Textures embedded in the bundle
    pub textures: Vec<TextureAsset>,
    /// Scene graph nodes
    pub nodes: Vec<ModelNode>,
    /// Root node indices of the default scene
    pub scene_roots: Vec<usize>,
}

impl ModelAsset {
    /// Decode a model from file bytes (GLB container or glTF JSON with
    /// embedded buffers). External .bin/.png references are not resolved.
    pub fn from_slice(data: &[u8], path: &str) -> Result<Self, LoadError> {
        let (document, buffers, images) =
            gltf::import_slice(data).map_err(|e| LoadError::ModelParse {
                path: path.to_string(),
                source: e,
            })?;

        let textures = convert_images(&images);
        let materials = convert_materials(&document);
        let meshes = convert_meshes(&document, &buffers)?;
        let nodes = convert_nodes(&document);

        let scene_roots = document
            .default_scene()
            .map(|s| s.nodes().map(|n| n.index()).collect())
            .unwrap_or_default();

        Ok(Self {
            meshes,
            materials,
            textures,
            nodes,
            scene_roots,
        })
    }

    /// Find a scene node by name
    pub fn node(&self, name: &str) -> Option<&ModelNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Material referenced by the named node's mesh, if any. This is the
    /// extraction point queries use to pull a material out of a bundle.
    pub fn material_at_node(&self, name: &str) -> Option<&PbrMaterial> {
        let node = self.node(name)?;
        let mesh = self.meshes.get(node.mesh_index?)?;
        let index = mesh.primitives.first()?.material_index?;
        self.materials.get(index)
    }
}

fn convert_images(images: &[gltf::image::Data]) -> Vec<TextureAsset> {
    let mut textures = Vec::with_capacity(images.len());

    for image in images {
        let data = match image.format {
            gltf::image::Format::R8G8B8A8 => image.pixels.clone(),
            gltf::image::Format::R8G8B8 => {
                let mut rgba = Vec::with_capacity(image.pixels.len() / 3 * 4);
                for chunk in image.pixels.chunks(3) {
                    rgba.extend_from_slice(chunk);
                    rgba.push(255);
                }
                rgba
            }
            gltf::image::Format::R8 => {
                let mut rgba = Vec::with_capacity(image.pixels.len() * 4);
                for &v in &image.pixels {
                    rgba.extend_from_slice(&[v, v, v, 255]);
                }
                rgba
            }
            gltf::image::Format::R8G8 => {
                let mut rgba = Vec::with_capacity(image.pixels.len() * 2);
                for chunk in image.pixels.chunks(2) {
                    rgba.extend_from_slice(&[chunk[0], chunk[1], 0, 255]);
                }
                rgba
            }
            other => {
                log::warn!("unsupported embedded texture format {:?}, using placeholder", other);
                vec![128u8; (image.width * image.height) as usize * 4]
            }
        };

        textures.push(TextureAsset {
            data,
            width: image.width,
            height: image.height,
            bytes_per_row: image.width * 4,
            format: TexelFormat::Rgba8,
            srgb: true,
            mapping: TextureMapping::Uv,
            flip_y: false,
        });
    }

    textures
}

fn convert_materials(document: &gltf::Document) -> Vec<PbrMaterial> {
    let mut materials = Vec::new();

    for mat in document.materials() {
        let pbr = mat.pbr_metallic_roughness();

        let alpha_mode = match mat.alpha_mode() {
            gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
            gltf::material::AlphaMode::Mask => AlphaMode::Mask,
            gltf::material::AlphaMode::Blend => AlphaMode::Blend,
        };

        materials.push(PbrMaterial {
            name: mat.name().unwrap_or("").to_string(),
            base_color_factor: pbr.base_color_factor(),
            metallic_factor: pbr.metallic_factor(),
            roughness_factor: pbr.roughness_factor(),
            emissive_factor: mat.emissive_factor(),
            alpha_mode,
            alpha_cutoff: mat.alpha_cutoff().unwrap_or(0.5),
            double_sided: mat.double_sided(),
            base_color_texture: pbr.base_color_texture().map(|t| t.texture().index()),
            metallic_roughness_texture: pbr
                .metallic_roughness_texture()
                .map(|t| t.texture().index()),
            normal_texture: mat.normal_texture().map(|t| t.texture().index()),
            emissive_texture: mat.emissive_texture().map(|t| t.texture().index()),
        });
    }

    materials
}

fn convert_meshes(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
) -> Result<Vec<ModelMesh>, LoadError> {
    let mut meshes = Vec::new();

    for mesh in document.meshes() {
        let mut primitives = Vec::new();

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<[f32; 3]> = match reader.read_positions() {
                Some(positions) => positions.collect(),
                None => {
                    return Err(LoadError::ModelData {
                        message: "mesh primitive missing positions".to_string(),
                    })
                }
            };

            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|n| n.collect())
                .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);

            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|t| t.into_f32().collect())
                .unwrap_or_else(|| vec![[0.0, 0.0]; positions.len()]);

            let indices: Vec<u32> = reader
                .read_indices()
                .map(|i| i.into_u32().collect())
                .unwrap_or_else(|| (0..positions.len() as u32).collect());

            let vertices: Vec<ModelVertex> = (0..positions.len())
                .map(|i| ModelVertex {
                    position: positions[i],
                    normal: normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                    uv: uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                })
                .collect();

            let bounds = Bounds::from_vertices(&vertices);

            primitives.push(ModelPrimitive {
                vertices,
                indices,
                material_index: primitive.material().index(),
                bounds,
            });
        }

        meshes.push(ModelMesh {
            name: mesh.name().unwrap_or("").to_string(),
            primitives,
        });
    }

    Ok(meshes)
}

fn convert_nodes(document: &gltf::Document) -> Vec<ModelNode> {
    document
        .nodes()
        .map(|node| ModelNode {
            name: node.name().unwrap_or("").to_string(),
            transform: node.transform().matrix(),
            mesh_index: node.mesh().map(|m| m.index()),
            children: node.children().map(|c| c.index()).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smallest valid GLB: a header plus one JSON chunk with just the
    /// asset version.
    fn minimal_glb() -> Vec<u8> {
        let mut json = br#"{"asset":{"version":"2.0"}}"#.to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let mut glb = Vec::new();
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&((12 + 8 + json.len()) as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json);
        glb
    }

    fn sample_model() -> ModelAsset {
        ModelAsset {
            meshes: vec![ModelMesh {
                name: "plinth".to_string(),
                primitives: vec![ModelPrimitive {
                    vertices: Vec::new(),
                    indices: Vec::new(),
                    material_index: Some(0),
                    bounds: Bounds::default(),
                }],
            }],
            materials: vec![PbrMaterial {
                name: "brushed_steel".to_string(),
                ..PbrMaterial::default()
            }],
            textures: Vec::new(),
            nodes: vec![
                ModelNode {
                    name: "root".to_string(),
                    transform: Default::default(),
                    mesh_index: None,
                    children: vec![1],
                },
                ModelNode {
                    name: MATERIAL_NODE.to_string(),
                    transform: Default::default(),
                    mesh_index: Some(0),
                    children: Vec::new(),
                },
            ],
            scene_roots: vec![0],
        }
    }

    #[test]
    fn test_decode_minimal_glb() {
        let model = ModelAsset::from_slice(&minimal_glb(), "empty.glb").unwrap();
        assert!(model.meshes.is_empty());
        assert!(model.nodes.is_empty());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = ModelAsset::from_slice(b"definitely not gltf", "bad.glb");
        assert!(matches!(result, Err(LoadError::ModelParse { .. })));
    }

    #[test]
    fn test_material_at_node() {
        let model = sample_model();
        let material = model.material_at_node(MATERIAL_NODE).unwrap();
        assert_eq!(material.name, "brushed_steel");
        assert!(model.material_at_node("root").is_none());
        assert!(model.material_at_node("missing").is_none());
    }

    #[test]
    fn test_bounds_from_vertices() {
        let vertices = vec![
            ModelVertex {
                position: [-1.0, 0.0, 2.0],
                ..Default::default()
            },
            ModelVertex {
                position: [3.0, -2.0, 0.5],
                ..Default::default()
            },
        ];
        let bounds = Bounds::from_vertices(&vertices);
        assert_eq!(bounds.min, [-1.0, -2.0, 0.5]);
        assert_eq!(bounds.max, [3.0, 0.0, 2.0]);
    }
}
