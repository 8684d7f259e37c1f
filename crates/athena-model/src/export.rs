use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet, HashMap},
    fs,
    path::Path,
};

use anyhow::{Context, Result};
use athena_transform::Transform;
use bytemuck::Pod;
use glam::{Mat4, Quat, Vec2, Vec3};
use serde_json::{json, Map, Value};

use crate::{
    animation::{Action, BonePose, Channel, Interpolate, Interpolation},
    material::{AlphaMode, Material},
    mesh::Mesh,
    scene::{ObjectData, Scene},
    skeleton::Armature,
};

const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;
const UNSIGNED_SHORT: u32 = 5123;

const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;

const EMISSIVE_STRENGTH: &str = "KHR_materials_emissive_strength";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationMode {
    /// The active action of every armature.
    #[default]
    ActiveActions,
    /// Every action in the scene that animates bones of an armature.
    Actions,
    /// One animation per NLA track.
    NlaTracks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Only export selected objects.
    pub use_selection: bool,
    /// Bake object transforms into the vertices of unskinned leaf meshes.
    pub apply_transforms: bool,
    pub materials: bool,
    pub animations: bool,
    pub skins: bool,
    pub animation_mode: AnimationMode,
    /// Resample every animated property once per frame instead of exporting the keys.
    pub force_sampling: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            use_selection: false,
            apply_transforms: true,
            materials: true,
            animations: true,
            skins: true,
            animation_mode: AnimationMode::ActiveActions,
            force_sampling: false,
        }
    }
}

/// Writes `scene` to `path` as binary glTF, creating parent directories as needed.
pub fn write_glb(scene: &Scene, options: &ExportOptions, path: &Path) -> Result<()> {
    athena_profiling::profile_function!();

    let glb = export_glb(scene, options)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output directory: {}", parent.display()))?;
    }
    fs::write(path, &glb).with_context(|| format!("write glb: {}", path.display()))?;

    log::info!("Exported {} ({} bytes)", path.display(), glb.len());
    Ok(())
}

pub fn export_glb(scene: &Scene, options: &ExportOptions) -> Result<Vec<u8>> {
    athena_profiling::profile_function!();

    let mut exporter = Exporter::new(scene, options);
    exporter.export_objects();
    if options.skins {
        exporter.export_skins();
    }
    if options.animations {
        exporter.export_animations();
    }

    let (json, bin) = exporter.finish();
    let mut json = serde_json::to_vec(&json).context("serialize glTF json")?;
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let glb = gltf::binary::Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length: 0,
        },
        json: Cow::Owned(json),
        bin: if bin.is_empty() {
            None
        } else {
            Some(Cow::Owned(bin))
        },
    };

    let mut bytes = Vec::new();
    glb.to_writer(&mut bytes).context("write glb container")?;
    Ok(bytes)
}

/// Binary chunk plus the buffer views and accessors describing it.
#[derive(Default)]
struct BinaryBuilder {
    data: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl BinaryBuilder {
    fn align(&mut self) {
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
    }

    fn push_view(&mut self, bytes: &[u8], target: Option<u32>) -> usize {
        self.align();
        let mut view = json!({
            "buffer": 0,
            "byteOffset": self.data.len(),
            "byteLength": bytes.len(),
        });
        if let Some(target) = target {
            view["target"] = json!(target);
        }
        self.data.extend_from_slice(bytes);
        self.views.push(view);
        self.views.len() - 1
    }

    fn push_accessor<T: Pod>(
        &mut self,
        values: &[T],
        component_type: u32,
        kind: &str,
        target: Option<u32>,
    ) -> usize {
        let view = self.push_view(bytemuck::cast_slice(values), target);
        self.accessors.push(json!({
            "bufferView": view,
            "componentType": component_type,
            "count": values.len(),
            "type": kind,
        }));
        self.accessors.len() - 1
    }

    fn set_bounds(&mut self, accessor: usize, min: &[f32], max: &[f32]) {
        self.accessors[accessor]["min"] = json!(min);
        self.accessors[accessor]["max"] = json!(max);
    }

    fn push_positions(&mut self, positions: &[Vec3]) -> usize {
        let accessor = self.push_accessor(positions, FLOAT, "VEC3", Some(ARRAY_BUFFER));
        let min = positions.iter().copied().reduce(Vec3::min).unwrap_or(Vec3::ZERO);
        let max = positions.iter().copied().reduce(Vec3::max).unwrap_or(Vec3::ZERO);
        self.set_bounds(accessor, &min.to_array(), &max.to_array());
        accessor
    }

    fn push_times(&mut self, times: &[f32]) -> usize {
        let accessor = self.push_accessor(times, FLOAT, "SCALAR", None);
        let min = times.iter().copied().fold(f32::INFINITY, f32::min);
        let max = times.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        self.set_bounds(accessor, &[min], &[max]);
        accessor
    }
}

struct Exporter<'a> {
    scene: &'a Scene,
    options: &'a ExportOptions,
    bin: BinaryBuilder,
    nodes: Vec<Value>,
    roots: Vec<usize>,
    meshes: Vec<Value>,
    materials: Vec<Material>,
    material_values: Vec<Value>,
    images: Vec<Value>,
    textures: Vec<Value>,
    texture_lookup: HashMap<usize, usize>,
    skins: Vec<Value>,
    animations: Vec<Value>,
    extensions_used: BTreeSet<&'static str>,
    object_nodes: HashMap<usize, usize>,
    bone_nodes: HashMap<usize, Vec<usize>>,
}

impl<'a> Exporter<'a> {
    fn new(scene: &'a Scene, options: &'a ExportOptions) -> Self {
        Self {
            scene,
            options,
            bin: BinaryBuilder::default(),
            nodes: Vec::new(),
            roots: Vec::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
            material_values: Vec::new(),
            images: Vec::new(),
            textures: Vec::new(),
            texture_lookup: HashMap::new(),
            skins: Vec::new(),
            animations: Vec::new(),
            extensions_used: BTreeSet::new(),
            object_nodes: HashMap::new(),
            bone_nodes: HashMap::new(),
        }
    }

    fn is_included(&self, object: usize) -> bool {
        !self.options.use_selection || self.scene.objects[object].selected
    }

    fn included_parent(&self, object: usize) -> Option<usize> {
        let mut parent = self.scene.objects[object].parent;
        while let Some(p) = parent {
            if self.is_included(p) {
                return Some(p);
            }
            parent = self.scene.objects[p].parent;
        }
        None
    }

    fn add_child(&mut self, parent: usize, child: usize) {
        match self.nodes[parent]["children"].as_array_mut() {
            Some(children) => children.push(json!(child)),
            None => self.nodes[parent]["children"] = json!([child]),
        }
    }

    fn push_node(&mut self, name: &str, transform: &Transform, parent: Option<usize>) -> usize {
        let mut node = json!({ "name": name });
        if transform.get_translation() != Vec3::ZERO {
            node["translation"] = json!(transform.get_translation().to_array());
        }
        if transform.get_rotation() != Quat::IDENTITY {
            node["rotation"] = json!(transform.get_rotation().normalize().to_array());
        }
        if transform.get_scale() != Vec3::ONE {
            node["scale"] = json!(transform.get_scale().to_array());
        }

        self.nodes.push(node);
        let index = self.nodes.len() - 1;
        match parent {
            Some(parent) => self.add_child(parent, index),
            None => self.roots.push(index),
        }
        index
    }

    fn export_objects(&mut self) {
        athena_profiling::profile_function!();

        let scene = self.scene;
        for index in 0..scene.objects.len() {
            if !self.is_included(index) {
                continue;
            }

            let object = &scene.objects[index];
            let parent = self.included_parent(index);
            let local = match (parent, object.parent) {
                (Some(p), Some(direct)) if p == direct => object.transform.get_matrix(),
                (Some(p), _) => scene.world_matrix(p).inverse() * scene.world_matrix(index),
                (None, _) => scene.world_matrix(index),
            };
            let has_children = scene.children(index).any(|c| self.is_included(c));
            let parent_node = parent.and_then(|p| self.object_nodes.get(&p).copied());

            match &object.data {
                ObjectData::Mesh { mesh, armature } => {
                    let skinned = self.options.skins
                        && armature.is_some_and(|a| self.is_included(a))
                        && mesh.is_skinned();
                    let (mesh, transform) =
                        if self.options.apply_transforms && !skinned && !has_children {
                            let mut baked = mesh.clone();
                            baked.apply_matrix(local);
                            (Cow::Owned(baked), Transform::IDENTITY)
                        } else {
                            (Cow::Borrowed(mesh), Transform::from(local))
                        };

                    let node = self.push_node(&object.name, &transform, parent_node);
                    if let Some(mesh_index) = self.export_mesh(&mesh, skinned) {
                        self.nodes[node]["mesh"] = json!(mesh_index);
                    }
                    self.object_nodes.insert(index, node);
                }
                ObjectData::Armature { armature, .. } => {
                    let node = self.push_node(&object.name, &Transform::from(local), parent_node);
                    let mut bone_nodes = Vec::with_capacity(armature.bones.len());
                    for bone in &armature.bones {
                        bone_nodes.push(self.push_node(&bone.name, &bone.rest, None));
                    }
                    // Bone nodes were pushed as roots; hook them up to the hierarchy instead.
                    self.roots.retain(|root| !bone_nodes.contains(root));
                    for (i, bone) in armature.bones.iter().enumerate() {
                        let parent = match bone.parent {
                            Some(p) => bone_nodes[p],
                            None => node,
                        };
                        self.add_child(parent, bone_nodes[i]);
                    }
                    self.object_nodes.insert(index, node);
                    self.bone_nodes.insert(index, bone_nodes);
                }
                ObjectData::Empty => {
                    let node = self.push_node(&object.name, &Transform::from(local), parent_node);
                    self.object_nodes.insert(index, node);
                }
            }
        }
    }

    fn export_mesh(&mut self, mesh: &Mesh, skinned: bool) -> Option<usize> {
        athena_profiling::profile_function!();

        if mesh.faces().is_empty() {
            return None;
        }

        let mut attributes = Map::new();
        attributes.insert(
            "POSITION".to_owned(),
            json!(self.bin.push_positions(&mesh.vertex_positions)),
        );
        if mesh.has_normals() {
            let accessor =
                self.bin
                    .push_accessor(&mesh.vertex_normals, FLOAT, "VEC3", Some(ARRAY_BUFFER));
            attributes.insert("NORMAL".to_owned(), json!(accessor));
        }
        if mesh.has_tex_coords() {
            let tex_coords: &[Vec2] = &mesh.vertex_tex_coords;
            let accessor = self
                .bin
                .push_accessor(tex_coords, FLOAT, "VEC2", Some(ARRAY_BUFFER));
            attributes.insert("TEXCOORD_0".to_owned(), json!(accessor));
        }
        if skinned {
            let joints = self.bin.push_accessor(
                &mesh.vertex_joints,
                UNSIGNED_SHORT,
                "VEC4",
                Some(ARRAY_BUFFER),
            );
            attributes.insert("JOINTS_0".to_owned(), json!(joints));
            let weights =
                self.bin
                    .push_accessor(&mesh.vertex_weights, FLOAT, "VEC4", Some(ARRAY_BUFFER));
            attributes.insert("WEIGHTS_0".to_owned(), json!(weights));
        }

        let mut indices_by_material: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for face in mesh.faces() {
            let indices = indices_by_material.entry(face.material_index).or_default();
            for triangle in mesh.triangulate(face) {
                indices.extend_from_slice(&triangle);
            }
        }

        let mut primitives = Vec::new();
        for (material_index, indices) in indices_by_material {
            let accessor = self.bin.push_accessor(
                &indices,
                UNSIGNED_INT,
                "SCALAR",
                Some(ELEMENT_ARRAY_BUFFER),
            );
            let mut primitive = json!({
                "attributes": attributes.clone(),
                "indices": accessor,
                "mode": 4,
            });
            if self.options.materials {
                if let Some(material) = mesh.materials.get(material_index as usize) {
                    primitive["material"] = json!(self.export_material(material));
                }
            }
            primitives.push(primitive);
        }

        self.meshes.push(json!({
            "name": mesh.name,
            "primitives": primitives,
        }));
        Some(self.meshes.len() - 1)
    }

    fn export_texture(&mut self, image: usize) -> Option<usize> {
        if let Some(&texture) = self.texture_lookup.get(&image) {
            return Some(texture);
        }

        let source = self.scene.images.get(image)?;
        let view = self.bin.push_view(&source.data, None);
        self.images.push(json!({
            "name": source.name,
            "mimeType": source.mime_type,
            "bufferView": view,
        }));
        self.textures.push(json!({ "source": self.images.len() - 1 }));

        let texture = self.textures.len() - 1;
        self.texture_lookup.insert(image, texture);
        Some(texture)
    }

    fn export_material(&mut self, material: &Material) -> usize {
        if let Some(index) = self.materials.iter().position(|m| m == material) {
            return index;
        }

        let mut pbr = json!({
            "baseColorFactor": material.base_color.to_array(),
            "metallicFactor": material.metallic,
            "roughnessFactor": material.roughness,
        });
        if let Some(texture) = material.base_color_image.and_then(|i| self.export_texture(i)) {
            pbr["baseColorTexture"] = json!({ "index": texture });
        }
        if let Some(texture) = material
            .metallic_roughness_image
            .and_then(|i| self.export_texture(i))
        {
            pbr["metallicRoughnessTexture"] = json!({ "index": texture });
        }

        let mut value = json!({
            "name": material.name,
            "pbrMetallicRoughness": pbr,
        });
        if let Some(texture) = material.normal_image.and_then(|i| self.export_texture(i)) {
            value["normalTexture"] = json!({ "index": texture, "scale": material.normal_scale });
        }
        if let Some(texture) = material.emission_image.and_then(|i| self.export_texture(i)) {
            value["emissiveTexture"] = json!({ "index": texture });
        }
        if material.is_emissive() {
            // Core glTF clamps the emissive factor to 1, stronger emission needs the extension.
            if material.emission_strength > 1.0 {
                value["emissiveFactor"] = json!(material.emission.to_array());
                let mut extensions = Map::new();
                extensions.insert(
                    EMISSIVE_STRENGTH.to_owned(),
                    json!({ "emissiveStrength": material.emission_strength }),
                );
                value["extensions"] = Value::Object(extensions);
                self.extensions_used.insert(EMISSIVE_STRENGTH);
            } else {
                value["emissiveFactor"] =
                    json!((material.emission * material.emission_strength).to_array());
            }
        }
        match material.alpha_mode {
            AlphaMode::Opaque => {}
            AlphaMode::Mask => {
                value["alphaMode"] = json!("MASK");
                value["alphaCutoff"] = json!(material.alpha_cutoff);
            }
            AlphaMode::Blend => value["alphaMode"] = json!("BLEND"),
        }
        if material.double_sided {
            value["doubleSided"] = json!(true);
        }

        self.materials.push(material.clone());
        self.material_values.push(value);
        self.materials.len() - 1
    }

    fn export_skins(&mut self) {
        let scene = self.scene;
        for (index, object) in scene.objects.iter().enumerate() {
            let ObjectData::Mesh {
                armature: Some(armature_object),
                mesh,
            } = &object.data
            else {
                continue;
            };
            let (Some(&mesh_node), Some(bone_nodes)) = (
                self.object_nodes.get(&index),
                self.bone_nodes.get(armature_object),
            ) else {
                continue;
            };
            let Some(armature) = scene.objects[*armature_object].armature() else {
                continue;
            };
            if !mesh.is_skinned() || bone_nodes.is_empty() {
                continue;
            }

            let skin = match self
                .skins
                .iter()
                .position(|skin| skin["joints"] == json!(bone_nodes))
            {
                Some(skin) => skin,
                None => {
                    let matrices: Vec<Mat4> = (0..armature.bones.len())
                        .map(|bone| armature.inverse_bind_matrix(bone))
                        .collect();
                    let accessor = self.bin.push_accessor(&matrices, FLOAT, "MAT4", None);
                    let skeleton = armature
                        .roots()
                        .next()
                        .map_or(bone_nodes[0], |root| bone_nodes[root]);
                    self.skins.push(json!({
                        "name": scene.objects[*armature_object].name,
                        "joints": bone_nodes,
                        "inverseBindMatrices": accessor,
                        "skeleton": skeleton,
                    }));
                    self.skins.len() - 1
                }
            };
            self.nodes[mesh_node]["skin"] = json!(skin);
        }
    }

    fn export_animations(&mut self) {
        athena_profiling::profile_function!();

        let scene = self.scene;
        let mut armature_objects: Vec<usize> = self.bone_nodes.keys().copied().collect();
        armature_objects.sort_unstable();

        for object_index in armature_objects {
            let object = &scene.objects[object_index];
            let (Some(armature), Some(animation)) = (object.armature(), object.animation()) else {
                continue;
            };

            let clips: Vec<(String, Cow<Action>)> = match self.options.animation_mode {
                AnimationMode::ActiveActions => animation
                    .action
                    .and_then(|id| scene.action(id))
                    .map(|action| (action.name.clone(), Cow::Borrowed(action)))
                    .into_iter()
                    .collect(),
                AnimationMode::Actions => scene
                    .actions()
                    .filter(|(_, action)| {
                        action
                            .bones()
                            .iter()
                            .any(|bone| armature.find_bone(bone).is_some())
                    })
                    .map(|(_, action)| (action.name.clone(), Cow::Borrowed(action)))
                    .collect(),
                AnimationMode::NlaTracks => animation
                    .nla_tracks
                    .iter()
                    .map(|track| {
                        let mut combined = Action::new(&track.name);
                        for strip in &track.strips {
                            if let Some(action) = scene.action(strip.action) {
                                merge_strip(&mut combined, action, strip.frame_start);
                            }
                        }
                        (track.name.clone(), Cow::Owned(combined))
                    })
                    .collect(),
            };

            for (name, action) in clips {
                self.export_action(&name, &action, armature, object_index);
            }
        }
    }

    fn export_action(&mut self, name: &str, action: &Action, armature: &Armature, object: usize) {
        let Some(bone_nodes) = self.bone_nodes.get(&object).cloned() else {
            return;
        };
        let fps = self.scene.fps;
        let mut samplers = Vec::new();
        let mut channels = Vec::new();

        for bone_name in action.bones() {
            let Some(bone_index) = armature.find_bone(bone_name) else {
                log::debug!("Action {} animates unknown bone {}", name, bone_name);
                continue;
            };
            let rest = armature.bones[bone_index].rest;
            let node = bone_nodes[bone_index];

            if let Some(channel) = action.locations.get(bone_name) {
                let (times, values, interpolation) =
                    self.channel_samples(action, channel, fps, |frame| {
                        action.evaluate(bone_name, frame).location
                    });
                let values: Vec<Vec3> = values
                    .into_iter()
                    .map(|v| BonePose::location_to_local(&rest, v))
                    .collect();
                let output = self.bin.push_accessor(&values, FLOAT, "VEC3", None);
                self.push_channel(
                    &mut samplers,
                    &mut channels,
                    node,
                    "translation",
                    &times,
                    output,
                    interpolation,
                );
            }
            if let Some(channel) = action.rotations.get(bone_name) {
                let (times, values, interpolation) =
                    self.channel_samples(action, channel, fps, |frame| {
                        action.evaluate(bone_name, frame).rotation
                    });
                let values: Vec<Quat> = values
                    .into_iter()
                    .map(|v| BonePose::rotation_to_local(&rest, v))
                    .collect();
                let output = self.bin.push_accessor(&values, FLOAT, "VEC4", None);
                self.push_channel(
                    &mut samplers,
                    &mut channels,
                    node,
                    "rotation",
                    &times,
                    output,
                    interpolation,
                );
            }
            if let Some(channel) = action.scales.get(bone_name) {
                let (times, values, interpolation) =
                    self.channel_samples(action, channel, fps, |frame| {
                        action.evaluate(bone_name, frame).scale
                    });
                let values: Vec<Vec3> = values
                    .into_iter()
                    .map(|v| BonePose::scale_to_local(&rest, v))
                    .collect();
                let output = self.bin.push_accessor(&values, FLOAT, "VEC3", None);
                self.push_channel(
                    &mut samplers,
                    &mut channels,
                    node,
                    "scale",
                    &times,
                    output,
                    interpolation,
                );
            }
        }

        if channels.is_empty() {
            log::debug!("Skipping action {} without exportable channels", name);
            return;
        }

        self.animations.push(json!({
            "name": name,
            "samplers": samplers,
            "channels": channels,
        }));
    }

    /// Key times and values of a channel, or one sample per frame with forced sampling.
    fn channel_samples<T: Interpolate>(
        &self,
        action: &Action,
        channel: &Channel<T>,
        fps: f32,
        evaluate: impl Fn(f32) -> T,
    ) -> (Vec<f32>, Vec<T>, Interpolation) {
        if self.options.force_sampling {
            if let Some((start, end)) = action.frame_range() {
                let frames: Vec<f32> = (start.floor() as i32..=end.ceil() as i32)
                    .map(|frame| frame as f32)
                    .collect();
                let values = frames.iter().map(|&frame| evaluate(frame)).collect();
                let times = frames.iter().map(|frame| frame / fps).collect();
                return (times, values, Interpolation::Linear);
            }
        }

        let times = channel.keys().iter().map(|key| key.frame / fps).collect();
        let values = channel.keys().iter().map(|key| key.value).collect();
        (times, values, channel.interpolation)
    }

    #[allow(clippy::too_many_arguments)]
    fn push_channel(
        &mut self,
        samplers: &mut Vec<Value>,
        channels: &mut Vec<Value>,
        node: usize,
        path: &str,
        times: &[f32],
        output: usize,
        interpolation: Interpolation,
    ) {
        let input = self.bin.push_times(times);
        samplers.push(json!({
            "input": input,
            "output": output,
            "interpolation": match interpolation {
                Interpolation::Linear => "LINEAR",
                Interpolation::Step => "STEP",
            },
        }));
        channels.push(json!({
            "sampler": samplers.len() - 1,
            "target": { "node": node, "path": path },
        }));
    }

    fn finish(mut self) -> (Value, Vec<u8>) {
        self.bin.align();

        let mut root = json!({
            "asset": { "version": "2.0", "generator": "athena asset-forge" },
            "scene": 0,
            "scenes": [{ "name": "Scene", "nodes": self.roots }],
        });

        let mut set = |key: &str, values: Vec<Value>| {
            if !values.is_empty() {
                root[key] = Value::Array(values);
            }
        };
        set("nodes", self.nodes);
        set("meshes", self.meshes);
        set("materials", self.material_values);
        set("images", self.images);
        set("textures", self.textures);
        set("skins", self.skins);
        set("animations", self.animations);
        set("bufferViews", self.bin.views);
        set("accessors", self.bin.accessors);
        if !self.bin.data.is_empty() {
            set("buffers", vec![json!({ "byteLength": self.bin.data.len() })]);
        }
        set(
            "extensionsUsed",
            self.extensions_used.iter().map(|e| json!(e)).collect(),
        );

        (root, self.bin.data)
    }
}

/// Copies the keys of `action` into `combined`, shifted so the action starts at `frame_start`.
fn merge_strip(combined: &mut Action, action: &Action, frame_start: f32) {
    let offset = frame_start - action.key_frame_range().map_or(0.0, |(start, _)| start);

    fn merge<T: Interpolate>(
        into: &mut BTreeMap<String, Channel<T>>,
        from: &BTreeMap<String, Channel<T>>,
        offset: f32,
    ) {
        for (bone, channel) in from {
            let target = into.entry(bone.clone()).or_default();
            target.interpolation = channel.interpolation;
            for key in channel.keys() {
                target.insert_key(key.frame + offset, key.value);
            }
        }
    }

    merge(&mut combined.locations, &action.locations, offset);
    merge(&mut combined.rotations, &action.rotations, offset);
    merge(&mut combined.scales, &action.scales, offset);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Object;

    fn two_material_quad() -> Mesh {
        let mut mesh = Mesh::new("quad");
        for p in [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(2.0, 0.0, 0.0),
        ] {
            mesh.add_vertex(p);
        }
        let bark = mesh.add_material(Material::pbr("Bark", Vec3::new(0.2, 0.1, 0.05), 0.9, 0.0));
        let glow = mesh.add_material(
            Material::pbr("Glow", Vec3::ONE, 0.3, 0.0).with_emission(Vec3::X, 3.0),
        );
        mesh.add_face(&[0, 1, 2, 3], bark).unwrap();
        mesh.add_face(&[1, 4, 2], glow).unwrap();
        mesh.generate_normals();
        mesh
    }

    fn parse(glb: &[u8]) -> Value {
        let glb = gltf::binary::Glb::from_slice(glb).unwrap();
        serde_json::from_slice(&glb.json).unwrap()
    }

    #[test]
    fn mesh_splits_into_one_primitive_per_material() {
        let mut scene = Scene::new();
        scene.add_object(Object::new(
            "quad",
            ObjectData::Mesh {
                mesh: two_material_quad(),
                armature: None,
            },
        ));

        let glb = export_glb(&scene, &ExportOptions::default()).unwrap();
        assert_eq!(&glb[0..4], b"glTF");
        let json = parse(&glb);

        let primitives = json["meshes"][0]["primitives"].as_array().unwrap();
        assert_eq!(primitives.len(), 2);
        assert_eq!(json["materials"].as_array().unwrap().len(), 2);
        assert_eq!(json["extensionsUsed"], json!([EMISSIVE_STRENGTH]));

        let first_indices = primitives[0]["indices"].as_u64().unwrap() as usize;
        assert_eq!(json["accessors"][first_indices]["count"], json!(6));
        let position = primitives[0]["attributes"]["POSITION"].as_u64().unwrap() as usize;
        assert_eq!(json["accessors"][position]["max"], json!([2.0, 0.0, 1.0]));
    }

    #[test]
    fn selection_limits_exported_objects() {
        let mut scene = Scene::new();
        let mut kept = Object::new(
            "kept",
            ObjectData::Mesh {
                mesh: two_material_quad(),
                armature: None,
            },
        );
        kept.selected = true;
        scene.add_object(kept);
        scene.add_object(Object::new("dropped", ObjectData::Empty));

        let options = ExportOptions {
            use_selection: true,
            ..Default::default()
        };
        let json = parse(&export_glb(&scene, &options).unwrap());
        let nodes = json["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0]["name"], json!("kept"));
    }

    #[test]
    fn baked_transform_moves_vertices() {
        let mut scene = Scene::new();
        let mut object = Object::new(
            "quad",
            ObjectData::Mesh {
                mesh: two_material_quad(),
                armature: None,
            },
        );
        object.transform = Transform::from_translation(Vec3::new(0.0, 5.0, 0.0));
        scene.add_object(object);

        let json = parse(&export_glb(&scene, &ExportOptions::default()).unwrap());
        assert!(json["nodes"][0].get("translation").is_none());
        let position = json["meshes"][0]["primitives"][0]["attributes"]["POSITION"]
            .as_u64()
            .unwrap() as usize;
        assert_eq!(json["accessors"][position]["min"], json!([0.0, 5.0, 0.0]));
    }
}
