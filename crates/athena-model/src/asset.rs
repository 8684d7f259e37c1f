use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use athena_asset_database::Asset;
use athena_transform::Transform;
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use gltf::animation::util::ReadOutputs;
use gltf::mesh::util::{ReadJoints, ReadWeights};

use crate::{
    animation::{Action, AnimationData, BonePose, Interpolation},
    material::{AlphaMode, Material},
    mesh::Mesh,
    scene::{Image, Object, ObjectData, Scene},
    skeleton::{Armature, Bone},
};

impl Asset for Scene {
    fn load(file_path: &str, data: &[u8]) -> Result<Self> {
        athena_profiling::profile_function!();

        let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(data)
            .with_context(|| format!("parse glTF: {}", file_path))?;
        let buffers = gltf::import_buffers(&document, None, blob)
            .with_context(|| format!("load glTF buffers: {}", file_path))?;

        let scene = Importer::new(&document, &buffers).import()?;
        log::info!(
            "Imported {}: {} objects, {} actions",
            file_path,
            scene.objects.len(),
            scene.action_count()
        );
        Ok(scene)
    }
}

/// Joint nodes that end up as the bones of one armature object.
struct ArmaturePlan {
    name: String,
    joints: Vec<usize>,
    /// Node the root joint hangs off.
    stop_node: Option<usize>,
    inverse_binds: Vec<Option<Mat4>>,
    object: Option<usize>,
}

struct Importer<'a> {
    document: &'a gltf::Document,
    buffers: &'a [gltf::buffer::Data],
    scene: Scene,
    node_parents: Vec<Option<usize>>,
    plans: Vec<ArmaturePlan>,
    skin_plans: Vec<Option<usize>>,
    joint_plans: HashMap<usize, usize>,
    host_plans: HashMap<usize, usize>,
    image_map: Vec<Option<usize>>,
}

fn local_transform(node: &gltf::Node) -> Transform {
    let (translation, rotation, scale) = node.transform().decomposed();
    Transform::new(
        Vec3::from(translation),
        Quat::from_array(rotation).normalize(),
        Vec3::from(scale),
    )
}

impl<'a> Importer<'a> {
    fn new(document: &'a gltf::Document, buffers: &'a [gltf::buffer::Data]) -> Self {
        let mut node_parents = vec![None; document.nodes().len()];
        for node in document.nodes() {
            for child in node.children() {
                node_parents[child.index()] = Some(node.index());
            }
        }

        Self {
            document,
            buffers,
            scene: Scene::new(),
            node_parents,
            plans: Vec::new(),
            skin_plans: Vec::new(),
            joint_plans: HashMap::new(),
            host_plans: HashMap::new(),
            image_map: Vec::new(),
        }
    }

    fn import(mut self) -> Result<Scene> {
        let document = self.document;

        self.import_images()?;
        self.plan_armatures();

        let roots: Vec<usize> = match self
            .document
            .default_scene()
            .or_else(|| document.scenes().next())
        {
            Some(scene) => scene.nodes().map(|node| node.index()).collect(),
            None => (0..self.node_parents.len())
                .filter(|&i| self.node_parents[i].is_none())
                .collect(),
        };
        for root in roots {
            self.import_node(root, None)?;
        }

        self.build_armatures();
        self.import_animations()?;

        let range = self
            .scene
            .actions()
            .filter_map(|(_, action)| action.frame_range())
            .reduce(|(a0, a1), (b0, b1)| (a0.min(b0), a1.max(b1)));
        if let Some((start, end)) = range {
            self.scene.frame_start = start.floor();
            self.scene.frame_end = end.ceil();
        }

        Ok(self.scene)
    }

    fn import_images(&mut self) -> Result<()> {
        let document = self.document;
        let buffers = self.buffers;

        for image in document.images() {
            let name = image
                .name()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("Image{}", image.index()));

            match image.source() {
                gltf::image::Source::View { view, mime_type } => {
                    let buffer = &buffers[view.buffer().index()];
                    let bytes = buffer
                        .get(view.offset()..view.offset() + view.length())
                        .with_context(|| {
                            format!(
                                "image {} points past the end of buffer {}",
                                name,
                                view.buffer().index()
                            )
                        })?;
                    self.scene.images.push(Image {
                        name,
                        mime_type: mime_type.to_owned(),
                        data: bytes.to_vec(),
                    });
                    self.image_map.push(Some(self.scene.images.len() - 1));
                }
                gltf::image::Source::Uri { uri, .. } => {
                    log::warn!("Skipping external image {}: {}", name, uri);
                    self.image_map.push(None);
                }
            }
        }

        Ok(())
    }

    fn plan_armatures(&mut self) {
        let document = self.document;
        let buffers = self.buffers;

        let mut plans_by_joints: HashMap<Vec<usize>, usize> = HashMap::new();
        let all_joints: HashSet<usize> = self
            .document
            .skins()
            .flat_map(|skin| skin.joints().map(|joint| joint.index()).collect::<Vec<_>>())
            .collect();

        for skin in document.skins() {
            let joints: Vec<usize> = skin.joints().map(|joint| joint.index()).collect();
            let mut key = joints.clone();
            key.sort_unstable();

            if joints.is_empty() {
                log::warn!("Skipping skin {} without joints", skin.index());
                self.skin_plans.push(None);
                continue;
            }
            if let Some(&plan) = plans_by_joints.get(&key) {
                self.skin_plans.push(Some(plan));
                continue;
            }

            let reader = skin.reader(|buffer| Some(buffers[buffer.index()].0.as_slice()));
            let mut inverse_binds: Vec<Option<Mat4>> = match reader.read_inverse_bind_matrices() {
                Some(matrices) => matrices.map(|m| Some(Mat4::from_cols_array_2d(&m))).collect(),
                None => Vec::new(),
            };
            inverse_binds.resize(joints.len(), None);

            let joint_set: HashSet<usize> = joints.iter().copied().collect();
            let root = joints
                .iter()
                .copied()
                .find(|joint| {
                    self.node_parents[*joint].map_or(true, |parent| !joint_set.contains(&parent))
                })
                .unwrap_or(joints[0]);
            let stop_node = self.node_parents[root];
            let host = stop_node.is_some_and(|node| {
                !all_joints.contains(&node)
                    && self
                        .document
                        .nodes()
                        .nth(node)
                        .is_some_and(|node| node.mesh().is_none())
            });

            let name = match (host, stop_node) {
                (true, Some(node)) => self
                    .document
                    .nodes()
                    .nth(node)
                    .and_then(|node| node.name().map(str::to_owned)),
                _ => skin.name().map(str::to_owned),
            }
            .unwrap_or_else(|| "Armature".to_owned());

            let plan = self.plans.len();
            for &joint in &joints {
                self.joint_plans.entry(joint).or_insert(plan);
            }
            if let (true, Some(node)) = (host, stop_node) {
                self.host_plans.insert(node, plan);
            }
            self.plans.push(ArmaturePlan {
                name,
                joints,
                stop_node,
                inverse_binds,
                object: None,
            });
            plans_by_joints.insert(key, plan);
            self.skin_plans.push(Some(plan));
        }
    }

    fn import_node(&mut self, node_index: usize, parent: Option<usize>) -> Result<()> {
        let document = self.document;

        let Some(node) = document.nodes().nth(node_index) else {
            return Ok(());
        };

        let object = if let Some(&plan) = self.joint_plans.get(&node_index) {
            // Joints become bones; the armature object is created at the first joint reached
            // when the skeleton has no host node.
            if self.plans[plan].object.is_none() {
                let object = Object {
                    parent,
                    ..Object::new(&self.plans[plan].name, armature_data())
                };
                self.plans[plan].object = Some(self.scene.add_object(object));
            }
            self.plans[plan].object
        } else {
            let name = node
                .name()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("Node{}", node_index));

            let data = if self.host_plans.contains_key(&node_index) {
                armature_data()
            } else if let Some(mesh) = node.mesh() {
                let armature = node.skin().and_then(|skin| self.skin_plans[skin.index()]);
                ObjectData::Mesh {
                    mesh: self.import_mesh(&mesh, node.skin().as_ref())?,
                    // Resolved to an object index once every armature exists.
                    armature,
                }
            } else {
                ObjectData::Empty
            };

            let index = self.scene.add_object(Object {
                parent,
                transform: local_transform(&node),
                ..Object::new(&name, data)
            });
            if let Some(&plan) = self.host_plans.get(&node_index) {
                self.plans[plan].object = Some(index);
            }
            Some(index)
        };

        for child in node.children() {
            self.import_node(child.index(), object)?;
        }
        Ok(())
    }

    fn import_mesh(&self, gltf_mesh: &gltf::Mesh, skin: Option<&gltf::Skin>) -> Result<Mesh> {
        athena_profiling::profile_function!();

        let buffers = self.buffers;

        let mut mesh = Mesh::new(gltf_mesh.name().unwrap_or("Mesh"));
        let mut material_slots: HashMap<Option<usize>, u32> = HashMap::new();
        let mut missing_normals = false;
        let mut any_tex_coords = false;
        let mut any_joints = false;

        let plan = skin.and_then(|skin| self.skin_plans[skin.index()].map(|p| (skin, p)));
        let joint_remap: Vec<u16> = match plan {
            Some((skin, plan)) => {
                let plan = &self.plans[plan];
                skin.joints()
                    .map(|joint| {
                        plan.joints
                            .iter()
                            .position(|j| *j == joint.index())
                            .unwrap_or(0) as u16
                    })
                    .collect()
            }
            None => Vec::new(),
        };

        for primitive in gltf_mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!(
                    "Skipping {:?} primitive in mesh {}",
                    primitive.mode(),
                    mesh.name
                );
                continue;
            }

            let reader = primitive.reader(|buffer| Some(buffers[buffer.index()].0.as_slice()));
            let Some(positions) = reader.read_positions() else {
                log::warn!("Skipping primitive without positions in mesh {}", mesh.name);
                continue;
            };

            let base = mesh.vertex_positions.len() as u32;
            mesh.vertex_positions.extend(positions.map(Vec3::from));
            let count = mesh.vertex_positions.len() - base as usize;

            match reader.read_normals() {
                Some(normals) => mesh.vertex_normals.extend(normals.map(Vec3::from)),
                None => {
                    missing_normals = true;
                    mesh.vertex_normals
                        .extend(std::iter::repeat(Vec3::ZERO).take(count));
                }
            }

            match reader.read_tex_coords(0) {
                Some(tex_coords) => {
                    any_tex_coords = true;
                    mesh.vertex_tex_coords
                        .extend(tex_coords.into_f32().map(Vec2::from));
                }
                None => mesh
                    .vertex_tex_coords
                    .extend(std::iter::repeat(Vec2::ZERO).take(count)),
            }

            match (reader.read_joints(0), reader.read_weights(0)) {
                (Some(joints), Some(weights)) if !joint_remap.is_empty() => {
                    any_joints = true;
                    let joints: Vec<[u16; 4]> = match joints {
                        ReadJoints::U8(it) => it.map(|v| v.map(u16::from)).collect(),
                        ReadJoints::U16(it) => it.collect(),
                    };
                    mesh.vertex_joints.extend(joints.into_iter().map(|v| {
                        v.map(|j| joint_remap.get(j as usize).copied().unwrap_or(0))
                    }));
                    let weights: Vec<[f32; 4]> = match weights {
                        ReadWeights::F32(it) => it.collect(),
                        ReadWeights::U16(it) => it.map(|v| v.map(|w| w as f32 / 65535.0)).collect(),
                        ReadWeights::U8(it) => it.map(|v| v.map(|w| w as f32 / 255.0)).collect(),
                    };
                    mesh.vertex_weights.extend(weights);
                }
                _ => {
                    mesh.vertex_joints
                        .extend(std::iter::repeat([0; 4]).take(count));
                    mesh.vertex_weights
                        .extend(std::iter::repeat([1.0, 0.0, 0.0, 0.0]).take(count));
                }
            }

            let material = primitive.material();
            let slot = match material_slots.get(&material.index()) {
                Some(&slot) => slot,
                None => {
                    let slot = mesh.add_material(self.convert_material(&material));
                    material_slots.insert(material.index(), slot);
                    slot
                }
            };

            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..count as u32).collect(),
            };
            for triangle in indices.chunks_exact(3) {
                let face = [base + triangle[0], base + triangle[1], base + triangle[2]];
                if let Err(err) = mesh.add_face(&face, slot) {
                    log::debug!("Dropped triangle in mesh {}: {}", mesh.name, err);
                }
            }
        }

        if !any_tex_coords {
            mesh.vertex_tex_coords.clear();
        }
        if !any_joints {
            mesh.vertex_joints.clear();
            mesh.vertex_weights.clear();
        }
        if missing_normals {
            mesh.generate_normals();
        }

        Ok(mesh)
    }

    fn texture_image(&self, texture: gltf::Texture) -> Option<usize> {
        self.image_map
            .get(texture.source().index())
            .copied()
            .flatten()
    }

    fn convert_material(&self, material: &gltf::Material) -> Material {
        let pbr = material.pbr_metallic_roughness();

        Material {
            name: material
                .name()
                .map(str::to_owned)
                .unwrap_or_else(|| "Material".to_owned()),
            base_color: Vec4::from(pbr.base_color_factor()),
            base_color_image: pbr
                .base_color_texture()
                .and_then(|info| self.texture_image(info.texture())),
            metallic: pbr.metallic_factor(),
            roughness: pbr.roughness_factor(),
            metallic_roughness_image: pbr
                .metallic_roughness_texture()
                .and_then(|info| self.texture_image(info.texture())),
            normal_scale: material.normal_texture().map_or(1.0, |t| t.scale()),
            normal_image: material
                .normal_texture()
                .and_then(|t| self.texture_image(t.texture())),
            emission: Vec3::from(material.emissive_factor()),
            emission_strength: material.emissive_strength().unwrap_or(1.0),
            emission_image: material
                .emissive_texture()
                .and_then(|info| self.texture_image(info.texture())),
            alpha_mode: match material.alpha_mode() {
                gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
                gltf::material::AlphaMode::Mask => AlphaMode::Mask,
                gltf::material::AlphaMode::Blend => AlphaMode::Blend,
            },
            alpha_cutoff: material.alpha_cutoff().unwrap_or(0.5),
            double_sided: material.double_sided(),
            ..Default::default()
        }
    }

    /// Rest transform of a joint relative to its parent joint (or the armature object),
    /// folding in any plain nodes in between.
    fn bone_rest(&self, nodes: &[gltf::Node], plan: &ArmaturePlan, joint: usize) -> Transform {
        let mut matrix = local_transform(&nodes[joint]).get_matrix();
        let mut current = self.node_parents[joint];
        while let Some(node) = current {
            if plan.joints.contains(&node) || Some(node) == plan.stop_node {
                break;
            }
            matrix = local_transform(&nodes[node]).get_matrix() * matrix;
            current = self.node_parents[node];
        }
        Transform::from(matrix)
    }

    fn build_armatures(&mut self) {
        let document = self.document;

        let nodes: Vec<gltf::Node> = document.nodes().collect();

        for plan_index in 0..self.plans.len() {
            let plan = &self.plans[plan_index];
            let Some(object) = plan.object else {
                log::warn!("Skeleton {} is not part of the scene", plan.name);
                continue;
            };

            let mut armature = Armature::new();
            for (i, &joint) in plan.joints.iter().enumerate() {
                let parent = {
                    let mut current = self.node_parents[joint];
                    loop {
                        match current {
                            Some(node) => {
                                if let Some(p) = plan.joints.iter().position(|j| *j == node) {
                                    break Some(p);
                                }
                                current = self.node_parents[node];
                            }
                            None => break None,
                        }
                    }
                };
                let name = nodes[joint]
                    .name()
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("Bone{}", i));

                armature.add_bone(Bone {
                    inverse_bind: plan.inverse_binds.get(i).copied().flatten(),
                    ..Bone::new(&name, parent, self.bone_rest(&nodes, plan, joint))
                });
            }

            if let ObjectData::Armature { armature: data, .. } =
                &mut self.scene.objects[object].data
            {
                *data = armature;
            }
        }

        // Skinned meshes still carry plan indices.
        let plan_objects: Vec<Option<usize>> = self.plans.iter().map(|p| p.object).collect();
        for object in &mut self.scene.objects {
            if let ObjectData::Mesh { armature, .. } = &mut object.data {
                *armature = armature.and_then(|plan| plan_objects[plan]);
            }
        }
    }

    fn import_animations(&mut self) -> Result<()> {
        athena_profiling::profile_function!();

        let document = self.document;
        let buffers = self.buffers;

        let fps = self.scene.fps;

        for animation in document.animations() {
            let name = animation
                .name()
                .map(str::to_owned)
                .unwrap_or_else(|| format!("Animation{}", animation.index()));
            let mut actions: HashMap<usize, Action> = HashMap::new();

            for channel in animation.channels() {
                let target = channel.target();
                let node = target.node().index();
                let Some(&plan) = self.joint_plans.get(&node) else {
                    log::debug!("Ignoring {} channel on non-joint node {}", name, node);
                    continue;
                };
                let Some(object) = self.plans[plan].object else {
                    continue;
                };
                let Some(armature) = self.scene.objects[object].armature() else {
                    continue;
                };
                let Some(bone_index) = self.plans[plan].joints.iter().position(|j| *j == node)
                else {
                    continue;
                };
                let bone = &armature.bones[bone_index];

                let reader =
                    channel.reader(|buffer| Some(buffers[buffer.index()].0.as_slice()));
                let Some(inputs) = reader.read_inputs() else {
                    continue;
                };
                let frames: Vec<f32> = inputs.map(|time| time_to_frame(time, fps)).collect();
                let Some(outputs) = reader.read_outputs() else {
                    continue;
                };

                let (stride, offset, interpolation) = match channel.sampler().interpolation() {
                    gltf::animation::Interpolation::Linear => (1, 0, Interpolation::Linear),
                    gltf::animation::Interpolation::Step => (1, 0, Interpolation::Step),
                    // In-tangent, value, out-tangent triples; only values are kept.
                    gltf::animation::Interpolation::CubicSpline => (3, 1, Interpolation::Linear),
                };

                let action = actions.entry(plan).or_insert_with(|| Action::new(&name));
                let bone_name = bone.name.clone();
                match outputs {
                    ReadOutputs::Translations(values) => {
                        for (frame, value) in
                            frames.iter().zip(values.skip(offset).step_by(stride))
                        {
                            let pose = BonePose::from_local(
                                &bone.rest,
                                Vec3::from(value),
                                bone.rest.get_rotation(),
                                bone.rest.get_scale(),
                            );
                            action.insert_location(&bone_name, *frame, pose.location);
                        }
                        if let Some(channel) = action.locations.get_mut(&bone_name) {
                            channel.interpolation = interpolation;
                        }
                    }
                    ReadOutputs::Rotations(values) => {
                        for (frame, value) in frames
                            .iter()
                            .zip(values.into_f32().skip(offset).step_by(stride))
                        {
                            let pose = BonePose::from_local(
                                &bone.rest,
                                bone.rest.get_translation(),
                                Quat::from_array(value).normalize(),
                                bone.rest.get_scale(),
                            );
                            action.insert_rotation(&bone_name, *frame, pose.rotation);
                        }
                        if let Some(channel) = action.rotations.get_mut(&bone_name) {
                            channel.interpolation = interpolation;
                        }
                    }
                    ReadOutputs::Scales(values) => {
                        for (frame, value) in
                            frames.iter().zip(values.skip(offset).step_by(stride))
                        {
                            let pose = BonePose::from_local(
                                &bone.rest,
                                bone.rest.get_translation(),
                                bone.rest.get_rotation(),
                                Vec3::from(value),
                            );
                            action.insert_scale(&bone_name, *frame, pose.scale);
                        }
                        if let Some(channel) = action.scales.get_mut(&bone_name) {
                            channel.interpolation = interpolation;
                        }
                    }
                    ReadOutputs::MorphTargetWeights(_) => {
                        log::debug!("Ignoring morph target weights in {}", name);
                    }
                }
            }

            let mut plans: Vec<usize> = actions.keys().copied().collect();
            plans.sort_unstable();
            for plan in plans {
                let Some(action) = actions.remove(&plan) else {
                    continue;
                };
                let Some(object) = self.plans[plan].object else {
                    continue;
                };
                let id = self.scene.add_action(action);
                if let Some(data) = self.scene.objects[object].animation_mut() {
                    if data.action.is_none() {
                        data.action = Some(id);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Frame of a key time, snapped to the whole frame it was most likely authored on.
fn time_to_frame(time: f32, fps: f32) -> f32 {
    let frame = time * fps;
    let whole = frame.round();
    if (frame - whole).abs() < 1e-3 {
        whole
    } else {
        frame
    }
}

fn armature_data() -> ObjectData {
    ObjectData::Armature {
        armature: Armature::new(),
        animation: AnimationData::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_times_snap_to_whole_frames() {
        assert_eq!(time_to_frame(1.0 / 24.0, 24.0), 1.0);
        assert_eq!(time_to_frame(71.0 / 24.0, 24.0), 71.0);
        assert!((time_to_frame(0.5 / 24.0, 24.0) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn truncated_image_view_is_an_error() {
        let gltf = r#"{
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": 4, "uri": "data:application/octet-stream;base64,AAAAAA==" }],
            "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 64 }],
            "images": [{ "bufferView": 0, "mimeType": "image/png" }]
        }"#;

        assert!(Scene::load("truncated.gltf", gltf.as_bytes()).is_err());
    }
}
