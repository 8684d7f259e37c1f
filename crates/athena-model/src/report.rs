use std::fmt;

use athena_transform::euler_xyz_degrees_from_quat;
use glam::Vec3;

use crate::{
    animation::{Channel, Interpolate, Property},
    scene::{ObjectData, Scene},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectLine {
    pub depth: usize,
    pub name: String,
    pub kind: &'static str,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoneLine {
    pub name: String,
    pub parent: Option<String>,
    pub head: Vec3,
    pub tail: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArmatureReport {
    pub name: String,
    pub bones: Vec<BoneLine>,
    pub active_action: Option<String>,
    pub nla_tracks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelReport {
    pub bone: String,
    pub property: Property,
    pub key_count: usize,
    pub min: Vec<f32>,
    pub max: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionReport {
    pub name: String,
    pub frame_range: Option<(f32, f32)>,
    pub manual_frame_range: Option<(f32, f32)>,
    pub channels: Vec<ChannelReport>,
}

impl ActionReport {
    pub fn key_count(&self) -> usize {
        self.channels.iter().map(|c| c.key_count).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoseSample {
    pub action: String,
    pub bone: String,
    pub frame: f32,
    pub location: Vec3,
    pub rotation_degrees: Vec3,
}

/// Read-only summary of a scene, printed by the inspect command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InspectReport {
    pub objects: Vec<ObjectLine>,
    pub armatures: Vec<ArmatureReport>,
    pub actions: Vec<ActionReport>,
    pub samples: Vec<PoseSample>,
}

fn channel_reports<T: Interpolate>(
    property: Property,
    channels: &std::collections::BTreeMap<String, Channel<T>>,
    out: &mut Vec<ChannelReport>,
) {
    for (bone, channel) in channels {
        let (min, max) = channel.value_range().unwrap_or_default();
        out.push(ChannelReport {
            bone: bone.clone(),
            property,
            key_count: channel.len(),
            min,
            max,
        });
    }
}

impl InspectReport {
    pub fn new(scene: &Scene, sample_bones: &[String], sample_frames: &[f32]) -> Self {
        athena_profiling::profile_function!();

        let mut report = Self::default();
        for root in scene.roots() {
            report.push_hierarchy(scene, root, 0);
        }

        for index in scene.armatures() {
            let object = &scene.objects[index];
            let (Some(armature), Some(animation)) = (object.armature(), object.animation()) else {
                continue;
            };

            report.armatures.push(ArmatureReport {
                name: object.name.clone(),
                bones: (0..armature.bones.len())
                    .map(|bone| BoneLine {
                        name: armature.bones[bone].name.clone(),
                        parent: armature.bones[bone]
                            .parent
                            .map(|p| armature.bones[p].name.clone()),
                        head: armature.head(bone),
                        tail: armature.tail(bone),
                    })
                    .collect(),
                active_action: animation
                    .action
                    .and_then(|id| scene.action(id))
                    .map(|action| action.name.clone()),
                nla_tracks: animation
                    .nla_tracks
                    .iter()
                    .map(|track| track.name.clone())
                    .collect(),
            });
        }

        for (_, action) in scene.actions() {
            let mut channels = Vec::new();
            channel_reports(Property::Location, &action.locations, &mut channels);
            channel_reports(Property::Rotation, &action.rotations, &mut channels);
            channel_reports(Property::Scale, &action.scales, &mut channels);
            channels.sort_by(|a, b| (&a.bone, a.property).cmp(&(&b.bone, b.property)));

            report.actions.push(ActionReport {
                name: action.name.clone(),
                frame_range: action.frame_range(),
                manual_frame_range: action.manual_frame_range,
                channels,
            });

            for bone in sample_bones {
                let known = scene
                    .objects
                    .iter()
                    .filter_map(|o| o.armature())
                    .any(|armature| armature.find_bone(bone).is_some());
                if !known {
                    continue;
                }
                for &frame in sample_frames {
                    let pose = action.evaluate(bone, frame);
                    report.samples.push(PoseSample {
                        action: action.name.clone(),
                        bone: bone.clone(),
                        frame,
                        location: pose.location,
                        rotation_degrees: euler_xyz_degrees_from_quat(pose.rotation),
                    });
                }
            }
        }

        report
    }

    fn push_hierarchy(&mut self, scene: &Scene, object: usize, depth: usize) {
        let o = &scene.objects[object];
        let detail = match &o.data {
            ObjectData::Empty => String::new(),
            ObjectData::Mesh { mesh, armature } => format!(
                "{} verts, {} faces, {} materials{}",
                mesh.vertex_positions.len(),
                mesh.faces().len(),
                mesh.materials.len(),
                armature
                    .map(|a| format!(", skinned to {}", scene.objects[a].name))
                    .unwrap_or_default()
            ),
            ObjectData::Armature { armature, .. } => format!("{} bones", armature.bones.len()),
        };

        self.objects.push(ObjectLine {
            depth,
            name: o.name.clone(),
            kind: o.data.kind(),
            detail,
        });
        for child in scene.children(object) {
            self.push_hierarchy(scene, child, depth + 1);
        }
    }

    pub fn has_armature(&self) -> bool {
        !self.armatures.is_empty()
    }
}

fn fmt_range(range: Option<(f32, f32)>) -> String {
    match range {
        Some((start, end)) => format!("{:.1}..{:.1}", start, end),
        None => "-".to_owned(),
    }
}

fn fmt_values(values: &[f32]) -> String {
    let values: Vec<String> = values.iter().map(|v| format!("{:.4}", v)).collect();
    format!("({})", values.join(", "))
}

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Objects ===")?;
        for line in &self.objects {
            write!(f, "{}{} [{}]", "  ".repeat(line.depth), line.name, line.kind)?;
            if line.detail.is_empty() {
                writeln!(f)?;
            } else {
                writeln!(f, " {}", line.detail)?;
            }
        }

        for armature in &self.armatures {
            writeln!(f, "\n=== Armature: {} ({} bones) ===", armature.name, armature.bones.len())?;
            for bone in &armature.bones {
                writeln!(
                    f,
                    "  {} parent={} head={:.3?} tail={:.3?}",
                    bone.name,
                    bone.parent.as_deref().unwrap_or("None"),
                    bone.head.to_array(),
                    bone.tail.to_array()
                )?;
            }
            writeln!(
                f,
                "  active action: {}",
                armature.active_action.as_deref().unwrap_or("None")
            )?;
            if !armature.nla_tracks.is_empty() {
                writeln!(f, "  NLA tracks: {}", armature.nla_tracks.join(", "))?;
            }
        }

        writeln!(f, "\n=== Actions ({}) ===", self.actions.len())?;
        for action in &self.actions {
            writeln!(
                f,
                "{}: frames {} (manual {}), {} channels, {} keys",
                action.name,
                fmt_range(action.frame_range),
                fmt_range(action.manual_frame_range),
                action.channels.len(),
                action.key_count()
            )?;
            for channel in &action.channels {
                writeln!(
                    f,
                    "  {}.{}: {} keys, min {} max {}",
                    channel.bone,
                    channel.property,
                    channel.key_count,
                    fmt_values(&channel.min),
                    fmt_values(&channel.max)
                )?;
            }
        }

        if !self.samples.is_empty() {
            writeln!(f, "\n=== Samples ===")?;
            for sample in &self.samples {
                writeln!(
                    f,
                    "{} {} @ {:.0}: loc={} rot={}",
                    sample.action,
                    sample.bone,
                    sample.frame,
                    fmt_values(&sample.location.to_array()),
                    fmt_values(&sample.rotation_degrees.to_array())
                )?;
            }
        }

        Ok(())
    }
}
