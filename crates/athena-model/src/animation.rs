use std::collections::BTreeMap;
use std::fmt;

use athena_transform::Transform;
use glam::{Quat, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActionId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Property {
    Location,
    Rotation,
    Scale,
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Property::Location => write!(f, "location"),
            Property::Rotation => write!(f, "rotation"),
            Property::Scale => write!(f, "scale"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
}

pub trait Interpolate: Copy {
    fn interpolate(self, other: Self, t: f32) -> Self;
    fn components(&self) -> Vec<f32>;
}

impl Interpolate for Vec3 {
    fn interpolate(self, other: Self, t: f32) -> Self {
        self.lerp(other, t)
    }

    fn components(&self) -> Vec<f32> {
        self.to_array().to_vec()
    }
}

impl Interpolate for Quat {
    fn interpolate(self, other: Self, t: f32) -> Self {
        self.slerp(other, t)
    }

    fn components(&self) -> Vec<f32> {
        self.to_array().to_vec()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    pub frame: f32,
    pub value: T,
}

/// Keyframes of one animated property, strictly increasing in frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel<T> {
    keys: Vec<Keyframe<T>>,
    pub interpolation: Interpolation,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            interpolation: Interpolation::Linear,
        }
    }
}

impl<T: Interpolate> Channel<T> {
    /// Inserts a key in frame order, replacing any key already at `frame`.
    pub fn insert_key(&mut self, frame: f32, value: T) {
        match self.keys.binary_search_by(|key| key.frame.total_cmp(&frame)) {
            Ok(i) => self.keys[i].value = value,
            Err(i) => self.keys.insert(i, Keyframe { frame, value }),
        }
    }

    pub fn keys(&self) -> &[Keyframe<T>] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn frame_range(&self) -> Option<(f32, f32)> {
        Some((self.keys.first()?.frame, self.keys.last()?.frame))
    }

    pub fn evaluate(&self, frame: f32) -> Option<T> {
        let first = self.keys.first()?;
        let last = self.keys.last()?;
        if frame <= first.frame {
            return Some(first.value);
        }
        if frame >= last.frame {
            return Some(last.value);
        }

        let next = self.keys.partition_point(|key| key.frame <= frame);
        let (a, b) = (&self.keys[next - 1], &self.keys[next]);
        Some(match self.interpolation {
            Interpolation::Step => a.value,
            Interpolation::Linear => {
                let t = (frame - a.frame) / (b.frame - a.frame);
                a.value.interpolate(b.value, t)
            }
        })
    }

    /// Per component minimum and maximum over all keys.
    pub fn value_range(&self) -> Option<(Vec<f32>, Vec<f32>)> {
        let mut iter = self.keys.iter().map(|key| key.value.components());
        let first = iter.next()?;
        Some(iter.fold((first.clone(), first), |(mut min, mut max), c| {
            for i in 0..c.len() {
                min[i] = min[i].min(c[i]);
                max[i] = max[i].max(c[i]);
            }
            (min, max)
        }))
    }

    pub fn offset_frames(&mut self, offset: f32) {
        for key in &mut self.keys {
            key.frame += offset;
        }
    }
}

/// Location, rotation and scale of a bone relative to its rest pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BonePose {
    pub location: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for BonePose {
    fn default() -> Self {
        Self {
            location: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl BonePose {
    /// Expresses a parent-relative node transform as a delta on top of `rest`.
    pub fn from_local(rest: &Transform, translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        let rest_rotation_inv = rest.get_rotation().inverse();
        Self {
            location: rest_rotation_inv * (translation - rest.get_translation())
                / rest.get_scale(),
            rotation: (rest_rotation_inv * rotation).normalize(),
            scale: scale / rest.get_scale(),
        }
    }

    pub fn location_to_local(rest: &Transform, location: Vec3) -> Vec3 {
        rest.get_translation() + rest.get_rotation() * (rest.get_scale() * location)
    }

    pub fn rotation_to_local(rest: &Transform, rotation: Quat) -> Quat {
        (rest.get_rotation() * rotation).normalize()
    }

    pub fn scale_to_local(rest: &Transform, scale: Vec3) -> Vec3 {
        rest.get_scale() * scale
    }

    pub fn to_local(&self, rest: &Transform) -> Transform {
        Transform::new(
            Self::location_to_local(rest, self.location),
            Self::rotation_to_local(rest, self.rotation),
            Self::scale_to_local(rest, self.scale),
        )
    }
}

/// A named clip: per bone channels for location, rotation and scale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Action {
    pub name: String,
    pub locations: BTreeMap<String, Channel<Vec3>>,
    pub rotations: BTreeMap<String, Channel<Quat>>,
    pub scales: BTreeMap<String, Channel<Vec3>>,
    pub manual_frame_range: Option<(f32, f32)>,
}

impl Action {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    pub fn insert_location(&mut self, bone: &str, frame: f32, location: Vec3) {
        self.locations
            .entry(bone.to_owned())
            .or_default()
            .insert_key(frame, location);
    }

    pub fn insert_rotation(&mut self, bone: &str, frame: f32, rotation: Quat) {
        self.rotations
            .entry(bone.to_owned())
            .or_default()
            .insert_key(frame, rotation);
    }

    pub fn insert_scale(&mut self, bone: &str, frame: f32, scale: Vec3) {
        self.scales
            .entry(bone.to_owned())
            .or_default()
            .insert_key(frame, scale);
    }

    pub fn is_empty(&self) -> bool {
        self.locations.values().all(Channel::is_empty)
            && self.rotations.values().all(Channel::is_empty)
            && self.scales.values().all(Channel::is_empty)
    }

    pub fn channel_count(&self) -> usize {
        self.locations.len() + self.rotations.len() + self.scales.len()
    }

    pub fn key_count(&self) -> usize {
        self.locations.values().map(Channel::len).sum::<usize>()
            + self.rotations.values().map(Channel::len).sum::<usize>()
            + self.scales.values().map(Channel::len).sum::<usize>()
    }

    /// Span of all keyframes, ignoring any manual range.
    pub fn key_frame_range(&self) -> Option<(f32, f32)> {
        self.locations
            .values()
            .filter_map(Channel::frame_range)
            .chain(self.rotations.values().filter_map(Channel::frame_range))
            .chain(self.scales.values().filter_map(Channel::frame_range))
            .reduce(|(a0, a1), (b0, b1)| (a0.min(b0), a1.max(b1)))
    }

    pub fn frame_range(&self) -> Option<(f32, f32)> {
        self.manual_frame_range.or_else(|| self.key_frame_range())
    }

    /// Bone names with at least one channel, in sorted order.
    pub fn bones(&self) -> Vec<&str> {
        let mut bones: Vec<&str> = self
            .locations
            .keys()
            .chain(self.rotations.keys())
            .chain(self.scales.keys())
            .map(String::as_str)
            .collect();
        bones.sort_unstable();
        bones.dedup();
        bones
    }

    pub fn evaluate(&self, bone: &str, frame: f32) -> BonePose {
        let rest = BonePose::default();
        BonePose {
            location: self
                .locations
                .get(bone)
                .and_then(|c| c.evaluate(frame))
                .unwrap_or(rest.location),
            rotation: self
                .rotations
                .get(bone)
                .and_then(|c| c.evaluate(frame))
                .unwrap_or(rest.rotation),
            scale: self
                .scales
                .get(bone)
                .and_then(|c| c.evaluate(frame))
                .unwrap_or(rest.scale),
        }
    }

    pub fn offset_frames(&mut self, offset: f32) {
        for channel in self.locations.values_mut() {
            channel.offset_frames(offset);
        }
        for channel in self.rotations.values_mut() {
            channel.offset_frames(offset);
        }
        for channel in self.scales.values_mut() {
            channel.offset_frames(offset);
        }
        if let Some((start, end)) = &mut self.manual_frame_range {
            *start += offset;
            *end += offset;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NlaStrip {
    pub action: ActionId,
    pub frame_start: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NlaTrack {
    pub name: String,
    pub strips: Vec<NlaStrip>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationData {
    pub action: Option<ActionId>,
    pub nla_tracks: Vec<NlaTrack>,
}

impl AnimationData {
    pub fn push_track(&mut self, name: &str, action: ActionId, frame_start: f32) {
        self.nla_tracks.push(NlaTrack {
            name: name.to_owned(),
            strips: vec![NlaStrip {
                action,
                frame_start,
            }],
        });
    }

    pub fn references(&self, action: ActionId) -> bool {
        self.action == Some(action)
            || self
                .nla_tracks
                .iter()
                .any(|track| track.strips.iter().any(|strip| strip.action == action))
    }

    pub fn forget(&mut self, action: ActionId) {
        if self.action == Some(action) {
            self.action = None;
        }
        for track in &mut self.nla_tracks {
            track.strips.retain(|strip| strip.action != action);
        }
        self.nla_tracks.retain(|track| !track.strips.is_empty());
    }
}
