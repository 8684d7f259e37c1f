use std::collections::BTreeMap;

use athena_transform::Transform;
use glam::Mat4;

use crate::{
    animation::{Action, ActionId, AnimationData},
    mesh::Mesh,
    skeleton::Armature,
};

/// Encoded image bytes, kept as read so export can embed them unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum ObjectData {
    Empty,
    Mesh {
        mesh: Mesh,
        /// Armature object the mesh is skinned to.
        armature: Option<usize>,
    },
    Armature {
        armature: Armature,
        animation: AnimationData,
    },
}

impl ObjectData {
    pub fn kind(&self) -> &'static str {
        match self {
            ObjectData::Empty => "EMPTY",
            ObjectData::Mesh { .. } => "MESH",
            ObjectData::Armature { .. } => "ARMATURE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Object {
    pub name: String,
    pub parent: Option<usize>,
    pub transform: Transform,
    pub selected: bool,
    pub data: ObjectData,
}

impl Object {
    pub fn new(name: &str, data: ObjectData) -> Self {
        Self {
            name: name.to_owned(),
            parent: None,
            transform: Transform::IDENTITY,
            selected: false,
            data,
        }
    }

    pub fn armature(&self) -> Option<&Armature> {
        match &self.data {
            ObjectData::Armature { armature, .. } => Some(armature),
            _ => None,
        }
    }

    pub fn animation(&self) -> Option<&AnimationData> {
        match &self.data {
            ObjectData::Armature { animation, .. } => Some(animation),
            _ => None,
        }
    }

    pub fn animation_mut(&mut self) -> Option<&mut AnimationData> {
        match &mut self.data {
            ObjectData::Armature { animation, .. } => Some(animation),
            _ => None,
        }
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.data {
            ObjectData::Mesh { mesh, .. } => Some(mesh),
            _ => None,
        }
    }
}

/// In-memory scene that pipelines build up and hand to the exporter.
#[derive(Debug, Clone)]
pub struct Scene {
    pub objects: Vec<Object>,
    pub images: Vec<Image>,
    pub fps: f32,
    pub frame_start: f32,
    pub frame_end: f32,
    actions: BTreeMap<ActionId, Action>,
    next_action_id: u32,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            images: Vec::new(),
            fps: 24.0,
            frame_start: 1.0,
            frame_end: 250.0,
            actions: BTreeMap::new(),
            next_action_id: 0,
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, object: Object) -> usize {
        debug_assert!(object.parent.map_or(true, |p| p < self.objects.len()));
        self.objects.push(object);
        self.objects.len() - 1
    }

    pub fn children(&self, object: usize) -> impl Iterator<Item = usize> + '_ {
        self.objects
            .iter()
            .enumerate()
            .filter(move |(_, o)| o.parent == Some(object))
            .map(|(i, _)| i)
    }

    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, o)| o.parent.is_none())
            .map(|(i, _)| i)
    }

    pub fn world_matrix(&self, object: usize) -> Mat4 {
        let mut matrix = self.objects[object].transform.get_matrix();
        let mut parent = self.objects[object].parent;
        while let Some(p) = parent {
            matrix = self.objects[p].transform.get_matrix() * matrix;
            parent = self.objects[p].parent;
        }
        matrix
    }

    pub fn armatures(&self) -> Vec<usize> {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, o)| o.armature().is_some())
            .map(|(i, _)| i)
            .collect()
    }

    /// Mesh objects skinned to `armature`.
    pub fn skinned_meshes(&self, armature: usize) -> Vec<usize> {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, o)| {
                matches!(o.data, ObjectData::Mesh { armature: Some(a), .. } if a == armature)
            })
            .map(|(i, _)| i)
            .collect()
    }

    pub fn deselect_all(&mut self) {
        for object in &mut self.objects {
            object.selected = false;
        }
    }

    pub fn add_action(&mut self, action: Action) -> ActionId {
        let id = ActionId(self.next_action_id);
        self.next_action_id += 1;
        self.actions.insert(id, action);
        id
    }

    pub fn action(&self, id: ActionId) -> Option<&Action> {
        self.actions.get(&id)
    }

    pub fn action_mut(&mut self, id: ActionId) -> Option<&mut Action> {
        self.actions.get_mut(&id)
    }

    pub fn actions(&self) -> impl Iterator<Item = (ActionId, &Action)> {
        self.actions.iter().map(|(id, action)| (*id, action))
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn find_action(&self, name: &str) -> Option<ActionId> {
        self.actions()
            .find(|(_, action)| action.name == name)
            .map(|(id, _)| id)
    }

    /// Deletes an action and every reference to it from animation data.
    pub fn remove_action(&mut self, id: ActionId) -> Option<Action> {
        for object in &mut self.objects {
            if let Some(animation) = object.animation_mut() {
                animation.forget(id);
            }
        }
        self.actions.remove(&id)
    }

    pub fn retain_actions(&mut self, mut keep: impl FnMut(ActionId, &Action) -> bool) {
        let removed: Vec<ActionId> = self
            .actions()
            .filter(|(id, action)| !keep(*id, *action))
            .map(|(id, _)| id)
            .collect();
        for id in removed {
            self.remove_action(id);
        }
    }

    /// Active action of an armature object.
    pub fn active_action(&self, object: usize) -> Option<ActionId> {
        self.objects.get(object)?.animation()?.action
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn removing_an_action_clears_references() {
        let mut scene = Scene::new();
        let death = scene.add_action(Action::new("Death"));
        let idle = scene.add_action(Action::new("Idle"));

        let mut rig = Object::new(
            "Armature",
            ObjectData::Armature {
                armature: Armature::new(),
                animation: AnimationData::default(),
            },
        );
        if let Some(animation) = rig.animation_mut() {
            animation.action = Some(idle);
            animation.push_track("Idle", idle, 0.0);
        }
        let rig = scene.add_object(rig);

        scene.retain_actions(|id, _| id == death);
        assert_eq!(scene.action_count(), 1);
        assert_eq!(scene.active_action(rig), None);
        assert!(scene.objects[rig].animation().unwrap().nla_tracks.is_empty());
        assert_eq!(scene.find_action("Death"), Some(death));
    }

    #[test]
    fn world_matrix_walks_parents() {
        let mut scene = Scene::new();
        let mut root = Object::new("root", ObjectData::Empty);
        root.transform = Transform::from_translation(Vec3::X);
        let root = scene.add_object(root);
        let mut child = Object::new("child", ObjectData::Empty);
        child.parent = Some(root);
        child.transform = Transform::from_translation(Vec3::Y);
        let child = scene.add_object(child);

        assert_eq!(
            scene.world_matrix(child).transform_point3(Vec3::ZERO),
            Vec3::new(1.0, 1.0, 0.0)
        );
        assert_eq!(scene.roots().collect::<Vec<_>>(), vec![root]);
        assert_eq!(scene.children(root).collect::<Vec<_>>(), vec![child]);
    }
}
