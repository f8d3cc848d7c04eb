//! Property tweens driven by the frame loop.

use crate::scene::{NodeId, SceneGraph};
use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn get(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    fn set(self, v: &mut Vec3, value: f32) {
        match self {
            Axis::X => v.x = value,
            Axis::Y => v.y = value,
            Axis::Z => v.z = value,
        }
    }
}

/// One scalar component of a node transform. Rotation is Euler radians.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatedProperty {
    Position(Axis),
    Rotation(Axis),
}

impl AnimatedProperty {
    pub fn read(self, scene: &SceneGraph, target: NodeId) -> Option<f32> {
        let transform = &scene.node(target)?.transform;
        Some(match self {
            Self::Position(axis) => axis.get(transform.position),
            Self::Rotation(axis) => axis.get(transform.rotation),
        })
    }

    /// Returns false when `target` is gone.
    pub fn write(self, scene: &mut SceneGraph, target: NodeId, value: f32) -> bool {
        let Some(node) = scene.node_mut(target) else {
            return false;
        };
        let transform = &mut node.transform;
        match self {
            Self::Position(axis) => axis.set(&mut transform.position, value),
            Self::Rotation(axis) => axis.set(&mut transform.rotation, value),
        }
        true
    }
}

/// Something that can interpolate a node property over time.
pub trait Animator {
    fn animate(
        &mut self,
        target: NodeId,
        property: AnimatedProperty,
        from: f32,
        to: f32,
        duration_secs: f32,
    );
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Tween {
    target: NodeId,
    property: AnimatedProperty,
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
}

impl Tween {
    fn value(&self) -> f32 {
        let t = if self.duration > 0.0 {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.from + (self.to - self.from) * ease_out_quad(t)
    }

    fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }
}

fn ease_out_quad(t: f32) -> f32 {
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Tween runner. A new tween on a property that is already animating
/// replaces the running one.
#[derive(Debug, Default)]
pub struct Tweener {
    tweens: Vec<Tween>,
}

impl Tweener {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn active(&self) -> usize {
        self.tweens.len()
    }

    #[cfg(test)]
    pub fn is_animating(&self, target: NodeId, property: AnimatedProperty) -> bool {
        self.tweens
            .iter()
            .any(|tween| tween.target == target && tween.property == property)
    }

    /// Advances every tween by `dt` seconds and writes the eased values.
    /// Tweens whose target vanished are dropped.
    pub fn update(&mut self, dt: f32, scene: &mut SceneGraph) {
        self.tweens.retain_mut(|tween| {
            tween.elapsed += dt.max(0.0);
            if !tween.property.write(scene, tween.target, tween.value()) {
                return false;
            }
            !tween.is_done()
        });
    }
}

impl Animator for Tweener {
    fn animate(
        &mut self,
        target: NodeId,
        property: AnimatedProperty,
        from: f32,
        to: f32,
        duration_secs: f32,
    ) {
        self.tweens
            .retain(|tween| !(tween.target == target && tween.property == property));
        self.tweens.push(Tween {
            target,
            property,
            from,
            to,
            duration: duration_secs.max(0.0),
            elapsed: 0.0,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Node, NodeKind};

    fn scene_with_node() -> (SceneGraph, NodeId) {
        let mut scene = SceneGraph::new();
        let id = scene.add(Node::new("Target", NodeKind::Group));
        (scene, id)
    }

    #[test]
    fn tween_reaches_exact_end_value() {
        let (mut scene, id) = scene_with_node();
        let mut tweener = Tweener::new();
        tweener.animate(id, AnimatedProperty::Rotation(Axis::Y), 0.0, 2.0, 1.0);

        for _ in 0..30 {
            tweener.update(1.0 / 60.0, &mut scene);
        }
        let midway = AnimatedProperty::Rotation(Axis::Y).read(&scene, id).unwrap();
        assert!(midway > 1.0 && midway < 2.0, "ease-out passes halfway early");

        for _ in 0..40 {
            tweener.update(1.0 / 60.0, &mut scene);
        }
        assert_eq!(AnimatedProperty::Rotation(Axis::Y).read(&scene, id), Some(2.0));
        assert_eq!(tweener.active(), 0);
    }

    #[test]
    fn retargeting_replaces_running_tween() {
        let (mut scene, id) = scene_with_node();
        let mut tweener = Tweener::new();
        tweener.animate(id, AnimatedProperty::Position(Axis::X), 0.0, 1.0, 1.0);
        tweener.animate(id, AnimatedProperty::Position(Axis::X), 0.0, 5.0, 1.0);
        tweener.animate(id, AnimatedProperty::Position(Axis::Y), 0.0, 1.0, 1.0);
        assert_eq!(tweener.active(), 2);

        tweener.update(2.0, &mut scene);
        assert_eq!(AnimatedProperty::Position(Axis::X).read(&scene, id), Some(5.0));
        assert_eq!(AnimatedProperty::Position(Axis::Y).read(&scene, id), Some(1.0));
    }

    #[test]
    fn zero_duration_jumps_to_end() {
        let (mut scene, id) = scene_with_node();
        let mut tweener = Tweener::new();
        tweener.animate(id, AnimatedProperty::Rotation(Axis::Z), 0.0, 3.0, 0.0);
        tweener.update(0.0, &mut scene);
        assert_eq!(AnimatedProperty::Rotation(Axis::Z).read(&scene, id), Some(3.0));
        assert!(!tweener.is_animating(id, AnimatedProperty::Rotation(Axis::Z)));
    }
}
