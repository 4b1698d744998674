use glam::Vec3;

use crate::{
    animation::ease::power1_out,
    camera::Camera,
    scene_graph::{ObjectId, Scene},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenTarget {
    Object(ObjectId),
    CameraEye,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Translation,
    Rotation,
    Scale,
}

/// Destination value per axis. Axes left as `None` are not touched by the tween.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisTargets(pub [Option<f32>; 3]);

impl AxisTargets {
    pub fn x(value: f32) -> Self {
        Self([Some(value), None, None])
    }

    pub fn y(value: f32) -> Self {
        Self([None, Some(value), None])
    }

    pub fn z(value: f32) -> Self {
        Self([None, None, Some(value)])
    }

    pub fn all(value: Vec3) -> Self {
        Self([Some(value.x), Some(value.y), Some(value.z)])
    }

    /// Overlays the targeted axes onto `base`.
    pub fn resolve(&self, base: Vec3) -> Vec3 {
        let [x, y, z] = self.0;
        Vec3::new(
            x.unwrap_or(base.x),
            y.unwrap_or(base.y),
            z.unwrap_or(base.z),
        )
    }

    fn merge_into(&self, current: Vec3, value: Vec3) -> Vec3 {
        let mut result = current;
        for axis in 0..3 {
            if self.0[axis].is_some() {
                result[axis] = value[axis];
            }
        }
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TweenState {
    Pending,
    Running { from: Vec3 },
    Done,
}

#[derive(Debug, Clone)]
pub struct Tween {
    pub target: TweenTarget,
    pub channel: Channel,
    pub to: AxisTargets,
    /// Start time relative to the timeline origin.
    pub delay: f32,
    pub duration: f32,
    state: TweenState,
}

impl Tween {
    pub fn new(
        target: TweenTarget,
        channel: Channel,
        to: AxisTargets,
        delay: f32,
        duration: f32,
    ) -> Self {
        Self {
            target,
            channel,
            to,
            delay,
            duration,
            state: TweenState::Pending,
        }
    }

    pub fn end(&self) -> f32 {
        self.delay + self.duration.max(0.0)
    }

    pub fn is_done(&self) -> bool {
        self.state == TweenState::Done
    }

    fn progress(&self, time: f32) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (time - self.delay) / self.duration
        }
    }

    fn advance(&mut self, time: f32, scene: &mut Scene, camera: &mut Camera) {
        if time < self.delay || self.is_done() {
            return;
        }

        let Some(current) = read_channel(self.target, self.channel, scene, camera) else {
            // Target vanished from the scene; nothing left to animate.
            self.state = TweenState::Done;
            return;
        };

        let from = match self.state {
            TweenState::Running { from } => from,
            _ => current,
        };

        let progress = self.progress(time);
        let destination = self.to.resolve(from);
        let value = if progress >= 1.0 {
            destination
        } else {
            from.lerp(destination, power1_out(progress))
        };

        write_channel(
            self.target,
            self.channel,
            self.to.merge_into(current, value),
            scene,
            camera,
        );

        self.state = if progress >= 1.0 {
            TweenState::Done
        } else {
            TweenState::Running { from }
        };
    }
}

/// An ordered list of tweens sharing one time origin. Tweens are advanced in insertion order,
/// so when two of them drive the same axis at once, the later one wins.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    tweens: Vec<Tween>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tween: Tween) {
        self.tweens.push(tween);
    }

    #[cfg(test)]
    pub(crate) fn tweens_for(&self, target: TweenTarget) -> impl Iterator<Item = &Tween> {
        self.tweens
            .iter()
            .filter(move |tween| tween.target == target)
    }

    pub fn duration(&self) -> f32 {
        self.tweens.iter().map(Tween::end).fold(0.0, f32::max)
    }

    pub fn is_finished(&self) -> bool {
        self.tweens.iter().all(Tween::is_done)
    }

    /// `time` is measured from the timeline origin.
    pub fn advance(&mut self, time: f32, scene: &mut Scene, camera: &mut Camera) {
        for tween in &mut self.tweens {
            tween.advance(time, scene, camera);
        }
    }
}

fn read_channel(
    target: TweenTarget,
    channel: Channel,
    scene: &Scene,
    camera: &Camera,
) -> Option<Vec3> {
    match target {
        TweenTarget::CameraEye => Some(camera.eye),
        TweenTarget::Object(object_id) => {
            let transform = scene.get_object_transform(object_id)?;
            Some(match channel {
                Channel::Translation => transform.translation(),
                Channel::Rotation => transform.rotation(),
                Channel::Scale => transform.scale(),
            })
        }
    }
}

fn write_channel(
    target: TweenTarget,
    channel: Channel,
    value: Vec3,
    scene: &mut Scene,
    camera: &mut Camera,
) {
    match target {
        TweenTarget::CameraEye => camera.eye = value,
        TweenTarget::Object(object_id) => {
            scene.modify_transform(object_id, |transform| match channel {
                Channel::Translation => transform.set_translation(value),
                Channel::Rotation => transform.set_rotation(value),
                Channel::Scale => transform.set_scale(value),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::{config::CameraConfig, scene_graph::Object3D};

    fn setup() -> (Scene, Camera, ObjectId) {
        let mut scene = Scene::new();
        let mut object = Object3D::named("box");
        object.transform.set_translation(Vec3::new(1.0, 2.0, 3.0));
        let object_id = scene.add_object(object);
        let camera = Camera::from_config(&CameraConfig::default(), Vec2::new(4.0, 3.0));
        (scene, camera, object_id)
    }

    fn translation(scene: &Scene, id: ObjectId) -> Vec3 {
        scene.get_object_transform(id).unwrap().translation()
    }

    #[test]
    fn tween_waits_for_its_delay() {
        let (mut scene, mut camera, id) = setup();
        let mut timeline = Timeline::new();
        timeline.push(Tween::new(
            TweenTarget::Object(id),
            Channel::Translation,
            AxisTargets::y(-5.0),
            4.0,
            1.0,
        ));

        timeline.advance(3.99, &mut scene, &mut camera);
        assert_eq!(translation(&scene, id), Vec3::new(1.0, 2.0, 3.0));

        timeline.advance(4.5, &mut scene, &mut camera);
        let halfway = translation(&scene, id);
        assert!(halfway.y < 2.0 && halfway.y > -5.0);

        timeline.advance(5.0, &mut scene, &mut camera);
        assert_eq!(translation(&scene, id), Vec3::new(1.0, -5.0, 3.0));
        assert!(timeline.is_finished());
    }

    #[test]
    fn only_named_axes_move() {
        let (mut scene, mut camera, id) = setup();
        let mut timeline = Timeline::new();
        timeline.push(Tween::new(
            TweenTarget::Object(id),
            Channel::Translation,
            AxisTargets::x(-5.0),
            0.0,
            1.0,
        ));

        // Halfway through power1.out covers three quarters of the distance.
        timeline.advance(0.5, &mut scene, &mut camera);
        let moved = translation(&scene, id);
        assert!((moved.x + 3.5).abs() < 1e-5);
        assert_eq!((moved.y, moved.z), (2.0, 3.0));
    }

    #[test]
    fn start_value_is_captured_on_activation() {
        let (mut scene, mut camera, id) = setup();
        let mut timeline = Timeline::new();
        timeline.push(Tween::new(
            TweenTarget::Object(id),
            Channel::Translation,
            AxisTargets::z(10.0),
            1.0,
            2.0,
        ));

        // Moved by someone else before the tween begins.
        scene.modify_transform(id, |transform| {
            transform.set_translation(Vec3::new(1.0, 2.0, 0.0))
        });

        timeline.advance(2.0, &mut scene, &mut camera);
        assert!((translation(&scene, id).z - 7.5).abs() < 1e-5);
    }

    #[test]
    fn sequential_tweens_chain_on_the_same_object() {
        let (mut scene, mut camera, id) = setup();
        let mut timeline = Timeline::new();
        timeline.push(Tween::new(
            TweenTarget::Object(id),
            Channel::Translation,
            AxisTargets::y(-5.0),
            0.0,
            1.0,
        ));
        timeline.push(Tween::new(
            TweenTarget::Object(id),
            Channel::Translation,
            AxisTargets::x(-5.0),
            1.0,
            1.0,
        ));

        // A single large step still applies both in order.
        timeline.advance(10.0, &mut scene, &mut camera);
        assert_eq!(translation(&scene, id), Vec3::new(-5.0, -5.0, 3.0));
        assert_eq!(timeline.duration(), 2.0);
    }

    #[test]
    fn camera_eye_can_be_animated() {
        let (mut scene, mut camera, _) = setup();
        let mut timeline = Timeline::new();
        timeline.push(Tween::new(
            TweenTarget::CameraEye,
            Channel::Translation,
            AxisTargets::all(Vec3::splat(2.0)),
            0.0,
            1.0,
        ));

        timeline.advance(1.0, &mut scene, &mut camera);
        assert_eq!(camera.eye, Vec3::splat(2.0));
    }

    #[test]
    fn zero_duration_tween_jumps_to_target() {
        let (mut scene, mut camera, id) = setup();
        let mut timeline = Timeline::new();
        timeline.push(Tween::new(
            TweenTarget::Object(id),
            Channel::Scale,
            AxisTargets::all(Vec3::ZERO),
            0.0,
            0.0,
        ));

        timeline.advance(0.0, &mut scene, &mut camera);
        assert_eq!(scene.get_object_transform(id).unwrap().scale(), Vec3::ZERO);
    }
}
