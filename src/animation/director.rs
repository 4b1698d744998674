//! The reveal choreography played once the car is loaded.
//!
//! Everything is expressed as one [`Timeline`] whose origin is the moment loading finished:
//!
//! | start                    | what happens                                          |
//! |--------------------------|-------------------------------------------------------|
//! | `0`                      | car spins in from `-8π` and scales up from zero       |
//! | `delay`                  | wheels and underbody drop away, body panels slide out |
//! | `delay + duration`       | everything shifts sideways, engine moves to centre    |
//! | `delay + 2 * duration`   | engine parts spread outwards, camera moves closer     |

use glam::Vec3;

use crate::{
    animation::timeline::{AxisTargets, Channel, Timeline, Tween, TweenTarget},
    config::AnimationConfig,
    parts::PartRefs,
    scene_graph::{ObjectId, Scene},
};

const ENTRANCE_TURNS: f32 = 4.0;

/// Puts the car in its pre-entrance pose: collapsed to a point and wound up.
pub fn prepare_entrance(scene: &mut Scene, parts: &PartRefs) {
    scene.modify_transform(parts.car, |transform| {
        transform.set_scale(Vec3::ZERO);
        let mut rotation = transform.rotation();
        rotation.y = -std::f32::consts::TAU * ENTRANCE_TURNS;
        transform.set_rotation(rotation);
    });
}

pub fn build_reveal_timeline(
    scene: &Scene,
    parts: &PartRefs,
    config: &AnimationConfig,
) -> Timeline {
    let mut timeline = Timeline::new();
    let duration = config.car_outside_duration;

    let translate = |timeline: &mut Timeline, id: ObjectId, to: AxisTargets, delay: f32| {
        timeline.push(Tween::new(
            TweenTarget::Object(id),
            Channel::Translation,
            to,
            delay,
            duration,
        ));
    };

    timeline.push(Tween::new(
        TweenTarget::Object(parts.car),
        Channel::Rotation,
        AxisTargets::y(0.0),
        0.0,
        config.entrance_duration,
    ));
    timeline.push(Tween::new(
        TweenTarget::Object(parts.car),
        Channel::Scale,
        AxisTargets::all(Vec3::ONE),
        0.0,
        config.entrance_duration,
    ));

    let separate = config.car_outside_delay;
    translate(&mut timeline, parts.wheel_front, AxisTargets::y(-5.0), separate);
    translate(&mut timeline, parts.wheel_back, AxisTargets::y(5.0), separate);
    translate(&mut timeline, parts.underbody, AxisTargets::z(-4.0), separate);
    for &panel in &parts.body_panels {
        translate(&mut timeline, panel, AxisTargets::z(4.0), separate);
    }

    let shift = config.car_outside_delay + duration;
    translate(&mut timeline, parts.wheel_front, AxisTargets::x(-5.0), shift);
    translate(&mut timeline, parts.wheel_back, AxisTargets::x(-5.0), shift);
    translate(&mut timeline, parts.underbody, AxisTargets::x(-5.0), shift);
    for &panel in &parts.body_panels {
        translate(&mut timeline, panel, AxisTargets::x(-5.0), shift);
    }
    // Centred with the sideways shift, one step before its parts spread.
    translate(&mut timeline, parts.engine, AxisTargets::all(Vec3::ZERO), shift);

    // Targets come from the positions before anything moved.
    let explode = config.car_outside_delay + 2.0 * duration;
    for &part in &parts.engine_parts {
        let Some(transform) = scene.get_object_transform(part) else {
            continue;
        };
        let target = transform.translation() * config.engine_spread;
        translate(&mut timeline, part, AxisTargets::all(target), explode);
    }
    timeline.push(Tween::new(
        TweenTarget::CameraEye,
        Channel::Translation,
        AxisTargets::all(config.final_camera_eye),
        explode,
        duration,
    ));

    timeline
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::{camera::Camera, config::CameraConfig, parts::tests::car_scene};

    fn reveal() -> (Scene, PartRefs, Timeline) {
        let (mut scene, car) = car_scene(&["piston", "crank"]);
        let parts = PartRefs::resolve(&scene, car).unwrap();
        prepare_entrance(&mut scene, &parts);
        let timeline = build_reveal_timeline(&scene, &parts, &AnimationConfig::default());
        (scene, parts, timeline)
    }

    fn starts_of(timeline: &Timeline, id: ObjectId) -> Vec<(f32, f32)> {
        timeline
            .tweens_for(TweenTarget::Object(id))
            .map(|tween| (tween.delay, tween.duration))
            .collect()
    }

    #[test]
    fn separation_starts_four_units_after_load() {
        let (_, parts, timeline) = reveal();

        for id in [parts.wheel_front, parts.wheel_back, parts.underbody] {
            assert_eq!(starts_of(&timeline, id), [(4.0, 1.0), (5.0, 1.0)]);
        }
        for &panel in &parts.body_panels {
            assert_eq!(starts_of(&timeline, panel), [(4.0, 1.0), (5.0, 1.0)]);
        }
        assert_eq!(starts_of(&timeline, parts.engine), [(5.0, 1.0)]);
    }

    #[test]
    fn engine_is_centred_before_its_parts_spread() {
        let (_, parts, timeline) = reveal();

        let centring = timeline
            .tweens_for(TweenTarget::Object(parts.engine))
            .collect::<Vec<_>>();
        assert_eq!(centring.len(), 1);
        assert_eq!(centring[0].to, AxisTargets::all(Vec3::ZERO));
        assert_eq!(centring[0].end(), 6.0);

        for &part in &parts.engine_parts {
            assert_eq!(starts_of(&timeline, part), [(6.0, 1.0)]);
        }
    }

    #[test]
    fn engine_parts_spread_by_five_at_six_units() {
        let (scene, parts, timeline) = reveal();

        for &part in &parts.engine_parts {
            let original = scene.get_object_transform(part).unwrap().translation();
            let tweens = timeline
                .tweens_for(TweenTarget::Object(part))
                .collect::<Vec<_>>();

            assert_eq!(tweens.len(), 1);
            assert_eq!(tweens[0].delay, 6.0);
            assert_eq!(tweens[0].duration, 1.0);
            assert_eq!(tweens[0].to, AxisTargets::all(original * 5.0));
        }
    }

    #[test]
    fn camera_glides_in_with_the_explosion() {
        let (_, _, timeline) = reveal();
        let camera = timeline
            .tweens_for(TweenTarget::CameraEye)
            .collect::<Vec<_>>();

        assert_eq!(camera.len(), 1);
        assert_eq!(camera[0].delay, 6.0);
        assert_eq!(camera[0].to, AxisTargets::all(Vec3::splat(2.0)));
        assert_eq!(timeline.duration(), 7.0);
    }

    #[test]
    fn finished_reveal_reaches_final_pose() {
        let (mut scene, parts, mut timeline) = reveal();
        let mut camera = Camera::from_config(&CameraConfig::default(), Vec2::new(16.0, 9.0));
        let piston_start = scene
            .get_object_transform(parts.engine_parts[0])
            .unwrap()
            .translation();

        let mut time = 0.0;
        while !timeline.is_finished() {
            time += 1.0 / 60.0;
            timeline.advance(time, &mut scene, &mut camera);
        }

        let car = scene.get_object_transform(parts.car).unwrap();
        assert_eq!(car.scale(), Vec3::ONE);
        assert_eq!(car.rotation().y, 0.0);

        let wheel = scene.get_object_transform(parts.wheel_front).unwrap();
        assert_eq!(wheel.translation(), Vec3::new(-5.0, -5.0, 0.0));

        let underbody = scene.get_object_transform(parts.underbody).unwrap();
        assert_eq!(underbody.translation(), Vec3::new(-5.0, 0.0, -4.0));

        let piston = scene
            .get_object_transform(parts.engine_parts[0])
            .unwrap()
            .translation();
        assert_eq!(piston, piston_start * 5.0);
        assert_eq!(camera.eye, Vec3::splat(2.0));
    }

    #[test]
    fn nothing_separates_before_the_delay() {
        let (mut scene, parts, mut timeline) = reveal();
        let mut camera = Camera::from_config(&CameraConfig::default(), Vec2::new(16.0, 9.0));

        timeline.advance(3.9, &mut scene, &mut camera);

        let wheel = scene.get_object_transform(parts.wheel_front).unwrap();
        assert_eq!(wheel.translation(), Vec3::ZERO);
        assert_eq!(camera.eye, Vec3::splat(4.0));
    }
}
