//
// animation.rs: Per-frame updates of group node transforms.
//
// An animation node drives exactly one group node. Each tick it reads
// the target's scale/rotation/translation, updates the part it owns,
// and rebuilds the matrix pair from the parameters. Ticks run between
// renders, never during one.
//

use std::f64::consts::PI;

use crate::error::SceneError;
use crate::quaternion::Quat;
use crate::scene::{NodeId, Scene};
use crate::vec4::*;

// Default turn rate of `Rotate`, in radians per second.
pub const ROTATE_RATE: f64 = PI / 6.0;
// Default `Drive` speed, in units per second.
pub const DRIVE_SPEED: f64 = 1.0;
// Default `Jump` arc.
pub const JUMP_DURATION_MS: f64 = 1000.0;
pub const JUMP_AMPLITUDE: f64 = 2.0;
// `Slerp` phase advance per millisecond.
pub const SLERP_RATE: f64 = 0.001;

fn key(pressed: bool) -> f64 {
    if pressed {
        1.0
    } else {
        0.0
    }
}

////////////////////////////////////////////////////////////////////////
// Behaviours
//

// Turn around two axes while keys are held. Yaw is applied in the
// parent's frame and pitch in the target's own frame, so pitching
// never tilts the yaw axis.
#[derive(Clone, Debug, PartialEq)]
pub struct Rotate {
    pub yaw_axis: Dir4,
    pub pitch_axis: Dir4,
    pub rate: f64,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl Default for Rotate {
    fn default() -> Self {
        Rotate {
            yaw_axis: Vec4::dir(0.0, 1.0, 0.0),
            pitch_axis: Vec4::dir(1.0, 0.0, 0.0),
            rate: ROTATE_RATE,
            left: false,
            right: false,
            up: false,
            down: false,
        }
    }
}

// Move along the target's own axes, scale included, while keys are
// held. Forward is local -z. With `relative_to` set, directions are further turned by
// that group's rotation, so a driver on a translation node can follow
// the heading of a rotation node elsewhere.
#[derive(Clone, Debug, PartialEq)]
pub struct Drive {
    pub speed: f64,
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub relative_to: Option<NodeId>,
}

impl Default for Drive {
    fn default() -> Self {
        Drive {
            speed: DRIVE_SPEED,
            forward: false,
            backward: false,
            left: false,
            right: false,
            up: false,
            down: false,
            relative_to: None,
        }
    }
}

impl Drive {
    // Sum of the local unit directions of the held keys.
    fn local_direction(&self) -> Dir4 {
        Vec4::dir(
            key(self.right) - key(self.left),
            key(self.up) - key(self.down),
            key(self.backward) - key(self.forward),
        )
    }
}

// A single arc up and back down along y, started by `trigger`.
#[derive(Clone, Debug, PartialEq)]
pub struct Jump {
    pub duration_ms: f64,
    pub amplitude: f64,
    // Runs from 0 to pi over one jump.
    phase: f64,
    jumping: bool,
    // Height the jump started from. Taken on the first tick of a jump.
    baseline: Option<f64>,
}

impl Default for Jump {
    fn default() -> Self {
        Jump {
            duration_ms: JUMP_DURATION_MS,
            amplitude: JUMP_AMPLITUDE,
            phase: 0.0,
            jumping: false,
            baseline: None,
        }
    }
}

impl Jump {
    // Start a jump. Ignored while one is already under way.
    pub fn trigger(&mut self) {
        if !self.jumping {
            self.jumping = true;
            self.phase = 0.0;
            self.baseline = None;
        }
    }

    pub fn is_jumping(&self) -> bool {
        self.jumping
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }
}

// Oscillate forever between two orientations.
#[derive(Clone, Debug, PartialEq)]
pub struct SlerpRotation {
    pub from: Quat,
    pub to: Quat,
    // Unbounded phase; the blend factor is (sin t + 1) / 2.
    t: f64,
}

impl SlerpRotation {
    pub fn new(from: Quat, to: Quat) -> SlerpRotation {
        SlerpRotation { from, to, t: 0.0 }
    }

    pub fn blend(&self) -> f64 {
        (self.t.sin() + 1.0) * 0.5
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Behaviour {
    Rotate(Rotate),
    Drive(Drive),
    Jump(Jump),
    Slerp(SlerpRotation),
}

////////////////////////////////////////////////////////////////////////
// Animation nodes
//

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationNode {
    // Group node whose transform this animates.
    pub target: NodeId,
    pub active: bool,
    pub behaviour: Behaviour,
}

impl AnimationNode {
    pub fn new(target: NodeId, behaviour: Behaviour) -> AnimationNode {
        AnimationNode {
            target,
            active: true,
            behaviour,
        }
    }

    pub fn toggle_active(&mut self) {
        self.active = !self.active;
    }

    // Advance by `delta_ms` milliseconds of wall-clock time.
    pub fn simulate(&mut self, scene: &mut Scene, delta_ms: f64) -> Result<(), SceneError> {
        if !self.active {
            return Ok(());
        }
        if !delta_ms.is_finite() || delta_ms < 0.0 {
            log::warn!("ignoring time step of {} ms for {}", delta_ms, self.target);
            return Ok(());
        }
        let seconds = delta_ms * 0.001;

        match &mut self.behaviour {
            Behaviour::Rotate(r) => {
                let yaw = r.rate * seconds * (key(r.left) - key(r.right));
                let pitch = r.rate * seconds * (key(r.up) - key(r.down));
                if yaw == 0.0 && pitch == 0.0 {
                    return Ok(());
                }
                let yaw = Quat::from_axis_angle(r.yaw_axis, yaw)?;
                let pitch = Quat::from_axis_angle(r.pitch_axis, pitch)?;

                let transform = scene.transform_mut(self.target)?;
                let (_, rotation, _) = transform.sqt_parts();
                transform.set_rotation(yaw.mul(&rotation).mul(&pitch))?;
            }

            Behaviour::Drive(d) => {
                let local = d.local_direction();
                if local == Vec4::dir(0.0, 0.0, 0.0) || seconds == 0.0 {
                    return Ok(());
                }
                let heading = match d.relative_to {
                    Some(id) => scene.transform(id)?.sqt_parts().1,
                    None => Quat::IDENTITY,
                };

                // The target's own matrix carries its scale as well as
                // its rotation, so a scaled node moves at scaled speed.
                let transform = scene.transform_mut(self.target)?;
                let world = heading.rotate(transform.matrix().mul_vec(local));
                let translation = transform.translation_part();
                transform.set_translation(translation.add(world.scale(d.speed * seconds)));
            }

            Behaviour::Jump(j) => {
                if !j.jumping {
                    return Ok(());
                }
                let transform = scene.transform_mut(self.target)?;
                let mut translation = transform.translation_part();
                let baseline = *j.baseline.get_or_insert(translation.y);

                j.phase += if j.duration_ms > 0.0 {
                    PI * delta_ms / j.duration_ms
                } else {
                    PI
                };
                if j.phase >= PI {
                    translation.y = baseline;
                    j.jumping = false;
                    j.phase = 0.0;
                    j.baseline = None;
                } else {
                    translation.y = baseline + j.phase.sin() * j.amplitude;
                }
                transform.set_translation(translation);
            }

            Behaviour::Slerp(s) => {
                s.t += SLERP_RATE * delta_ms;
                let rotation = s.from.slerp(&s.to, s.blend());
                scene.transform_mut(self.target)?.set_rotation(rotation)?;
            }
        }

        log::trace!("animated {}", self.target);
        Ok(())
    }
}

// One animation pass over all nodes, in order.
pub fn simulate_all(
    animations: &mut [AnimationNode],
    scene: &mut Scene,
    delta_ms: f64,
) -> Result<(), SceneError> {
    for animation in animations.iter_mut() {
        animation.simulate(scene, delta_ms)?;
    }
    Ok(())
}
