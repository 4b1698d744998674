use std::time::Instant;

use crate::viewer::ViewerState;

/// One frame of simulation: loader, animation and transform propagation.
pub fn update(state: &mut ViewerState, now: Instant) {
    state.update(now);
    state.scene.late_update();
}
