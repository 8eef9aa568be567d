//! Sleep/wake policy: bodies that stay nearly still for long enough stop
//! integrating until something disturbs them.

use crate::body::Body;
use crate::collision::pairs::PairsRegistry;
use std::collections::HashMap;

/// Motion below this EMA value is considered "at rest" for sleep-counter
/// purposes.
const MOTION_SLEEP_THRESHOLD: f64 = 0.08;

/// Updates every body's motion EMA and sleep counter for one step, putting
/// bodies to sleep once their counter crosses `sleep_threshold / ts`.
pub fn update(bodies: &mut [&mut Body], delta: f64, base_delta: f64, enabled: bool) {
    if !enabled {
        return;
    }

    let ts = delta / base_delta;

    for body in bodies.iter_mut() {
        if body.is_static {
            continue;
        }

        let new_motion = body.speed * body.speed + body.angular_speed * body.angular_speed;

        if body.force.x != 0.0 || body.force.y != 0.0 || body.torque != 0.0 {
            wake(body);
            continue;
        }

        body.motion = 0.9 * body.motion.min(new_motion) + 0.1 * body.motion.max(new_motion);

        if body.motion < MOTION_SLEEP_THRESHOLD {
            body.sleep_counter += 1;
            let threshold = (body.sleep_threshold as f64 / ts.max(1e-9)).ceil() as u32;
            if body.sleep_counter >= threshold {
                put_to_sleep(body);
            }
        } else if body.sleep_counter > 0 {
            body.sleep_counter -= 1;
        }
    }
}

fn put_to_sleep(body: &mut Body) {
    if body.is_sleeping {
        return;
    }
    body.is_sleeping = true;
    body.position_impulse = crate::vector::Vector2::zero();
    body.position_prev = body.position;
    body.angle_prev = body.angle;
    body.velocity = crate::vector::Vector2::zero();
    body.angular_velocity = 0.0;
    body.speed = 0.0;
    body.angular_speed = 0.0;
    body.motion = 0.0;
    tracing::debug!(id = body.id, "body asleep");
}

fn wake(body: &mut Body) {
    if body.is_sleeping {
        tracing::debug!(id = body.id, "body woke");
    }
    body.is_sleeping = false;
    body.sleep_counter = 0;
}

/// After collision processing, wakes a sleeping body in an active pair
/// when its non-sleeping partner is still in active motion.
pub fn after_collisions(bodies: &mut [&mut Body], pairs: &PairsRegistry) {
    let motions: HashMap<u64, (bool, bool, f64)> =
        bodies.iter().map(|b| (b.id, (b.is_static, b.is_sleeping, b.motion))).collect();

    let mut to_wake = Vec::new();
    for key in &pairs.list {
        let Some(pair) = pairs.table.get(key) else { continue };
        if !pair.is_active {
            continue;
        }
        let Some(&(static_a, sleeping_a, motion_a)) = motions.get(&pair.body_a) else { continue };
        let Some(&(static_b, sleeping_b, motion_b)) = motions.get(&pair.body_b) else { continue };

        if static_a || static_b {
            continue;
        }
        if sleeping_a == sleeping_b {
            continue;
        }

        if sleeping_a && motion_b > MOTION_SLEEP_THRESHOLD {
            to_wake.push(pair.body_a);
        } else if sleeping_b && motion_a > MOTION_SLEEP_THRESHOLD {
            to_wake.push(pair.body_b);
        }
    }

    for body in bodies.iter_mut() {
        if to_wake.contains(&body.id) {
            wake(body);
        }
    }
}
