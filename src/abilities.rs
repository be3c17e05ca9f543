//! The classic moveset.
//!
//! Each ability is a plain struct implementing [`Move`]. Register them on a
//! [`MoveSet`](crate::moves::MoveSet) individually, or take all of them with
//! [`MoveSet::standard`](crate::moves::MoveSet::standard).

use bevy::prelude::*;

use crate::config::ControllerConfig;
use crate::math;
use crate::moves::{Move, MoveContext, MoveLayer};
use crate::resolver;
use crate::state::CharacterBody;

/// Input acceleration and braking on the ground.
///
/// Directional input is ignored while the body's horizontal lock is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroundControl;

impl Move for GroundControl {
    fn name(&self) -> &'static str {
        "ground_control"
    }

    fn layer(&self) -> MoveLayer {
        MoveLayer::Control
    }

    fn should_perform(&self, ctx: &MoveContext) -> bool {
        ctx.body.grounded
    }

    fn should_end(&self, ctx: &MoveContext) -> bool {
        !ctx.body.grounded
    }

    fn on_active_fixed_update(&mut self, ctx: &mut MoveContext) {
        let body = &mut *ctx.body;
        // A jump earlier in the tick may have already left the ground.
        if body.horizontal_lock || !body.grounded {
            return;
        }
        let input = ctx.intent.horizontal_sign();
        if input == 0.0 {
            return;
        }

        let params = body.params;
        if body.ground_velocity * input < 0.0 {
            body.ground_velocity += input * params.deceleration * ctx.scale;
        } else if body.ground_velocity.abs() < params.top_speed {
            body.ground_velocity = (body.ground_velocity + input * params.acceleration * ctx.scale)
                .clamp(-params.top_speed, params.top_speed);
        }
        body.sync_velocity_from_ground();
    }
}

/// Input acceleration and drag in the air.
#[derive(Debug, Clone, Copy, Default)]
pub struct AirControl;

impl Move for AirControl {
    fn name(&self) -> &'static str {
        "air_control"
    }

    fn layer(&self) -> MoveLayer {
        MoveLayer::Control
    }

    fn should_perform(&self, ctx: &MoveContext) -> bool {
        !ctx.body.grounded
    }

    fn should_end(&self, ctx: &MoveContext) -> bool {
        ctx.body.grounded
    }

    fn on_active_fixed_update(&mut self, ctx: &mut MoveContext) {
        let config = ctx.config;
        let body = &mut *ctx.body;
        let input = ctx.intent.horizontal_sign();
        let top_speed = body.params.top_speed;

        if input != 0.0 && (body.velocity.x * input < 0.0 || body.velocity.x.abs() < top_speed) {
            let vx = body.velocity.x + input * body.params.air_acceleration * ctx.scale;
            body.velocity.x = if vx.abs() > top_speed && vx * input > 0.0 {
                top_speed * input
            } else {
                vx
            };
        }

        let vy = body.velocity.y;
        if vy > 0.0 && vy < config.air_drag_max_rise && body.velocity.x.abs() >= config.air_drag_min_speed {
            body.velocity.x *= config.air_drag.powf(ctx.scale);
        }
    }
}

/// Jump off the current surface.
///
/// Releasing the button early caps the upward speed, which gives variable
/// jump height. Unavailable while ducking at a standstill, where the press
/// charges a spindash instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jump;

impl Move for Jump {
    fn name(&self) -> &'static str {
        "jump"
    }

    fn layer(&self) -> MoveLayer {
        MoveLayer::Action
    }

    fn available(&self, ctx: &MoveContext) -> bool {
        !(ctx.intent.down() && ctx.body.ground_velocity.abs() <= ctx.config.spindash_max_start_speed)
    }

    fn should_perform(&self, ctx: &MoveContext) -> bool {
        ctx.body.grounded && ctx.intent.jump_pressed()
    }

    fn should_end(&self, ctx: &MoveContext) -> bool {
        ctx.body.grounded && !ctx.body.just_jumped
    }

    fn on_active_enter(&mut self, ctx: &mut MoveContext) {
        resolver::jump(ctx.body, ctx.config, ctx.observer);
    }

    fn on_active_fixed_update(&mut self, ctx: &mut MoveContext) {
        let body = &mut *ctx.body;
        if !body.grounded && !ctx.intent.jump_held {
            body.velocity.y = body.velocity.y.min(ctx.config.jump_release_speed);
        }
    }
}

/// Move the body along its own up axis, keeping the feet where they are when
/// the hitbox height changes.
fn resize_hitbox(body: &mut CharacterBody, half_height: f32) {
    let change = body.params.hitbox.half_height - half_height;
    body.position -= math::rotate_by(Vec2::Y, body.rotation) * change;
}

/// Curl into a ball while moving.
///
/// Shrinks the hitbox and swaps in roll friction, braking and slope gravity.
/// Input no longer accelerates.
#[derive(Debug, Clone, Copy, Default)]
pub struct Roll;

impl Roll {
    fn restore(body: &mut CharacterBody, config: &ControllerConfig) {
        resize_hitbox(body, config.hitbox.half_height);
        let params = &mut body.params;
        params.hitbox = config.hitbox;
        params.acceleration = config.acceleration;
        params.friction = config.friction;
        params.deceleration = config.deceleration;
        params.slope_gravity_uphill = config.slope_gravity;
        params.slope_gravity_downhill = config.slope_gravity;
    }
}

impl Move for Roll {
    fn name(&self) -> &'static str {
        "roll"
    }

    fn layer(&self) -> MoveLayer {
        MoveLayer::Roll
    }

    fn should_perform(&self, ctx: &MoveContext) -> bool {
        ctx.body.grounded
            && ctx.intent.down()
            && !ctx.intent.has_horizontal()
            && ctx.body.ground_velocity.abs() >= ctx.config.min_roll_speed
    }

    fn should_end(&self, ctx: &MoveContext) -> bool {
        ctx.body.grounded && ctx.body.ground_velocity.abs() < ctx.config.unroll_speed
    }

    fn on_active_enter(&mut self, ctx: &mut MoveContext) {
        let config = ctx.config;
        let body = &mut *ctx.body;
        resize_hitbox(body, config.roll_hitbox.half_height);
        let params = &mut body.params;
        params.hitbox = config.roll_hitbox;
        params.acceleration = 0.0;
        params.friction = config.roll_friction;
        params.deceleration = config.roll_deceleration;
        params.slope_gravity_uphill = config.roll_slope_gravity_uphill;
        params.slope_gravity_downhill = config.roll_slope_gravity_downhill;
    }

    fn on_active_fixed_update(&mut self, ctx: &mut MoveContext) {
        // The integrator skips friction while input is held; rolling does not.
        let body = &mut *ctx.body;
        if body.grounded && ctx.intent.has_horizontal() && !body.horizontal_lock {
            body.ground_velocity =
                math::approach_zero(body.ground_velocity, body.params.friction * ctx.scale);
            body.sync_velocity_from_ground();
        }
    }

    fn on_active_exit(&mut self, ctx: &mut MoveContext) {
        Roll::restore(ctx.body, ctx.config);
    }
}

/// Charge in place while ducking, then launch.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spindash {
    /// Current charge.
    pub charge: f32,
    primed: bool,
}

impl Move for Spindash {
    fn name(&self) -> &'static str {
        "spindash"
    }

    fn layer(&self) -> MoveLayer {
        MoveLayer::Action
    }

    fn should_perform(&self, ctx: &MoveContext) -> bool {
        ctx.body.grounded
            && ctx.intent.down()
            && ctx.intent.jump_pressed()
            && ctx.body.ground_velocity.abs() <= ctx.config.spindash_max_start_speed
    }

    fn should_end(&self, ctx: &MoveContext) -> bool {
        !ctx.intent.down() || !ctx.body.grounded
    }

    fn on_active_enter(&mut self, ctx: &mut MoveContext) {
        self.charge = 0.0;
        self.primed = false;
        ctx.body.ground_velocity = 0.0;
        ctx.body.sync_velocity_from_ground();
    }

    fn on_active_update(&mut self, ctx: &mut MoveContext) {
        // The press that started the dash does not count as charge.
        if self.primed && ctx.intent.jump_pressed() {
            self.charge = (self.charge + ctx.config.spindash_charge_per_press)
                .min(ctx.config.spindash_max_charge);
        }
        self.primed = true;
    }

    fn on_active_fixed_update(&mut self, ctx: &mut MoveContext) {
        self.charge *= ctx.config.spindash_charge_decay.powf(ctx.scale);
        ctx.body.ground_velocity = 0.0;
        ctx.body.sync_velocity_from_ground();
    }

    fn on_active_exit(&mut self, ctx: &mut MoveContext) {
        let body = &mut *ctx.body;
        if !body.grounded {
            return;
        }
        let speed = ctx.config.spindash_base_speed + self.charge / 2.0;
        body.ground_velocity = if body.facing_right { speed } else { -speed };
        body.sync_velocity_from_ground();
        debug!("spindash released at {:.3}", body.ground_velocity);
        self.charge = 0.0;
    }
}
