//! Fixed-timestep ball and paddle simulation
//!
//! Everything here is a pure function of the incoming state, the buffered
//! paddle commands, and the injected random-number source. No I/O, no
//! clocks: one call to [`advance`] is exactly one logical tick, whether the
//! driving timer fired on time or late.

use rand::Rng;
use shared::{
    Ball, GameState, Paddles, Scores, Slot, BALL_RADIUS, BALL_SPEED, BALL_SPIN, FIELD_HEIGHT,
    FIELD_WIDTH, PADDLE_HEIGHT, PADDLE_MARGIN, PADDLE_SPEED, PADDLE_THICKNESS, WIN_SCORE,
};

/// Buffered paddle input, at most one command per slot per tick.
///
/// Moves arriving between ticks overwrite each other; only the latest per
/// paddle is honored at the next tick boundary.
#[derive(Debug, Default, Clone, Copy)]
pub struct PaddleCommands {
    slot_a: Option<i8>,
    slot_b: Option<i8>,
}

impl PaddleCommands {
    /// Records a move for the slot, replacing any earlier one this tick.
    /// Directions outside `{-1, 0, 1}` are clamped.
    pub fn set(&mut self, slot: Slot, direction: i8) {
        let direction = direction.clamp(-1, 1);
        match slot {
            Slot::A => self.slot_a = Some(direction),
            Slot::B => self.slot_b = Some(direction),
        }
    }

    pub fn get(&self, slot: Slot) -> Option<i8> {
        match slot {
            Slot::A => self.slot_a,
            Slot::B => self.slot_b,
        }
    }

    pub fn clear(&mut self) {
        *self = PaddleCommands::default();
    }

    pub fn is_empty(&self) -> bool {
        self.slot_a.is_none() && self.slot_b.is_none()
    }
}

/// Builds the serve configuration that opens every rally run: centered
/// ball with a random horizontal direction and a bounded random vertical
/// velocity, centered paddles, zero scores, simulation active.
pub fn serve<R: Rng>(rng: &mut R) -> GameState {
    GameState {
        ball: serve_ball(rng),
        paddles: Paddles::centered(),
        scores: Scores::default(),
        active: true,
        winner: None,
    }
}

/// Advances the simulation by exactly one tick.
///
/// Order per tick: paddle commands, ball integration, wall bounce, paddle
/// collision per slot, scoring, win check. A tick on an inactive state is
/// a no-op, so a stray tick after a win or a disconnect cannot mutate
/// anything.
pub fn advance<R: Rng>(state: &mut GameState, commands: &PaddleCommands, rng: &mut R) {
    if !state.active {
        return;
    }

    apply_paddle_commands(&mut state.paddles, commands);

    state.ball.x += state.ball.dx;
    state.ball.y += state.ball.dy;

    bounce_walls(&mut state.ball);
    collide_paddle(&mut state.ball, &state.paddles, Slot::A);
    collide_paddle(&mut state.ball, &state.paddles, Slot::B);
    apply_scoring(state, rng);
    check_win(state);
}

fn apply_paddle_commands(paddles: &mut Paddles, commands: &PaddleCommands) {
    for slot in [Slot::A, Slot::B] {
        if let Some(direction) = commands.get(slot) {
            let offset = paddles.offset_mut(slot);
            *offset = (*offset + direction as f32 * PADDLE_SPEED)
                .clamp(0.0, FIELD_HEIGHT - PADDLE_HEIGHT);
        }
    }
}

/// Top/bottom wall bounce: clamp the ball back inside the playfield and
/// flip the vertical velocity exactly once. Clamping keeps a fast ball
/// from tunneling further out on consecutive ticks.
fn bounce_walls(ball: &mut Ball) {
    if ball.y < BALL_RADIUS {
        ball.y = BALL_RADIUS;
        ball.dy = -ball.dy;
    } else if ball.y > FIELD_HEIGHT - BALL_RADIUS {
        ball.y = FIELD_HEIGHT - BALL_RADIUS;
        ball.dy = -ball.dy;
    }
}

fn paddle_band(slot: Slot) -> (f32, f32) {
    match slot {
        Slot::A => (PADDLE_MARGIN, PADDLE_MARGIN + PADDLE_THICKNESS),
        Slot::B => (
            FIELD_WIDTH - PADDLE_MARGIN - PADDLE_THICKNESS,
            FIELD_WIDTH - PADDLE_MARGIN,
        ),
    }
}

/// Ball-paddle collision for one slot.
///
/// On contact the horizontal velocity is forced away from the paddle at
/// the fixed base speed regardless of incoming speed, and the vertical
/// velocity is recomputed from where on the paddle the ball hit, giving
/// the player directional control. The ball is snapped just outside the
/// paddle face so the same contact cannot re-trigger next tick.
fn collide_paddle(ball: &mut Ball, paddles: &Paddles, slot: Slot) {
    let (band_left, band_right) = paddle_band(slot);
    let top = paddles.offset(slot);

    let overlaps_band = ball.x - BALL_RADIUS <= band_right && ball.x + BALL_RADIUS >= band_left;
    let overlaps_span =
        ball.y + BALL_RADIUS >= top && ball.y - BALL_RADIUS <= top + PADDLE_HEIGHT;

    if !overlaps_band || !overlaps_span {
        return;
    }

    let hit_ratio = (ball.y - top) / PADDLE_HEIGHT;
    ball.dy = (hit_ratio - 0.5) * BALL_SPIN;

    match slot {
        Slot::A => {
            ball.dx = BALL_SPEED;
            ball.x = band_right + BALL_RADIUS;
        }
        Slot::B => {
            ball.dx = -BALL_SPEED;
            ball.x = band_left - BALL_RADIUS;
        }
    }
}

/// A point is scored when the ball has passed fully beyond a side
/// boundary. The win check runs in the same tick, so a tick can score and
/// end the game at once.
fn apply_scoring<R: Rng>(state: &mut GameState, rng: &mut R) {
    if state.ball.x + BALL_RADIUS < 0.0 {
        *state.scores.get_mut(Slot::B) += 1;
        state.ball = reset_ball(Slot::B, rng);
    } else if state.ball.x - BALL_RADIUS > FIELD_WIDTH {
        *state.scores.get_mut(Slot::A) += 1;
        state.ball = reset_ball(Slot::A, rng);
    }
}

fn check_win(state: &mut GameState) {
    for slot in [Slot::A, Slot::B] {
        if state.scores.get(slot) >= WIN_SCORE {
            state.active = false;
            state.winner = Some(slot);
            return;
        }
    }
}

fn serve_ball<R: Rng>(rng: &mut R) -> Ball {
    let dx = if rng.gen_bool(0.5) {
        BALL_SPEED
    } else {
        -BALL_SPEED
    };

    Ball {
        x: FIELD_WIDTH / 2.0,
        y: FIELD_HEIGHT / 2.0,
        dx,
        dy: random_vertical(rng),
    }
}

/// Center-court reset after a point, served away from the scorer's side.
fn reset_ball<R: Rng>(scorer: Slot, rng: &mut R) -> Ball {
    let dx = match scorer {
        Slot::A => BALL_SPEED,
        Slot::B => -BALL_SPEED,
    };

    Ball {
        x: FIELD_WIDTH / 2.0,
        y: FIELD_HEIGHT / 2.0,
        dx,
        dy: random_vertical(rng),
    }
}

fn random_vertical<R: Rng>(rng: &mut R) -> f32 {
    (rng.gen::<f32>() - 0.5) * BALL_SPEED
}
