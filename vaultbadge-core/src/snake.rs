//! Snake minigame state machine
//!
//! Runs on a 64x32 cell grid (the renderer doubles cells up to pixels).
//! Body segments live in a fixed ring buffer. Timing comes from a
//! free-running tick counter tested with bit masks; that cadence is only
//! "every K ticks" for mask values of the form 2^n - 1, and it is an
//! observable gameplay property - keep the masks, do not switch to modulo.

use nanorand::{Rng, WyRand};

/// Playable grid, in cells
pub const GRID_WIDTH: i8 = 64;
pub const GRID_HEIGHT: i8 = 32;

/// Hard cap on body segments; growth past this is silently refused
pub const MAX_SEGMENTS: usize = 16;
/// Apple slots; all slots occupied at spawn time ends the session
pub const MAX_APPLES: usize = 8;
/// Segments after a reset
pub const START_SEGMENTS: usize = 3;

const START_SPEED_MASK: u8 = 0x5;

/// One grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cell {
    pub x: i8,
    pub y: i8,
}

/// Facing direction; changes take effect on the next advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CrashCause {
    Wall,
    SelfHit,
    AppleOverflow,
}

/// What one tick did, for LED and display feedback
#[derive(Debug, Clone, Copy, Default)]
pub struct TickOutcome {
    pub apple_spawned: bool,
    pub ate: bool,
    pub ended: Option<CrashCause>,
}

/// The running snake session
pub struct SnakeGame {
    body: [Cell; MAX_SEGMENTS],
    head: usize,
    len: usize,
    dir: Direction,
    apples: [Option<Cell>; MAX_APPLES],
    ticks: u8,
    speed_mask: u8,
    score: u16,
    rng: WyRand,
}

impl SnakeGame {
    pub fn new(seed: u64) -> Self {
        let mut game = Self {
            body: [Cell::default(); MAX_SEGMENTS],
            head: 0,
            len: 0,
            dir: Direction::Right,
            apples: [None; MAX_APPLES],
            ticks: 0,
            speed_mask: START_SPEED_MASK,
            score: 0,
            rng: WyRand::new_seed(seed),
        };
        game.reset();
        game
    }

    /// Reinitialize to the starting layout: three segments centered,
    /// facing right, base speed, zero score.
    pub fn reset(&mut self) {
        self.apples = [None; MAX_APPLES];
        let cx = GRID_WIDTH / 2;
        let cy = GRID_HEIGHT / 2;
        self.body[0] = Cell { x: cx, y: cy };
        self.body[1] = Cell { x: cx + 1, y: cy };
        self.body[2] = Cell { x: cx + 2, y: cy };
        self.head = START_SEGMENTS - 1;
        self.len = START_SEGMENTS;
        self.dir = Direction::Right;
        self.ticks = 0;
        self.speed_mask = START_SPEED_MASK;
        self.score = 0;
    }

    pub fn score(&self) -> u16 {
        self.score
    }

    /// Current body length in segments
    pub fn segments(&self) -> usize {
        self.len
    }

    pub fn speed_mask(&self) -> u8 {
        self.speed_mask
    }

    pub fn direction(&self) -> Direction {
        self.dir
    }

    /// Steer the snake; takes effect on the next advance
    pub fn set_direction(&mut self, dir: Direction) {
        self.dir = dir;
    }

    /// Body cells, head first
    pub fn body(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.len).map(move |i| self.body[self.ring_index(i)])
    }

    /// Apples currently on the board
    pub fn apples(&self) -> impl Iterator<Item = Cell> + '_ {
        self.apples.iter().filter_map(|a| *a)
    }

    fn ring_index(&self, back: usize) -> usize {
        (self.head + MAX_SEGMENTS - back) % MAX_SEGMENTS
    }

    fn head_cell(&self) -> Cell {
        self.body[self.head]
    }

    /// Run one timer tick
    pub fn tick(&mut self) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        self.ticks = self.ticks.wrapping_add(1);
        let t = self.ticks;

        // Every 64 ticks, drop a new apple on the board
        if t & 0x3f == 0x3f {
            match self.apples.iter().position(|a| a.is_none()) {
                Some(slot) => {
                    // No occupancy check: an apple may land on another apple
                    // or on the snake itself. Tolerated.
                    let x = self.rng.generate_range(0..GRID_WIDTH as u8) as i8;
                    let y = self.rng.generate_range(0..GRID_HEIGHT as u8) as i8;
                    self.apples[slot] = Some(Cell { x, y });
                    outcome.apple_spawned = true;
                }
                None => {
                    outcome.ended = Some(CrashCause::AppleOverflow);
                    return outcome;
                }
            }
        }

        // Movement fires whenever the counter clears the speed mask
        if t & self.speed_mask == 0 {
            let mut next = self.head_cell();
            match self.dir {
                Direction::Up => {
                    next.y -= 1;
                    if next.y < 0 {
                        outcome.ended = Some(CrashCause::Wall);
                        return outcome;
                    }
                }
                Direction::Down => {
                    next.y += 1;
                    if next.y >= GRID_HEIGHT {
                        outcome.ended = Some(CrashCause::Wall);
                        return outcome;
                    }
                }
                Direction::Left => {
                    next.x -= 1;
                    if next.x <= 0 {
                        outcome.ended = Some(CrashCause::Wall);
                        return outcome;
                    }
                }
                Direction::Right => {
                    next.x += 1;
                    if next.x >= GRID_WIDTH - 1 {
                        outcome.ended = Some(CrashCause::Wall);
                        return outcome;
                    }
                }
            }

            // New head against every segment behind the current head
            for back in 1..self.len {
                if self.body[self.ring_index(back)] == next {
                    outcome.ended = Some(CrashCause::SelfHit);
                    return outcome;
                }
            }

            self.head = (self.head + 1) % MAX_SEGMENTS;
            self.body[self.head] = next;

            // Eat any apples sitting on the new head
            for slot in self.apples.iter_mut() {
                if *slot == Some(next) {
                    *slot = None;
                    outcome.ate = true;
                    if self.len < MAX_SEGMENTS {
                        self.len += 1;
                    }
                    self.score += 1;
                    if self.score > 10 {
                        self.speed_mask = 0x3;
                    }
                    if self.score > 25 {
                        self.speed_mask = 0x1;
                    }
                }
            }
        }

        outcome
    }

    #[cfg(test)]
    pub(crate) fn set_score(&mut self, score: u16) {
        self.score = score;
    }

    #[cfg(test)]
    fn place_apple(&mut self, cell: Cell) {
        let slot = self
            .apples
            .iter()
            .position(|a| a.is_none())
            .expect("no free apple slot");
        self.apples[slot] = Some(cell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> SnakeGame {
        SnakeGame::new(0x1234_5678)
    }

    fn head(game: &SnakeGame) -> Cell {
        game.body().next().unwrap()
    }

    #[test]
    fn test_reset_layout() {
        let g = game();
        assert_eq!(g.segments(), START_SEGMENTS);
        assert_eq!(g.score(), 0);
        assert_eq!(g.speed_mask(), 0x5);
        assert_eq!(g.direction(), Direction::Right);
        assert_eq!(head(&g), Cell { x: 34, y: 16 });
        assert_eq!(g.apples().count(), 0);
    }

    #[test]
    fn test_movement_cadence_follows_mask() {
        let mut g = game();
        let start = head(&g);
        // Ticks 1 and 2: 1 & 0x5 == 1 (no move), 2 & 0x5 == 0 (move)
        g.tick();
        assert_eq!(head(&g), start);
        g.tick();
        assert_eq!(head(&g), Cell { x: start.x + 1, y: start.y });
    }

    #[test]
    fn test_growth_caps_at_max_segments_and_score_keeps_counting() {
        let mut g = game();
        // Feed an apple directly ahead of the head before every tick; each
        // advance eats it. 26 eats crosses both speed thresholds and runs
        // well past the growth cap without reaching the right wall.
        while g.score() < 26 {
            let h = head(&g);
            let ahead = Cell { x: h.x + 1, y: h.y };
            if !g.apples().any(|a| a == ahead) {
                g.place_apple(ahead);
            }
            let outcome = g.tick();
            assert!(outcome.ended.is_none());
            // Growth tracks score until the cap, then stops silently
            assert_eq!(
                g.segments(),
                (START_SEGMENTS + g.score() as usize).min(MAX_SEGMENTS)
            );
        }
        assert_eq!(g.segments(), MAX_SEGMENTS);
        assert!(g.score() >= 26);
        assert_eq!(g.speed_mask(), 0x1);
    }

    #[test]
    fn test_speed_thresholds() {
        let mut g = game();
        while g.score() <= 10 {
            let h = head(&g);
            let ahead = Cell { x: h.x + 1, y: h.y };
            if !g.apples().any(|a| a == ahead) {
                g.place_apple(ahead);
            }
            g.tick();
        }
        assert_eq!(g.speed_mask(), 0x3);
    }

    #[test]
    fn test_wall_collision_ends_session() {
        let mut g = game();
        let mut ended = None;
        for _ in 0..1000 {
            if let Some(cause) = g.tick().ended {
                ended = Some(cause);
                break;
            }
        }
        // Driving right unsteered always reaches the wall
        assert_eq!(ended, Some(CrashCause::Wall));

        // Score survives until the caller resets
        g.reset();
        assert_eq!(g.segments(), START_SEGMENTS);
        assert_eq!(g.score(), 0);
    }

    // Tick until the snake advances one cell, or the session ends
    fn tick_until_move(g: &mut SnakeGame) -> Option<CrashCause> {
        let before = head(g);
        loop {
            let outcome = g.tick();
            if outcome.ended.is_some() {
                return outcome.ended;
            }
            if head(g) != before {
                return None;
            }
        }
    }

    #[test]
    fn test_self_collision_ends_session() {
        let mut g = game();
        // Grow to a length where a tight turn bites the body
        while g.score() < 5 {
            let h = head(&g);
            let ahead = Cell { x: h.x + 1, y: h.y };
            if !g.apples().any(|a| a == ahead) {
                g.place_apple(ahead);
            }
            g.tick();
        }
        // A U-turn: down, left, then up runs the head into the body
        g.set_direction(Direction::Down);
        assert_eq!(tick_until_move(&mut g), None);
        g.set_direction(Direction::Left);
        assert_eq!(tick_until_move(&mut g), None);
        g.set_direction(Direction::Up);
        assert_eq!(tick_until_move(&mut g), Some(CrashCause::SelfHit));
    }

    #[test]
    fn test_apple_overflow_is_fatal() {
        let mut g = game();
        for i in 0..MAX_APPLES {
            g.place_apple(Cell {
                x: 1 + i as i8,
                y: 1,
            });
        }
        // Walk ticks forward to the next spawn boundary; the board is full,
        // so the spawn attempt ends the session
        let mut ended = None;
        for _ in 0..64 {
            let outcome = g.tick();
            if outcome.ended.is_some() {
                ended = outcome.ended;
                break;
            }
        }
        assert_eq!(ended, Some(CrashCause::AppleOverflow));
    }

    #[test]
    fn test_direction_change_applies_on_next_advance() {
        let mut g = game();
        g.set_direction(Direction::Up);
        let start = head(&g);
        g.tick(); // tick 1, no move
        assert_eq!(head(&g), start);
        g.tick(); // tick 2, move fires upward
        assert_eq!(head(&g), Cell { x: start.x, y: start.y - 1 });
    }
}
