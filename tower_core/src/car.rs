//! Elevator car data model. Nothing here schedules trips; the camera only
//! reads `current_floor`.

use crate::FloorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Toward higher floor identifiers, i.e. the top of the stack.
    #[default]
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rider {
    pub id: u64,
    pub origin: FloorId,
    pub destination: FloorId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarState {
    pub current_floor: Option<FloorId>,
    pub direction: Direction,
    pub riders: Vec<Rider>,
    pub capacity: u32,
}

impl CarState {
    pub fn new(capacity: u32) -> Self {
        Self {
            current_floor: None,
            direction: Direction::default(),
            riders: Vec::new(),
            capacity,
        }
    }
}
