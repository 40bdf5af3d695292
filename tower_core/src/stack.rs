//! Ordered floor stack, highest identifier on top.

use std::collections::{HashMap, VecDeque};

use crate::{
    FloorId, assets,
    car::{Direction, Rider},
    config::FloorConfig,
    surface::RenderSurface,
};

/// Riders waiting on a floor. Empty at creation; dispatch code fills it.
pub type RiderQueue = VecDeque<Rider>;

/// A floor record with its background resolved to a concrete path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloorSpec {
    pub id: FloorId,
    pub background: String,
}

impl FloorSpec {
    pub fn normalize(floor: &FloorConfig) -> Self {
        Self {
            id: floor.id,
            background: floor
                .background
                .clone()
                .unwrap_or_else(|| assets::default_background(floor.id)),
        }
    }
}

#[derive(Debug)]
pub struct FloorEntry<N> {
    pub spec: FloorSpec,
    pub node: N,
    pub queue: RiderQueue,
}

#[derive(Debug)]
pub struct FloorStack<N> {
    entries: Vec<FloorEntry<N>>,
    ordered_ids: Vec<FloorId>,
    positions: HashMap<FloorId, usize>,
}

impl<N> Default for FloorStack<N> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            ordered_ids: Vec::new(),
            positions: HashMap::new(),
        }
    }
}

impl<N> FloorStack<N> {
    /// Build the stack from configuration, replacing every node the surface held.
    ///
    /// Identifiers are expected to be unique (the config loader enforces it).
    /// If duplicates slip through anyway, lookups resolve to the first one in
    /// stack order, matching a linear search over `ordered_ids`.
    pub fn build<S>(floors: &[FloorConfig], surface: &mut S) -> Self
    where
        S: RenderSurface<Node = N> + ?Sized,
    {
        let mut specs: Vec<FloorSpec> = floors.iter().map(FloorSpec::normalize).collect();
        specs.sort_by(|a, b| b.id.cmp(&a.id));

        surface.clear_floors();

        let mut stack = Self {
            entries: Vec::with_capacity(specs.len()),
            ordered_ids: Vec::with_capacity(specs.len()),
            positions: HashMap::with_capacity(specs.len()),
        };
        for spec in specs {
            let node = surface.create_floor_node(&spec);
            log::debug!("[stack] added floor {} -> {}", spec.id, spec.background);
            let position = stack.entries.len();
            if stack.positions.contains_key(&spec.id) {
                log::warn!("[stack] duplicate floor id {}; lookups keep the first entry", spec.id);
            } else {
                stack.positions.insert(spec.id, position);
            }
            stack.ordered_ids.push(spec.id);
            stack.entries.push(FloorEntry {
                spec,
                node,
                queue: RiderQueue::new(),
            });
        }
        log::info!("[stack] built {} floors", stack.len());
        stack
    }

    /// Floor identifiers from top to bottom.
    pub fn ordered_ids(&self) -> &[FloorId] {
        &self.ordered_ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Row of `id` counted from the top of the stack.
    pub fn index_of(&self, id: FloorId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    pub fn entry(&self, id: FloorId) -> Option<&FloorEntry<N>> {
        self.index_of(id).map(|index| &self.entries[index])
    }

    pub fn top(&self) -> Option<FloorId> {
        self.ordered_ids.first().copied()
    }

    pub fn bottom(&self) -> Option<FloorId> {
        self.ordered_ids.last().copied()
    }

    /// Neighbouring floor in `direction`, if the stack continues that way.
    pub fn neighbor(&self, id: FloorId, direction: Direction) -> Option<FloorId> {
        let index = self.index_of(id)?;
        let next = match direction {
            Direction::Up => index.checked_sub(1)?,
            Direction::Down => index + 1,
        };
        self.ordered_ids.get(next).copied()
    }

    /// Entries from top to bottom.
    pub fn iter(&self) -> impl Iterator<Item = &FloorEntry<N>> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{RecordingSurface, SurfaceCall};

    fn floors(ids: &[FloorId]) -> Vec<FloorConfig> {
        ids.iter()
            .map(|&id| FloorConfig {
                id,
                background: None,
            })
            .collect()
    }

    #[test]
    fn sorts_highest_identifier_first() {
        let mut surface = RecordingSurface::new(600.0, 1.0);
        let stack = FloorStack::build(&floors(&[2, 5, 1, 4, 3]), &mut surface);
        assert_eq!(stack.ordered_ids(), &[5, 4, 3, 2, 1]);
        assert_eq!(stack.len(), 5);
        assert_eq!(stack.top(), Some(5));
        assert_eq!(stack.bottom(), Some(1));
        assert_eq!(stack.index_of(3), Some(2));
        assert_eq!(stack.index_of(9), None);

        let created: Vec<FloorId> = surface.floors().iter().map(|floor| floor.id).collect();
        assert_eq!(created, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn defaults_backgrounds_and_starts_with_empty_queues() {
        let mut surface = RecordingSurface::new(600.0, 1.0);
        let config = vec![
            FloorConfig {
                id: 1,
                background: Some("custom/lobby.jpg".to_string()),
            },
            FloorConfig {
                id: 2,
                background: None,
            },
        ];
        let stack = FloorStack::build(&config, &mut surface);

        let lobby = stack.entry(1).expect("floor 1");
        assert_eq!(lobby.spec.background, "custom/lobby.jpg");
        assert_eq!(lobby.node, 1);
        let second = stack.entry(2).expect("floor 2");
        assert_eq!(second.spec.background, "assets/floors/floor2.png");
        assert!(stack.iter().all(|entry| entry.queue.is_empty()));
    }

    #[test]
    fn empty_input_yields_empty_stack() {
        let mut surface = RecordingSurface::new(600.0, 1.0);
        let stack: FloorStack<usize> = FloorStack::build(&[], &mut surface);
        assert!(stack.is_empty());
        assert_eq!(stack.top(), None);
        assert_eq!(surface.calls(), &[SurfaceCall::ClearFloors]);
    }

    #[test]
    fn rebuild_replaces_prior_nodes() {
        let mut surface = RecordingSurface::new(600.0, 1.0);
        let _first = FloorStack::build(&floors(&[1, 2, 3]), &mut surface);
        let second = FloorStack::build(&floors(&[7, 8]), &mut surface);
        assert_eq!(surface.floors().len(), 2);
        assert_eq!(second.entry(8).map(|entry| entry.node), Some(0));
    }

    #[test]
    fn neighbors_follow_stack_order() {
        let mut surface = RecordingSurface::new(600.0, 1.0);
        let stack = FloorStack::build(&floors(&[1, 2, 3]), &mut surface);
        assert_eq!(stack.neighbor(2, Direction::Up), Some(3));
        assert_eq!(stack.neighbor(2, Direction::Down), Some(1));
        assert_eq!(stack.neighbor(3, Direction::Up), None);
        assert_eq!(stack.neighbor(1, Direction::Down), None);
        assert_eq!(stack.neighbor(42, Direction::Down), None);
    }

    #[test]
    fn duplicate_ids_resolve_to_first_in_stack_order() {
        let mut surface = RecordingSurface::new(600.0, 1.0);
        let config = vec![
            FloorConfig {
                id: 4,
                background: Some("a.png".to_string()),
            },
            FloorConfig {
                id: 4,
                background: Some("b.png".to_string()),
            },
        ];
        let stack = FloorStack::build(&config, &mut surface);
        assert_eq!(stack.ordered_ids(), &[4, 4]);
        assert_eq!(stack.index_of(4), Some(0));
        assert_eq!(stack.entry(4).map(|entry| entry.spec.background.as_str()), Some("a.png"));
    }
}
