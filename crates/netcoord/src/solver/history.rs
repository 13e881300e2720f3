use crate::geom::Point;

/// The last three iterates of every node's coordinate.
///
/// After [`History::rotate`] the oldest slot becomes [`History::current_mut`] and is meant to be
/// overwritten with the next iterate; [`History::previous`] and [`History::before_previous`] are
/// the two most recent completed iterates.
#[derive(Debug, Clone)]
pub struct History {
    slots: [Vec<Point>; 3],
    head: usize,
}

impl History {
    /// Starts with `initial` replicated into all three slots.
    pub fn new(initial: Vec<Point>) -> Self {
        Self {
            slots: [initial.clone(), initial.clone(), initial],
            head: 0,
        }
    }

    pub fn rotate(&mut self) {
        self.head = (self.head + 1) % 3;
    }

    pub fn current(&self) -> &[Point] {
        &self.slots[self.head]
    }

    pub fn current_mut(&mut self) -> &mut [Point] {
        &mut self.slots[self.head]
    }

    pub fn previous(&self) -> &[Point] {
        &self.slots[(self.head + 2) % 3]
    }

    pub fn before_previous(&self) -> &[Point] {
        &self.slots[(self.head + 1) % 3]
    }

    pub fn into_current(self) -> Vec<Point> {
        let [a, b, c] = self.slots;
        match self.head {
            0 => a,
            1 => b,
            _ => c,
        }
    }
}
