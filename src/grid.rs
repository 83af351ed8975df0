use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::error::{SimulationError, SimulationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

impl Cell {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Group label carried by an agent, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Race(u16);

impl Race {
    pub const fn new(label: u16) -> Self {
        Self(label)
    }

    pub fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Occupied neighbors of an agent, split by whether they share its label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeighborCounts {
    pub similar: u32,
    pub different: u32,
}

impl NeighborCounts {
    pub fn total(&self) -> u32 {
        self.similar + self.different
    }

    /// `None` when the agent has no occupied neighbor at all.
    pub fn similar_ratio(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.similar as f64 / total as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPlacement {
    pub x: u32,
    pub y: u32,
    pub race: u16,
}

/// Read-only copy of the agent layout handed to renderers and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSnapshot {
    pub width: u32,
    pub height: u32,
    pub race_count: u16,
    pub agents: Vec<AgentPlacement>,
}

/// The grid and its partition into empty and occupied cells.
///
/// Labels are stored densely in row-major order. Empty cells are kept in a
/// list together with a per-cell slot index so a uniformly random empty cell
/// can be picked and removed in constant time.
#[derive(Debug, Clone)]
pub struct GridPopulation {
    width: u32,
    height: u32,
    race_count: u16,
    empty_ratio: f64,
    similarity_threshold: f64,
    labels: Vec<Option<Race>>,
    empty: Vec<Cell>,
    empty_slots: Vec<Option<usize>>,
}

impl GridPopulation {
    /// Validates `config` and builds a grid whose cells are all empty.
    /// Call [`populate`](Self::populate) to place agents.
    pub fn new(config: &SimulationConfig) -> SimulationResult<Self> {
        config.validate()?;
        let total = config.total_cells();
        let mut population = Self {
            width: config.width,
            height: config.height,
            race_count: config.race_count,
            empty_ratio: config.empty_ratio,
            similarity_threshold: config.similarity_threshold,
            labels: vec![None; total],
            empty: Vec::with_capacity(total),
            empty_slots: vec![None; total],
        };
        population.reset();
        Ok(population)
    }

    /// Builds a grid with agents at explicit positions; every other cell is
    /// empty. `config.empty_ratio` is kept but not applied.
    pub fn from_layout(
        config: &SimulationConfig,
        agents: impl IntoIterator<Item = (Cell, Race)>,
    ) -> SimulationResult<Self> {
        let mut population = Self::new(config)?;
        for (cell, race) in agents {
            if race.raw() == 0 || race.raw() > population.race_count {
                return Err(SimulationError::Configuration(format!(
                    "race {race} at {cell} outside 1..={}",
                    population.race_count
                )));
            }
            let offset = population.checked_offset(cell)?;
            let slot = population.empty_slots[offset].ok_or_else(|| {
                SimulationError::Configuration(format!("cell {cell} placed more than once"))
            })?;
            population.remove_empty_slot(slot);
            population.labels[offset] = Some(race);
        }
        Ok(population)
    }

    /// Shuffles every cell, leaves the first `floor(empty_ratio * total)`
    /// empty and deals the rest round-robin to races `1..=race_count`.
    pub fn populate<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let mut cells: Vec<Cell> = (0..self.width)
            .flat_map(|x| (0..self.height).map(move |y| Cell::new(x, y)))
            .collect();
        cells.shuffle(rng);

        let n_empty = (self.empty_ratio * cells.len() as f64).floor() as usize;
        let (empty, remaining) = cells.split_at(n_empty.min(cells.len()));

        self.labels.fill(None);
        self.empty_slots.fill(None);
        self.empty.clear();
        for &cell in empty {
            self.push_empty(cell);
        }
        let races = self.race_count as usize;
        for (i, &cell) in remaining.iter().enumerate() {
            let offset = self.offset(cell);
            self.labels[offset] = Some(Race::new((i % races) as u16 + 1));
        }
    }

    pub fn neighborhood(&self, cell: Cell) -> SimulationResult<NeighborCounts> {
        let race = self.occupant(cell, "satisfaction queried on an empty cell")?;
        let mut counts = NeighborCounts::default();
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = cell.x as i64 + dx;
                let ny = cell.y as i64 + dy;
                if nx < 0 || ny < 0 || nx >= self.width as i64 || ny >= self.height as i64 {
                    continue;
                }
                match self.labels[self.offset(Cell::new(nx as u32, ny as u32))] {
                    Some(other) if other == race => counts.similar += 1,
                    Some(_) => counts.different += 1,
                    None => {}
                }
            }
        }
        Ok(counts)
    }

    /// An agent with no occupied neighbor is always satisfied; otherwise it
    /// is unsatisfied when its similar share falls strictly below the
    /// threshold.
    pub fn is_unsatisfied(&self, cell: Cell) -> SimulationResult<bool> {
        let counts = self.neighborhood(cell)?;
        Ok(counts
            .similar_ratio()
            .is_some_and(|ratio| ratio < self.similarity_threshold))
    }

    pub fn relocate(&mut self, cell: Cell, destination: Cell) -> SimulationResult<()> {
        let from = self.checked_offset(cell)?;
        let to = self.checked_offset(destination)?;
        let race = self.occupant(cell, "relocation source is empty")?;
        let slot = self.empty_slots[to].ok_or(SimulationError::InvalidState {
            cell: destination,
            reason: "relocation target is occupied",
        })?;

        self.remove_empty_slot(slot);
        self.labels[to] = Some(race);
        self.labels[from] = None;
        self.push_empty(cell);
        Ok(())
    }

    pub fn random_empty_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> SimulationResult<Cell> {
        self.empty
            .choose(rng)
            .copied()
            .ok_or(SimulationError::Exhausted)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn race_count(&self) -> u16 {
        self.race_count
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    pub fn total_cells(&self) -> usize {
        self.labels.len()
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    pub fn label(&self, cell: Cell) -> Option<Race> {
        if self.contains(cell) {
            self.labels[self.offset(cell)]
        } else {
            None
        }
    }

    pub fn is_empty(&self, cell: Cell) -> bool {
        self.contains(cell) && self.empty_slots[self.offset(cell)].is_some()
    }

    pub fn empty_cells(&self) -> &[Cell] {
        &self.empty
    }

    pub fn empty_count(&self) -> usize {
        self.empty.len()
    }

    pub fn occupied_count(&self) -> usize {
        self.labels.len() - self.empty.len()
    }

    /// Occupied cells with their labels, in row-major order.
    pub fn occupied_cells(&self) -> Vec<(Cell, Race)> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(offset, label)| label.map(|race| (self.cell_at(offset), race)))
            .collect()
    }

    /// Agents per race; index 0 holds race 1.
    pub fn race_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.race_count as usize];
        for race in self.labels.iter().flatten() {
            counts[race.raw() as usize - 1] += 1;
        }
        counts
    }

    pub fn unsatisfied_count(&self) -> SimulationResult<usize> {
        let mut count = 0;
        for (cell, _) in self.occupied_cells() {
            if self.is_unsatisfied(cell)? {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn snapshot(&self) -> PopulationSnapshot {
        PopulationSnapshot {
            width: self.width,
            height: self.height,
            race_count: self.race_count,
            agents: self
                .occupied_cells()
                .into_iter()
                .map(|(cell, race)| AgentPlacement {
                    x: cell.x,
                    y: cell.y,
                    race: race.raw(),
                })
                .collect(),
        }
    }

    fn reset(&mut self) {
        self.labels.fill(None);
        self.empty_slots.fill(None);
        self.empty.clear();
        for offset in 0..self.labels.len() {
            let cell = self.cell_at(offset);
            self.push_empty(cell);
        }
    }

    fn occupant(&self, cell: Cell, reason: &'static str) -> SimulationResult<Race> {
        let offset = self.checked_offset(cell)?;
        self.labels[offset].ok_or(SimulationError::InvalidState { cell, reason })
    }

    fn checked_offset(&self, cell: Cell) -> SimulationResult<usize> {
        if self.contains(cell) {
            Ok(self.offset(cell))
        } else {
            Err(SimulationError::InvalidState {
                cell,
                reason: "cell lies outside the grid",
            })
        }
    }

    fn offset(&self, cell: Cell) -> usize {
        cell.y as usize * self.width as usize + cell.x as usize
    }

    fn cell_at(&self, offset: usize) -> Cell {
        let width = self.width as usize;
        Cell::new((offset % width) as u32, (offset / width) as u32)
    }

    fn push_empty(&mut self, cell: Cell) {
        let offset = self.offset(cell);
        self.empty_slots[offset] = Some(self.empty.len());
        self.empty.push(cell);
    }

    fn remove_empty_slot(&mut self, slot: usize) {
        let removed = self.empty.swap_remove(slot);
        let removed_offset = self.offset(removed);
        self.empty_slots[removed_offset] = None;
        if let Some(&moved) = self.empty.get(slot) {
            let moved_offset = self.offset(moved);
            self.empty_slots[moved_offset] = Some(slot);
        }
    }
}
