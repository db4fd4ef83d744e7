use std::collections::BTreeMap;

use crate::error::{Result, RuntimeError};
use crate::object::{AtomRole, ObjectId};
use crate::runtime::Runtime;

/// A map position. Components are 1-based; ordering is z, then y, then x.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coord {
    pub z: u32,
    pub y: u32,
    pub x: u32,
}

impl Coord {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Coord { z, y, x }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapCell {
    pub turf: Option<ObjectId>,
    pub area: Option<ObjectId>,
    /// Movables standing on the turf, in arrival order.
    pub movables: Vec<ObjectId>,
}

/// The world grid.
#[derive(Debug, Default)]
pub struct MapStore {
    cells: BTreeMap<Coord, MapCell>,
    size: (u32, u32, u32),
    default_area: Option<ObjectId>,
}

impl MapStore {
    pub fn size(&self) -> (u32, u32, u32) {
        self.size
    }

    pub fn cell(&self, coord: Coord) -> Option<&MapCell> {
        self.cells.get(&coord)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&Coord, &MapCell)> {
        self.cells.iter()
    }

    pub fn turf_at(&self, coord: Coord) -> Option<ObjectId> {
        self.cell(coord).and_then(|c| c.turf)
    }

    pub fn area_at(&self, coord: Coord) -> Option<ObjectId> {
        self.cell(coord).and_then(|c| c.area)
    }

    pub fn default_area(&self) -> Option<ObjectId> {
        self.default_area
    }

    /// Coordinates of every cell in `area`, in map order.
    pub fn cells_in_area(&self, area: ObjectId) -> Vec<Coord> {
        self.cells
            .iter()
            .filter(|(_, cell)| cell.area == Some(area))
            .map(|(coord, _)| *coord)
            .collect()
    }

    pub(crate) fn set_default_area(&mut self, area: ObjectId) {
        self.default_area = Some(area);
    }

    pub(crate) fn set_size(&mut self, size: (u32, u32, u32)) {
        self.size = size;
    }

    /// Put `turf` at `coord`, returning the turf it replaced. New cells join the default area.
    pub(crate) fn set_turf(&mut self, coord: Coord, turf: ObjectId) -> Option<ObjectId> {
        let default_area = self.default_area;
        let cell = self.cells.entry(coord).or_insert_with(|| MapCell {
            area: default_area,
            ..MapCell::default()
        });
        cell.turf.replace(turf)
    }

    pub(crate) fn clear_turf(&mut self, coord: Coord, turf: ObjectId) {
        if let Some(cell) = self.cells.get_mut(&coord) {
            if cell.turf == Some(turf) {
                cell.turf = None;
            }
        }
    }

    pub(crate) fn remove_cell(&mut self, coord: Coord) -> Option<MapCell> {
        self.cells.remove(&coord)
    }

    pub(crate) fn set_area(&mut self, coord: Coord, area: Option<ObjectId>) {
        if let Some(cell) = self.cells.get_mut(&coord) {
            cell.area = area;
        }
    }

    pub(crate) fn add_movable(&mut self, coord: Coord, movable: ObjectId) {
        if let Some(cell) = self.cells.get_mut(&coord) {
            cell.movables.push(movable);
        }
    }

    pub(crate) fn take_movables(&mut self, coord: Coord) -> Vec<ObjectId> {
        self.cells
            .get_mut(&coord)
            .map(|cell| std::mem::take(&mut cell.movables))
            .unwrap_or_default()
    }

    pub(crate) fn remove_movable(&mut self, coord: Coord, movable: ObjectId) {
        if let Some(cell) = self.cells.get_mut(&coord) {
            cell.movables.retain(|m| *m != movable);
        }
    }
}

impl Runtime {
    /// Where a turf sits on the map.
    pub fn turf_coord(&self, turf: ObjectId) -> Option<Coord> {
        let object = self.object(turf).ok()?;
        match object.atom()?.role {
            AtomRole::Turf(coord) => Some(coord),
            _ => None,
        }
    }

    /// The map position of an atom: a turf's own, a movable's outermost turf, an area's first
    /// cell.
    pub fn atom_coord(&self, atom: ObjectId) -> Option<Coord> {
        let object = self.object(atom).ok()?;
        match object.atom()?.role {
            AtomRole::Turf(coord) => Some(coord),
            AtomRole::Area => self.map.cells_in_area(atom).first().copied(),
            AtomRole::Movable => self.atom_coord(object.atom()?.loc()?),
            AtomRole::Image => None,
        }
    }

    /// Move a movable into a turf, into another movable, or off the map.
    ///
    /// Keeps the map cells and movable child lists in sync with each movable's `loc`.
    pub fn set_loc(&mut self, movable: ObjectId, loc: Option<ObjectId>) -> Result<()> {
        let object = self.object(movable)?;
        let atom = match object.atom() {
            Some(atom) if atom.role == AtomRole::Movable => atom,
            _ => {
                return Err(RuntimeError::TypeCast {
                    value: object.def.path.to_string(),
                    expected: "movable",
                })
            }
        };
        if atom.loc() == loc {
            return Ok(());
        }

        if let Some(target) = loc {
            let target_object = self.object(target)?;
            match target_object.atom().map(|a| a.role) {
                Some(AtomRole::Turf(_)) => {}
                Some(AtomRole::Movable) => {
                    let mut container = Some(target);
                    while let Some(c) = container {
                        if c == movable {
                            return Err(RuntimeError::invalid_arguments(
                                "a movable cannot be placed inside itself",
                            ));
                        }
                        container = self.object(c).ok().and_then(|o| o.atom()?.loc());
                    }
                }
                _ => {
                    return Err(RuntimeError::invalid_arguments(format!(
                        "{} is not a valid loc",
                        target_object.def.path
                    )))
                }
            }
        }

        if let Some(old) = atom.loc() {
            self.detach_from(old, movable);
        }
        if let Some(new) = loc {
            let container = self.object(new)?;
            match container.atom().map(|a| a.role) {
                Some(AtomRole::Turf(coord)) => self.map.add_movable(coord, movable),
                Some(_) => {
                    if let Some(c) = container.atom() {
                        c.children_mut().push(movable);
                    }
                }
                None => {}
            }
        }
        atom.set_loc(loc);
        tracing::trace!(?movable, ?loc, "moved");
        Ok(())
    }

    pub(crate) fn detach_from(&mut self, container: ObjectId, movable: ObjectId) {
        let object = match self.object(container) {
            Ok(object) => object,
            Err(_) => return,
        };
        match object.atom() {
            Some(atom) => match atom.role {
                AtomRole::Turf(coord) => self.map.remove_movable(coord, movable),
                _ => atom.children_mut().retain(|c| *c != movable),
            },
            None => {}
        }
    }

    /// Reassign the cell of `turf` to `area`.
    pub fn set_turf_area(&mut self, turf: ObjectId, area: ObjectId) -> Result<()> {
        let coord = self.turf_coord(turf).ok_or_else(|| RuntimeError::TypeCast {
            value: format!("{:?}", turf),
            expected: "turf",
        })?;
        let area_object = self.object(area)?;
        if area_object.atom().map(|a| a.role) != Some(AtomRole::Area) {
            return Err(RuntimeError::TypeCast {
                value: area_object.def.path.to_string(),
                expected: "area",
            });
        }
        self.map.set_area(coord, Some(area));
        Ok(())
    }

    /// Grow or shrink the map. New cells get `/turf` in the default area; turfs outside the new
    /// bounds are deleted and whatever stood on them is moved off the map.
    pub fn resize_map(&mut self, size: (u32, u32, u32)) -> Result<()> {
        let (mx, my, mz) = size;
        let outside: Vec<Coord> = self
            .map
            .cells()
            .map(|(coord, _)| *coord)
            .filter(|c| c.x > mx || c.y > my || c.z > mz)
            .collect();
        for coord in outside {
            let cell = self.map.cell(coord).cloned().unwrap_or_default();
            for movable in cell.movables {
                self.set_loc(movable, None)?;
            }
            if let Some(turf) = cell.turf {
                self.delete(turf);
            }
            self.map.remove_cell(coord);
        }

        let turf_type = self.tree.get("/turf")?;
        for z in 1..=mz {
            for y in 1..=my {
                for x in 1..=mx {
                    let coord = Coord::new(x, y, z);
                    if self.map.turf_at(coord).is_none() {
                        self.new_turf(&turf_type, coord)?;
                    }
                }
            }
        }
        self.map.set_size(size);
        tracing::debug!(?size, "map resized");
        Ok(())
    }
}
