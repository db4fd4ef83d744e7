//! `contents` of turfs, areas, movables and the world, read live from the map.

use super::{cut_range, Collection};
use crate::error::{Result, RuntimeError};
use crate::object::{AtomRole, ObjectId};
use crate::runtime::Runtime;
use crate::value::Value;

fn ids_to_values(ids: impl IntoIterator<Item = ObjectId>) -> Vec<Value> {
    ids.into_iter().map(Value::Object).collect()
}

fn must_get_object(value: &Value) -> Result<ObjectId> {
    value.must_get_as::<ObjectId>()
}

/// Move every movable in `[start, end)` of `values` off the map.
fn cut_movables(rt: &mut Runtime, values: Vec<Value>, start: i64, end: i64) -> Result<()> {
    let range = cut_range(start, end, values.len())?;
    for value in &values[range] {
        if let Some(movable) = value.as_object() {
            rt.set_loc(movable, None)?;
        }
    }
    Ok(())
}

fn loc_of(rt: &Runtime, movable: ObjectId) -> Option<ObjectId> {
    rt.object(movable).ok()?.atom()?.loc()
}

/// Movables standing on a turf.
pub struct TurfContents {
    turf: ObjectId,
}

impl TurfContents {
    pub fn new(turf: ObjectId) -> Self {
        TurfContents { turf }
    }
}

impl Collection for TurfContents {
    fn kind(&self) -> &'static str {
        "turf contents"
    }

    fn values(&self, rt: &mut Runtime) -> Result<Vec<Value>> {
        let movables = rt
            .turf_coord(self.turf)
            .and_then(|coord| rt.map.cell(coord))
            .map(|cell| cell.movables.clone())
            .unwrap_or_default();
        Ok(ids_to_values(movables))
    }

    fn add_value(&mut self, rt: &mut Runtime, value: Value) -> Result<()> {
        rt.set_loc(must_get_object(&value)?, Some(self.turf))
    }

    fn remove_value(&mut self, rt: &mut Runtime, value: &Value) -> Result<()> {
        if let Some(movable) = value.as_object() {
            if loc_of(rt, movable) == Some(self.turf) {
                rt.set_loc(movable, None)?;
            }
        }
        Ok(())
    }

    fn cut(&mut self, rt: &mut Runtime, start: i64, end: i64) -> Result<()> {
        let values = self.values(rt)?;
        cut_movables(rt, values, start, end)
    }
}

/// Each turf of an area followed by the movables on it.
pub struct AreaContents {
    area: ObjectId,
}

impl AreaContents {
    pub fn new(area: ObjectId) -> Self {
        AreaContents { area }
    }
}

impl Collection for AreaContents {
    fn kind(&self) -> &'static str {
        "area contents"
    }

    fn values(&self, rt: &mut Runtime) -> Result<Vec<Value>> {
        let mut values = vec![];
        for coord in rt.map.cells_in_area(self.area) {
            if let Some(cell) = rt.map.cell(coord) {
                values.extend(cell.turf.map(Value::Object));
                values.extend(ids_to_values(cell.movables.iter().copied()));
            }
        }
        Ok(values)
    }

    /// Moves a turf's cell into this area.
    fn add_value(&mut self, rt: &mut Runtime, value: Value) -> Result<()> {
        rt.set_turf_area(must_get_object(&value)?, self.area)
    }

    /// Moves a turf's cell back to the default area.
    fn remove_value(&mut self, rt: &mut Runtime, value: &Value) -> Result<()> {
        let turf = match value.as_object() {
            Some(turf) => turf,
            None => return Ok(()),
        };
        let in_this_area = rt
            .turf_coord(turf)
            .map_or(false, |coord| rt.map.area_at(coord) == Some(self.area));
        match rt.map.default_area() {
            Some(default_area) if in_this_area => rt.set_turf_area(turf, default_area),
            _ => Ok(()),
        }
    }
}

/// Movables inside another movable.
pub struct MovableContents {
    movable: ObjectId,
}

impl MovableContents {
    pub fn new(movable: ObjectId) -> Self {
        MovableContents { movable }
    }
}

impl Collection for MovableContents {
    fn kind(&self) -> &'static str {
        "movable contents"
    }

    fn values(&self, rt: &mut Runtime) -> Result<Vec<Value>> {
        let object = rt.object(self.movable)?;
        let children = object
            .atom()
            .map(|atom| atom.children().clone())
            .unwrap_or_default();
        Ok(ids_to_values(children))
    }

    fn add_value(&mut self, rt: &mut Runtime, value: Value) -> Result<()> {
        rt.set_loc(must_get_object(&value)?, Some(self.movable))
    }

    fn remove_value(&mut self, rt: &mut Runtime, value: &Value) -> Result<()> {
        if let Some(child) = value.as_object() {
            if loc_of(rt, child) == Some(self.movable) {
                rt.set_loc(child, None)?;
            }
        }
        Ok(())
    }

    fn cut(&mut self, rt: &mut Runtime, start: i64, end: i64) -> Result<()> {
        let values = self.values(rt)?;
        cut_movables(rt, values, start, end)
    }
}

/// Every live turf, area and movable. Read-only.
pub struct WorldContents;

impl Collection for WorldContents {
    fn kind(&self) -> &'static str {
        "world contents"
    }

    fn values(&self, rt: &mut Runtime) -> Result<Vec<Value>> {
        Ok(rt
            .objects()
            .filter(|(_, object)| {
                object
                    .atom()
                    .map_or(false, |atom| atom.role != AtomRole::Image)
            })
            .map(|(id, _)| Value::Object(id))
            .collect())
    }

    fn set_value(
        &mut self,
        _rt: &mut Runtime,
        _key: &Value,
        _value: Value,
        _allow_growth: bool,
    ) -> Result<()> {
        Err(RuntimeError::not_supported("writing", self.kind()))
    }
}
