//! Per-instance status cells, addressed by element id the way the dashboard
//! page addresses its badges: `"<addr>,status"`, `"<addr>,time"`,
//! `"<addr>,duration"`.

use crate::error::{Error, Result};
use crate::feed::{App, Instance, Status};
use std::collections::HashMap;

pub const CLASS_OK: &str = "status status-ok";
pub const CLASS_ERROR: &str = "status status-error";
pub const CLASS_UNKNOWN: &str = "status status-unknown";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusCell {
    pub text: String,
    pub class: String,
}

/// One laid-out instance row
#[derive(Debug, Clone)]
struct Slot {
    app: String,
    addr: String,
}

/// Row view for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRow<'a> {
    pub app: &'a str,
    pub addr: &'a str,
    pub status: &'a StatusCell,
    pub time: &'a str,
    pub duration: &'a str,
}

#[derive(Debug, Default)]
pub struct StatusBoard {
    slots: Vec<Slot>,
    cells: HashMap<String, StatusCell>,
}

pub fn element_id(addr: &str, field: &str) -> String {
    format!("{},{}", addr, field)
}

pub fn class_for(status: Status) -> &'static str {
    match status {
        Status::Up => CLASS_OK,
        Status::Down => CLASS_ERROR,
        Status::Unknown => CLASS_UNKNOWN,
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_laid_out(&self) -> bool {
        !self.slots.is_empty()
    }

    /// Create the cells for every instance of `apps`. Cells start empty;
    /// instances already present are left alone.
    pub fn lay_out(&mut self, apps: &[App]) {
        for app in apps {
            for instance in &app.instances {
                if self.cells.contains_key(&element_id(&instance.addr, "status")) {
                    continue;
                }
                for field in ["status", "time", "duration"] {
                    self.cells
                        .insert(element_id(&instance.addr, field), StatusCell::default());
                }
                self.slots.push(Slot {
                    app: app.name.clone(),
                    addr: instance.addr.clone(),
                });
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&StatusCell> {
        self.cells.get(id)
    }

    pub fn set_text(&mut self, id: &str, text: &str) -> Result<()> {
        let cell = self.cell_mut(id)?;
        cell.text.clear();
        cell.text.push_str(text);
        Ok(())
    }

    pub fn set_class(&mut self, id: &str, class: &str) -> Result<()> {
        let cell = self.cell_mut(id)?;
        cell.class.clear();
        cell.class.push_str(class);
        Ok(())
    }

    /// Apply one instance's snapshot. Every field is attempted; the failures
    /// are returned so one missing cell does not hide the others.
    pub fn apply(&mut self, instance: &Instance) -> Vec<Error> {
        let status_id = element_id(&instance.addr, "status");
        let updates = [
            self.set_text(&status_id, instance.status.as_str()),
            self.set_class(&status_id, class_for(instance.status)),
            self.set_text(&element_id(&instance.addr, "time"), &instance.time),
            self.set_text(&element_id(&instance.addr, "duration"), &instance.duration),
        ];

        let mut errors: Vec<Error> = updates.into_iter().filter_map(|r| r.err()).collect();
        // A missing status cell fails both text and class; report it once
        errors.dedup_by(|a, b| a.to_string() == b.to_string());
        errors
    }

    pub fn rows(&self) -> impl Iterator<Item = StatusRow<'_>> {
        self.slots.iter().filter_map(|slot| {
            Some(StatusRow {
                app: &slot.app,
                addr: &slot.addr,
                status: self.cells.get(&element_id(&slot.addr, "status"))?,
                time: &self.cells.get(&element_id(&slot.addr, "time"))?.text,
                duration: &self.cells.get(&element_id(&slot.addr, "duration"))?.text,
            })
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn cell_mut(&mut self, id: &str) -> Result<&mut StatusCell> {
        self.cells
            .get_mut(id)
            .ok_or_else(|| Error::MissingStatusTarget(id.to_string()))
    }
}
