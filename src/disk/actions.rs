use std::collections::HashMap;

use super::models::{DiskAction, DiskActionsView, DiskFormat, DiskInfo, PendingEdits};

/// Permission to apply one disk info load. Stale once the selection or tab moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoTicket {
    pub disk: String,
    generation: u64,
}

/// Which action is active for the selected disk and what each action has pending.
#[derive(Default)]
pub struct DiskActions {
    selected: Option<String>,
    action: DiskAction,
    info: Option<DiskInfo>,
    generation: u64,
    pending: HashMap<String, PendingEdits>,
}

impl DiskActions {
    /// Selects `disk` (or nothing). Returns a ticket when the new state needs an info load.
    pub fn select(&mut self, disk: Option<String>) -> Option<InfoTicket> {
        if disk == self.selected {
            return None;
        }
        self.selected = disk;
        self.invalidate();
        self.info_ticket()
    }

    /// Switches the active tab. Only `Info` loads anything.
    pub fn set_action(&mut self, action: DiskAction) -> Option<InfoTicket> {
        if action == self.action {
            return None;
        }
        self.action = action;
        self.invalidate();
        self.info_ticket()
    }

    /// Ticket for (re)loading info in the current state, if the state shows info.
    pub fn info_ticket(&self) -> Option<InfoTicket> {
        match (&self.selected, self.action) {
            (Some(disk), DiskAction::Info) => Some(InfoTicket {
                disk: disk.clone(),
                generation: self.generation,
            }),
            _ => None,
        }
    }

    /// Stores the result of the load `ticket` was issued for. Returns `false` and drops the
    /// result if the state moved on in the meantime.
    pub fn apply_info(&mut self, ticket: InfoTicket, info: Option<DiskInfo>) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        self.info = info;
        true
    }

    pub fn pending(&self, disk: &str) -> PendingEdits {
        self.pending.get(disk).copied().unwrap_or_default()
    }

    /// Sets the convert target of the selected disk. Returns `false` without a selection.
    pub fn set_new_format(&mut self, format: DiskFormat) -> bool {
        match &self.selected {
            Some(disk) => {
                self.pending.entry(disk.clone()).or_default().new_format = format;
                true
            }
            None => false,
        }
    }

    /// Sets the capacity to add to the selected disk. Returns `false` without a selection.
    pub fn set_new_size(&mut self, size: f64) -> bool {
        match &self.selected {
            Some(disk) => {
                self.pending.entry(disk.clone()).or_default().new_size = size;
                true
            }
            None => false,
        }
    }

    /// Selected disk and its pending inputs, for submitting convert or resize.
    pub fn target(&self) -> Option<(String, PendingEdits)> {
        self.selected
            .as_ref()
            .map(|disk| (disk.clone(), self.pending(disk)))
    }

    pub fn view(&self) -> DiskActionsView {
        match &self.selected {
            Some(disk) => DiskActionsView {
                selected: Some(disk.clone()),
                action: Some(self.action),
                info: self.info.clone(),
                loading: self.action == DiskAction::Info && self.info.is_none(),
                pending: Some(self.pending(disk)),
            },
            None => DiskActionsView {
                selected: None,
                action: None,
                info: None,
                loading: false,
                pending: None,
            },
        }
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.info = None;
    }
}
