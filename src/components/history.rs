use eframe::egui;

use crate::canvas::{PixelBuffer, Snapshot};
use crate::error::{RedactError, Result};

/// Label of the entry committed when an image is loaded.
pub const INITIAL_ENTRY_LABEL: &str = "Initial Image";

// ============================================================================
// HISTORY STORE — linear snapshot timeline with a cursor
// ============================================================================

/// One committed state: what was done, and the whole buffer afterwards.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub label: String,
    pub snapshot: Snapshot,
}

/// Row model for the history list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryItem {
    pub index: usize,
    pub label: String,
    pub is_current: bool,
}

/// Ordered snapshot log. Committing after a restore drops every entry past
/// the cursor first, so the timeline never branches.
#[derive(Debug, Default)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
    /// `None` when empty.
    cursor: Option<usize>,
    /// Running total of encoded snapshot bytes.
    total_memory: usize,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot `source` and append it as the new current entry.
    ///
    /// The snapshot is encoded before anything is truncated, so a failed
    /// encode leaves the timeline exactly as it was.
    pub fn commit(&mut self, label: impl Into<String>, source: &PixelBuffer) -> Result<usize> {
        let label = label.into();
        let snapshot = source.encode()?;

        let keep = self.cursor.map_or(0, |c| c + 1);
        for dropped in self.entries.drain(keep..) {
            self.total_memory = self.total_memory.saturating_sub(dropped.snapshot.memory_size());
        }

        self.total_memory += snapshot.memory_size();
        self.entries.push(HistoryEntry { label, snapshot });
        let index = self.entries.len() - 1;
        self.cursor = Some(index);

        log::info!("History saved: {}, index: {}", self.entries[index].label, index);
        Ok(index)
    }

    /// Load entry `index` into `target` and make it current.
    pub fn restore(&mut self, index: usize, target: &mut PixelBuffer) -> Result<()> {
        let entry = self.entries.get(index).ok_or(RedactError::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })?;
        target.restore_from(&entry.snapshot)?;
        self.cursor = Some(index);
        log::info!("Reverted to history index: {} ({})", index, entry.label);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
        self.total_memory = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// All entries, oldest first, flagged with the current one.
    pub fn items(&self) -> Vec<HistoryItem> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, e)| HistoryItem {
                index,
                label: e.label.clone(),
                is_current: Some(index) == self.cursor,
            })
            .collect()
    }

    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }
}

// ============================================================================
// HISTORY PANEL - UI for displaying history
// ============================================================================

#[derive(Default)]
pub struct HistoryPanel {
    show_memory_info: bool,
}

impl HistoryPanel {
    /// Draw the list. Returns the index the user clicked, if any; the caller
    /// performs the restore.
    pub fn show(&mut self, ui: &mut egui::Ui, history: &HistoryStore) -> Option<usize> {
        ui.horizontal(|ui| {
            ui.strong("History");
            if ui.small_button("ℹ").on_hover_text("Show memory info").clicked() {
                self.show_memory_info = !self.show_memory_info;
            }
        });

        if self.show_memory_info {
            let mem_mb = history.memory_usage() as f64 / (1024.0 * 1024.0);
            ui.label(format!("{} states, {:.2} MB", history.len(), mem_mb));
        }

        let mut revert_to = None;
        let scroll_width = ui.available_width();
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .min_scrolled_width(scroll_width)
            .show(ui, |ui| {
                ui.set_min_width(scroll_width);
                let items = history.items();
                if items.is_empty() {
                    ui.weak("No history yet");
                    return;
                }
                for item in items {
                    let text = format!("{}: {}", item.index, item.label);
                    let response = ui.selectable_label(item.is_current, text);
                    if response.clicked() {
                        revert_to = Some(item.index);
                    }
                    if !item.is_current {
                        response.on_hover_text("Click to revert to this state");
                    }
                }
            });
        revert_to
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Region;

    fn buffer_with(value: u8) -> PixelBuffer {
        PixelBuffer::filled(4, 4, [value, value, value, 255])
    }

    fn paint(buf: &mut PixelBuffer, value: u8) {
        let region = Region::new(0, 0, 2, 2);
        buf.write_region(region, &vec![value; region.byte_len()]).unwrap();
    }

    #[test]
    fn sequential_commits_advance_cursor() {
        let mut store = HistoryStore::new();
        let mut buf = buffer_with(0);
        store.commit(INITIAL_ENTRY_LABEL, &buf).unwrap();
        for i in 1..5u8 {
            paint(&mut buf, i * 10);
            store.commit(format!("Edit {}", i), &buf).unwrap();
        }
        assert_eq!(store.len(), 5);
        assert_eq!(store.cursor(), Some(4));
        assert!(store.memory_usage() > 0);
    }

    #[test]
    fn commit_after_restore_truncates_forward_entries() {
        let mut store = HistoryStore::new();
        let mut buf = buffer_with(0);
        for i in 0..3u8 {
            paint(&mut buf, i + 1);
            store.commit(format!("Edit {}", i), &buf).unwrap();
        }
        store.restore(0, &mut buf).unwrap();
        assert_eq!(buf.pixel(0, 0), [1, 1, 1, 1]);

        paint(&mut buf, 99);
        store.commit("Branch", &buf).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.cursor(), Some(1));
        let labels: Vec<_> = store.items().into_iter().map(|i| i.label).collect();
        assert_eq!(labels, ["Edit 0", "Branch"]);
    }

    #[test]
    fn restore_out_of_range_fails_without_side_effects() {
        let mut store = HistoryStore::new();
        let mut buf = buffer_with(5);
        store.commit(INITIAL_ENTRY_LABEL, &buf).unwrap();
        let err = store.restore(3, &mut buf).unwrap_err();
        assert!(matches!(err, RedactError::IndexOutOfRange { index: 3, len: 1 }));
        assert_eq!(store.cursor(), Some(0));
    }

    #[test]
    fn items_flag_current_entry() {
        let mut store = HistoryStore::new();
        let mut buf = buffer_with(0);
        store.commit("a", &buf).unwrap();
        store.commit("b", &buf).unwrap();
        store.restore(0, &mut buf).unwrap();
        let items = store.items();
        assert!(items[0].is_current);
        assert!(!items[1].is_current);
        assert_eq!(items[0].label, "a");
    }

    #[test]
    fn clear_resets_cursor() {
        let mut store = HistoryStore::new();
        store.commit("a", &buffer_with(0)).unwrap();
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.cursor(), None);
        assert_eq!(store.memory_usage(), 0);
    }
}
