use std::path::Path;

use uuid::Uuid;

use crate::canvas::{
    CoordinateMapper, DisplayPoint, DisplayRect, DisplaySize, PixelBuffer, Region,
};
use crate::components::history::{HistoryItem, HistoryStore, INITIAL_ENTRY_LABEL};
use crate::components::tools::{SelectionController, Tool, ToolSettings};
use crate::error::{RedactError, Result};
use crate::io::{DecodedImage, ExportFormat, decode_image_bytes, load_image_file};
use crate::ops::redact::RegionTransform;

/// Display name given to images taken from the clipboard.
pub const PASTED_IMAGE_NAME: &str = "Pasted Image";

/// One editing session: the working buffer, its history, the chosen tool and
/// any drag in progress. Loading an image replaces all of it at once.
///
/// `generation` is bumped whenever the buffer contents change (load, edit,
/// restore, reset); the presentation layer re-derives its display when it
/// sees a new value.
#[derive(Debug)]
pub struct EditSession {
    id: Uuid,
    /// Display name of the loaded image (file name, "Pasted Image", ...).
    name: Option<String>,
    buffer: Option<PixelBuffer>,
    history: HistoryStore,
    tool: Option<Tool>,
    settings: ToolSettings,
    selection: SelectionController,
    generation: u64,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(ToolSettings::default())
    }
}

impl EditSession {
    pub fn new(settings: ToolSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            buffer: None,
            history: HistoryStore::new(),
            tool: None,
            settings,
            selection: SelectionController::new(),
            generation: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn buffer(&self) -> Option<&PixelBuffer> {
        self.buffer.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn history_items(&self) -> Vec<HistoryItem> {
        self.history.items()
    }

    pub fn tool(&self) -> Option<Tool> {
        self.tool
    }

    pub fn select_tool(&mut self, tool: Option<Tool>) {
        self.tool = tool;
    }

    pub fn tool_settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn tool_settings_mut(&mut self) -> &mut ToolSettings {
        &mut self.settings
    }

    /// Tool slot and settings together, for the tools panel.
    pub fn tool_and_settings_mut(&mut self) -> (&mut Option<Tool>, &mut ToolSettings) {
        (&mut self.tool, &mut self.settings)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_dragging(&self) -> bool {
        self.selection.is_dragging()
    }

    pub fn mapper(&self) -> Option<CoordinateMapper> {
        self.buffer.as_ref().map(CoordinateMapper::for_buffer)
    }

    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    // ---- lifecycle ----------------------------------------------------------

    /// Replace the session with a freshly decoded image. The new buffer and its
    /// "Initial Image" entry are built before anything is swapped in, so a
    /// failure leaves the previous session as it was.
    pub fn load_decoded(&mut self, image: DecodedImage, name: Option<String>) -> Result<()> {
        let buffer = image.into_buffer()?;
        let mut history = HistoryStore::new();
        history.commit(INITIAL_ENTRY_LABEL, &buffer)?;

        log::info!(
            "Offscreen buffer created: {}x{} ({})",
            buffer.width(),
            buffer.height(),
            name.as_deref().unwrap_or("unnamed")
        );

        self.id = Uuid::new_v4();
        self.name = name;
        self.buffer = Some(buffer);
        self.history = history;
        self.selection = SelectionController::new();
        self.bump();
        Ok(())
    }

    pub fn load_bytes(&mut self, bytes: &[u8], name: Option<String>) -> Result<()> {
        let decoded = decode_image_bytes(bytes)?;
        self.load_decoded(decoded, name)
    }

    pub fn load_path(&mut self, path: &Path) -> Result<()> {
        let decoded = load_image_file(path)?;
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string());
        self.load_decoded(decoded, name)
    }

    /// Take whatever the clipboard held. A paste without image content
    /// (plain text, an empty clipboard) is not an error and changes nothing.
    pub fn load_pasted(&mut self, pasted: Option<DecodedImage>) -> Result<bool> {
        let Some(image) = pasted else {
            log::debug!("Paste ignored: no image on the clipboard");
            return Ok(false);
        };
        self.load_decoded(image, Some(PASTED_IMAGE_NAME.to_string()))?;
        Ok(true)
    }

    /// Back to the empty state: no image, no history, no tool.
    pub fn reset(&mut self) {
        self.name = None;
        self.buffer = None;
        self.history.clear();
        self.tool = None;
        self.selection = SelectionController::new();
        self.bump();
        log::info!("State reset.");
    }

    // ---- pointer input ------------------------------------------------------

    /// Drags are accepted only with a tool chosen and an image loaded.
    fn armed(&self) -> bool {
        self.tool.is_some() && self.buffer.is_some() && self.history.cursor().is_some()
    }

    pub fn pointer_down(&mut self, at: DisplayPoint, displayed: DisplaySize) -> bool {
        let Some(pos) = self.mapper().and_then(|m| m.display_to_buffer(at, displayed)) else {
            return false;
        };
        let armed = self.armed();
        self.selection.begin(pos, armed)
    }

    /// Returns the live rectangle (buffer space) while dragging.
    pub fn pointer_move(&mut self, at: DisplayPoint, displayed: DisplaySize) -> Option<Region> {
        if !self.selection.is_dragging() {
            return None;
        }
        let pos = self.mapper()?.display_to_buffer(at, displayed)?;
        self.selection.update(pos)
    }

    /// Ends the drag and applies the active tool when the selection is large
    /// enough. Returns the history label of the applied edit.
    pub fn pointer_up(&mut self, at: DisplayPoint, displayed: DisplaySize) -> Result<Option<String>> {
        if !self.selection.is_dragging() {
            return Ok(None);
        }
        let (Some(mapper), Some(buffer)) = (self.mapper(), self.buffer.as_ref()) else {
            self.selection.cancel();
            return Ok(None);
        };
        let (width, height) = buffer.dimensions();
        let Some(pos) = mapper.display_to_buffer(at, displayed) else {
            self.selection.cancel();
            return Ok(None);
        };
        match self.selection.finish(pos, width, height) {
            Some(region) => self.apply_region(region),
            None => Ok(None),
        }
    }

    /// Pointer left the surface: drop any drag without applying it.
    pub fn pointer_leave(&mut self) -> bool {
        let cancelled = self.selection.cancel();
        if cancelled {
            log::info!("Drawing cancelled");
        }
        cancelled
    }

    /// Display-space rectangle of the drag in progress, for the overlay.
    pub fn live_overlay(&self, displayed: DisplaySize) -> Option<DisplayRect> {
        let region = self.selection.live_region()?;
        self.mapper()?.region_to_display(region, displayed)
    }

    // ---- edits --------------------------------------------------------------

    /// Apply the active tool to `region` (buffer space). `Ok(None)` when no
    /// tool is chosen, nothing is loaded, or the region misses the buffer.
    pub fn apply_region(&mut self, region: Region) -> Result<Option<String>> {
        let Some(tool) = self.tool else {
            return Ok(None);
        };
        let transform = self.settings.transform_for(tool);
        self.apply_transform(region, transform)
    }

    /// Apply an explicit transform to `region` and commit it to history.
    pub fn apply_transform(
        &mut self,
        region: Region,
        transform: RegionTransform,
    ) -> Result<Option<String>> {
        if self.history.cursor().is_none() {
            return Ok(None);
        }
        let Some(buffer) = self.buffer.as_mut() else {
            return Ok(None);
        };
        let Some(region) = region.clamp_to(buffer.width(), buffer.height()) else {
            return Ok(None);
        };

        let src = buffer.read_region(region)?;
        let out = transform.apply(&src, region.width, region.height);
        buffer.write_region(region, &out)?;

        let label = transform.label();
        log::info!("Applied {} to buffer {}", label, region);

        if let Err(e) = self.history.commit(label.clone(), buffer) {
            // Keep buffer and history in step
            buffer.write_region(region, &src)?;
            return Err(e);
        }
        self.bump();
        Ok(Some(label))
    }

    /// Revert the buffer to history entry `index`.
    pub fn restore(&mut self, index: usize) -> Result<()> {
        let Some(buffer) = self.buffer.as_mut() else {
            return Err(RedactError::IndexOutOfRange { index, len: 0 });
        };
        self.selection.cancel();
        self.history.restore(index, buffer)?;
        self.bump();
        Ok(())
    }

    /// Encoded image for download, or `None` with nothing loaded.
    pub fn export(&self, format: ExportFormat) -> Result<Option<Vec<u8>>> {
        match &self.buffer {
            Some(buffer) => buffer.export(format).map(Some),
            None => Ok(None),
        }
    }
}
