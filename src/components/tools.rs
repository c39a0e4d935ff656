use eframe::egui;
use image::Rgb;

use crate::canvas::{BufferPos, Region};
use crate::ops::redact::{
    DEFAULT_BLOCK_SIZE, DEFAULT_FILL_COLOR, MIN_BLOCK_SIZE, RegionTransform, parse_block_size,
};

/// A finished selection must be strictly larger than this in both axes
/// (buffer pixels) to be applied. Filters accidental clicks.
pub const MIN_SELECTION_EXTENT: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Pixelate,
    ColorFill,
}

impl Tool {
    pub fn label(&self) -> &'static str {
        match self {
            Tool::Pixelate => "Pixelate",
            Tool::ColorFill => "Color Bar",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[Tool::Pixelate, Tool::ColorFill]
    }
}

// ============================================================================
// TOOL SETTINGS
// ============================================================================

/// Per-tool parameters, read each time a transform is applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolSettings {
    pub pixelate_block_size: u32,
    pub fill_color: Rgb<u8>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            pixelate_block_size: DEFAULT_BLOCK_SIZE,
            fill_color: DEFAULT_FILL_COLOR,
        }
    }
}

impl ToolSettings {
    /// The transform `tool` would apply with the current parameters.
    pub fn transform_for(&self, tool: Tool) -> RegionTransform {
        match tool {
            Tool::Pixelate => RegionTransform::Pixelate {
                block_size: self.pixelate_block_size.max(MIN_BLOCK_SIZE),
            },
            Tool::ColorFill => RegionTransform::ColorFill {
                color: self.fill_color,
            },
        }
    }
}

// ============================================================================
// SELECTION CONTROLLER — drag state machine
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Dragging { start: BufferPos, current: BufferPos },
}

/// Tracks an in-progress rectangular drag in buffer space. Never touches the
/// pixel buffer; it only produces rectangles.
#[derive(Clone, Debug, Default)]
pub struct SelectionController {
    state: SelectionState,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, SelectionState::Dragging { .. })
    }

    /// Pointer down. `armed` is false when no tool is selected or no image is
    /// loaded, in which case the gesture is ignored.
    pub fn begin(&mut self, at: BufferPos, armed: bool) -> bool {
        if !armed {
            return false;
        }
        self.state = SelectionState::Dragging { start: at, current: at };
        true
    }

    /// Pointer move. Returns the live rectangle for the overlay.
    pub fn update(&mut self, at: BufferPos) -> Option<Region> {
        match &mut self.state {
            SelectionState::Dragging { current, .. } => {
                *current = at;
                self.live_region()
            }
            SelectionState::Idle => None,
        }
    }

    /// Rectangle under the current drag, if it has any area.
    pub fn live_region(&self) -> Option<Region> {
        match self.state {
            SelectionState::Dragging { start, current } => {
                let region = Region::from_positions(start, current);
                (!region.is_empty()).then_some(region)
            }
            SelectionState::Idle => None,
        }
    }

    /// Pointer up. Returns the rectangle to apply, clamped to the buffer, or
    /// `None` when it was too small (or no drag was active).
    pub fn finish(&mut self, at: BufferPos, buffer_width: u32, buffer_height: u32) -> Option<Region> {
        let SelectionState::Dragging { start, .. } = std::mem::take(&mut self.state) else {
            return None;
        };
        let region = Region::from_positions(start, at);
        // Size is judged before clamping: a drag that leaves the buffer can
        // still end up as a 1-pixel strip along the edge.
        if region.width > MIN_SELECTION_EXTENT && region.height > MIN_SELECTION_EXTENT {
            region.clamp_to(buffer_width, buffer_height)
        } else {
            log::debug!("Selection {} below minimum size, discarded", region);
            None
        }
    }

    /// Pointer left the surface. Returns whether a drag was discarded.
    pub fn cancel(&mut self) -> bool {
        let was_dragging = self.is_dragging();
        self.state = SelectionState::Idle;
        was_dragging
    }
}

// ============================================================================
// TOOLS PANEL — tool buttons and parameters
// ============================================================================

/// Side panel widgets for choosing a tool and editing its parameters.
pub struct ToolsPanel {
    /// Raw text of the block size field; parsed on every edit.
    block_size_text: String,
}

impl ToolsPanel {
    pub fn new(settings: &ToolSettings) -> Self {
        Self {
            block_size_text: settings.pixelate_block_size.to_string(),
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, active: &mut Option<Tool>, settings: &mut ToolSettings) {
        ui.horizontal(|ui| {
            for &tool in Tool::all() {
                if ui.selectable_label(*active == Some(tool), tool.label()).clicked() {
                    log::info!("Tool selected: {}", tool.label());
                    *active = Some(tool);
                }
            }
        });

        ui.add_space(6.0);
        ui.horizontal(|ui| {
            ui.label("Pixel size:");
            let resp = ui.add(egui::TextEdit::singleline(&mut self.block_size_text).desired_width(48.0));
            if resp.changed() {
                settings.pixelate_block_size = parse_block_size(&self.block_size_text);
            }
            if resp.lost_focus() {
                self.block_size_text = settings.pixelate_block_size.to_string();
            }
        });

        ui.horizontal(|ui| {
            ui.label("Bar color:");
            let mut rgb = settings.fill_color.0;
            if ui.color_edit_button_srgb(&mut rgb).changed() {
                settings.fill_color = Rgb(rgb);
            }
        });
    }
}
