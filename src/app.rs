use crate::canvas::{DisplayPoint, DisplaySize};
use crate::components::history::HistoryPanel;
use crate::components::tools::ToolsPanel;
use crate::error::RedactError;
use crate::io::{DEFAULT_EXPORT_FILENAME, ExportFormat, pick_export_path, pick_image_path, write_export};
use crate::ops::clipboard::get_from_system_clipboard;
use crate::session::EditSession;
use crate::settings::RedactSettings;
use eframe::egui;
use std::path::PathBuf;

/// Fill of the rectangle drawn while dragging out a selection.
const SELECTION_OVERLAY: egui::Color32 = egui::Color32::from_rgba_premultiplied(0, 0, 0, 51);

/// On-screen size of a `buffer_width` x `buffer_height` image inside a
/// window of `window` points. Aspect ratio is kept and the image is never
/// scaled up.
pub fn fit_display_size(
    buffer_width: u32,
    buffer_height: u32,
    window: egui::Vec2,
    settings: &RedactSettings,
) -> DisplaySize {
    let max_w = window.x * settings.viewport_width_fraction - settings.sidebar_width;
    let max_h = window.y * settings.viewport_height_fraction;
    let ratio = (max_w / buffer_width as f32)
        .min(max_h / buffer_height as f32)
        .min(1.0)
        .max(0.0);
    DisplaySize::new(buffer_width as f32 * ratio, buffer_height as f32 * ratio)
}

/// Where the next image comes from.
enum ImageSource {
    Path(PathBuf),
    Bytes { bytes: Vec<u8>, name: Option<String> },
    Clipboard,
}

pub struct RedactApp {
    session: EditSession,
    settings: RedactSettings,
    tools_panel: ToolsPanel,
    history_panel: HistoryPanel,
    /// GPU copy of the working buffer, re-uploaded when the session
    /// generation moves on.
    texture: Option<egui::TextureHandle>,
    texture_generation: Option<u64>,
    /// Last pointer position seen during a drag, relative to the canvas.
    last_drag_pos: Option<DisplayPoint>,
    error_message: Option<String>,
    status: Option<String>,
}

impl RedactApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: RedactSettings) -> Self {
        let session = EditSession::new(settings.tool_settings());
        let tools_panel = ToolsPanel::new(session.tool_settings());
        log::info!("Session {} ready", session.id());
        Self {
            session,
            settings,
            tools_panel,
            history_panel: HistoryPanel::default(),
            texture: None,
            texture_generation: None,
            last_drag_pos: None,
            error_message: None,
            status: None,
        }
    }

    // ---- ingestion ----------------------------------------------------------

    fn load(&mut self, source: ImageSource) {
        let result = match source {
            ImageSource::Path(path) => self.session.load_path(&path).map(|()| true),
            ImageSource::Bytes { bytes, name } => {
                self.session.load_bytes(&bytes, name).map(|()| true)
            }
            ImageSource::Clipboard => {
                get_from_system_clipboard().and_then(|pasted| self.session.load_pasted(pasted))
            }
        };
        match result {
            Ok(false) => {}
            Ok(true) => {
                self.status = self.session.name().map(|n| format!("Loaded {}", n));
                self.error_message = None;
            }
            Err(e) => self.report(e),
        }
    }

    fn report(&mut self, e: RedactError) {
        if e.is_user_facing() {
            log::warn!("{}", e);
        } else {
            log::error!("{}", e);
        }
        self.error_message = Some(match e {
            RedactError::InputRejected(_) => format!("Please choose an image file ({}).", e),
            _ => e.to_string(),
        });
    }

    fn open_dialog(&mut self) {
        if let Some(path) = pick_image_path() {
            self.load(ImageSource::Path(path));
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<egui::DroppedFile> = ctx.input(|i| i.raw.dropped_files.clone());
        // Only the first file is used
        let Some(file) = dropped.into_iter().next() else {
            return;
        };
        if let Some(path) = file.path {
            self.load(ImageSource::Path(path));
        } else if let Some(bytes) = file.bytes {
            let name = (!file.name.is_empty()).then_some(file.name);
            self.load(ImageSource::Bytes {
                bytes: bytes.to_vec(),
                name,
            });
        }
    }

    fn handle_paste(&mut self, ctx: &egui::Context) {
        // A focused text field owns the paste
        if ctx.memory(|m| m.focus().is_some()) {
            return;
        }
        let pasted = ctx.input_mut(|i| {
            let shortcut = i.consume_key(egui::Modifiers::COMMAND, egui::Key::V);
            let event = i.events.iter().any(|e| matches!(e, egui::Event::Paste(_)));
            shortcut || event
        });
        if pasted {
            self.load(ImageSource::Clipboard);
        }
    }

    // ---- actions ------------------------------------------------------------

    fn download(&mut self) {
        let Some(buffer) = self.session.buffer() else {
            return;
        };
        let Some(path) = pick_export_path(DEFAULT_EXPORT_FILENAME) else {
            return;
        };
        let format = ExportFormat::from_path(&path, self.settings.jpeg_quality)
            .unwrap_or_else(|| self.settings.default_export_format());
        match write_export(buffer, &path, format) {
            Ok(()) => self.status = Some(format!("Saved {}", path.display())),
            Err(e) => self.report(e),
        }
    }

    fn load_new(&mut self) {
        self.session.reset();
        self.texture = None;
        self.texture_generation = None;
        self.last_drag_pos = None;
        self.status = None;
        self.open_dialog();
    }

    fn restore(&mut self, index: usize) {
        if let Err(e) = self.session.restore(index) {
            self.report(e);
        }
    }

    fn persist_tool_settings(&mut self) {
        self.settings.store_tool_settings(self.session.tool_settings());
        if let Err(e) = self.settings.save() {
            log::warn!("Could not save settings: {}", e);
        }
    }

    // ---- drawing ------------------------------------------------------------

    /// Re-upload the working buffer when it has changed since the last frame.
    fn sync_texture(&mut self, ctx: &egui::Context) {
        let generation = self.session.generation();
        if self.texture_generation == Some(generation) && self.texture.is_some() {
            return;
        }
        let Some(buffer) = self.session.buffer() else {
            self.texture = None;
            self.texture_generation = Some(generation);
            return;
        };
        let image = egui::ColorImage::from_rgba_unmultiplied(
            [buffer.width() as usize, buffer.height() as usize],
            buffer.as_raw(),
        );
        match &mut self.texture {
            Some(handle) => handle.set(image, egui::TextureOptions::LINEAR),
            None => {
                self.texture =
                    Some(ctx.load_texture("redact-canvas", image, egui::TextureOptions::LINEAR));
            }
        }
        self.texture_generation = Some(generation);
    }

    fn show_sidebar(&mut self, ctx: &egui::Context) {
        let mut open = false;
        let mut download = false;
        let mut load_new = false;
        let mut revert_to = None;
        let before = self.session.tool_settings().clone();

        egui::SidePanel::left("redact_sidebar")
            .exact_width(self.settings.sidebar_width)
            .resizable(false)
            .show(ctx, |ui| {
                ui.add_space(8.0);
                ui.heading("Image Redactor");
                ui.separator();

                if !self.session.has_image() {
                    if ui.button("Open Image…").clicked() {
                        open = true;
                    }
                    ui.weak("…or drop a file on the window, or paste with Ctrl+V.");
                    return;
                }

                let (tool, settings) = self.session.tool_and_settings_mut();
                self.tools_panel.show(ui, tool, settings);

                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    download = ui.button("Download").clicked();
                    load_new = ui.button("Load New Image").clicked();
                });

                if let Some(status) = &self.status {
                    ui.weak(status);
                }

                ui.separator();
                revert_to = self.history_panel.show(ui, self.session.history());
            });

        if *self.session.tool_settings() != before {
            self.persist_tool_settings();
        }
        if open {
            self.open_dialog();
        }
        if download {
            self.download();
        }
        if load_new {
            self.load_new();
        }
        if let Some(index) = revert_to {
            self.restore(index);
        }
    }

    fn show_canvas(&mut self, ctx: &egui::Context) {
        let window = ctx.screen_rect().size();
        egui::CentralPanel::default().show(ctx, |ui| {
            let (Some((width, height)), Some(texture_id)) = (
                self.session.buffer().map(|b| b.dimensions()),
                self.texture.as_ref().map(|t| t.id()),
            ) else {
                ui.centered_and_justified(|ui| {
                    ui.label("Drop an image here, paste one, or use Open Image…");
                });
                return;
            };

            let displayed = fit_display_size(width, height, window, &self.settings);
            let size = egui::vec2(displayed.width, displayed.height);

            let (rect, response) = ui.allocate_exact_size(size, egui::Sense::drag());
            let painter = ui.painter_at(rect);
            painter.image(
                texture_id,
                rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );

            let local = |p: egui::Pos2| DisplayPoint::new(p.x - rect.min.x, p.y - rect.min.y);

            if response.drag_started()
                && let Some(p) = response.interact_pointer_pos()
            {
                let at = local(p);
                if self.session.pointer_down(at, displayed) {
                    log::debug!("Drawing started at ({:.1}, {:.1})", at.x, at.y);
                    self.last_drag_pos = Some(at);
                }
            }

            if response.dragged()
                && let Some(p) = response.interact_pointer_pos()
            {
                let at = local(p);
                self.last_drag_pos = Some(at);
                self.session.pointer_move(at, displayed);
            }

            if response.drag_released() {
                let at = response.interact_pointer_pos().map(local).or(self.last_drag_pos);
                self.last_drag_pos = None;
                if let Some(at) = at {
                    match self.session.pointer_up(at, displayed) {
                        Ok(Some(label)) => log::debug!("Applied {}", label),
                        Ok(None) => {}
                        Err(e) => self.report(e),
                    }
                }
            } else if self.session.is_dragging() {
                let outside = ctx
                    .input(|i| i.pointer.hover_pos())
                    .is_none_or(|p| !rect.contains(p));
                if outside {
                    self.session.pointer_leave();
                    self.last_drag_pos = None;
                }
            }

            if let Some(overlay) = self.session.live_overlay(displayed) {
                let min = rect.min + egui::vec2(overlay.x, overlay.y);
                painter.rect_filled(
                    egui::Rect::from_min_size(min, egui::vec2(overlay.width, overlay.height)),
                    0.0,
                    SELECTION_OVERLAY,
                );
            }
        });
    }

    fn show_error(&mut self, ctx: &egui::Context) {
        let Some(message) = self.error_message.clone() else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message);
                ui.add_space(8.0);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.error_message = None;
        }
    }
}

impl eframe::App for RedactApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);
        if self.error_message.is_none() {
            self.handle_paste(ctx);
        }

        self.show_sidebar(ctx);
        self.sync_texture(ctx);
        self.show_canvas(ctx);
        self.show_error(ctx);

        if self.session.is_dragging() {
            ctx.request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_image_is_not_upscaled() {
        let size = fit_display_size(200, 100, egui::vec2(1920.0, 1080.0), &RedactSettings::default());
        assert_eq!(size, DisplaySize::new(200.0, 100.0));
    }

    #[test]
    fn large_image_fits_the_tighter_axis() {
        // max_w = 1000 * 0.9 - 300 = 600, max_h = 1000 * 0.8 = 800
        let size = fit_display_size(1200, 600, egui::vec2(1000.0, 1000.0), &RedactSettings::default());
        assert_eq!(size, DisplaySize::new(600.0, 300.0));

        let size = fit_display_size(400, 1600, egui::vec2(1000.0, 1000.0), &RedactSettings::default());
        assert_eq!(size, DisplaySize::new(200.0, 800.0));
    }

    #[test]
    fn tiny_window_collapses_to_zero() {
        let size = fit_display_size(100, 100, egui::vec2(200.0, 200.0), &RedactSettings::default());
        assert_eq!(size, DisplaySize::new(0.0, 0.0));
    }
}
