// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! The app owns the project, the frame being annotated and the services
//! around the annotation controller: background frame loading, the save
//! coordinator and the keyboard subscription. Everything the user does to
//! boxes goes through the controller.

use crate::config::Settings;
use crate::editor::commands::{Key, KeyInput, KeyboardRouter, KeyboardSubscription};
use crate::editor::controller::{AnnotationController, HostRequest};
use crate::io::store::{AnnotationStore, JsonFileStore, SaveCoordinator, SaveDispatch};
use crate::models::project::{boxes_from_saved, FrameKey, ProjectData, SavedAnnotation};
use crate::ui::{canvas, label_picker, properties, timeline, toolbar};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;

const KEYBOARD_OWNER: &str = "frame-view";

/// Result of background frame loading.
struct LoadedFrame {
    frame_index: usize,
    key: FrameKey,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    records: Vec<SavedAnnotation>,
}

/// Result of background project loading.
struct LoadedProject {
    project: ProjectData,
    base_dir: PathBuf,
}

/// Main application state.
pub struct AnnotatorApp {
    settings: Settings,

    /// Current project (if one is open)
    project: Option<ProjectData>,

    /// Directory relative frame paths resolve against
    base_dir: PathBuf,

    video_index: usize,
    frame_index: usize,

    /// Key of the frame shown in the canvas
    current_key: Option<FrameKey>,

    /// Controller for the mounted frame
    controller: Option<AnnotationController>,

    /// Loaded frame texture for display
    frame_texture: Option<egui::TextureHandle>,

    canvas: canvas::CanvasState,
    saver: SaveCoordinator,
    keyboard: KeyboardRouter,

    /// Held while a frame view is mounted
    subscription: Option<KeyboardSubscription>,

    /// Receivers for background loading
    project_loader: Option<Receiver<Result<LoadedProject, String>>>,
    frame_loader: Option<Receiver<Result<LoadedFrame, String>>>,

    /// Loading state message
    loading_message: Option<String>,
}

impl AnnotatorApp {
    pub fn new(settings: Settings, project_path: Option<PathBuf>) -> Self {
        let store: Arc<dyn AnnotationStore> = Arc::new(JsonFileStore::new(settings.store_dir.clone()));
        let mut app = Self {
            settings,
            project: None,
            base_dir: PathBuf::new(),
            video_index: 0,
            frame_index: 0,
            current_key: None,
            controller: None,
            frame_texture: None,
            canvas: canvas::CanvasState::default(),
            saver: SaveCoordinator::new(store),
            keyboard: KeyboardRouter::new(),
            subscription: None,
            project_loader: None,
            frame_loader: None,
            loading_message: None,
        };
        if let Some(path) = project_path {
            app.open_project(path);
        }
        app
    }

    /// Import a project file (asynchronously).
    fn open_project(&mut self, path: PathBuf) {
        let (sender, receiver) = channel();
        self.project_loader = Some(receiver);
        self.loading_message = Some("Loading project...".to_string());

        std::thread::spawn(move || {
            let result = crate::io::serialization::import_project(&path)
                .map(|project| LoadedProject {
                    project,
                    base_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
                })
                .map_err(|e| format!("Failed to import project: {:#}", e));
            let _ = sender.send(result);
        });
    }

    fn install_project(&mut self, loaded: LoadedProject) {
        let LoadedProject { project, base_dir } = loaded;
        log::info!("Opened project '{}'", project.name);

        // The frame view is unmounted until the first frame arrives.
        self.subscription = None;
        self.controller = None;
        self.frame_texture = None;
        self.current_key = None;
        self.base_dir = base_dir;
        self.video_index = 0;
        self.frame_index = 0;
        self.project = Some(project);
        self.load_frame(0);
    }

    /// Decode a frame and fetch its saved boxes (asynchronously).
    fn load_frame(&mut self, frame_index: usize) {
        let Some(project) = &self.project else {
            return;
        };
        let Some(video) = project.videos.get(self.video_index) else {
            log::warn!("Project has no video at index {}", self.video_index);
            return;
        };
        let Some(frame) = video.frames.get(frame_index) else {
            return;
        };

        let key = project.frame_key(video, frame);
        let image_path = frame.resolve_image_path(&self.base_dir);
        let store = Arc::clone(self.saver.store());

        let (sender, receiver) = channel();
        self.frame_loader = Some(receiver);
        self.loading_message = Some(format!("Loading frame {}...", frame.frame_number));

        std::thread::spawn(move || {
            let result = (|| -> Result<LoadedFrame, String> {
                let image = crate::io::media::load_image(&image_path).map_err(|e| format!("{:#}", e))?;
                let records = store
                    .load_frame(&key)
                    .map_err(|e| format!("Failed to load annotations: {}", e))?;
                log::info!(
                    "Loaded frame {} ({}x{}) with {} boxes",
                    image_path.display(),
                    image.width,
                    image.height,
                    records.len()
                );
                Ok(LoadedFrame {
                    frame_index,
                    key,
                    width: image.width,
                    height: image.height,
                    pixels: image.pixels,
                    records,
                })
            })();
            let _ = sender.send(result);
        });
    }

    fn mount_frame(&mut self, ctx: &egui::Context, loaded: LoadedFrame) {
        let labels = self.project.as_ref().map(|p| p.labels.clone()).unwrap_or_default();
        let size = [loaded.width as usize, loaded.height as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &loaded.pixels);
        self.frame_texture = Some(ctx.load_texture("frame", color_image, egui::TextureOptions::LINEAR));

        let image_size = (loaded.width, loaded.height);
        let boxes = boxes_from_saved(&loaded.records, &labels, loaded.width, loaded.height);
        let controller = self
            .controller
            .get_or_insert_with(|| AnnotationController::new(image_size, labels.clone(), &self.settings));
        controller.set_labels(labels);
        controller.load(image_size, boxes);

        self.frame_index = loaded.frame_index;
        self.current_key = Some(loaded.key);
        self.canvas.request_fit();

        if self.subscription.is_none() {
            match self.keyboard.acquire(KEYBOARD_OWNER) {
                Ok(subscription) => self.subscription = Some(subscription),
                Err(e) => log::error!("Keyboard unavailable: {}", e),
            }
        }
    }

    fn frame_count(&self) -> usize {
        self.project
            .as_ref()
            .and_then(|p| p.videos.get(self.video_index))
            .map_or(0, |v| v.frames.len())
    }

    fn go_to_frame(&mut self, index: usize) {
        if index < self.frame_count() && self.frame_loader.is_none() {
            self.load_frame(index);
        }
    }

    fn select_video(&mut self, index: usize) {
        if index != self.video_index {
            self.video_index = index;
            self.load_frame(0);
        }
    }

    fn save(&mut self) {
        let (Some(controller), Some(key)) = (&self.controller, &self.current_key) else {
            return;
        };
        let snapshot = controller.save_snapshot();
        let count = snapshot.request.annotations.len();
        if self.saver.request_save(key.clone(), snapshot.revision, snapshot.request) == SaveDispatch::Started {
            log::info!("Saving {} boxes for frame {}", count, key.frame_id);
        }
    }

    fn handle_request(&mut self, request: HostRequest) {
        match request {
            HostRequest::PreviousFrame => {
                if let Some(index) = self.frame_index.checked_sub(1) {
                    self.go_to_frame(index);
                }
            }
            HostRequest::NextFrame => self.go_to_frame(self.frame_index + 1),
            HostRequest::Save => self.save(),
        }
    }

    fn poll_background(&mut self, ctx: &egui::Context) {
        if let Some(receiver) = &self.project_loader {
            if let Ok(result) = receiver.try_recv() {
                self.project_loader = None;
                self.loading_message = None;
                match result {
                    Ok(loaded) => self.install_project(loaded),
                    Err(e) => log::error!("{}", e),
                }
            }
        }

        if let Some(receiver) = &self.frame_loader {
            if let Ok(result) = receiver.try_recv() {
                self.frame_loader = None;
                self.loading_message = None;
                match result {
                    Ok(loaded) => self.mount_frame(ctx, loaded),
                    Err(e) => log::error!("Failed to load frame: {}", e),
                }
            }
        }

        if let Some(completion) = self.saver.poll() {
            let current = self.current_key.as_ref() == Some(&completion.key);
            if let (Ok(records), Some(controller), true) = (&completion.result, self.controller.as_mut(), current) {
                if controller.apply_saved(completion.revision, records) {
                    log::info!("Saved {} boxes", records.len());
                }
            }
        }
    }

    /// Route key events through the keyboard subscription.
    fn handle_keys(&mut self, ctx: &egui::Context) {
        let (Some(subscription), Some(controller)) = (&self.subscription, self.controller.as_mut()) else {
            return;
        };
        // Text fields keep their keys, except the picker's own search field.
        if ctx.wants_keyboard_input() && !controller.picker().is_open() {
            return;
        }

        let inputs: Vec<KeyInput> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key,
                        pressed,
                        repeat: false,
                        modifiers,
                        ..
                    } => key_input(*key, *pressed, *modifiers),
                    _ => None,
                })
                .collect()
        });

        let mut requests = Vec::new();
        for command in subscription.commands(&inputs) {
            if let Some(request) = controller.execute(command) {
                requests.push(request);
            }
        }
        for request in requests {
            self.handle_request(request);
        }
    }

    /// Write the project file (labels and frame list) as YAML or JSON.
    fn save_project_as(&self) {
        let Some(project) = &self.project else {
            return;
        };
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("YAML", &["yaml", "yml"])
            .add_filter("JSON", &["json"])
            .set_file_name("project.yaml")
            .save_file()
        {
            match crate::io::serialization::export_project(project, &path) {
                Ok(()) => log::info!("Saved project to {}", path.display()),
                Err(e) => log::error!("Failed to save project: {:#}", e),
            }
        }
    }

    fn export_coco(&self) {
        let Some(project) = &self.project else {
            return;
        };
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("COCO JSON", &["json"])
            .set_file_name("annotations.json")
            .save_file()
        {
            if let Err(e) = crate::io::export::export_coco(project, self.saver.store().as_ref(), &self.base_dir, &path) {
                log::error!("Failed to export COCO: {:#}", e);
            }
        }
    }

    fn export_yolo(&self) {
        let Some(project) = &self.project else {
            return;
        };
        if let Some(dir) = rfd::FileDialog::new().pick_folder() {
            if let Err(e) = crate::io::export::export_yolo(project, self.saver.store().as_ref(), &dir) {
                log::error!("Failed to export YOLO: {:#}", e);
            }
        }
    }

    fn menu_bar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open Project...").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Project", &["yaml", "yml", "json"])
                        .pick_file()
                    {
                        self.open_project(path);
                    }
                    ui.close_menu();
                }
                if ui
                    .add_enabled(self.project.is_some(), egui::Button::new("Save Project As..."))
                    .clicked()
                {
                    self.save_project_as();
                    ui.close_menu();
                }
                let can_save = self.controller.is_some() && !self.saver.is_saving();
                if ui.add_enabled(can_save, egui::Button::new("Save Frame (Ctrl+S)")).clicked() {
                    self.save();
                    ui.close_menu();
                }
                ui.separator();
                ui.add_enabled_ui(self.project.is_some(), |ui| {
                    ui.menu_button("Export Dataset", |ui| {
                        if ui.button("COCO JSON...").clicked() {
                            self.export_coco();
                            ui.close_menu();
                        }
                        if ui.button("YOLO TXT...").clicked() {
                            self.export_yolo();
                            ui.close_menu();
                        }
                    });
                });
                ui.separator();
                if ui.button("Quit").clicked() {
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("Edit", |ui| {
                let Some(controller) = self.controller.as_mut() else {
                    ui.label(egui::RichText::new("No frame loaded").weak());
                    return;
                };
                if ui
                    .add_enabled(controller.can_undo(), egui::Button::new("Undo (Ctrl+Z)"))
                    .clicked()
                {
                    controller.undo();
                    ui.close_menu();
                }
                if ui
                    .add_enabled(controller.can_redo(), egui::Button::new("Redo (Ctrl+Y)"))
                    .clicked()
                {
                    controller.redo();
                    ui.close_menu();
                }
                ui.separator();
                let has_selection = controller.selected_id().is_some();
                if ui
                    .add_enabled(has_selection, egui::Button::new("Delete Selected (Del)"))
                    .clicked()
                {
                    controller.delete_selected();
                    ui.close_menu();
                }
            });

            ui.menu_button("View", |ui| {
                if ui.button("Fit to Window").clicked() {
                    self.canvas.request_fit();
                    ui.close_menu();
                }
                if let Some(controller) = self.controller.as_mut() {
                    if ui.button("Toggle Labels (H)").clicked() {
                        controller.toggle_label_visibility();
                        ui.close_menu();
                    }
                    if ui.button("Remember Label Visibility").clicked() {
                        self.settings.show_all_labels = controller.show_all_labels();
                        if let Err(e) = self.settings.save() {
                            log::error!("Failed to save settings: {}", e);
                        }
                        ui.close_menu();
                    }
                }
            });
        });
    }
}

/// Translate an egui key transition to an editor key input.
fn key_input(key: egui::Key, pressed: bool, modifiers: egui::Modifiers) -> Option<KeyInput> {
    use egui::Key as K;

    let key = match key {
        K::D => Key::D,
        K::F => Key::F,
        K::S => Key::S,
        K::Q => Key::Q,
        K::V => Key::V,
        K::R => Key::R,
        K::H => Key::H,
        K::Z => Key::Z,
        K::Y => Key::Y,
        K::Num1 => Key::Digit(1),
        K::Num2 => Key::Digit(2),
        K::Num3 => Key::Digit(3),
        K::Num4 => Key::Digit(4),
        K::Num5 => Key::Digit(5),
        K::Num6 => Key::Digit(6),
        K::Num7 => Key::Digit(7),
        K::Num8 => Key::Digit(8),
        K::Num9 => Key::Digit(9),
        K::Escape => Key::Escape,
        K::Tab => Key::Tab,
        K::Delete => Key::Delete,
        K::Backspace => Key::Backspace,
        K::Space => Key::Space,
        _ => return None,
    };
    let mut input = if pressed {
        KeyInput::press(key)
    } else {
        KeyInput::release(key)
    };
    if modifiers.command {
        input = input.with_ctrl();
    }
    if modifiers.shift {
        input = input.with_shift();
    }
    Some(input)
}

impl eframe::App for AnnotatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_background(ctx);

        // Keep polling while background work is outstanding.
        if self.loading_message.is_some() || self.saver.is_saving() {
            ctx.request_repaint();
        }

        self.handle_keys(ctx);

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ctx, ui);
        });

        let status = self.saver.status().clone();
        let toolbar_request = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| {
                self.controller
                    .as_mut()
                    .and_then(|controller| toolbar::show(ui, controller, &status))
            })
            .inner;
        if let Some(request) = toolbar_request {
            self.handle_request(request);
        }

        let mut seek = None;
        let mut video_choice = None;
        if let Some(project) = &self.project {
            egui::TopBottomPanel::bottom("timeline").show(ctx, |ui| {
                if project.videos.len() > 1 {
                    let current = project.videos.get(self.video_index).map_or("", |v| v.name.as_str());
                    egui::ComboBox::from_label("Video")
                        .selected_text(current)
                        .show_ui(ui, |ui| {
                            for (index, video) in project.videos.iter().enumerate() {
                                if ui.selectable_label(index == self.video_index, &video.name).clicked() {
                                    video_choice = Some(index);
                                }
                            }
                        });
                }
                if let Some(video) = project.videos.get(self.video_index) {
                    seek = timeline::show(ui, video, self.frame_index);
                }
            });
        }
        if let Some(index) = video_choice {
            self.select_video(index);
        } else if let Some(index) = seek {
            self.go_to_frame(index);
        }

        if let Some(controller) = self.controller.as_mut() {
            egui::SidePanel::right("properties")
                .default_width(250.0)
                .show(ctx, |ui| properties::show(ui, controller));
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(message) = &self.loading_message {
                ui.centered_and_justified(|ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(20.0);
                        ui.spinner();
                        ui.add_space(10.0);
                        ui.label(
                            egui::RichText::new(message)
                                .size(16.0)
                                .color(egui::Color32::from_gray(200)),
                        );
                    });
                });
            } else if let Some(controller) = self.controller.as_mut() {
                canvas::show(ui, controller, self.frame_texture.as_ref(), &mut self.canvas);
            } else {
                welcome(ui);
            }
        });

        if let Some(controller) = self.controller.as_mut() {
            match label_picker::show(ctx, controller) {
                label_picker::PickerAction::Pick(id) => log::debug!("Picked label {}", id),
                label_picker::PickerAction::Cancel => log::debug!("Picker cancelled"),
                label_picker::PickerAction::None => {}
            }
        }
    }
}

fn welcome(ui: &mut egui::Ui) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            ui.heading(
                egui::RichText::new("Frame Annotator")
                    .size(32.0)
                    .color(egui::Color32::from_gray(200)),
            );
            ui.add_space(20.0);
            ui.label(
                egui::RichText::new("Open a project to begin annotating")
                    .color(egui::Color32::from_gray(180)),
            );
            ui.add_space(10.0);
            ui.label(
                egui::RichText::new("File → Open Project...")
                    .weak()
                    .color(egui::Color32::from_gray(130)),
            );
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::commands::{map_key, Command};

    #[test]
    fn test_digit_keys_translate() {
        let input = key_input(egui::Key::Num3, true, egui::Modifiers::NONE).unwrap();
        assert_eq!(input, KeyInput::press(Key::Digit(3)));
        assert!(key_input(egui::Key::Num0, true, egui::Modifiers::NONE).is_none());
    }

    #[test]
    fn test_command_modifier_maps_to_ctrl() {
        let input = key_input(egui::Key::S, true, egui::Modifiers::COMMAND).unwrap();
        assert_eq!(map_key(input), Some(Command::Save));

        let input = key_input(egui::Key::Z, true, egui::Modifiers::COMMAND | egui::Modifiers::SHIFT).unwrap();
        assert_eq!(map_key(input), Some(Command::Redo));
    }

    #[test]
    fn test_space_release_ends_pan() {
        let input = key_input(egui::Key::Space, false, egui::Modifiers::NONE).unwrap();
        assert_eq!(map_key(input), Some(Command::EndPan));
    }
}
