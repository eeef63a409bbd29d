use clap::Parser;
use iced::widget::{button, canvas, column, container, horizontal_space, row, text, vertical_rule};
use iced::{window, Alignment, Border, Element, Length, Size, Subscription, Task, Theme};
use rfd::FileDialog;
use std::path::PathBuf;

mod config;
mod predict;
mod state;
mod ui;

use config::Config;
use state::crop::CropRect;
use state::intake::{self, SelectedFile, UploadError};
use state::prediction::Prediction;

/// Side length of the editor pane and width of the result boxes.
const PANE_SIZE: f32 = 420.0;

/// Main application state
struct PrescriptionReader {
    /// URL of the prediction endpoint
    endpoint: String,
    /// Shared HTTP client for all submissions
    client: reqwest::Client,
    /// The currently selected file, if any
    file: Option<SelectedFile>,
    /// Current crop geometry; undefined until a file is selected
    crop: Option<CropRect>,
    /// Prediction result and request lifecycle
    prediction: Prediction,
    /// Last upload validation error, shown next to the upload control
    upload_error: Option<UploadError>,
    /// Whether a file is currently dragged over the window
    drop_hover: bool,
    /// Current theme, toggled from the header bar
    theme: Theme,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked the drop zone to open the native file picker
    PickFile,
    /// A file was dropped onto the window
    FileDropped(PathBuf),
    /// A file drag entered (true) or left (false) the window
    DropHovering(bool),
    /// Background load and validation finished
    FileLoaded(Result<SelectedFile, UploadError>),
    /// The crop editor emitted new geometry
    CropChanged(CropRect),
    /// User pressed "Read"
    Submit,
    /// User pressed "Reset"
    Reset,
    /// A submission round trip finished, keyed by its attempt number
    PredictionComplete(u64, Result<String, String>),
    /// Header light/dark toggle
    ToggleTheme,
}

impl PrescriptionReader {
    /// Create a new instance of the application
    fn new(config: Config) -> (Self, Task<Message>) {
        log::info!("Prescription reader starting; endpoint {}", config.endpoint);

        (
            PrescriptionReader {
                endpoint: config.endpoint,
                client: reqwest::Client::new(),
                file: None,
                crop: None,
                prediction: Prediction::default(),
                upload_error: None,
                drop_hover: false,
                theme: Theme::Dark,
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PickFile => {
                // Show the native picker, filtered to the accepted formats
                let picked = FileDialog::new()
                    .set_title("Select Prescription Image")
                    .add_filter("Images", &["jpg", "jpeg", "png"])
                    .pick_file();

                if let Some(path) = picked {
                    return Task::perform(intake::load(path), Message::FileLoaded);
                }

                Task::none()
            }

            Message::FileDropped(path) => {
                self.drop_hover = false;
                Task::perform(intake::load(path), Message::FileLoaded)
            }

            Message::DropHovering(hovering) => {
                self.drop_hover = hovering;
                Task::none()
            }

            Message::FileLoaded(Ok(file)) => {
                self.upload_error = None;
                self.crop = Some(CropRect::initial_for(file.image_size()));
                // A result for a previous file must not survive its
                // replacement
                self.prediction.clear();
                // Replacing the selection drops the previous decoded
                // pixels and render handle
                self.file = Some(file);
                Task::none()
            }

            Message::FileLoaded(Err(error)) => {
                log::warn!("Upload rejected: {}", error);
                self.upload_error = Some(error);
                Task::none()
            }

            Message::CropChanged(rect) => {
                if self.file.is_some() {
                    self.crop = Some(rect);
                }
                Task::none()
            }

            Message::Submit => {
                let (Some(file), Some(crop)) = (&self.file, self.crop) else {
                    // "Read" is disabled without a file; nothing to submit
                    return Task::none();
                };

                let attempt = self.prediction.begin_attempt();
                log::info!(
                    "Submitting {}x{} crop at ({}, {}) of {} (attempt {})",
                    crop.width,
                    crop.height,
                    crop.left,
                    crop.top,
                    file.path.display(),
                    attempt
                );

                let request = predict::submit(
                    self.client.clone(),
                    self.endpoint.clone(),
                    file.pixels.clone(),
                    crop,
                );

                Task::perform(
                    async move {
                        request.await.map_err(|error| {
                            log::error!("Prediction request failed: {}", error);
                            error.to_string()
                        })
                    },
                    move |outcome| Message::PredictionComplete(attempt, outcome),
                )
            }

            Message::PredictionComplete(attempt, outcome) => {
                if self.prediction.apply(attempt, outcome) {
                    if let Some(predicted) = self.prediction.text() {
                        log::info!("✅ Prediction ready: {}", predicted);
                    }
                } else {
                    log::debug!("Discarded stale completion (attempt {})", attempt);
                }
                Task::none()
            }

            Message::Reset => {
                // Dropping the file releases the decoded pixels and the
                // renderer's cached texture
                self.file = None;
                self.crop = None;
                self.prediction.clear();
                self.upload_error = None;
                self.drop_hover = false;
                Task::none()
            }

            Message::ToggleTheme => {
                self.theme = match self.theme {
                    Theme::Light => Theme::Dark,
                    _ => Theme::Light,
                };
                Task::none()
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let content = row![
            container(self.view_form())
                .width(Length::Fill)
                .center_x(Length::Fill),
            vertical_rule(1),
            container(self.view_result())
                .width(Length::Fill)
                .center_x(Length::Fill),
        ]
        .spacing(24)
        .padding(24)
        .height(Length::Fill);

        column![self.view_header(), content].into()
    }

    /// Header bar: centered title, theme toggle on the right
    fn view_header(&self) -> Element<Message> {
        let toggle_label = match self.theme {
            Theme::Light => "Dark mode",
            _ => "Light mode",
        };

        row![
            horizontal_space(),
            text("Prescription Reader").size(36),
            horizontal_space(),
            button(toggle_label)
                .style(button::text)
                .on_press(Message::ToggleTheme),
        ]
        .padding(16)
        .align_y(Alignment::Center)
        .into()
    }

    /// Form pane: upload control / crop editor plus the action buttons
    fn view_form(&self) -> Element<Message> {
        let upload: Element<Message> = if let (Some(file), Some(crop)) = (&self.file, self.crop) {
            container(
                canvas(ui::cropper::CropEditor::new(
                    &file.handle,
                    file.image_size(),
                    crop,
                ))
                .width(Length::Fill)
                .height(Length::Fill),
            )
            .width(PANE_SIZE)
            .height(PANE_SIZE)
            .padding(6)
            .style(pane_border)
            .into()
        } else {
            let prompt = if self.drop_hover {
                "Drop the file here..."
            } else {
                "Drag & drop a file here, or click to select one"
            };
            let hovering = self.drop_hover;

            button(
                container(text(prompt))
                    .center_x(Length::Fill)
                    .center_y(Length::Fill),
            )
            .width(PANE_SIZE)
            .height(PANE_SIZE)
            .on_press(Message::PickFile)
            .style(move |theme, status| drop_zone(theme, status, hovering))
            .into()
        };

        let mut form = column![text("Upload Prescription Image").size(24), upload].spacing(20);

        if let Some(file) = &self.file {
            let name = file
                .path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            form = form.push(
                text(format!(
                    "{} ({} KB, {})",
                    name,
                    file.byte_size / 1024,
                    file.mime
                ))
                .size(13)
                .style(text::secondary),
            );
        }

        if let Some(error) = &self.upload_error {
            form = form.push(text(error.to_string()).size(14).style(text::danger));
        }

        form.push(
            row![
                button("Read")
                    .padding(10)
                    .on_press_maybe(self.file.as_ref().map(|_| Message::Submit)),
                button("Reset")
                    .padding(10)
                    .style(button::secondary)
                    .on_press(Message::Reset),
            ]
            .spacing(16),
        )
        .into()
    }

    /// Result pane: live crop preview and the predicted text
    fn view_result(&self) -> Element<Message> {
        let preview: Element<Message> = if let (Some(file), Some(crop)) = (&self.file, self.crop) {
            canvas(ui::preview::CropPreview::new(
                &file.handle,
                file.image_size(),
                crop,
            ))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
        } else {
            column![].into()
        };

        let mut details = column![].spacing(8).align_x(Alignment::Center);
        match self.prediction.text() {
            Some(predicted) => {
                details = details.push(text(predicted).size(18));
            }
            None => {
                details = details.push(text("No prediction yet").size(16).style(text::secondary));
            }
        }
        if self.prediction.is_pending() {
            details = details.push(
                text("Reading prescription...")
                    .size(14)
                    .style(text::secondary),
            );
        }
        if let Some(failure) = self.prediction.failure() {
            details = details.push(
                text(format!("Could not read the prescription: {failure}"))
                    .size(14)
                    .style(text::danger),
            );
            details = details.push(
                text("Press Read to try again.")
                    .size(14)
                    .style(text::secondary),
            );
        }

        column![
            text("Drug Details").size(24),
            container(preview)
                .width(PANE_SIZE)
                .height(120.0)
                .padding(6)
                .style(pane_border),
            container(details)
                .width(PANE_SIZE)
                .height(300.0)
                .padding(12)
                .align_x(Alignment::Center)
                .align_y(Alignment::Center)
                .style(pane_border),
        ]
        .spacing(20)
        .into()
    }

    /// React to window-level file drag and drop
    fn subscription(&self) -> Subscription<Message> {
        iced::event::listen_with(|event, _status, _window| match event {
            iced::Event::Window(window::Event::FileDropped(path)) => {
                Some(Message::FileDropped(path))
            }
            iced::Event::Window(window::Event::FileHovered(_)) => Some(Message::DropHovering(true)),
            iced::Event::Window(window::Event::FilesHoveredLeft) => {
                Some(Message::DropHovering(false))
            }
            _ => None,
        })
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        self.theme.clone()
    }
}

/// Bordered box shared by the editor and result surfaces
fn pane_border(theme: &Theme) -> container::Style {
    let palette = theme.extended_palette();
    container::Style {
        border: Border {
            color: palette.background.strong.color,
            width: 2.0,
            radius: 6.0.into(),
        },
        ..container::Style::default()
    }
}

/// Drop zone styling; highlighted while a file hovers over the window or
/// the pointer hovers the control
fn drop_zone(theme: &Theme, status: button::Status, hovering: bool) -> button::Style {
    let palette = theme.extended_palette();
    let active = hovering || status == button::Status::Hovered;

    button::Style {
        background: Some(iced::Background::Color(if active {
            palette.background.weak.color
        } else {
            palette.background.base.color
        })),
        text_color: palette.background.base.text,
        border: Border {
            color: if active {
                palette.primary.strong.color
            } else {
                palette.background.strong.color
            },
            width: 2.0,
            radius: 6.0.into(),
        },
        ..button::Style::default()
    }
}

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();

    iced::application(
        "Prescription Reader",
        PrescriptionReader::update,
        PrescriptionReader::view,
    )
    .subscription(PrescriptionReader::subscription)
    .theme(PrescriptionReader::theme)
    .window_size(Size::new(1100.0, 760.0))
    .centered()
    .run_with(move || PrescriptionReader::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn app() -> PrescriptionReader {
        let (app, _task) = PrescriptionReader::new(Config {
            endpoint: config::DEFAULT_ENDPOINT.to_string(),
        });
        app
    }

    fn loaded_file(name: &str) -> SelectedFile {
        let pixels = image::DynamicImage::ImageRgba8(image::RgbaImage::new(640, 480));
        let rgba = pixels.to_rgba8();
        SelectedFile {
            path: PathBuf::from(name),
            byte_size: rgba.len() as u64,
            mime: "image/png",
            width: 640,
            height: 480,
            handle: iced::widget::image::Handle::from_rgba(640, 480, rgba.into_raw()),
            pixels: Arc::new(pixels),
        }
    }

    #[test]
    fn test_submit_without_file_sends_nothing() {
        let mut app = app();
        let _ = app.update(Message::Submit);
        assert_eq!(app.prediction.attempts(), 0);
    }

    #[test]
    fn test_loading_a_file_sets_the_default_crop() {
        let mut app = app();
        let _ = app.update(Message::FileLoaded(Ok(loaded_file("rx.png"))));

        assert!(app.file.is_some());
        assert_eq!(
            app.crop,
            Some(CropRect {
                left: 100.0,
                top: 100.0,
                width: 400.0,
                height: 100.0
            })
        );
        assert_eq!(app.upload_error, None);
    }

    #[test]
    fn test_round_trip_displays_predicted_text() {
        let mut app = app();
        let _ = app.update(Message::FileLoaded(Ok(loaded_file("rx.png"))));
        let _ = app.update(Message::Submit);

        let attempt = app.prediction.attempts();
        assert_eq!(attempt, 1);

        let _ = app.update(Message::PredictionComplete(
            attempt,
            Ok("Amoxicillin 500mg".to_string()),
        ));
        assert_eq!(app.prediction.text(), Some("Amoxicillin 500mg"));
    }

    #[test]
    fn test_latest_submission_wins() {
        let mut app = app();
        let _ = app.update(Message::FileLoaded(Ok(loaded_file("rx.png"))));
        let _ = app.update(Message::Submit);
        let _ = app.update(Message::Submit);

        let _ = app.update(Message::PredictionComplete(1, Ok("first".to_string())));
        assert_eq!(app.prediction.text(), None);

        let _ = app.update(Message::PredictionComplete(2, Ok("second".to_string())));
        assert_eq!(app.prediction.text(), Some("second"));
    }

    #[test]
    fn test_failed_request_keeps_prior_result_and_surfaces_error() {
        let mut app = app();
        let _ = app.update(Message::FileLoaded(Ok(loaded_file("rx.png"))));
        let _ = app.update(Message::Submit);
        let _ = app.update(Message::PredictionComplete(
            1,
            Ok("Amoxicillin 500mg".to_string()),
        ));

        let _ = app.update(Message::Submit);
        let _ = app.update(Message::PredictionComplete(
            2,
            Err("connection refused".to_string()),
        ));

        assert_eq!(app.prediction.text(), Some("Amoxicillin 500mg"));
        assert_eq!(app.prediction.failure(), Some("connection refused"));
    }

    #[test]
    fn test_validation_failure_leaves_prediction_absent() {
        let mut app = app();
        let _ = app.update(Message::FileLoaded(Err(UploadError::TooLarge)));

        assert_eq!(app.upload_error, Some(UploadError::TooLarge));
        assert!(app.file.is_none());
        assert_eq!(app.prediction.text(), None);
    }

    #[test]
    fn test_crop_change_touches_only_the_crop() {
        let mut app = app();
        let _ = app.update(Message::FileLoaded(Ok(loaded_file("rx.png"))));
        let _ = app.update(Message::Submit);
        let _ = app.update(Message::PredictionComplete(
            1,
            Ok("Amoxicillin 500mg".to_string()),
        ));

        let rect = CropRect {
            left: 10.0,
            top: 10.0,
            width: 200.0,
            height: 80.0,
        };
        let _ = app.update(Message::CropChanged(rect));

        assert_eq!(app.crop, Some(rect));
        assert_eq!(app.file.as_ref().unwrap().path, PathBuf::from("rx.png"));
        assert_eq!(app.prediction.text(), Some("Amoxicillin 500mg"));
    }

    #[test]
    fn test_replacing_the_file_clears_the_previous_result() {
        let mut app = app();
        let _ = app.update(Message::FileLoaded(Ok(loaded_file("first.png"))));
        let _ = app.update(Message::Submit);
        let _ = app.update(Message::PredictionComplete(1, Ok("old text".to_string())));

        let _ = app.update(Message::FileLoaded(Ok(loaded_file("second.png"))));
        assert_eq!(app.prediction.text(), None);
        assert_eq!(app.file.as_ref().unwrap().path, PathBuf::from("second.png"));
    }

    #[test]
    fn test_reset_returns_to_the_initial_state() {
        let mut app = app();
        let _ = app.update(Message::FileLoaded(Ok(loaded_file("rx.png"))));
        let _ = app.update(Message::Submit);
        let _ = app.update(Message::PredictionComplete(
            1,
            Ok("Amoxicillin 500mg".to_string()),
        ));

        let _ = app.update(Message::Reset);

        assert!(app.file.is_none());
        assert!(app.crop.is_none());
        assert_eq!(app.prediction.text(), None);
        assert_eq!(app.prediction.failure(), None);
        assert_eq!(app.upload_error, None);
        assert!(!app.drop_hover);
    }

    #[test]
    fn test_completion_after_reset_is_discarded() {
        let mut app = app();
        let _ = app.update(Message::FileLoaded(Ok(loaded_file("rx.png"))));
        let _ = app.update(Message::Submit);
        let _ = app.update(Message::Reset);

        let _ = app.update(Message::PredictionComplete(1, Ok("ghost".to_string())));
        assert_eq!(app.prediction.text(), None);
    }

    #[test]
    fn test_drop_hover_tracks_drag_events() {
        let mut app = app();
        let _ = app.update(Message::DropHovering(true));
        assert!(app.drop_hover);
        let _ = app.update(Message::DropHovering(false));
        assert!(!app.drop_hover);
    }
}
