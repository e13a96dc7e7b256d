use gtk4::glib;
use gtk4::prelude::*;
use libadwaita::prelude::*;

use super::file_input::open_video_dialog;
use super::summary::{mode_label, render_summary, status_line};
use crate::app::{Mode, Phase, SessionEvent, SessionState, UserCommand};

/// Handles returned from building the dashboard window.
pub struct DashboardWidgets {
    pub window: libadwaita::ApplicationWindow,
    pub status_label: gtk4::Label,
    pub spinner: gtk4::Spinner,
    pub upload_group: libadwaita::PreferencesGroup,
    pub file_row: libadwaita::ActionRow,
    pub choose_button: gtk4::Button,
    pub submit_button: gtk4::Button,
    pub record_group: libadwaita::PreferencesGroup,
    pub start_button: gtk4::Button,
    pub stop_button: gtk4::Button,
    pub rec_label: gtk4::Label,
    pub result_group: libadwaita::PreferencesGroup,
    pub video: gtk4::Video,
    pub video_row: libadwaita::ActionRow,
    pub summary_label: gtk4::Label,
}

fn send(sender: &async_channel::Sender<SessionEvent>, command: UserCommand) {
    if sender.try_send(SessionEvent::Command(command)).is_err() {
        log::warn!("Session loop closed, dropping UI command");
    }
}

fn mode_toggle(
    mode: Mode,
    sender: &async_channel::Sender<SessionEvent>,
) -> gtk4::ToggleButton {
    let button = gtk4::ToggleButton::with_label(mode_label(mode));
    let sender = sender.clone();
    button.connect_toggled(move |b| {
        if b.is_active() {
            send(&sender, UserCommand::SetMode(mode));
        }
    });
    button
}

/// Build the main window. Every control sends a `UserCommand` through
/// `sender`; nothing here touches session state directly.
pub fn build_dashboard(
    app: &libadwaita::Application,
    sender: async_channel::Sender<SessionEvent>,
) -> DashboardWidgets {
    let window = libadwaita::ApplicationWindow::builder()
        .application(app)
        .title("Posture Capture")
        .default_width(520)
        .default_height(720)
        .build();

    let toolbar_view = libadwaita::ToolbarView::new();
    let header = libadwaita::HeaderBar::new();

    // Mode selector
    let upload_toggle = mode_toggle(Mode::Upload, &sender);
    let record_toggle = mode_toggle(Mode::Record, &sender);
    record_toggle.set_group(Some(&upload_toggle));
    upload_toggle.set_active(true);

    let mode_box = gtk4::Box::new(gtk4::Orientation::Horizontal, 0);
    mode_box.add_css_class("linked");
    mode_box.append(&upload_toggle);
    mode_box.append(&record_toggle);
    header.set_title_widget(Some(&mode_box));
    toolbar_view.add_top_bar(&header);

    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 12);
    content.set_margin_start(16);
    content.set_margin_end(16);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    // --- Status group ---
    let status_group = libadwaita::PreferencesGroup::new();
    status_group.set_title("Status");

    let status_row = libadwaita::ActionRow::builder()
        .title("Session")
        .build();
    let status_label = gtk4::Label::new(None);
    status_label.add_css_class("dim-label");
    status_label.set_wrap(true);
    let spinner = gtk4::Spinner::new();
    spinner.set_visible(false);
    status_row.add_suffix(&spinner);
    status_row.add_suffix(&status_label);
    status_group.add(&status_row);
    content.append(&status_group);

    // --- Upload group ---
    let upload_group = libadwaita::PreferencesGroup::new();
    upload_group.set_title("Upload Video");

    let file_row = libadwaita::ActionRow::builder()
        .title("Video File")
        .subtitle("No file selected")
        .build();
    let choose_button = gtk4::Button::builder()
        .label("Choose\u{2026}")
        .valign(gtk4::Align::Center)
        .build();
    file_row.add_suffix(&choose_button);
    upload_group.add(&file_row);

    let submit_button = gtk4::Button::builder()
        .label("Analyze Posture")
        .halign(gtk4::Align::Center)
        .margin_top(12)
        .build();
    submit_button.add_css_class("suggested-action");
    submit_button.add_css_class("pill");
    upload_group.add(&submit_button);
    content.append(&upload_group);

    // --- Record group ---
    let record_group = libadwaita::PreferencesGroup::new();
    record_group.set_title("Record Video");
    record_group.set_visible(false);

    let rec_label = gtk4::Label::new(None);
    rec_label.add_css_class("error");
    rec_label.add_css_class("monospace");
    rec_label.set_visible(false);
    record_group.add(&rec_label);

    let record_buttons = gtk4::Box::new(gtk4::Orientation::Horizontal, 12);
    record_buttons.set_halign(gtk4::Align::Center);
    record_buttons.set_margin_top(12);
    let start_button = gtk4::Button::with_label("Start Recording");
    start_button.add_css_class("suggested-action");
    start_button.add_css_class("pill");
    let stop_button = gtk4::Button::with_label("Stop Recording");
    stop_button.add_css_class("destructive-action");
    stop_button.add_css_class("pill");
    record_buttons.append(&start_button);
    record_buttons.append(&stop_button);
    record_group.add(&record_buttons);
    content.append(&record_group);

    // --- Result group ---
    let result_group = libadwaita::PreferencesGroup::new();
    result_group.set_title("Analysis Result");
    result_group.set_visible(false);

    let video = gtk4::Video::new();
    video.set_autoplay(true);
    video.set_height_request(280);
    video.set_visible(false);
    result_group.add(&video);

    let video_row = libadwaita::ActionRow::builder()
        .title("Processed Video")
        .subtitle_selectable(true)
        .build();
    result_group.add(&video_row);

    let summary_label = gtk4::Label::new(None);
    summary_label.add_css_class("monospace");
    summary_label.set_xalign(0.0);
    summary_label.set_selectable(true);
    summary_label.set_margin_top(12);
    result_group.add(&summary_label);
    content.append(&result_group);

    // Assemble
    let scrolled = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .child(&content)
        .build();
    toolbar_view.set_content(Some(&scrolled));
    window.set_content(Some(&toolbar_view));

    // Wire up controls
    {
        let sender = sender.clone();
        let parent = window.clone();
        choose_button.connect_clicked(move |_| open_video_dialog(&parent, sender.clone()));
    }
    {
        let sender = sender.clone();
        submit_button.connect_clicked(move |_| send(&sender, UserCommand::Submit));
    }
    {
        let sender = sender.clone();
        start_button.connect_clicked(move |_| send(&sender, UserCommand::StartRecording));
    }
    {
        let sender = sender.clone();
        stop_button.connect_clicked(move |_| send(&sender, UserCommand::StopRecording));
    }
    // Closing goes through the session so the camera is released first.
    window.connect_close_request(move |_| {
        send(&sender, UserCommand::Quit);
        glib::Propagation::Stop
    });

    DashboardWidgets {
        window,
        status_label,
        spinner,
        upload_group,
        file_row,
        choose_button,
        submit_button,
        record_group,
        start_button,
        stop_button,
        rec_label,
        result_group,
        video,
        video_row,
        summary_label,
    }
}

impl DashboardWidgets {
    /// Bring every widget in line with `state`. Called after each event.
    pub fn render(&self, state: &SessionState) {
        let phase = state.phase();
        let upload = state.mode() == Mode::Upload;
        let ready = matches!(phase, Phase::Idle | Phase::Result);

        self.status_label.set_text(&status_line(state));
        let uploading = phase == Phase::Uploading;
        self.spinner.set_visible(uploading);
        self.spinner.set_spinning(uploading);

        self.upload_group.set_visible(upload);
        self.file_row.set_subtitle(
            state
                .selected_file()
                .map(|f| f.name())
                .unwrap_or("No file selected"),
        );
        self.choose_button.set_sensitive(ready);
        self.submit_button
            .set_sensitive(upload && ready && state.selected_file().is_some());

        self.record_group.set_visible(!upload);
        self.start_button.set_sensitive(!upload && ready);
        self.stop_button.set_sensitive(phase == Phase::Recording);

        match (state.summary(), state.result_video()) {
            (Some(summary), Some(url)) => {
                self.summary_label.set_text(&render_summary(summary));
                self.video_row.set_subtitle(url);
                self.result_group.set_visible(true);
            }
            _ => {
                self.summary_label.set_text("");
                self.video_row.set_subtitle("");
                self.result_group.set_visible(false);
            }
        }
    }
}
