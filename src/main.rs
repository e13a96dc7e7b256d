mod app;
mod capture;
mod config;
mod error;
mod recorder;
mod results;
mod ui;
mod uploader;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Duration;

use gtk4::prelude::*;

use app::{PreviewSync, ResultArchive, SessionController, SessionEvent};
use capture::MediaCaptureManager;
use config::Config;
use recorder::FfmpegCamera;
use ui::preview::GtkPreview;
use uploader::UploadCoordinator;

fn main() {
    env_logger::init();
    log::info!("Posture Capture starting");

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    // Uploads and the recorder are spawned from the GTK main thread.
    let _guard = rt.enter();

    let application = libadwaita::Application::builder()
        .application_id("io.github.PostureCapture")
        .build();

    application.connect_activate(on_activate);
    application.run();

    log::info!("Posture Capture exiting");
}

fn on_activate(app: &libadwaita::Application) {
    if let Some(window) = app.active_window() {
        window.present();
        return;
    }

    let config = Config::load();
    log::info!("Analysis endpoint: {}", config.analyze_endpoint());

    let (event_tx, event_rx) = async_channel::unbounded::<SessionEvent>();

    let dashboard = ui::dashboard::build_dashboard(app, event_tx.clone());
    let preview = GtkPreview::new(dashboard.rec_label.clone(), dashboard.video.clone());

    // ffmpeg gets its grace period plus a margin to be killed and reaped.
    let stop_timeout = config.camera.stop_grace() + Duration::from_secs(2);
    let client = reqwest::Client::new();
    let mut controller = SessionController::new(
        MediaCaptureManager::new(Box::new(FfmpegCamera::new(config.camera.clone())))
            .with_stop_timeout(stop_timeout),
        PreviewSync::new(Box::new(preview)),
        Arc::new(UploadCoordinator::new(client.clone(), config.analyze_endpoint())),
        event_tx,
    );
    if config.save_videos {
        let dir = config.video_dir();
        log::info!("Saving analyzed videos to {}", dir.display());
        controller = controller.with_archive(ResultArchive { client, dir });
    }

    dashboard.render(controller.state());
    dashboard.window.present();

    gtk4::glib::spawn_future_local(async move {
        while let Ok(event) = event_rx.recv().await {
            let flow = controller.handle_event(event).await;
            dashboard.render(controller.state());
            if flow.is_break() {
                dashboard.window.destroy();
                break;
            }
        }
    });
}
