//! Voxgate: shortcut-driven voice capture from the system tray.

mod app;
mod archive;
mod config;
mod context_probe;
mod error;
mod external_command;
mod hotkey_handler;
mod logging;
mod notifier;
mod output_handler;
mod paste_modifier_guard;
mod process_capture;
mod process_pipeline;
mod status_forwarder;
mod tray_icon_state;
mod tray_manager;
mod ui_command;

pub(crate) use {
    app::App,
    archive::TranscriptArchive,
    error::{AppError, Result as AppResult},
    hotkey_handler::{HotkeyHandler, Hotkeys},
    notifier::Notifier,
    output_handler::OutputHandler,
    paste_modifier_guard::PasteModifierGuard,
    process_capture::ProcessCapture,
    process_pipeline::ProcessPipeline,
    status_forwarder::StatusForwarder,
    tray_icon_state::TrayIconState,
    tray_manager::{TrayManager, TrayMenuAction, TrayMenuIds},
    ui_command::UiCommand,
};

use crate::{config::Config, process_capture::STALE_RECORDING_AGE};

use global_hotkey::GlobalHotKeyManager;
use tao::{
    event::{Event, StartCause},
    event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy},
};
use tokio::sync::watch;
use tracing::{error, info};
use voxgate_core::{SessionConfig, SessionRuntime, StatusBus};

/// Application entry point.
fn main() {
    // Flushes the log file on drop; held for the whole process.
    let _log_guard = logging::init();

    let event_loop = EventLoopBuilder::<UiCommand>::with_user_event().build();
    let proxy = event_loop.create_proxy();

    // TrayManager lives on the main thread - TrayIcon is !Send on all platforms.
    let mut tray_manager = match TrayManager::new() {
        Ok(tm) => tm,
        Err(e) => {
            error!("Failed to create TrayManager: {:?}", e);
            std::process::exit(1);
        }
    };

    // Dropping the manager unregisters every shortcut, so it lives in the
    // closure for the app's lifetime.
    let mut shortcuts: Option<(GlobalHotKeyManager, Hotkeys)> = None;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::UserEvent(command) => match command {
                UiCommand::SetIndicator { state, status } => {
                    if let Err(e) = tray_manager.update(state, &status) {
                        error!(error = ?e, "Failed to update tray icon");
                    }
                }
                UiCommand::SetRetryAvailable(available) => {
                    tray_manager.set_retry_available(available);
                }
                UiCommand::ArmEscape(armed) => {
                    if let Some((manager, hotkeys)) = &shortcuts {
                        HotkeyHandler::arm_escape(manager, hotkeys, armed);
                    }
                }
                UiCommand::Shutdown => {
                    info!("Leaving event loop");
                    *control_flow = ControlFlow::ExitWithCode(0);
                }
            },
            Event::NewEvents(StartCause::Init) => {
                let config = match Config::load() {
                    Ok(c) => c,
                    Err(e) => {
                        error!("Failed to load config: {:?}", e);
                        std::process::exit(1);
                    }
                };

                let session_config = match config.session_config() {
                    Ok(c) => c,
                    Err(e) => {
                        error!("Invalid session settings: {:?}", e);
                        std::process::exit(1);
                    }
                };

                #[cfg(target_os = "macos")]
                unsafe {
                    use core_foundation::runloop::{CFRunLoopGetMain, CFRunLoopWakeUp};
                    CFRunLoopWakeUp(CFRunLoopGetMain());
                }

                // Register on the main thread: tao's event loop pumps the
                // messages global-hotkey needs. Without a shortcut the app
                // keeps running so the tray can tell the user what to grant.
                let hotkeys = match HotkeyHandler::register(&config.shortcut.hotkey) {
                    Ok((manager, hotkeys)) => {
                        shortcuts = Some((manager, hotkeys));
                        Ok(hotkeys)
                    }
                    Err(e) => {
                        error!(error = ?e, "Failed to register hotkey");
                        Err(e.reason())
                    }
                };

                let proxy = proxy.clone();
                let menu_ids = tray_manager.menu_ids().clone();

                // The tokio runtime runs on its own thread; the tray and the
                // hotkey manager stay here.
                std::thread::spawn(move || {
                    let rt = match tokio::runtime::Runtime::new() {
                        Ok(rt) => rt,
                        Err(e) => {
                            error!("Failed to create tokio runtime: {:?}", e);
                            std::process::exit(1);
                        }
                    };

                    rt.block_on(run_services(config, session_config, hotkeys, menu_ids, proxy));
                });
            }
            _ => {}
        }
    });
}

/// Build the collaborators and run every async task until shutdown.
async fn run_services(
    config: Config,
    session_config: SessionConfig,
    hotkeys: Result<Hotkeys, String>,
    menu_ids: TrayMenuIds,
    proxy: EventLoopProxy<UiCommand>,
) {
    let bus = StatusBus::default();
    let status = bus.subscribe();

    let capture = ProcessCapture::new(config.capture.clone());
    if config.capture.privacy_mode {
        capture.remove_stale_recordings(STALE_RECORDING_AGE).await;
    }

    let archive = TranscriptArchive::new(config.archive.clone());
    let pipeline = ProcessPipeline::new(config.pipeline.clone(), config.behavior.clone(), archive);

    let (runtime, handle) = match SessionRuntime::new(session_config, capture, pipeline, bus) {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = ?e, "Failed to create session runtime");
            let _ = proxy.send_event(UiCommand::Shutdown);
            return;
        }
    };
    let runtime_task = tokio::spawn(runtime.run());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let hotkey_handler = match hotkeys {
        Ok(hotkeys) => Some(HotkeyHandler::new(hotkeys, handle.clone())),
        Err(detail) => {
            if let Err(e) = handle.permission_required(detail).await {
                error!(error = ?e, "Failed to report missing shortcut");
            }
            None
        }
    };
    let forwarder = StatusForwarder::new(status, proxy.clone());
    let notifier = Notifier::new(handle.toasts(), proxy.clone());
    let app = App {
        runtime: handle,
        menu_ids,
        shutdown_tx,
    };

    tokio::join!(
        async {
            let Some(hotkey_handler) = hotkey_handler else {
                return;
            };
            if let Err(e) = hotkey_handler.run(shutdown_rx.clone()).await {
                error!(error = ?e, "Hotkey handler error");
            }
        },
        async {
            if let Err(e) = forwarder.run(shutdown_rx.clone()).await {
                error!(error = ?e, "Status forwarder error");
            }
        },
        async {
            if let Err(e) = notifier.run(shutdown_rx.clone()).await {
                error!(error = ?e, "Notifier error");
            }
        },
        async {
            if let Err(e) = app.run().await {
                error!(error = ?e, "App error");
            }
        }
    );

    match runtime_task.await {
        Ok(Ok(())) => info!("Voxgate shut down successfully"),
        Ok(Err(e)) => error!(error = ?e, "Session runtime error"),
        Err(e) => error!(error = ?e, "Session runtime task panicked"),
    }

    let _ = proxy.send_event(UiCommand::Shutdown);
}
