//! System tray icon with state-based updates.
//!
//! Manages a system tray icon with four states (Idle, Recording, Processing,
//! Error), a status line and a context menu for retrying errors, settings
//! and exit.

use crate::{AppError, AppResult, TrayIconState};

use std::panic::Location;

use error_location::ErrorLocation;
use image::{Rgba, RgbaImage};
use tracing::{debug, info, instrument};
use tray_icon::{
    Icon, TrayIcon, TrayIconBuilder,
    menu::{Menu, MenuId, MenuItem, PredefinedMenuItem},
};

/// Edge length of the generated icon in pixels.
const ICON_SIZE: u32 = 32;

/// Menu actions the async side reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayMenuAction {
    /// Retry the most recent retryable error.
    RetryLastError,
    /// Dismiss every visible error.
    DismissErrors,
    /// Re-read the config file and apply it from the next session.
    ReloadSettings,
    /// Open the config file.
    OpenSettings,
    /// Quit.
    Exit,
}

/// Identifiers of the actionable menu items. `Send`, unlike the menu.
#[derive(Debug, Clone)]
pub struct TrayMenuIds {
    pub(crate) retry: MenuId,
    pub(crate) dismiss: MenuId,
    pub(crate) reload: MenuId,
    pub(crate) settings: MenuId,
    pub(crate) exit: MenuId,
}

impl TrayMenuIds {
    /// Map a clicked item to its action.
    pub fn action_for(&self, id: &MenuId) -> Option<TrayMenuAction> {
        [
            (&self.retry, TrayMenuAction::RetryLastError),
            (&self.dismiss, TrayMenuAction::DismissErrors),
            (&self.reload, TrayMenuAction::ReloadSettings),
            (&self.settings, TrayMenuAction::OpenSettings),
            (&self.exit, TrayMenuAction::Exit),
        ]
        .into_iter()
        .find_map(|(item, action)| (item == id).then_some(action))
    }
}

/// System tray icon manager. Lives on the main thread.
pub struct TrayManager {
    tray_icon: TrayIcon,
    status_item: MenuItem,
    retry_item: MenuItem,
    ids: TrayMenuIds,
    state: TrayIconState,
}

impl TrayManager {
    /// Create a new tray manager in the Idle state.
    #[track_caller]
    #[instrument]
    pub fn new() -> AppResult<Self> {
        let menu = Menu::new();

        let status_item = MenuItem::new("Ready", false, None);
        let retry_item = MenuItem::new("Retry Last Error", false, None);
        let dismiss_item = MenuItem::new("Dismiss Errors", true, None);
        let reload_item = MenuItem::new("Reload Settings", true, None);
        let settings_item = MenuItem::new("Settings", true, None);
        let exit_item = MenuItem::new("Exit", true, None);

        let ids = TrayMenuIds {
            retry: retry_item.id().clone(),
            dismiss: dismiss_item.id().clone(),
            reload: reload_item.id().clone(),
            settings: settings_item.id().clone(),
            exit: exit_item.id().clone(),
        };

        menu.append_items(&[
            &status_item,
            &PredefinedMenuItem::separator(),
            &retry_item,
            &dismiss_item,
            &PredefinedMenuItem::separator(),
            &reload_item,
            &settings_item,
            &exit_item,
        ])
        .map_err(|e| AppError::TrayError {
            reason: format!("Failed to build tray menu: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let state = TrayIconState::Idle;
        let tray_icon = TrayIconBuilder::new()
            .with_tooltip(state.tooltip())
            .with_menu(Box::new(menu))
            .with_icon(Self::load_icon(state)?)
            .build()
            .map_err(|e| AppError::TrayError {
                reason: format!("Failed to create tray icon: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!("System tray icon initialized");

        Ok(Self {
            tray_icon,
            status_item,
            retry_item,
            ids,
            state,
        })
    }

    /// Update the icon, tooltip and status line.
    ///
    /// The icon is only rebuilt when the state changes; the status line
    /// (elapsed time, stage, message) changes far more often.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn update(&mut self, state: TrayIconState, status: &str) -> AppResult<()> {
        if state != self.state {
            self.tray_icon
                .set_icon(Some(Self::load_icon(state)?))
                .map_err(|e| AppError::TrayError {
                    reason: format!("Failed to update icon: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            self.tray_icon
                .set_tooltip(Some(state.tooltip()))
                .map_err(|e| AppError::TrayError {
                    reason: format!("Failed to update tooltip: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                })?;

            debug!(from = ?self.state, to = ?state, "Tray state changed");
            self.state = state;
        }

        self.status_item.set_text(status);

        Ok(())
    }

    /// Enable or disable the retry item.
    pub fn set_retry_available(&mut self, available: bool) {
        self.retry_item.set_enabled(available);
    }

    /// Identifiers of the actionable items.
    pub fn menu_ids(&self) -> &TrayMenuIds {
        &self.ids
    }

    /// Build the icon for `state`: a filled disc in the state's color.
    #[track_caller]
    fn load_icon(state: TrayIconState) -> AppResult<Icon> {
        let rgba = render_disc(ICON_SIZE, state.color());
        let (width, height) = (rgba.width(), rgba.height());

        Icon::from_rgba(rgba.into_raw(), width, height).map_err(|e| AppError::TrayError {
            reason: format!("Failed to create icon from RGBA: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

/// Square RGBA image with a centered disc, transparent elsewhere.
pub(crate) fn render_disc(size: u32, color: [u8; 4]) -> RgbaImage {
    let center = size as f32 / 2.0;
    let radius = center - 1.0;

    RgbaImage::from_fn(size, size, |x, y| {
        let dx = x as f32 + 0.5 - center;
        let dy = y as f32 + 0.5 - center;
        let distance = (dx * dx + dy * dy).sqrt();

        // One pixel of linear falloff for a smooth edge.
        let coverage = (radius - distance + 0.5).clamp(0.0, 1.0);
        let [r, g, b, a] = color;
        Rgba([r, g, b, (f32::from(a) * coverage).round() as u8])
    })
}
