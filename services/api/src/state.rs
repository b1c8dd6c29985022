//! Application state shared across handlers

use medialibrary::MediaLibrary;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub library: MediaLibrary,
}
