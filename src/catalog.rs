//! Catalog service seam: stream URLs and play reporting.
//!
//! Reporting is best-effort telemetry. [`Reporter`] fires requests off
//! without waiting and only logs failures.

use crate::error::CatalogError;
use crate::model::Track;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;

mod subsonic;
pub use subsonic::SubsonicCatalog;

pub trait Catalog: Send + Sync {
    /// Streamable URL (or local path) for a track.
    fn stream_url(&self, track: &Track) -> String;
    fn report_now_playing(&self, track_id: &str) -> Result<(), CatalogError>;
    fn report_played(&self, track_id: &str) -> Result<(), CatalogError>;
}

/// Catalog for local files and plain URLs: the track id *is* the location.
#[derive(Debug, Default, Clone)]
pub struct LocalCatalog;

impl LocalCatalog {
    /// Build a track for a path or URL given on the command line.
    pub fn track_for(location: &str) -> Track {
        let title = Path::new(location.trim_end_matches('/'))
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| location.to_string());
        let mut track = Track::new(location, &title, 0);
        track.suffix = Path::new(location)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase());
        track
    }
}

impl Catalog for LocalCatalog {
    fn stream_url(&self, track: &Track) -> String {
        track.id.clone()
    }

    fn report_now_playing(&self, track_id: &str) -> Result<(), CatalogError> {
        tracing::info!(track = %track_id, "now playing");
        Ok(())
    }

    fn report_played(&self, track_id: &str) -> Result<(), CatalogError> {
        tracing::info!(track = %track_id, "played");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    NowPlaying(String),
    Played(String),
}

/// Fire-and-forget dispatcher for catalog reports.
#[derive(Clone)]
pub struct Reporter {
    catalog: Arc<dyn Catalog>,
    runtime: Option<Handle>,
}

impl Reporter {
    /// Dispatch on the current tokio runtime's blocking pool when there is
    /// one, inline otherwise.
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            catalog,
            runtime: Handle::try_current().ok(),
        }
    }

    /// Always report on the caller's thread. Only for catalogs that never block.
    pub fn inline(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            catalog,
            runtime: None,
        }
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub fn catalog_arc(&self) -> Arc<dyn Catalog> {
        self.catalog.clone()
    }

    pub fn dispatch(&self, report: Report) {
        match &self.runtime {
            Some(handle) => {
                let catalog = self.catalog.clone();
                handle.spawn_blocking(move || send_report(catalog.as_ref(), &report));
            }
            None => send_report(self.catalog.as_ref(), &report),
        }
    }
}

fn send_report(catalog: &dyn Catalog, report: &Report) {
    let result = match report {
        Report::NowPlaying(id) => catalog.report_now_playing(id),
        Report::Played(id) => catalog.report_played(id),
    };
    if let Err(e) = result {
        tracing::warn!(?report, error = %e, "catalog report dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FlakyCatalog {
        seen: Mutex<Vec<Report>>,
    }

    impl Catalog for FlakyCatalog {
        fn stream_url(&self, track: &Track) -> String {
            format!("http://server/stream/{}", track.id)
        }
        fn report_now_playing(&self, track_id: &str) -> Result<(), CatalogError> {
            self.seen.lock().unwrap().push(Report::NowPlaying(track_id.to_string()));
            Err(CatalogError::Unavailable)
        }
        fn report_played(&self, track_id: &str) -> Result<(), CatalogError> {
            self.seen.lock().unwrap().push(Report::Played(track_id.to_string()));
            Err(CatalogError::Request("timeout".to_string()))
        }
    }

    #[test]
    fn failed_reports_are_swallowed() {
        let catalog = Arc::new(FlakyCatalog::default());
        let reporter = Reporter::inline(catalog.clone());
        reporter.dispatch(Report::NowPlaying("a".to_string()));
        reporter.dispatch(Report::Played("a".to_string()));
        assert_eq!(catalog.seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn local_tracks_use_location_as_id() {
        let track = LocalCatalog::track_for("/music/Artist/01 - Song.FLAC");
        assert_eq!(track.id, "/music/Artist/01 - Song.FLAC");
        assert_eq!(track.title, "01 - Song");
        assert_eq!(track.suffix.as_deref(), Some("flac"));
        assert_eq!(LocalCatalog.stream_url(&track), track.id);
    }
}
