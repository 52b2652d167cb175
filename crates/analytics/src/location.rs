use crate::error::AnalyticsError;
use api_client::Url;
use parking_lot::RwLock;

/// Where the visitor currently is.
///
/// Filter events fall back to `path()` when the caller names no page, and
/// pagination events carry `href()`.
pub trait LocationProvider: Send + Sync {
    /// The path component, e.g. `/experts`.
    fn path(&self) -> String;

    /// The full URL including query string, e.g. `https://fxtools.example/experts?page=2`.
    fn href(&self) -> String;
}

/// A location that the application updates as the visitor navigates.
#[derive(Debug)]
pub struct SharedLocation {
    current: RwLock<Url>,
}

impl SharedLocation {
    pub fn new(url: &str) -> Result<Self, AnalyticsError> {
        let url = Url::parse(url).map_err(|_| AnalyticsError::InvalidLocation(url.to_string()))?;
        Ok(Self {
            current: RwLock::new(url),
        })
    }

    /// Moves to `target`, which may be absolute or relative to the current location.
    pub fn navigate(&self, target: &str) -> Result<(), AnalyticsError> {
        let mut current = self.current.write();
        let next = current
            .join(target)
            .map_err(|_| AnalyticsError::InvalidLocation(target.to_string()))?;
        *current = next;
        Ok(())
    }
}

impl LocationProvider for SharedLocation {
    fn path(&self) -> String {
        self.current.read().path().to_string()
    }

    fn href(&self) -> String {
        self.current.read().as_str().to_string()
    }
}
