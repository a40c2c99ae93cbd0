//! Cancel-and-replace ownership of the currently inspected asset.
//!
//! Loads may complete out of order. Each load takes a [`LoadTicket`] when it
//! starts; only the result carrying the newest ticket is installed.

use tracing::warn;

use crate::error::Result;
use crate::loader::LoadedAsset;

/// Generation marker handed out by [`InspectorSession::begin_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

impl LoadTicket {
    /// Numeric form, for handing tickets across an FFI boundary.
    pub fn id(self) -> u64 {
        self.0
    }

    pub fn from_id(id: u64) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The result became the current asset.
    Installed,
    /// A newer load was started; the result was dropped.
    Superseded,
}

#[derive(Debug, Default)]
pub struct InspectorSession {
    generation: u64,
    current: Option<LoadedAsset>,
}

impl InspectorSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a load, invalidating every ticket issued before.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket(self.generation)
    }

    /// Offer the result of the load identified by `ticket`.
    ///
    /// Stale results are dropped, errors included. A failed latest load
    /// leaves the current asset in place and returns the error.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<LoadedAsset>) -> Result<LoadOutcome> {
        if ticket.0 != self.generation {
            warn!(ticket = ticket.0, current = self.generation, "dropping superseded load");
            return Ok(LoadOutcome::Superseded);
        }
        self.current = Some(result?);
        Ok(LoadOutcome::Installed)
    }

    pub fn current(&self) -> Option<&LoadedAsset> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::loader::load_package;
    use crate::options::LoadOptions;
    use crate::package::FilePackage;

    fn asset(name: &str) -> Result<LoadedAsset> {
        let json = format!(r#"{{"asset": {{"version": "2.0"}}, "nodes": [{{"name": "{}"}}]}}"#, name);
        load_package(
            FilePackage::from_files([("scene.gltf", json.into_bytes())])?,
            &LoadOptions::default(),
        )
    }

    fn current_name(session: &InspectorSession) -> Option<String> {
        session.current()?.document().nodes[0].name.clone()
    }

    #[test]
    fn test_latest_load_wins() {
        let mut session = InspectorSession::new();
        let first = session.begin_load();
        let second = session.begin_load();

        assert_eq!(session.finish_load(second, asset("second")).unwrap(), LoadOutcome::Installed);
        assert_eq!(session.finish_load(first, asset("first")).unwrap(), LoadOutcome::Superseded);
        assert_eq!(current_name(&session).as_deref(), Some("second"));
    }

    #[test]
    fn test_stale_error_is_dropped() {
        let mut session = InspectorSession::new();
        let stale = session.begin_load();
        let _latest = session.begin_load();

        let outcome = session.finish_load(stale, Err(LoadError::NoRootAsset(0)));
        assert_eq!(outcome.unwrap(), LoadOutcome::Superseded);
    }

    #[test]
    fn test_failed_latest_load_keeps_current() {
        let mut session = InspectorSession::new();
        let ticket = session.begin_load();
        session.finish_load(ticket, asset("kept")).unwrap();

        let ticket = session.begin_load();
        assert!(session.finish_load(ticket, Err(LoadError::NoRootAsset(0))).is_err());
        assert_eq!(current_name(&session).as_deref(), Some("kept"));

        session.clear();
        assert!(session.current().is_none());
    }
}
