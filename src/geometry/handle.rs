//! Ownership-tracked binding between a wrapper and an engine allocation.

use crate::engine::{Engine, RawGeometry};

/// A wrapper's grip on one engine token.
///
/// The `owns` flag records whether dropping this handle must release the
/// underlying allocation. Non-owning handles alias storage owned elsewhere
/// (typically a part of a parent geometry) and never trigger a release.
#[derive(Debug)]
pub struct Handle {
    engine: Engine,
    raw: Option<RawGeometry>,
    owns: bool,
}

impl Handle {
    /// A handle bound to an engine but holding no geometry.
    pub fn empty(engine: Engine) -> Self {
        Handle {
            engine,
            raw: None,
            owns: false,
        }
    }

    /// Installs a token. Replacing a live token releases it first so the
    /// previous allocation cannot leak.
    pub(crate) fn install(&mut self, raw: RawGeometry, owns: bool) {
        debug_assert!(self.raw.is_none(), "installing over a live handle");
        self.release();
        self.raw = Some(raw);
        self.owns = owns;
    }

    pub fn raw(&self) -> Option<RawGeometry> {
        self.raw
    }

    pub fn owns(&self) -> bool {
        self.owns
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Drops the grip on the current token, releasing the engine allocation
    /// when owned. Safe to call repeatedly; later calls are no-ops.
    pub fn release(&mut self) {
        if let Some(raw) = self.raw.take() {
            if self.owns {
                self.engine.release(raw);
            }
            self.owns = false;
        }
    }

    /// Renounces ownership without dropping the token. The allocation's
    /// lifetime is someone else's problem afterwards.
    pub(crate) fn demote(&mut self) {
        self.owns = false;
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod test {
    use geo::point;

    use crate::engine::{Engine, GeoEngine, GeometryEngine};
    use std::sync::Arc;

    use super::*;

    fn engine_and_token() -> (Arc<GeoEngine>, Engine, RawGeometry) {
        let backend = Arc::new(GeoEngine::new());
        let engine: Engine = backend.clone();
        let raw = backend
            .from_geo(geo::Geometry::Point(point!(x: 1.0, y: 2.0)))
            .unwrap();
        (backend, engine, raw)
    }

    #[test]
    fn owning_handle_releases_on_drop() {
        let (backend, engine, raw) = engine_and_token();
        {
            let mut handle = Handle::empty(engine);
            handle.install(raw, true);
            assert_eq!(backend.live_geometries(), 1);
        }
        assert_eq!(backend.live_geometries(), 0);
    }

    #[test]
    fn non_owning_handle_leaves_the_allocation_alone() {
        let (backend, engine, raw) = engine_and_token();
        {
            let mut handle = Handle::empty(engine);
            handle.install(raw, false);
        }
        assert_eq!(backend.live_geometries(), 1);
    }

    #[test]
    fn release_is_idempotent() {
        let (backend, engine, raw) = engine_and_token();
        let mut handle = Handle::empty(engine);
        handle.install(raw, true);
        handle.release();
        assert_eq!(backend.live_geometries(), 0);
        handle.release();
        assert!(handle.raw().is_none());
        assert!(!handle.owns());
    }

    #[test]
    fn demoted_handle_keeps_the_token_but_not_the_duty() {
        let (backend, engine, raw) = engine_and_token();
        let mut handle = Handle::empty(engine);
        handle.install(raw, true);
        handle.demote();
        assert_eq!(handle.raw(), Some(raw));
        drop(handle);
        assert_eq!(backend.live_geometries(), 1);
    }
}
