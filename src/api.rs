//! Entry points for binding layers.
//!
//! A thin, call-per-operation surface over [`Session`]: a handle is created
//! by [`start`], driven with [`step`] and [`reset`], and consumed by [`end`].
//! Seeds are read and written through the handle.

use std::path::Path;

use crate::error::BridgeResult;
use crate::obs::ObservationBuffers;
use crate::seed::Seeds;
use crate::session::Session;
use crate::settings::Settings;
use crate::sim::{EndCause, ModuleLoader};

/// An owned, started session.
#[derive(Debug)]
pub struct Handle<'b> {
    session: Box<Session<'b>>,
}

impl<'b> Handle<'b> {
    /// The underlying session.
    #[must_use]
    pub fn session(&self) -> &Session<'b> {
        &self.session
    }

    /// The underlying session, mutably.
    pub fn session_mut(&mut self) -> &mut Session<'b> {
        &mut self.session
    }

    /// Whether the current episode ended.
    #[must_use]
    pub fn done(&self) -> bool {
        self.session.done()
    }

    /// How the current episode ended.
    #[must_use]
    pub fn how_done(&self) -> Option<EndCause> {
        self.session.how_done()
    }
}

/// Load `dlpath`, bind `buffers`, and run the first episode to its first
/// input request.
///
/// # Errors
///
/// Any error of [`Session::new`], [`Session::set_buffers`] or
/// [`Session::start`].
pub fn start<'b>(
    dlpath: &Path,
    loader: &dyn ModuleLoader,
    buffers: ObservationBuffers<'b>,
    trace: Option<&Path>,
    settings: Settings,
) -> BridgeResult<Handle<'b>> {
    let mut session = Box::new(Session::new(dlpath, loader, settings)?);
    session.set_buffers(buffers)?;
    session.start(trace)?;
    Ok(Handle { session })
}

/// Send one action; returns whether the episode is done.
///
/// # Errors
///
/// Any error of [`Session::step`].
pub fn step(handle: &mut Handle<'_>, action: i32) -> BridgeResult<bool> {
    handle.session.step(action)
}

/// Start a new episode in place, optionally rotating the trace and
/// replacing the settings.
///
/// # Errors
///
/// Any error of [`Session::update_settings`] or [`Session::reset`].
pub fn reset(
    handle: &mut Handle<'_>,
    trace: Option<&Path>,
    settings: Option<Settings>,
) -> BridgeResult<()> {
    if let Some(settings) = settings {
        handle.session.update_settings(settings)?;
    }
    handle.session.reset(trace)
}

/// Tear the session down.
///
/// # Errors
///
/// Any error of [`Session::end`].
pub fn end(mut handle: Handle<'_>) -> BridgeResult<()> {
    handle.session.end()
}

/// Re-seed the running episode.
///
/// # Errors
///
/// Any error of [`Session::set_seeds`].
pub fn set_seed(
    handle: &mut Handle<'_>,
    core: u64,
    disp: u64,
    reseed: bool,
    lgen: Option<u64>,
) -> BridgeResult<()> {
    handle
        .session
        .set_seeds(Seeds::new(core, disp, reseed).with_lgen(lgen))
}

/// Queue seeds for the next [`reset`].
///
/// # Errors
///
/// Any error of [`Session::set_initial_seeds`].
pub fn set_initial_seed(
    handle: &mut Handle<'_>,
    core: u64,
    disp: u64,
    reseed: bool,
    lgen: Option<u64>,
) -> BridgeResult<()> {
    handle
        .session
        .set_initial_seeds(Seeds::new(core, disp, reseed).with_lgen(lgen))
}

/// `(core, disp, reseed, lgen)` of the current episode.
///
/// # Errors
///
/// Any error of [`Session::get_seeds`].
pub fn get_seed(handle: &Handle<'_>) -> BridgeResult<(u64, u64, bool, Option<u64>)> {
    handle.session.get_seeds().map(|s| s.as_tuple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obs::{BLSTATS, GLYPHS};
    use crate::sim::demo::DemoLoader;

    #[test]
    fn test_entry_points_drive_an_episode() {
        let dir = tempfile::tempdir().unwrap();
        let module = dir.path().join("libdemo.so");
        std::fs::write(&module, b"").unwrap();

        let mut glyphs = vec![0i16; 21 * 79];
        let mut blstats = vec![0i64; 27];
        let buffers = ObservationBuffers::new()
            .with(GLYPHS, &mut glyphs)
            .unwrap()
            .with(BLSTATS, &mut blstats)
            .unwrap();
        let settings = Settings {
            initial_seeds: Some(Seeds::new(1, 2, true)),
            spawn_monsters: false,
            ..Settings::default()
        };

        let mut handle = start(&module, &DemoLoader, buffers, None, settings).unwrap();
        assert_eq!(get_seed(&handle).unwrap(), (1, 2, true, None));

        set_initial_seed(&mut handle, 4, 5, false, Some(6)).unwrap();
        reset(&mut handle, None, None).unwrap();
        assert_eq!(get_seed(&handle).unwrap(), (4, 5, false, Some(6)));

        while !step(&mut handle, i32::from(b's')).unwrap() {}
        assert!(handle.done());
        assert!(handle.how_done().is_some());
        end(handle).unwrap();
    }
}
