//! Simulation-side view of the bound buffers during one resume window.

use std::ptr::NonNull;
use std::slice;

use super::channel::{Channel, ChannelKey, Element};
use super::write_cstr;

/// One bound region: base address and element count.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Region {
    pub(crate) ptr: NonNull<u8>,
    pub(crate) len: usize,
}

/// The bound regions, lent to the worker for a single resume.
///
/// The session hands a target over with each resume and the worker gives it
/// back (by dropping it) before it suspends, so the regions are only touched
/// while the caller is blocked inside the call that lent them.
#[derive(Debug)]
pub(crate) struct FrameTarget {
    regions: [Option<Region>; Channel::COUNT],
}

// SAFETY: the pointers reference caller memory borrowed for the lifetime of
// the session's `ObservationBuffers`. The driver thread is blocked in
// `resume` for as long as the worker holds the target, so there is never
// concurrent access.
unsafe impl Send for FrameTarget {}

impl FrameTarget {
    pub(crate) fn new(regions: [Option<Region>; Channel::COUNT]) -> Self {
        Self { regions }
    }
}

/// Mutable access to the caller's buffers from inside a simulation.
///
/// Obtained from [`crate::context::Host::frame`]. Between suspend points a
/// frame may be detached, in which case every channel reads as unbound.
#[derive(Debug)]
pub struct Frame<'f> {
    target: Option<&'f mut FrameTarget>,
}

impl<'f> Frame<'f> {
    pub(crate) fn new(target: Option<&'f mut FrameTarget>) -> Self {
        Self { target }
    }

    /// Whether the frame currently refers to caller memory at all.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.target.is_some()
    }

    /// Whether `channel` is bound.
    #[must_use]
    pub fn is_bound(&self, channel: Channel) -> bool {
        self.target
            .as_ref()
            .is_some_and(|t| t.regions[channel.index()].is_some())
    }

    /// The buffer behind `key`, or `None` if the channel is unbound.
    pub fn get<T: Element>(&mut self, key: ChannelKey<T>) -> Option<&mut [T]> {
        let target = self.target.as_mut()?;
        let region = target.regions[key.channel().index()]?;
        // SAFETY: regions are only created from a `&mut [T]` of the key's
        // element type or from a raw array whose dtype, extents and
        // alignment were checked against the channel. The returned borrow is
        // tied to `&mut self`, so no two slices alias.
        Some(unsafe { slice::from_raw_parts_mut(region.ptr.as_ptr().cast::<T>(), region.len) })
    }

    /// Overwrite every element of a bound channel with `value`.
    pub fn fill<T: Element>(&mut self, key: ChannelKey<T>, value: T) {
        if let Some(buf) = self.get(key) {
            buf.fill(value);
        }
    }

    /// Write `text` NUL-terminated into a byte channel, zero-padding the rest.
    pub fn write_str(&mut self, key: ChannelKey<u8>, text: &[u8]) {
        if let Some(buf) = self.get(key) {
            write_cstr(buf, text);
        }
    }
}
