//! Binding caller-owned memory to channels.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use super::channel::{Channel, ChannelKey, DType, Element};
use super::frame::{FrameTarget, Region};
use crate::error::ValidationError;

/// Description of a foreign array handed over by a binding layer.
///
/// Mirrors what an array library reports about a buffer: base pointer,
/// element type, extents and whether it is laid out C-contiguously.
#[derive(Debug, Clone)]
pub struct RawBuffer {
    /// Base address; null means "do not bind this channel".
    pub ptr: *mut u8,
    /// Element type of the array.
    pub dtype: DType,
    /// Extents, outermost first.
    pub shape: Vec<usize>,
    /// Whether the array is C-contiguous.
    pub c_contiguous: bool,
}

impl RawBuffer {
    /// A null buffer, leaving its channel unbound.
    #[must_use]
    pub fn null(dtype: DType) -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            dtype,
            shape: Vec::new(),
            c_contiguous: true,
        }
    }
}

/// The set of caller-owned regions the simulation writes into.
///
/// The set borrows each region for `'b`, so the memory outlives any session
/// holding the set, and the borrow checker keeps the caller from touching it
/// while a call is in flight.
pub struct ObservationBuffers<'b> {
    regions: [Option<Region>; Channel::COUNT],
    _borrow: PhantomData<&'b mut [u8]>,
}

impl<'b> ObservationBuffers<'b> {
    /// An empty set; every channel unbound.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regions: [None; Channel::COUNT],
            _borrow: PhantomData,
        }
    }

    /// Bind `data` to the channel addressed by `key`.
    ///
    /// The slice is the flattened, row-major view of the channel's shape.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::LengthMismatch`] if `data` does not hold
    /// exactly as many elements as the channel declares.
    pub fn bind<T: Element>(
        &mut self,
        key: ChannelKey<T>,
        data: &'b mut [T],
    ) -> Result<&mut Self, ValidationError> {
        let channel = key.channel();
        let expected = channel.element_count();
        if data.len() != expected {
            return Err(ValidationError::LengthMismatch {
                channel,
                expected,
                actual: data.len(),
            });
        }
        self.regions[channel.index()] = Some(Region {
            ptr: NonNull::from(data).cast::<u8>(),
            len: expected,
        });
        Ok(self)
    }

    /// Builder form of [`ObservationBuffers::bind`].
    ///
    /// # Errors
    ///
    /// Same as [`ObservationBuffers::bind`].
    pub fn with<T: Element>(
        mut self,
        key: ChannelKey<T>,
        data: &'b mut [T],
    ) -> Result<Self, ValidationError> {
        self.bind(key, data)?;
        Ok(self)
    }

    /// Bind a foreign array to `channel`.
    ///
    /// A null pointer unbinds the channel. Otherwise the array is checked in
    /// the order dtype, rank, extents, contiguity, alignment.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] the array fails.
    ///
    /// # Safety
    ///
    /// A non-null `raw.ptr` must be valid for reads and writes of
    /// `raw.shape.iter().product()` elements of `raw.dtype` for the whole of
    /// `'b`, and must not overlap any other bound region or be accessed by
    /// anyone else while a session call is in flight.
    pub unsafe fn bind_raw(
        &mut self,
        channel: Channel,
        raw: &RawBuffer,
    ) -> Result<(), ValidationError> {
        let Some(ptr) = NonNull::new(raw.ptr) else {
            self.regions[channel.index()] = None;
            return Ok(());
        };
        check_raw(channel, raw)?;
        self.regions[channel.index()] = Some(Region {
            ptr,
            len: channel.element_count(),
        });
        Ok(())
    }

    /// Whether `channel` has memory bound.
    #[must_use]
    pub fn is_bound(&self, channel: Channel) -> bool {
        self.regions[channel.index()].is_some()
    }

    /// Read the memory bound to `key`, or `None` if the channel is unbound.
    ///
    /// While a session owns the set this is how the caller reads the latest
    /// observation between calls.
    #[must_use]
    pub fn get<T: Element>(&self, key: ChannelKey<T>) -> Option<&[T]> {
        let region = self.regions[key.channel().index()]?;
        // SAFETY: the region was bound from memory of the key's element type
        // and extent, borrowed for `'b`; the worker only writes it while a
        // `&mut` borrow of this set is held by the resuming call.
        Some(unsafe { std::slice::from_raw_parts(region.ptr.as_ptr().cast::<T>(), region.len) })
    }

    /// Channels that have memory bound, in table order.
    pub fn bound_channels(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::ALL
            .into_iter()
            .filter(move |c| self.regions[c.index()].is_some())
    }

    /// Snapshot of the bound regions for one resume.
    pub(crate) fn target(&mut self) -> FrameTarget {
        FrameTarget::new(self.regions)
    }
}

impl Default for ObservationBuffers<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ObservationBuffers<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.bound_channels()).finish()
    }
}

fn check_raw(channel: Channel, raw: &RawBuffer) -> Result<(), ValidationError> {
    let expected_dtype = channel.dtype();
    if raw.dtype != expected_dtype {
        return Err(ValidationError::DtypeMismatch {
            channel,
            expected: expected_dtype,
            actual: raw.dtype,
        });
    }

    let shape = channel.shape();
    if raw.shape.len() != shape.len() {
        return Err(ValidationError::RankMismatch {
            channel,
            expected: shape.len(),
            actual: raw.shape.len(),
        });
    }
    if raw.shape != shape {
        return Err(ValidationError::ShapeMismatch {
            channel,
            expected: shape.to_vec(),
            actual: raw.shape.clone(),
        });
    }

    if !raw.c_contiguous {
        return Err(ValidationError::NotContiguous { channel });
    }

    let align = expected_dtype.size();
    if raw.ptr.align_offset(align) != 0 {
        return Err(ValidationError::Misaligned { channel, align });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obs::{BLSTATS, GLYPHS, MESSAGE};

    #[test]
    fn test_bind_accepts_exact_length() {
        let mut glyphs = vec![0i16; Channel::Glyphs.element_count()];
        let mut buffers = ObservationBuffers::new();
        buffers.bind(GLYPHS, &mut glyphs).unwrap();
        assert!(buffers.is_bound(Channel::Glyphs));
        assert!(!buffers.is_bound(Channel::Chars));
        assert_eq!(buffers.get(GLYPHS).unwrap().len(), 21 * 79);
        assert!(buffers.get(BLSTATS).is_none());
    }

    #[test]
    fn test_bind_rejects_wrong_length() {
        let mut blstats = vec![0i64; 26];
        let err = ObservationBuffers::new()
            .with(BLSTATS, &mut blstats)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::LengthMismatch {
                channel: Channel::Blstats,
                expected: 27,
                actual: 26,
            }
        );
    }

    #[test]
    fn test_bound_channels_in_table_order() {
        let mut message = vec![0u8; 256];
        let mut blstats = vec![0i64; 27];
        let buffers = ObservationBuffers::new()
            .with(MESSAGE, &mut message)
            .unwrap()
            .with(BLSTATS, &mut blstats)
            .unwrap();
        let bound: Vec<_> = buffers.bound_channels().collect();
        assert_eq!(bound, vec![Channel::Blstats, Channel::Message]);
    }

    #[test]
    fn test_bind_raw_null_unbinds() {
        let mut message = vec![0u8; 256];
        let mut buffers = ObservationBuffers::new();
        buffers.bind(MESSAGE, &mut message).unwrap();
        unsafe {
            buffers
                .bind_raw(Channel::Message, &RawBuffer::null(DType::U8))
                .unwrap();
        }
        assert!(!buffers.is_bound(Channel::Message));
    }

    #[test]
    fn test_bind_raw_checks_dtype_first() {
        let mut data = vec![0u8; 2];
        let raw = RawBuffer {
            ptr: data.as_mut_ptr(),
            dtype: DType::U8,
            shape: vec![1],
            c_contiguous: false,
        };
        let err = unsafe { ObservationBuffers::new().bind_raw(Channel::Glyphs, &raw) }.unwrap_err();
        assert!(matches!(err, ValidationError::DtypeMismatch { .. }));
    }

    #[test]
    fn test_bind_raw_checks_rank_before_shape() {
        let mut data = vec![0i16; 21 * 79];
        let raw = RawBuffer {
            ptr: data.as_mut_ptr().cast(),
            dtype: DType::I16,
            shape: vec![21 * 79],
            c_contiguous: true,
        };
        let err = unsafe { ObservationBuffers::new().bind_raw(Channel::Glyphs, &raw) }.unwrap_err();
        assert_eq!(
            err,
            ValidationError::RankMismatch {
                channel: Channel::Glyphs,
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn test_bind_raw_rejects_non_contiguous() {
        let mut data = vec![0u8; 24 * 80];
        let raw = RawBuffer {
            ptr: data.as_mut_ptr(),
            dtype: DType::U8,
            shape: vec![24, 80],
            c_contiguous: false,
        };
        let err =
            unsafe { ObservationBuffers::new().bind_raw(Channel::TtyChars, &raw) }.unwrap_err();
        assert_eq!(
            err,
            ValidationError::NotContiguous {
                channel: Channel::TtyChars
            }
        );
    }

    #[test]
    fn test_bind_raw_accepts_matching_array() {
        let mut data = vec![0i32; 3];
        let raw = RawBuffer {
            ptr: data.as_mut_ptr().cast(),
            dtype: DType::I32,
            shape: vec![3],
            c_contiguous: true,
        };
        let mut buffers = ObservationBuffers::new();
        unsafe { buffers.bind_raw(Channel::Misc, &raw) }.unwrap();
        assert!(buffers.is_bound(Channel::Misc));
    }
}
