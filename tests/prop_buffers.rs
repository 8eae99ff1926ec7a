//! Property-based tests for foreign-array validation.
//!
//! Run with: cargo test --release prop_buffers

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;

use nle_bridge::error::ValidationError;
use nle_bridge::obs::{DType, RawBuffer};
use nle_bridge::{Channel, ObservationBuffers};

const DTYPES: [DType; 5] = [DType::U8, DType::I8, DType::I16, DType::I32, DType::I64];

fn channel() -> impl Strategy<Value = Channel> {
    (0..Channel::COUNT).prop_map(|i| Channel::ALL[i])
}

/// A channel paired with a dtype it does not use.
fn channel_with_wrong_dtype() -> impl Strategy<Value = (Channel, DType)> {
    channel().prop_flat_map(|c| {
        let others: Vec<DType> = DTYPES.into_iter().filter(|&d| d != c.dtype()).collect();
        (Just(c), prop::sample::select(others))
    })
}

/// A multi-byte channel paired with a base offset that breaks its alignment.
fn channel_with_bad_offset() -> impl Strategy<Value = (Channel, usize)> {
    channel()
        .prop_filter("multi-byte element", |c| c.dtype().size() > 1)
        .prop_flat_map(|c| (Just(c), 1..c.dtype().size()))
}

/// Backing memory big enough and aligned for any channel.
fn backing(channel: Channel) -> Vec<u64> {
    vec![0u64; channel.element_count().max(1)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2000))]

    /// A wrong dtype is reported before anything about the shape.
    #[test]
    fn prop_dtype_checked_first(
        (channel, dtype) in channel_with_wrong_dtype(),
        shape in prop::collection::vec(0usize..100, 0..4),
        contiguous in any::<bool>(),
    ) {
        let mut memory = backing(channel);
        let raw = RawBuffer {
            ptr: memory.as_mut_ptr().cast(),
            dtype,
            shape,
            c_contiguous: contiguous,
        };
        let err = unsafe { ObservationBuffers::new().bind_raw(channel, &raw) }.unwrap_err();
        let is_dtype_mismatch = matches!(err, ValidationError::DtypeMismatch { .. });
        prop_assert!(is_dtype_mismatch);
    }

    /// With the right dtype, a wrong rank is reported before wrong extents.
    #[test]
    fn prop_rank_checked_before_extents(
        channel in channel(),
        shape in prop::collection::vec(0usize..100, 0..4),
        contiguous in any::<bool>(),
    ) {
        let mut memory = backing(channel);
        let raw = RawBuffer {
            ptr: memory.as_mut_ptr().cast(),
            dtype: channel.dtype(),
            shape: shape.clone(),
            c_contiguous: contiguous,
        };
        let result = unsafe { ObservationBuffers::new().bind_raw(channel, &raw) };
        let expected = channel.shape();
        if shape.len() != expected.len() {
            let is_rank_mismatch = matches!(result, Err(ValidationError::RankMismatch { .. }));
            prop_assert!(is_rank_mismatch);
        } else if shape != expected {
            let is_shape_mismatch = matches!(result, Err(ValidationError::ShapeMismatch { .. }));
            prop_assert!(is_shape_mismatch);
        } else if !contiguous {
            prop_assert_eq!(result, Err(ValidationError::NotContiguous { channel }));
        } else {
            prop_assert_eq!(result, Ok(()));
        }
    }

    /// Exact matches always bind, and binding is per channel.
    #[test]
    fn prop_exact_match_binds_only_its_channel(channel in channel()) {
        let mut memory = backing(channel);
        let raw = RawBuffer {
            ptr: memory.as_mut_ptr().cast(),
            dtype: channel.dtype(),
            shape: channel.shape().to_vec(),
            c_contiguous: true,
        };
        let mut buffers = ObservationBuffers::new();
        unsafe { buffers.bind_raw(channel, &raw) }.unwrap();
        let bound: Vec<_> = buffers.bound_channels().collect();
        prop_assert_eq!(bound, vec![channel]);
    }

    /// Offsetting the base by less than the element size is misaligned.
    #[test]
    fn prop_misaligned_base_rejected((channel, offset) in channel_with_bad_offset()) {
        let size = channel.dtype().size();
        let mut memory = vec![0u64; channel.element_count() + 1];
        let raw = RawBuffer {
            ptr: unsafe { memory.as_mut_ptr().cast::<u8>().add(offset) },
            dtype: channel.dtype(),
            shape: channel.shape().to_vec(),
            c_contiguous: true,
        };
        let result = unsafe { ObservationBuffers::new().bind_raw(channel, &raw) };
        prop_assert_eq!(result, Err(ValidationError::Misaligned { channel, align: size }));
    }
}
