//! Binary encoding of bins for spilling and shuffling.
//!
//! Field order is fixed and every field uses the job's byte order:
//!
//! * spatial bin: `index: i64, num_obs: i32, feature_count: i32, features: f32[feature_count]`
//! * multi-region bin: `region_index: i32, bin_index: i64, num_obs: i32, num_passes: i32,
//!   feature_count: i32, features: f32[feature_count]`
//!
//! Decoding checks the feature count against the count expected by the job's aggregators. A
//! mismatch or a short buffer is an error. Records are never truncated or padded.

use bytes::{Buf, BufMut, Bytes, BytesMut};
// Bring trait into scope to use as_bytes method.
use zerocopy::AsBytes;

use crate::bins::{MultiRegionBin, SpatialBin, TemporalBin};
use crate::error::BinningError;
use crate::types::ByteOrder;

/// Size in bytes of a spatial bin header.
pub const SPATIAL_HEADER_SIZE: usize = 8 + 4 + 4;

/// Size in bytes of a multi-region bin header.
pub const MULTI_REGION_HEADER_SIZE: usize = 4 + 8 + 4 + 4 + 4;

/// Encoder and decoder for one kind of feature vector.
#[derive(Clone, Copy, Debug)]
pub struct BinCodec {
    byte_order: ByteOrder,
    feature_count: usize,
}

impl BinCodec {
    /// Returns a new codec.
    ///
    /// # Arguments
    ///
    /// * `byte_order`: Byte order of all fields
    /// * `feature_count`: Number of features every bin must carry
    pub fn new(byte_order: ByteOrder, feature_count: usize) -> Self {
        Self {
            byte_order,
            feature_count,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Encoded size of a spatial bin.
    pub fn spatial_size(&self) -> usize {
        SPATIAL_HEADER_SIZE + 4 * self.feature_count
    }

    /// Encoded size of a multi-region bin.
    pub fn multi_region_size(&self) -> usize {
        MULTI_REGION_HEADER_SIZE + 4 * self.feature_count
    }

    /// Append an encoded spatial bin to a buffer.
    pub fn encode_spatial(&self, bin: &SpatialBin, buf: &mut BytesMut) -> Result<(), BinningError> {
        self.check_count(bin.features.len())?;
        buf.reserve(self.spatial_size());
        self.put_i64(buf, bin.index);
        self.put_i32(buf, bin.num_obs);
        self.put_i32(buf, i32::try_from(bin.features.len())?);
        self.put_features(buf, &bin.features);
        Ok(())
    }

    /// Decode a spatial bin from the front of a buffer.
    pub fn decode_spatial(&self, buf: &mut impl Buf) -> Result<SpatialBin, BinningError> {
        ensure_remaining(&*buf, SPATIAL_HEADER_SIZE)?;
        let index = self.get_i64(buf);
        let num_obs = self.get_i32(buf);
        let count = self.get_i32(buf);
        let features = self.get_features(buf, count)?;
        Ok(SpatialBin {
            index,
            num_obs,
            features,
        })
    }

    /// Append an encoded multi-region bin to a buffer.
    pub fn encode_multi_region(
        &self,
        bin: &MultiRegionBin,
        buf: &mut BytesMut,
    ) -> Result<(), BinningError> {
        self.check_count(bin.bin.features.len())?;
        buf.reserve(self.multi_region_size());
        self.put_i32(buf, bin.key.region_index);
        self.put_i64(buf, bin.key.bin_index);
        self.put_i32(buf, bin.bin.num_obs);
        self.put_i32(buf, bin.bin.num_passes);
        self.put_i32(buf, i32::try_from(bin.bin.features.len())?);
        self.put_features(buf, &bin.bin.features);
        Ok(())
    }

    /// Decode a multi-region bin from the front of a buffer.
    pub fn decode_multi_region(&self, buf: &mut impl Buf) -> Result<MultiRegionBin, BinningError> {
        ensure_remaining(&*buf, MULTI_REGION_HEADER_SIZE)?;
        let region_index = self.get_i32(buf);
        let bin_index = self.get_i64(buf);
        let num_obs = self.get_i32(buf);
        let num_passes = self.get_i32(buf);
        let count = self.get_i32(buf);
        let features = self.get_features(buf, count)?;
        Ok(MultiRegionBin::new(
            region_index,
            TemporalBin {
                index: bin_index,
                num_obs,
                num_passes,
                features,
            },
        ))
    }

    /// Encode a sequence of spatial bins into one buffer.
    pub fn encode_spatial_bins<'a>(
        &self,
        bins: impl IntoIterator<Item = &'a SpatialBin>,
    ) -> Result<Bytes, BinningError> {
        let mut buf = BytesMut::new();
        for bin in bins {
            self.encode_spatial(bin, &mut buf)?;
        }
        Ok(buf.freeze())
    }

    /// Decode every spatial bin in a buffer.
    pub fn decode_spatial_bins(&self, mut buf: impl Buf) -> Result<Vec<SpatialBin>, BinningError> {
        let mut bins = vec![];
        while buf.has_remaining() {
            bins.push(self.decode_spatial(&mut buf)?);
        }
        Ok(bins)
    }

    /// Encode a sequence of multi-region bins into one buffer.
    pub fn encode_multi_region_bins<'a>(
        &self,
        bins: impl IntoIterator<Item = &'a MultiRegionBin>,
    ) -> Result<Bytes, BinningError> {
        let mut buf = BytesMut::new();
        for bin in bins {
            self.encode_multi_region(bin, &mut buf)?;
        }
        Ok(buf.freeze())
    }

    /// Decode every multi-region bin in a buffer.
    pub fn decode_multi_region_bins(
        &self,
        mut buf: impl Buf,
    ) -> Result<Vec<MultiRegionBin>, BinningError> {
        let mut bins = vec![];
        while buf.has_remaining() {
            bins.push(self.decode_multi_region(&mut buf)?);
        }
        Ok(bins)
    }

    fn check_count(&self, actual: usize) -> Result<(), BinningError> {
        if actual != self.feature_count {
            return Err(BinningError::FeatureCountMismatch {
                expected: self.feature_count,
                actual,
            });
        }
        Ok(())
    }

    fn put_i32(&self, buf: &mut BytesMut, value: i32) {
        match self.byte_order {
            ByteOrder::Big => buf.put_i32(value),
            ByteOrder::Little => buf.put_i32_le(value),
        }
    }

    fn put_i64(&self, buf: &mut BytesMut, value: i64) {
        match self.byte_order {
            ByteOrder::Big => buf.put_i64(value),
            ByteOrder::Little => buf.put_i64_le(value),
        }
    }

    fn put_features(&self, buf: &mut BytesMut, features: &[f32]) {
        if self.byte_order.is_native() {
            buf.put_slice(features.as_bytes());
        } else {
            for x in features {
                match self.byte_order {
                    ByteOrder::Big => buf.put_f32(*x),
                    ByteOrder::Little => buf.put_f32_le(*x),
                }
            }
        }
    }

    fn get_i32(&self, buf: &mut impl Buf) -> i32 {
        match self.byte_order {
            ByteOrder::Big => buf.get_i32(),
            ByteOrder::Little => buf.get_i32_le(),
        }
    }

    fn get_i64(&self, buf: &mut impl Buf) -> i64 {
        match self.byte_order {
            ByteOrder::Big => buf.get_i64(),
            ByteOrder::Little => buf.get_i64_le(),
        }
    }

    fn get_features(&self, buf: &mut impl Buf, count: i32) -> Result<Vec<f32>, BinningError> {
        let count = usize::try_from(count).map_err(|_| BinningError::FeatureCountMismatch {
            expected: self.feature_count,
            actual: 0,
        })?;
        self.check_count(count)?;
        ensure_remaining(&*buf, 4 * count)?;
        let mut features = vec![0.0f32; count];
        if self.byte_order.is_native() {
            buf.copy_to_slice(features.as_bytes_mut());
        } else {
            for x in features.iter_mut() {
                *x = match self.byte_order {
                    ByteOrder::Big => buf.get_f32(),
                    ByteOrder::Little => buf.get_f32_le(),
                };
            }
        }
        Ok(features)
    }
}

fn ensure_remaining(buf: &impl Buf, needed: usize) -> Result<(), BinningError> {
    let available = buf.remaining();
    if available < needed {
        return Err(BinningError::Truncated { needed, available });
    }
    Ok(())
}
