//! Adaptive arithmetic coding.

mod model;

pub use self::model::Model;

use std::io::{self, Read, Write};

use crate::num::{read_u8, write_u8};

// Renormalise byte-wise once the interval drops below 2^23, leaving headroom
// for the largest model total (< 2^16).
const RENORM_THRESHOLD: u32 = 1 << 23;

/// A carry-propagating range coder over a 32-bit interval.
///
/// The encoder keeps the interval base in a 64-bit `low` so a carry out of
/// bit 31 is visible in bit 32; emitted bytes lag one position in `cache`
/// (plus a pending run of 0xff bytes) until the carry is resolved. The
/// decoder primes a 32-bit `code` register from five bytes, the first of
/// which is the encoder's initial zero cache byte.
#[derive(Debug)]
pub struct RangeCoder {
    low: u64,
    range: u32,
    code: u32,
    cache: u8,
    pending: u64,
}

impl Default for RangeCoder {
    fn default() -> Self {
        Self {
            low: 0,
            range: u32::MAX,
            code: 0,
            cache: 0,
            pending: 0,
        }
    }
}

impl RangeCoder {
    /// Narrows the interval to the symbol span `[cum, cum + freq) / total`.
    pub fn range_encode<W>(
        &mut self,
        dst: &mut W,
        cumulative_frequency: u32,
        frequency: u32,
        total_frequency: u32,
    ) -> io::Result<()>
    where
        W: Write,
    {
        self.range /= total_frequency;
        self.low += u64::from(cumulative_frequency) * u64::from(self.range);
        self.range *= frequency;

        while self.range < RENORM_THRESHOLD {
            self.range <<= 8;
            self.shift_low(dst)?;
        }

        Ok(())
    }

    /// Flushes the interval base so the decoder can resolve the final
    /// symbols.
    pub fn range_encode_end<W>(&mut self, dst: &mut W) -> io::Result<()>
    where
        W: Write,
    {
        for _ in 0..5 {
            self.shift_low(dst)?;
        }

        Ok(())
    }

    fn shift_low<W>(&mut self, dst: &mut W) -> io::Result<()>
    where
        W: Write,
    {
        if self.low < 0xff00_0000 || self.low > u64::from(u32::MAX) {
            let carry = (self.low >> 32) as u8;

            write_u8(dst, self.cache.wrapping_add(carry))?;

            while self.pending > 0 {
                write_u8(dst, 0xffu8.wrapping_add(carry))?;
                self.pending -= 1;
            }

            self.cache = (self.low >> 24) as u8;
        } else {
            // Top byte is 0xff with no carry yet; a later carry may still
            // bump it.
            self.pending += 1;
        }

        self.low = (self.low << 8) & 0xffff_ffff;

        Ok(())
    }

    /// Primes the decoder state from the head of the compressed stream.
    pub fn range_decode_create<R>(&mut self, src: &mut R) -> io::Result<()>
    where
        R: Read,
    {
        let mut code = 0;

        for _ in 0..5 {
            code = (code << 8) | u32::from(read_u8(src)?);
        }

        self.code = code;
        self.range = u32::MAX;

        Ok(())
    }

    /// Returns the cumulative frequency the next symbol must span.
    pub fn range_get_freq(&mut self, total_frequency: u32) -> u32 {
        self.range /= total_frequency;
        self.code / self.range
    }

    /// Removes the decoded symbol's span from the interval.
    pub fn range_decode<R>(
        &mut self,
        src: &mut R,
        cumulative_frequency: u32,
        frequency: u32,
    ) -> io::Result<()>
    where
        R: Read,
    {
        self.code -= cumulative_frequency * self.range;
        self.range *= frequency;

        while self.range < RENORM_THRESHOLD {
            self.code = (self.code << 8) | u32::from(read_u8(src)?);
            self.range <<= 8;
        }

        Ok(())
    }
}
