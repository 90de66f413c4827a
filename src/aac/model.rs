use std::{
    io::{self, Read, Write},
    num::NonZero,
};

use super::RangeCoder;

const STEP: u32 = 16;

// Headroom of 2 * STEP below 2^16 keeps every post-increment frequency
// inside u16, even for a one-symbol alphabet.
const MAX_TOTAL_FREQUENCY: u32 = (1 << 16) - 32;

/// An adaptive frequency model over a small alphabet.
///
/// Symbols start with uniform unit counts, gain [`STEP`] on every use, and
/// are halved (preserving unit minima) once the running total passes
/// [`MAX_TOTAL_FREQUENCY`]. Every 16th update bubbles the used entry one
/// slot toward the front, keeping hot symbols cheap to scan. Both sides of
/// the codec apply the identical update, so encoder and decoder stay in
/// lockstep.
#[derive(Clone, Debug)]
pub struct Model {
    total_frequency: u32,
    bubble_count: u32,
    entries: Vec<SymbolFrequency>,
}

#[derive(Clone, Debug)]
struct SymbolFrequency {
    frequency: u16,
    symbol: u8,
}

impl Model {
    /// Creates a model with uniform counts over `[0, symbol_count)`.
    pub fn new(symbol_count: NonZero<usize>) -> Self {
        let entries = (0..symbol_count.get())
            .map(|i| SymbolFrequency {
                frequency: 1,
                symbol: i as u8,
            })
            .collect();

        Self {
            total_frequency: symbol_count.get() as u32,
            bubble_count: 0,
            entries,
        }
    }

    /// Codes `symbol` and updates its frequency.
    pub fn encode<W>(
        &mut self,
        dst: &mut W,
        range_coder: &mut RangeCoder,
        symbol: u8,
    ) -> io::Result<()>
    where
        W: Write,
    {
        let mut cumulative_frequency = 0;
        let mut i = 0;

        loop {
            let entry = self.entries.get(i).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "symbol not in model alphabet")
            })?;

            if entry.symbol == symbol {
                break;
            }

            cumulative_frequency += u32::from(entry.frequency);
            i += 1;
        }

        range_coder.range_encode(
            dst,
            cumulative_frequency,
            u32::from(self.entries[i].frequency),
            self.total_frequency,
        )?;

        self.update(i);

        Ok(())
    }

    /// Decodes the next symbol and updates its frequency.
    pub fn decode<R>(&mut self, src: &mut R, range_coder: &mut RangeCoder) -> io::Result<u8>
    where
        R: Read,
    {
        let freq = range_coder.range_get_freq(self.total_frequency);

        if freq >= self.total_frequency {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "cumulative frequency out of range",
            ));
        }

        let mut cumulative_frequency = 0;
        let mut i = 0;

        // freq < total, so the scan stops before the final entry's span ends.
        loop {
            let f = u32::from(self.entries[i].frequency);

            if cumulative_frequency + f > freq {
                break;
            }

            cumulative_frequency += f;
            i += 1;
        }

        range_coder.range_decode(
            src,
            cumulative_frequency,
            u32::from(self.entries[i].frequency),
        )?;

        let symbol = self.entries[i].symbol;

        self.update(i);

        Ok(symbol)
    }

    fn update(&mut self, i: usize) {
        self.entries[i].frequency += STEP as u16;
        self.total_frequency += STEP;

        if self.total_frequency > MAX_TOTAL_FREQUENCY {
            self.rescale();
        }

        self.bubble_count += 1;

        if self.bubble_count & 15 == 0
            && i > 0
            && self.entries[i].frequency > self.entries[i - 1].frequency
        {
            self.entries.swap(i, i - 1);
        }
    }

    fn rescale(&mut self) {
        self.total_frequency = 0;

        for entry in &mut self.entries {
            entry.frequency -= entry.frequency >> 1;
            self.total_frequency += u32::from(entry.frequency);
        }
    }
}
