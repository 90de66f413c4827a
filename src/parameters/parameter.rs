use std::io::{self, Read, Write};

use bitflags::bitflags;

use super::{read_array, write_array};
use crate::num::{read_u8, read_u16_le, write_u8, write_u16_le};

bitflags! {
    /// Per-parameter-block flags.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Flags: u8 {
        const DO_DEDUP = 0x02;
        const DO_LEN = 0x04;
        const DO_SEL = 0x08;
        const HAVE_QMAP = 0x10;
        const HAVE_PTAB = 0x20;
        const HAVE_DTAB = 0x40;
        const HAVE_QTAB = 0x80;
    }
}

impl Flags {
    pub fn has_duplicates(self) -> bool {
        self.contains(Self::DO_DEDUP)
    }

    pub fn is_fixed_length(self) -> bool {
        self.contains(Self::DO_LEN)
    }

    pub fn has_selector(self) -> bool {
        self.contains(Self::DO_SEL)
    }

    pub fn has_quality_map(self) -> bool {
        self.contains(Self::HAVE_QMAP)
    }

    pub fn has_positions_table(self) -> bool {
        self.contains(Self::HAVE_PTAB)
    }

    pub fn has_deltas_table(self) -> bool {
        self.contains(Self::HAVE_DTAB)
    }

    pub fn has_qualities_table(self) -> bool {
        self.contains(Self::HAVE_QTAB)
    }
}

impl From<Flags> for u8 {
    fn from(flags: Flags) -> Self {
        flags.bits()
    }
}

/// A single parameter block.
///
/// `q_tab`, `p_tab`, and `d_tab` hold the wire (unshifted) values until
/// [`Parameter::shift_tables`] folds the `p_loc`/`d_loc` shifts in;
/// serialization must happen before that.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Parameter {
    /// Context seed for the first symbol of each record.
    pub context: u16,
    pub flags: Flags,
    /// Wire alphabet bound: the model alphabet is `max_sym + 1`.
    pub max_sym: u8,

    pub q_bits: u8,
    pub q_shift: u8,
    pub q_loc: u8,
    pub s_loc: u8,
    pub p_loc: u8,
    pub d_loc: u8,

    pub q_tab: Vec<u32>,
    pub p_tab: Vec<u32>,
    pub d_tab: Vec<u32>,

    /// Packed symbol -> quality value, in wire order.
    pub quality_map: Option<Vec<u8>>,

    /// Runtime: the first record always carries an explicit length.
    pub first_len: bool,
}

impl Parameter {
    pub fn read<R>(reader: &mut R) -> io::Result<Self>
    where
        R: Read,
    {
        let context = read_u16_le(reader)?;
        let flags = Flags::from_bits_truncate(read_u8(reader)?);
        let max_sym = read_u8(reader)?;

        let b = read_u8(reader)?;
        let q_bits = b >> 4;
        let q_shift = b & 0x0f;

        let b = read_u8(reader)?;
        let q_loc = b >> 4;
        let s_loc = b & 0x0f;

        let b = read_u8(reader)?;
        let p_loc = b >> 4;
        let d_loc = b & 0x0f;

        let quality_map = if flags.has_quality_map() {
            let mut buf = vec![0; usize::from(max_sym)];
            reader.read_exact(&mut buf)?;
            Some(buf)
        } else {
            None
        };

        let q_tab = if q_bits > 0 && flags.has_qualities_table() {
            read_array(reader, 256)?
        } else {
            (0..256).collect()
        };

        let p_tab = if flags.has_positions_table() {
            read_array(reader, 1024)?
        } else {
            vec![0; 1024]
        };

        let d_tab = if flags.has_deltas_table() {
            read_array(reader, 256)?
        } else {
            vec![0; 256]
        };

        Ok(Self {
            context,
            flags,
            max_sym,
            q_bits,
            q_shift,
            q_loc,
            s_loc,
            p_loc,
            d_loc,
            q_tab,
            p_tab,
            d_tab,
            quality_map,
            first_len: true,
        })
    }

    pub fn write<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: Write,
    {
        write_u16_le(writer, self.context)?;
        write_u8(writer, u8::from(self.flags))?;
        write_u8(writer, self.max_sym)?;

        write_u8(writer, (self.q_bits << 4) | self.q_shift)?;
        write_u8(writer, (self.q_loc << 4) | self.s_loc)?;
        write_u8(writer, (self.p_loc << 4) | self.d_loc)?;

        if self.flags.has_quality_map()
            && let Some(ref quality_map) = self.quality_map
        {
            writer.write_all(quality_map)?;
        }

        if self.q_bits > 0 && self.flags.has_qualities_table() {
            write_array(writer, &self.q_tab)?;
        }

        if self.flags.has_positions_table() {
            write_array(writer, &self.p_tab)?;
        }

        if self.flags.has_deltas_table() {
            write_array(writer, &self.d_tab)?;
        }

        Ok(())
    }

    /// Folds the location shifts into the position and delta tables so the
    /// context update is a plain add.
    pub fn shift_tables(&mut self) {
        for v in &mut self.p_tab {
            *v <<= self.p_loc;
        }

        for v in &mut self.d_tab {
            *v <<= self.d_loc;
        }
    }
}
