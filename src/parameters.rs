pub(crate) mod parameter;

pub(crate) use self::parameter::Parameter;

use std::{
    io::{self, Read, Write},
    num::NonZero,
};

use bitflags::bitflags;

use crate::num::{read_u8, write_u8};

/// The wire format version this codec produces and accepts.
pub(crate) const FORMAT_VERSION: u8 = 5;

bitflags! {
    /// Global parameter flags.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Flags: u8 {
        const MULTI_PARAM = 0x01;
        const HAVE_S_TAB = 0x02;
        const DO_REV = 0x04;
    }
}

impl From<Flags> for u8 {
    fn from(flags: Flags) -> Self {
        flags.bits()
    }
}

/// The per-block parameter set: global flags plus one or more parameter
/// blocks and the selector-to-block table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Parameters {
    pub gflags: Flags,
    pub max_sel: u8,
    pub s_tab: Vec<u8>,
    /// Maximum wire `max_sym` across blocks; sizes the quality models.
    pub max_sym: u8,
    pub params: Vec<Parameter>,
}

impl Parameters {
    pub fn read<R>(reader: &mut R) -> io::Result<Self>
    where
        R: Read,
    {
        let version = read_u8(reader)?;

        if version != FORMAT_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid format version: expected {FORMAT_VERSION}, got {version}"),
            ));
        }

        let gflags = Flags::from_bits_truncate(read_u8(reader)?);

        let n_params = if gflags.contains(Flags::MULTI_PARAM) {
            usize::from(read_u8(reader)?)
        } else {
            1
        };

        if n_params == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "parameter block count is zero",
            ));
        }

        let mut max_sel = if n_params > 1 { n_params as u8 } else { 0 };

        let s_tab = if gflags.contains(Flags::HAVE_S_TAB) {
            max_sel = read_u8(reader)?;
            read_array(reader, 256)?
                .into_iter()
                .map(|v| v.min(255) as u8)
                .collect()
        } else {
            (0..256)
                .map(|i| i.min(n_params - 1) as u8)
                .collect()
        };

        let mut max_sym = 0;
        let mut params = Vec::with_capacity(n_params);

        for _ in 0..n_params {
            let param = Parameter::read(reader)?;
            max_sym = max_sym.max(param.max_sym);
            params.push(param);
        }

        Ok(Self {
            gflags,
            max_sel,
            s_tab,
            max_sym,
            params,
        })
    }

    pub fn write<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: Write,
    {
        write_u8(writer, FORMAT_VERSION)?;
        write_u8(writer, u8::from(self.gflags))?;

        if self.gflags.contains(Flags::MULTI_PARAM) {
            let n_params = u8::try_from(self.params.len())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            write_u8(writer, n_params)?;
        }

        if self.gflags.contains(Flags::HAVE_S_TAB) {
            write_u8(writer, self.max_sel)?;
            let s_tab: Vec<u32> = self.s_tab.iter().copied().map(u32::from).collect();
            write_array(writer, &s_tab)?;
        }

        for param in &self.params {
            param.write(writer)?;
        }

        Ok(())
    }

    /// Alphabet of the quality models.
    pub fn symbol_count(&self) -> NonZero<usize> {
        NonZero::new(usize::from(self.max_sym) + 1).expect("max_sym + 1 is nonzero")
    }

    /// Alphabet of the selector model, when one is coded per record.
    pub fn selector_count(&self) -> Option<NonZero<usize>> {
        if self.max_sel > 0 {
            NonZero::new(usize::from(self.max_sel) + 1)
        } else {
            None
        }
    }
}

/// Stores a non-decreasing table as per-value run lengths, doubly
/// run-length encoded.
///
/// The first pass emits, for each destination value 0, 1, 2, ..., the length
/// of its run split into byte groups where 255 means "more bytes follow".
/// The second pass collapses repeats in that byte stream: a byte equal to
/// its predecessor is followed by a count of additional copies (at most 255
/// per group).
pub(crate) fn write_array<W>(writer: &mut W, data: &[u32]) -> io::Result<()>
where
    W: Write,
{
    debug_assert!(data.is_sorted());

    let mut runs = Vec::new();

    let mut i = 0;
    let mut value = 0;

    while i < data.len() {
        let start = i;

        while i < data.len() && data[i] == value {
            i += 1;
        }

        let mut run_len = i - start;

        loop {
            let part = run_len.min(255);
            runs.push(part as u8);
            run_len -= part;

            if part != 255 {
                break;
            }
        }

        value += 1;
    }

    let mut last = -1;
    let mut j = 0;

    while j < runs.len() {
        let b = runs[j];
        j += 1;

        write_u8(writer, b)?;

        if i32::from(b) == last {
            let start = j;

            while j < runs.len() && runs[j] == b && j - start < 255 {
                j += 1;
            }

            write_u8(writer, (j - start) as u8)?;
        } else {
            last = i32::from(b);
        }
    }

    Ok(())
}

/// Inverts both [`write_array`] passes, reading exactly the bytes the
/// encoder wrote.
pub(crate) fn read_array<R>(reader: &mut R, n: usize) -> io::Result<Vec<u32>>
where
    R: Read,
{
    // Legal streams need at most one byte group per destination value plus
    // the run continuations; anything past this bound is corrupt.
    let max_runs = n + 512;

    let corrupt = || io::Error::new(io::ErrorKind::InvalidData, "malformed run-length table");

    // Undo the outer pass into the flattened run-length byte stream. A group
    // whose last byte is 255 is still open, so its continuation bytes are
    // consumed even once the table is covered.
    let mut runs: Vec<u8> = Vec::new();
    let mut last = -1;
    let mut covered = 0;
    let mut mid_run = false;

    while covered < n || mid_run {
        let b = read_u8(reader)?;
        runs.push(b);
        covered += usize::from(b);

        if i32::from(b) == last {
            let copies = read_u8(reader)?;

            for _ in 0..copies {
                runs.push(b);
                covered += usize::from(b);
            }
        } else {
            last = i32::from(b);
        }

        mid_run = b == 0xff;

        if runs.len() > max_runs {
            return Err(corrupt());
        }
    }

    // Expand the inner pass: each group of 255-continued bytes is one run of
    // the current destination value.
    let mut table = vec![0; n];
    let mut value = 0;
    let mut j = 0;
    let mut k = 0;

    while j < n {
        let mut run_len = 0;

        loop {
            let part = runs.get(k).copied().ok_or_else(corrupt)?;
            k += 1;
            run_len += usize::from(part);

            if part != 0xff {
                break;
            }
        }

        for _ in 0..run_len {
            if j == n {
                break;
            }

            table[j] = value;
            j += 1;
        }

        value += 1;
    }

    Ok(table)
}
