//! An adaptive entropy codec for DNA sequencing quality score streams, as
//! embedded in CRAM files.
//!
//! Quality bytes are coded by a carry-propagating range coder driven by
//! thousands of small adaptive frequency models. The model for each byte is
//! chosen by a 16-bit composite context mixing up to four signals: recent
//! quality values, the position remaining in the read, a running count of
//! quality changes, and a per-record selector. A tuning pass over the block
//! picks the context bit budget, detects duplicate and fixed-length records,
//! and serialises everything so the decoder rebuilds the identical model.
//!
//! # Examples
//!
//! ```
//! use fqzcomp_qual::{Options, Record, decode, encode};
//!
//! let src = [30u8; 100];
//! let records = [Record::new(0, 100, 0)];
//!
//! let compressed = encode(Options::default(), &records, &src)?;
//! let uncompressed = decode(&compressed, src.len())?;
//!
//! assert_eq!(uncompressed, src);
//! # Ok::<_, std::io::Error>(())
//! ```

mod aac;
mod context;
mod decode;
mod encode;
mod models;
mod num;
mod options;
mod parameters;
mod record;
mod strategy;
mod version;

pub use self::{
    decode::decode, encode::encode, options::Options, record::Record, strategy::Strategy,
    version::Version,
};

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn records_from(data: &[Vec<u8>]) -> (Vec<Record>, Vec<u8>) {
        let mut records = Vec::new();
        let mut offset = 0;

        for scores in data {
            records.push(Record::new(offset, scores.len(), 0));
            offset += scores.len();
        }

        (records, data.iter().flatten().copied().collect())
    }

    #[test]
    fn test_self() -> io::Result<()> {
        fn t(data: &[Vec<u8>]) -> io::Result<()> {
            let (records, src) = records_from(data);

            let compressed_data = encode(Options::default(), &records, &src)?;
            let uncompressed_data = decode(&compressed_data, src.len())?;

            assert_eq!(uncompressed_data, src);

            Ok(())
        }

        // Ramp up, plateau, tail off, like short high-quality reads.
        t(&[
            vec![12, 25, 33, 38, 38, 38, 37, 38, 30, 22],
            vec![11, 24, 37, 38, 38, 38, 38, 36, 29, 18],
            vec![13, 26, 38, 38, 38, 25, 20],
        ])?;

        // Fixed-length records.
        t(&[
            vec![8, 8, 9, 10, 10, 11, 11, 12],
            vec![9, 9, 9, 10, 11, 12, 12, 12],
            vec![7, 8, 9, 9, 10, 10, 11, 12],
        ])?;

        // Three values spread far apart pack through the quality map.
        t(&[
            vec![3, 3, 28, 28, 41, 41, 28, 3, 41, 28],
            vec![41, 41, 41, 28, 28, 3, 3, 3, 28, 41],
            vec![28, 3, 41, 3, 28, 41],
        ])?;

        // One value only.
        t(&[vec![37; 12], vec![37; 12], vec![37; 12], vec![37; 12]])?;

        // A wide alphabet falls back to the identity map.
        t(&[
            (20..60).step_by(2).collect(),
            (21..61).step_by(2).collect(),
            (2..62).step_by(3).collect(),
        ])?;

        Ok(())
    }

    #[test]
    fn test_self_empty() -> io::Result<()> {
        let compressed_data = encode(Options::default(), &[], &[])?;
        let uncompressed_data = decode(&compressed_data, 0)?;

        assert!(uncompressed_data.is_empty());

        Ok(())
    }

    #[test]
    fn test_self_with_zero_length_records() -> io::Result<()> {
        let (records, src) = records_from(&[
            vec![1, 2, 3, 2, 1],
            vec![],
            vec![3, 3, 3, 1, 0, 0, 2],
        ]);

        let compressed_data = encode(Options::default(), &records, &src)?;
        let uncompressed_data = decode(&compressed_data, src.len())?;

        assert_eq!(uncompressed_data, src);

        Ok(())
    }

    #[test]
    fn test_self_with_explicit_selectors() -> io::Result<()> {
        let mut records = Vec::new();
        let mut src = Vec::new();

        for r in 0..40usize {
            let selector = (r % 3) as u32;
            records.push(Record::new(src.len(), 20, selector << Record::SELECTOR_SHIFT));
            src.extend((0..20).map(|i| ((r + i) % 8) as u8));
        }

        let compressed_data = encode(Options::default(), &records, &src)?;
        let uncompressed_data = decode(&compressed_data, src.len())?;

        assert_eq!(uncompressed_data, src);

        Ok(())
    }
}
