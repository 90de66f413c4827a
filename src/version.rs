use std::io;

/// The major version of the enclosing container format.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Version {
    /// CRAM 3: quality scores are stored in sequencing orientation, so the
    /// codec reverses reverse-strand records around coding.
    V3,
    /// CRAM 4: record orientation is handled by the outer format.
    #[default]
    V4,
}

impl TryFrom<u8> for Version {
    type Error = io::Error;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            3 => Ok(Self::V3),
            4 => Ok(Self::V4),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid container version: {n}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_u8() {
        assert_eq!(Version::try_from(3).unwrap(), Version::V3);
        assert_eq!(Version::try_from(4).unwrap(), Version::V4);
        assert!(Version::try_from(2).is_err());
        assert!(Version::try_from(5).is_err());
    }
}
