/// A tuner parameter preset.
///
/// Each strategy seeds the context bit budget (and the read-2 / average
/// quality auto-tuning switches) before the statistics pass amends it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Strategy {
    /// General-purpose defaults.
    #[default]
    Basic,
    /// Instruments with ~40 quality bins, e.g. HiSeq 2000.
    HiSeq,
    /// Instruments with long homogeneous runs, e.g. MiSeq.
    MiSeq,
    /// Adaptive order-1, e.g. IonTorrent.
    IonTorrent,
    /// Caller-tuned: an all-zero budget with no auto-tuning overrides.
    Custom,
}

impl From<u8> for Strategy {
    fn from(n: u8) -> Self {
        match n {
            0 => Self::Basic,
            1 => Self::HiSeq,
            2 => Self::MiSeq,
            3 => Self::IonTorrent,
            _ => Self::Custom,
        }
    }
}

/// Seed values for the tuner, before statistical amendment.
///
/// `p_shift < 0` means "derive from the first read length". `do_qa` is a
/// three-way switch: 0 = off, -1 = auto (with a 5% savings margin and bit
/// stealing), >= 2 forces the corresponding selector width.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Preset {
    pub q_bits: u32,
    pub q_shift: u32,
    pub p_bits: u32,
    pub p_shift: i32,
    pub d_bits: u32,
    pub d_shift: u32,
    pub q_loc: u32,
    pub s_loc: u32,
    pub p_loc: u32,
    pub d_loc: u32,
    pub do_r2: u32,
    pub do_qa: i32,
}

impl Strategy {
    pub(crate) fn preset(self) -> Preset {
        match self {
            Self::Basic => Preset {
                q_bits: 10,
                q_shift: 5,
                p_bits: 4,
                p_shift: -1,
                d_bits: 2,
                d_shift: 1,
                q_loc: 0,
                s_loc: 14,
                p_loc: 10,
                d_loc: 14,
                do_r2: 0,
                do_qa: -1,
            },
            Self::HiSeq => Preset {
                q_bits: 8,
                q_shift: 5,
                p_bits: 7,
                p_shift: 0,
                d_bits: 0,
                d_shift: 0,
                q_loc: 0,
                s_loc: 14,
                p_loc: 8,
                d_loc: 14,
                do_r2: 1,
                do_qa: -1,
            },
            Self::MiSeq => Preset {
                q_bits: 12,
                q_shift: 6,
                p_bits: 2,
                p_shift: 0,
                d_bits: 2,
                d_shift: 3,
                q_loc: 0,
                s_loc: 9,
                p_loc: 12,
                d_loc: 14,
                do_r2: 0,
                do_qa: 0,
            },
            Self::IonTorrent => Preset {
                q_bits: 12,
                q_shift: 6,
                p_bits: 0,
                p_shift: 0,
                d_bits: 0,
                d_shift: 0,
                q_loc: 0,
                s_loc: 12,
                p_loc: 0,
                d_loc: 0,
                do_r2: 0,
                do_qa: 0,
            },
            Self::Custom => Preset {
                q_bits: 0,
                q_shift: 0,
                p_bits: 0,
                p_shift: 0,
                d_bits: 0,
                d_shift: 0,
                q_loc: 0,
                s_loc: 0,
                p_loc: 0,
                d_loc: 0,
                do_r2: 0,
                do_qa: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u8_clamps() {
        assert_eq!(Strategy::from(0), Strategy::Basic);
        assert_eq!(Strategy::from(3), Strategy::IonTorrent);
        assert_eq!(Strategy::from(4), Strategy::Custom);
        assert_eq!(Strategy::from(200), Strategy::Custom);
    }
}
