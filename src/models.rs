use std::num::NonZero;

use crate::aac::Model;

pub(crate) const CTX_SIZE: usize = 1 << 16;

const BINARY: NonZero<usize> = NonZero::new(2).unwrap();
const BYTE: NonZero<usize> = NonZero::new(256).unwrap();

/// The per-block model set.
///
/// One quality model per 16-bit context, four byte models for record
/// lengths, binary models for the reverse and duplicate bits, and an
/// optional selector model. Encoder and decoder build identical sets and
/// must visit them in the same order.
pub(crate) struct Models {
    pub qual: Vec<Model>,
    pub len: [Model; 4],
    pub rev: Model,
    pub dup: Model,
    pub sel: Option<Model>,
}

impl Models {
    pub fn new(symbol_count: NonZero<usize>, selector_count: Option<NonZero<usize>>) -> Self {
        Self {
            qual: vec![Model::new(symbol_count); CTX_SIZE],
            len: [
                Model::new(BYTE),
                Model::new(BYTE),
                Model::new(BYTE),
                Model::new(BYTE),
            ],
            rev: Model::new(BINARY),
            dup: Model::new(BINARY),
            sel: selector_count.map(Model::new),
        }
    }
}
