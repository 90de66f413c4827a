use std::io::{self, Read};

use crate::{
    aac::RangeCoder,
    context::{State, update_context},
    models::Models,
    parameters::{self, Parameters},
};

/// Decodes a compressed quality block into `dst_len` bytes.
///
/// `dst_len` is the uncompressed size declared by the enclosing container.
/// Any inconsistency between it and the stream surfaces as an
/// [`io::ErrorKind::InvalidData`] error; no partial output is returned.
pub fn decode(src: &[u8], dst_len: usize) -> io::Result<Vec<u8>> {
    let mut reader = src;

    let mut parameters = Parameters::read(&mut reader)?;

    for param in &mut parameters.params {
        param.shift_tables();
    }

    let mut models = Models::new(parameters.symbol_count(), parameters.selector_count());
    let mut range_coder = RangeCoder::default();
    range_coder.range_decode_create(&mut reader)?;

    let do_rev = parameters.gflags.contains(parameters::Flags::DO_REV);

    let mut dst = vec![0; dst_len];
    let mut rev_len: Vec<(bool, usize)> = Vec::new();

    let mut state = State::default();
    let mut last: u16 = 0;
    let mut last_len = 0;
    let mut x = 0;
    let mut i = 0;

    while i < dst_len {
        if state.pos == 0 {
            if parameters.params[x].flags.has_selector() {
                let sel_model = models.sel.as_mut().ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        "selector coded without a selector table",
                    )
                })?;

                state.sel = sel_model.decode(&mut reader, &mut range_coder)?;
            } else {
                state.sel = 0;
            }

            x = if parameters.gflags.contains(parameters::Flags::HAVE_S_TAB) {
                usize::from(parameters.s_tab[usize::from(state.sel)])
            } else {
                usize::from(state.sel)
            };

            if x >= parameters.params.len() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "selector maps past the parameter blocks",
                ));
            }

            let param = &mut parameters.params[x];

            let mut rec_len = last_len;

            if !param.flags.is_fixed_length() || param.first_len {
                let n = decode_length(&mut reader, &mut range_coder, &mut models)?;
                rec_len = usize::try_from(n)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                param.first_len = false;
                last_len = rec_len;
            }

            if do_rev {
                let rev = models.rev.decode(&mut reader, &mut range_coder)? == 1;
                rev_len.push((rev, rec_len));
            }

            if param.flags.has_duplicates()
                && models.dup.decode(&mut reader, &mut range_coder)? == 1
            {
                if rec_len == 0 || rec_len > i || dst_len - i < rec_len {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "invalid duplicate record",
                    ));
                }

                dst.copy_within(i - rec_len..i, i);
                i += rec_len;

                continue;
            }

            state.pos = rec_len;
            state.delta = 0;
            state.qctx = 0;
            state.prevq = 0;
            last = param.context;
        }

        let param = &parameters.params[x];
        let symbol = models.qual[usize::from(last)].decode(&mut reader, &mut range_coder)?;

        dst[i] = match param.quality_map {
            Some(ref quality_map) => quality_map
                .get(usize::from(symbol))
                .copied()
                .unwrap_or(symbol),
            None => symbol,
        };

        last = update_context(param, &mut state, symbol);
        i += 1;
    }

    if do_rev {
        reverse_qualities(&mut dst, &rev_len);
    }

    Ok(dst)
}

fn decode_length<R>(
    reader: &mut R,
    range_coder: &mut RangeCoder,
    models: &mut Models,
) -> io::Result<u32>
where
    R: Read,
{
    let b0 = models.len[0].decode(reader, range_coder).map(u32::from)?;
    let b1 = models.len[1].decode(reader, range_coder).map(u32::from)?;
    let b2 = models.len[2].decode(reader, range_coder).map(u32::from)?;
    let b3 = models.len[3].decode(reader, range_coder).map(u32::from)?;

    Ok(b3 << 24 | b2 << 16 | b1 << 8 | b0)
}

fn reverse_qualities(dst: &mut [u8], rev_len: &[(bool, usize)]) {
    let mut i = 0;

    for &(rev, len) in rev_len {
        if i + len > dst.len() {
            break;
        }

        if rev {
            dst[i..i + len].reverse();
        }

        i += len;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::parameters::{Parameter, parameter};

    // Hand-drives the coder over a two-block parameter set to exercise the
    // multi-param and selector-table decode paths the tuner never produces.
    #[test]
    fn test_decode_multi_param_stream() -> io::Result<()> {
        fn block(max_sym: u8, quality_map: Option<Vec<u8>>) -> Parameter {
            let mut flags = parameter::Flags::DO_SEL;

            if quality_map.is_some() {
                flags |= parameter::Flags::HAVE_QMAP;
            }

            Parameter {
                context: 0,
                flags,
                max_sym,
                q_bits: 4,
                q_shift: 2,
                q_loc: 0,
                s_loc: 14,
                p_loc: 0,
                d_loc: 0,
                q_tab: (0..256).collect(),
                p_tab: vec![0; 1024],
                d_tab: vec![0; 256],
                quality_map,
                first_len: true,
            }
        }

        let mut s_tab = vec![1u8; 256];
        s_tab[0] = 0;

        let mut params = Parameters {
            gflags: parameters::Flags::MULTI_PARAM | parameters::Flags::HAVE_S_TAB,
            max_sel: 1,
            s_tab,
            max_sym: 40,
            params: vec![block(2, Some(vec![5, 10])), block(40, None)],
        };

        let mut dst = Vec::new();
        params.write(&mut dst)?;

        for param in &mut params.params {
            param.shift_tables();
        }

        let mut models = Models::new(params.symbol_count(), params.selector_count());
        let mut range_coder = RangeCoder::default();

        let recs: [(u8, &[u8]); 4] = [
            (0, &[5, 10, 5, 5, 10]),
            (1, &[30, 31, 32, 33]),
            (0, &[10, 10, 5, 10]),
            (1, &[40, 30, 40]),
        ];

        let mut expected = Vec::new();

        for &(sel, qs) in &recs {
            models
                .sel
                .as_mut()
                .unwrap()
                .encode(&mut dst, &mut range_coder, sel)?;

            let x = usize::from(params.s_tab[usize::from(sel)]);
            let param = &params.params[x];

            let n = qs.len() as u32;

            for (b, model) in models.len.iter_mut().enumerate() {
                model.encode(&mut dst, &mut range_coder, (n >> (8 * b)) as u8)?;
            }

            let mut state = State {
                pos: qs.len(),
                sel,
                ..State::default()
            };

            let mut last = param.context;

            for &q in qs {
                let symbol = match param.quality_map {
                    Some(ref map) => map.iter().position(|&v| v == q).unwrap() as u8,
                    None => q,
                };

                models.qual[usize::from(last)].encode(&mut dst, &mut range_coder, symbol)?;
                last = update_context(param, &mut state, symbol);
            }

            expected.write_all(qs)?;
        }

        range_coder.range_encode_end(&mut dst)?;

        let actual = decode(&dst, expected.len())?;

        assert_eq!(actual, expected);

        Ok(())
    }

    #[test]
    fn test_decode_rejects_unsupported_version() {
        let src = [6u8, 0, 0, 0];
        assert!(decode(&src, 16).is_err());
    }

    #[test]
    fn test_decode_rejects_zero_param_count() {
        // MULTI_PARAM set with nparam == 0.
        let src = [5u8, 0x01, 0, 0];
        assert!(decode(&src, 16).is_err());
    }

    #[test]
    fn test_decode_rejects_truncated_stream() {
        let src = [5u8];
        assert!(decode(&src, 16).is_err());
    }

    #[test]
    fn test_reverse_qualities() {
        let mut data = vec![2, 4, 6, 8, 10, 30, 31, 32, 33, 20, 21];
        let rev_len = [(false, 5), (true, 4), (true, 2)];

        reverse_qualities(&mut data, &rev_len);

        assert_eq!(data, [2, 4, 6, 8, 10, 33, 32, 31, 30, 21, 20]);
    }

    #[test]
    fn test_reverse_qualities_ignores_overhanging_lengths() {
        let mut data = vec![7, 8, 9, 40, 41, 42];
        let rev_len = [(true, 3), (true, 9)];

        reverse_qualities(&mut data, &rev_len);

        assert_eq!(data, [9, 8, 7, 40, 41, 42]);
    }
}
