use std::{f64::consts::LN_2, io::{self, Write}};

use crate::{
    aac::RangeCoder,
    context::{State, update_context},
    models::Models,
    options::Options,
    parameters::{self, Parameter, Parameters, parameter},
    record::Record,
    strategy::Strategy,
    version::Version,
};

// Position histograms key on the remaining length, mod this.
const POSITION_BINS: usize = 128;

// Approximate square root of the running delta; value v spans 2v + 1
// entries. Clamped to the delta bit budget before use.
const DSQR: [u32; 64] = [
    0, 1, 1, 1, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 3, //
    4, 4, 4, 4, 4, 4, 4, 4, 4, 5, 5, 5, 5, 5, 5, 5, //
    5, 5, 5, 5, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, //
    6, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, //
];

/// Encodes a block of quality scores.
///
/// `records` is the per-record metadata view; `src` is the concatenated
/// quality data for all records. Record quality spans are derived from
/// neighbouring `qual_offset`s, with the last span running to the end of
/// `src`.
pub fn encode(options: Options, records: &[Record], src: &[u8]) -> io::Result<Vec<u8>> {
    if records.is_empty() && !src.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "no records for a nonempty quality buffer",
        ));
    }

    if records.iter().any(|record| record.selector() > 255) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "selector values exceed 255",
        ));
    }

    let q_lens = quality_lengths(records, src.len())?;

    // Working copy of the flag words: the tuner writes chosen selectors into
    // the upper 16 bits, so caller metadata stays untouched.
    let mut flags: Vec<u32> = records.iter().map(|record| record.flags).collect();

    let mut parameters = build_parameters(&options, records, &q_lens, &mut flags, src)?;

    let mut dst = Vec::new();
    parameters.write(&mut dst)?;

    for param in &mut parameters.params {
        param.shift_tables();
    }

    // Original quality value -> model symbol, per parameter block.
    let symbol_maps: Vec<[u8; 256]> = parameters
        .params
        .iter()
        .map(|param| {
            let mut map = [0; 256];

            for (i, v) in map.iter_mut().enumerate() {
                *v = i as u8;
            }

            if let Some(ref quality_map) = param.quality_map {
                for (symbol, &quality) in quality_map.iter().enumerate() {
                    map[usize::from(quality)] = symbol as u8;
                }
            }

            map
        })
        .collect();

    let do_rev = parameters.gflags.contains(parameters::Flags::DO_REV);

    // Version 3 codes reverse-strand records back to front; work on a copy
    // rather than mutating the caller's buffer.
    let mut working_src;
    let src = if do_rev {
        working_src = src.to_vec();

        let mut offset = 0;

        for (rec, &len) in q_lens.iter().enumerate() {
            let len = if rec == q_lens.len() - 1 {
                src.len() - offset
            } else {
                len
            };

            if records[rec].is_reverse() && len > 1 {
                working_src[offset..offset + len].reverse();
            }

            offset += len;
        }

        &working_src[..]
    } else {
        src
    };

    let mut range_coder = RangeCoder::default();
    let mut models = Models::new(parameters.symbol_count(), parameters.selector_count());

    let mut state = State::default();
    let mut last: u16 = 0;
    let mut last_len = 0;
    let mut rec = 0;
    let mut x = 0;
    let mut i = 0;

    while i < src.len() {
        if state.pos == 0 {
            if parameters.params[x].flags.has_selector() {
                state.sel = flags.get(rec).copied().map_or(0, |f| (f >> 16) as u8);

                let sel_model = models.sel.as_mut().ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "selector coded without a selector model",
                    )
                })?;

                sel_model.encode(&mut dst, &mut range_coder, state.sel)?;
            } else {
                state.sel = 0;
            }

            x = if parameters.gflags.contains(parameters::Flags::HAVE_S_TAB) {
                usize::from(parameters.s_tab[usize::from(state.sel)])
            } else {
                usize::from(state.sel)
            };

            // Trailing input beyond the metadata is coded as pseudo-records
            // reusing the last record's span.
            let rec_len = if rec < records.len() {
                q_lens[rec]
            } else {
                src.len() - records.last().map(|r| r.qual_offset).unwrap_or(0)
            };

            let param = &mut parameters.params[x];

            if !param.flags.is_fixed_length() || param.first_len {
                encode_length(&mut dst, &mut range_coder, &mut models, rec_len)?;
                param.first_len = false;
            }

            if do_rev {
                let rev = rec < records.len() && records[rec].is_reverse();
                models.rev.encode(&mut dst, &mut range_coder, u8::from(rev))?;
            }

            rec += 1;

            state.pos = rec_len;
            state.delta = 0;
            state.qctx = 0;
            state.prevq = 0;
            last = param.context;

            if param.flags.has_duplicates() {
                let is_dup = i > 0
                    && rec_len > 0
                    && rec_len == last_len
                    && i + rec_len <= src.len()
                    && src[i - rec_len..i] == src[i..i + rec_len];

                models.dup.encode(&mut dst, &mut range_coder, u8::from(is_dup))?;

                if is_dup {
                    i += rec_len;
                    state.pos = 0;
                    continue;
                }

                last_len = rec_len;
            }
        }

        let symbol = symbol_maps[x][usize::from(src[i])];
        models.qual[usize::from(last)].encode(&mut dst, &mut range_coder, symbol)?;
        last = update_context(&parameters.params[x], &mut state, symbol);
        i += 1;
    }

    range_coder.range_encode_end(&mut dst)?;

    Ok(dst)
}

fn quality_lengths(records: &[Record], src_len: usize) -> io::Result<Vec<usize>> {
    let mut lens = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let end = records
            .get(i + 1)
            .map(|next| next.qual_offset)
            .unwrap_or(src_len);

        if end > src_len || record.qual_offset > end {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "record quality offsets are not monotonic",
            ));
        }

        lens.push(end - record.qual_offset);
    }

    Ok(lens)
}

fn encode_length<W>(
    dst: &mut W,
    range_coder: &mut RangeCoder,
    models: &mut Models,
    len: usize,
) -> io::Result<()>
where
    W: Write,
{
    let n = u32::try_from(len).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    models.len[0].encode(dst, range_coder, (n & 0xff) as u8)?;
    models.len[1].encode(dst, range_coder, ((n >> 8) & 0xff) as u8)?;
    models.len[2].encode(dst, range_coder, ((n >> 16) & 0xff) as u8)?;
    models.len[3].encode(dst, range_coder, ((n >> 24) & 0xff) as u8)?;

    Ok(())
}

// Tuning state: the strategy preset's bit budget, amended by the
// statistics pass before it is frozen into a parameter block.
struct Tuning {
    q_bits: u32,
    q_shift: u32,
    p_bits: u32,
    p_shift: i32,
    d_bits: u32,
    d_shift: u32,
    q_loc: u32,
    s_loc: u32,
    p_loc: u32,
    d_loc: u32,
    do_r2: u32,
    do_qa: i32,
    do_sel: bool,
    do_dedup: bool,
    max_sym: u32,
    n_sym: u32,
}

impl Tuning {
    fn new(strategy: Strategy) -> Self {
        let preset = strategy.preset();

        Self {
            q_bits: preset.q_bits,
            q_shift: preset.q_shift,
            p_bits: preset.p_bits,
            p_shift: preset.p_shift,
            d_bits: preset.d_bits,
            d_shift: preset.d_shift,
            q_loc: preset.q_loc,
            s_loc: preset.s_loc,
            p_loc: preset.p_loc,
            d_loc: preset.d_loc,
            do_r2: preset.do_r2,
            do_qa: preset.do_qa,
            do_sel: false,
            do_dedup: false,
            max_sym: 0,
            n_sym: 0,
        }
    }
}

fn build_parameters(
    options: &Options,
    records: &[Record],
    q_lens: &[usize],
    flags: &mut [u32],
    src: &[u8],
) -> io::Result<Parameters> {
    let mut t = Tuning::new(options.strategy);

    let mut gflags = parameters::Flags::empty();

    if options.version == Version::V3 {
        // V3 does not store qualities in original orientation.
        gflags |= parameters::Flags::DO_REV;
    }

    let qhist = quality_stats(records, q_lens, flags, src, &mut t);

    let store_qmap = t.n_sym <= 8 && t.n_sym * 2 < t.max_sym;

    let fixed_len = !q_lens.is_empty() && q_lens.iter().all(|&len| len == q_lens[0]);

    if options.strategy != Strategy::Custom {
        if t.p_shift < 0 {
            let first_len = records.first().map(|record| record.len).unwrap_or(0);
            t.p_shift = position_shift(first_len, t.p_bits);
        }

        if t.n_sym <= 4 {
            // NovaSeq-like four-bin data.
            t.q_shift = 2;

            if src.len() < 5_000_000 {
                t.p_bits = 2;
                t.p_shift = 5;
            }
        } else if t.n_sym <= 8 {
            // HiSeqX-like eight-bin data.
            t.q_bits = t.q_bits.min(9);
            t.q_shift = 3;

            if src.len() < 5_000_000 {
                t.q_bits = 6;
            }
        }

        if src.len() < 300_000 {
            t.q_bits = t.q_shift;
            t.d_bits = 2;
        }
    }

    let mut dsqr = DSQR;

    for v in &mut dsqr {
        *v = (*v).min((1u32 << t.d_bits) - 1);
    }

    let (quality_map, max_sym) = if store_qmap {
        let map: Vec<u8> = (0..=255u8).filter(|&q| qhist[usize::from(q)] > 0).collect();
        (Some(map), t.n_sym as u8)
    } else {
        (None, t.max_sym as u8)
    };

    let q_tab: Vec<u32> = (0..256).collect();

    let p_tab: Vec<u32> = if t.p_bits > 0 {
        (0..1024u32)
            .map(|i| ((1u32 << t.p_bits) - 1).min(i >> t.p_shift))
            .collect()
    } else {
        vec![0; 1024]
    };

    let d_tab: Vec<u32> = if t.d_bits > 0 {
        (0..256usize).map(|i| dsqr[63.min(i >> t.d_shift)]).collect()
    } else {
        vec![0; 256]
    };

    let mut pflags = parameter::Flags::empty();

    // This tuner never emits a custom qtab.
    if t.p_bits > 0 {
        pflags |= parameter::Flags::HAVE_PTAB;
    }

    if t.d_bits > 0 {
        pflags |= parameter::Flags::HAVE_DTAB;
    }

    if t.do_sel {
        pflags |= parameter::Flags::DO_SEL;
    }

    if fixed_len {
        pflags |= parameter::Flags::DO_LEN;
    }

    if t.do_dedup {
        pflags |= parameter::Flags::DO_DEDUP;
    }

    if store_qmap {
        pflags |= parameter::Flags::HAVE_QMAP;
    }

    let param = Parameter {
        context: 0,
        flags: pflags,
        max_sym,
        q_bits: t.q_bits as u8,
        q_shift: t.q_shift as u8,
        q_loc: t.q_loc as u8,
        s_loc: t.s_loc as u8,
        p_loc: t.p_loc as u8,
        d_loc: t.d_loc as u8,
        q_tab,
        p_tab,
        d_tab,
        quality_map,
        first_len: true,
    };

    let mut max_sel = 0;

    if t.do_sel {
        // One parameter block; the selector only widens the sub-context, so
        // the selector table stays all zero.
        gflags |= parameters::Flags::HAVE_S_TAB;
        max_sel = flags.iter().map(|f| f >> 16).max().unwrap_or(0);
    }

    let max_sel = u8::try_from(max_sel)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "selector values exceed 255"))?;

    Ok(Parameters {
        gflags,
        max_sel,
        s_tab: vec![0; 256],
        max_sym,
        params: vec![param],
    })
}

// pshift < 0 in a preset means "derive from the read length": the shift
// that spreads the first read across the position bit budget.
fn position_shift(first_len: usize, p_bits: u32) -> i32 {
    let ratio = first_len as f64 / f64::from(1u32 << p_bits);
    let shift = (ratio.log2() + 0.5).max(0.0) as i32;

    shift.min(31)
}

/// Scans the block, filling the symbol histograms, detecting duplicates,
/// and running the selector auto-tuners. Chosen selectors are written into
/// the upper 16 bits of the working flag words.
fn quality_stats(
    records: &[Record],
    q_lens: &[usize],
    flags: &mut [u32],
    src: &[u8],
    t: &mut Tuning,
) -> [u32; 256] {
    let n_records = records.len();

    let mut qhist = [0u32; 256];
    let mut qhistb = vec![[0u32; 256]; POSITION_BINS];
    let mut qhist1 = vec![[0u32; 256]; POSITION_BINS];
    let mut qhist2 = vec![[0u32; 256]; POSITION_BINS];
    let mut t1 = [0u64; POSITION_BINS];
    let mut t2 = [0u64; POSITION_BINS];

    // Average-quality histogram, reused below as the average-to-selector
    // bin map.
    let mut avg = vec![0u32; 2560];

    let mut max_sel = flags.iter().map(|f| f >> 16).max().unwrap_or(0);
    let has_r2 = flags.iter().any(|f| f & Record::READ_2 != 0);

    let mut avg_qual = vec![0u32; n_records + 1];
    let mut dup_count = 0usize;
    let mut last_len = 0;

    let mut i = 0;
    let mut rec = 0;

    while i < src.len() {
        let (rec_len, read_2) = if rec < n_records {
            (q_lens[rec], flags[rec] & Record::READ_2 != 0)
        } else {
            (src.len() - i, false)
        };

        if rec < n_records
            && i > 0
            && rec_len == last_len
            && src[i - rec_len..i] == src[i..i + rec_len]
        {
            dup_count += 1;
        }

        last_len = rec_len;

        let (qh, th) = if read_2 {
            (&mut qhist2, &mut t2)
        } else {
            (&mut qhist1, &mut t1)
        };

        let mut tot = 0u32;
        let mut j = rec_len;

        while i < src.len() && j > 0 {
            let q = usize::from(src[i]);
            let bin = j & (POSITION_BINS - 1);

            tot = tot.wrapping_add(u32::from(src[i]));
            qhist[q] += 1;
            qhistb[bin][q] += 1;
            qh[bin][q] += 1;
            th[bin] += 1;

            i += 1;
            j -= 1;
        }

        // Average quality scaled by 10, rounded.
        let tot = if rec_len > 0 {
            (f64::from(tot) * 10.0 / rec_len as f64 + 0.5) as u32
        } else {
            0
        };

        avg_qual[rec] = tot;
        avg[2559.min(tot as usize)] += 1;

        rec += 1;
    }

    t.do_dedup = (rec + 1) / (dup_count + 1) < 500;

    t.max_sym = 0;
    t.n_sym = 0;

    for (value, &count) in qhist.iter().enumerate() {
        if count > 0 {
            t.max_sym = value as u32;
            t.n_sym += 1;
        }
    }

    if t.do_qa != 0 {
        max_sel = tune_quality_average(q_lens, flags, src, t, &mut avg, &avg_qual, max_sel);
    }

    if has_r2 || t.do_r2 > 0 {
        max_sel = tune_read_pair_split(
            flags, &qhistb, &qhist1, &qhist2, &t1, &t2, t.do_r2, max_sel,
        );
    }

    // Explicit selector metadata or an auto-tuned selector.
    if max_sel > 0 {
        t.do_sel = true;
    }

    qhist
}

/// Decides whether binning records by their average quality pays for the
/// selector bits it costs, comparing pooled against 2- and 4-way split
/// empirical entropies.
fn tune_quality_average(
    q_lens: &[usize],
    flags: &mut [u32],
    src: &[u8],
    t: &mut Tuning,
    avg: &mut [u32],
    avg_qual: &[u32],
    mut max_sel: u32,
) -> u32 {
    let n_records = flags.len();
    let n_records_f = n_records as f64;

    // Few distinct symbols compress hard, making selector bits a larger
    // fraction; skew the binning instead of splitting evenly.
    let qf0 = if t.n_sym > 4 { 0.25 } else { 0.05 };
    let qf1 = if t.n_sym > 4 { 0.50 } else { 0.15 };
    let qf2 = if t.n_sym > 4 { 0.75 } else { 0.60 };

    // Turn the average-quality histogram into a bin map by distribution
    // quantiles. Boundary entries fall through to the next segment.
    let mut total = 0u64;
    let mut i = 0;

    while i < 2560 {
        total += u64::from(avg[i]);

        if total as f64 > qf0 * n_records_f {
            break;
        }

        avg[i] = 0;
        i += 1;
    }

    while i < 2560 {
        total += u64::from(avg[i]);

        if total as f64 > qf1 * n_records_f {
            break;
        }

        avg[i] = 3;
        i += 1;
    }

    while i < 2560 {
        total += u64::from(avg[i]);

        if total as f64 > qf2 * n_records_f {
            break;
        }

        if i > 375 {
            break;
        }

        avg[i] = 2;
        i += 1;
    }

    while i < 2560 {
        avg[i] = 1;
        i += 1;
    }

    // Entropy of the merged signal vs the 2- and 4-way splits.
    let mut qbin4 = vec![vec![[0u32; 256]; POSITION_BINS]; 4];
    let mut qbin2 = vec![vec![[0u32; 256]; POSITION_BINS]; 2];
    let mut qbin1 = vec![[0u32; 256]; POSITION_BINS];
    let mut qcnt4 = [[0u64; POSITION_BINS]; 4];
    let mut qcnt2 = [[0u64; POSITION_BINS]; 2];
    let mut qcnt1 = [0u64; POSITION_BINS];

    let mut i = 0;
    let mut rec = 0;

    while i < src.len() {
        let rec_len = if rec < n_records {
            q_lens[rec]
        } else {
            src.len() - i
        };

        let qb4 = avg[2559.min(avg_qual[rec] as usize)] as usize;

        let mut j = rec_len;

        while i < src.len() && j > 0 {
            let q = usize::from(src[i]);
            let bin = j & (POSITION_BINS - 1);

            qbin4[qb4][bin][q] += 1;
            qcnt4[qb4][bin] += 1;
            qbin2[qb4 / 2][bin][q] += 1;
            qcnt2[qb4 / 2][bin] += 1;
            qbin1[bin][q] += 1;
            qcnt1[bin] += 1;

            i += 1;
            j -= 1;
        }

        rec += 1;
    }

    let mut e1 = 0.0;
    let mut e2 = 0.0;
    let mut e4 = 0.0;

    for bin in 0..POSITION_BINS {
        for q in 0..256 {
            e1 += entropy_term(qbin1[bin][q], qcnt1[bin]);

            for half in 0..2 {
                e2 += entropy_term(qbin2[half][bin][q], qcnt2[half][bin]);
            }

            for quarter in 0..4 {
                e4 += entropy_term(qbin4[quarter][bin][q], qcnt4[quarter][bin]);
            }
        }
    }

    e1 /= -LN_2 / 8.0;
    e2 /= -LN_2 / 8.0;
    e4 /= -LN_2 / 8.0;

    // The selector robs context bits from elsewhere by an unknown amount,
    // so in auto mode demand a 5% margin.
    let margin = if t.do_qa > 0 { 1.0 } else { 0.95 };
    let quarter_cost = (n_records / 4) as f64;
    let half_cost = (n_records / 8) as f64;

    if (t.do_qa == -1 || t.do_qa >= 4)
        && e4 + quarter_cost < e2 * margin + half_cost
        && e4 + quarter_cost < e1 * margin
    {
        for (record_flags, &tot) in flags.iter_mut().zip(avg_qual) {
            *record_flags |= avg[2559.min(tot as usize)] << 16;
        }

        t.do_sel = true;
        max_sel = 3;
    } else if (t.do_qa == -1 || t.do_qa >= 2) && e2 + half_cost < e1 * margin {
        for (record_flags, &tot) in flags.iter_mut().zip(avg_qual) {
            *record_flags |= (avg[2559.min(tot as usize)] >> 1) << 16;
        }

        t.do_sel = true;
        max_sel = 1;
    }

    if t.do_qa == -1 {
        // Make room for the selector: steal from pos+delta, else delta,
        // else quality.
        if t.p_bits > 0 && t.d_bits > 0 {
            t.s_loc = t.d_loc.saturating_sub(1);
            t.p_bits -= 1;
            t.d_bits -= 1;
            t.d_loc += 1;
        } else if t.d_bits >= 2 {
            t.s_loc = t.d_loc;
            t.d_bits -= 2;
            t.d_loc += 2;
        } else if t.q_bits >= 2 {
            t.q_bits -= 2;
            t.p_loc = t.p_loc.saturating_sub(2);
            t.s_loc = 16 - 2 - t.do_r2;

            if t.q_bits == 6 && t.q_shift == 5 {
                t.q_bits -= 1;
            }
        }

        t.do_qa = 4;
    }

    max_sel
}

/// Decides whether splitting the model by read 1 / read 2 pays, ORing an
/// extra low selector bit in when it does.
#[allow(clippy::too_many_arguments)]
fn tune_read_pair_split(
    flags: &mut [u32],
    qhistb: &[[u32; 256]],
    qhist1: &[[u32; 256]],
    qhist2: &[[u32; 256]],
    t1: &[u64],
    t2: &[u64],
    do_r2: u32,
    mut max_sel: u32,
) -> u32 {
    let n_records = flags.len();

    let mut e1 = 0.0;
    let mut e2 = 0.0;

    for bin in 0..POSITION_BINS {
        if t1[bin] == 0 || t2[bin] == 0 {
            continue;
        }

        for q in 0..256 {
            let both = qhistb[bin][q];

            if both == 0 {
                continue;
            }

            e1 -= f64::from(both) * (f64::from(both) / (t1[bin] + t2[bin]) as f64).ln();

            if qhist1[bin][q] > 0 {
                e2 -= f64::from(qhist1[bin][q]) * (f64::from(qhist1[bin][q]) / t1[bin] as f64).ln();
            }

            if qhist2[bin][q] > 0 {
                e2 -= f64::from(qhist2[bin][q]) * (f64::from(qhist2[bin][q]) / t2[bin] as f64).ln();
            }
        }
    }

    e1 /= LN_2 * 8.0;
    e2 /= LN_2 * 8.0;

    let margin = if do_r2 > 0 { 1.0 } else { 0.95 };

    if e2 + ((8 + n_records / 8) as f64) < e1 * margin {
        for record_flags in flags.iter_mut() {
            let sel = *record_flags >> 16;

            let low = if *record_flags & Record::READ_2 != 0 {
                sel * 2 + 1
            } else {
                sel * 2
            };

            *record_flags = (*record_flags & 0xffff) | (low << 16);
            max_sel = max_sel.max(*record_flags >> 16);
        }
    }

    max_sel
}

fn entropy_term(count: u32, total: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        f64::from(count) * (f64::from(count) / total as f64).ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records_for(lens: &[(usize, u32)]) -> Vec<Record> {
        let mut offset = 0;

        lens.iter()
            .map(|&(len, flags)| {
                let record = Record::new(offset, len, flags);
                offset += len;
                record
            })
            .collect()
    }

    fn tuned(records: &[Record], src: &[u8], strategy: Strategy) -> Parameters {
        let options = Options {
            strategy,
            ..Options::default()
        };

        let q_lens = quality_lengths(records, src.len()).unwrap();
        let mut flags: Vec<u32> = records.iter().map(|record| record.flags).collect();

        build_parameters(&options, records, &q_lens, &mut flags, src).unwrap()
    }

    #[test]
    fn test_tuner_single_uniform_record() {
        // One 100-byte record of constant quality 30.
        let records = records_for(&[(100, 0)]);
        let src = vec![30u8; 100];

        let parameters = tuned(&records, &src, Strategy::Basic);
        let param = &parameters.params[0];

        assert!(param.flags.has_quality_map());
        assert!(param.flags.is_fixed_length());
        assert_eq!(param.max_sym, 1);
        assert_eq!(param.quality_map.as_deref(), Some(&[30u8][..]));
    }

    #[test]
    fn test_tuner_two_bucket_alphabet() {
        // 1000 records of length 50: first half all 20s, second half all 40s.
        let mut lens = Vec::new();
        let mut src = Vec::new();

        for r in 0..1000 {
            lens.push((50, 0));
            let q = if r < 500 { 20u8 } else { 40 };
            src.extend(std::iter::repeat_n(q, 50));
        }

        let records = records_for(&lens);
        let parameters = tuned(&records, &src, Strategy::Basic);
        let param = &parameters.params[0];

        assert_eq!(param.max_sym, 2);
        assert!(param.flags.has_quality_map());
        assert_eq!(param.quality_map.as_deref(), Some(&[20u8, 40][..]));
        assert!(param.flags.is_fixed_length());
    }

    #[test]
    fn test_tuner_detects_duplicates() {
        // 200 identical records.
        let one: Vec<u8> = (0..75).map(|i| 10 + (i % 10) as u8).collect();
        let lens = vec![(75, 0); 200];
        let src: Vec<u8> = one.iter().copied().cycle().take(75 * 200).collect();

        let records = records_for(&lens);
        let parameters = tuned(&records, &src, Strategy::Basic);

        assert!(parameters.params[0].flags.has_duplicates());
    }

    #[test]
    fn test_tuner_splits_read_pairs() {
        // Read 1 qualities in [0..6), read 2 qualities in [30..36).
        let mut lens = Vec::new();
        let mut src = Vec::new();

        for r in 0..1000u32 {
            let read_2 = r >= 500;
            lens.push((64, if read_2 { Record::READ_2 } else { 0 }));

            let base = if read_2 { 30u8 } else { 0 };
            src.extend((0..64u32).map(|i| base + ((r + i) % 6) as u8));
        }

        let records = records_for(&lens);
        let parameters = tuned(&records, &src, Strategy::Basic);

        assert!(parameters.params[0].flags.has_selector());
        assert!(parameters.gflags.contains(parameters::Flags::HAVE_S_TAB));
        assert!(parameters.max_sel >= 1);
    }

    #[test]
    fn test_tuner_mixed_lengths_disable_fixed_len() {
        let pattern = [50usize, 100, 75, 100, 50];
        let mut lens = Vec::new();
        let mut src = Vec::new();

        for r in 0..100usize {
            let len = pattern[r % pattern.len()];
            lens.push((len, 0));
            src.extend((0..len).map(|i| ((r * 31 + i * 7) % 40) as u8));
        }

        let records = records_for(&lens);
        let parameters = tuned(&records, &src, Strategy::Basic);

        assert!(!parameters.params[0].flags.is_fixed_length());
    }

    #[test]
    fn test_quality_lengths_rejects_bad_offsets() {
        let records = [Record::new(10, 5, 0), Record::new(5, 5, 0)];
        assert!(quality_lengths(&records, 20).is_err());

        let records = [Record::new(0, 5, 0), Record::new(30, 5, 0)];
        assert!(quality_lengths(&records, 20).is_err());
    }

    #[test]
    fn test_encode_rejects_oversized_selector() {
        let records = [Record::new(0, 4, 300 << 16)];
        let src = [1u8, 2, 3, 4];

        assert!(encode(Options::default(), &records, &src).is_err());
    }

    #[test]
    fn test_position_shift() {
        // 151bp reads over a 4-bit position budget quantise by 8.
        assert_eq!(position_shift(151, 4), 3);
        assert_eq!(position_shift(0, 4), 0);
        assert_eq!(position_shift(4, 7), 0);
    }
}
