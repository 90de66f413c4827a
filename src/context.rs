use crate::parameters::Parameter;

/// Per-record coding state, reset at every record boundary.
#[derive(Debug, Default)]
pub(crate) struct State {
    /// Running quality sub-context.
    pub qctx: u32,
    /// Positions remaining in the record.
    pub pos: usize,
    /// Count of quality value changes since the record start.
    pub delta: u32,
    /// Previous mapped quality symbol.
    pub prevq: u8,
    /// Selector for the current record.
    pub sel: u8,
}

/// Folds the symbol just coded into the state and returns the composite
/// context for the next symbol.
///
/// The position and delta tables are pre-shifted into their final bit
/// positions, so the composite is formed by plain adds and masked to 16
/// bits. `delta` deliberately updates on the first byte of a record as well
/// (`prevq` is seeded 0); round-trips depend on it.
pub(crate) fn update_context(param: &Parameter, state: &mut State, q: u8) -> u16 {
    let mut ctx = u32::from(param.context);

    state.qctx = (state.qctx << param.q_shift).wrapping_add(param.q_tab[usize::from(q)]);
    ctx = ctx.wrapping_add((state.qctx & ((1 << param.q_bits) - 1)) << param.q_loc);

    ctx = ctx.wrapping_add(param.p_tab[state.pos.min(1023)]);
    ctx = ctx.wrapping_add(param.d_tab[state.delta.min(255) as usize]);
    ctx = ctx.wrapping_add(u32::from(state.sel) << param.s_loc);

    if state.prevq != q {
        state.delta = state.delta.wrapping_add(1);
    }

    state.prevq = q;

    state.pos = state.pos.wrapping_sub(1);

    (ctx & 0xffff) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::parameter::Flags;

    fn parameter() -> Parameter {
        let mut param = Parameter {
            context: 0,
            flags: Flags::HAVE_PTAB | Flags::HAVE_DTAB,
            max_sym: 255,
            q_bits: 9,
            q_shift: 5,
            q_loc: 0,
            s_loc: 14,
            p_loc: 9,
            d_loc: 12,
            q_tab: (0..256).collect(),
            p_tab: (0..1024u32).map(|i| 7.min(i >> 4)).collect(),
            d_tab: (0..256u32).map(|i| 3.min(i >> 1)).collect(),
            quality_map: None,
            first_len: true,
        };

        param.shift_tables();

        param
    }

    #[test]
    fn test_update_is_deterministic() {
        let param = parameter();
        let qs = [30u8, 30, 31, 29, 29, 29, 40, 2, 2, 30];

        let run = || {
            let mut state = State {
                pos: qs.len(),
                ..State::default()
            };

            qs.iter()
                .map(|&q| update_context(&param, &mut state, q))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_delta_updates_on_first_byte() {
        let param = parameter();

        let mut state = State {
            pos: 4,
            ..State::default()
        };

        // prevq is seeded 0, so a nonzero first symbol already counts as a
        // change.
        update_context(&param, &mut state, 30);
        assert_eq!(state.delta, 1);

        update_context(&param, &mut state, 30);
        assert_eq!(state.delta, 1);

        update_context(&param, &mut state, 31);
        assert_eq!(state.delta, 2);
    }

    #[test]
    fn test_position_and_delta_clamp() {
        let param = parameter();

        let mut state = State {
            pos: 1 << 20,
            delta: 1 << 20,
            prevq: 5,
            ..State::default()
        };

        // Out-of-range position and delta saturate at the table bounds.
        let _ = update_context(&param, &mut state, 5);
        assert_eq!(state.pos, (1 << 20) - 1);
    }

    #[test]
    fn test_context_masked_to_16_bits() {
        let mut param = parameter();
        param.context = u16::MAX;
        param.q_bits = 15;
        param.q_loc = 8;

        let mut state = State {
            pos: 1023,
            ..State::default()
        };

        for q in [255u8, 255, 254, 3, 7] {
            let ctx = update_context(&param, &mut state, q);
            assert!(usize::from(ctx) < (1 << 16));
        }
    }
}
