//! Property tests for the algebra engine
//!
//! Patterns of element-wise results, agreement of the multiply kernels,
//! mask complement duality, and the deferred-mutation state machine.

mod common;

use common::{
    arb_orientation, arb_product, arb_sparse, arb_sparse_pair, config_by, pattern, sorted_entries,
};
use proptest::prelude::*;
use sparsegrb::prelude::*;
use std::collections::BTreeSet;

fn plus_i64() -> BinaryOp {
    BinaryOp::builtin(BinaryOpcode::Plus, DType::I64).unwrap()
}

fn empty_like(nrows: usize, ncols: usize, orientation: Orientation) -> Matrix {
    Matrix::new_with(DType::I64, nrows, ncols, &config_by(orientation)).unwrap()
}

/// Many single-vector tasks on several threads
fn sliced() -> Context {
    Context::new(Config::new().with_nthreads(4).with_chunk(1))
}

fn arb_semiring() -> impl Strategy<Value = Semiring> {
    prop_oneof![
        Just(Semiring::plus_times(DType::I64).unwrap()),
        Just(Semiring::min_plus(DType::I64).unwrap()),
        Just(Semiring::max_plus(DType::I64).unwrap()),
        Just(Semiring::builtin(BinaryOpcode::Plus, BinaryOpcode::Minus, DType::I64).unwrap()),
        Just(Semiring::builtin(BinaryOpcode::Max, BinaryOpcode::First, DType::I64).unwrap()),
        // add monoids whose terminal the generated values reach
        Just(Semiring::builtin(BinaryOpcode::Times, BinaryOpcode::Times, DType::I64).unwrap()),
        Just(Semiring::lor_land().unwrap()),
    ]
}

/// A mutation applied through the element interface
#[derive(Debug, Clone)]
enum Mutation {
    Set(usize, usize, i64),
    Remove(usize, usize),
}

fn arb_mutations(nrows: usize, ncols: usize) -> impl Strategy<Value = Vec<Mutation>> {
    let one = prop_oneof![
        (0..nrows, 0..ncols, -9i64..9).prop_map(|(r, c, v)| Mutation::Set(r, c, v)),
        (0..nrows, 0..ncols).prop_map(|(r, c)| Mutation::Remove(r, c)),
    ];
    prop::collection::vec(one, 0..24)
}

fn apply_mutations(m: &mut Matrix, mutations: &[Mutation]) {
    for mutation in mutations {
        match *mutation {
            Mutation::Set(r, c, v) => m.set_element(r, c, v).unwrap(),
            Mutation::Remove(r, c) => m.remove_element(r, c).unwrap(),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// ewise_add covers the union of the operand patterns and ewise_mult
    /// their intersection, however the work is sliced
    #[test]
    fn ewise_patterns(
        (a, b) in arb_sparse_pair(8),
        oa in arb_orientation(),
        ob in arb_orientation(),
        oc in arb_orientation(),
    ) {
        let (am, bm) = (a.build(oa), b.build(ob));
        let (pa, pb) = (a.pattern(), b.pattern());
        let d = Descriptor::new();

        let mut c = empty_like(a.nrows, a.ncols, oc);
        Context::default().ewise_add(&mut c, None, None, &plus_i64(), &am, &bm, &d).unwrap();
        let union: BTreeSet<_> = pa.union(&pb).copied().collect();
        prop_assert_eq!(pattern(&c), union);
        let mut sc = empty_like(a.nrows, a.ncols, oc);
        sliced().ewise_add(&mut sc, None, None, &plus_i64(), &am, &bm, &d).unwrap();
        prop_assert!(sc.check().is_ok());
        prop_assert_eq!(sorted_entries::<i64>(&sc), sorted_entries::<i64>(&c));

        let mut c = empty_like(a.nrows, a.ncols, oc);
        Context::default().ewise_mult(&mut c, None, None, &plus_i64(), &am, &bm, &d).unwrap();
        let intersection: BTreeSet<_> = pa.intersection(&pb).copied().collect();
        prop_assert_eq!(pattern(&c), intersection);
        prop_assert!(c.check().is_ok());
        let mut sc = empty_like(a.nrows, a.ncols, oc);
        sliced().ewise_mult(&mut sc, None, None, &plus_i64(), &am, &bm, &d).unwrap();
        prop_assert_eq!(sorted_entries::<i64>(&sc), sorted_entries::<i64>(&c));
    }

    /// Gustavson, dot and heap products agree exactly, with or without a
    /// mask, on one task or many
    #[test]
    fn mxm_kernels_agree(
        (a, b, m) in arb_product(7),
        semiring in arb_semiring(),
        oa in arb_orientation(),
        ob in arb_orientation(),
        oc in arb_orientation(),
        use_mask in any::<bool>(),
        complement in any::<bool>(),
        structure in any::<bool>(),
    ) {
        let ctx = Context::default();
        let (am, bm, mm) = (a.build(oa), b.build(ob), m.build(oc.flip()));
        let mask = use_mask.then_some(&mm);
        let mut d = Descriptor::new();
        d.mask_complement = complement;
        d.mask_structure = structure;

        let mut results = Vec::new();
        for ctx in [&ctx, &sliced()] {
            for method in [AxbMethod::Gustavson, AxbMethod::Dot, AxbMethod::Heap, AxbMethod::Auto] {
                let mut c = empty_like(a.nrows, b.ncols, oc);
                ctx.mxm(&mut c, mask, None, &semiring, &am, &bm, &d.method(method)).unwrap();
                prop_assert!(c.check().is_ok());
                results.push(sorted_entries::<i64>(&c));
            }
        }
        for r in &results[1..] {
            prop_assert_eq!(r, &results[0]);
        }
    }

    /// The entries written through `<!M>` are exactly those of the unmasked
    /// result that `<M>` does not write
    #[test]
    fn mask_complement_duality(
        (a, m) in arb_sparse_pair(8),
        structure in any::<bool>(),
        oc in arb_orientation(),
    ) {
        let ctx = Context::default();
        let am = a.build(oc);
        let mm = m.build(oc.flip());
        let identity = UnaryOp::builtin(UnaryOpcode::Identity, DType::I64).unwrap();

        let run = |mask: Option<&Matrix>, complement: bool| {
            let mut d = Descriptor::new().replace();
            d.mask_complement = complement;
            d.mask_structure = structure;
            let mut c = empty_like(a.nrows, a.ncols, oc);
            ctx.apply(&mut c, mask, None, &identity, &am, &d).unwrap();
            pattern(&c)
        };
        let selected = run(Some(&mm), false);
        let rest = run(Some(&mm), true);
        let all = run(None, false);

        prop_assert!(selected.is_disjoint(&rest));
        let joined: BTreeSet<_> = selected.union(&rest).copied().collect();
        prop_assert_eq!(joined, all);
    }

    /// A second wait with no mutation in between changes nothing
    #[test]
    fn wait_is_idempotent(
        (a, mutations) in arb_sparse(8).prop_flat_map(|a| {
            let (nrows, ncols) = (a.nrows, a.ncols);
            (Just(a), arb_mutations(nrows, ncols))
        }),
        o in arb_orientation(),
    ) {
        let mut m = a.build(o);
        apply_mutations(&mut m, &mutations);

        m.wait().unwrap();
        prop_assert!(m.is_assembled());
        let snapshot = |m: &Matrix| {
            (m.extract_tuples_bytes().unwrap(), m.is_hypersparse(), m.npending(), m.nzombies())
        };
        let first = snapshot(&m);
        m.wait().unwrap();
        prop_assert_eq!(first, snapshot(&m));
        prop_assert!(m.check().is_ok());
    }

    /// Deleted entries stop counting at once and are gone after wait
    #[test]
    fn deleted_entries_are_excluded(
        a in arb_sparse(8),
        o in arb_orientation(),
        remove in prop::collection::vec(any::<bool>(), 64),
    ) {
        let mut m = a.build(o);
        let mut kept = BTreeSet::new();
        let mut removed = 0;
        for (k, &(r, c, _)) in a.entries.iter().enumerate() {
            if remove[k % remove.len()] {
                m.remove_element(r, c).unwrap();
                removed += 1;
            } else {
                kept.insert((r, c));
            }
        }
        prop_assert_eq!(m.nzombies(), removed);
        prop_assert!(m.check().is_ok());

        // an operation reads the matrix without its deleted entries
        let ctx = Context::default();
        let mut c = empty_like(a.nrows, a.ncols, o.flip());
        let identity = UnaryOp::builtin(UnaryOpcode::Identity, DType::I64).unwrap();
        ctx.apply(&mut c, None, None, &identity, &m, &Descriptor::new()).unwrap();
        prop_assert_eq!(pattern(&c), kept.clone());

        prop_assert_eq!(m.nvals().unwrap(), kept.len());
        m.wait().unwrap();
        prop_assert_eq!(m.nzombies(), 0);
        prop_assert_eq!(pattern(&m), kept);
    }

    /// Reducing an empty matrix gives the monoid identity
    #[test]
    fn empty_reduce_is_identity(
        opcode in prop::sample::select(vec![
            BinaryOpcode::Plus,
            BinaryOpcode::Times,
            BinaryOpcode::Min,
            BinaryOpcode::Max,
        ]),
        dtype in prop::sample::select(vec![
            DType::I8, DType::I16, DType::I32, DType::I64,
            DType::U8, DType::U16, DType::U32, DType::U64,
            DType::F32, DType::F64,
        ]),
        nrows in 0usize..6,
        ncols in 0usize..6,
    ) {
        let monoid = Monoid::builtin(opcode, dtype).unwrap();
        let a = Matrix::new(dtype, nrows, ncols).unwrap();
        let mut s = Scalar::zero(dtype);
        Context::default().reduce_to_scalar(&mut s, None, &monoid, &a).unwrap();
        prop_assert_eq!(s.as_bytes(), monoid.identity().as_bytes());
    }
}
