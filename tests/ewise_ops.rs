//! Integration tests for element-wise operations and the masked write
//!
//! Covers union and intersection patterns, operand orientations, masks,
//! accumulators and type handling through the public `Context` API.

mod common;

use common::{from_dense, from_entries, sorted_entries, to_dense};
use sparsegrb::prelude::*;

fn scenario_operands() -> (Matrix, Matrix) {
    let a = from_dense::<i32>(&[&[1, 0], &[0, 2]], Orientation::ByCol);
    let b = from_dense::<i32>(&[&[3, 4], &[0, 5]], Orientation::ByCol);
    (a, b)
}

fn plus_i32() -> BinaryOp {
    BinaryOp::builtin(BinaryOpcode::Plus, DType::I32).unwrap()
}

fn empty_i32(orientation: Orientation) -> Matrix {
    Matrix::new_with(DType::I32, 2, 2, &common::config_by(orientation)).unwrap()
}

#[test]
fn test_ewise_add_scenario() {
    let (a, b) = scenario_operands();
    let ctx = Context::default();
    let mut c = empty_i32(Orientation::ByCol);
    ctx.ewise_add(&mut c, None, None, &plus_i32(), &a, &b, &Descriptor::new())
        .unwrap();
    assert_eq!(to_dense::<i32>(&c), vec![vec![4, 4], vec![0, 7]]);
    assert_eq!(c.nvals().unwrap(), 3);
}

#[test]
fn test_ewise_mult_scenario() {
    let (a, b) = scenario_operands();
    let ctx = Context::default();
    let mut c = empty_i32(Orientation::ByCol);
    ctx.ewise_mult(&mut c, None, None, &plus_i32(), &a, &b, &Descriptor::new())
        .unwrap();
    assert_eq!(to_dense::<i32>(&c), vec![vec![3, 0], vec![0, 10]]);
    // only positions present in both operands
    assert_eq!(
        sorted_entries::<i32>(&c),
        vec![(0, 0, 3), (1, 1, 10)]
    );
}

#[test]
fn test_masked_accumulate_scenario() {
    let ctx = Context::default();
    let mask = from_dense::<bool>(&[&[true, false], &[false, true]], Orientation::ByCol);
    let t = from_dense::<i32>(&[&[9, 9], &[9, 9]], Orientation::ByCol);
    let identity = UnaryOp::builtin(UnaryOpcode::Identity, DType::I32).unwrap();

    // C with no entries
    let mut c = empty_i32(Orientation::ByCol);
    ctx.apply(&mut c, Some(&mask), Some(&plus_i32()), &identity, &t, &Descriptor::new())
        .unwrap();
    assert_eq!(to_dense::<i32>(&c), vec![vec![9, 0], vec![0, 9]]);
    assert_eq!(c.nvals().unwrap(), 2);

    // C holding explicit zeros keeps them outside the mask
    let all = [(0, 0, 0), (0, 1, 0), (1, 0, 0), (1, 1, 0)];
    let mut c = from_entries::<i32>(2, 2, &all, Orientation::ByCol);
    ctx.apply(&mut c, Some(&mask), Some(&plus_i32()), &identity, &t, &Descriptor::new())
        .unwrap();
    assert_eq!(
        sorted_entries::<i32>(&c),
        vec![(0, 0, 9), (0, 1, 0), (1, 0, 0), (1, 1, 9)]
    );
}

#[test]
fn test_mixed_orientations_agree() {
    let dense_a: &[&[i64]] = &[&[1, 0, 2], &[0, 0, 3], &[4, 5, 0]];
    let dense_b: &[&[i64]] = &[&[0, 7, 1], &[8, 0, 0], &[0, 0, 6]];
    let ctx = Context::default();
    let minus = BinaryOp::builtin(BinaryOpcode::Minus, DType::I64).unwrap();

    let mut expected = None;
    for oa in [Orientation::ByRow, Orientation::ByCol] {
        for ob in [Orientation::ByRow, Orientation::ByCol] {
            for oc in [Orientation::ByRow, Orientation::ByCol] {
                let a = from_dense(dense_a, oa);
                let b = from_dense(dense_b, ob);
                let mut c =
                    Matrix::new_with(DType::I64, 3, 3, &common::config_by(oc)).unwrap();
                ctx.ewise_add(&mut c, None, None, &minus, &a, &b, &Descriptor::new())
                    .unwrap();
                c.check().unwrap();
                assert_eq!(c.orientation(), oc);
                let got = sorted_entries::<i64>(&c);
                match &expected {
                    None => expected = Some(got),
                    Some(e) => assert_eq!(&got, e, "orientations {:?} {:?} {:?}", oa, ob, oc),
                }
            }
        }
    }
    // minus is applied where both are present; single entries are copied
    assert_eq!(
        expected.unwrap(),
        vec![
            (0, 0, 1),
            (0, 1, 7),
            (0, 2, 1),
            (1, 0, 8),
            (1, 2, 3),
            (2, 0, 4),
            (2, 1, 5),
            (2, 2, 6)
        ]
    );
}

#[test]
fn test_transposed_operand() {
    let a = from_entries::<f64>(2, 3, &[(0, 2, 1.5), (1, 0, 2.0)], Orientation::ByRow);
    let b = from_entries::<f64>(3, 2, &[(2, 0, 0.5), (1, 1, 4.0)], Orientation::ByRow);
    let times = BinaryOp::builtin(BinaryOpcode::Times, DType::F64).unwrap();
    let ctx = Context::default();
    let mut c = Matrix::new(DType::F64, 2, 3).unwrap();
    let d = Descriptor::new().transpose_b();
    ctx.ewise_mult(&mut c, None, None, &times, &a, &b, &d).unwrap();
    assert_eq!(sorted_entries::<f64>(&c), vec![(0, 2, 0.75)]);
}

#[test]
fn test_comparison_writes_into_numeric_output() {
    let a = from_entries::<i32>(1, 3, &[(0, 0, 1), (0, 1, 5)], Orientation::ByRow);
    let b = from_entries::<i32>(1, 3, &[(0, 0, 3), (0, 2, 2)], Orientation::ByRow);
    let lt = BinaryOp::builtin(BinaryOpcode::Lt, DType::I32).unwrap();
    let ctx = Context::default();

    let mut c = Matrix::new(DType::F32, 1, 3).unwrap();
    ctx.ewise_mult(&mut c, None, None, &lt, &a, &b, &Descriptor::new())
        .unwrap();
    assert_eq!(sorted_entries::<f32>(&c), vec![(0, 0, 1.0)]);

    let mut c = Matrix::new(DType::Bool, 1, 3).unwrap();
    ctx.ewise_mult(&mut c, None, None, &lt, &a, &b, &Descriptor::new())
        .unwrap();
    assert_eq!(sorted_entries::<bool>(&c), vec![(0, 0, true)]);
}

#[test]
fn test_mask_replace_and_complement() {
    let (a, b) = scenario_operands();
    let mask = from_entries::<bool>(2, 2, &[(0, 1, true), (1, 1, false)], Orientation::ByRow);
    let ctx = Context::default();
    let plus = plus_i32();

    // a false mask value blocks the write unless the mask is structural
    let mut c = from_entries::<i32>(2, 2, &[(1, 0, 100)], Orientation::ByRow);
    ctx.ewise_add(&mut c, Some(&mask), None, &plus, &a, &b, &Descriptor::new())
        .unwrap();
    assert_eq!(sorted_entries::<i32>(&c), vec![(0, 1, 4), (1, 0, 100)]);

    let mut c = from_entries::<i32>(2, 2, &[(1, 0, 100)], Orientation::ByRow);
    let d = Descriptor::new().structure();
    ctx.ewise_add(&mut c, Some(&mask), None, &plus, &a, &b, &d).unwrap();
    assert_eq!(
        sorted_entries::<i32>(&c),
        vec![(0, 1, 4), (1, 0, 100), (1, 1, 7)]
    );

    // replace drops C entries outside the mask
    let mut c = from_entries::<i32>(2, 2, &[(1, 0, 100)], Orientation::ByRow);
    let d = Descriptor::new().replace();
    ctx.ewise_add(&mut c, Some(&mask), None, &plus, &a, &b, &d).unwrap();
    assert_eq!(sorted_entries::<i32>(&c), vec![(0, 1, 4)]);

    // the complement writes everywhere else
    let mut c = from_entries::<i32>(2, 2, &[(1, 0, 100)], Orientation::ByRow);
    let d = Descriptor::new().complement();
    ctx.ewise_add(&mut c, Some(&mask), None, &plus, &a, &b, &d).unwrap();
    assert_eq!(
        sorted_entries::<i32>(&c),
        vec![(0, 0, 4), (1, 0, 100), (1, 1, 7)]
    );
}

#[test]
fn test_mask_may_be_an_operand() {
    let (a, b) = scenario_operands();
    let ctx = Context::default();
    let mut c = empty_i32(Orientation::ByCol);
    ctx.ewise_add(&mut c, Some(&a), None, &plus_i32(), &a, &b, &Descriptor::new())
        .unwrap();
    assert_eq!(sorted_entries::<i32>(&c), vec![(0, 0, 4), (1, 1, 7)]);
}

#[test]
fn test_pending_operands_are_assembled() {
    let ctx = Context::default();
    let mut a = Matrix::new(DType::I32, 2, 2).unwrap();
    a.set_element(0, 0, 1i32).unwrap();
    a.set_element(1, 1, 2i32).unwrap();
    assert_eq!(a.npending(), 2);
    let b = from_entries::<i32>(2, 2, &[(0, 0, 10)], Orientation::ByRow);

    let mut c = Matrix::new(DType::I32, 2, 2).unwrap();
    ctx.ewise_mult(&mut c, None, None, &plus_i32(), &a, &b, &Descriptor::new())
        .unwrap();
    assert_eq!(sorted_entries::<i32>(&c), vec![(0, 0, 11)]);
    assert!(a.is_assembled());
}

#[test]
fn test_errors_leave_output_unchanged() {
    let ctx = Context::default();
    let a = from_entries::<i32>(2, 3, &[(0, 0, 1)], Orientation::ByRow);
    let b = from_entries::<i32>(2, 2, &[(0, 0, 1)], Orientation::ByRow);
    let mut c = from_entries::<i32>(2, 2, &[(1, 1, 42)], Orientation::ByRow);

    let err = ctx
        .ewise_add(&mut c, None, None, &plus_i32(), &a, &b, &Descriptor::new())
        .unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { .. }));
    assert_eq!(sorted_entries::<i32>(&c), vec![(1, 1, 42)]);

    let u = DType::Udt(UserType::new("blob", 8));
    let mut cu = Matrix::new(u, 2, 2).unwrap();
    let err = ctx
        .ewise_add(&mut cu, None, None, &plus_i32(), &b, &b, &Descriptor::new())
        .unwrap_err();
    assert!(matches!(err, Error::DomainMismatch { .. }));
    assert_eq!(cu.nvals().unwrap(), 0);
}

#[test]
fn test_user_type_operator() {
    struct Interval {
        lo: i32,
        hi: i32,
    }

    fn encode(v: Interval) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[..4].copy_from_slice(&v.lo.to_le_bytes());
        out[4..].copy_from_slice(&v.hi.to_le_bytes());
        out
    }

    fn decode(b: &[u8]) -> Interval {
        Interval {
            lo: i32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            hi: i32::from_le_bytes([b[4], b[5], b[6], b[7]]),
        }
    }

    let u = DType::Udt(UserType::new("interval", 8));
    let hull = BinaryOp::new_user("hull", u, u, u, |z: &mut [u8], x: &[u8], y: &[u8]| {
        let (x, y) = (decode(x), decode(y));
        let h = Interval {
            lo: x.lo.min(y.lo),
            hi: x.hi.max(y.hi),
        };
        z.copy_from_slice(&encode(h));
    });

    let mut a = Matrix::new(u, 1, 2).unwrap();
    let mut bytes = encode(Interval { lo: 1, hi: 3 }).to_vec();
    bytes.extend_from_slice(&encode(Interval { lo: 0, hi: 0 }));
    a.build_bytes(&[0, 0], &[0, 1], &bytes, u, None).unwrap();

    let mut b = Matrix::new(u, 1, 2).unwrap();
    b.build_bytes(&[0], &[0], &encode(Interval { lo: -2, hi: 2 }), u, None)
        .unwrap();

    let ctx = Context::default();
    let mut c = Matrix::new(u, 1, 2).unwrap();
    ctx.ewise_add(&mut c, None, None, &hull, &a, &b, &Descriptor::new())
        .unwrap();
    let (_, cols, x) = c.extract_tuples_bytes().unwrap();
    assert_eq!(cols, vec![0, 1]);
    let first = decode(&x[..8]);
    assert_eq!((first.lo, first.hi), (-2, 3));
    let second = decode(&x[8..]);
    assert_eq!((second.lo, second.hi), (0, 0));
}

#[test]
fn test_hypersparse_operands_of_huge_dimension() {
    // 2^40 rows: only the occupied rows may cost memory or time
    let n = 1usize << 40;
    let ctx = Context::new(Config::new().with_nthreads(4).with_chunk(1));
    let plus = BinaryOp::builtin(BinaryOpcode::Plus, DType::I64).unwrap();
    let a = from_entries::<i64>(n, 2, &[(3, 1, 1), (n - 1, 0, 5)], Orientation::ByRow);
    let b = from_entries::<i64>(n, 2, &[(12, 0, 4), (n - 1, 0, 2)], Orientation::ByRow);
    assert!(a.is_hypersparse() && b.is_hypersparse());
    // by column the same matrix has two short-listed vectors of length 2^40
    let b_col = from_entries::<i64>(n, 2, &[(12, 0, 4), (n - 1, 0, 2)], Orientation::ByCol);

    for b in [&b, &b_col] {
        for orientation in [Orientation::ByRow, Orientation::ByCol] {
            let cfg = common::config_by(orientation);
            let mut c = Matrix::new_with(DType::I64, n, 2, &cfg).unwrap();
            ctx.ewise_add(&mut c, None, None, &plus, &a, b, &Descriptor::new())
                .unwrap();
            c.check().unwrap();
            assert_eq!(
                sorted_entries::<i64>(&c),
                vec![(3, 1, 1), (12, 0, 4), (n - 1, 0, 7)]
            );

            let mut c = Matrix::new_with(DType::I64, n, 2, &cfg).unwrap();
            ctx.ewise_mult(&mut c, Some(&a), Some(&plus), &plus, &a, b, &Descriptor::new())
                .unwrap();
            assert_eq!(sorted_entries::<i64>(&c), vec![(n - 1, 0, 7)]);
        }
    }

    // masked write into a hypersparse output holding entries of its own
    let identity = UnaryOp::builtin(UnaryOpcode::Identity, DType::I64).unwrap();
    let mut c = from_entries::<i64>(n, 2, &[(7, 0, 9), (n - 1, 0, 1)], Orientation::ByRow);
    ctx.apply(&mut c, Some(&b), Some(&plus), &identity, &a, &Descriptor::new())
        .unwrap();
    assert!(c.is_hypersparse());
    assert_eq!(sorted_entries::<i64>(&c), vec![(7, 0, 9), (n - 1, 0, 6)]);

    let mut t = Matrix::new(DType::I64, 2, n).unwrap();
    ctx.transpose(&mut t, None, None, &a, &Descriptor::new()).unwrap();
    assert_eq!(sorted_entries::<i64>(&t), vec![(0, n - 1, 5), (1, 3, 1)]);
}
