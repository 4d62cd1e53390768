//! Unary apply and transpose

use super::{check_dims, check_mask, check_output, operand_view, quick_mask, write_output};
use crate::algebra::kernels::{typed_unary, Arith};
use crate::algebra::{BinaryOp, UnaryOp, UnaryOpcode};
use crate::config::{Config, Descriptor};
use crate::dtype::{cast_fn, DType};
use crate::error::{try_alloc, Error, Result};
use crate::sparse::Matrix;

fn apply_typed<T: Arith>(x: &[u8], opcode: UnaryOpcode) -> Option<Vec<u8>> {
    let f = typed_unary::<T>(opcode)?;
    let size = T::DTYPE.size_in_bytes();
    let mut z = x.to_vec();
    for v in z.chunks_exact_mut(size) {
        f(T::read(v)).write(v);
    }
    Some(z)
}

fn apply_builtin(x: &[u8], op: &UnaryOp) -> Result<Option<Vec<u8>>> {
    crate::dispatch_dtype!(op.xtype(), T => {
        Ok(apply_typed::<T>(x, op.opcode()))
    }, op.name())
}

/// `op` over values of `xtype`, cast to the operator's input type first
fn apply_values(x: &[u8], xtype: DType, op: &UnaryOp) -> Result<Vec<u8>> {
    if xtype == op.xtype() && op.xtype() == op.ztype() && op.opcode() != UnaryOpcode::User {
        if let Some(z) = apply_builtin(x, op).ok().flatten() {
            return Ok(z);
        }
        tracing::trace!(op = op.name(), "no typed apply, using the generic worker");
    }
    let cast = cast_fn(xtype, op.xtype()).map_err(|_| Error::domain(op.name(), xtype, op.xtype()))?;
    let (xsize, zsize) = (xtype.size_in_bytes(), op.ztype().size_in_bytes());
    let n = x.len() / xsize;
    let mut z = try_alloc(n * zsize, 0u8)?;
    let mut v = vec![0u8; op.xtype().size_in_bytes()];
    for (src, dst) in x.chunks_exact(xsize).zip(z.chunks_exact_mut(zsize)) {
        cast(&mut v, src);
        op.apply_bytes(dst, &v);
    }
    Ok(z)
}

/// `C<M> = accum(C, op(A))`, with `A` optionally transposed
#[allow(clippy::too_many_arguments)]
pub(crate) fn apply(
    c: &mut Matrix,
    mask: Option<&Matrix>,
    accum: Option<&BinaryOp>,
    op: &UnaryOp,
    a: &Matrix,
    desc: &Descriptor,
    config: &Config,
) -> Result<()> {
    let shape = c.shape();
    check_dims("apply", shape, a, desc.transpose_a)?;
    check_mask("apply", shape, mask, desc)?;
    if !crate::dtype::is_compatible(a.dtype(), op.xtype()) {
        return Err(Error::domain(op.name(), a.dtype(), op.xtype()));
    }
    check_output(c.dtype(), accum, op.ztype())?;
    if quick_mask(c, mask, desc)? {
        return Ok(());
    }

    let store = a.assembled()?;
    let av = operand_view(&store, desc.transpose_a);
    let z = apply_values(av.x, av.dtype, op)?;
    let t = av.with_values(&z, op.ztype());
    write_output(c, mask, accum, t, desc, config)
}

/// `C<M> = accum(C, Aᵀ)`; with `transpose_a` set the two transposes cancel
pub(crate) fn transpose(
    c: &mut Matrix,
    mask: Option<&Matrix>,
    accum: Option<&BinaryOp>,
    a: &Matrix,
    desc: &Descriptor,
    config: &Config,
) -> Result<()> {
    let shape = c.shape();
    let flip = !desc.transpose_a;
    check_dims("transpose", shape, a, flip)?;
    check_mask("transpose", shape, mask, desc)?;
    check_output(c.dtype(), accum, a.dtype())?;
    if quick_mask(c, mask, desc)? {
        return Ok(());
    }

    let store = a.assembled()?;
    write_output(c, mask, accum, operand_view(&store, flip), desc, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::BinaryOpcode;
    use crate::sparse::Orientation;

    fn entries<T: crate::dtype::Element + PartialOrd>(m: &Matrix) -> Vec<(usize, usize, T)> {
        let (r, c, v) = m.extract_tuples::<T>().unwrap();
        let mut out: Vec<_> = r.into_iter().zip(c).zip(v).map(|((r, c), v)| (r, c, v)).collect();
        out.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        out
    }

    #[test]
    fn test_apply_ainv_and_cast() {
        let a = Matrix::from_triplets(2, 2, &[0, 1], &[1, 0], &[3i32, -4]).unwrap();
        let ainv = UnaryOp::builtin(UnaryOpcode::Ainv, DType::I32).unwrap();
        let mut c = Matrix::new(DType::F64, 2, 2).unwrap();
        apply(&mut c, None, None, &ainv, &a, &Descriptor::new(), &Config::new()).unwrap();
        assert_eq!(entries::<f64>(&c), vec![(0, 1, -3.0), (1, 0, 4.0)]);
    }

    #[test]
    fn test_apply_generic_path_casts_input() {
        // u8 input through an i16 abs
        let a = Matrix::from_triplets(1, 2, &[0, 0], &[0, 1], &[200u8, 7]).unwrap();
        let abs = UnaryOp::builtin(UnaryOpcode::Abs, DType::I16).unwrap();
        let mut c = Matrix::new(DType::I16, 1, 2).unwrap();
        apply(&mut c, None, None, &abs, &a, &Descriptor::new(), &Config::new()).unwrap();
        assert_eq!(entries::<i16>(&c), vec![(0, 0, 200), (0, 1, 7)]);
    }

    #[test]
    fn test_apply_transposed_with_accum() {
        let a = Matrix::from_triplets(2, 3, &[0], &[2], &[5i64]).unwrap();
        let one = UnaryOp::builtin(UnaryOpcode::One, DType::I64).unwrap();
        let plus = BinaryOp::builtin(BinaryOpcode::Plus, DType::I64).unwrap();
        let mut c = Matrix::from_triplets(3, 2, &[2], &[0], &[10i64]).unwrap();
        let d = Descriptor::new().transpose_a();
        apply(&mut c, None, Some(&plus), &one, &a, &d, &Config::new()).unwrap();
        assert_eq!(entries::<i64>(&c), vec![(2, 0, 11)]);
    }

    #[test]
    fn test_transpose_into_other_orientation() {
        let a = Matrix::from_triplets(2, 3, &[0, 1, 1], &[2, 0, 1], &[1u16, 2, 3]).unwrap();
        let cfg = Config::new().with_orientation(Orientation::ByCol);
        let mut c = Matrix::new_with(DType::U16, 3, 2, &cfg).unwrap();
        transpose(&mut c, None, None, &a, &Descriptor::new(), &Config::new()).unwrap();
        assert_eq!(entries::<u16>(&c), vec![(0, 1, 2), (1, 1, 3), (2, 0, 1)]);
        c.check().unwrap();

        // transposing a transpose is a copy
        let mut same = Matrix::new(DType::U16, 2, 3).unwrap();
        let d = Descriptor::new().transpose_a();
        transpose(&mut same, None, None, &a, &d, &Config::new()).unwrap();
        assert_eq!(entries::<u16>(&same), entries::<u16>(&a));
    }

    #[test]
    fn test_transpose_dimension_check() {
        let a = Matrix::new(DType::U16, 2, 3).unwrap();
        let mut c = Matrix::new(DType::U16, 2, 3).unwrap();
        assert!(matches!(
            transpose(&mut c, None, None, &a, &Descriptor::new(), &Config::new()),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
