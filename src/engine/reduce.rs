//! Reduction of all entries to a scalar

use super::slice::{run_each, slice_even};
use crate::algebra::kernels::{typed_binary, Arith};
use crate::algebra::{BinaryOp, BinaryOpcode, BoundBinary, Monoid};
use crate::config::Config;
use crate::dtype::{cast_fn, DType, Element, Scalar};
use crate::error::{Error, Result};
use crate::sparse::Matrix;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

/// Tasks per thread; many small tasks let the terminal early exit skip
/// more of the work
const TASKS_PER_THREAD: usize = 64;

fn task_ranges(n: usize, config: &Config) -> Vec<Range<usize>> {
    let nthreads = config.nthreads_for(n);
    let ntasks = if nthreads <= 1 {
        1
    } else {
        (TASKS_PER_THREAD * nthreads).min(n)
    };
    slice_even(n, ntasks)
}

/// Fold task partials in task order, starting from the first one
fn fold_partials<P>(partials: Vec<Option<P>>, mut f: impl FnMut(P, P) -> P) -> Option<P> {
    partials
        .into_iter()
        .flatten()
        .reduce(|acc, p| f(acc, p))
}

fn reduce_typed<T: Arith>(x: &[u8], monoid: &Monoid, config: &Config) -> Option<Scalar> {
    let f = typed_binary::<T>(monoid.op().opcode())?;
    let terminal = match monoid.terminal() {
        Some(t) => Some(t.get::<T>().ok()?),
        None => None,
    };
    let size = T::DTYPE.size_in_bytes();
    let n = x.len() / size;
    let done = AtomicBool::new(false);

    let partials = run_each(task_ranges(n, config), |range| {
        if done.load(Ordering::Relaxed) {
            return None;
        }
        let mut acc: Option<T> = None;
        for v in x[range.start * size..range.end * size]
            .chunks_exact(size)
            .map(T::read)
        {
            let next = match acc {
                Some(a) => f(a, v),
                None => v,
            };
            acc = Some(next);
            if terminal == Some(next) {
                done.store(true, Ordering::Relaxed);
                break;
            }
        }
        acc
    });
    let value = fold_partials(partials, f).unwrap_or_else(|| {
        monoid
            .identity()
            .get::<T>()
            .unwrap_or_else(|_| T::zero())
    });
    Some(Scalar::new(value))
}

fn reduce_builtin(x: &[u8], monoid: &Monoid, config: &Config) -> Result<Option<Scalar>> {
    crate::dispatch_dtype!(monoid.dtype(), T => {
        Ok(reduce_typed::<T>(x, monoid, config))
    }, "reduce")
}

/// Byte-level reduction of values of `xtype`, cast to the monoid type
fn reduce_generic(x: &[u8], xtype: DType, monoid: &Monoid, config: &Config) -> Result<Scalar> {
    let mtype = monoid.dtype();
    let cast = cast_fn(xtype, mtype).map_err(|_| Error::domain(monoid.op().name(), xtype, mtype))?;
    let (xsize, msize) = (xtype.size_in_bytes(), mtype.size_in_bytes());
    let n = x.len() / xsize;
    let add = monoid.op();
    let done = AtomicBool::new(false);

    let partials = run_each(task_ranges(n, config), |range| {
        if done.load(Ordering::Relaxed) {
            return None;
        }
        let mut acc: Option<Vec<u8>> = None;
        let mut v = vec![0u8; msize];
        let mut tmp = vec![0u8; msize];
        for src in x[range.start * xsize..range.end * xsize].chunks_exact(xsize) {
            cast(&mut v, src);
            match acc.as_mut() {
                Some(a) => {
                    tmp.copy_from_slice(a);
                    add.apply_bytes(a, &tmp, &v);
                }
                None => acc = Some(v.clone()),
            }
            if acc.as_deref().is_some_and(|a| monoid.is_terminal(a)) {
                done.store(true, Ordering::Relaxed);
                break;
            }
        }
        acc
    });
    let value = fold_partials(partials, |a, b| {
        let mut z = vec![0u8; msize];
        add.apply_bytes(&mut z, &a, &b);
        z
    });
    match value {
        Some(bytes) => Scalar::from_bytes(mtype, &bytes),
        None => Ok(monoid.identity().clone()),
    }
}

/// Reduce values of `xtype` with `monoid`; the identity if there are none
pub(crate) fn reduce_values(
    x: &[u8],
    xtype: DType,
    monoid: &Monoid,
    config: &Config,
) -> Result<Scalar> {
    if xtype == monoid.dtype() && monoid.op().opcode() != BinaryOpcode::User {
        if let Some(s) = reduce_builtin(x, monoid, config).ok().flatten() {
            return Ok(s);
        }
        tracing::trace!(
            monoid = monoid.op().name(),
            "no typed reduction, using the generic worker"
        );
    }
    reduce_generic(x, xtype, monoid, config)
}

/// `s = accum(s, ⊕ A)`, or `s = ⊕ A` without an accumulator
///
/// An empty matrix reduces to the monoid's identity.
pub(crate) fn reduce_to_scalar(
    s: &mut Scalar,
    accum: Option<&BinaryOp>,
    monoid: &Monoid,
    a: &Matrix,
    config: &Config,
) -> Result<()> {
    let mtype = monoid.dtype();
    if !crate::dtype::is_compatible(a.dtype(), mtype) {
        return Err(Error::domain(monoid.op().name(), a.dtype(), mtype));
    }
    let stype = s.dtype();
    let bound = accum
        .map(|op| BoundBinary::new(op, stype, mtype, stype))
        .transpose()?;
    if bound.is_none() && !crate::dtype::is_compatible(mtype, stype) {
        return Err(Error::domain("reduce", mtype, stype));
    }

    let store = a.assembled()?;
    let v = store.view();
    let r = reduce_values(v.x, v.dtype, monoid, config)?;
    drop(store);

    match bound {
        Some(bound) => {
            let old = s.clone();
            bound.apply(s.as_bytes_mut(), old.as_bytes(), r.as_bytes());
        }
        None => *s = r.cast(stype)?,
    }
    Ok(())
}

/// Reduce `a` with `monoid` and return the result as `T`
pub(crate) fn reduce_to<T: Element>(monoid: &Monoid, a: &Matrix, config: &Config) -> Result<T> {
    let mut s = Scalar::zero(T::DTYPE);
    reduce_to_scalar(&mut s, None, monoid, a, config)?;
    s.get::<T>()
}
