//! Arithmetic on a genome treated as a ring of length `L`.
//!
//! Positions are 1-based and closed: every valid position lies in `[1, L]`.
//! An interval `(start, end)` with `start > end` wraps through position 1 and
//! stands for the union of `[start, L]` and `[1, end]`.
//!
//! All wraparound handling in the crate goes through these functions.

use num_traits::PrimInt;

use crate::error::{Error, Result};

#[inline]
fn check<T: PrimInt>(pos: T, genome_length: T) -> Result<()> {
    if pos < T::one() || pos > genome_length {
        return Err(Error::InvalidCoordinate {
            position: pos.to_i64().unwrap_or(i64::MAX),
            genome_length: genome_length.to_i64().unwrap_or(i64::MAX),
        });
    }
    Ok(())
}

/// Distance in bp travelling forward from `a` to `b`.
pub fn span<T: PrimInt>(a: T, b: T, genome_length: T) -> Result<T> {
    check(a, genome_length)?;
    check(b, genome_length)?;

    if b >= a {
        Ok(b - a)
    } else {
        Ok((genome_length - a) + b)
    }
}

/// Shortest distance between two positions on the ring.
pub fn distance<T: PrimInt>(a: T, b: T, genome_length: T) -> Result<T> {
    let forward = span(a, b, genome_length)?;
    let backward = span(b, a, genome_length)?;
    Ok(forward.min(backward))
}

/// Position halfway along the forward arc from `start` to `end`.
pub fn midpoint<T: PrimInt>(start: T, end: T, genome_length: T) -> Result<T> {
    let half = span(start, end, genome_length)? / (T::one() + T::one());
    // start + half can exceed L only when the arc wraps
    let room = genome_length - start;
    if half > room {
        Ok(half - room)
    } else {
        Ok(start + half)
    }
}

/// Splits a possibly wrapped interval into at most two linear pieces.
fn pieces<T: PrimInt>(interval: (T, T), genome_length: T) -> [Option<(T, T)>; 2] {
    let (start, end) = interval;
    if start <= end {
        [Some((start, end)), None]
    } else {
        [Some((start, genome_length)), Some((T::one(), end))]
    }
}

/// True when two possibly wrapped intervals share at least one position.
pub fn intervals_overlap<T: PrimInt>(i1: (T, T), i2: (T, T), genome_length: T) -> bool {
    let p1 = pieces(i1, genome_length);
    let p2 = pieces(i2, genome_length);

    for a in p1.iter().flatten() {
        for b in p2.iter().flatten() {
            if a.1 >= b.0 && b.1 >= a.0 {
                return true;
            }
        }
    }
    false
}
