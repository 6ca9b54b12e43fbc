//! Either — a value that is one of two possibilities, with no bias toward
//! either side. Used by `Effect::from_either` to lift an existing computed
//! result into the effect algebra.

/// One of two possible values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Either<L, R> {
    /// The left case.
    Left(L),
    /// The right case.
    Right(R),
}

impl<L, R> Either<L, R> {
    /// True iff this is the `Left` case.
    pub fn is_left(&self) -> bool {
        matches!(self, Either::Left(_))
    }

    /// True iff this is the `Right` case.
    pub fn is_right(&self) -> bool {
        matches!(self, Either::Right(_))
    }

    /// Map the left case, leaving the right case untouched.
    pub fn map_left<L2>(self, f: impl FnOnce(L) -> L2) -> Either<L2, R> {
        match self {
            Either::Left(l) => Either::Left(f(l)),
            Either::Right(r) => Either::Right(r),
        }
    }

    /// Map the right case, leaving the left case untouched.
    pub fn map_right<R2>(self, f: impl FnOnce(R) -> R2) -> Either<L, R2> {
        match self {
            Either::Left(l) => Either::Left(l),
            Either::Right(r) => Either::Right(f(r)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_left_leaves_right_alone() {
        let e: Either<i32, &str> = Either::Right("x");
        assert_eq!(e.map_left(|n| n + 1), Either::Right("x"));
    }

    #[test]
    fn map_right_leaves_left_alone() {
        let e: Either<i32, &str> = Either::Left(1);
        assert_eq!(e.map_right(|s: &str| s.len()), Either::Left(1));
    }
}
