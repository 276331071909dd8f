use num_traits::{Float, FromPrimitive, ToPrimitive};
use std::fmt::Debug;
use std::iter::Sum;

/// Trait for floating-point types used across the learners. Has all of the
/// common floating-point operations and traits.
pub trait ToyMlFloat:
    Float + FromPrimitive + ToPrimitive + Send + Sync + Sum + Debug + 'static
{
}

impl<T> ToyMlFloat for T where
    T: Float + FromPrimitive + ToPrimitive + Send + Sync + Sum + Debug + 'static
{
}
