pub mod dense;

#[cfg(feature = "faer")]
pub mod faer;

#[cfg(feature = "lapack")]
pub mod lapack;
