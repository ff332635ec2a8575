pub mod pcp;
pub mod svd;
mod utils;

pub use pcp::{Decomposition, DenseSVD, IterationProgress, RobustPca, RobustPcaBuilder, SVDImplementation};

#[cfg(feature = "faer")]
pub use pcp::FaerSVD;
#[cfg(feature = "lapack")]
pub use pcp::LapackSVD;
