mod filter;
mod pose_cache;
mod skeleton;

pub use filter::*;
pub use pose_cache::*;
pub use skeleton::*;


#[cfg(test)]
mod skeleton_tests;
