pub mod container;
pub mod error;
pub mod exif;
pub mod exif_writer;
pub mod file_ops;
pub mod fs_atomic;
pub mod hashing;
pub mod media;
pub mod naming;
pub mod reconcile;
pub mod report;
pub mod video;

#[cfg(test)]
mod test_support;
