pub mod zip;

pub use crate::android::zip::{ApkEntry, ApkFile, ApkZipError, ApkZipResult};
