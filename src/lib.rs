//! # dex-method-list
//!
//! Lists every method (and optionally field) referenced by Android dex images, one Java-like
//! signature per line.
//!
//! A source is either a bare dex image or an APK (ZIP) whose `*.dex` entries are read in archive
//! order. Each image's lines are sorted on their own; images and sources are concatenated in the
//! order given.
//!
//! # Examples
//!
//! ```
//!  use dex_method_list::dex::DexBuilder;
//!  use dex_method_list::{list, ListOptions, Source};
//!
//!  let image = DexBuilder::default()
//!      .method("Ljava/lang/Object;", "<init>", &[], "V")
//!      .method("LParams;", "test", &["Ljava/lang/String;", "I"], "V")
//!      .build();
//!
//!  let lines = list(&[Source::bytes("classes.dex", image)], &ListOptions::default()).unwrap();
//!  assert_eq!(lines, vec!["Params test(String, int)", "java.lang.Object <init>()"]);
//! ```
//!
pub mod android;
pub mod dex;
pub mod error;
pub mod inventory;
pub mod mapping;
#[cfg(test)]
mod tests;
pub mod types;

pub use crate::error::ListError;
pub use crate::inventory::{build, list, write_listing, Image, ListOptions, Members, Source};
pub use crate::mapping::{ApiMapping, MappingError};
pub use crate::types::{
    decode, format, render, DecodeError, FieldRecord, MethodRecord, TypeDescriptor,
};
