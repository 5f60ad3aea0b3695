//! Turns sources into signature listings.
//!
//! Each dex image is listed on its own and sorted on its own; images and sources are then
//! concatenated in the order they were given. Nothing is sorted or merged across images, so the
//! listing for `[a.dex, b.dex]` is always `a`'s block followed by `b`'s block.

use crate::android::ApkFile;
use crate::dex::{is_dex, DexFile};
use crate::error::{ListError, ReadError};
use crate::mapping::ApiMapping;
use crate::types::{FieldRecord, MethodRecord, TypeDescriptor};
use log::{debug, info};
use std::borrow::Cow;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

/// Which member references end up in the listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Members {
    #[default]
    Methods,
    Fields,
    All,
}

impl Members {
    pub fn methods(self) -> bool {
        self != Members::Fields
    }

    pub fn fields(self) -> bool {
        self != Members::Methods
    }
}

/// Switches shared by every image of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Drop the counters of synthetic names (`access$000` -> `access`,
    /// `Foo$$Lambda$3` -> `Foo$$Lambda`).
    pub hide_synthetic_numbers: bool,
    pub members: Members,
    /// Restores original names before rendering.
    pub mapping: Option<ApiMapping>,
}

/// The member references of one dex image, in the image's own table order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub name: String,
    pub methods: Vec<MethodRecord>,
    pub fields: Vec<FieldRecord>,
}

impl Image {
    pub fn new(name: impl Into<String>, methods: Vec<MethodRecord>, fields: Vec<FieldRecord>) -> Self {
        Image {
            name: name.into(),
            methods,
            fields,
        }
    }
}

/// One input of a run: a bare dex image or an APK/ZIP holding dex entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Path(PathBuf),
    Bytes { name: String, data: Vec<u8> },
    Stdin,
}

impl Source {
    pub fn bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Source::Bytes {
            name: name.into(),
            data,
        }
    }

    /// Name used in diagnostics.
    pub fn name(&self) -> String {
        match self {
            Source::Path(path) => path.display().to_string(),
            Source::Bytes { name, .. } => name.clone(),
            Source::Stdin => "<stdin>".to_string(),
        }
    }

    fn read(&self) -> Result<Cow<'_, [u8]>, ListError> {
        let input_error = |error| ListError::Input {
            source: self.name(),
            error,
        };
        match self {
            Source::Path(path) => fs::read(path).map(Cow::Owned).map_err(input_error),
            Source::Bytes { data, .. } => Ok(Cow::Borrowed(data.as_slice())),
            Source::Stdin => {
                let mut data = Vec::new();
                io::stdin()
                    .lock()
                    .read_to_end(&mut data)
                    .map_err(input_error)?;
                Ok(Cow::Owned(data))
            }
        }
    }

    /// Resolves the source into its dex images: one for a bare image, every `*.dex` entry in
    /// archive order for an APK. Only the references `members` asks for are decoded.
    pub fn images(&self, members: Members) -> Result<Vec<Image>, ListError> {
        let source = self.name();
        let bytes = self.read()?;

        if is_dex(&bytes) {
            debug!("{source}: bare dex image, {} bytes", bytes.len());
            return Ok(vec![read_image(&source, &source, &bytes, members)?]);
        }

        let apk = ApkFile::from_bytes(&bytes).map_err(|e| ListError::Read {
            source: source.clone(),
            image: None,
            error: ReadError::Archive(e),
        })?;
        let images = apk
            .dex_entries()
            .map(|entry| read_image(&source, &entry.name, &entry.data, members))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "{source}: archive with {} entries, {} dex images",
            apk.entry_count(),
            images.len()
        );
        Ok(images)
    }
}

fn read_image(
    source: &str,
    image: &str,
    bytes: &[u8],
    members: Members,
) -> Result<Image, ListError> {
    let read_error = |error| ListError::Read {
        source: source.to_string(),
        image: Some(image.to_string()),
        error: ReadError::Image(error),
    };
    let dex = DexFile::from_bytes(bytes).map_err(read_error)?;

    // Type ids are shared by many member ids; decode each at most once.
    let mut decoded: Vec<Option<TypeDescriptor>> = vec![None; dex.types.len()];
    let mut descriptor = |type_idx: usize| -> Result<TypeDescriptor, ListError> {
        if let Some(Some(t)) = decoded.get(type_idx) {
            return Ok(t.clone());
        }
        let token = dex.type_name(type_idx).map_err(read_error)?;
        let t = TypeDescriptor::decode(token).map_err(|error| ListError::Decode {
            source: source.to_string(),
            image: image.to_string(),
            error,
        })?;
        decoded[type_idx] = Some(t.clone());
        Ok(t)
    };

    let mut methods = Vec::new();
    if members.methods() {
        methods.reserve(dex.method_ids().len());
        for method in dex.method_ids() {
            let declaring_type = descriptor(method.class_idx)?;
            let name = dex.string(method.name_idx).map_err(read_error)?.to_string();
            let parameter_types = dex
                .parameter_types(method.proto_idx)
                .map_err(read_error)?
                .iter()
                .map(|t| descriptor(*t))
                .collect::<Result<Vec<_>, _>>()?;
            let return_type = descriptor(dex.return_type(method.proto_idx).map_err(read_error)?)?;
            methods.push(MethodRecord {
                declaring_type,
                name,
                parameter_types,
                return_type,
            });
        }
    }

    let mut fields = Vec::new();
    if members.fields() {
        fields.reserve(dex.field_ids().len());
        for field in dex.field_ids() {
            fields.push(FieldRecord {
                declaring_type: descriptor(field.class_idx)?,
                name: dex.string(field.name_idx).map_err(read_error)?.to_string(),
                field_type: descriptor(field.type_idx)?,
            });
        }
    }
    Ok(Image::new(image, methods, fields))
}

/// Formats the selected references of one image and sorts the lines by code point. Names are
/// mapped back first when a mapping is set. Duplicates are kept.
pub fn build(image: &Image, options: &ListOptions) -> Vec<String> {
    let hide = options.hide_synthetic_numbers;
    let mapping = options.mapping.as_ref();
    let mut lines = Vec::new();
    if options.members.methods() {
        lines.extend(image.methods.iter().map(|m| match mapping {
            Some(mapping) => mapping.map_method(m).render(hide),
            None => m.render(hide),
        }));
    }
    if options.members.fields() {
        lines.extend(image.fields.iter().map(|f| match mapping {
            Some(mapping) => mapping.map_field(f).render(hide),
            None => f.render(hide),
        }));
    }
    lines.sort();
    lines
}

fn source_lines(source: &Source, options: &ListOptions) -> Result<Vec<String>, ListError> {
    let mut lines = Vec::new();
    for image in source.images(options.members)? {
        let block = build(&image, options);
        debug!("{}: {} lines", image.name, block.len());
        lines.extend(block);
    }
    Ok(lines)
}

/// Lists every source in order; each image's block is sorted, blocks are concatenated.
pub fn list(sources: &[Source], options: &ListOptions) -> Result<Vec<String>, ListError> {
    let mut lines = Vec::new();
    for source in sources {
        lines.extend(source_lines(source, options)?);
    }
    Ok(lines)
}

/// Like [`list`], but writes each source's lines to `out` (and flushes) as soon as that source
/// is resolved. A failing source stops the run; lines already written for earlier sources stay
/// written. Returns the number of lines written.
pub fn write_listing<W: Write>(
    sources: &[Source],
    options: &ListOptions,
    out: &mut W,
) -> Result<usize, ListError> {
    let mut written = 0;
    for source in sources {
        let lines = source_lines(source, options)?;
        for line in &lines {
            writeln!(out, "{line}").map_err(ListError::Output)?;
        }
        out.flush().map_err(ListError::Output)?;
        written += lines.len();
    }
    info!("listed {written} lines from {} sources", sources.len());
    Ok(written)
}
