use crate::dex::dex_file::{
    DexString, FieldItem, Header, MethodItem, PrototypeItem, StringId, TypeId, TypeList, DEX_FILE_MAGIC,
    ENDIAN_CONSTANT, HEADER_SIZE,
};
use crate::dex::{write_u2, write_u4};
use std::collections::HashMap;

use adler::adler32_slice;
use sha1::{Digest, Sha1};

const TYPE_HEADER_ITEM: u16 = 0x0000;
const TYPE_STRING_ID_ITEM: u16 = 0x0001;
const TYPE_TYPE_ID_ITEM: u16 = 0x0002;
const TYPE_PROTO_ID_ITEM: u16 = 0x0003;
const TYPE_FIELD_ID_ITEM: u16 = 0x0004;
const TYPE_METHOD_ID_ITEM: u16 = 0x0005;
const TYPE_MAP_LIST: u16 = 0x1000;
const TYPE_TYPE_LIST: u16 = 0x1001;
const TYPE_STRING_DATA_ITEM: u16 = 0x2002;

/// Assembles a minimal dex image holding only member references: header, string/type/proto/field/
/// method id tables, string data, parameter type lists and the map list.
///
/// Descriptors are taken verbatim and never validated, so an image can carry malformed types on
/// purpose. Field and method ids are emitted in the order they were declared rather than the canonical
/// sorted order, which keeps the reader's natural order under the caller's control.
///
/// # Examples
///
/// ```
/// use dex_method_list::dex::{DexBuilder, DexFile};
///
/// let bytes = DexBuilder::new()
///     .method("LParams;", "test", &["Ljava/lang/String;"], "V")
///     .build();
/// let dex = DexFile::from_bytes(&bytes).unwrap();
/// assert_eq!(dex.method_ids().len(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct DexBuilder {
    strings: Vec<String>,
    string_index: HashMap<String, StringId>,
    types: Vec<StringId>,
    type_index: HashMap<String, TypeId>,
    prototypes: Vec<PrototypeItem>,
    proto_index: HashMap<(TypeId, Vec<TypeId>), usize>,
    fields: Vec<FieldItem>,
    methods: Vec<MethodItem>,
}

#[derive(Debug)]
struct MapItem {
    type_code: u16,
    size: u32,
    offset: u32,
}

impl MapItem {
    fn new(type_code: u16, size: u32, offset: u32) -> Self {
        MapItem {
            type_code,
            size,
            offset,
        }
    }
}

impl DexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a method reference `class->name(params)return_type` using raw type descriptors.
    pub fn method(mut self, class: &str, name: &str, params: &[&str], return_type: &str) -> Self {
        let class_idx = self.intern_type(class);
        let name_idx = self.intern_string(name);
        let proto_idx = self.intern_proto(params, return_type);
        self.methods.push(MethodItem {
            class_idx,
            proto_idx,
            name_idx,
        });
        self
    }

    /// Declares a field reference `class->name:field_type`.
    pub fn field(mut self, class: &str, name: &str, field_type: &str) -> Self {
        let class_idx = self.intern_type(class);
        let type_idx = self.intern_type(field_type);
        let name_idx = self.intern_string(name);
        self.fields.push(FieldItem {
            class_idx,
            type_idx,
            name_idx,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut cursor = HEADER_SIZE;
        let string_ids = section(&mut cursor, self.strings.len(), 4);
        let type_ids = section(&mut cursor, self.types.len(), 4);
        let proto_ids = section(&mut cursor, self.prototypes.len(), 12);
        let field_ids = section(&mut cursor, self.fields.len(), 8);
        let method_ids = section(&mut cursor, self.methods.len(), 8);
        let data_off = cursor;

        // Parameter lists first (4-byte aligned), then string data, then the map list.
        let mut data = Vec::new();
        let mut parameter_offsets = Vec::with_capacity(self.prototypes.len());
        let mut type_list_count = 0;
        let mut type_list_off = 0;
        for proto in &self.prototypes {
            if proto.parameters.0.is_empty() {
                parameter_offsets.push(0);
                continue;
            }
            align(&mut data, 4);
            let offset = data_off + data.len() as u32;
            if type_list_count == 0 {
                type_list_off = offset;
            }
            type_list_count += 1;
            parameter_offsets.push(offset);
            proto.parameters.write(&mut data);
        }

        let string_data_off = data_off + data.len() as u32;
        let mut string_offsets = Vec::with_capacity(self.strings.len());
        for s in &self.strings {
            string_offsets.push(data_off + data.len() as u32);
            DexString::from_string(s).write(&mut data);
        }

        align(&mut data, 4);
        let map_off = data_off + data.len() as u32;
        let mut map_items = vec![MapItem::new(TYPE_HEADER_ITEM, 1, 0)];
        for (type_code, (size, offset)) in [
            (TYPE_STRING_ID_ITEM, string_ids),
            (TYPE_TYPE_ID_ITEM, type_ids),
            (TYPE_PROTO_ID_ITEM, proto_ids),
            (TYPE_FIELD_ID_ITEM, field_ids),
            (TYPE_METHOD_ID_ITEM, method_ids),
            (TYPE_TYPE_LIST, (type_list_count, type_list_off)),
            (TYPE_STRING_DATA_ITEM, (self.strings.len() as u32, string_data_off)),
        ] {
            if size > 0 {
                map_items.push(MapItem::new(type_code, size, offset));
            }
        }
        map_items.push(MapItem::new(TYPE_MAP_LIST, 1, map_off));
        data.extend_from_slice(&write_map_list(&map_items));

        let mut file = vec![0u8; HEADER_SIZE as usize];
        for offset in &string_offsets {
            write_u4(&mut file, *offset);
        }
        for string_idx in &self.types {
            write_u4(&mut file, *string_idx as u32);
        }
        for (proto, parameters_off) in self.prototypes.iter().zip(&parameter_offsets) {
            proto.write(&mut file, *parameters_off);
        }
        for field in &self.fields {
            field.write(&mut file);
        }
        for method in &self.methods {
            method.write(&mut file);
        }
        debug_assert_eq!(file.len() as u32, data_off);
        let data_size = data.len() as u32;
        file.extend_from_slice(&data);

        let mut header = Header {
            magic: DEX_FILE_MAGIC,
            checksum: 0,
            signature: [0; 20],
            file_size: file.len() as u32,
            header_size: HEADER_SIZE,
            endian_tag: ENDIAN_CONSTANT,
            link_size: 0,
            link_off: 0,
            map_off,
            string_ids_size: string_ids.0,
            string_ids_off: string_ids.1,
            type_ids_size: type_ids.0,
            type_ids_off: type_ids.1,
            proto_ids_size: proto_ids.0,
            proto_ids_off: proto_ids.1,
            field_ids_size: field_ids.0,
            field_ids_off: field_ids.1,
            method_ids_size: method_ids.0,
            method_ids_off: method_ids.1,
            class_defs_size: 0,
            class_defs_off: 0,
            data_size,
            data_off,
        };

        overwrite_header(&mut file, &header);
        let signature = compute_sha1(&file[32..]);
        header.signature.copy_from_slice(&signature);
        overwrite_header(&mut file, &header);
        header.checksum = adler32_slice(&file[12..]);
        overwrite_header(&mut file, &header);

        file
    }

    fn intern_string(&mut self, value: &str) -> StringId {
        if let Some(idx) = self.string_index.get(value) {
            return *idx;
        }
        let idx = self.strings.len();
        self.strings.push(value.to_string());
        self.string_index.insert(value.to_string(), idx);
        idx
    }

    fn intern_type(&mut self, descriptor: &str) -> TypeId {
        if let Some(idx) = self.type_index.get(descriptor) {
            return *idx;
        }
        let string_idx = self.intern_string(descriptor);
        let idx = self.types.len();
        self.types.push(string_idx);
        self.type_index.insert(descriptor.to_string(), idx);
        idx
    }

    fn intern_proto(&mut self, params: &[&str], return_type: &str) -> usize {
        let return_type_idx = self.intern_type(return_type);
        let parameters: Vec<TypeId> = params.iter().map(|p| self.intern_type(p)).collect();
        let key = (return_type_idx, parameters);
        if let Some(idx) = self.proto_index.get(&key) {
            return *idx;
        }

        let mut shorty = String::with_capacity(params.len() + 1);
        shorty.push(shorty_char(return_type));
        shorty.extend(params.iter().map(|p| shorty_char(p)));
        let shorty_idx = self.intern_string(&shorty);

        let idx = self.prototypes.len();
        self.prototypes.push(PrototypeItem {
            shorty_idx,
            return_type_idx,
            parameters: TypeList(key.1.clone()),
        });
        self.proto_index.insert(key, idx);
        idx
    }
}

// Returns (count, offset) and advances the cursor; empty sections have offset 0.
fn section(cursor: &mut u32, count: usize, item_size: u32) -> (u32, u32) {
    if count == 0 {
        return (0, 0);
    }
    let offset = *cursor;
    *cursor += count as u32 * item_size;
    (count as u32, offset)
}

fn shorty_char(descriptor: &str) -> char {
    match descriptor.chars().next() {
        Some('L') | Some('[') => 'L',
        Some(c) => c,
        None => 'V',
    }
}

fn align(buf: &mut Vec<u8>, alignment: usize) {
    while buf.len() % alignment != 0 {
        buf.push(0);
    }
}

fn write_map_list(entries: &[MapItem]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(4 + entries.len() * 12);
    write_u4(&mut bytes, entries.len() as u32);
    for item in entries {
        write_u2(&mut bytes, item.type_code);
        write_u2(&mut bytes, 0);
        write_u4(&mut bytes, item.size);
        write_u4(&mut bytes, item.offset);
    }
    bytes
}

fn overwrite_header(buf: &mut [u8], header: &Header) {
    let mut header_bytes = Vec::with_capacity(HEADER_SIZE as usize);
    header.write(&mut header_bytes);
    buf[..HEADER_SIZE as usize].copy_from_slice(&header_bytes);
}

fn compute_sha1(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::DexFile;

    #[test]
    fn interns_shared_strings_types_and_prototypes() {
        let builder = DexBuilder::new()
            .method("LTypes;", "test", &["I"], "V")
            .method("LTypes;", "other", &["I"], "V")
            .method("LTypes;", "<init>", &[], "V");
        assert_eq!(builder.methods.len(), 3);
        // LTypes;, V, I
        assert_eq!(builder.types.len(), 3);
        assert_eq!(builder.prototypes.len(), 2);
        // "LTypes;", "test", "V", "I", "VI", "other", "<init>"
        assert_eq!(builder.strings.len(), 7);
    }

    #[test]
    fn shorty_descriptors() {
        assert_eq!(shorty_char("[I"), 'L');
        assert_eq!(shorty_char("Ljava/lang/String;"), 'L');
        assert_eq!(shorty_char("J"), 'J');
    }

    #[test]
    fn map_list_and_signature_are_consistent() {
        let bytes = DexBuilder::new()
            .method("LParams;", "test", &["Ljava/lang/String;", "[[J"], "Z")
            .build();
        let dex = DexFile::from_bytes(&bytes).unwrap();
        let header = &dex.header;

        assert_eq!(header.file_size as usize, bytes.len());
        assert_eq!(header.data_off + header.data_size, header.file_size);
        assert_eq!(header.map_off % 4, 0);
        assert_eq!(compute_sha1(&bytes[32..]), header.signature);
        assert_eq!(adler32_slice(&bytes[12..]), header.checksum);

        let mut ix = header.map_off as usize;
        let entries = crate::dex::read_u4(&bytes, &mut ix).unwrap();
        // header, string ids, type ids, proto ids, method ids, type list, string data, map
        assert_eq!(entries, 8);
    }

    #[test]
    fn field_ids_sit_between_protos_and_methods() {
        let bytes = DexBuilder::new()
            .method("LOuter;", "run", &[], "V")
            .field("LOuter;", "this$0", "LOuter;")
            .field("LOuter;", "count", "I")
            .build();
        let dex = DexFile::from_bytes(&bytes).unwrap();
        let header = &dex.header;

        assert_eq!(header.field_ids_size, 2);
        assert_eq!(header.field_ids_off, header.proto_ids_off + 12);
        assert_eq!(header.method_ids_off, header.field_ids_off + 2 * 8);
        let names: Vec<&str> = dex
            .field_ids()
            .iter()
            .map(|f| dex.string(f.name_idx).unwrap())
            .collect();
        assert_eq!(names, vec!["this$0", "count"]);

        let mut ix = header.map_off as usize;
        let entries = crate::dex::read_u4(&bytes, &mut ix).unwrap();
        // header, string ids, type ids, proto ids, field ids, method ids, string data, map
        assert_eq!(entries, 8);
    }

    #[test]
    fn empty_image_has_no_sections() {
        let bytes = DexBuilder::new().build();
        let dex = DexFile::from_bytes(&bytes).unwrap();
        assert!(dex.method_ids().is_empty());
        assert_eq!(dex.header.string_ids_off, 0);
        assert_eq!(dex.header.method_ids_off, 0);
    }
}
