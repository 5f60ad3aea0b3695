/* Dex file format structures needed to enumerate method references */

use crate::dex::error::DexError;
use crate::dex::{read_u1, read_u2, read_u4, read_uleb128, read_x, write_u1, write_u2, write_u4, write_uleb128, write_x};
use adler::adler32_slice;
use cesu8::to_java_cesu8;
use log::{debug, warn};

/* Constants */
pub const DEX_FILE_MAGIC: [u8; 8] = [ 0x64, 0x65, 0x78, 0x0a, 0x30, 0x33, 0x35, 0x00 ];
pub const ENDIAN_CONSTANT: u32 = 0x12345678;
pub const HEADER_SIZE: u32 = 0x70;


pub type StringId = usize;
pub type TypeId = usize;
pub type ProtoId = usize;

/// True when `bytes` starts with the `dex\n` magic, whatever the version digits.
pub fn is_dex(bytes: &[u8]) -> bool
{
    bytes.starts_with(&DEX_FILE_MAGIC[..4])
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeList(pub Vec<TypeId>);
impl TypeList
{
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<TypeList, DexError>
    {
        let size = read_u4(bytes, ix)? as usize;
        if size > bytes.len() / 2 { fail!("type_list size {} exceeds the image", size); }
        let mut v = Vec::with_capacity(size);
        for _ in 0..size { v.push(read_u2(bytes, ix)? as TypeId); }
        Ok(TypeList(v))
    }

    pub fn write(&self, bytes: &mut Vec<u8>) -> usize
    {
        let mut c = 0;
        c += write_u4(bytes, self.0.len() as u32);
        for i in &self.0 { c += write_u2(bytes, *i as u16); }
        c
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrototypeItem {
    // The proto_id_item struct
    pub shorty_idx: StringId,
    pub return_type_idx: TypeId,
    pub parameters: TypeList
}

impl PrototypeItem
{
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<PrototypeItem, DexError>
    {
        let shorty_idx = read_u4(bytes, ix)? as StringId;
        let return_type_idx = read_u4(bytes, ix)? as TypeId;
        let mut parameters_off = read_u4(bytes, ix)? as usize;
        let parameters = if parameters_off == 0 { TypeList(vec![]) }
            else { TypeList::read(bytes, &mut parameters_off)? };
        Ok(PrototypeItem { shorty_idx, return_type_idx, parameters })
    }

    /// Writes the fixed-size id entry; the parameter list lives in the data section at `parameters_off`.
    pub fn write(&self, bytes: &mut Vec<u8>, parameters_off: u32) -> usize
    {
        let mut c = 0;
        c += write_u4(bytes, self.shorty_idx as u32);
        c += write_u4(bytes, self.return_type_idx as u32);
        c += write_u4(bytes, parameters_off);
        c
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldItem {
    // The field_id_item struct
    pub class_idx: TypeId,
    pub type_idx: TypeId,
    pub name_idx: StringId
}

impl FieldItem
{
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<FieldItem, DexError>
    {
        Ok(FieldItem {
            class_idx: read_u2(bytes, ix)? as TypeId,
            type_idx: read_u2(bytes, ix)? as TypeId,
            name_idx: read_u4(bytes, ix)? as StringId,
        })
    }

    pub fn write(&self, bytes: &mut Vec<u8>) -> usize
    {
        let mut c = 0;
        c += write_u2(bytes, self.class_idx as u16);
        c += write_u2(bytes, self.type_idx as u16);
        c += write_u4(bytes, self.name_idx as u32);
        c
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodItem {
    // The method_id_item struct
    pub class_idx: TypeId,
    pub proto_idx: ProtoId,
    pub name_idx: StringId
}

impl MethodItem
{
    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<MethodItem, DexError>
    {
        Ok(MethodItem {
            class_idx: read_u2(bytes, ix)? as TypeId,
            proto_idx: read_u2(bytes, ix)? as ProtoId,
            name_idx: read_u4(bytes, ix)? as StringId,
        })
    }

    pub fn write(&self, bytes: &mut Vec<u8>) -> usize
    {
        let mut c = 0;
        c += write_u2(bytes, self.class_idx as u16);
        c += write_u2(bytes, self.proto_idx as u16);
        c += write_u4(bytes, self.name_idx as u32);
        c
    }
}


#[derive(Debug)]
pub struct DexFile {
    pub header: Header,
    pub strings: Vec<DexString>,
    pub types: Vec<StringId>,
    pub prototypes: Vec<PrototypeItem>,
    pub fields: Vec<FieldItem>,
    pub methods: Vec<MethodItem>,
}

impl DexFile {

    fn read(bytes: &[u8], ix: &mut usize) -> Result<DexFile, DexError>
    {
        let header = Header::read(bytes, ix)?;
        header.verify_checksum(bytes);

        let mut dex = DexFile {
            strings: Vec::with_capacity(bounded(header.string_ids_size, bytes.len(), 4)),
            types: Vec::with_capacity(bounded(header.type_ids_size, bytes.len(), 4)),
            prototypes: Vec::with_capacity(bounded(header.proto_ids_size, bytes.len(), 12)),
            fields: Vec::with_capacity(bounded(header.field_ids_size, bytes.len(), 8)),
            methods: Vec::with_capacity(bounded(header.method_ids_size, bytes.len(), 8)),
            header,
        };

        // Read the strings
        *ix = dex.header.string_ids_off as usize;
        for i in 0..dex.header.string_ids_size
        {
            let mut string_data_off = read_u4(bytes, ix)? as usize;
            let ds = DexString::read(bytes, &mut string_data_off)
                .map_err(|e| DexError::with_context(e, format!("string_id #{}", i)))?;
            dex.strings.push(ds);
        }

        // Read the type_ids
        *ix = dex.header.type_ids_off as usize;
        for i in 0..dex.header.type_ids_size
        {
            let descriptor_idx = read_u4(bytes, ix)? as StringId;
            if descriptor_idx >= dex.strings.len()
            {
                fail!(("string index {} out of range", descriptor_idx), ("type_id #{}", i));
            }
            dex.types.push(descriptor_idx);
        }

        // Read the prototypes
        *ix = dex.header.proto_ids_off as usize;
        for i in 0..dex.header.proto_ids_size
        {
            let p = PrototypeItem::read(bytes, ix)
                .map_err(|e| DexError::with_context(e, format!("proto_id #{}", i)))?;
            dex.prototypes.push(p);
        }

        // Read the field ids
        *ix = dex.header.field_ids_off as usize;
        for _ in 0..dex.header.field_ids_size
        {
            dex.fields.push(FieldItem::read(bytes, ix)?);
        }

        // Read the Methods ids
        *ix = dex.header.method_ids_off as usize;
        for _ in 0..dex.header.method_ids_size
        {
            dex.methods.push(MethodItem::read(bytes, ix)?);
        }

        debug!(
            "[dex] {} strings, {} types, {} prototypes, {} field ids, {} method ids",
            dex.strings.len(), dex.types.len(), dex.prototypes.len(), dex.fields.len(), dex.methods.len()
        );

        Ok(dex)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<DexFile, DexError>
    {
        let mut ix = 0;
        DexFile::read(bytes, &mut ix)
    }

    /// Method ids in table order.
    pub fn method_ids(&self) -> &[MethodItem]
    {
        &self.methods
    }

    /// Field ids in table order.
    pub fn field_ids(&self) -> &[FieldItem]
    {
        &self.fields
    }

    pub fn string(&self, id: StringId) -> Result<&str, DexError>
    {
        match self.strings.get(id)
        {
            Some(DexString::Decoded(s)) => Ok(s),
            Some(DexString::Raw(_, _)) => fail!("Invalid MUTF-8 data in string #{}", id),
            None => fail!("string index {} out of range", id),
        }
    }

    /// The descriptor text of a type id, e.g. `Ljava/lang/Object;`.
    pub fn type_name(&self, id: TypeId) -> Result<&str, DexError>
    {
        match self.types.get(id)
        {
            Some(string_id) => self.string(*string_id)
                .map_err(|e| DexError::with_context(e, format!("type_id #{}", id))),
            None => fail!("type index {} out of range", id),
        }
    }

    /// Ordered parameter type ids of a prototype.
    pub fn parameter_types(&self, id: ProtoId) -> Result<&[TypeId], DexError>
    {
        match self.prototypes.get(id)
        {
            Some(proto) => Ok(&proto.parameters.0),
            None => fail!("proto index {} out of range", id),
        }
    }

    pub fn return_type(&self, id: ProtoId) -> Result<TypeId, DexError>
    {
        match self.prototypes.get(id)
        {
            Some(proto) => Ok(proto.return_type_idx),
            None => fail!("proto index {} out of range", id),
        }
    }
}

// Cap pre-allocation by what the image could physically hold.
fn bounded(count: u32, len: usize, item_size: usize) -> usize
{
    (count as usize).min(len / item_size)
}


#[derive(Debug, PartialEq, Eq)]
pub struct Header {
    pub magic: [u8; 8],
    pub checksum: u32,
    pub signature: [u8; 20],
    pub file_size: u32,
    pub header_size: u32,
    pub endian_tag: u32,
    pub link_size: u32,
    pub link_off: u32,
    pub map_off: u32,
    pub string_ids_size: u32,
    pub string_ids_off: u32,
    pub type_ids_size: u32,
    pub type_ids_off: u32,
    pub proto_ids_size: u32,
    pub proto_ids_off: u32,
    pub field_ids_size: u32,
    pub field_ids_off: u32,
    pub method_ids_size: u32,
    pub method_ids_off: u32,
    pub class_defs_size: u32,
    pub class_defs_off: u32,
    pub data_size: u32,
    pub data_off: u32,
}

impl Header
{

    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<Header, DexError>
    {
        if bytes.len() < HEADER_SIZE as usize {
            return Err(DexError::new("Not enough bytes for header"));
        }

        let mut magic = [0u8; 8];
        magic.copy_from_slice(&read_x(bytes, ix, 8)?);
        if !is_dex(&magic) { return Err(DexError::new("Invalid magic value")); }
        let checksum = read_u4(bytes, ix)?;
        let mut signature = [0u8; 20];
        signature.copy_from_slice(&read_x(bytes, ix, 20)?);

        let header = Header {
            magic,
            checksum,
            signature,
            file_size: read_u4(bytes, ix)?,
            header_size: read_u4(bytes, ix)?,
            endian_tag: read_u4(bytes, ix)?,
            link_size: read_u4(bytes, ix)?,
            link_off: read_u4(bytes, ix)?,
            map_off: read_u4(bytes, ix)?,
            string_ids_size: read_u4(bytes, ix)?,
            string_ids_off: read_u4(bytes, ix)?,
            type_ids_size: read_u4(bytes, ix)?,
            type_ids_off: read_u4(bytes, ix)?,
            proto_ids_size: read_u4(bytes, ix)?,
            proto_ids_off: read_u4(bytes, ix)?,
            field_ids_size: read_u4(bytes, ix)?,
            field_ids_off: read_u4(bytes, ix)?,
            method_ids_size: read_u4(bytes, ix)?,
            method_ids_off: read_u4(bytes, ix)?,
            class_defs_size: read_u4(bytes, ix)?,
            class_defs_off: read_u4(bytes, ix)?,
            data_size: read_u4(bytes, ix)?,
            data_off: read_u4(bytes, ix)?,
        };

        if header.endian_tag != ENDIAN_CONSTANT {
            fail!("Unsupported endian tag 0x{:08x}", header.endian_tag);
        }
        Ok(header)
    }

    pub fn write(&self, bytes: &mut Vec<u8>) -> usize
    {
        let mut c = 0;
        c += write_x(bytes, &self.magic);
        c += write_u4(bytes, self.checksum);
        c += write_x(bytes, &self.signature);
        c += write_u4(bytes, self.file_size);
        c += write_u4(bytes, self.header_size);
        c += write_u4(bytes, self.endian_tag);
        c += write_u4(bytes, self.link_size);
        c += write_u4(bytes, self.link_off);
        c += write_u4(bytes, self.map_off);
        c += write_u4(bytes, self.string_ids_size);
        c += write_u4(bytes, self.string_ids_off);
        c += write_u4(bytes, self.type_ids_size);
        c += write_u4(bytes, self.type_ids_off);
        c += write_u4(bytes, self.proto_ids_size);
        c += write_u4(bytes, self.proto_ids_off);
        c += write_u4(bytes, self.field_ids_size);
        c += write_u4(bytes, self.field_ids_off);
        c += write_u4(bytes, self.method_ids_size);
        c += write_u4(bytes, self.method_ids_off);
        c += write_u4(bytes, self.class_defs_size);
        c += write_u4(bytes, self.class_defs_off);
        c += write_u4(bytes, self.data_size);
        c += write_u4(bytes, self.data_off);
        c
    }

    /// Logs a warning when the adler32 checksum does not cover the image. Listing only needs
    /// the id tables, so a stale checksum is not treated as an error.
    fn verify_checksum(&self, bytes: &[u8]) -> bool
    {
        let end = (self.file_size as usize).clamp(12, bytes.len());
        let computed = adler32_slice(&bytes[12..end]);
        if computed != self.checksum
        {
            warn!("[dex] checksum mismatch: header 0x{:08x}, computed 0x{:08x}", self.checksum, computed);
            return false;
        }
        true
    }
}


#[derive(Debug, Eq, PartialEq, Clone)]
pub enum DexString
{
    Decoded(String),
    Raw(u32, Vec<u8>),
}

impl DexString
{
    pub fn from_string(s: &str) -> DexString
    {
        DexString::Decoded(s.to_string())
    }

    pub fn read(bytes: &[u8], ix: &mut usize) -> Result<DexString, DexError>
    {
        let utf16_size = read_uleb128(bytes, ix)?;
        let mut v = vec![];

        loop
        {
            let u = read_u1(bytes, ix)?;
            if u != 0 { v.push(u); }
            else { break; }
        }

        Ok(match cesu8::from_java_cesu8(v.as_slice())
        {
            Ok(converted_str) => DexString::Decoded(converted_str.to_string()),
            _ => DexString::Raw(utf16_size, v)
        })
    }

    pub fn write(&self, bytes: &mut Vec<u8>) -> usize
    {
        let mut c = 0;

        match self
        {
            DexString::Raw(utf16_size, v) => {
                c += write_uleb128(bytes, *utf16_size);
                c += write_x(bytes, v);
                c += write_u1(bytes, 0);
            },

            DexString::Decoded(s) => {
                let encoded = to_java_cesu8(s);
                c += write_uleb128(bytes, s.encode_utf16().count() as u32);
                c += write_x(bytes, &encoded);
                c += write_u1(bytes, 0);
            }
        }
        c
    }
}
