// Serialization utilities for ledger data structures
//
// Writers append to a Vec<u8> and cannot fail. Readers report every short
// read or malformed field as CorruptEncoding.

use crate::core::Hash256;
use crate::error::{LedgerError, Result};
use std::io::{Cursor, Read};

/// Upper bound for any length prefix, so a corrupt count cannot trigger a huge allocation
const MAX_VAR_LEN: u64 = 32 * 1024 * 1024;

/// Trait for serializable types
pub trait Serializable: Sized {
    fn encode_into(&self, buf: &mut Vec<u8>);
    fn decode_from(reader: &mut Cursor<&[u8]>) -> Result<Self>;

    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_into(&mut buf);
        buf
    }

    /// Decode a complete value; trailing bytes are rejected
    fn deserialize(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);
        let value = Self::decode_from(&mut cursor)?;
        if cursor.position() as usize != data.len() {
            return Err(LedgerError::CorruptEncoding(format!(
                "{} trailing bytes",
                data.len() - cursor.position() as usize
            )));
        }
        Ok(value)
    }
}

fn corrupt(err: std::io::Error) -> LedgerError {
    LedgerError::CorruptEncoding(err.to_string())
}

/// Write a variable-length integer (VarInt)
pub fn write_varint(buf: &mut Vec<u8>, value: u64) {
    match value {
        0..=0xfc => buf.push(value as u8),
        0xfd..=0xffff => {
            buf.push(0xfd);
            buf.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x10000..=0xffffffff => {
            buf.push(0xfe);
            buf.extend_from_slice(&(value as u32).to_le_bytes());
        }
        _ => {
            buf.push(0xff);
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }
}

/// Read a variable-length integer (VarInt)
pub fn read_varint<R: Read + ?Sized>(reader: &mut R) -> Result<u64> {
    let mut first_byte = [0u8; 1];
    reader.read_exact(&mut first_byte).map_err(corrupt)?;

    match first_byte[0] {
        0..=0xfc => Ok(first_byte[0] as u64),
        0xfd => {
            let mut bytes = [0u8; 2];
            reader.read_exact(&mut bytes).map_err(corrupt)?;
            Ok(u16::from_le_bytes(bytes) as u64)
        }
        0xfe => {
            let mut bytes = [0u8; 4];
            reader.read_exact(&mut bytes).map_err(corrupt)?;
            Ok(u32::from_le_bytes(bytes) as u64)
        }
        0xff => {
            let mut bytes = [0u8; 8];
            reader.read_exact(&mut bytes).map_err(corrupt)?;
            Ok(u64::from_le_bytes(bytes))
        }
    }
}

/// Read a length or element count, bounded by MAX_VAR_LEN
pub fn read_len<R: Read + ?Sized>(reader: &mut R) -> Result<usize> {
    let len = read_varint(reader)?;
    if len > MAX_VAR_LEN {
        return Err(LedgerError::CorruptEncoding(format!("length {} out of range", len)));
    }
    Ok(len as usize)
}

/// Write bytes with length prefix (VarInt length + data)
pub fn write_var_bytes(buf: &mut Vec<u8>, data: &[u8]) {
    write_varint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

/// Read bytes with length prefix
pub fn read_var_bytes<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>> {
    let len = read_len(reader)?;
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).map_err(corrupt)?;
    Ok(data)
}

/// Optional hash: empty for None, 32 bytes otherwise
pub fn write_opt_hash(buf: &mut Vec<u8>, hash: Option<&Hash256>) {
    match hash {
        Some(hash) => write_var_bytes(buf, hash.as_bytes()),
        None => write_varint(buf, 0),
    }
}

pub fn read_opt_hash<R: Read + ?Sized>(reader: &mut R) -> Result<Option<Hash256>> {
    let bytes = read_var_bytes(reader)?;
    if bytes.is_empty() {
        return Ok(None);
    }
    Hash256::from_slice(&bytes).map(Some)
}

pub fn read_hash<R: Read + ?Sized>(reader: &mut R) -> Result<Hash256> {
    let mut bytes = [0u8; 32];
    reader.read_exact(&mut bytes).map_err(corrupt)?;
    Ok(Hash256::new(bytes))
}

pub fn read_u64<R: Read + ?Sized>(reader: &mut R) -> Result<u64> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes).map_err(corrupt)?;
    Ok(u64::from_le_bytes(bytes))
}

pub fn read_i32<R: Read + ?Sized>(reader: &mut R) -> Result<i32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes).map_err(corrupt)?;
    Ok(i32::from_le_bytes(bytes))
}
