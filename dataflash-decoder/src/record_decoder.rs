//! Record Decoding Engine
//!
//! Turns the fixed-width body of one data record into a `LogRecord`, given
//! the layout registered for its type. All multi-byte values are
//! little-endian.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::format::{FieldType, LogFormat};
use crate::types::{padded_text, FieldValue, LogRecord};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};

/// Record decoder - extracts typed fields from a record body
pub struct RecordDecoder;

impl RecordDecoder {
    /// Decode a data record body into a LogRecord
    ///
    /// Fields are decoded in declaration order, pairing type codes with
    /// labels up to the shorter of the two lists. When the body runs out,
    /// decoding stops and the fields read so far are returned.
    pub fn decode_record(body: &[u8], format: &LogFormat) -> LogRecord {
        Self::decode_with_diagnostics(body, format, &mut Diagnostics::new(false))
    }

    pub(crate) fn decode_with_diagnostics(
        body: &[u8],
        format: &LogFormat,
        diagnostics: &mut Diagnostics,
    ) -> LogRecord {
        let mut cursor = Cursor::new(body);
        let mut record = LogRecord::new(format.name.clone());

        for (field_type, name) in format.fields() {
            let value = match Self::read_field(&mut cursor, field_type) {
                Ok(value) => value,
                Err(_) => break,
            };

            if let FieldType::Unknown(code) = field_type {
                diagnostics.push(Diagnostic::UnknownFieldType {
                    type_name: format.name.clone(),
                    field: name.to_string(),
                    code,
                });
            }

            record.insert_field(name, value);
        }

        record
    }

    /// Read one field, failing with `UnexpectedEof` when the body is too short
    fn read_field(cursor: &mut Cursor<&[u8]>, field_type: FieldType) -> io::Result<FieldValue> {
        let value = match field_type {
            FieldType::Int8 => FieldValue::Int8(cursor.read_i8()?),
            FieldType::UInt8 => FieldValue::UInt8(cursor.read_u8()?),
            FieldType::Int16 => FieldValue::Int16(cursor.read_i16::<LittleEndian>()?),
            FieldType::UInt16 => FieldValue::UInt16(cursor.read_u16::<LittleEndian>()?),
            FieldType::Int32 => FieldValue::Int32(cursor.read_i32::<LittleEndian>()?),
            FieldType::UInt32 => FieldValue::UInt32(cursor.read_u32::<LittleEndian>()?),
            FieldType::Float32 => FieldValue::Float32(cursor.read_f32::<LittleEndian>()?),
            FieldType::Float64 => FieldValue::Float64(cursor.read_f64::<LittleEndian>()?),
            FieldType::Char4 => FieldValue::Text(Self::read_text::<4>(cursor)?),
            FieldType::Char16 => FieldValue::Text(Self::read_text::<16>(cursor)?),
            FieldType::Char64 => FieldValue::Text(Self::read_text::<64>(cursor)?),
            FieldType::Int64(_) => FieldValue::Int64(cursor.read_i64::<LittleEndian>()?),
            FieldType::Unknown(_) => FieldValue::Null,
        };
        Ok(value)
    }

    fn read_text<const N: usize>(cursor: &mut Cursor<&[u8]>) -> io::Result<String> {
        let mut buf = [0u8; N];
        cursor.read_exact(&mut buf)?;
        Ok(padded_text(&buf))
    }
}
