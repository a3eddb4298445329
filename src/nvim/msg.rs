//! MessagePack primitives for the backend RPC.
//!
//! Readers operate on a shrinking byte slice so decoding never copies;
//! a truncated message surfaces as `UnexpectedEof`, which the I/O loop
//! treats as "wait for more bytes".

use crate::color::Color;
use rmp::decode::{self as dec, NumValueReadError, ValueReadError};
use rmp::encode as enc;
use rmp::Marker;
use std::fmt;
use std::io::{self, Error, ErrorKind};
use std::panic::Location;

pub fn read_array_len(raw: &mut &[u8]) -> io::Result<usize> {
    Ok(dec::read_array_len(raw).map_err(value_read_error_to_io_error)? as usize)
}

pub fn read_map_len(raw: &mut &[u8]) -> io::Result<usize> {
    Ok(dec::read_map_len(raw).map_err(value_read_error_to_io_error)? as usize)
}

/// Classifies the next value without consuming it.
pub fn peek_marker(raw: &[u8]) -> io::Result<Marker> {
    raw.first()
        .map(|byte| Marker::from_u8(*byte))
        .ok_or_else(|| Error::new(ErrorKind::UnexpectedEof, "empty read buffer"))
}

pub fn read_string<'a>(raw: &mut &'a [u8]) -> io::Result<&'a str> {
    let str_len = dec::read_str_len(raw).map_err(value_read_error_to_io_error)? as usize;
    if raw.len() < str_len {
        return Err(Error::new(ErrorKind::UnexpectedEof, "truncated string"));
    }
    let raw_buf = &raw[..str_len];
    *raw = &raw[str_len..];

    std::str::from_utf8(raw_buf).or_else(|_| err_invalid_input())
}

pub fn read_f64(raw: &mut &[u8]) -> io::Result<f64> {
    Ok(match peek_marker(raw)? {
        Marker::F32 => dec::read_f32(raw).map_err(value_read_error_to_io_error)? as f64,
        Marker::F64 => dec::read_f64(raw).map_err(value_read_error_to_io_error)?,
        _ => return err_invalid_input(),
    })
}

/// Reads any numeric value as `f64`. Anchor coordinates arrive as either
/// integers or floats depending on the backend version.
pub fn read_number(raw: &mut &[u8]) -> io::Result<f64> {
    match peek_marker(raw)? {
        Marker::F32 | Marker::F64 => read_f64(raw),
        Marker::FixNeg(_) | Marker::I8 | Marker::I16 | Marker::I32 | Marker::I64 => {
            read_i64(raw).map(|v| v as f64)
        }
        _ => read_u64(raw).map(|v| v as f64),
    }
}

pub fn read_u64(raw: &mut &[u8]) -> io::Result<u64> {
    dec::read_int(raw).map_err(num_value_read_error_to_io_error)
}

pub fn read_i64(raw: &mut &[u8]) -> io::Result<i64> {
    dec::read_int(raw).map_err(num_value_read_error_to_io_error)
}

pub fn read_bool(raw: &mut &[u8]) -> io::Result<bool> {
    dec::read_bool(raw).map_err(value_read_error_to_io_error)
}

pub fn read_color(raw: &mut &[u8]) -> io::Result<Color> {
    read_u64(raw).map(Color::from_rgb_u64)
}

pub fn read_ext_meta(raw: &mut &[u8]) -> io::Result<dec::ExtMeta> {
    dec::read_ext_meta(raw).map_err(value_read_error_to_io_error)
}

/// Reads a backend handle (window, buffer, ...): an EXT value wrapping an
/// integer id.
pub fn read_handle(raw: &mut &[u8]) -> io::Result<u64> {
    match peek_marker(raw)? {
        Marker::FixExt1
        | Marker::FixExt2
        | Marker::FixExt4
        | Marker::FixExt8
        | Marker::FixExt16
        | Marker::Ext8
        | Marker::Ext16
        | Marker::Ext32 => {
            let meta = read_ext_meta(raw)?;
            let data = take_bytes(raw, meta.size as usize)?;
            let mut data = data;
            read_u64(&mut data)
        }
        _ => read_u64(raw),
    }
}

/// Consumes and discards the next value, whatever its type.
pub fn skip_value(raw: &mut &[u8]) -> io::Result<()> {
    Payload::decode(raw).map(drop)
}

fn take_bytes<'a>(raw: &mut &'a [u8], len: usize) -> io::Result<&'a [u8]> {
    if raw.len() < len {
        return Err(Error::new(ErrorKind::UnexpectedEof, "truncated payload"));
    }
    let bytes = &raw[..len];
    *raw = &raw[len..];
    Ok(bytes)
}

fn value_read_error_to_io_error(err: ValueReadError) -> Error {
    match err {
        ValueReadError::InvalidDataRead(error) => error,
        ValueReadError::InvalidMarkerRead(error) => error,
        err => Error::new(ErrorKind::InvalidInput, err.to_string()),
    }
}

fn num_value_read_error_to_io_error(err: NumValueReadError) -> Error {
    match err {
        NumValueReadError::InvalidDataRead(error) => error,
        NumValueReadError::InvalidMarkerRead(error) => error,
        err => Error::new(ErrorKind::InvalidInput, err.to_string()),
    }
}

#[track_caller]
pub fn err_invalid_input<T>() -> io::Result<T> {
    log::error!(
        "invalid message pack input received at {}",
        Location::caller()
    );
    Err(Error::new(
        ErrorKind::InvalidInput,
        "unexpected value in RPC message",
    ))
}

// Write side. All writers target a `Vec<u8>`, which cannot fail.

pub fn write_array_len(buf: &mut Vec<u8>, len: u32) {
    let _ = enc::write_array_len(buf, len);
}

pub fn write_map_len(buf: &mut Vec<u8>, len: u32) {
    let _ = enc::write_map_len(buf, len);
}

pub fn write_uint(buf: &mut Vec<u8>, value: u64) {
    let _ = enc::write_uint(buf, value);
}

pub fn write_sint(buf: &mut Vec<u8>, value: i64) {
    let _ = enc::write_sint(buf, value);
}

pub fn write_f64(buf: &mut Vec<u8>, value: f64) {
    let _ = enc::write_f64(buf, value);
}

pub fn write_str(buf: &mut Vec<u8>, value: &str) {
    let _ = enc::write_str(buf, value);
}

pub fn write_bool(buf: &mut Vec<u8>, value: bool) {
    let _ = enc::write_bool(buf, value);
}

pub fn write_nil(buf: &mut Vec<u8>) {
    let _ = enc::write_nil(buf);
}

/// A decoded MessagePack value.
///
/// Used where the wire shape is open-ended: response payloads, option
/// values, and skipped unknown events. The redraw hot path never builds
/// these; it decodes fields in place.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Nil,
    Bool(bool),
    Uint(u64),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Payload>),
    Map(Vec<(Payload, Payload)>),
    Ext(i8, Vec<u8>),
}

impl Payload {
    pub fn decode(raw: &mut &[u8]) -> io::Result<Payload> {
        Ok(match peek_marker(raw)? {
            Marker::Null => {
                *raw = &raw[1..];
                Payload::Nil
            }
            Marker::True | Marker::False => Payload::Bool(read_bool(raw)?),
            Marker::FixPos(_) | Marker::U8 | Marker::U16 | Marker::U32 | Marker::U64 => {
                Payload::Uint(read_u64(raw)?)
            }
            Marker::FixNeg(_) | Marker::I8 | Marker::I16 | Marker::I32 | Marker::I64 => {
                Payload::Int(read_i64(raw)?)
            }
            Marker::F32 | Marker::F64 => Payload::Float(read_f64(raw)?),
            Marker::FixStr(_) | Marker::Str8 | Marker::Str16 | Marker::Str32 => {
                Payload::Str(read_string(raw)?.to_owned())
            }
            Marker::Bin8 | Marker::Bin16 | Marker::Bin32 => {
                let len = dec::read_bin_len(raw).map_err(value_read_error_to_io_error)? as usize;
                let bytes = take_bytes(raw, len)?;
                match std::str::from_utf8(bytes) {
                    Ok(text) => Payload::Str(text.to_owned()),
                    Err(_) => Payload::Ext(0, bytes.to_owned()),
                }
            }
            Marker::FixArray(_) | Marker::Array16 | Marker::Array32 => {
                let len = read_array_len(raw)?;
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(Payload::decode(raw)?);
                }
                Payload::Array(items)
            }
            Marker::FixMap(_) | Marker::Map16 | Marker::Map32 => {
                let len = read_map_len(raw)?;
                let mut pairs = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    let key = Payload::decode(raw)?;
                    let value = Payload::decode(raw)?;
                    pairs.push((key, value));
                }
                Payload::Map(pairs)
            }
            Marker::FixExt1
            | Marker::FixExt2
            | Marker::FixExt4
            | Marker::FixExt8
            | Marker::FixExt16
            | Marker::Ext8
            | Marker::Ext16
            | Marker::Ext32 => {
                let meta = read_ext_meta(raw)?;
                let bytes = take_bytes(raw, meta.size as usize)?;
                Payload::Ext(meta.typeid, bytes.to_owned())
            }
            Marker::Reserved => return err_invalid_input(),
        })
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            Payload::Nil => write_nil(buf),
            Payload::Bool(value) => write_bool(buf, *value),
            Payload::Uint(value) => write_uint(buf, *value),
            Payload::Int(value) => write_sint(buf, *value),
            Payload::Float(value) => write_f64(buf, *value),
            Payload::Str(value) => write_str(buf, value),
            Payload::Array(items) => {
                write_array_len(buf, items.len() as u32);
                for item in items {
                    item.encode(buf);
                }
            }
            Payload::Map(pairs) => {
                write_map_len(buf, pairs.len() as u32);
                for (key, value) in pairs {
                    key.encode(buf);
                    value.encode(buf);
                }
            }
            Payload::Ext(typeid, data) => {
                let _ = enc::write_ext_meta(buf, data.len() as u32, *typeid);
                buf.extend_from_slice(data);
            }
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Payload::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Payload::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Payload::Uint(value) => Some(*value),
            Payload::Int(value) if *value >= 0 => Some(*value as u64),
            _ => None,
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Payload::Nil => write!(f, "nil"),
            Payload::Bool(value) => write!(f, "{}", value),
            Payload::Uint(value) => write!(f, "{}", value),
            Payload::Int(value) => write!(f, "{}", value),
            Payload::Float(value) => write!(f, "{}", value),
            Payload::Str(value) => write!(f, "{}", value),
            Payload::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Payload::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Payload::Ext(typeid, data) => write!(f, "ext({}, {} bytes)", typeid, data.len()),
        }
    }
}

const MSG_REQUEST: u64 = 0;
const MSG_RESPONSE: u64 = 1;
const MSG_NOTIFICATION: u64 = 2;

/// An RPC envelope: `[0, msgid, method, params]`, `[1, msgid, error,
/// result]` or `[2, method, params]`.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcMessage {
    Request {
        msgid: u32,
        method: String,
        params: Vec<Payload>,
    },
    Response {
        msgid: u32,
        error: Payload,
        result: Payload,
    },
    Notification {
        method: String,
        params: Vec<Payload>,
    },
}

impl RpcMessage {
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            RpcMessage::Request {
                msgid,
                method,
                params,
            } => {
                write_array_len(buf, 4);
                write_uint(buf, MSG_REQUEST);
                write_uint(buf, *msgid as u64);
                write_str(buf, method);
                write_array_len(buf, params.len() as u32);
                for param in params {
                    param.encode(buf);
                }
            }
            RpcMessage::Response {
                msgid,
                error,
                result,
            } => {
                write_array_len(buf, 4);
                write_uint(buf, MSG_RESPONSE);
                write_uint(buf, *msgid as u64);
                error.encode(buf);
                result.encode(buf);
            }
            RpcMessage::Notification { method, params } => {
                write_array_len(buf, 3);
                write_uint(buf, MSG_NOTIFICATION);
                write_str(buf, method);
                write_array_len(buf, params.len() as u32);
                for param in params {
                    param.encode(buf);
                }
            }
        }
    }

    pub fn decode(raw: &mut &[u8]) -> io::Result<RpcMessage> {
        let envelope_len = read_array_len(raw)?;

        Ok(match read_u64(raw)? {
            MSG_REQUEST => {
                if envelope_len != 4 {
                    return err_invalid_input();
                }
                RpcMessage::Request {
                    msgid: read_u64(raw)? as u32,
                    method: read_string(raw)?.to_owned(),
                    params: Self::decode_params(raw)?,
                }
            }
            MSG_RESPONSE => {
                if envelope_len != 4 {
                    return err_invalid_input();
                }
                RpcMessage::Response {
                    msgid: read_u64(raw)? as u32,
                    error: Payload::decode(raw)?,
                    result: Payload::decode(raw)?,
                }
            }
            MSG_NOTIFICATION => {
                if envelope_len != 3 {
                    return err_invalid_input();
                }
                RpcMessage::Notification {
                    method: read_string(raw)?.to_owned(),
                    params: Self::decode_params(raw)?,
                }
            }
            _ => return err_invalid_input(),
        })
    }

    fn decode_params(raw: &mut &[u8]) -> io::Result<Vec<Payload>> {
        let len = read_array_len(raw)?;
        let mut params = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            params.push(Payload::decode(raw)?);
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(payload: &Payload) {
        let mut buf = Vec::new();
        payload.encode(&mut buf);

        let mut raw = buf.as_slice();
        let decoded = Payload::decode(&mut raw).expect("decode failed");

        assert_eq!(&decoded, payload);
        assert!(raw.is_empty(), "trailing bytes after {:?}", payload);
    }

    #[test]
    fn payload_primitives_round_trip() {
        round_trip(&Payload::Nil);
        round_trip(&Payload::Bool(true));
        round_trip(&Payload::Bool(false));
        round_trip(&Payload::Uint(0));
        round_trip(&Payload::Uint(u64::max_value()));
        round_trip(&Payload::Int(-1));
        round_trip(&Payload::Int(i64::min_value()));
        round_trip(&Payload::Float(1.5));
        round_trip(&Payload::Str("redraw".to_owned()));
        round_trip(&Payload::Str(String::new()));
        round_trip(&Payload::Ext(1, vec![0x2a]));
    }

    #[test]
    fn payload_containers_round_trip() {
        round_trip(&Payload::Array(vec![
            Payload::Uint(2),
            Payload::Str("grid_line".to_owned()),
            Payload::Array(vec![Payload::Nil]),
        ]));
        round_trip(&Payload::Map(vec![
            (Payload::Str("rgb".to_owned()), Payload::Bool(true)),
            (Payload::Str("blend".to_owned()), Payload::Uint(30)),
        ]));
    }

    #[test]
    fn rpc_messages_round_trip() {
        let messages = [
            RpcMessage::Request {
                msgid: 1,
                method: "nvim_ui_attach".to_owned(),
                params: vec![Payload::Uint(80), Payload::Uint(24)],
            },
            RpcMessage::Response {
                msgid: 1,
                error: Payload::Nil,
                result: Payload::Bool(true),
            },
            RpcMessage::Response {
                msgid: 7,
                error: Payload::Str("invalid method".to_owned()),
                result: Payload::Nil,
            },
            RpcMessage::Notification {
                method: "redraw".to_owned(),
                params: vec![Payload::Array(vec![Payload::Str("flush".to_owned())])],
            },
        ];

        for message in &messages {
            let mut buf = Vec::new();
            message.encode(&mut buf);

            let mut raw = buf.as_slice();
            let decoded = RpcMessage::decode(&mut raw).expect("decode failed");

            assert_eq!(&decoded, message);
            assert!(raw.is_empty());
        }
    }

    #[test]
    fn truncated_input_reports_eof() {
        let mut buf = Vec::new();
        RpcMessage::Notification {
            method: "redraw".to_owned(),
            params: vec![Payload::Str("a longer parameter string".to_owned())],
        }
        .encode(&mut buf);

        for cut in 1..buf.len() {
            let mut raw = &buf[..cut];
            let err = RpcMessage::decode(&mut raw).expect_err("decode of prefix succeeded");
            assert_eq!(err.kind(), ErrorKind::UnexpectedEof, "cut at {}", cut);
        }
    }

    #[test]
    fn handle_reads_ext_wrapped_ids() {
        let mut buf = Vec::new();
        let _ = enc::write_ext_meta(&mut buf, 1, 1);
        write_uint(&mut buf, 42);
        // write_uint appended after the meta: payload is the encoded int.
        let mut raw = buf.as_slice();
        assert_eq!(read_handle(&mut raw).unwrap(), 42);
    }
}
