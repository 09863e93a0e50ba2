//! Length-delimited message transport with explicit ACK handshakes. A
//! 4-byte big-endian length prefix precedes every serialized payload.

use std::io::{Read, Write};

use anyhow::{Context, Result, bail};
use serde::{Serialize, de::DeserializeOwned};

const ACK_BYTE: u8 = 0x01;

/// Send a length-prefixed, bincode-serialized message.
pub fn send<T: Serialize, S: Write>(stream: &mut S, value: &T) -> Result<()> {
    let payload = bincode::serde::encode_to_vec(value, bincode::config::standard())
        .context("failed to serialize message for transport")?;
    send_raw(stream, &payload)
}

/// Receive and deserialize a length-prefixed, bincode-serialized message.
pub fn receive<T: DeserializeOwned, S: Read>(stream: &mut S) -> Result<T> {
    let payload = receive_raw(stream)?;
    let (value, _) = bincode::serde::decode_from_slice(&payload, bincode::config::standard())
        .context("failed to deserialize message from transport")?;
    Ok(value)
}

/// Write a raw length-prefixed payload.
pub fn send_raw<S: Write>(stream: &mut S, payload: &[u8]) -> Result<()> {
    let len = u32::try_from(payload.len()).context("message too large for a 4-byte length prefix")?;
    stream.write_all(&len.to_be_bytes())?;
    stream.write_all(payload)?;
    stream.flush()?;
    Ok(())
}

/// Read a raw length-prefixed payload.
pub fn receive_raw<S: Read>(stream: &mut S) -> Result<Vec<u8>> {
    let mut len_bytes = [0u8; 4];
    stream.read_exact(&mut len_bytes)?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload)?;
    Ok(payload)
}

pub fn send_ack<S: Write>(stream: &mut S) -> Result<()> {
    send_raw(stream, &[ACK_BYTE])
}

/// Block until an ACK is received. A mismatched payload is a protocol
/// violation and is fatal — there is no retry at this layer.
pub fn wait_for_ack<S: Read>(stream: &mut S) -> Result<()> {
    let payload = receive_raw(stream)?;
    if payload != [ACK_BYTE] {
        bail!("expected ACK, got {} bytes", payload.len());
    }
    Ok(())
}
