use bytes::{BufMut, BytesMut};
use strata_protocol_core::*;

/// 1.19 and 1.19.2 let the client sign the verify token with its chat key.
fn has_signed_nonce(protocol: i32) -> bool {
    (759..=760).contains(&protocol)
}

pub fn decode_handshake(data: &mut BytesMut) -> Result<InternalPacket, DecodeError> {
    let protocol_version = read_varint(data)?;
    let server_address = read_string(data, 255)?;
    let server_port = read_u16(data)?;
    let next_state = read_varint(data)?;
    Ok(InternalPacket::Handshake {
        protocol_version,
        server_address,
        server_port,
        next_state,
    })
}

pub fn encode_handshake(packet: &InternalPacket) -> Result<BytesMut, DecodeError> {
    let InternalPacket::Handshake {
        protocol_version,
        server_address,
        server_port,
        next_state,
    } = packet
    else {
        return Err(DecodeError::Unencodable(packet.name()));
    };
    let mut buf = BytesMut::new();
    write_varint(&mut buf, *protocol_version);
    write_string(&mut buf, server_address);
    buf.put_u16(*server_port);
    write_varint(&mut buf, *next_state);
    Ok(buf)
}

pub fn decode_encryption_request(data: &mut BytesMut) -> Result<InternalPacket, DecodeError> {
    let server_id = read_string(data, 20)?;
    let public_key = read_byte_array(data)?;
    let verify_token = read_byte_array(data)?;
    Ok(InternalPacket::EncryptionRequest {
        server_id,
        public_key,
        verify_token,
    })
}

pub fn decode_encryption_response(
    protocol: i32,
    data: &mut BytesMut,
) -> Result<InternalPacket, DecodeError> {
    let shared_secret = read_byte_array(data)?;
    if has_signed_nonce(protocol) && !read_bool(data)? {
        let salt = read_i64(data)?;
        let signature = read_byte_array(data)?;
        return Ok(InternalPacket::EncryptionResponse {
            shared_secret,
            verify_token: None,
            signed_nonce: Some(SignedNonce { salt, signature }),
        });
    }
    let verify_token = read_byte_array(data)?;
    Ok(InternalPacket::EncryptionResponse {
        shared_secret,
        verify_token: Some(verify_token),
        signed_nonce: None,
    })
}

pub fn encode_login(protocol: i32, packet: &InternalPacket) -> Result<BytesMut, DecodeError> {
    let mut buf = BytesMut::new();
    match packet {
        InternalPacket::EncryptionRequest {
            server_id,
            public_key,
            verify_token,
        } => {
            write_string(&mut buf, server_id);
            write_byte_array(&mut buf, public_key);
            write_byte_array(&mut buf, verify_token);
        }
        InternalPacket::EncryptionResponse {
            shared_secret,
            verify_token,
            signed_nonce,
        } => {
            write_byte_array(&mut buf, shared_secret);
            match (verify_token, signed_nonce) {
                (Some(token), _) => {
                    if has_signed_nonce(protocol) {
                        buf.put_u8(1);
                    }
                    write_byte_array(&mut buf, token);
                }
                (None, Some(nonce)) if has_signed_nonce(protocol) => {
                    buf.put_u8(0);
                    buf.put_i64(nonce.salt);
                    write_byte_array(&mut buf, &nonce.signature);
                }
                _ => return Err(DecodeError::Unencodable(packet.name())),
            }
        }
        InternalPacket::SetCompression { threshold } => write_varint(&mut buf, *threshold),
        _ => return Err(DecodeError::Unencodable(packet.name())),
    }
    Ok(buf)
}
