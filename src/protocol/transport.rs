use std::io::{self, Read, Write};

use bincode::{
    Decode, Encode,
    config::{BigEndian, Configuration, Fixint},
    decode_from_slice, encode_into_slice,
};
use thiserror::Error;

use super::{ComputationReply, ComputationRequest};

/// Encoded size of a [`ComputationRequest`]: three fixed-width `u64`s.
pub const REQUEST_SIZE: usize = 3 * size_of::<u64>();
/// Encoded size of a [`ComputationReply`]: one fixed-width `u64`.
pub const REPLY_SIZE: usize = size_of::<u64>();

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode message: {0}")]
    Serialize(#[from] bincode::error::EncodeError),
    #[error("failed to decode message: {0}")]
    Deserialize(#[from] bincode::error::DecodeError),
    #[error("Transport IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol violation: expected {expected} bytes, peer sent {received} before closing")]
    ProtocolViolation { expected: usize, received: usize },
}

/// Fixed-size message transport over any bidirectional byte stream.
///
/// Messages carry no header or length prefix; each one is exactly [`REQUEST_SIZE`] or
/// [`REPLY_SIZE`] bytes of big-endian integers. A read that sees end-of-stream before the
/// first byte reports `None` (the peer closed between messages), while end-of-stream in
/// the middle of a message is a [`TransportError::ProtocolViolation`].
pub struct ProtocolTransport<T: Read + Write> {
    stream: T,
    config: Configuration<BigEndian, Fixint>,
}

impl<T: Read + Write> ProtocolTransport<T> {
    pub fn new(stream: T) -> Self {
        let config = bincode::config::standard()
            .with_big_endian()
            .with_fixed_int_encoding();
        Self { stream, config }
    }

    pub fn into_inner(self) -> T {
        self.stream
    }

    pub fn write_request(&mut self, req: ComputationRequest) -> Result<(), TransportError> {
        self.write_frame::<_, REQUEST_SIZE>(req)
    }

    pub fn read_request(&mut self) -> Result<Option<ComputationRequest>, TransportError> {
        self.read_frame::<_, REQUEST_SIZE>()
    }

    pub fn write_reply(&mut self, reply: ComputationReply) -> Result<(), TransportError> {
        self.write_frame::<_, REPLY_SIZE>(reply)
    }

    pub fn read_reply(&mut self) -> Result<Option<ComputationReply>, TransportError> {
        self.read_frame::<_, REPLY_SIZE>()
    }

    fn write_frame<M: Encode, const N: usize>(&mut self, msg: M) -> Result<(), TransportError> {
        let mut buf = [0u8; N];
        encode_into_slice(msg, &mut buf, self.config)?;
        self.stream.write_all(&buf)?;
        self.stream.flush()?;
        Ok(())
    }

    fn read_frame<M: Decode<()>, const N: usize>(&mut self) -> Result<Option<M>, TransportError> {
        let mut buf = [0u8; N];
        let mut filled = 0;

        while filled < N {
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        match filled {
            0 => Ok(None),
            received if received < N => Err(TransportError::ProtocolViolation {
                expected: N,
                received,
            }),
            _ => {
                let (msg, _) = decode_from_slice(&buf, self.config)?;
                Ok(Some(msg))
            }
        }
    }
}
