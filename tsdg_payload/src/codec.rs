//! Remote-write wire codec: protobuf `WriteRequest` in a raw Snappy block.

use bytes::Bytes;
use prost::Message;

use crate::proto::prometheus::WriteRequest;

/// Errors produced by the codec.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// See [`snap::Error`]
    #[error("snappy: {0}")]
    Snappy(#[from] snap::Error),
    /// See [`prost::DecodeError`]
    #[error(transparent)]
    Decode(#[from] prost::DecodeError),
}

/// Serialize and compress `request`.
///
/// # Errors
///
/// Fails if the serialized request is too large for a Snappy block.
pub fn encode(request: &WriteRequest) -> Result<Bytes, Error> {
    let raw = request.encode_to_vec();
    let compressed = snap::raw::Encoder::new().compress_vec(&raw)?;
    Ok(Bytes::from(compressed))
}

/// Decompress and parse a message produced by [`encode`].
///
/// # Errors
///
/// Fails if `bytes` is not a valid Snappy block or does not hold a
/// `WriteRequest`.
pub fn decode(bytes: &[u8]) -> Result<WriteRequest, Error> {
    let raw = snap::raw::Decoder::new().decompress_vec(bytes)?;
    Ok(WriteRequest::decode(raw.as_slice())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::prometheus::{Label, Sample, TimeSeries};

    #[test]
    fn round_trip_preserves_series() {
        let request = WriteRequest {
            timeseries: vec![
                TimeSeries {
                    labels: vec![
                        Label {
                            name: "__name__".to_string(),
                            value: "cpu".to_string(),
                        },
                        Label {
                            name: "host".to_string(),
                            value: "a".to_string(),
                        },
                    ],
                    samples: vec![
                        Sample {
                            value: 1.5,
                            timestamp: 1_000,
                        },
                        Sample {
                            value: -2.0,
                            timestamp: 2_000,
                        },
                    ],
                },
                TimeSeries {
                    labels: vec![],
                    samples: vec![Sample {
                        value: 0.0,
                        timestamp: i64::MIN,
                    }],
                },
            ],
        };
        let bytes = encode(&request).expect("encodes");
        assert_eq!(decode(&bytes).expect("decodes"), request);
    }

    #[test]
    fn empty_request_round_trips() {
        let request = WriteRequest::default();
        let bytes = encode(&request).expect("encodes");
        assert_eq!(decode(&bytes).expect("decodes"), request);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            decode(b"\xff\xff\xff\xff\xff\xff"),
            Err(Error::Snappy(_))
        ));
    }
}
