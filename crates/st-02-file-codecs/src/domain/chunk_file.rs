//! # Chunk File
//!
//! `{deltas: [...]}`, one delta per create, recover and update operation,
//! in that order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{ErrorCode, ProtocolParameters, SidetreeError};

use super::common::{compress_model, decompress_json_object, FileErrorCodes};

const CODES: FileErrorCodes = FileErrorCodes {
    decompression: ErrorCode::ChunkFileDecompressionFailure,
    not_json: ErrorCode::ChunkFileNotJson,
    unknown_property: ErrorCode::ChunkFileUnexpectedProperty,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkFileModel {
    pub deltas: Vec<Value>,
}

pub struct ChunkFile;

impl ChunkFile {
    pub fn create_buffer(model: &ChunkFileModel) -> Result<Vec<u8>, SidetreeError> {
        compress_model(model)
    }

    /// Deltas are only checked to be objects; their content is validated
    /// per operation.
    pub fn parse(
        buffer: &[u8],
        params: &ProtocolParameters,
    ) -> Result<ChunkFileModel, SidetreeError> {
        let object = decompress_json_object(
            buffer,
            params.max_decompressed_size(params.max_chunk_file_size_in_bytes),
            &["deltas"],
            &CODES,
        )?;

        let deltas = match object.get("deltas") {
            Some(Value::Array(deltas)) => deltas,
            _ => {
                return Err(SidetreeError::new(
                    ErrorCode::ChunkFileDeltasPropertyNotArray,
                    "'deltas' must be an array",
                ))
            }
        };
        if !deltas.iter().all(Value::is_object) {
            return Err(SidetreeError::new(
                ErrorCode::ChunkFileDeltasNotArrayOfObjects,
                "every delta must be an object",
            ));
        }

        Ok(ChunkFileModel {
            deltas: deltas.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::compress;
    use proptest::prelude::*;
    use serde_json::{json, Map};

    fn gzip_json(value: Value) -> Vec<u8> {
        compress(&serde_json::to_vec(&value).unwrap()).unwrap()
    }

    #[test]
    fn test_roundtrip() {
        let model = ChunkFileModel {
            deltas: vec![json!({"patches": [], "updateCommitment": "a"}), json!({"patches": []})],
        };
        let buffer = ChunkFile::create_buffer(&model).unwrap();
        let parsed = ChunkFile::parse(&buffer, &ProtocolParameters::default()).unwrap();
        assert_eq!(parsed, model);
    }

    #[test]
    fn test_structure() {
        let params = ProtocolParameters::default();

        let extra = gzip_json(json!({"deltas": [], "extra": 1}));
        let err = ChunkFile::parse(&extra, &params).unwrap_err();
        assert_eq!(err.code, ErrorCode::ChunkFileUnexpectedProperty);

        let err = ChunkFile::parse(&gzip_json(json!({})), &params).unwrap_err();
        assert_eq!(err.code, ErrorCode::ChunkFileDeltasPropertyNotArray);

        let err = ChunkFile::parse(&gzip_json(json!({"deltas": [1]})), &params).unwrap_err();
        assert_eq!(err.code, ErrorCode::ChunkFileDeltasNotArrayOfObjects);
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            (-1_000_000i64..1_000_000).prop_map(Value::from),
            "[ -~]{0,16}".prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
        ]
    }

    fn delta() -> impl Strategy<Value = Value> {
        proptest::collection::btree_map("[A-Za-z]{1,8}", leaf(), 0..4)
            .prop_map(|fields| Value::Object(fields.into_iter().collect::<Map<_, _>>()))
    }

    proptest! {
        #[test]
        fn prop_parse_inverts_create_buffer(deltas in proptest::collection::vec(delta(), 0..6)) {
            let model = ChunkFileModel { deltas };
            let buffer = ChunkFile::create_buffer(&model).unwrap();
            let parsed = ChunkFile::parse(&buffer, &ProtocolParameters::default()).unwrap();
            prop_assert_eq!(parsed, model);
        }
    }
}
