//! Schema construction from an ordered field list.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};
use transformat_data::{FieldDefinition, FieldType};

/// Metadata key the `transform_types` mapping is attached under.
pub const TRANSFORM_TYPES_KEY: &str = "transform_types";

/// Map a field's declared scalar type to its Arrow column type.
///
/// `int → Int64`, `double → Float64`, `timestamp → Utf8` (the parsed
/// textual form is preserved rather than re-encoded), everything else
/// (`string`, and any type this crate does not yet know) `→ Utf8`.
#[must_use]
pub const fn arrow_type_for(field_type: FieldType) -> DataType {
    match field_type {
        FieldType::Int => DataType::Int64,
        FieldType::Double => DataType::Float64,
        FieldType::String | FieldType::Timestamp => DataType::Utf8,
    }
}

/// Build the Arrow schema for a file's field definitions, attaching a
/// `transform_types` metadata entry so downstream consumers can read each
/// column's masking policy without a side-channel lookup.
#[must_use]
pub fn build_schema(field_defs: &[FieldDefinition]) -> Schema {
    let fields: Vec<Field> = field_defs
        .iter()
        .map(|def| Field::new(&def.field_name, arrow_type_for(def.field_type), true))
        .collect();

    let transform_types: BTreeMap<&str, &'static str> = field_defs
        .iter()
        .map(|def| (def.field_name.as_str(), transform_type_label(def.transform_type)))
        .collect();

    let mut metadata = std::collections::HashMap::new();
    metadata.insert(
        TRANSFORM_TYPES_KEY.to_string(),
        serde_json::to_string(&transform_types).unwrap_or_default(),
    );

    Schema::new(fields).with_metadata(metadata)
}

const fn transform_type_label(transform_type: transformat_data::TransformType) -> &'static str {
    match transform_type {
        transformat_data::TransformType::Plain => "plain",
        transformat_data::TransformType::Mask => "mask",
        transformat_data::TransformType::Encrypt => "encrypt",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transformat_data::TransformType;

    fn field(name: &str, field_type: FieldType, transform_type: TransformType) -> FieldDefinition {
        FieldDefinition {
            id: 1,
            file_name: "sample.txt".to_string(),
            field_name: name.to_string(),
            sequence: 1,
            field_type,
            start_position: 0,
            field_length: 0,
            transform_type,
        }
    }

    #[test]
    fn maps_scalar_types_to_arrow_types() {
        assert_eq!(arrow_type_for(FieldType::Int), DataType::Int64);
        assert_eq!(arrow_type_for(FieldType::Double), DataType::Float64);
        assert_eq!(arrow_type_for(FieldType::Timestamp), DataType::Utf8);
        assert_eq!(arrow_type_for(FieldType::String), DataType::Utf8);
    }

    #[test]
    fn attaches_transform_types_metadata_entry() {
        let defs = vec![
            field("id", FieldType::Int, TransformType::Plain),
            field("ssn", FieldType::String, TransformType::Mask),
        ];
        let schema = build_schema(&defs);
        let metadata = schema.metadata().get(TRANSFORM_TYPES_KEY).expect("metadata present");
        assert!(metadata.contains("\"ssn\":\"mask\""));
        assert!(metadata.contains("\"id\":\"plain\""));
    }
}
