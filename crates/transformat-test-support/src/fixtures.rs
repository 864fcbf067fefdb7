//! Sample fixtures for parser and repository tests.

use transformat_data::{FieldDefinition, FieldType, TransformType};

/// Three comma-delimited sample lines: `account_id,balance,opened_at`.
pub const DELIMITED_SAMPLE: &str = "1001,2500.50,2024-01-15\n\
1002,103.00,2024-02-20\n\
1003,-42.75,2024-03-01\n";

/// Three fixed-width sample lines matching [`fixed_length_field_defs`]:
/// a 6-column account id, a 10-column balance, an 8-column date.
pub const FIXED_LENGTH_SAMPLE: &str = "001001   2500.5020240115\n\
001002    103.0020240220\n\
001003    -42.7520240301\n";

/// Field definitions describing [`DELIMITED_SAMPLE`].
#[must_use]
pub fn delimited_field_defs(file_name: &str) -> Vec<FieldDefinition> {
    vec![
        field_def(file_name, "account_id", 1, FieldType::Int, 0, 0, TransformType::Plain),
        field_def(file_name, "balance", 2, FieldType::Double, 0, 0, TransformType::Mask),
        field_def(file_name, "opened_at", 3, FieldType::Timestamp, 0, 0, TransformType::Plain),
    ]
}

/// Field definitions describing [`FIXED_LENGTH_SAMPLE`].
#[must_use]
pub fn fixed_length_field_defs(file_name: &str) -> Vec<FieldDefinition> {
    vec![
        field_def(file_name, "account_id", 1, FieldType::Int, 1, 6, TransformType::Plain),
        field_def(file_name, "balance", 2, FieldType::Double, 7, 10, TransformType::Mask),
        field_def(file_name, "opened_at", 3, FieldType::Timestamp, 17, 8, TransformType::Plain),
    ]
}

#[allow(clippy::too_many_arguments)]
fn field_def(
    file_name: &str,
    field_name: &str,
    sequence: i32,
    field_type: FieldType,
    start_position: i32,
    field_length: i32,
    transform_type: TransformType,
) -> FieldDefinition {
    FieldDefinition {
        id: i64::from(sequence),
        file_name: file_name.to_string(),
        field_name: field_name.to_string(),
        sequence,
        field_type,
        start_position,
        field_length,
        transform_type,
    }
}

