use jsonschema::Validator;

use crate::error::{Result, TaskError};

pub(crate) fn compile_status_schema(schema_json: &str) -> Result<Validator> {
    let schema: serde_json::Value = serde_json::from_str(schema_json)?;
    jsonschema::validator_for(&schema).map_err(|err| TaskError::SchemaCompile(err.to_string()))
}

pub(crate) fn validate_status(payload: &[u8], validator: &Validator) -> Result<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_slice(payload)?;

    let validation_error = {
        let mut errors = validator.iter_errors(&value);
        if let Some(first) = errors.next() {
            let mut message = first.to_string();
            for err in errors.take(3) {
                message.push_str("; ");
                message.push_str(&err.to_string());
            }
            Some(message)
        } else {
            None
        }
    };
    if let Some(message) = validation_error {
        return Err(TaskError::InvalidStatus(message));
    }

    Ok(value)
}
