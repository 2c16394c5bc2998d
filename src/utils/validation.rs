use validator::Validate;

use crate::errors::AppError;

pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(|err| {
        let mut details = err
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let errors = errs
                    .iter()
                    .map(|e| e.message.as_ref().unwrap_or(&e.code).to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}: {}", field, errors)
            })
            .collect::<Vec<_>>();
        details.sort();
        AppError::BadRequest(format!("Validation failed: {}", details.join("; ")))
    })
}
