//! Custom validation functions shared by the configuration sections.

use validator::ValidationError;

/// Largest accepted pool or queue name.
const NAME_LEN_MAX: usize = 32;

/// Pool, queue and CoS names: ASCII alphanumerics plus `_`, `-` and `.`.
pub fn validate_object_name(name: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new("^[A-Za-z0-9_.-]+$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if name.len() <= NAME_LEN_MAX && re.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_object_name"))
    }
}

/// Validate that a given value is a power of two.
pub fn validate_power_of_two(value: u32) -> Result<(), ValidationError> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_power_of_two"))
    }
}

/// Zero selects the default alignment; anything else must be a power of two.
pub fn validate_alignment(value: u32) -> Result<(), ValidationError> {
    if value == 0 {
        return Ok(());
    }
    validate_power_of_two(value).map_err(|_| ValidationError::new("invalid_alignment"))
}

/// `tracing` filter directives: comma separated `target=level` pairs.
pub fn validate_log_filter(filter: &str) -> Result<(), ValidationError> {
    let re = regex::Regex::new(r"^([A-Za-z0-9_:-]+(=(trace|debug|info|warn|error|off))?)(,[A-Za-z0-9_:-]+(=(trace|debug|info|warn|error|off))?)*$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(filter) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_filter"))
    }
}
