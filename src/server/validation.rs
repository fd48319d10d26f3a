use crate::error::{Error, Result};

const MAX_FILE_NAME_LEN: usize = 255;
const MAX_LABEL_LEN: usize = 64;
const MAX_SLUG_LEN: usize = 64;

fn is_valid_name_char(c: char, allow_period: bool) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || (allow_period && c == '.')
}

fn validate_label(name: &str, entity: &str, max_len: usize, allow_period: bool) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation(format!("{entity} cannot be empty")));
    }
    if name.len() > max_len {
        return Err(Error::validation(format!(
            "{entity} cannot exceed {max_len} characters"
        )));
    }
    if !name.chars().all(|c| is_valid_name_char(c, allow_period)) {
        let mut allowed = "alphanumeric characters, hyphens, and underscores".to_string();
        if allow_period {
            allowed.push_str(", and periods");
        }
        return Err(Error::validation(format!("{entity} can only contain {allowed}")));
    }
    Ok(())
}

pub fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation("file name cannot be empty"));
    }
    if name.chars().count() > MAX_FILE_NAME_LEN {
        return Err(Error::validation(format!(
            "file name cannot exceed {MAX_FILE_NAME_LEN} characters"
        )));
    }
    if name.contains(['/', '\0', '\n']) {
        return Err(Error::validation(
            "file name cannot contain '/', newlines or NUL",
        ));
    }
    Ok(())
}

pub fn validate_namespace_name(name: &str) -> Result<()> {
    validate_label(name, "namespace name", MAX_LABEL_LEN, true)
}

/// Empty means the default namespace.
pub fn validate_optional_namespace(name: &str) -> Result<()> {
    if name.is_empty() {
        return Ok(());
    }
    validate_namespace_name(name)
}

pub fn validate_attribute_names(names: &[String], entity: &str) -> Result<()> {
    names
        .iter()
        .try_for_each(|name| validate_label(name, entity, MAX_LABEL_LEN, true))
}

pub fn validate_slug(slug: &str) -> Result<()> {
    validate_label(slug, "public name", MAX_SLUG_LEN, false)
}
