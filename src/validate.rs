use time::Date;

use crate::time::parse_date;

pub const MAX_NAME_LEN: usize = 255;

/// Trims, drops angle brackets and caps the length of free text.
pub fn sanitize(s: &str, max_len: usize) -> String {
    s.trim()
        .chars()
        .filter(|c| !matches!(c, '<' | '>'))
        .take(max_len)
        .collect::<String>()
        .trim_end()
        .to_string()
}

pub fn name(s: &str) -> Result<String, &'static str> {
    let name = sanitize(s, MAX_NAME_LEN);
    if name.is_empty() {
        return Err("name must not be empty");
    }
    Ok(name)
}

pub fn amount(value: f64, what: &'static str) -> Result<f64, &'static str> {
    if !value.is_finite() {
        return Err(what);
    }
    if value < 0.0 {
        return Err(what);
    }
    Ok(value)
}

pub fn date(s: &str) -> Result<Date, &'static str> {
    parse_date(s).ok_or("date must be yyyy-MM-dd")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(name("  North <b>Center</b> ").unwrap(), "North bCenter/b");
        assert!(name("   ").is_err());
        assert!(name("<>").is_err());
        assert_eq!(name(&"x".repeat(300)).unwrap().len(), MAX_NAME_LEN);
    }

    #[test]
    fn amounts() {
        assert_eq!(amount(0.0, "revenue"), Ok(0.0));
        assert_eq!(amount(12.5, "revenue"), Ok(12.5));
        assert_eq!(amount(-0.01, "revenue"), Err("revenue"));
        assert!(amount(f64::NAN, "revenue").is_err());
        assert!(amount(f64::INFINITY, "revenue").is_err());
    }
}
