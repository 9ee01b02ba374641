//! Masking for personal data that ends up in log lines.

pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.trim().split_once('@') else {
        return "invalid-email".to_string();
    };
    if local.is_empty() || domain.is_empty() {
        return "invalid-email".to_string();
    }

    let mut local_chars = local.chars();
    let first = local_chars.next().map(String::from).unwrap_or_default();
    let masked_local = if local.chars().count() <= 2 {
        format!("{first}***")
    } else {
        let last = local.chars().last().map(String::from).unwrap_or_default();
        format!("{first}***{last}")
    };

    let (host, suffix) = match domain.split_once('.') {
        Some((host, suffix)) if !suffix.is_empty() => (host, suffix),
        Some((host, _)) => (host, "com"),
        None => (domain, "com"),
    };
    let host_initial = host.chars().next().map(String::from).unwrap_or_default();

    format!("{masked_local}@{host_initial}***.{suffix}")
}

/// Keeps the last two digits only.
pub fn mask_phone(phone: Option<&str>) -> Option<String> {
    let phone = phone.filter(|value| !value.is_empty())?;
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() <= 2 {
        return Some("***".to_string());
    }
    let tail: String = digits[digits.len() - 2..].iter().collect();
    Some(format!("***{tail}"))
}
