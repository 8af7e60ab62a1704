//! Pure input validators for the intake wizard.

/// Keep only ASCII digits.
pub fn digits(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validate a national ID number by its two mod-11 check digits.
///
/// Rules: exactly 11 digits after stripping separators; all-identical digits
/// are rejected outright (they satisfy the checksum but are not valid IDs);
/// each check digit is `(weighted_sum * 10) % 11` with descending weights
/// starting at 10 (first digit) and 11 (second digit), remainder 10 mapped
/// to 0, and must match positions 10 and 11.
pub fn is_valid_national_id(input: &str) -> bool {
    let normalized = digits(input);
    if normalized.len() != 11 {
        return false;
    }
    let nums: Vec<u32> = normalized
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();
    if nums.iter().all(|&n| n == nums[0]) {
        return false;
    }

    let check_digit = |take: usize| -> u32 {
        let first_weight = (take + 1) as u32;
        let total: u32 = nums[..take]
            .iter()
            .enumerate()
            .map(|(i, &n)| n * (first_weight - i as u32))
            .sum();
        let rem = (total * 10) % 11;
        if rem == 10 { 0 } else { rem }
    };

    check_digit(9) == nums[9] && check_digit(10) == nums[10]
}

/// Phone numbers must have exactly 10 or 11 digits (area code plus
/// 8- or 9-digit line number) after stripping formatting.
pub fn is_valid_phone(input: &str) -> bool {
    let len = digits(input).len();
    len == 10 || len == 11
}

/// Parse a quantity from free text or a selection payload.
/// Valid quantities are 1..=max.
pub fn parse_qty(input: &str, max: u32) -> Option<u32> {
    let qty: u32 = input.trim().parse().ok()?;
    (1..=max).contains(&qty).then_some(qty)
}

/// Normalize a postal code to its 8-digit form, if it has one.
pub fn normalize_postal_code(input: &str) -> Option<String> {
    let normalized = digits(input);
    (normalized.len() == 8).then_some(normalized)
}

/// Split an address number line into the street number (leading digits)
/// and an optional complement (trimmed remainder).
///
/// `"100 apt 42"` → `("100", Some("apt 42"))`; `"100"` → `("100", None)`.
/// A line with no leading digits is invalid.
pub fn parse_number_line(input: &str) -> Option<(String, Option<String>)> {
    let trimmed = input.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    if digits_end == 0 {
        return None;
    }

    let number = trimmed[..digits_end].to_string();
    let complement = trimmed[digits_end..]
        .trim_start_matches([' ', ',', '-', '/'])
        .trim();
    let complement = (!complement.is_empty()).then(|| complement.to_string());
    Some((number, complement))
}
