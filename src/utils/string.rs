/// Last `count` characters of `str`, respecting char boundaries.
pub fn tail(str: &str, count: usize) -> &str {
    if count == 0 {
        return "";
    }

    match str.char_indices().rev().nth(count - 1) {
        Some((index, _)) => &str[index..],
        None => str,
    }
}
