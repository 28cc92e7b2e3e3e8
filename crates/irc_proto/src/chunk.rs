//! Length-bounded joining, shared by the client's `say`/`join` chunking
//! (§4.9) and the server's `NAMES`/`JOIN` frame chunking (§4.10) so both
//! sides split long lines exactly the same way.

/// Joins items from the front of `items` with `sep` until adding another
/// would make the result reach `maxlen` bytes. Returns the joined chunk
/// and the items that didn't fit.
///
/// ```ignore
/// join_max_length(&["lorem","ipsum","dolor","sit","amet"], ":", 15)
/// // => ("lorem:ipsum", ["dolor","sit","amet"])
/// ```
pub fn join_max_length(items: &[String], sep: &str, maxlen: usize) -> (String, Vec<String>) {
    let mut result = String::new();
    let mut iter = items.iter();
    let mut remaining = Vec::new();

    for item in iter.by_ref() {
        if result.len() + item.len() < maxlen {
            result.push_str(item);
            result.push_str(sep);
        } else {
            remaining.push(item.clone());
            break;
        }
    }
    remaining.extend(iter.cloned());

    if !sep.is_empty() {
        if let Some(stripped) = result.strip_suffix(sep) {
            result = stripped.to_string();
        }
    }

    (result, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_documented_scenario() {
        let items = ["lorem", "ipsum", "dolor", "sit", "amet"].map(String::from);
        let (chunk, rest) = join_max_length(&items, ":", 15);
        assert_eq!(chunk, "lorem:ipsum");
        assert_eq!(rest, vec!["dolor", "sit", "amet"]);
    }

    #[test]
    fn takes_everything_when_it_fits() {
        let items = ["dolor", "sit", "amet"].map(String::from);
        let (chunk, rest) = join_max_length(&items, ":", 15);
        assert_eq!(chunk, "dolor:sit:amet");
        assert!(rest.is_empty());
    }

    #[test]
    fn empty_separator_splits_by_character_count() {
        let items = ["a", "b", "c"].map(String::from);
        let (chunk, rest) = join_max_length(&items, "", 2);
        assert_eq!(chunk, "a");
        assert_eq!(rest, vec!["b", "c"]);
    }
}
