//! Case transforms used to derive action types and creator names
//!
//! Both transforms take a camelCase base name (`getSomeData`). The same
//! functions feed action types (`FETCH_GET_SOME_DATA`) and creator/selector
//! names (`fetchGetSomeData`), keeping the two in step.

/// `getSomeData` → `GetSomeData`
#[must_use]
pub fn camel_case_to_pascal_case(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// `getSomeData` → `GET_SOME_DATA`
///
/// An underscore is placed between a lower-case letter or digit and the
/// upper-case letter that follows it; everything is then upper-cased.
/// Runs of capitals stay together: `getURLs` → `GET_URLS`.
#[must_use]
pub fn camel_case_to_constant_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut previous: Option<char> = None;

    for c in name.chars() {
        if let Some(p) = previous {
            if (p.is_lowercase() || p.is_ascii_digit()) && c.is_uppercase() {
                out.push('_');
            }
        }
        out.extend(c.to_uppercase());
        previous = Some(c);
    }

    out
}
