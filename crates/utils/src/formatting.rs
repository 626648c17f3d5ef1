use std::fmt::Display;

/// Formats an `Option<&T>` for logging: `None` stays literal, `Some` prints the inner value.
pub fn format_opt<T: Display>(opt: Option<&T>) -> String {
    opt.map_or("None".to_owned(), ToString::to_string)
}

/// Formats an iterator of displayable items as a bracketed, comma-separated list.
pub fn format_array(list: impl IntoIterator<Item = impl Display>) -> String {
    let comma_separated =
        list.into_iter().map(|item| item.to_string()).collect::<Vec<_>>().join(", ");
    if comma_separated.is_empty() {
        "None".to_owned()
    } else {
        format!("[{comma_separated}]")
    }
}
