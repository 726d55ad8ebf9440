//! `{}` placeholder substitution for log messages

use std::fmt::{self, Write};

/// Substitutes positional `{}` placeholders in `template` with `args`.
///
/// Placeholders are filled left to right. Arguments left over once the
/// placeholders run out are appended, each preceded by a single space.
/// Placeholders left over once the arguments run out stay in the output
/// verbatim.
///
/// ```
/// use hierlog::core::message::format_message;
///
/// assert_eq!(format_message("This is {}", &[&1]), "This is 1");
/// assert_eq!(format_message("{}, {}", &[&1, &2]), "1, 2");
/// assert_eq!(format_message("no placeholder", &[&1]), "no placeholder 1");
/// assert_eq!(format_message("a {} b {}", &[&"x"]), "a x b {}");
/// ```
pub fn format_message(template: &str, args: &[&dyn fmt::Display]) -> String {
    if args.is_empty() {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len() + args.len() * 8);
    let mut segments = template.splitn(args.len() + 1, "{}");
    let mut remaining = args.iter();

    if let Some(head) = segments.next() {
        out.push_str(head);
    }
    for segment in segments {
        if let Some(arg) = remaining.next() {
            // Writing into a String cannot fail.
            let _ = write!(out, "{}", arg);
        }
        out.push_str(segment);
    }
    for arg in remaining {
        out.push(' ');
        let _ = write!(out, "{}", arg);
    }
    out
}
