//! Styled markers for console output.

use console::{style, StyledObject};

/// Green check mark.
pub fn success() -> StyledObject<&'static str> {
    style("✓").green()
}

/// Yellow exclamation mark.
pub fn warn() -> StyledObject<&'static str> {
    style("!").yellow()
}

/// Dim arrow for secondary lines.
pub fn dim_arrow() -> StyledObject<&'static str> {
    style("→").dim()
}

/// Dim bullet for list items.
pub fn bullet() -> StyledObject<&'static str> {
    style("•").dim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icons_render() {
        for icon in [success(), warn(), dim_arrow(), bullet()] {
            assert!(!icon.to_string().is_empty());
        }
    }
}
