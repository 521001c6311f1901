use crate::device::constants::NAME_DELIMITER;

/// Returns true if an advertised name belongs to supported hardware.
///
/// The name is split on `::` and only the final segment is compared, so both
/// `beverage_notifier` and `desk::beverage_notifier` match while
/// `beverage_notifier::desk` does not. A peripheral without a name never matches.
pub fn is_supported(name: Option<&str>, supported_tag: &str) -> bool {
    match name {
        None => false,
        Some(name) => name
            .rsplit(NAME_DELIMITER)
            .next()
            .map(|segment| segment == supported_tag)
            .unwrap_or(false),
    }
}
