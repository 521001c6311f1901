/**
 * The last `::` separated segment of an advertised name that marks supported hardware.
 * Example: "kitchen::beverage_notifier"
 */
pub const SUPPORTED_NAME: &str = "beverage_notifier";

/**
 * The delimiter between the segments of an advertised name.
 */
pub const NAME_DELIMITER: &str = "::";

/**
 * How long (seconds) a scan runs before the platform stops it.
 */
pub const DEFAULT_SCAN_DURATION: u64 = 1;

/**
 * Readings strictly below this value (in the scale the peripheral reports) trigger a notification.
 */
pub const DEFAULT_COLD_THRESHOLD: f64 = 20.0;

/**
 * Delay (milliseconds) before the second reconnect attempt. The first attempt after a lost link
 * is always immediate, later attempts double this delay.
 */
pub const RECONNECT_BACKOFF_INITIAL: u64 = 1000;

/**
 * Upper bound (milliseconds) of the delay between reconnect attempts.
 */
pub const RECONNECT_BACKOFF_MAX: u64 = 30_000;

/**
 * Canonical textual shape of a 128-bit UUID: version nibble 0-5, variant nibble 8, 9, a or b.
 */
pub const UUID_128_PATTERN: &str =
    r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-5][0-9a-f]{3}-[089ab][0-9a-f]{3}-[0-9a-f]{12}$";
