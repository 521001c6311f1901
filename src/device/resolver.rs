use once_cell::sync::Lazy;
use regex::Regex;

use crate::device::constants::UUID_128_PATTERN;
use crate::device::types::ServiceDescriptor;

static UUID_128: Lazy<Regex> = Lazy::new(|| Regex::new(UUID_128_PATTERN).expect("invalid UUID pattern"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedUuids {
    pub service: Option<String>,
    pub characteristic: Option<String>,
}

impl ResolvedUuids {
    /// Both UUIDs, if both resolved.
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (&self.service, &self.characteristic) {
            (Some(service), Some(characteristic)) => Some((service, characteristic)),
            _ => None,
        }
    }
}

pub fn is_uuid_128(value: &str) -> bool {
    UUID_128.is_match(value)
}

/// Picks the service and characteristic to subscribe to from a discovery result.
///
/// Only values shaped like a canonical 128-bit UUID are considered. Each list is walked to the
/// end and the *last* matching entry wins, so a peripheral that reports several 128-bit services
/// resolves to the one it lists last. If either list is missing nothing is resolved.
pub fn resolve(descriptor: &ServiceDescriptor) -> ResolvedUuids {
    let (services, characteristics) = match (&descriptor.services, &descriptor.characteristics) {
        (Some(services), Some(characteristics)) => (services, characteristics),
        _ => return ResolvedUuids::default(),
    };

    let mut result = ResolvedUuids::default();

    for service in services {
        if is_uuid_128(&service.uuid) {
            result.service = Some(service.uuid.clone());
        }
    }

    for record in characteristics {
        if is_uuid_128(&record.characteristic) {
            result.characteristic = Some(record.characteristic.clone());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::types::{CharacteristicRecord, ServiceRecord};

    fn services(uuids: &[&str]) -> Option<Vec<ServiceRecord>> {
        Some(uuids.iter().map(|uuid| ServiceRecord { uuid: uuid.to_string() }).collect())
    }

    fn characteristics(uuids: &[&str]) -> Option<Vec<CharacteristicRecord>> {
        Some(
            uuids
                .iter()
                .map(|uuid| CharacteristicRecord {
                    service: "b0000000-0000-1000-9000-000000000000".to_string(),
                    characteristic: uuid.to_string(),
                })
                .collect(),
        )
    }

    #[test]
    fn missing_lists_resolve_nothing() {
        let empty = ResolvedUuids::default();

        assert_eq!(resolve(&ServiceDescriptor::default()), empty);
        assert_eq!(
            resolve(&ServiceDescriptor {
                services: services(&["a0000000-0000-1000-8000-000000000000"]),
                characteristics: None,
            }),
            empty
        );
        assert_eq!(
            resolve(&ServiceDescriptor {
                services: None,
                characteristics: characteristics(&["c0000000-0000-1000-8000-000000000000"]),
            }),
            empty
        );
    }

    #[test]
    fn last_valid_service_wins() {
        let descriptor = ServiceDescriptor {
            services: services(&[
                "a0000000-0000-1000-8000-000000000000",
                "not-a-uuid",
                "b0000000-0000-1000-9000-000000000000",
            ]),
            characteristics: Some(vec![]),
        };

        let resolved = resolve(&descriptor);
        assert_eq!(resolved.service.as_deref(), Some("b0000000-0000-1000-9000-000000000000"));
        assert_eq!(resolved.characteristic, None);
        assert_eq!(resolved.pair(), None);
    }

    #[test]
    fn invalid_entry_after_valid_one_keeps_valid() {
        let descriptor = ServiceDescriptor {
            services: services(&["a0000000-0000-1000-8000-000000000000", "1800"]),
            characteristics: characteristics(&["2a00", "c0000000-0000-1000-8000-000000000000", "2a19"]),
        };

        let resolved = resolve(&descriptor);
        assert_eq!(
            resolved.pair(),
            Some(("a0000000-0000-1000-8000-000000000000", "c0000000-0000-1000-8000-000000000000"))
        );
    }

    #[test]
    fn short_uuids_never_match() {
        let descriptor = ServiceDescriptor {
            services: services(&["1800", "180f"]),
            characteristics: characteristics(&["2a19"]),
        };

        assert_eq!(resolve(&descriptor), ResolvedUuids::default());
    }

    #[test]
    fn uuid_shape() {
        assert!(is_uuid_128("bc2f4cc6-aaef-4351-9034-d66268e328f0"));
        assert!(is_uuid_128("BC2F4CC6-AAEF-4351-9034-D66268E328F0"));
        assert!(is_uuid_128("0000180f-0000-1000-8000-00805f9b34fb"));
        // version nibble out of range
        assert!(!is_uuid_128("bc2f4cc6-aaef-6351-9034-d66268e328f0"));
        // variant nibble out of range
        assert!(!is_uuid_128("bc2f4cc6-aaef-4351-c034-d66268e328f0"));
        assert!(!is_uuid_128("bc2f4cc6aaef43519034d66268e328f0"));
        assert!(!is_uuid_128(" bc2f4cc6-aaef-4351-9034-d66268e328f0"));
        assert!(!is_uuid_128(""));
    }

    #[test]
    fn deterministic() {
        let descriptor = ServiceDescriptor {
            services: services(&["a0000000-0000-1000-8000-000000000000"]),
            characteristics: characteristics(&["c0000000-0000-1000-8000-000000000000"]),
        };

        assert_eq!(resolve(&descriptor), resolve(&descriptor));
    }
}
