//! Attribute table
//!
//! Static definition of the services this device exposes: identifiers,
//! permissions, and current values. Built once at startup and read-mostly
//! afterwards; a characteristic value may be overwritten locally, which
//! uses the same lock discipline as every other shared cell.

use parking_lot::RwLock;
use uuid::Uuid;

use shortwire_core::protocol::{
    CLIENT_CONFIG_DESCRIPTOR_UUID, CONTENT_CHARACTERISTIC_UUID, LINK_SERVICE_UUID,
};

// ----------------------------------------------------------------------------
// Permissions
// ----------------------------------------------------------------------------

/// Access permissions attached to a characteristic or descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Permissions {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
}

impl Permissions {
    pub const fn read_only() -> Self {
        Self {
            read: true,
            write: false,
            notify: false,
        }
    }

    pub const fn read_write() -> Self {
        Self {
            read: true,
            write: true,
            notify: false,
        }
    }

    pub const fn read_notify() -> Self {
        Self {
            read: true,
            write: false,
            notify: true,
        }
    }

    pub const fn allows_read(&self) -> bool {
        self.read
    }

    pub const fn allows_write(&self) -> bool {
        self.write
    }

    pub const fn allows_notify(&self) -> bool {
        self.notify
    }
}

// ----------------------------------------------------------------------------
// Attribute Tree
// ----------------------------------------------------------------------------

/// Descriptor attached to a characteristic.
#[derive(Debug)]
pub struct Descriptor {
    uuid: Uuid,
    permissions: Permissions,
}

impl Descriptor {
    pub fn new(uuid: Uuid, permissions: Permissions) -> Self {
        Self { uuid, permissions }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }
}

/// Characteristic with its current value and descriptors.
#[derive(Debug)]
pub struct Characteristic {
    uuid: Uuid,
    permissions: Permissions,
    value: RwLock<Vec<u8>>,
    descriptors: Vec<Descriptor>,
}

impl Characteristic {
    pub fn new(uuid: Uuid, permissions: Permissions, initial_value: Vec<u8>) -> Self {
        Self {
            uuid,
            permissions,
            value: RwLock::new(initial_value),
            descriptors: Vec::new(),
        }
    }

    /// Attach a descriptor.
    pub fn with_descriptor(mut self, descriptor: Descriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Snapshot of the current value.
    pub fn value(&self) -> Vec<u8> {
        self.value.read().clone()
    }

    /// Overwrite the value locally. Remote peers cannot reach this; the
    /// server is read/notify-only from their perspective.
    pub fn set_value(&self, value: Vec<u8>) {
        *self.value.write() = value;
    }
}

/// Service grouping characteristics.
#[derive(Debug)]
pub struct Service {
    uuid: Uuid,
    primary: bool,
    characteristics: Vec<Characteristic>,
}

impl Service {
    /// A primary service under `uuid`.
    pub fn primary(uuid: Uuid) -> Self {
        Self {
            uuid,
            primary: true,
            characteristics: Vec::new(),
        }
    }

    pub fn with_characteristic(mut self, characteristic: Characteristic) -> Self {
        self.characteristics.push(characteristic);
        self
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn characteristics(&self) -> &[Characteristic] {
        &self.characteristics
    }
}

// ----------------------------------------------------------------------------
// Table
// ----------------------------------------------------------------------------

/// Every service this device exposes. Built once at startup.
#[derive(Debug)]
pub struct AttributeTable {
    services: Vec<Service>,
}

impl AttributeTable {
    pub fn builder() -> AttributeTableBuilder {
        AttributeTableBuilder {
            services: Vec::new(),
        }
    }

    /// The well-known layout this application serves: one content
    /// characteristic (read + notify) with its client configuration
    /// descriptor (read + write).
    pub fn content_service(initial_value: Vec<u8>) -> Self {
        AttributeTable::builder()
            .service(
                Service::primary(LINK_SERVICE_UUID).with_characteristic(
                    Characteristic::new(
                        CONTENT_CHARACTERISTIC_UUID,
                        Permissions::read_notify(),
                        initial_value,
                    )
                    .with_descriptor(Descriptor::new(
                        CLIENT_CONFIG_DESCRIPTOR_UUID,
                        Permissions::read_write(),
                    )),
                ),
            )
            .build()
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Look a characteristic up by identifier.
    pub fn characteristic(&self, uuid: Uuid) -> Option<&Characteristic> {
        self.services
            .iter()
            .flat_map(|service| service.characteristics())
            .find(|characteristic| characteristic.uuid() == uuid)
    }

    /// Look a descriptor up by identifier.
    pub fn descriptor(&self, uuid: Uuid) -> Option<&Descriptor> {
        self.services
            .iter()
            .flat_map(|service| service.characteristics())
            .flat_map(|characteristic| characteristic.descriptors())
            .find(|descriptor| descriptor.uuid() == uuid)
    }
}

/// Builder for [`AttributeTable`].
pub struct AttributeTableBuilder {
    services: Vec<Service>,
}

impl AttributeTableBuilder {
    pub fn service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    pub fn build(self) -> AttributeTable {
        AttributeTable {
            services: self.services,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_service_has_the_well_known_layout() {
        let table = AttributeTable::content_service(b"ready".to_vec());

        let service = &table.services()[0];
        assert_eq!(service.uuid(), LINK_SERVICE_UUID);
        assert!(service.is_primary());

        let characteristic = table
            .characteristic(CONTENT_CHARACTERISTIC_UUID)
            .expect("content characteristic");
        assert!(characteristic.permissions().allows_read());
        assert!(characteristic.permissions().allows_notify());
        assert!(!characteristic.permissions().allows_write());
        assert_eq!(characteristic.value(), b"ready");

        let descriptor = table
            .descriptor(CLIENT_CONFIG_DESCRIPTOR_UUID)
            .expect("config descriptor");
        assert!(descriptor.permissions().allows_read());
        assert!(descriptor.permissions().allows_write());
    }

    #[test]
    fn lookups_miss_unknown_identifiers() {
        let table = AttributeTable::content_service(Vec::new());
        let unknown = Uuid::from_u128(0xDEAD_BEEF);
        assert!(table.characteristic(unknown).is_none());
        assert!(table.descriptor(unknown).is_none());
    }

    #[test]
    fn values_can_be_overwritten_locally() {
        let table = AttributeTable::content_service(b"before".to_vec());
        let characteristic = table.characteristic(CONTENT_CHARACTERISTIC_UUID).unwrap();
        characteristic.set_value(b"after".to_vec());
        assert_eq!(characteristic.value(), b"after");
    }
}
