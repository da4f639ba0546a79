//! Bulk inventory fetch: resolve managed object references by type and
//! name through the vCenter list endpoints.

use crate::error::{VmwareError, VmwareResult};
use crate::types::{InventoryKind, ManagedObjectReference};
use crate::vsphere::VimPort;

use serde_json::Value;
use std::collections::HashMap;

/// Property holding an object's display name.
pub const PROP_ME_NAME: &str = "name";

#[derive(Clone)]
pub struct GetMoref {
    port: VimPort,
}

impl GetMoref {
    pub fn new(port: VimPort) -> Self {
        Self { port }
    }

    /// All objects of `kind`, keyed by name.
    pub async fn in_container_by_type(
        &self,
        kind: InventoryKind,
    ) -> VmwareResult<HashMap<String, ManagedObjectReference>> {
        let items: Vec<Value> = self.port.get(kind.list_path()).await?;
        index_by_name(kind, &items)
    }

    /// First object of `kind` with the given name.
    pub async fn by_name(
        &self,
        kind: InventoryKind,
        name: &str,
    ) -> VmwareResult<Option<ManagedObjectReference>> {
        let items: Vec<Value> = self
            .port
            .get_with_params(kind.list_path(), &[("names".into(), name.to_string())])
            .await?;
        Ok(index_by_name(kind, &items)?.remove(name))
    }

    pub async fn vm_by_name(&self, name: &str) -> VmwareResult<Option<ManagedObjectReference>> {
        self.by_name(InventoryKind::VirtualMachine, name).await
    }

    pub async fn host_by_name(&self, name: &str) -> VmwareResult<Option<ManagedObjectReference>> {
        self.by_name(InventoryKind::HostSystem, name).await
    }

    /// Full property document of one object.
    pub async fn entity_props(&self, moref: &ManagedObjectReference) -> VmwareResult<Value> {
        let kind = kind_of(moref)?;
        let path = format!("{}/{}", kind.list_path(), moref.value);
        self.port.get(&path).await
    }
}

fn kind_of(moref: &ManagedObjectReference) -> VmwareResult<InventoryKind> {
    const ALL: [InventoryKind; 8] = [
        InventoryKind::Folder,
        InventoryKind::Datacenter,
        InventoryKind::ClusterComputeResource,
        InventoryKind::HostSystem,
        InventoryKind::VirtualMachine,
        InventoryKind::Datastore,
        InventoryKind::Network,
        InventoryKind::ResourcePool,
    ];
    ALL.into_iter()
        .find(|k| k.type_name() == moref.kind)
        .ok_or_else(|| VmwareError::not_found(format!("No inventory endpoint for type '{}'", moref.kind)))
}

fn index_by_name(
    kind: InventoryKind,
    items: &[Value],
) -> VmwareResult<HashMap<String, ManagedObjectReference>> {
    let mut out = HashMap::with_capacity(items.len());
    for item in items {
        let id = item.get(kind.id_field()).and_then(Value::as_str);
        let name = item.get(PROP_ME_NAME).and_then(Value::as_str);
        match (id, name) {
            (Some(id), Some(name)) => {
                out.insert(name.to_string(), ManagedObjectReference::new(kind.type_name(), id));
            }
            _ => {
                return Err(VmwareError::parse(format!(
                    "{} entry lacks '{}' or '{}': {item}",
                    kind.type_name(),
                    kind.id_field(),
                    PROP_ME_NAME
                )))
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VmwareErrorKind;
    use serde_json::json;

    #[test]
    fn indexes_list_response_by_name() {
        let items = vec![
            json!({"vm": "vm-42", "name": "web01", "power_state": "POWERED_ON"}),
            json!({"vm": "vm-43", "name": "db01", "power_state": "POWERED_OFF"}),
        ];
        let map = index_by_name(InventoryKind::VirtualMachine, &items).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["web01"], ManagedObjectReference::new("VirtualMachine", "vm-42"));
    }

    #[test]
    fn resource_pool_uses_snake_case_id() {
        let items = vec![json!({"resource_pool": "resgroup-8", "name": "Resources"})];
        let map = index_by_name(InventoryKind::ResourcePool, &items).unwrap();
        assert_eq!(map["Resources"].value, "resgroup-8");
    }

    #[test]
    fn malformed_entry_is_a_parse_error() {
        let items = vec![json!({"host": "host-9"})];
        let err = index_by_name(InventoryKind::HostSystem, &items).unwrap_err();
        assert_eq!(err.kind, VmwareErrorKind::ParseError);
    }

    #[test]
    fn kind_lookup_by_type_name() {
        let moref = ManagedObjectReference::new("Datastore", "datastore-11");
        assert_eq!(kind_of(&moref).unwrap(), InventoryKind::Datastore);
        assert!(kind_of(&ManagedObjectReference::new("ServiceInstance", "ServiceInstance")).is_err());
    }
}
