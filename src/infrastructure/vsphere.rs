//! vSphere Web Services (vim25) adapter for [`ManagementClient`].

use std::fmt;
use std::time::Duration;
use log::{debug, warn};
use reqwest::Url;
use serde::de::DeserializeOwned;
use crate::domain::{ConfigBag, DiskBacking, VirtualDevice, VirtualDisk, VmInfoError};
use crate::ports::{ManagedObjectRef, ManagementClient};
use super::soap::{SoapError, SoapMethod, SoapResponse, SoapTransport};
use super::vim::{
    self, ContinueRetrievePropertiesEx, Login, Logout, MoRef, ObjectContent, ObjectSpec, PropertyFilterSpec,
    PropertySpec, RetrievePropertiesEx, RetrieveServiceContent, TraversalSpec, VirtualMachineConfigInfo,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const FLAT_VER2_BACKING: &str = "VirtualDiskFlatVer2BackingInfo";
const VIRTUAL_DISK: &str = "VirtualDisk";

/// A logged-in vim25 session: the negotiated API version, the session cookie
/// and the service objects every later call goes through.
pub struct VsphereSession {
    endpoint: Url,
    version: String,
    cookie: String,
    session_manager: MoRef,
    property_collector: MoRef,
    root_folder: MoRef,
}

impl fmt::Debug for VsphereSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VsphereSession")
            .field("endpoint", &self.endpoint.as_str())
            .field("version", &self.version)
            .field("cookie", &"<redacted>")
            .finish()
    }
}

pub struct VsphereSoapClient {
    soap: SoapTransport,
}

impl VsphereSoapClient {
    pub fn new() -> Result<Self, VmInfoError> {
        Ok(Self { soap: SoapTransport::new(CONNECT_TIMEOUT)? })
    }

    async fn call<M: SoapMethod>(&self, session: &VsphereSession, request: &M) -> Result<M::Response, SoapError> {
        let rsp = self.soap.call(&session.endpoint, &session.version, Some(&session.cookie), request).await?;
        Ok(rsp.payload)
    }

    /// RetrievePropertiesEx, following continuation tokens until the result set is drained.
    async fn retrieve<V>(&self, session: &VsphereSession, spec_set: PropertyFilterSpec) -> Result<Vec<ObjectContent<V>>, SoapError>
    where
        V: DeserializeOwned + Send,
    {
        let pc = &session.property_collector;
        let first = self.call(session, &RetrievePropertiesEx::<V>::new(pc, spec_set)).await?;

        let mut objects = Vec::new();
        let mut token = collect_objects(first, &mut objects);

        while let Some(t) = token {
            let next = self.call(session, &ContinueRetrievePropertiesEx::<V>::new(pc, &t)).await?;
            token = collect_objects(next, &mut objects);
        }

        Ok(objects)
    }
}

impl ManagementClient for VsphereSoapClient {
    type Session = VsphereSession;

    async fn login(&self, endpoint: &Url, username: &str, password: &str) -> Result<VsphereSession, VmInfoError> {
        let version = self.soap.service_version(endpoint).await;

        let SoapResponse { payload, cookie: content_cookie } = self.soap
            .call(endpoint, &version, None, &RetrieveServiceContent::new())
            .await
            .map_err(SoapError::into_session_error)?;

        let service = payload.returnval
            .ok_or_else(|| VmInfoError::session("service content missing from RetrieveServiceContent response"))?;
        let missing = |name: &str| VmInfoError::session(format!("service content has no {}", name));
        let session_manager = service.session_manager.ok_or_else(|| missing("sessionManager"))?;
        let property_collector = service.property_collector.ok_or_else(|| missing("propertyCollector"))?;
        let root_folder = service.root_folder.ok_or_else(|| missing("rootFolder"))?;

        let login = self.soap
            .call(endpoint, &version, content_cookie.as_deref(), &Login::new(&session_manager, username, password))
            .await
            .map_err(SoapError::into_session_error)?;

        let cookie = login.cookie.or(content_cookie)
            .ok_or_else(|| VmInfoError::session("server did not issue a session cookie"))?;
        debug!("logged in as {}", username);

        Ok(VsphereSession {
            endpoint: endpoint.clone(),
            version,
            cookie,
            session_manager,
            property_collector,
            root_folder,
        })
    }

    async fn default_datacenter(&self, session: &VsphereSession) -> Result<ManagedObjectRef, VmInfoError> {
        let mut found = self.retrieve::<String>(session, datacenter_spec(&session.root_folder)).await
            .map_err(SoapError::into_lookup_error)?;

        match found.len() {
            0 => Err(VmInfoError::lookup("failed to find default datacenter: no datacenter found")),
            1 => Ok(found.remove(0).obj.into()),
            n => Err(VmInfoError::lookup(format!(
                "failed to find default datacenter: {} datacenters found, default datacenter resolves to multiple instances", n
            ))),
        }
    }

    async fn find_vm(&self, session: &VsphereSession, datacenter: &ManagedObjectRef, name: &str) -> Result<ManagedObjectRef, VmInfoError> {
        let all = self.retrieve::<String>(session, vm_name_spec(datacenter)).await
            .map_err(SoapError::into_lookup_error)?;

        let mut matches: Vec<ManagedObjectRef> = all.into_iter()
            .filter(|o| o.prop("name").map(String::as_str) == Some(name))
            .map(|o| o.obj.into())
            .collect();

        match matches.len() {
            0 => Err(VmInfoError::lookup(format!("failed to find VM \"{}\": vm '{}' not found", name, name))),
            1 => Ok(matches.remove(0)),
            _ => Err(VmInfoError::lookup(format!("failed to find VM \"{}\": path '{}' resolves to multiple virtual machines", name, name))),
        }
    }

    async fn fetch_config(&self, session: &VsphereSession, vm: &ManagedObjectRef) -> Result<ConfigBag, VmInfoError> {
        let wanted = MoRef::from(vm);
        let found = self.retrieve::<VirtualMachineConfigInfo>(session, vm_config_spec(vm)).await
            .map_err(SoapError::into_lookup_error)?;

        let config = found.into_iter()
            .find(|o| o.obj == wanted)
            .and_then(|o| o.into_prop("config"))
            .ok_or_else(|| VmInfoError::lookup(format!("failed to get VM properties: {} has no config", vm)))?;

        config_bag(config)
    }

    async fn logout(&self, session: VsphereSession) {
        match self.call(&session, &Logout::new(&session.session_manager)).await {
            Ok(_) => debug!("logged out"),
            Err(e) => warn!("logout failed: {}", e),
        }
    }
}

/// Appends the objects of one RetrieveResult and returns its continuation token.
fn collect_objects<V>(response: vim::Returnval<vim::RetrieveResult<V>>, out: &mut Vec<ObjectContent<V>>) -> Option<String> {
    // An empty result set comes back without a returnval.
    let result = response.returnval?;
    out.extend(result.objects);
    result.token.filter(|t| !t.is_empty())
}

fn folder_traversal() -> Vec<TraversalSpec> {
    vec![
        TraversalSpec::new("folderTraversal", "Folder", "childEntity", vec![
            TraversalSpec::by_name("folderTraversal"),
            TraversalSpec::by_name("vappTraversal"),
        ]),
        TraversalSpec::new("vappTraversal", "VirtualApp", "vm", Vec::new()),
    ]
}

fn datacenter_spec(root_folder: &MoRef) -> PropertyFilterSpec {
    PropertyFilterSpec {
        prop_set: PropertySpec { kind: "Datacenter", path_set: vec!["name"] },
        object_set: ObjectSpec { obj: root_folder.clone(), skip: true, select_set: folder_traversal() },
    }
}

fn vm_name_spec(datacenter: &ManagedObjectRef) -> PropertyFilterSpec {
    let mut select_set = vec![
        TraversalSpec::new("dcToVmFolder", "Datacenter", "vmFolder", vec![TraversalSpec::by_name("folderTraversal")]),
    ];
    select_set.extend(folder_traversal());

    PropertyFilterSpec {
        prop_set: PropertySpec { kind: "VirtualMachine", path_set: vec!["name"] },
        object_set: ObjectSpec { obj: datacenter.into(), skip: true, select_set },
    }
}

fn vm_config_spec(vm: &ManagedObjectRef) -> PropertyFilterSpec {
    PropertyFilterSpec {
        prop_set: PropertySpec { kind: "VirtualMachine", path_set: vec!["config"] },
        object_set: ObjectSpec { obj: vm.into(), skip: false, select_set: Vec::new() },
    }
}

fn config_bag(config: VirtualMachineConfigInfo) -> Result<ConfigBag, VmInfoError> {
    let malformed = |what: &str| VmInfoError::lookup(format!("failed to get VM properties: config has no {}", what));

    let uuid = config.uuid.ok_or_else(|| malformed("uuid"))?;
    let hardware = config.hardware.ok_or_else(|| malformed("hardware"))?;
    let num_cpu = hardware.num_cpu.ok_or_else(|| malformed("numCPU"))?;
    let memory_mb = hardware.memory_mb.ok_or_else(|| malformed("memoryMB"))?;

    let devices = hardware.devices.into_iter()
        .map(device)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ConfigBag { uuid, num_cpu, memory_mb, firmware: config.firmware, devices })
}

fn device(dev: vim::VirtualDevice) -> Result<VirtualDevice, VmInfoError> {
    let kind = dev.kind.unwrap_or_else(|| "VirtualDevice".to_string());
    if kind != VIRTUAL_DISK {
        return Ok(VirtualDevice::Other { kind });
    }

    let capacity_in_kb = dev.capacity_in_kb.or(dev.capacity_in_bytes.map(|b| b / 1024));

    let backing = match dev.backing {
        Some(b) if b.kind.as_deref() == Some(FLAT_VER2_BACKING) => {
            let file_name = b.file_name
                .ok_or_else(|| VmInfoError::lookup("failed to get VM properties: disk backing has no fileName"))?;
            if capacity_in_kb.is_none() {
                return Err(VmInfoError::lookup(format!("failed to get VM properties: virtual disk {} has no capacity", file_name)));
            }
            DiskBacking::FlatVer2 { file_name }
        }
        Some(b) => DiskBacking::Other { kind: b.kind.unwrap_or_else(|| "VirtualDeviceBackingInfo".to_string()) },
        None => DiskBacking::Other { kind: String::new() },
    };

    Ok(VirtualDevice::Disk(VirtualDisk { capacity_in_kb, backing }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::soap::decode;
    use crate::infrastructure::vim::{Returnval, RetrieveResult};

    const CONFIG_VAL: &str = r#"<val xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="VirtualMachineConfigInfo">
        <name>web01</name>
        <uuid>abc-123</uuid>
        <firmware>efi</firmware>
        <hardware>
          <numCPU>2</numCPU>
          <numCoresPerSocket>1</numCoresPerSocket>
          <memoryMB>2048</memoryMB>
          <device xsi:type="VirtualIDEController"><key>200</key><busNumber>0</busNumber><device>3000</device></device>
          <device xsi:type="VirtualDisk">
            <key>2000</key>
            <deviceInfo><label>Hard disk 1</label><summary>133,169,152 KB</summary></deviceInfo>
            <backing xsi:type="VirtualDiskFlatVer2BackingInfo">
              <fileName>[ds] a.vmdk</fileName>
              <datastore type="Datastore">datastore-11</datastore>
              <diskMode>persistent</diskMode>
            </backing>
            <capacityInKB>133169152</capacityInKB>
            <capacityInBytes>136365211648</capacityInBytes>
          </device>
          <device xsi:type="VirtualDisk">
            <key>2001</key>
            <backing xsi:type="VirtualDiskRawDiskMappingVer1BackingInfo"><fileName>[ds] rdm.vmdk</fileName></backing>
            <capacityInKB>1048576</capacityInKB>
          </device>
          <device xsi:type="VirtualVmxnet3"><key>4000</key></device>
        </hardware>
      </val>"#;

    fn parse(xml: &str) -> Result<ConfigBag, VmInfoError> {
        config_bag(decode::<VirtualMachineConfigInfo>(xml).unwrap())
    }

    #[test]
    fn parses_config_into_tagged_devices() {
        let bag = parse(CONFIG_VAL).unwrap();

        assert_eq!(bag.uuid, "abc-123");
        assert_eq!(bag.num_cpu, 2);
        assert_eq!(bag.memory_mb, 2048);
        assert!(bag.is_efi());
        assert_eq!(bag.devices.len(), 4);
        assert_eq!(bag.devices[0], VirtualDevice::Other { kind: "VirtualIDEController".to_string() });
        assert_eq!(bag.devices[1].flat_v2_disk(), Some(("[ds] a.vmdk", 133_169_152)));
        assert!(bag.devices[2].is_virtual_disk());
        assert_eq!(bag.devices[2].flat_v2_disk(), None);
        assert!(!bag.devices[3].is_virtual_disk());
    }

    #[test]
    fn capacity_falls_back_to_bytes() {
        let bag = parse(r#"<val xmlns:xsi="x"><uuid>u</uuid><hardware><numCPU>1</numCPU><memoryMB>512</memoryMB>
            <device xsi:type="VirtualDisk">
              <backing xsi:type="VirtualDiskFlatVer2BackingInfo"><fileName>[ds] b.vmdk</fileName></backing>
              <capacityInBytes>2147483648</capacityInBytes>
            </device></hardware></val>"#).unwrap();
        assert_eq!(bag.devices[0].flat_v2_disk(), Some(("[ds] b.vmdk", 2_097_152)));
    }

    #[test]
    fn capacity_is_only_required_for_flat_disks() {
        let bag = parse(r#"<val xmlns:xsi="x"><uuid>u</uuid><hardware><numCPU>1</numCPU><memoryMB>512</memoryMB>
            <device xsi:type="VirtualDisk">
              <backing xsi:type="VirtualDiskSparseVer2BackingInfo"><fileName>[ds] sparse.vmdk</fileName></backing>
            </device></hardware></val>"#).unwrap();
        assert!(bag.devices[0].is_virtual_disk());
        assert_eq!(bag.devices[0].flat_v2_disk(), None);

        let err = parse(r#"<val xmlns:xsi="x"><uuid>u</uuid><hardware><numCPU>1</numCPU><memoryMB>512</memoryMB>
            <device xsi:type="VirtualDisk">
              <backing xsi:type="VirtualDiskFlatVer2BackingInfo"><fileName>[ds] flat.vmdk</fileName></backing>
            </device></hardware></val>"#).unwrap_err();
        assert_eq!(err.class, crate::domain::ErrorClass::Lookup);
        assert!(err.message.contains("[ds] flat.vmdk has no capacity"), "{}", err.message);
    }

    #[test]
    fn backing_file_keeps_its_spaces() {
        let bag = parse(r#"<val xmlns:xsi="x"><uuid> u-1 </uuid><hardware><numCPU>1</numCPU><memoryMB>512</memoryMB>
            <device xsi:type="VirtualDisk">
              <backing xsi:type="VirtualDiskFlatVer2BackingInfo"><fileName>[ds] my vm/disk .vmdk </fileName></backing>
              <capacityInKB>1024</capacityInKB>
            </device></hardware></val>"#).unwrap();
        assert_eq!(bag.uuid, " u-1 ");
        assert_eq!(bag.devices[0].flat_v2_disk(), Some(("[ds] my vm/disk .vmdk ", 1024)));
    }

    #[test]
    fn missing_firmware_is_none() {
        let bag = parse("<val><uuid>u</uuid><hardware><numCPU>1</numCPU><memoryMB>512</memoryMB></hardware></val>").unwrap();
        assert_eq!(bag.firmware, None);
        assert!(bag.devices.is_empty());
    }

    #[test]
    fn missing_hardware_is_lookup_error() {
        let err = parse("<val><uuid>u</uuid></val>").unwrap_err();
        assert_eq!(err.class, crate::domain::ErrorClass::Lookup);
        assert!(err.message.contains("hardware"));
    }

    #[test]
    fn collects_objects_and_token() {
        let rsp: Returnval<RetrieveResult<String>> = decode(r#"<RetrievePropertiesExResponse><returnval>
            <token>session[1]2</token>
            <objects><obj type="VirtualMachine">vm-1</obj><propSet><name>name</name><val>web01</val></propSet></objects>
            <objects><obj type="VirtualMachine">vm-2</obj><propSet><name>name</name><val>db01</val></propSet></objects>
            </returnval></RetrievePropertiesExResponse>"#).unwrap();
        let mut out = Vec::new();
        let token = collect_objects(rsp, &mut out);
        assert_eq!(token.as_deref(), Some("session[1]2"));
        assert_eq!(out.len(), 2);
        assert_eq!(ManagedObjectRef::from(out[1].obj.clone()), ManagedObjectRef::new("VirtualMachine", "vm-2"));
        assert_eq!(out[1].prop("name").map(String::as_str), Some("db01"));
    }

    #[test]
    fn padded_names_are_kept_verbatim() {
        let rsp: Returnval<RetrieveResult<String>> = decode(r#"<RetrievePropertiesExResponse><returnval>
            <objects><obj type="VirtualMachine">vm-1</obj><propSet><name>name</name><val> web01 </val></propSet></objects>
            </returnval></RetrievePropertiesExResponse>"#).unwrap();
        let mut out = Vec::new();
        collect_objects(rsp, &mut out);
        assert_eq!(out[0].prop("name").map(String::as_str), Some(" web01 "));
        assert_ne!(out[0].prop("name").map(String::as_str), Some("web01"));
    }

    #[test]
    fn empty_result_has_no_objects() {
        let rsp: Returnval<RetrieveResult<String>> = decode("<RetrievePropertiesExResponse/>").unwrap();
        let mut out = Vec::new();
        assert_eq!(collect_objects(rsp, &mut out), None);
        assert!(out.is_empty());
    }

    #[test]
    fn filter_specs_serialize_as_traversal_specs() {
        let xml = quick_xml::se::to_string_with_root("specSet", &vm_name_spec(&ManagedObjectRef::new("Datacenter", "datacenter-3"))).unwrap();
        assert!(xml.starts_with(
            r#"<specSet><propSet><type>VirtualMachine</type><pathSet>name</pathSet></propSet><objectSet><obj type="Datacenter">datacenter-3</obj><skip>true</skip>"#
        ), "{}", xml);
        assert!(xml.contains(
            r#"<selectSet xsi:type="TraversalSpec"><name>dcToVmFolder</name><type>Datacenter</type><path>vmFolder</path><skip>false</skip><selectSet><name>folderTraversal</name></selectSet></selectSet>"#
        ), "{}", xml);
        assert!(xml.contains(r#"<selectSet xsi:type="TraversalSpec"><name>vappTraversal</name><type>VirtualApp</type><path>vm</path><skip>false</skip></selectSet>"#));
    }
}
