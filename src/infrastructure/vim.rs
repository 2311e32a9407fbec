//! vim25 request and response types, named after the WSDL.

use std::marker::PhantomData;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use crate::ports::ManagedObjectRef;
use super::soap::{SoapMethod, VIM25_NS};

/// `<tag type="Kind">value</tag>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoRef {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "$text")]
    pub value: String,
}

impl From<&ManagedObjectRef> for MoRef {
    fn from(r: &ManagedObjectRef) -> Self {
        Self { kind: r.kind.clone(), value: r.value.clone() }
    }
}

impl From<MoRef> for ManagedObjectRef {
    fn from(r: MoRef) -> Self {
        ManagedObjectRef::new(r.kind, r.value)
    }
}

#[derive(Debug, Deserialize)]
pub struct Returnval<T> {
    pub returnval: Option<T>,
}

#[derive(Serialize)]
pub struct RetrieveServiceContent {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "_this")]
    this: MoRef,
}

impl RetrieveServiceContent {
    pub fn new() -> Self {
        Self {
            xmlns: VIM25_NS,
            this: MoRef { kind: "ServiceInstance".to_string(), value: "ServiceInstance".to_string() },
        }
    }
}

impl SoapMethod for RetrieveServiceContent {
    const NAME: &'static str = "RetrieveServiceContent";
    type Response = Returnval<ServiceContent>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceContent {
    pub root_folder: Option<MoRef>,
    pub property_collector: Option<MoRef>,
    pub session_manager: Option<MoRef>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Login<'a> {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "_this")]
    this: &'a MoRef,
    user_name: &'a str,
    password: &'a str,
}

impl<'a> Login<'a> {
    pub fn new(session_manager: &'a MoRef, user_name: &'a str, password: &'a str) -> Self {
        Self { xmlns: VIM25_NS, this: session_manager, user_name, password }
    }
}

impl SoapMethod for Login<'_> {
    const NAME: &'static str = "Login";
    type Response = IgnoredAny;
}

#[derive(Serialize)]
pub struct Logout<'a> {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "_this")]
    this: &'a MoRef,
}

impl<'a> Logout<'a> {
    pub fn new(session_manager: &'a MoRef) -> Self {
        Self { xmlns: VIM25_NS, this: session_manager }
    }
}

impl SoapMethod for Logout<'_> {
    const NAME: &'static str = "Logout";
    type Response = IgnoredAny;
}

/// RetrievePropertiesEx over one filter spec; `V` is the type of the single
/// property the spec asks for.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievePropertiesEx<'a, V> {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "_this")]
    this: &'a MoRef,
    spec_set: PropertyFilterSpec,
    options: RetrieveOptions,
    #[serde(skip)]
    val: PhantomData<fn() -> V>,
}

impl<'a, V> RetrievePropertiesEx<'a, V> {
    pub fn new(property_collector: &'a MoRef, spec_set: PropertyFilterSpec) -> Self {
        Self {
            xmlns: VIM25_NS,
            this: property_collector,
            spec_set,
            options: RetrieveOptions::default(),
            val: PhantomData,
        }
    }
}

impl<V: DeserializeOwned> SoapMethod for RetrievePropertiesEx<'_, V> {
    const NAME: &'static str = "RetrievePropertiesEx";
    type Response = Returnval<RetrieveResult<V>>;
}

#[derive(Serialize)]
pub struct ContinueRetrievePropertiesEx<'a, V> {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "_this")]
    this: &'a MoRef,
    token: &'a str,
    #[serde(skip)]
    val: PhantomData<fn() -> V>,
}

impl<'a, V> ContinueRetrievePropertiesEx<'a, V> {
    pub fn new(property_collector: &'a MoRef, token: &'a str) -> Self {
        Self { xmlns: VIM25_NS, this: property_collector, token, val: PhantomData }
    }
}

impl<V: DeserializeOwned> SoapMethod for ContinueRetrievePropertiesEx<'_, V> {
    const NAME: &'static str = "ContinueRetrievePropertiesEx";
    type Response = Returnval<RetrieveResult<V>>;
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_objects: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyFilterSpec {
    pub prop_set: PropertySpec,
    pub object_set: ObjectSpec,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySpec {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub path_set: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSpec {
    pub obj: MoRef,
    pub skip: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub select_set: Vec<TraversalSpec>,
}

/// A `TraversalSpec` when `type` and `path` are set, otherwise a plain
/// `SelectionSpec` naming a traversal declared elsewhere in the filter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalSpec {
    #[serde(rename = "@xsi:type", skip_serializing_if = "Option::is_none")]
    xsi_type: Option<&'static str>,
    name: &'static str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    select_set: Vec<TraversalSpec>,
}

impl TraversalSpec {
    pub fn new(name: &'static str, kind: &'static str, path: &'static str, select_set: Vec<TraversalSpec>) -> Self {
        Self {
            xsi_type: Some("TraversalSpec"),
            name,
            kind: Some(kind),
            path: Some(path),
            skip: Some(false),
            select_set,
        }
    }

    pub fn by_name(name: &'static str) -> Self {
        Self { xsi_type: None, name, kind: None, path: None, skip: None, select_set: Vec::new() }
    }
}

#[derive(Debug, Deserialize)]
pub struct RetrieveResult<V> {
    pub token: Option<String>,
    #[serde(default = "Vec::new")]
    pub objects: Vec<ObjectContent<V>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectContent<V> {
    pub obj: MoRef,
    #[serde(default = "Vec::new")]
    pub prop_set: Vec<DynamicProperty<V>>,
}

impl<V> ObjectContent<V> {
    pub fn prop(&self, name: &str) -> Option<&V> {
        self.prop_set.iter().find(|p| p.name == name).map(|p| &p.val)
    }

    pub fn into_prop(self, name: &str) -> Option<V> {
        self.prop_set.into_iter().find(|p| p.name == name).map(|p| p.val)
    }
}

#[derive(Debug, Deserialize)]
pub struct DynamicProperty<V> {
    pub name: String,
    pub val: V,
}

/// The parts of `VirtualMachineConfigInfo` the report needs.
#[derive(Debug, Deserialize)]
pub struct VirtualMachineConfigInfo {
    pub uuid: Option<String>,
    pub firmware: Option<String>,
    pub hardware: Option<VirtualHardware>,
}

#[derive(Debug, Deserialize)]
pub struct VirtualHardware {
    #[serde(rename = "numCPU")]
    pub num_cpu: Option<i32>,
    #[serde(rename = "memoryMB")]
    pub memory_mb: Option<i64>,
    #[serde(rename = "device", default = "Vec::new")]
    pub devices: Vec<VirtualDevice>,
}

/// Any `VirtualDevice` subtype; `kind` carries its `xsi:type`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualDevice {
    #[serde(rename = "@type")]
    pub kind: Option<String>,
    pub backing: Option<VirtualDeviceBackingInfo>,
    #[serde(rename = "capacityInKB")]
    pub capacity_in_kb: Option<i64>,
    pub capacity_in_bytes: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualDeviceBackingInfo {
    #[serde(rename = "@type")]
    pub kind: Option<String>,
    pub file_name: Option<String>,
}
