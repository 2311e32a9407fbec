use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;
use log::debug;
use quick_xml::events::{BytesCData, Event};
use quick_xml::{Reader, Writer};
use reqwest::header::{HeaderMap, CONTENT_TYPE, COOKIE, SET_COOKIE, USER_AGENT};
use reqwest::{Client, Url};
use serde::de::{DeserializeOwned, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use crate::domain::VmInfoError;

pub const VIM25_NS: &str = "urn:vim25";
/// Used when the server does not publish `vimServiceVersions.xml`.
pub const FALLBACK_VERSION: &str = "6.7";
const SESSION_COOKIE: &str = "vmware_soap_session";
const SERVICE_VERSIONS: &str = "vimServiceVersions.xml";

const SOAPENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// A vim25 operation: the request element plus the payload of its `{NAME}Response`.
pub trait SoapMethod: Serialize + Sync {
    const NAME: &'static str;
    type Response: DeserializeOwned;
}

#[derive(Debug)]
pub enum SoapError {
    /// The request never produced a SOAP envelope.
    Transport(String),
    /// The server answered with a SOAP fault.
    Fault { method: String, message: String },
    /// The envelope did not have the expected shape.
    Malformed(String),
}

impl fmt::Display for SoapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoapError::Transport(msg) => write!(f, "{}", msg),
            SoapError::Fault { method, message } => write!(f, "{} failed: {}", method, message),
            SoapError::Malformed(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

impl SoapError {
    pub fn into_session_error(self) -> VmInfoError {
        VmInfoError::session(self.to_string())
    }

    /// Faults after login mean the object could not be resolved; transport errors stay session errors.
    pub fn into_lookup_error(self) -> VmInfoError {
        match self {
            SoapError::Transport(_) => VmInfoError::session(self.to_string()),
            _ => VmInfoError::lookup(self.to_string()),
        }
    }
}

pub struct SoapResponse<T> {
    pub payload: T,
    /// `vmware_soap_session=...` pair when the server set one.
    pub cookie: Option<String>,
}

pub struct SoapTransport {
    client: Client,
}

impl SoapTransport {
    pub fn new(connect_timeout: Duration) -> Result<Self, VmInfoError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| VmInfoError::other(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Newest vim25 version the server announces, or [`FALLBACK_VERSION`].
    pub async fn service_version(&self, endpoint: &Url) -> String {
        match self.fetch_service_version(endpoint).await {
            Ok(version) => {
                debug!("server speaks {}/{}", VIM25_NS, version);
                version
            }
            Err(e) => {
                debug!("using {}/{}: {}", VIM25_NS, FALLBACK_VERSION, e);
                FALLBACK_VERSION.to_string()
            }
        }
    }

    async fn fetch_service_version(&self, endpoint: &Url) -> Result<String, String> {
        let mut url = endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| format!("{} cannot carry a path", endpoint))?
            .pop_if_empty()
            .push(SERVICE_VERSIONS);

        let rsp = self.client.get(url.clone()).send().await
            .map_err(|e| format!("GET {} failed: {}", url, e))?;
        if !rsp.status().is_success() {
            return Err(format!("GET {} returned HTTP {}", url, rsp.status()));
        }
        let text = rsp.text().await.map_err(|e| e.to_string())?;
        let doc: ServiceVersions = decode(&text)?;

        doc.namespaces.into_iter()
            .find(|ns| ns.name == VIM25_NS)
            .map(|ns| ns.version)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| format!("{} does not list {}", SERVICE_VERSIONS, VIM25_NS))
    }

    pub async fn call<M: SoapMethod>(
        &self,
        endpoint: &Url,
        version: &str,
        cookie: Option<&str>,
        request: &M,
    ) -> Result<SoapResponse<M::Response>, SoapError> {
        let method = M::NAME;
        let body = envelope(request)
            .map_err(|e| SoapError::Malformed(format!("cannot encode {}: {}", method, e)))?;

        debug!(">> {} {}", method, endpoint);
        let mut req = self.client.post(endpoint.clone())
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header(USER_AGENT, concat!("vminfo/", env!("CARGO_PKG_VERSION")))
            .header("SOAPAction", format!("{}/{}", VIM25_NS, version));
        if let Some(cookie) = cookie {
            req = req.header(COOKIE, cookie);
        }

        let rsp = req.body(body).send().await
            .map_err(|e| SoapError::Transport(format!("{} request to {} failed: {}", method, endpoint, e)))?;

        let status = rsp.status();
        let cookie = session_cookie(rsp.headers());
        let text = rsp.text().await
            .map_err(|e| SoapError::Transport(format!("failed to read {} response: {}", method, e)))?;
        debug!("<< {} {}", method, status);

        let doc: ResponseEnvelope<M> = decode(&text).map_err(|e| {
            if status.is_success() {
                SoapError::Malformed(format!("{}: {}", method, e))
            } else {
                SoapError::Transport(format!("{} returned HTTP {}", method, status))
            }
        })?;

        match doc.body {
            ResponseBody::Fault(fault) => Err(SoapError::Fault {
                method: method.to_string(),
                message: fault.faultstring.unwrap_or_else(|| "unknown fault".to_string()),
            }),
            _ if !status.is_success() => Err(SoapError::Transport(format!("{} returned HTTP {}", method, status))),
            ResponseBody::Response(payload) => Ok(SoapResponse { payload, cookie }),
            ResponseBody::Missing => Err(SoapError::Malformed(format!("missing {}Response", method))),
        }
    }
}

#[derive(Serialize)]
#[serde(rename = "soapenv:Envelope")]
struct RequestEnvelope<'a, M: SoapMethod> {
    #[serde(rename = "@xmlns:soapenv")]
    soapenv: &'static str,
    #[serde(rename = "@xmlns:xsd")]
    xsd: &'static str,
    #[serde(rename = "@xmlns:xsi")]
    xsi: &'static str,
    #[serde(rename = "soapenv:Body")]
    body: RequestBody<'a, M>,
}

/// Wraps the request in an element named after the method.
struct RequestBody<'a, M>(&'a M);

impl<M: SoapMethod> Serialize for RequestBody<'_, M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut body = serializer.serialize_struct("soapenv:Body", 1)?;
        body.serialize_field(M::NAME, self.0)?;
        body.end()
    }
}

pub fn envelope<M: SoapMethod>(request: &M) -> Result<String, quick_xml::SeError> {
    quick_xml::se::to_string(&RequestEnvelope {
        soapenv: SOAPENV_NS,
        xsd: XSD_NS,
        xsi: XSI_NS,
        body: RequestBody(request),
    })
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "M: SoapMethod"))]
struct ResponseEnvelope<M: SoapMethod> {
    #[serde(rename = "Body")]
    body: ResponseBody<M>,
}

enum ResponseBody<M: SoapMethod> {
    Response(M::Response),
    Fault(Fault),
    Missing,
}

#[derive(Deserialize)]
struct Fault {
    faultstring: Option<String>,
}

impl<'de, M: SoapMethod> Deserialize<'de> for ResponseBody<M> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(BodyVisitor(PhantomData))
    }
}

struct BodyVisitor<M>(PhantomData<M>);

impl<'de, M: SoapMethod> Visitor<'de> for BodyVisitor<M> {
    type Value = ResponseBody<M>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a SOAP body holding {}Response or a fault", M::NAME)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut body = ResponseBody::Missing;
        while let Some(key) = map.next_key::<String>()? {
            if key == "Fault" {
                body = ResponseBody::Fault(map.next_value()?);
            } else if key.strip_suffix("Response") == Some(M::NAME) {
                body = ResponseBody::Response(map.next_value()?);
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(body)
    }
}

#[derive(Deserialize)]
struct ServiceVersions {
    #[serde(rename = "namespace", default)]
    namespaces: Vec<ServiceNamespace>,
}

#[derive(Deserialize)]
struct ServiceNamespace {
    name: String,
    version: String,
}

/// Deserializes `xml` with every text node kept byte for byte.
pub fn decode<T: DeserializeOwned>(xml: &str) -> Result<T, String> {
    let verbatim = verbatim_text(xml).map_err(|e| e.to_string())?;
    quick_xml::de::from_str(&verbatim).map_err(|e| e.to_string())
}

/// The deserializer trims text nodes, but names and datastore paths must match
/// exactly. Character data is rewritten as CDATA, which it leaves alone;
/// whitespace-only runs between elements are dropped.
fn verbatim_text(xml: &str) -> Result<String, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Text(t) => {
                let text = t.unescape()?;
                if text.trim().is_empty() {
                    continue;
                }
                for part in BytesCData::escaped(&text) {
                    writer.write_event(Event::CData(part))?;
                }
            }
            event => writer.write_event(event)?,
        }
    }

    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers.get_all(SET_COOKIE).iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::trim)
        .find(|pair| pair.starts_with(SESSION_COOKIE) && pair[SESSION_COOKIE.len()..].starts_with('='))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[derive(Serialize)]
    struct Echo {
        #[serde(rename = "@xmlns")]
        xmlns: &'static str,
        value: String,
    }

    #[derive(Debug, Deserialize)]
    struct EchoResponse {
        returnval: String,
    }

    impl SoapMethod for Echo {
        const NAME: &'static str = "Echo";
        type Response = EchoResponse;
    }

    #[test]
    fn picks_session_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("other=1; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static(r#"vmware_soap_session="52ab"; Path=/; HttpOnly; Secure;"#));
        assert_eq!(session_cookie(&headers).as_deref(), Some(r#"vmware_soap_session="52ab""#));

        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("vmware_soap_session_old=1"));
        assert_eq!(session_cookie(&headers), None);
    }

    #[test]
    fn envelope_wraps_request_in_method_element() {
        let xml = envelope(&Echo { xmlns: VIM25_NS, value: "a<b&c".to_string() }).unwrap();
        assert!(xml.starts_with("<soapenv:Envelope "), "{}", xml);
        assert!(xml.contains(r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#));
        assert!(xml.contains(r#"<soapenv:Body><Echo xmlns="urn:vim25"><value>a&lt;b&amp;c</value></Echo></soapenv:Body>"#), "{}", xml);
    }

    #[test]
    fn decodes_response_and_fault_bodies() {
        let ok = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
            <soapenv:Body><EchoResponse xmlns="urn:vim25"><returnval>a &amp; b</returnval></EchoResponse></soapenv:Body>
            </soapenv:Envelope>"#;
        let doc: ResponseEnvelope<Echo> = decode(ok).unwrap();
        assert!(matches!(doc.body, ResponseBody::Response(EchoResponse { ref returnval }) if returnval == "a & b"));

        let fault = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body>
            <soapenv:Fault><faultcode>ServerFaultCode</faultcode><faultstring>denied</faultstring></soapenv:Fault>
            </soapenv:Body></soapenv:Envelope>"#;
        let doc: ResponseEnvelope<Echo> = decode(fault).unwrap();
        assert!(matches!(doc.body, ResponseBody::Fault(Fault { faultstring: Some(ref m) }) if m == "denied"));

        let other = r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body>
            <PingResponse/></soapenv:Body></soapenv:Envelope>"#;
        let doc: ResponseEnvelope<Echo> = decode(other).unwrap();
        assert!(matches!(doc.body, ResponseBody::Missing));
    }

    #[test]
    fn text_keeps_surrounding_whitespace() {
        #[derive(Deserialize)]
        struct Val {
            val: String,
        }
        let v: Val = decode("<r>\n  <val> web01 </val>\n</r>").unwrap();
        assert_eq!(v.val, " web01 ");
        assert_ne!(v.val, "web01");

        let v: Val = decode("<r><val>x ]]&gt; y</val></r>").unwrap();
        assert_eq!(v.val, "x ]]> y");
    }

    #[test]
    fn reads_vim25_version_from_service_listing() {
        let doc: ServiceVersions = decode(r#"<?xml version="1.0" encoding="UTF-8" ?>
            <namespaces version="1.0">
              <namespace><name>urn:vim25</name><version>8.0.2.0</version>
                <priorVersions><version>6.0</version><version>6.5</version></priorVersions>
              </namespace>
              <namespace><name>urn:vim2</name><version>2.5</version></namespace>
            </namespaces>"#).unwrap();
        let vim25: Vec<&str> = doc.namespaces.iter()
            .filter(|ns| ns.name == VIM25_NS)
            .map(|ns| ns.version.as_str())
            .collect();
        assert_eq!(vim25, vec!["8.0.2.0"]);
    }
}
