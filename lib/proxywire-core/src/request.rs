use headers::{ContentType, HeaderMapExt};
use http::{HeaderMap, Method};
use reqwest::{Body, Request};
use url::{Url, form_urlencoded};

use crate::descriptor::RequestDescriptor;
use crate::filter::FilterOutcome;

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    content_type: ContentType,
    data: Vec<u8>,
}

impl RequestBody {
    pub fn new(content_type: ContentType, data: Vec<u8>) -> Self {
        Self { content_type, data }
    }

    /// Creates an `application/json` body.
    pub fn json(data: Vec<u8>) -> Self {
        Self::new(ContentType::json(), data)
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// The outgoing request of one invocation.
///
/// Created by a [`ProxyManager`](crate::ProxyManager), completed by a content
/// binder, amended by filters, then turned into a single transport request.
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<RequestBody>,
    descriptor: RequestDescriptor,
    region_key: Option<String>,
}

impl RequestContext {
    /// Creates a context for the descriptor, using the HTTP verb of its method.
    pub fn new(descriptor: RequestDescriptor, url: Url) -> Self {
        let method = descriptor.method().verb().clone();
        let region_key = descriptor.region_key().map(ToString::to_string);
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            descriptor,
            region_key,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Option<RequestBody>) -> Self {
        self.body = body;
        self
    }

    /// Overrides the region key inherited from the descriptor.
    pub fn with_region_key(mut self, region_key: impl Into<String>) -> Self {
        self.region_key = Some(region_key.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// The descriptor this request was built from.
    pub fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    /// Partition or routing hint of the request, reported in diagnostics.
    pub fn region_key(&self) -> Option<&str> {
        self.region_key.as_deref()
    }

    /// Applies the changes requested by a filter.
    pub(crate) fn apply(
        &mut self,
        outcome: FilterOutcome,
    ) -> Result<(), serde_urlencoded::ser::Error> {
        let (headers, query) = outcome.into_parts();
        self.headers.extend(headers);
        merge_query(&mut self.url, &query)
    }

    /// Builds the transport request.
    pub(crate) fn to_request(&self) -> Request {
        let mut request = Request::new(self.method.clone(), self.url.clone());
        let req_headers = request.headers_mut();
        req_headers.extend(self.headers.clone());

        if let Some(body) = &self.body {
            req_headers.typed_insert(body.content_type.clone());
            let req_body = request.body_mut();
            *req_body = Some(Body::from(body.data.clone()));
        }

        request
    }
}

/// Merges entries into the query of the URL.
///
/// Existing parameters keep their position and their raw encoding. An entry
/// whose key already exists replaces the first occurrence in place and drops the
/// later ones; new keys are appended in iteration order.
pub(crate) fn merge_query<'a, I>(
    url: &mut Url,
    entries: I,
) -> Result<(), serde_urlencoded::ser::Error>
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut entries = entries.into_iter().peekable();
    if entries.peek().is_none() {
        return Ok(());
    }

    let mut segments: Vec<String> = url
        .query()
        .map(|query| {
            query
                .split('&')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    for (key, value) in entries {
        let encoded = serde_urlencoded::to_string([(key, value)])?;
        let mut replaced = false;
        segments.retain_mut(|segment| {
            if segment_key(segment).as_deref() != Some(key.as_str()) {
                return true;
            }
            if replaced {
                return false;
            }
            segment.clone_from(&encoded);
            replaced = true;
            true
        });
        if !replaced {
            segments.push(encoded);
        }
    }

    if segments.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&segments.join("&")));
    }
    Ok(())
}

fn segment_key(segment: &str) -> Option<String> {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
}
