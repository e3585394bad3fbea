//! Request → submission inputs.

use axum::body::to_bytes;
use axum::extract::{ConnectInfo, FromRequest, Multipart, Request};
use formdrop_core::{AppendError, ClientInfo, FormFields};
use http::header::{CONTENT_TYPE, USER_AGENT};
use http::request::Parts;
use http::HeaderValue;
use std::net::SocketAddr;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const FORM_MULTIPART: &str = "multipart/form-data";

/// Read the whole body and decode it into fields.
///
/// `multipart/form-data` text parts become fields; file parts are skipped.
/// Everything else goes through [`parse_fields`]. A body that cannot be read
/// in full is an error, never a partial record.
pub async fn read_fields(request: Request) -> Result<FormFields, AppendError> {
    let content_type = request.headers().get(CONTENT_TYPE).cloned();
    if mime_is(content_type.as_ref(), FORM_MULTIPART) {
        return read_multipart(request).await;
    }

    let bytes = to_bytes(request.into_body(), usize::MAX)
        .await
        .map_err(|e| AppendError::body_unreadable(e))?;
    Ok(parse_fields(content_type.as_ref(), &bytes))
}

async fn read_multipart(request: Request) -> Result<FormFields, AppendError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| AppendError::body_unreadable(e.body_text()))?;

    let mut fields = FormFields::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppendError::body_unreadable(e))?
    {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field
            .text()
            .await
            .map_err(|e| AppendError::body_unreadable(e))?;
        fields.insert(name, value);
    }
    Ok(fields)
}

/// Decode a urlencoded body.
///
/// Bodies declared as anything other than a urlencoded form carry no fields.
/// Multipart bodies are handled by [`read_fields`] before they get here.
/// A missing content type is treated as a form. Repeated keys keep the last
/// value.
pub fn parse_fields(content_type: Option<&HeaderValue>, body: &[u8]) -> FormFields {
    if content_type.is_some() && !mime_is(content_type, FORM_URLENCODED) {
        return FormFields::new();
    }
    url::form_urlencoded::parse(body).into_owned().collect()
}

fn mime_is(content_type: Option<&HeaderValue>, expected: &str) -> bool {
    let Some(Ok(value)) = content_type.map(HeaderValue::to_str) else {
        return false;
    };
    let mime = value.split(';').next().unwrap_or_default().trim();
    mime.eq_ignore_ascii_case(expected)
}

/// Client metadata from the connection and headers.
pub fn client_info(parts: &Parts) -> ClientInfo {
    let remote_address = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let user_agent = parts
        .headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    ClientInfo::new(remote_address, user_agent, Some(parts.method.to_string()))
}

/// Content type header of a request, if any.
pub fn content_type(parts: &Parts) -> Option<&HeaderValue> {
    parts.headers.get(CONTENT_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::Method;

    fn parts(builder: http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    fn multipart_request(body: &str) -> Request {
        http::Request::builder()
            .method(Method::POST)
            .uri("/submit")
            .header(CONTENT_TYPE, "multipart/form-data; boundary=XyZ")
            .body(Body::from(body.replace('\n', "\r\n")))
            .unwrap()
    }

    #[test]
    fn parses_urlencoded_pairs() {
        let ct = HeaderValue::from_static("application/x-www-form-urlencoded");
        let fields = parse_fields(Some(&ct), b"user=alice&pass=hunter2");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["user"], "alice");
        assert_eq!(fields["pass"], "hunter2");
    }

    #[test]
    fn decodes_percent_and_plus() {
        let ct = HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8");
        let fields = parse_fields(Some(&ct), b"msg=hello+world%21&empty=");
        assert_eq!(fields["msg"], "hello world!");
        assert_eq!(fields["empty"], "");
    }

    #[test]
    fn repeated_key_keeps_last_value() {
        let fields = parse_fields(None, b"a=1&a=2");
        assert_eq!(fields["a"], "2");
    }

    #[test]
    fn other_content_types_carry_no_fields() {
        let ct = HeaderValue::from_static("application/json");
        assert!(parse_fields(Some(&ct), br#"{"user":"alice"}"#).is_empty());
    }

    #[test]
    fn empty_body_is_empty_fields() {
        assert!(parse_fields(None, b"").is_empty());
    }

    #[tokio::test]
    async fn multipart_text_parts_become_fields() {
        let body = "--XyZ\n\
Content-Disposition: form-data; name=\"user\"\n\
\n\
alice\n\
--XyZ\n\
Content-Disposition: form-data; name=\"pass\"\n\
\n\
hunter2\n\
--XyZ--\n";
        let fields = read_fields(multipart_request(body)).await.unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["user"], "alice");
        assert_eq!(fields["pass"], "hunter2");
    }

    #[tokio::test]
    async fn multipart_file_parts_are_skipped() {
        let body = "--XyZ\n\
Content-Disposition: form-data; name=\"note\"\n\
\n\
hello\n\
--XyZ\n\
Content-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\n\
Content-Type: text/plain\n\
\n\
file body\n\
--XyZ--\n";
        let fields = read_fields(multipart_request(body)).await.unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["note"], "hello");
    }

    #[tokio::test]
    async fn multipart_without_boundary_is_unreadable() {
        let request = http::Request::builder()
            .method(Method::POST)
            .header(CONTENT_TYPE, "multipart/form-data")
            .body(Body::from("user=alice"))
            .unwrap();
        let err = read_fields(request).await.unwrap_err();
        assert_eq!(err.kind(), "body_unreadable");
    }

    #[tokio::test]
    async fn urlencoded_request_is_read_in_full() {
        let request = http::Request::builder()
            .method(Method::POST)
            .header(CONTENT_TYPE, FORM_URLENCODED)
            .body(Body::from("user=alice&pass=hunter2"))
            .unwrap();
        let fields = read_fields(request).await.unwrap();
        assert_eq!(fields["user"], "alice");
        assert_eq!(fields["pass"], "hunter2");
    }

    #[test]
    fn client_info_without_connection_or_agent_is_unknown() {
        let p = parts(http::Request::builder().method(Method::POST).uri("/submit"));
        let client = client_info(&p);
        assert_eq!(client.remote_address, "Unknown");
        assert_eq!(client.user_agent, "Unknown");
        assert_eq!(client.method, "POST");
    }

    #[test]
    fn client_info_reads_peer_ip_and_agent() {
        let mut p = parts(
            http::Request::builder()
                .method(Method::POST)
                .uri("/submit")
                .header(USER_AGENT, "curl/8.5.0"),
        );
        p.extensions
            .insert(ConnectInfo(SocketAddr::from(([203, 0, 113, 7], 51234))));
        let client = client_info(&p);
        assert_eq!(client.remote_address, "203.0.113.7");
        assert_eq!(client.user_agent, "curl/8.5.0");
    }
}
