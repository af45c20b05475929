//! Tests for the Telegram Bot API client.

#[cfg(test)]
mod client_tests;


use crate::encoding::{RequestBody, RequestConfig};

/// One decoded `multipart/form-data` section
#[derive(Debug, Clone)]
pub(crate) struct ParsedPart {
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ParsedPart {
    fn disposition_param(&self, key: &str) -> Option<&str> {
        let disposition = self.header("content-disposition")?;
        let mut params = disposition.split(';').map(str::trim);
        if !params.next()?.eq_ignore_ascii_case("form-data") {
            return None;
        }
        params.find_map(|param| {
            let (name, value) = param.split_once('=')?;
            if !name.trim().eq_ignore_ascii_case(key) {
                return None;
            }
            let value = value.trim();
            Some(
                value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value),
            )
        })
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.disposition_param("name")
    }

    pub fn filename(&self) -> Option<&str> {
        self.disposition_param("filename")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Split a multipart body produced with `boundary` back into its parts
pub(crate) fn parse_multipart(body: &[u8], boundary: &str) -> Vec<ParsedPart> {
    let opening = format!("--{}\r\n", boundary);
    let delimiter = format!("\r\n--{}", boundary);
    assert!(
        body.starts_with(opening.as_bytes()),
        "body does not start with the opening boundary"
    );

    let mut rest = &body[opening.len()..];
    let mut parts = Vec::new();
    loop {
        let end = find(rest, delimiter.as_bytes()).expect("unterminated part");
        let section = &rest[..end];
        let header_end = find(section, b"\r\n\r\n").expect("part without header block");

        let headers = std::str::from_utf8(&section[..header_end])
            .expect("non-UTF-8 headers")
            .split("\r\n")
            .map(|line| {
                let (key, value) = line.split_once(':').expect("malformed header line");
                (key.trim().to_ascii_lowercase(), value.trim().to_string())
            })
            .collect();
        parts.push(ParsedPart {
            headers,
            body: section[header_end + 4..].to_vec(),
        });

        rest = &rest[end + delimiter.len()..];
        if rest.starts_with(b"--") {
            return parts;
        }
        // Transport padding may follow a delimiter.
        let padding = rest.iter().take_while(|b| matches!(b, b' ' | b'\t')).count();
        rest = rest[padding..]
            .strip_prefix(b"\r\n")
            .expect("missing CRLF after boundary");
    }
}

/// Drain a multipart config and parse it
pub(crate) async fn multipart_parts(config: RequestConfig) -> Vec<ParsedPart> {
    match config.body {
        RequestBody::Multipart(form) => {
            let boundary = form.boundary().to_string();
            let body = form.into_bytes().await.expect("multipart body failed");
            parse_multipart(&body, &boundary)
        }
        RequestBody::Json(json) => panic!("expected multipart body, got JSON {}", json),
    }
}

/// Find the single part with the given name
pub(crate) fn part<'a>(parts: &'a [ParsedPart], name: &str) -> &'a ParsedPart {
    let matching: Vec<_> = parts.iter().filter(|p| p.name() == Some(name)).collect();
    assert_eq!(matching.len(), 1, "expected exactly one part named {}", name);
    matching[0]
}

#[test]
fn test_parser_accepts_other_conforming_framing() {
    let body = b"--XyZ\r\n\
Content-Disposition:form-data;name=caption\r\n\
\r\n\
hello\r\n\
--XyZ \t\r\n\
CONTENT-DISPOSITION: form-data ; Name=\"doc\" ; FILENAME=\"a.pdf\"\r\n\
Content-Type:  application/pdf\r\n\
\r\n\
%PDF\r\n\
--XyZ--\r\nepilogue";

    let parts = parse_multipart(body, "XyZ");
    assert_eq!(parts.len(), 2);
    assert_eq!(part(&parts, "caption").text(), "hello");
    let doc = part(&parts, "doc");
    assert_eq!(doc.filename(), Some("a.pdf"));
    assert_eq!(doc.content_type(), Some("application/pdf"));
    assert_eq!(doc.body, b"%PDF".to_vec());
}
