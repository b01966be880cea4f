//! Built-in response-phase steps.
//!
//! All of them leave error-shaped exchanges alone.

use super::{ResponseFlow, ResponsePhase, StepArgs, StepHandler, StepResult};
use crate::core::{Body, Exchange, Response};
use crate::errors::HttpflowError;
use async_trait::async_trait;
use flate2::read::{GzDecoder, ZlibDecoder};
use std::io::Read;

/// Content-type essence to file extension.
const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("application/json", "json"),
    ("text/json", "json"),
    ("application/gzip", "gz"),
    ("application/x-gzip", "gz"),
    ("application/zip", "zip"),
    ("application/xml", "xml"),
    ("text/xml", "xml"),
    ("text/plain", "txt"),
    ("text/html", "html"),
    ("text/csv", "csv"),
    ("application/octet-stream", "bin"),
];

/// Maps a `content-type` header value to a file extension.
#[must_use]
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    MIME_EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
        .or_else(|| essence.ends_with("+json").then_some("json"))
}

/// Lowercases every response header name.
#[must_use]
pub fn downcase_headers(mut exchange: Exchange) -> Exchange {
    if let Ok(response) = &mut exchange.outcome {
        response.headers = std::mem::take(&mut response.headers)
            .map(|name, value| (name.to_ascii_lowercase(), value));
    }
    exchange
}

/// Undoes every `content-encoding`, innermost first.
pub fn decompress_body(mut exchange: Exchange) -> StepResult<Exchange> {
    if !exchange.request.options.skips_decoding() {
        if let Ok(response) = &mut exchange.outcome {
            decompress_response(response)?;
        }
    }
    Ok(exchange)
}

/// Decodes the body according to its `content-type`.
pub fn decode_body(mut exchange: Exchange) -> StepResult<Exchange> {
    if !exchange.request.options.skips_decoding() {
        if let Ok(response) = &mut exchange.outcome {
            decode_response(response)?;
        }
    }
    Ok(exchange)
}

fn decompress_response(response: &mut Response) -> StepResult<()> {
    if response.body.is_empty() {
        return Ok(());
    }
    let Some(header) = response.header("content-encoding") else {
        return Ok(());
    };
    let codecs: Vec<String> = header
        .split(',')
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();
    let Body::Bytes(bytes) = &response.body else {
        return Ok(());
    };

    let mut data = bytes.clone();
    for codec in codecs.iter().rev() {
        data = decompress(codec, &data)?;
    }
    response.body = Body::Bytes(data);
    response.headers.remove("content-encoding");
    Ok(())
}

fn decode_response(response: &mut Response) -> StepResult<()> {
    if response.body.is_empty() {
        return Ok(());
    }
    let Some(extension) = response.header("content-type").and_then(extension_for) else {
        return Ok(());
    };
    let Body::Bytes(bytes) = &response.body else {
        return Ok(());
    };

    let decoded = match extension {
        "json" => Body::Json(serde_json::from_slice(bytes)?),
        "gz" => Body::Bytes(decompress("gzip", bytes)?),
        _ => return Ok(()),
    };
    response.body = decoded;
    Ok(())
}

fn decompress(codec: &str, data: &[u8]) -> StepResult<Vec<u8>> {
    match codec {
        "gzip" | "x-gzip" => read_all(GzDecoder::new(data), codec),
        "deflate" => read_all(ZlibDecoder::new(data), codec),
        "identity" => Ok(data.to_vec()),
        other => Err(HttpflowError::UnsupportedEncoding(other.to_string())),
    }
}

fn read_all(mut reader: impl Read, codec: &str) -> StepResult<Vec<u8>> {
    let mut out = Vec::new();
    reader
        .read_to_end(&mut out)
        .map_err(|e| HttpflowError::Decode(format!("corrupt {codec} body: {e}")))?;
    Ok(out)
}

/// `downcase_headers` as a step.
#[derive(Debug, Clone, Copy, Default)]
pub struct DowncaseHeaders;

#[async_trait]
impl StepHandler<ResponsePhase> for DowncaseHeaders {
    fn name(&self) -> &str {
        "downcase_headers"
    }

    async fn run(&self, exchange: Exchange, _args: StepArgs<'_>) -> StepResult<ResponseFlow> {
        Ok(ResponseFlow::Continue(downcase_headers(exchange)))
    }
}

/// `decompress_body` as a step.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecompressBody;

#[async_trait]
impl StepHandler<ResponsePhase> for DecompressBody {
    fn name(&self) -> &str {
        "decompress_body"
    }

    async fn run(&self, exchange: Exchange, _args: StepArgs<'_>) -> StepResult<ResponseFlow> {
        decompress_body(exchange).map(ResponseFlow::Continue)
    }
}

/// `decode_body` as a step.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeBody;

#[async_trait]
impl StepHandler<ResponsePhase> for DecodeBody {
    fn name(&self) -> &str {
        "decode_body"
    }

    async fn run(&self, exchange: Exchange, _args: StepArgs<'_>) -> StepResult<ResponseFlow> {
        decode_body(exchange).map(ResponseFlow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Method, Request, RequestOptions};
    use crate::errors::TransportError;
    use crate::testing::MockAdapter;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::sync::Arc;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn exchange_with(options: RequestOptions, response: Response) -> Exchange {
        let request = Request::build(
            Arc::new(MockAdapter::new()),
            Method::Get,
            "http://localhost/",
            options,
        )
        .unwrap();
        Exchange::new(request, Ok(response))
    }

    fn body_of(exchange: &Exchange) -> &Body {
        &exchange.response().unwrap().body
    }

    #[test]
    fn test_extension_table() {
        assert_eq!(extension_for("application/json; charset=utf-8"), Some("json"));
        assert_eq!(extension_for("application/problem+json"), Some("json"));
        assert_eq!(extension_for("application/x-gzip"), Some("gz"));
        assert_eq!(extension_for("image/x-unknown"), None);
    }

    #[test]
    fn test_downcase_headers() {
        let exchange = exchange_with(
            RequestOptions::default(),
            Response::new(200).with_header("Content-Type", "text/plain"),
        );
        let exchange = downcase_headers(exchange);
        assert_eq!(exchange.response().unwrap().headers.names(), vec!["content-type"]);
    }

    #[test]
    fn test_downcase_headers_ignores_errors() {
        let request = Request::build(
            Arc::new(MockAdapter::new()),
            Method::Get,
            "http://localhost/",
            RequestOptions::default(),
        )
        .unwrap();
        let exchange = Exchange::new(request, Err(TransportError::timeout("slow")));
        let exchange = downcase_headers(exchange);
        assert!(exchange.error().is_some());
    }

    #[test]
    fn test_decompress_gzip() {
        let exchange = exchange_with(
            RequestOptions::default(),
            Response::new(200)
                .with_header("content-encoding", "gzip")
                .with_body(gzip(b"hello")),
        );
        let exchange = decompress_body(exchange).unwrap();
        assert_eq!(body_of(&exchange), &Body::from("hello"));
        assert!(exchange.response().unwrap().header("content-encoding").is_none());
    }

    #[test]
    fn test_decompress_two_stages_in_reverse_order() {
        // gzip applied first, deflate applied on top of it
        let payload = zlib(&gzip(b"layered payload"));
        let exchange = exchange_with(
            RequestOptions::default(),
            Response::new(200)
                .with_header("Content-Encoding", "gzip, deflate")
                .with_body(payload.clone()),
        );
        let exchange = decompress_body(exchange).unwrap();
        assert_eq!(body_of(&exchange), &Body::from("layered payload"));

        // the same fixture undone in declared order must not decode
        let wrong_order = exchange_with(
            RequestOptions::default(),
            Response::new(200)
                .with_header("content-encoding", "deflate, gzip")
                .with_body(payload),
        );
        assert!(matches!(
            decompress_body(wrong_order),
            Err(HttpflowError::Decode(_))
        ));
    }

    #[test]
    fn test_identity_is_noop() {
        let exchange = exchange_with(
            RequestOptions::default(),
            Response::new(200)
                .with_header("content-encoding", "identity")
                .with_body("plain"),
        );
        let exchange = decompress_body(exchange).unwrap();
        assert_eq!(body_of(&exchange), &Body::from("plain"));
    }

    #[test]
    fn test_unsupported_encoding_is_fatal() {
        let exchange = exchange_with(
            RequestOptions::default(),
            Response::new(200)
                .with_header("content-encoding", "br")
                .with_body("opaque"),
        );
        let err = decompress_body(exchange).unwrap_err();
        assert!(matches!(err, HttpflowError::UnsupportedEncoding(token) if token == "br"));
    }

    #[test]
    fn test_skip_flags_and_empty_body() {
        for options in [
            RequestOptions::new().raw(true),
            RequestOptions::new().decode_body(false),
        ] {
            let exchange = exchange_with(
                options,
                Response::new(200)
                    .with_header("content-encoding", "br")
                    .with_header("content-type", "application/json")
                    .with_body("not json"),
            );
            let exchange = decode_body(decompress_body(exchange).unwrap()).unwrap();
            assert_eq!(body_of(&exchange), &Body::from("not json"));
        }

        let empty = exchange_with(
            RequestOptions::default(),
            Response::new(204).with_header("content-encoding", "br"),
        );
        assert!(decompress_body(empty).is_ok());
    }

    #[test]
    fn test_decode_json() {
        let exchange = exchange_with(
            RequestOptions::default(),
            Response::new(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"id":7,"tags":["a"]}"#),
        );
        let exchange = decode_body(exchange).unwrap();
        assert_eq!(
            body_of(&exchange),
            &Body::Json(serde_json::json!({"id": 7, "tags": ["a"]}))
        );
    }

    #[test]
    fn test_decode_malformed_json_is_fatal() {
        let exchange = exchange_with(
            RequestOptions::default(),
            Response::new(200)
                .with_header("content-type", "application/json")
                .with_body("{broken"),
        );
        assert!(matches!(decode_body(exchange), Err(HttpflowError::Decode(_))));
    }

    #[test]
    fn test_decode_gzip_content_type() {
        let exchange = exchange_with(
            RequestOptions::default(),
            Response::new(200)
                .with_header("content-type", "application/gzip")
                .with_body(gzip(b"archive")),
        );
        let exchange = decode_body(exchange).unwrap();
        assert_eq!(body_of(&exchange), &Body::from("archive"));
    }

    #[test]
    fn test_unknown_content_type_left_alone() {
        let exchange = exchange_with(
            RequestOptions::default(),
            Response::new(200)
                .with_header("content-type", "text/html")
                .with_body("<p>hi</p>"),
        );
        let exchange = decode_body(exchange).unwrap();
        assert_eq!(body_of(&exchange), &Body::from("<p>hi</p>"));
    }
}
