//! XML serialization for listing and error responses.
//!
//! Follows the AWS S3 RestXml conventions: the
//! `http://s3.amazonaws.com/doc/2006-03-01/` namespace on the listing root,
//! lowercase booleans, and RFC 3339 UTC timestamps. Errors are the minimal
//! `<Error><Code/><Message/></Error>` document.

use std::io::{self, Write};

use chrono::SecondsFormat;
use quick_xml::Writer;
use quick_xml::events::BytesText;
use syncbox_store::ObjectInfo;

/// The S3 XML namespace.
pub const S3_XMLNS: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// Serialize a `ListBucketResult` document.
///
/// `KeyCount` reports the rows actually returned; `IsTruncated` is always
/// `false` and no continuation token is emitted, even when `max_keys`
/// curtailed the walk.
///
/// # Errors
///
/// Returns `io::Error` if writing to the buffer fails.
pub fn list_bucket_result(
    bucket: &str,
    prefix: &str,
    max_keys: usize,
    objects: &[ObjectInfo],
) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(512);
    let mut writer = Writer::new(&mut buf);

    writer
        .create_element("ListBucketResult")
        .with_attribute(("xmlns", S3_XMLNS))
        .write_inner_content(|w| {
            write_text_element(w, "Name", bucket)?;
            write_text_element(w, "Prefix", prefix)?;
            write_text_element(w, "KeyCount", &objects.len().to_string())?;
            write_text_element(w, "MaxKeys", &max_keys.to_string())?;
            write_text_element(w, "IsTruncated", "false")?;
            for object in objects {
                w.create_element("Contents").write_inner_content(|w| {
                    write_text_element(w, "Key", &object.key)?;
                    write_text_element(
                        w,
                        "LastModified",
                        &object
                            .last_modified
                            .to_rfc3339_opts(SecondsFormat::Secs, true),
                    )?;
                    write_text_element(w, "ETag", &object.etag)?;
                    write_text_element(w, "Size", &object.size.to_string())?;
                    write_text_element(w, "StorageClass", object.storage_class)?;
                    Ok(())
                })?;
            }
            Ok(())
        })?;

    Ok(buf)
}

/// Serialize an `<Error>` document.
///
/// # Errors
///
/// Returns `io::Error` if writing to the buffer fails.
pub fn error_document(code: &str, message: &str) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(128);
    let mut writer = Writer::new(&mut buf);

    writer.create_element("Error").write_inner_content(|w| {
        write_text_element(w, "Code", code)?;
        write_text_element(w, "Message", message)?;
        Ok(())
    })?;

    Ok(buf)
}

/// Write a simple `<tag>text</tag>` element.
fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer
        .create_element(tag)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use syncbox_store::STORAGE_CLASS;

    use super::*;

    fn object(key: &str) -> ObjectInfo {
        let modified = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("valid time");
        ObjectInfo {
            key: key.to_owned(),
            last_modified: modified,
            etag: "\"abc\"".to_owned(),
            size: 11,
            storage_class: STORAGE_CLASS,
        }
    }

    #[test]
    fn test_should_serialize_listing_with_namespace_and_counts() {
        let xml = list_bucket_result("vault", "", 1000, &[object("a.txt"), object("sub/b.txt")])
            .expect("serialize");
        let xml = String::from_utf8(xml).expect("utf8");

        assert!(xml.starts_with("<ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">"));
        assert!(xml.contains("<Name>vault</Name>"));
        assert!(xml.contains("<KeyCount>2</KeyCount>"));
        assert!(xml.contains("<MaxKeys>1000</MaxKeys>"));
        assert!(xml.contains("<IsTruncated>false</IsTruncated>"));
        assert!(xml.contains("<Key>sub/b.txt</Key>"));
        assert!(xml.contains("<LastModified>2024-06-01T12:00:00Z</LastModified>"));
        assert!(xml.contains("<Size>11</Size>"));
        assert!(xml.contains("<StorageClass>STANDARD</StorageClass>"));
    }

    #[test]
    fn test_should_serialize_empty_listing() {
        let xml = list_bucket_result("vault", "none/", 1000, &[]).expect("serialize");
        let xml = String::from_utf8(xml).expect("utf8");
        assert!(xml.contains("<KeyCount>0</KeyCount>"));
        assert!(xml.contains("<Prefix>none/</Prefix>"));
        assert!(!xml.contains("<Contents>"));
    }

    #[test]
    fn test_should_escape_xml_text_content() {
        let xml = error_document("InternalError", "path <with> & specials").expect("serialize");
        let xml = String::from_utf8(xml).expect("utf8");
        assert!(xml.contains("path &lt;with&gt; &amp; specials"));
    }

    #[test]
    fn test_should_serialize_error_document() {
        let xml = error_document("AccessDenied", "Invalid signature").expect("serialize");
        let xml = String::from_utf8(xml).expect("utf8");
        assert_eq!(
            xml,
            "<Error><Code>AccessDenied</Code><Message>Invalid signature</Message></Error>"
        );
    }
}
