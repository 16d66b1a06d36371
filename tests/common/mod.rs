//! Fixtures shared by the HTTP-backed integration tests.

#![allow(dead_code)]

use std::io::Write;

use httpmock::prelude::*;

pub const COMPOSE_PATH: &str = "/compose/40/Fedora-40-20240101.0/compose/Container/";

/// Path of a compose's per-architecture image listing for `date`.
pub fn images_path(date: &str, arch: &str) -> String {
    format!(
        "/compose/40/Fedora-40-{}.0/compose/Container/{}/images/",
        date, arch
    )
}

pub fn artifact_name(arch: &str) -> String {
    format!("Fedora-Container-Base-Generic.{}-40-1.14.oci.tar.xz", arch)
}

/// An Apache-style directory listing linking `files`.
pub fn listing_html(files: &[String]) -> String {
    let mut html = String::from(
        "<html><head><title>Index</title></head><body><pre>\n\
         <a href=\"?C=N;O=D\">Name</a>\n<a href=\"../\">Parent Directory</a>\n",
    );
    for f in files {
        html.push_str(&format!("<a href=\"{0}\">{0}</a>\n", f));
    }
    html.push_str("</pre></body></html>\n");
    html
}

pub fn tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for &(name, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_path(name).unwrap();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, data).unwrap();
    }
    builder.into_inner().unwrap()
}

pub fn xz(data: &[u8]) -> Vec<u8> {
    let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 1);
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// A `.tar.xz` OCI layout whose single layer holds `layer`.
pub fn oci_artifact(layer: &[u8]) -> Vec<u8> {
    let index = br#"{"schemaVersion":2,"manifests":[{"mediaType":"application/vnd.oci.image.manifest.v1+json","digest":"sha256:0a0a","size":10}]}"#;
    let manifest = br#"{"schemaVersion":2,"config":{"mediaType":"application/vnd.oci.image.config.v1+json","digest":"sha256:0c0c","size":2},"layers":[{"mediaType":"application/vnd.oci.image.layer.v1.tar","digest":"sha256:0b0b","size":5}]}"#;
    xz(&tar(&[
        ("oci-layout", br#"{"imageLayoutVersion":"1.0.0"}"#),
        ("index.json", index),
        ("blobs/sha256/0a0a", manifest),
        ("blobs/sha256/0c0c", b"{}"),
        ("blobs/sha256/0b0b", layer),
    ]))
}

/// Serve a listing for `arch` on `date` that links one artifact, and the
/// artifact itself.
pub async fn serve_arch(server: &MockServer, date: &str, arch: &str, layer: &[u8]) {
    let listing = images_path(date, arch);
    let name = artifact_name(arch);
    let html = listing_html(&[name.clone()]);
    server
        .mock_async(|when, then| {
            when.method(GET).path(listing.clone());
            then.status(200)
                .header("content-type", "text/html")
                .body(html);
        })
        .await;

    let body = oci_artifact(layer);
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}{}", listing, name));
            then.status(200).body(body);
        })
        .await;
}
