use monoship::oci::digest::{is_digest, sha256_bytes, sha256_string};
use monoship::oci::layout::ImageLayout;
use monoship::oci::manifest::{
    Descriptor, ImageIndex, ImageManifest, CONFIG_MEDIA_TYPE, LAYER_MEDIA_TYPE,
    MANIFEST_MEDIA_TYPE,
};
use monoship::MonoshipError;
use std::fs::{self, File};
use std::path::Path;
use tempfile::TempDir;

/// Write a minimal but structurally complete OCI layout and return the
/// manifest digest recorded in its index.json.
fn write_layout(dir: &Path) -> String {
    let blobs = dir.join("blobs").join("sha256");
    fs::create_dir_all(&blobs).expect("mkdir blobs");

    let config_json = r#"{"architecture":"amd64","os":"linux"}"#;
    let config_digest = sha256_string(config_json);
    fs::write(blobs.join(&config_digest[7..]), config_json).expect("write config");

    let layer_data = b"layer-bytes";
    let layer_digest = sha256_bytes(layer_data);
    fs::write(blobs.join(&layer_digest[7..]), layer_data).expect("write layer");

    let manifest = ImageManifest {
        schema_version: 2,
        media_type: MANIFEST_MEDIA_TYPE.to_string(),
        config: Descriptor {
            media_type: CONFIG_MEDIA_TYPE.to_string(),
            digest: config_digest,
            size: config_json.len() as u64,
            annotations: None,
        },
        layers: vec![Descriptor {
            media_type: LAYER_MEDIA_TYPE.to_string(),
            digest: layer_digest,
            size: layer_data.len() as u64,
            annotations: None,
        }],
    };
    let manifest_json = serde_json::to_string_pretty(&manifest).expect("manifest json");
    let manifest_digest = sha256_string(&manifest_json);
    fs::write(blobs.join(&manifest_digest[7..]), &manifest_json).expect("write manifest");

    let index = ImageIndex {
        schema_version: 2,
        manifests: vec![Descriptor {
            media_type: MANIFEST_MEDIA_TYPE.to_string(),
            digest: manifest_digest.clone(),
            size: manifest_json.len() as u64,
            annotations: None,
        }],
    };
    fs::write(
        dir.join("index.json"),
        serde_json::to_string_pretty(&index).expect("index json"),
    )
    .expect("write index");
    fs::write(dir.join("oci-layout"), r#"{"imageLayoutVersion": "1.0.0"}"#).expect("write layout");

    manifest_digest
}

#[test]
fn test_missing_artifact_is_an_error() {
    let dist = TempDir::new().expect("temp dist");

    let err = ImageLayout::open(dist.path(), "web").expect_err("nothing was built");
    let message = err.to_string();
    assert!(message.contains("web"), "names the app: {}", message);
    assert!(message.contains("image"), "names the expected paths: {}", message);

    match err.downcast_ref::<MonoshipError>() {
        Some(MonoshipError::ArtifactMissing { app, .. }) => assert_eq!(app, "web"),
        other => panic!("unexpected error variant: {:?}", other),
    }
}

#[test]
fn test_open_layout_directory() {
    let dist = TempDir::new().expect("temp dist");
    let image_dir = dist.path().join("web").join("image");
    fs::create_dir_all(&image_dir).expect("mkdir");
    let expected_digest = write_layout(&image_dir);

    let layout = ImageLayout::open(dist.path(), "web").expect("open layout");
    let (manifest_digest, raw, manifest) = layout.manifest().expect("read manifest");

    assert_eq!(manifest_digest, expected_digest);
    assert_eq!(sha256_string(&raw), expected_digest, "raw bytes match the digest");
    assert_eq!(manifest.schema_version, 2);
    assert_eq!(manifest.layers.len(), 1);
    assert!(layout.blob_path(&manifest.config.digest).is_file());
    assert!(layout.blob_path(&manifest.layers[0].digest).is_file());
}

#[test]
fn test_open_tar_archive() {
    let scratch = TempDir::new().expect("scratch");
    let expected_digest = write_layout(scratch.path());

    let dist = TempDir::new().expect("temp dist");
    fs::create_dir_all(dist.path().join("web")).expect("mkdir");
    let archive_path = dist.path().join("web").join("image.tar");

    let archive = File::create(&archive_path).expect("create tar");
    let mut builder = tar::Builder::new(archive);
    builder
        .append_dir_all(".", scratch.path())
        .expect("append layout");
    builder.finish().expect("finish tar");

    let layout = ImageLayout::open(dist.path(), "web").expect("open archive");
    let (manifest_digest, _, manifest) = layout.manifest().expect("read manifest");
    assert_eq!(manifest_digest, expected_digest);
    assert!(layout.blob_path(&manifest.layers[0].digest).is_file());
}

#[test]
fn test_layout_directory_wins_over_archive() {
    let dist = TempDir::new().expect("temp dist");
    let image_dir = dist.path().join("web").join("image");
    fs::create_dir_all(&image_dir).expect("mkdir");
    write_layout(&image_dir);
    // A stale archive next to the directory must not be picked up
    fs::write(dist.path().join("web").join("image.tar"), b"not a tar").expect("write");

    let layout = ImageLayout::open(dist.path(), "web").expect("open");
    assert!(layout.manifest().is_ok());
}

#[test]
fn test_pushed_digest_is_bare_and_well_formed() {
    let scratch = TempDir::new().expect("scratch");
    let manifest_digest = write_layout(scratch.path());

    // The digest printed by `push` is the manifest digest with no extra
    // formatting around it
    assert!(is_digest(&manifest_digest), "got: {}", manifest_digest);
    assert_eq!(manifest_digest.trim(), manifest_digest);
    assert!(!manifest_digest.contains(' '));
}
