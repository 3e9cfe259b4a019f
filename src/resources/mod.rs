/**
 * This module contains all logic for fetching and decoding external assets:
 * the background image, the snow sprite and the ship model.
 *
 * Absolute http(s) URLs are fetched on every platform. Relative names are
 * read from `./assets/` natively and resolved against `<origin>/assets/` on
 * the web. URIs inside a glTF file are resolved relative to the file itself.
 */
pub mod gltf;
pub mod texture;

use std::fmt::Display;
#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

use anyhow::{Context, bail};
use reqwest::Url;

/// Where an asset lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetLocation {
    Url(Url),
    #[cfg(not(target_arch = "wasm32"))]
    Path(PathBuf),
}

impl AssetLocation {
    /// Resolve `location` on its own: URLs are taken as they are, anything
    /// else is looked up in the assets folder.
    pub fn parse(location: &str) -> anyhow::Result<Self> {
        if location.starts_with("data:") {
            bail!("Embedded data URIs are not supported");
        }
        match Url::parse(location) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                Ok(AssetLocation::Url(url))
            }
            Ok(url) => bail!("Unsupported URL scheme {} in {}", url.scheme(), location),
            Err(_) => local_asset(location),
        }
    }

    /// Resolve `location` relative to `self`, e.g. a buffer referenced by a
    /// glTF file.
    pub fn join(&self, location: &str) -> anyhow::Result<Self> {
        if location.starts_with("data:") {
            bail!("Embedded data URIs are not supported");
        }
        if let Ok(url) = Url::parse(location) {
            return Self::parse(url.as_str());
        }
        match self {
            AssetLocation::Url(base) => Ok(AssetLocation::Url(
                base.join(location)
                    .with_context(|| format!("Could not resolve {} against {}", location, base))?,
            )),
            #[cfg(not(target_arch = "wasm32"))]
            AssetLocation::Path(base) => {
                let dir = base.parent().map(PathBuf::from).unwrap_or_default();
                Ok(AssetLocation::Path(dir.join(location)))
            }
        }
    }
}

impl Display for AssetLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetLocation::Url(url) => write!(f, "{}", url),
            #[cfg(not(target_arch = "wasm32"))]
            AssetLocation::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn local_asset(file_name: &str) -> anyhow::Result<AssetLocation> {
    Ok(AssetLocation::Path(
        std::path::Path::new("./").join("assets").join(file_name),
    ))
}

#[cfg(target_arch = "wasm32")]
fn local_asset(file_name: &str) -> anyhow::Result<AssetLocation> {
    let window = web_sys::window().context("No window available")?;
    let origin = window
        .location()
        .origin()
        .map_err(|_| anyhow::anyhow!("Could not read the page origin"))?;
    let base = Url::parse(&format!("{}/assets/", origin))?;
    Ok(AssetLocation::Url(base.join(file_name)?))
}

pub async fn load_binary(location: &AssetLocation) -> anyhow::Result<Vec<u8>> {
    log::debug!("Fetching {}", location);
    let data = match location {
        AssetLocation::Url(url) => reqwest::get(url.clone())
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec(),
        #[cfg(not(target_arch = "wasm32"))]
        AssetLocation::Path(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Could not read {}", path.display()))?,
    };

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_urls_are_kept() {
        let location = AssetLocation::parse("https://example.com/models/ship/scene.gltf").unwrap();
        assert_eq!(
            location,
            AssetLocation::Url(Url::parse("https://example.com/models/ship/scene.gltf").unwrap())
        );
    }

    #[test]
    fn relative_uris_resolve_next_to_the_model() {
        let model = AssetLocation::parse("https://example.com/models/ship/scene.gltf").unwrap();
        let buffer = model.join("scene.bin").unwrap();
        assert_eq!(buffer.to_string(), "https://example.com/models/ship/scene.bin");
        let texture = model.join("textures/hull_baseColor.png").unwrap();
        assert_eq!(
            texture.to_string(),
            "https://example.com/models/ship/textures/hull_baseColor.png"
        );
    }

    #[test]
    fn data_uris_are_rejected() {
        assert!(AssetLocation::parse("data:application/octet-stream;base64,AAAA").is_err());
        let model = AssetLocation::parse("https://example.com/a.gltf").unwrap();
        assert!(model.join("data:image/png;base64,AAAA").is_err());
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert!(AssetLocation::parse("ftp://example.com/a.png").is_err());
    }

    #[test]
    #[cfg(not(target_arch = "wasm32"))]
    fn plain_names_live_in_the_assets_folder() {
        let location = AssetLocation::parse("ship/scene.gltf").unwrap();
        let buffer = location.join("scene.bin").unwrap();
        assert_eq!(
            buffer,
            AssetLocation::Path(PathBuf::from("./assets/ship/scene.bin"))
        );
    }
}
