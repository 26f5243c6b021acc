use serde::Deserialize;

use crate::descriptor::LayoutDescriptor;
use crate::registry::LayoutRegistry;
use crate::v1::LayoutV1;
use crate::{LayoutError, Result};

/// Parse a yaml layout file. `extends` is looked up in `registry`.
pub fn parse_layout(input: &str, registry: &LayoutRegistry) -> Result<LayoutDescriptor> {
    let version = parse_version(input)?;
    match version {
        1 => {
            let layout: LayoutV1 = serde_yaml::from_str(input)?;
            layout.to_descriptor(registry)
        }
        _ => Err(LayoutError::UnsupportedVersion(version)),
    }
}

#[derive(Debug, Clone, Deserialize)]
struct VersionedLayout {
    version: u8,
}

fn parse_version(input: &str) -> Result<u8> {
    let raw: VersionedLayout = serde_yaml::from_str(input)?;
    Ok(raw.version)
}

/// Name and base of a layout file, read without building it.
pub(crate) fn peek_extends(input: &str) -> Result<(String, Option<String>)> {
    #[derive(Deserialize)]
    struct Header {
        name: String,
        #[serde(default)]
        extends: Option<String>,
    }
    let header: Header = serde_yaml::from_str(input)?;
    Ok((header.name, header.extends))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_layout_yaml_error_when_version_missing() {
        let yaml = "name: pad\n";
        assert!(matches!(
            parse_layout(yaml, &LayoutRegistry::new()),
            Err(LayoutError::YamlDeserializeError(_))
        ));
    }

    #[test]
    fn parse_layout_rejects_future_versions() {
        let yaml = "version: 2\nname: pad\n";
        assert!(matches!(
            parse_layout(yaml, &LayoutRegistry::new()),
            Err(LayoutError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn peek_reads_header_only() {
        let yaml = "version: 1\nname: pad\nextends: base\ncontrols: []\n";
        let (name, base) = peek_extends(yaml).unwrap();
        assert_eq!(name, "pad");
        assert_eq!(base.as_deref(), Some("base"));
    }
}
