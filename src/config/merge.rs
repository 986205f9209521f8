//! Configuration merging
//!
//! Layers are merged in order of precedence:
//! 1. Built-in defaults
//! 2. Main config file
//! 3. Drop-in files (sorted alphabetically)
//!
//! Mappings merge key by key; every other value, lists included, is replaced
//! by the overlay.

use serde_yaml::Value;

/// Merge two YAML values recursively, `overlay` winning on conflicts
pub fn merge_yaml_values(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            let mut result = base_map.clone();

            for (key, overlay_value) in overlay_map {
                let merged = match result.get(key) {
                    Some(base_value) => merge_yaml_values(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                result.insert(key.clone(), merged);
            }

            Value::Mapping(result)
        }

        // An empty document does not wipe out earlier layers
        (_, Value::Null) => base.clone(),

        (_, overlay) => overlay.clone(),
    }
}

/// Merge a sequence of layers in order
pub fn merge_all(layers: &[Value]) -> Value {
    layers
        .iter()
        .fold(Value::Null, |acc, layer| merge_yaml_values(&acc, layer))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_nested_mapping_merge() {
        let base = yaml("downstream:\n  program: glean\n  use_nm: true\n");
        let overlay = yaml("downstream:\n  program: /opt/bin/glean\n");

        let merged = merge_yaml_values(&base, &overlay);
        assert_eq!(
            merged,
            yaml("downstream:\n  program: /opt/bin/glean\n  use_nm: true\n")
        );
    }

    #[test]
    fn test_lists_are_replaced() {
        let base = yaml("search_path: [/bin, /sbin]\n");
        let overlay = yaml("search_path: [/opt/bin]\n");

        let merged = merge_yaml_values(&base, &overlay);
        assert_eq!(merged, yaml("search_path: [/opt/bin]\n"));
    }

    #[test]
    fn test_null_overlay_keeps_base() {
        let base = yaml("mount_point: /mnt/config\n");
        assert_eq!(merge_yaml_values(&base, &Value::Null), base);
    }

    #[test]
    fn test_merge_all_order() {
        let layers = vec![
            yaml("mount_point: /a\nblkid: blkid\n"),
            yaml("mount_point: /b\n"),
            yaml("mount_point: /c\n"),
        ];
        assert_eq!(merge_all(&layers), yaml("mount_point: /c\nblkid: blkid\n"));
    }
}
