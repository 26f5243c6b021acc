use statepad_layout::{LayoutError, LayoutRegistry, LayoutWorkspace};
use tempfile::tempdir;

const BASE: &str = "version: 1
name: HomePad
format: HID
size: 2
default_variant: Gamepad
controls:
  - name: buttonSouth
    format: BIT
";

const DERIVED: &str = "version: 1
name: HomePadPlus
extends: HomePad
controls:
  - name: buttonEast
    format: BIT
    bit: 1
";

#[test]
fn loads_layouts_in_dependency_order() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path().join("layouts");
    let workspace = LayoutWorkspace::new(Some(dir.as_path())).unwrap();
    // file order puts the derived layout first
    std::fs::write(dir.join("a_plus.yaml"), DERIVED).unwrap();
    std::fs::write(dir.join("b_base.yml"), BASE).unwrap();
    std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let mut registry = LayoutRegistry::with_builtin().unwrap();
    let builtin = registry.len();
    let loaded = workspace.load_into(&mut registry).unwrap();

    assert_eq!(loaded.len(), 2);
    assert_eq!(registry.len(), builtin + 2);
    assert_eq!(registry.get("homepadplus").unwrap().controls().len(), 2);
}

#[test]
fn missing_base_is_reported() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let workspace = LayoutWorkspace::new(Some(dir)).unwrap();
    std::fs::write(dir.join("plus.yaml"), DERIVED).unwrap();

    let mut registry = LayoutRegistry::new();
    let err = workspace.load_into(&mut registry).unwrap_err();
    assert!(matches!(err, LayoutError::UnknownLayout(name) if name == "HomePad"));
}

#[test]
fn rejects_file_path() {
    let tmp = tempdir().unwrap();
    let file = tmp.path().join("layout.yaml");
    std::fs::write(&file, BASE).unwrap();

    assert!(matches!(
        LayoutWorkspace::new(Some(file.as_path())),
        Err(LayoutError::PathIsNotDirectory(_))
    ));
}
